use crate::engine::RunOutcome;
use crate::error::HarnessError;
use crate::t;
use crate::t_args;
use crate::types::{Document, Outcome, TestCase, Variant, VariantResult};
use colored::Colorize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Artifact directory name, also used as the href prefix in the summary.
pub const ARTIFACT_DIR: &str = "summary_fileoutputs";
pub const SUMMARY_FILE: &str = "summary_table.html";
/// Stands in for the output of a variant whose invocation failed.
pub const MISSING_PLACEHOLDER: &str = "Function missing / Error unrelated to the analyzer\n";

const RULE: &str = "#####################";

pub fn artifact_name(case: &TestCase) -> String {
    format!("{}.txt", case.file_name)
}

fn variant_text(result: &VariantResult) -> String {
    match &result.capture {
        Ok(text) => text.clone(),
        Err(e) => {
            let mut text = format!("{MISSING_PLACEHOLDER}{e}\n");
            if let Some(partial) = e.partial_output() {
                text.push('\n');
                text.push_str(partial);
            }
            text
        }
    }
}

/// Plain-text log of both variants of one case.
pub fn render_artifact(case: &TestCase, good: &VariantResult, bad: &VariantResult) -> String {
    let mut out = format!("{}\n\n", case.file_name);
    for result in [good, bad] {
        let _ = write!(
            out,
            "{RULE}\n{}\n{RULE}\n\n{}\n",
            result.variant.label(),
            variant_text(result)
        );
    }
    out
}

/// Owns the artifact directory; one file per case, overwritten on rerun.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| HarnessError::Output {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Writes the artifact and returns its file name.
    pub fn write(
        &self,
        case: &TestCase,
        good: &VariantResult,
        bad: &VariantResult,
    ) -> Result<String, HarnessError> {
        let name = artifact_name(case);
        let path = self.dir.join(&name);
        fs::write(&path, render_artifact(case, good, bad))
            .map_err(|source| HarnessError::Output { path, source })?;
        Ok(name)
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Percent-encodes a relative URL path. Only unreserved bytes and `/` pass through.
fn encode_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => out.push(b as char),
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

/// Renders the summary page. `artifact_base` is the href prefix of the
/// artifact directory as seen from the page.
pub fn render_html(doc: &Document, artifact_base: &str) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>\n<head>\n<meta charset=\"utf-8\">");
    let _ = writeln!(html, "<title>{}</title>\n</head>\n<body>", escape(&t!("html-title")));
    let _ = writeln!(
        html,
        "<p id=\"top\" style=\"font-size:30px\">{}</p>",
        escape(&t!("html-results"))
    );
    for (outcome, key) in [
        (Outcome::Detected, "legend-detected"),
        (Outcome::Clean, "legend-clean"),
        (Outcome::Unresolved, "legend-unresolved"),
    ] {
        let _ = writeln!(
            html,
            "<p><small><strong>{}</strong>&emsp;{}</small></p>",
            escape(outcome.symbol()),
            escape(&t!(key))
        );
    }
    html.push_str("<br>\n");
    for id in doc.toc() {
        let _ = writeln!(html, "<a href=\"#{0}\">{0}</a><br>", escape(id));
    }
    html.push_str("<br><hr><br>\n");

    let go_top = escape(&t!("html-go-top"));
    for section in &doc.sections {
        let id = escape(&section.id);
        let _ = writeln!(
            html,
            "\n<p id=\"{id}\">{}&emsp;<a href=\"#top\">{go_top}</a></p>",
            escape(&t_args!("html-folder", "folder" => &section.id))
        );
        html.push_str("<table border=1>\n  <tr>\n");
        for key in ["html-col-testcase", "html-col-good", "html-col-bad"] {
            let _ = writeln!(html, "    <th>{}</th>", escape(&t!(key)));
        }
        html.push_str("  </tr>\n");
        for row in section.rows() {
            let href = encode_path(&format!("{}/{}", artifact_base.trim_end_matches('/'), row.artifact));
            let _ = writeln!(html, "  <tr>");
            let _ = writeln!(
                html,
                "    <td><a href=\"{}\" target=\"_blank\">{}</a></td>",
                escape(&href),
                escape(&row.case.file_name)
            );
            let _ = writeln!(html, "    <td>{}</td>", row.good.outcome.symbol());
            let _ = writeln!(html, "    <td>{}</td>", row.bad.outcome.symbol());
            let _ = writeln!(html, "  </tr>");
        }
        html.push_str("</table><br><hr><br>\n");
    }
    let _ = writeln!(html, "<a href=\"#top\">{go_top}</a>\n</body>\n</html>");
    html
}

pub fn write_summary(path: &Path, doc: &Document, artifact_base: &str) -> Result<(), HarnessError> {
    fs::write(path, render_html(doc, artifact_base)).map_err(|source| HarnessError::Output {
        path: path.to_path_buf(),
        source,
    })
}

fn colored_count(outcome: Outcome, n: usize) -> String {
    let text = format!("{} {n}", outcome.symbol());
    match outcome {
        Outcome::Detected => text.red().bold().to_string(),
        Outcome::Clean => text.green().to_string(),
        Outcome::Unresolved if n > 0 => text.yellow().to_string(),
        Outcome::Unresolved => text,
    }
}

pub fn render_human(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let header = t_args!("summary-header",
        "sections" => outcome.document.sections.len(),
        "cases" => outcome.document.case_count()
    );
    out.push_str(&header.bold().to_string());
    out.push('\n');
    for variant in Variant::ALL {
        let tally = outcome.tally(variant);
        let label = match variant {
            Variant::Good => t!("summary-good"),
            Variant::Bad => t!("summary-bad"),
        };
        let _ = writeln!(
            out,
            "  {label:<6} {}  {}  {}",
            colored_count(Outcome::Detected, tally.detected),
            colored_count(Outcome::Clean, tally.clean),
            colored_count(Outcome::Unresolved, tally.unresolved)
        );
    }
    for skipped in &outcome.skipped {
        let _ = writeln!(
            out,
            "{} {}",
            t!("summary-skipped").red().bold(),
            skipped.path.display()
        );
    }
    out
}

pub fn print_human(outcome: &RunOutcome) {
    print!("{}", render_human(outcome));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolInvocationError;

    fn case() -> TestCase {
        TestCase {
            dir: PathBuf::from("c"),
            file_name: "CWE000_Example_01.c".into(),
            base: "CWE000_Example_01".into(),
        }
    }

    #[test]
    fn artifact_has_both_labeled_sections_and_placeholder() {
        let good = VariantResult {
            variant: Variant::Good,
            capture: Err(ToolInvocationError::Spawn {
                program: "goblint".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
            outcome: Outcome::Unresolved,
        };
        let bad = VariantResult {
            variant: Variant::Bad,
            capture: Ok("bad output\n".into()),
            outcome: Outcome::Clean,
        };
        let text = render_artifact(&case(), &good, &bad);
        assert!(text.starts_with("CWE000_Example_01.c\n\n#####################\n_GOOD\n"));
        assert!(text.contains(MISSING_PLACEHOLDER));
        assert!(text.ends_with("_BAD\n#####################\n\nbad output\n\n"));
        assert!(text.find("_GOOD").unwrap() < text.find("_BAD").unwrap());
    }

    #[test]
    fn escape_handles_markup() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }

    #[test]
    fn artifact_link_survives_hash_and_percent_in_names() {
        use crate::types::{CaseReport, Section};

        let case = TestCase {
            dir: PathBuf::from("c"),
            file_name: "CWE000_A#1 50%_01.c".into(),
            base: "CWE000_A#1 50%_01".into(),
        };
        let clean = |variant| VariantResult {
            variant,
            capture: Ok(String::new()),
            outcome: Outcome::Clean,
        };
        let mut section = Section::new(Path::new("c"));
        section.cases.insert(
            case.file_name.clone(),
            CaseReport {
                artifact: artifact_name(&case),
                good: clean(Variant::Good),
                bad: clean(Variant::Bad),
                case,
            },
        );
        let doc = Document { sections: vec![section] };

        let html = render_html(&doc, "out dir/");
        assert!(html.contains("href=\"out%20dir/CWE000_A%231%2050%25_01.c.txt\""));
        assert!(html.contains(">CWE000_A#1 50%_01.c</a>"));
    }
}
