use crate::backend::{DEFAULT_DIAGNOSTIC_FLAGS, InvocationTemplate};
use crate::classify::{Classifier, DEFAULT_MARKER};
use crate::report::{ARTIFACT_DIR, SUMMARY_FILE};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Analyzer location used when only the corpus is given.
pub const DEFAULT_TOOL: &str = "../../goblint";
/// Juliet's shared headers and helpers.
pub const DEFAULT_SUPPORT_DIR: &str = "testcasesupport";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub tool: PathBuf,
    pub support_dir: PathBuf,
    pub corpus: PathBuf,
    pub out_dir: PathBuf,
    pub diagnostic_flags: Vec<String>,
    pub marker: String,
    pub timeout: Option<Duration>,
}

impl HarnessConfig {
    pub fn new(tool: impl Into<PathBuf>, support_dir: impl Into<PathBuf>, corpus: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            support_dir: support_dir.into(),
            corpus: corpus.into(),
            out_dir: PathBuf::from("."),
            diagnostic_flags: DEFAULT_DIAGNOSTIC_FLAGS.iter().map(|s| s.to_string()).collect(),
            marker: DEFAULT_MARKER.to_string(),
            timeout: None,
        }
    }

    /// `CORPUS` or `TOOL SUPPORT CORPUS`; anything else is `None`.
    pub fn from_positionals(paths: &[PathBuf]) -> Option<Self> {
        match paths {
            [corpus] => Some(Self::new(DEFAULT_TOOL, DEFAULT_SUPPORT_DIR, corpus)),
            [tool, support, corpus] => Some(Self::new(tool, support, corpus)),
            _ => None,
        }
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.out_dir.join(ARTIFACT_DIR)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.out_dir.join(SUMMARY_FILE)
    }

    pub fn template(&self) -> InvocationTemplate {
        InvocationTemplate {
            tool: self.tool.clone(),
            support_dir: self.support_dir.clone(),
            diagnostic_flags: self.diagnostic_flags.clone(),
        }
    }

    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.marker.clone())
    }
}

fn display_path(path: &Path) -> String {
    match std::fs::canonicalize(path) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => path.display().to_string(),
    }
}

/// Absolute form of the tool for log output: canonicalized when it is a
/// path, looked up in `PATH` when it is a bare command name.
pub fn resolve_tool_path(tool: &Path) -> String {
    if tool.components().count() > 1 || tool.is_absolute() {
        return display_path(tool);
    }
    match which::which(tool) {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => tool.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_uses_default_locations() {
        let cfg = HarnessConfig::from_positionals(&[PathBuf::from("testcases")]).unwrap();
        assert_eq!(cfg.tool, PathBuf::from(DEFAULT_TOOL));
        assert_eq!(cfg.support_dir, PathBuf::from(DEFAULT_SUPPORT_DIR));
        assert_eq!(cfg.corpus, PathBuf::from("testcases"));
        assert_eq!(cfg.summary_path(), PathBuf::from("./summary_table.html"));
    }

    #[test]
    fn full_form_and_bad_counts() {
        let three = [
            PathBuf::from("/opt/goblint"),
            PathBuf::from("support"),
            PathBuf::from("cases"),
        ];
        let cfg = HarnessConfig::from_positionals(&three).unwrap();
        assert_eq!(cfg.tool, PathBuf::from("/opt/goblint"));
        assert_eq!(cfg.support_dir, PathBuf::from("support"));
        assert!(HarnessConfig::from_positionals(&[]).is_none());
        assert!(HarnessConfig::from_positionals(&three[..2]).is_none());
    }
}
