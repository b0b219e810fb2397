use crate::backend::{Analyzer, InvocationTemplate};
use crate::classify::Classifier;
use crate::corpus::{CaseFilter, scan_dir};
use crate::error::{CorpusAccessError, HarnessError};
use crate::report::ArtifactStore;
use crate::t_args;
use crate::types::{CaseReport, Document, Section, Tally, TestCase, Variant, VariantResult};
use std::path::Path;
use tracing::{debug, info, warn};

/// Directories below the corpus root that are searched: the CWE category
/// and its optional `sNN` split.
pub const MAX_DEPTH: usize = 2;

/// Result of a whole run. Skipped subtrees are kept for reporting.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub document: Document,
    pub skipped: Vec<CorpusAccessError>,
}

impl RunOutcome {
    pub fn tally(&self, variant: Variant) -> Tally {
        let mut tally = Tally::default();
        for row in self.document.sections.iter().flat_map(|s| s.rows()) {
            let result = match variant {
                Variant::Good => &row.good,
                Variant::Bad => &row.bad,
            };
            tally.add(result.outcome);
        }
        tally
    }
}

/// Runs one variant and classifies its output. Never fails: invocation
/// errors become an unresolved result.
pub fn run_variant<A: Analyzer + ?Sized>(
    analyzer: &A,
    template: &InvocationTemplate,
    classifier: &Classifier,
    case: &TestCase,
    variant: Variant,
) -> VariantResult {
    let invocation = template.invocation(case, variant);
    let capture = analyzer.run(&invocation);
    if let Err(e) = &capture {
        debug!(
            "{}",
            t_args!("debug-variant-failed",
                "entry" => case.entry_point(variant),
                "error" => e
            )
        );
    }
    let outcome = classifier.classify(&capture);
    VariantResult {
        variant,
        capture,
        outcome,
    }
}

/// Walks the corpus and collects one section per directory with cases.
/// Sections are appended in traversal order and never modified afterwards.
pub struct Aggregator<'a, A: Analyzer + ?Sized> {
    analyzer: &'a A,
    template: &'a InvocationTemplate,
    classifier: &'a Classifier,
    filter: &'a CaseFilter,
    artifacts: &'a ArtifactStore,
    sections: Vec<Section>,
    skipped: Vec<CorpusAccessError>,
}

impl<'a, A: Analyzer + ?Sized> Aggregator<'a, A> {
    pub fn new(
        analyzer: &'a A,
        template: &'a InvocationTemplate,
        classifier: &'a Classifier,
        filter: &'a CaseFilter,
        artifacts: &'a ArtifactStore,
    ) -> Self {
        Self {
            analyzer,
            template,
            classifier,
            filter,
            artifacts,
            sections: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn run(mut self, root: &Path) -> Result<RunOutcome, HarnessError> {
        self.visit(root, 0)?;
        Ok(RunOutcome {
            document: Document {
                sections: self.sections,
            },
            skipped: self.skipped,
        })
    }

    fn visit(&mut self, dir: &Path, depth: usize) -> Result<(), HarnessError> {
        let listing = match scan_dir(dir, self.filter) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("{}", t_args!("warn-dir-skipped", "error" => &e));
                self.skipped.push(e);
                return Ok(());
            }
        };

        if !listing.cases.is_empty() {
            info!(
                "{}",
                t_args!("info-section",
                    "folder" => dir.display(),
                    "count" => listing.cases.len()
                )
            );
            let section = self.process_section(dir, listing.cases)?;
            self.sections.push(section);
        }

        if depth < MAX_DEPTH {
            for sub in &listing.subdirs {
                self.visit(&dir.join(sub), depth + 1)?;
            }
        }
        Ok(())
    }

    fn process_section(&self, dir: &Path, cases: Vec<TestCase>) -> Result<Section, HarnessError> {
        let mut section = Section::new(dir);
        for case in cases {
            let good = run_variant(self.analyzer, self.template, self.classifier, &case, Variant::Good);
            let bad = run_variant(self.analyzer, self.template, self.classifier, &case, Variant::Bad);
            let artifact = self.artifacts.write(&case, &good, &bad)?;
            debug!("{} good={} bad={}", case.file_name, good.outcome, bad.outcome);
            section.cases.insert(
                case.file_name.clone(),
                CaseReport {
                    case,
                    good,
                    bad,
                    artifact,
                },
            );
        }
        Ok(section)
    }
}
