use crate::error::ToolInvocationError;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Variant {
    Good,
    Bad,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Good, Variant::Bad];

    /// Appended to the base identifier to form the entry point name.
    pub fn selector(self) -> &'static str {
        match self {
            Variant::Good => "_good",
            Variant::Bad => "_bad",
        }
    }

    /// Section heading used in the per-case artifact.
    pub fn label(self) -> &'static str {
        match self {
            Variant::Good => "_GOOD",
            Variant::Bad => "_BAD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Marker found in the analyzer output.
    Detected,
    /// Analyzer ran, no marker.
    Clean,
    /// Invocation failed or the entry point does not exist.
    Unresolved,
}

impl Outcome {
    pub fn symbol(self) -> &'static str {
        match self {
            Outcome::Detected => "X",
            Outcome::Clean => "-",
            Outcome::Unresolved => "?",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    pub dir: PathBuf,
    pub file_name: String,
    /// File name with the source suffix and secondary-variant marker removed.
    pub base: String,
}

impl TestCase {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }

    pub fn entry_point(&self, variant: Variant) -> String {
        format!("{}{}", self.base, variant.selector())
    }
}

pub type Capture = Result<String, ToolInvocationError>;

#[derive(Debug)]
pub struct VariantResult {
    pub variant: Variant,
    pub capture: Capture,
    pub outcome: Outcome,
}

#[derive(Debug)]
pub struct CaseReport {
    pub case: TestCase,
    pub good: VariantResult,
    pub bad: VariantResult,
    /// Artifact file name, relative to the artifact directory.
    pub artifact: String,
}

#[derive(Debug)]
pub struct Section {
    /// Directory path as displayed; doubles as the HTML anchor.
    pub id: String,
    pub cases: IndexMap<String, CaseReport>,
}

impl Section {
    pub fn new(dir: &Path) -> Self {
        Self {
            id: dir.display().to_string(),
            cases: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.values()
    }
}

#[derive(Debug, Default)]
pub struct Document {
    pub sections: Vec<Section>,
}

impl Document {
    /// Table of contents; one entry per section, in section order.
    pub fn toc(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.id.as_str())
    }

    pub fn case_count(&self) -> usize {
        self.sections.iter().map(|s| s.cases.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub detected: usize,
    pub clean: usize,
    pub unresolved: usize,
}

impl Tally {
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Detected => self.detected += 1,
            Outcome::Clean => self.clean += 1,
            Outcome::Unresolved => self.unresolved += 1,
        }
    }
}
