use crate::types::{Capture, Outcome};

/// Printed by Goblint once it has finished a full pass and lists findings.
pub const DEFAULT_MARKER: &str = "Summary for all memory locations:";
/// Separator line the earliest harness keyed on.
pub const LEGACY_MARKER: &str = "-------------------";

/// Substring search over analyzer output. Nothing deeper is parsed, so a
/// marker quoted in an unrelated context still counts as a detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classifier {
    marker: String,
}

impl Classifier {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn classify(&self, capture: &Capture) -> Outcome {
        match capture {
            Err(_) => Outcome::Unresolved,
            Ok(text) if text.contains(&self.marker) => Outcome::Detected,
            Ok(_) => Outcome::Clean,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}
