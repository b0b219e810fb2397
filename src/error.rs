use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// A corpus directory could not be listed. Only the affected subtree is
/// skipped.
#[derive(Debug, Error)]
#[error("cannot read corpus directory '{}': {source}", .path.display())]
pub struct CorpusAccessError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// One analyzer invocation failed. Scoped to a single variant.
#[derive(Debug, Error)]
pub enum ToolInvocationError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to read output of '{program}': {source}")]
    Capture {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("analyzer exited with {status}")]
    NonZeroExit { status: ExitStatus, output: String },

    #[error("analyzer timed out after {seconds} s")]
    TimedOut { seconds: u64, output: String },
}

impl ToolInvocationError {
    /// Whatever the tool printed before failing, if anything.
    pub fn partial_output(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { output, .. } | Self::TimedOut { output, .. } => {
                Some(output.as_str()).filter(|s| !s.is_empty())
            }
            Self::Spawn { .. } | Self::Wait { .. } | Self::Capture { .. } => None,
        }
    }
}

/// Fatal errors: the report itself could not be written.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot write '{}': {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
