//! Error taxonomy for the CD creation step.
//!
//! Every variant is terminal for the current run: the step records it in the
//! shared [`StepState`](crate::pipeline::StepState) and halts the pipeline.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = StepError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StepError {
    /// A source could not be read or the staging area could not be written.
    #[error("error adding '{}' to CD: {source}", .path.display())]
    Staging {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// None of the supported ISO creation tools is present on the host.
    #[error("no ISO creation tool found on this host. Install one of:\n{candidates}")]
    ToolNotFound { candidates: String },

    /// The resolved tool could not be started at all.
    #[error("failed to launch '{}': {source}", .program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The tool ran but exited unsuccessfully.
    #[error("'{}' failed ({status}):\n{output}", .program.display())]
    ToolExecution {
        program: PathBuf,
        status: String,
        output: String,
    },

    /// A native path has no equivalent in the requested path syntax.
    #[error("path '{path}' cannot be expressed as a {syntax} path")]
    UnsupportedPath { path: String, syntax: &'static str },
}

impl StepError {
    pub(crate) fn staging(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StepError::Staging {
            path: path.into(),
            source,
        }
    }
}
