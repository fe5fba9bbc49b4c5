//! Step protocol shared with the pipeline that sequences build steps.
//!
//! Steps communicate through a typed [`StepState`] instead of a loose
//! key/value bag: a successful step fills in its output field, a failed one
//! records its error and returns [`StepAction::Halt`].

pub mod config;

use std::path::{Path, PathBuf};

use tracing::error;

use crate::error::StepError;

/// What the pipeline should do after a step ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    Continue,
    Halt,
}

/// Results handed from one step to the next.
///
/// Invariant: after a step reports, either `cd_path` is set and `error` is
/// empty, or the reverse.
#[derive(Debug, Default)]
pub struct StepState {
    cd_path: Option<PathBuf>,
    error: Option<StepError>,
}

impl StepState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute path of the produced CD image.
    pub fn cd_path(&self) -> Option<&Path> {
        self.cd_path.as_deref()
    }

    pub fn error(&self) -> Option<&StepError> {
        self.error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<StepError> {
        self.error.take()
    }

    pub(crate) fn publish_cd_path(&mut self, path: PathBuf) {
        self.error = None;
        self.cd_path = Some(path);
    }

    /// Record `err` and return the action that stops the pipeline.
    pub(crate) fn halt(&mut self, err: StepError) -> StepAction {
        error!("{}", err);
        self.cd_path = None;
        self.error = Some(err);
        StepAction::Halt
    }
}

/// One unit of a sequential build pipeline.
pub trait Step {
    /// Step name, for logs.
    fn name(&self) -> &str;

    /// Do the step's work, reporting outputs and errors through `state`.
    fn run(&mut self, state: &mut StepState) -> StepAction;

    /// Release everything the step created. Must be safe to call at any
    /// time, repeatedly, including without a preceding `run`.
    fn cleanup(&mut self, state: &mut StepState);
}
