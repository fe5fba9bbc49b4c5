//! Pipeline step that packs a list of files into an ISO9660 CD image.
//!
//! A run stages every input into a fresh temporary directory, resolves the
//! host's ISO tool, runs it once and publishes the image path through
//! [`StepState`]. Any failure halts the pipeline; nothing is retried.
//! [`CreateCdStep::cleanup`](Step::cleanup) removes the staging directory and
//! the image and may be called any number of times.
//!
//! # Example
//!
//! ```rust,no_run
//! use cdrom_builder::pipeline::{Step, StepAction, StepState};
//! use cdrom_builder::stages::create_cd::CreateCdStep;
//!
//! let mut step = CreateCdStep::new(["user-data", "meta-data"]).label("cidata");
//! let mut state = StepState::new();
//!
//! if step.run(&mut state) == StepAction::Continue {
//!     println!("CD at {}", state.cd_path().unwrap().display());
//! }
//! step.cleanup(&mut state);
//! ```

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::artifact::filesystem::{remove_path_if_exists, stage_input};
use crate::artifact::iso::{resolve, IsoOptions};
use crate::artifact::tracker::ArtifactTracker;
use crate::error::{Result, StepError};
use crate::pipeline::{Step, StepAction, StepState};
use crate::preflight::HostEnvironment;
use crate::process::execute;

const STAGING_PREFIX: &str = "cd_staging";
const IMAGE_PREFIX: &str = "cd";
const IMAGE_SUFFIX: &str = ".iso";

pub struct CreateCdStep {
    files: Vec<PathBuf>,
    options: IsoOptions,
    output: Option<PathBuf>,
    host: Option<HostEnvironment>,
    staging: Option<TempDir>,
    cd_path: Option<PathBuf>,
    tracker: ArtifactTracker,
}

impl CreateCdStep {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            options: IsoOptions::default(),
            output: None,
            host: None,
            staging: None,
            cd_path: None,
            tracker: ArtifactTracker::new(),
        }
    }

    /// Volume label of the image.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.options.label = label.into();
        self
    }

    /// Write the image here instead of a fresh temporary path.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Use this host snapshot instead of probing the real host.
    pub fn host(mut self, host: HostEnvironment) -> Self {
        self.host = Some(host);
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn tracker(&self) -> &ArtifactTracker {
        &self.tracker
    }

    pub fn staging_dir(&self) -> Option<&Path> {
        self.staging.as_ref().map(TempDir::path)
    }

    /// Remove the staging directory only, leaving the image in place.
    pub fn cleanup_staging(&mut self) {
        let Some(dir) = self.staging.take() else {
            return;
        };
        let path = dir.path().to_path_buf();
        match dir.close() {
            Ok(()) => debug!(path = %path.display(), "removed staging directory"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "failed to remove staging directory: {}", e),
        }
    }

    fn remove_image(&mut self) {
        let Some(path) = self.cd_path.take() else {
            return;
        };
        match remove_path_if_exists(&path) {
            Ok(true) => debug!(path = %path.display(), "removed CD image"),
            Ok(false) => {}
            Err(e) => warn!(path = %path.display(), "failed to remove CD image: {}", e),
        }
    }

    fn create_cd(&mut self) -> Result<PathBuf> {
        // A rerun starts from nothing: drop the previous image and staging.
        self.remove_image();
        self.cleanup_staging();
        self.tracker.clear();

        let staging_path = self.stage()?;
        debug_assert_eq!(self.tracker.len(), self.files.len());

        let output = self.output_path()?;
        let host = self.host.get_or_insert_with(HostEnvironment::probe);
        let command = resolve(&output, &staging_path, host, &self.options)?;
        info!(
            tool = %command.program.display(),
            label = %self.options.label,
            "writing CD image to {}",
            output.display()
        );

        let result = execute(&command)?;
        // The tool ran, so anything at `output` is ours to clean up.
        self.cd_path = Some(output.clone());

        if !result.success() {
            return Err(StepError::ToolExecution {
                program: command.program,
                status: result.describe_status(),
                output: result.combined_output(),
            });
        }

        Ok(output)
    }

    fn stage(&mut self) -> Result<PathBuf> {
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(|e| StepError::staging(std::env::temp_dir(), e))?;
        let staging_path = staging.path().to_path_buf();
        self.staging = Some(staging);

        for file in &self.files {
            let staged = stage_input(&staging_path, file)?;
            debug!(source = %file.display(), staged = %staged.display(), "staged");
            self.tracker.record(file, staged);
        }

        info!("staged {} path(s) for CD", self.tracker.len());
        Ok(staging_path)
    }

    fn output_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.output {
            if path.is_absolute() {
                return Ok(path.clone());
            }
            let cwd = std::env::current_dir().map_err(|e| StepError::staging(path, e))?;
            return Ok(cwd.join(path));
        }

        // Reserve a unique name, then free it for the tool to create.
        let reserved = tempfile::Builder::new()
            .prefix(IMAGE_PREFIX)
            .suffix(IMAGE_SUFFIX)
            .tempfile()
            .map_err(|e| StepError::staging(std::env::temp_dir(), e))?
            .into_temp_path();
        let path = reserved.to_path_buf();
        reserved
            .close()
            .map_err(|e| StepError::staging(&path, e))?;
        Ok(path)
    }
}

impl Step for CreateCdStep {
    fn name(&self) -> &str {
        "create_cd"
    }

    fn run(&mut self, state: &mut StepState) -> StepAction {
        info!("Creating CD disk...");
        match self.create_cd() {
            Ok(path) => {
                info!("CD image created at {}", path.display());
                state.publish_cd_path(path);
                StepAction::Continue
            }
            Err(e) => state.halt(e),
        }
    }

    fn cleanup(&mut self, _state: &mut StepState) {
        self.remove_image();
        self.cleanup_staging();
        self.tracker.clear();
    }
}
