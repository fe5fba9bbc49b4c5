//! Build-pipeline step that produces an ISO9660 CD image from a set of files.
//!
//! Typical use is attaching extra files (cloud-init seeds, drivers, answer
//! files) to a virtual machine during provisioning. The image bytes are
//! written by an external tool; this crate picks the tool, drives it, and
//! guarantees that everything it created can be removed again.
//!
//! # Architecture
//!
//! ```text
//! CreateCdStep::run
//!     │
//!     ├── stage inputs ──────────── artifact::filesystem + ArtifactTracker
//!     ├── probe host (once) ─────── preflight::HostEnvironment
//!     ├── resolve command ───────── artifact::iso (+ posix_path on MSYS2)
//!     ├── run tool ──────────────── process::execute
//!     └── publish / halt ────────── pipeline::StepState
//!
//! CreateCdStep::cleanup ─────────── remove image + staging dir (idempotent)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use cdrom_builder::{CreateCdStep, Step, StepAction, StepState};
//!
//! let mut step = CreateCdStep::new(["autounattend.xml"]);
//! let mut state = StepState::new();
//! match step.run(&mut state) {
//!     StepAction::Continue => println!("{}", state.cd_path().unwrap().display()),
//!     StepAction::Halt => eprintln!("{}", state.error().unwrap()),
//! }
//! step.cleanup(&mut state);
//! ```

pub mod artifact;
pub mod error;
pub mod pipeline;
pub mod preflight;
pub mod process;
pub mod stages;

pub use error::StepError;
pub use pipeline::{Step, StepAction, StepState};
pub use stages::CreateCdStep;
