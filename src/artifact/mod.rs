//! CD image building blocks.
//!
//! - [`filesystem`] - Staging copies and best-effort removal
//! - [`iso`] - Tool selection and argument construction for ISO creation
//! - [`posix_path`] - Path translation for tools inside MSYS2/Cygwin
//! - [`tracker`] - Record of the inputs a run staged
//!
//! The utility modules are usable on their own; [`crate::stages::create_cd`]
//! wires them into a pipeline step.

pub mod filesystem;
pub mod iso;
pub mod posix_path;
pub mod tracker;
