//! Pipeline steps.
//!
//! - [`create_cd`] - Stage files and pack them into an ISO9660 CD image

pub mod create_cd;

pub use create_cd::CreateCdStep;
