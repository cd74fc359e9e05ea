//! presso - structural analysis and refactoring for Java sources.
//!
//! This crate provides the `presso` binary. Editors and build tools call one
//! command per request and read a single JSON document from stdout.
//!
//! ## Modules
//!
//! - `cli` - command implementations

pub mod cli;

// Re-export core types for convenience
pub use presso_core::error::{OutputErrorCode, PressoError};
pub use presso_core::output::{ErrorInfo, ErrorResponse, Location, SCHEMA_VERSION};
pub use presso_java;
