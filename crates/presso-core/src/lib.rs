//! Core infrastructure for presso.
//!
//! This crate provides language-agnostic infrastructure:
//! - Text position conversion (line:col and byte offsets)
//! - Edit plans: spans, text edits, validation and the all-or-nothing applier
//! - Error types and error codes
//! - JSON output types for CLI responses

pub mod error;
pub mod output;
pub mod patch;
pub mod text;
pub mod types;
