//! Error types and error code constants for presso.
//!
//! This module provides a unified error type (`PressoError`) that bridges
//! domain-specific errors from the language engines (lookup, rename, parse)
//! and from the edit applier into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! Exit codes:
//! - `2`: Invalid arguments (bad input from caller, invalid identifier)
//! - `3`: Resolution errors (position, symbol, name collision, file not found)
//! - `4`: Apply errors (edit out of bounds, stale or invalid plan)
//! - `5`: Verification failed (rewritten text parses worse than the original)
//! - `10`: Internal errors (parser unavailable, unexpected state)

use std::fmt;

use thiserror::Error;

use crate::patch::{ApplyError, Span};

pub use crate::types::{Location, SymbolInfo};

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// Resolution errors (position out of range, symbol not found, collision).
    ResolutionError = 3,
    /// Apply errors (failed to apply or write changes).
    ApplyError = 4,
    /// Verification failed (syntax errors introduced by changes).
    VerificationFailed = 5,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
///
/// All engine errors are converted to this type before being rendered as
/// JSON output.
#[derive(Debug, Error)]
pub enum PressoError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// The grammar parser produced no tree at all.
    #[error("parse error: {reason}")]
    Parse {
        reason: String,
        offset: Option<usize>,
    },

    /// Requested line/column lies outside the text.
    #[error("position {file}:{line}:{col} is out of range")]
    PositionOutOfRange { file: String, line: u32, col: u32 },

    /// Requested position lies inside an unparseable fragment.
    #[error("position {file}:{line}:{col} is inside a syntax error region {region}")]
    PositionInErrorRegion {
        file: String,
        line: u32,
        col: u32,
        region: Span,
    },

    /// Symbol not found at the specified location.
    #[error("no symbol found at {file}:{line}:{col}")]
    SymbolNotFound { file: String, line: u32, col: u32 },

    /// Invalid identifier (syntax error or keyword in new name).
    #[error("invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// The new name would clash with an existing binding.
    #[error("name collision for '{name}': {reason}")]
    NameCollision {
        name: String,
        reason: String,
        existing: Option<Location>,
    },

    /// An edit range fell outside the text it was applied to.
    #[error("edit {span} is out of bounds for text of {len} bytes")]
    EditOutOfBounds { span: Span, len: usize },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Failed to apply changes.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// The rewritten text has more syntax errors than the original.
    #[error("verification failed for {file}: syntax error regions {before} -> {after}")]
    VerificationFailed {
        file: String,
        before: usize,
        after: usize,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&PressoError> for OutputErrorCode {
    fn from(err: &PressoError) -> Self {
        match err {
            PressoError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            PressoError::InvalidIdentifier { .. } => OutputErrorCode::InvalidArguments,
            PressoError::PositionOutOfRange { .. } => OutputErrorCode::ResolutionError,
            PressoError::PositionInErrorRegion { .. } => OutputErrorCode::ResolutionError,
            PressoError::SymbolNotFound { .. } => OutputErrorCode::ResolutionError,
            PressoError::NameCollision { .. } => OutputErrorCode::ResolutionError,
            PressoError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            PressoError::EditOutOfBounds { .. } => OutputErrorCode::ApplyError,
            PressoError::ApplyError { .. } => OutputErrorCode::ApplyError,
            PressoError::VerificationFailed { .. } => OutputErrorCode::VerificationFailed,
            PressoError::Parse { .. } => OutputErrorCode::InternalError,
            PressoError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<PressoError> for OutputErrorCode {
    fn from(err: PressoError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: ApplyError -> PressoError
// ============================================================================

impl From<ApplyError> for PressoError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::EditOutOfBounds { span, len } => PressoError::EditOutOfBounds { span, len },
            other => PressoError::ApplyError {
                message: other.to_string(),
                file: None,
            },
        }
    }
}

impl From<std::io::Error> for PressoError {
    fn from(err: std::io::Error) -> Self {
        PressoError::InternalError {
            message: format!("IO error: {}", err),
        }
    }
}

impl From<serde_json::Error> for PressoError {
    fn from(err: serde_json::Error) -> Self {
        PressoError::InternalError {
            message: format!("JSON error: {}", err),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl PressoError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        PressoError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        PressoError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a symbol not found error.
    pub fn symbol_not_found(file: impl Into<String>, line: u32, col: u32) -> Self {
        PressoError::SymbolNotFound {
            file: file.into(),
            line,
            col,
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        PressoError::FileNotFound { path: path.into() }
    }

    /// Create an apply error tied to a file.
    pub fn apply_failed(message: impl Into<String>, file: impl Into<String>) -> Self {
        PressoError::ApplyError {
            message: message.into(),
            file: Some(file.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        PressoError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
