//! Bridges from Java engine errors to [`PressoError`].
//!
//! The engine's error types live in this crate, so the `From` impls do too.

use presso_core::error::PressoError;

use crate::analysis::LookupError;
use crate::batch::BatchError;
use crate::ops::rename::RenameError;
use crate::project::ProjectError;
use crate::tree::ParseError;
use crate::validation::ValidationError;

// ============================================================================
// Bridge: ParseError -> PressoError
// ============================================================================

impl From<ParseError> for PressoError {
    fn from(err: ParseError) -> Self {
        PressoError::Parse {
            reason: err.reason,
            offset: err.offset,
        }
    }
}

// ============================================================================
// Bridge: ValidationError -> PressoError
// ============================================================================

impl From<ValidationError> for PressoError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidName { name, reason } => {
                PressoError::InvalidIdentifier { name, reason }
            }
        }
    }
}

// ============================================================================
// Bridge: LookupError -> PressoError
// ============================================================================

impl From<LookupError> for PressoError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::PositionOutOfRange { file, line, col } => {
                PressoError::PositionOutOfRange { file, line, col }
            }
            LookupError::PositionInErrorRegion {
                file,
                line,
                col,
                region,
            } => PressoError::PositionInErrorRegion {
                file,
                line,
                col,
                region,
            },
            LookupError::SymbolNotFound { file, line, col, .. } => {
                PressoError::SymbolNotFound { file, line, col }
            }
            LookupError::DeclarationNotFound { file, line, col, .. } => {
                PressoError::SymbolNotFound { file, line, col }
            }
        }
    }
}

// ============================================================================
// Bridge: RenameError -> PressoError
// ============================================================================

impl From<RenameError> for PressoError {
    fn from(err: RenameError) -> Self {
        match err {
            RenameError::InvalidName(e) => e.into(),
            RenameError::NameCollision { name, reason, .. } => PressoError::NameCollision {
                name,
                reason,
                existing: None,
            },
            RenameError::Conflict { conflicts } => PressoError::InternalError {
                message: format!(
                    "rename produced conflicting edits: {}",
                    conflicts
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ")
                ),
            },
        }
    }
}

// ============================================================================
// Bridge: BatchError / ProjectError -> PressoError
// ============================================================================

impl From<BatchError> for PressoError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::Io { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                PressoError::FileNotFound { path }
            }
            BatchError::Io { path, source } => PressoError::InternalError {
                message: format!("cannot read {}: {}", path, source),
            },
            BatchError::Parse { source, .. } => source.into(),
        }
    }
}

impl From<ProjectError> for PressoError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::InvalidName(e) => e.into(),
            ProjectError::NotADirectory { path } => PressoError::FileNotFound { path },
            ProjectError::EmptyPackage => PressoError::invalid_args("package name cannot be empty"),
            ProjectError::Io(e) => e.into(),
            other @ (ProjectError::NoMainClass { .. } | ProjectError::MissingPackage { .. }) => {
                PressoError::invalid_args(other.to_string())
            }
        }
    }
}
