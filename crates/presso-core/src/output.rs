//! JSON output types and serialization for CLI responses.
//!
//! These types form the contract with editor integrations.
//!
//! ## Design Principles
//!
//! 1. **Structured JSON:** All CLI output on stdout is valid JSON
//! 2. **Status first:** Every response has `status` as first field
//! 3. **Deterministic:** Same input -> same output (field order, array ordering)
//! 4. **Versioned:** Schema version in response enables forward compatibility

use std::io::{self, Write};

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{OutputErrorCode, PressoError};
use crate::patch::{EditPlan, MaterializedPatch, Span};

pub use crate::types::{Location, SymbolInfo};

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Reference information for JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceInfo {
    pub location: Location,
    /// Kind of occurrence (declaration, reference, constructor).
    pub kind: String,
}

impl ReferenceInfo {
    pub fn new(location: Location, kind: impl Into<String>) -> Self {
        ReferenceInfo {
            location,
            kind: kind.into(),
        }
    }
}

/// Warning information for JSON output.
///
/// Non-fatal diagnostics (duplicate declarations, unresolved references)
/// travel as warnings next to a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    /// Stable warning code.
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Warning {
    /// Create a simple warning without location.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Warning {
            code: code.into(),
            message: message.into(),
            location: None,
            suggestion: None,
        }
    }

    /// Create a warning with location.
    pub fn with_location(
        code: impl Into<String>,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Warning {
            code: code.into(),
            message: message.into(),
            location: Some(location),
            suggestion: None,
        }
    }

    /// Attach a suggested action (builder pattern).
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ============================================================================
// Summary Types
// ============================================================================

/// Summary of an edit plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub files_changed: u32,
    pub edits_count: u32,
    pub bytes_added: i64,
    pub bytes_removed: i64,
}

impl Summary {
    /// Summarize a single-file plan.
    pub fn from_plan(plan: &EditPlan) -> Self {
        Summary {
            files_changed: u32::from(plan.has_edits()),
            edits_count: plan.edit_count() as u32,
            bytes_added: plan.bytes_added() as i64,
            bytes_removed: plan.bytes_removed() as i64,
        }
    }
}

/// A file move that accompanies a type rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRename {
    pub from: String,
    pub to: String,
}

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code (exit code).
    pub code: u8,
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Where the error occurred.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ErrorInfo {
    /// Create from a PressoError.
    pub fn from_error(err: &PressoError) -> Self {
        let code = OutputErrorCode::from(err).code();
        let message = err.to_string();

        let (details, location) = match err {
            PressoError::SymbolNotFound { file, line, col }
            | PressoError::PositionOutOfRange { file, line, col } => {
                (None, Some(Location::new(file.clone(), *line, *col)))
            }
            PressoError::PositionInErrorRegion {
                file,
                line,
                col,
                region,
            } => (
                Some(serde_json::json!({ "region": region })),
                Some(Location::new(file.clone(), *line, *col)),
            ),
            PressoError::NameCollision { existing, .. } => (None, existing.clone()),
            PressoError::InvalidArguments { details, .. } => (details.clone(), None),
            PressoError::FileNotFound { path } => (Some(serde_json::json!({ "path": path })), None),
            PressoError::ApplyError { file, .. } => {
                (file.as_ref().map(|f| serde_json::json!({ "file": f })), None)
            }
            PressoError::EditOutOfBounds { span, len } => (
                Some(serde_json::json!({ "span": span, "len": len })),
                None,
            ),
            PressoError::Parse {
                offset: Some(offset),
                ..
            } => (Some(serde_json::json!({ "offset": offset })), None),
            PressoError::VerificationFailed {
                file,
                before,
                after,
            } => (
                Some(serde_json::json!({
                    "file": file,
                    "error_regions_before": before,
                    "error_regions_after": after
                })),
                None,
            ),
            _ => (None, None),
        };

        ErrorInfo {
            code,
            message,
            details,
            location,
        }
    }
}

// ============================================================================
// Response Structs
// ============================================================================

/// Response for `locate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolResponse {
    pub status: String,
    pub schema_version: String,
    pub symbol: SymbolInfo,
    /// Number of occurrences (declarations and references).
    pub occurrences: u32,
    #[serde(serialize_with = "serialize_sorted_warnings")]
    pub warnings: Vec<Warning>,
}

impl SymbolResponse {
    pub fn new(symbol: SymbolInfo, occurrences: u32, warnings: Vec<Warning>) -> Self {
        SymbolResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            symbol,
            occurrences,
            warnings,
        }
    }
}

/// Response for `references`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferencesResponse {
    pub status: String,
    pub schema_version: String,
    pub symbol: SymbolInfo,
    /// Declaration first, then uses in source order.
    pub references: Vec<ReferenceInfo>,
    #[serde(serialize_with = "serialize_sorted_warnings")]
    pub warnings: Vec<Warning>,
}

impl ReferencesResponse {
    pub fn new(symbol: SymbolInfo, references: Vec<ReferenceInfo>, warnings: Vec<Warning>) -> Self {
        ReferencesResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            symbol,
            references,
            warnings,
        }
    }
}

/// Response for `rename`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResponse {
    pub status: String,
    pub schema_version: String,
    pub symbol: SymbolInfo,
    pub new_name: String,
    /// The plan, reusable with `apply-plan`.
    pub plan: EditPlan,
    pub patch: MaterializedPatch,
    pub summary: Summary,
    /// Whether the edits were written to disk.
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_rename: Option<FileRename>,
    #[serde(serialize_with = "serialize_sorted_warnings")]
    pub warnings: Vec<Warning>,
}

/// Response for `apply-plan`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub status: String,
    pub schema_version: String,
    pub file: String,
    pub summary: Summary,
    /// Whether the new text was written to disk.
    pub applied: bool,
    /// The new text, when not written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
}

impl ApplyResponse {
    pub fn new(file: impl Into<String>, summary: Summary) -> Self {
        ApplyResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file: file.into(),
            summary,
            applied: false,
            new_text: None,
        }
    }
}

/// A declaration node reported by `enclosing`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationInfo {
    /// Declaration kind (type, method, constructor, field, ...).
    pub kind: String,
    /// Grammar node kind (e.g. `method_declaration`).
    pub node_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub location: Location,
    pub span: Span,
}

/// Response for `enclosing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclarationResponse {
    pub status: String,
    pub schema_version: String,
    pub declaration: DeclarationInfo,
}

impl DeclarationResponse {
    pub fn new(declaration: DeclarationInfo) -> Self {
        DeclarationResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            declaration,
        }
    }
}

/// Per-file result of `check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCheck {
    pub file: String,
    /// Whether analysis ran (false when the file could not be read or parsed).
    pub analyzed: bool,
    pub error_regions: u32,
    pub symbols: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(serialize_with = "serialize_sorted_warnings")]
    pub warnings: Vec<Warning>,
}

/// Response for `check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub status: String,
    pub schema_version: String,
    pub files: Vec<FileCheck>,
    pub files_with_errors: u32,
    pub warnings_count: u32,
}

impl CheckResponse {
    pub fn new(mut files: Vec<FileCheck>) -> Self {
        files.sort_by(|a, b| a.file.cmp(&b.file));
        let files_with_errors = files
            .iter()
            .filter(|f| !f.analyzed || f.error_regions > 0)
            .count() as u32;
        let warnings_count = files.iter().map(|f| f.warnings.len() as u32).sum();
        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            files,
            files_with_errors,
            warnings_count,
        }
    }
}

/// Response for `get-main-class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MainClassResponse {
    pub status: String,
    pub schema_version: String,
    pub file_path: String,
    pub package_name: String,
}

impl MainClassResponse {
    pub fn new(file_path: impl Into<String>, package_name: impl Into<String>) -> Self {
        MainClassResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file_path: file_path.into(),
            package_name: package_name.into(),
        }
    }
}

/// Response for `create-new-file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileResponse {
    pub status: String,
    pub schema_version: String,
    pub file_path: String,
}

impl CreateFileResponse {
    pub fn new(file_path: impl Into<String>) -> Self {
        CreateFileResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            file_path: file_path.into(),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    pub schema_version: String,
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a PressoError.
    pub fn from_error(err: &PressoError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Deterministic Sorting
// ============================================================================

/// Serialize warnings sorted by location (if present).
fn serialize_sorted_warnings<S>(warnings: &[Warning], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut sorted: Vec<_> = warnings.iter().collect();
    sorted.sort_by(|a, b| match (&a.location, &b.location) {
        (Some(loc_a), Some(loc_b)) => loc_a.cmp(loc_b).then_with(|| a.code.cmp(&b.code)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.code.cmp(&b.code),
    });
    sorted.serialize(serializer)
}

// ============================================================================
// Response Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
///
/// This is the single output path for CLI, ensuring consistency.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
