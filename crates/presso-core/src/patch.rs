//! Edit plans: spans, text edits, validation and atomic apply.
//!
//! This module implements the edit infrastructure shared by every refactoring:
//! - Byte spans and replacement edits
//! - Plan validation (overlaps, bounds) with a descending-offset ordering
//! - Atomic apply semantics (all-or-nothing, never mutates the input)
//! - Plan materialization (per-edit old/new text, unified diff)
//!
//! A plan is bound to the exact text it was computed against through a
//! SHA-256 content hash. Applying it to any other text is refused.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use tracing::debug;

use crate::text::{byte_offset_to_position_str, line_start_offsets, span_to_line_range};

/// Hash type for content verification (SHA-256, stored as hex string for JSON compatibility).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
    /// Compute SHA-256 hash of the given bytes, returning hex-encoded string.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hex::encode(hasher.finalize()))
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Core Types
// ============================================================================

/// Byte offsets into source text.
///
/// Spans are half-open intervals: `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Create a new span.
    ///
    /// # Panics
    /// Panics if `start > end`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(
            start <= end,
            "Span start ({}) must be <= end ({})",
            start,
            end
        );
        Span { start, end }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check if this span overlaps with another.
    ///
    /// Two spans overlap if they share any byte positions.
    /// Adjacent spans (one ends where another starts) do NOT overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Check if this span contains another span entirely.
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Check if a byte offset falls inside this span.
    ///
    /// An empty span contains only its own start offset.
    pub fn contains_offset(&self, offset: usize) -> bool {
        if self.is_empty() {
            offset == self.start
        } else {
            self.start <= offset && offset < self.end
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

// ============================================================================
// Edits
// ============================================================================

/// Replace the bytes of `span` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub span: Span,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(span: Span, new_text: impl Into<String>) -> Self {
        TextEdit {
            span,
            new_text: new_text.into(),
        }
    }
}

/// Optional labels for provenance tracking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditLabels {
    /// The operation that generated the plan (e.g. `rename`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    /// The symbol the plan relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Human-readable reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ============================================================================
// Conflict Detection
// ============================================================================

/// A problem that prevents a plan from being marked valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EditConflict {
    /// Two edits touch the same bytes (or start at the same offset).
    Overlapping { first: Span, second: Span },
    /// An edit reaches past the end of the source text.
    OutOfBounds { span: Span, source_len: usize },
}

impl fmt::Display for EditConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditConflict::Overlapping { first, second } => {
                write!(f, "edits {} and {} overlap", first, second)
            }
            EditConflict::OutOfBounds { span, source_len } => {
                write!(f, "edit {} is outside source of {} bytes", span, source_len)
            }
        }
    }
}

// ============================================================================
// Edit Plan
// ============================================================================

/// An ordered set of non-overlapping edits against one source text.
///
/// Edits are kept sorted by start offset, descending, once the plan is
/// finalized. `valid` is only set by [`EditPlan::finalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPlan {
    /// Hash of the text the plan was computed against.
    pub source_hash: ContentHash,
    /// Length in bytes of that text.
    pub source_len: usize,
    /// Edits, descending by start offset.
    pub edits: Vec<TextEdit>,
    /// Set once the plan passed validation.
    pub valid: bool,
    #[serde(default)]
    pub labels: EditLabels,
}

impl EditPlan {
    /// Create an empty, not yet validated plan for `source`.
    pub fn new(source: &str) -> Self {
        EditPlan {
            source_hash: ContentHash::compute(source.as_bytes()),
            source_len: source.len(),
            edits: Vec::new(),
            valid: false,
            labels: EditLabels::default(),
        }
    }

    /// Add an edit (builder pattern).
    pub fn with_edit(mut self, edit: TextEdit) -> Self {
        self.push(edit);
        self
    }

    /// Attach provenance labels (builder pattern).
    pub fn with_labels(mut self, labels: EditLabels) -> Self {
        self.labels = labels;
        self
    }

    /// Add an edit. Invalidates the plan until it is finalized again.
    pub fn push(&mut self, edit: TextEdit) {
        self.edits.push(edit);
        self.valid = false;
    }

    /// Check if the plan has any edits.
    pub fn has_edits(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Get the number of edits.
    pub fn edit_count(&self) -> usize {
        self.edits.len()
    }

    /// Bytes inserted by all edits.
    pub fn bytes_added(&self) -> usize {
        self.edits.iter().map(|e| e.new_text.len()).sum()
    }

    /// Bytes replaced by all edits.
    pub fn bytes_removed(&self) -> usize {
        self.edits.iter().map(|e| e.span.len()).sum()
    }

    /// Sort edits by start offset, descending.
    pub fn sort_edits(&mut self) {
        self.edits
            .sort_by(|a, b| b.span.start.cmp(&a.span.start).then(b.span.end.cmp(&a.span.end)));
    }

    /// Detect conflicts within this plan.
    ///
    /// Returns a list of all detected conflicts. An empty list means no conflicts.
    #[must_use]
    pub fn detect_conflicts(&self) -> Vec<EditConflict> {
        let mut conflicts = Vec::new();

        for edit in &self.edits {
            if edit.span.start > edit.span.end || edit.span.end > self.source_len {
                conflicts.push(EditConflict::OutOfBounds {
                    span: edit.span,
                    source_len: self.source_len,
                });
            }
        }

        let mut spans: Vec<Span> = self.edits.iter().map(|e| e.span).collect();
        spans.sort();
        for pair in spans.windows(2) {
            let (first, second) = (pair[0], pair[1]);
            if first.overlaps(&second) || first.start == second.start {
                conflicts.push(EditConflict::Overlapping { first, second });
            }
        }

        conflicts
    }

    /// Sort the edits, verify them and mark the plan valid.
    pub fn finalize(mut self) -> Result<Self, Vec<EditConflict>> {
        self.sort_edits();
        let conflicts = self.detect_conflicts();
        if !conflicts.is_empty() {
            return Err(conflicts);
        }
        self.valid = true;
        Ok(self)
    }

    /// Apply this plan to `source`. See [`apply`].
    pub fn apply(&self, source: &str) -> Result<String, ApplyError> {
        apply(source, self)
    }
}

// ============================================================================
// Atomic Apply
// ============================================================================

/// Reasons an apply is refused. Nothing is written in any of these cases.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    /// The plan was never finalized.
    #[error("edit plan has not been validated")]
    InvalidPlan,

    /// The text differs from the one the plan was computed against.
    #[error("source changed since the plan was computed (expected {expected}, found {actual})")]
    SourceChanged {
        expected: ContentHash,
        actual: ContentHash,
    },

    /// Two edits overlap.
    #[error("overlapping edits {first} and {second}")]
    Overlapping { first: Span, second: Span },

    /// An edit range lies outside the current text or splits a char.
    #[error("edit {span} is out of bounds for text of {len} bytes")]
    EditOutOfBounds { span: Span, len: usize },
}

/// Apply `plan` to `source`, producing a new buffer.
///
/// Either every edit applies, or an error is returned and no text is produced.
///
/// # Ordering
///
/// Edits are spliced in descending start-offset order, so every not yet
/// applied edit still refers to unshifted offsets.
pub fn apply(source: &str, plan: &EditPlan) -> Result<String, ApplyError> {
    if !plan.valid {
        return Err(ApplyError::InvalidPlan);
    }

    let actual = ContentHash::compute(source.as_bytes());
    if actual != plan.source_hash {
        return Err(ApplyError::SourceChanged {
            expected: plan.source_hash.clone(),
            actual,
        });
    }

    for conflict in plan.detect_conflicts() {
        if let EditConflict::Overlapping { first, second } = conflict {
            return Err(ApplyError::Overlapping { first, second });
        }
    }

    let mut ordered: Vec<&TextEdit> = plan.edits.iter().collect();
    ordered.sort_by(|a, b| b.span.start.cmp(&a.span.start));

    let mut buffer = source.to_string();
    for edit in ordered {
        let Span { start, end } = edit.span;
        if start > end
            || end > buffer.len()
            || !buffer.is_char_boundary(start)
            || !buffer.is_char_boundary(end)
        {
            return Err(ApplyError::EditOutOfBounds {
                span: edit.span,
                len: buffer.len(),
            });
        }
        buffer.replace_range(start..end, &edit.new_text);
    }

    debug!(
        edits = plan.edits.len(),
        old_len = source.len(),
        new_len = buffer.len(),
        "applied edit plan"
    );

    Ok(buffer)
}

// ============================================================================
// Plan Materialization
// ============================================================================

/// A single edit as it appears in output (for JSON serialization).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEdit {
    /// File path as given by the caller.
    pub file: String,
    /// Byte range being replaced.
    pub span: Span,
    /// Original text (for verification).
    pub old_text: String,
    /// Replacement text.
    pub new_text: String,
    /// 1-indexed line number (for display).
    pub line: u32,
    /// 1-indexed column (for display).
    pub col: u32,
}

/// Materialized plan output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializedPatch {
    /// Individual edits, ascending by span start.
    pub edits: Vec<OutputEdit>,
    /// Standard unified diff format.
    pub unified_diff: String,
}

impl EditPlan {
    /// Materialize this plan to output format.
    ///
    /// Requires the source text to compute old_text and line/col positions.
    pub fn materialize(&self, source: &str, path: &str) -> MaterializedPatch {
        let mut ascending: Vec<&TextEdit> = self.edits.iter().collect();
        ascending.sort_by_key(|e| e.span.start);

        let edits = ascending
            .iter()
            .map(|edit| {
                let (line, col) = byte_offset_to_position_str(source, edit.span.start);
                OutputEdit {
                    file: path.to_string(),
                    span: edit.span,
                    old_text: source
                        .get(edit.span.start..edit.span.end)
                        .unwrap_or_default()
                        .to_string(),
                    new_text: edit.new_text.clone(),
                    line,
                    col,
                }
            })
            .collect();

        MaterializedPatch {
            edits,
            unified_diff: generate_unified_diff(path, source, &ascending),
        }
    }
}

/// Edits grouped by the whole lines they touch.
struct Hunk<'a> {
    first_line: usize,
    last_line: usize,
    edits: Vec<&'a TextEdit>,
}

/// Generate a line-based unified diff (no context lines) for ascending edits.
fn generate_unified_diff(path: &str, source: &str, edits: &[&TextEdit]) -> String {
    if edits.is_empty() || edits.iter().any(|e| source.get(e.span.start..e.span.end).is_none()) {
        return String::new();
    }

    let line_starts = line_start_offsets(source);
    let mut hunks: Vec<Hunk<'_>> = Vec::new();

    for &edit in edits {
        let (start_line, end_line) = span_to_line_range(source.as_bytes(), &edit.span);
        let (first, last) = (start_line as usize - 1, end_line as usize - 1);
        match hunks.last_mut() {
            Some(hunk) if hunk.last_line >= first => {
                hunk.last_line = hunk.last_line.max(last);
                hunk.edits.push(edit);
            }
            _ => hunks.push(Hunk {
                first_line: first,
                last_line: last,
                edits: vec![edit],
            }),
        }
    }

    let mut diff = format!("--- a/{}\n+++ b/{}\n", path, path);
    let mut line_delta: i64 = 0;

    for hunk in hunks {
        let start = line_starts[hunk.first_line];
        let end = line_starts
            .get(hunk.last_line + 1)
            .copied()
            .unwrap_or(source.len());
        let old = &source[start..end];

        let mut new = old.to_string();
        for edit in hunk.edits.iter().rev() {
            new.replace_range(edit.span.start - start..edit.span.end - start, &edit.new_text);
        }

        let old_lines: Vec<&str> = old.lines().collect();
        let new_lines: Vec<&str> = new.lines().collect();
        let old_start = hunk.first_line as i64 + 1;

        diff.push_str(&format!(
            "@@ -{},{} +{},{} @@\n",
            old_start,
            old_lines.len(),
            old_start + line_delta,
            new_lines.len()
        ));
        push_lines(&mut diff, '-', &old_lines, !old.is_empty() && !old.ends_with('\n'));
        push_lines(&mut diff, '+', &new_lines, !new.is_empty() && !new.ends_with('\n'));

        line_delta += new_lines.len() as i64 - old_lines.len() as i64;
    }

    diff
}

fn push_lines(diff: &mut String, marker: char, lines: &[&str], missing_newline: bool) {
    for line in lines {
        diff.push(marker);
        diff.push_str(line);
        diff.push('\n');
    }
    if missing_newline && !lines.is_empty() {
        diff.push_str("\\ No newline at end of file\n");
    }
}

// ============================================================================
// Tests
// ============================================================================
