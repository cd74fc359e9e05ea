//! Text position utilities for byte offset and line:column conversions.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Columns count Unicode scalar values, not bytes
//!
//! Offset → position conversions clamp to the end of the text and are meant
//! for display. [`Position::to_offset`] is checked and returns `None` for
//! anything outside the text, so caller-supplied positions are rejected rather
//! than silently moved.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::patch::Span;

// ============================================================================
// Position
// ============================================================================

/// A 1-indexed line:column position in a source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// 1-indexed line.
    pub line: u32,
    /// 1-indexed column, counted in chars.
    pub col: u32,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Position { line, col }
    }

    /// Compute the position of a byte offset (clamped to the content length).
    pub fn from_offset(content: &str, offset: usize) -> Self {
        let (line, col) = byte_offset_to_position_str(content, offset);
        Position { line, col }
    }

    /// Convert to a byte offset, or `None` if the position lies outside `content`.
    ///
    /// Valid positions are every char on every line plus the end of each line
    /// (one column past the last char). A text ending in `\n` also has a
    /// valid position `(line_count + 1, 1)` at the end of the content.
    pub fn to_offset(&self, content: &str) -> Option<usize> {
        if self.line == 0 || self.col == 0 {
            return None;
        }

        let line_start = line_start_offsets(content)
            .get((self.line - 1) as usize)
            .copied()?;

        let line_text = &content[line_start..];
        let line_text = match line_text.find('\n') {
            Some(end) => &line_text[..end],
            None => line_text,
        };

        let target = (self.col - 1) as usize;
        let mut chars = line_text.char_indices();
        match chars.nth(target) {
            Some((offset, _)) => Some(line_start + offset),
            None if line_text.chars().count() == target => Some(line_start + line_text.len()),
            None => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

// ============================================================================
// Byte-based Conversions (for &[u8])
// ============================================================================

/// Convert a byte offset to 1-indexed line and column.
///
/// Columns count bytes, not characters. This is what diff hunks use.
/// If `offset` exceeds content length, returns position at end of content.
pub fn byte_offset_to_position(content: &[u8], offset: usize) -> (u32, u32) {
    let offset = offset.min(content.len());
    let mut line = 1u32;
    let mut col = 1u32;

    for &byte in &content[..offset] {
        if byte == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

// ============================================================================
// Char-based Conversions (for &str)
// ============================================================================

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// Columns count Unicode scalar values (chars), not bytes.
/// This is appropriate for user-facing positions.
pub fn byte_offset_to_position_str(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current_offset = 0usize;

    for ch in content.chars() {
        if current_offset >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current_offset += ch.len_utf8();
    }

    (line, col)
}

// ============================================================================
// Span Utilities
// ============================================================================

/// Get the line range spanned by a byte span.
///
/// Returns `(start_line, end_line)` both 1-indexed.
pub fn span_to_line_range(content: &[u8], span: &Span) -> (u32, u32) {
    let (start_line, _) = byte_offset_to_position(content, span.start);
    let (end_line, _) =
        byte_offset_to_position(content, span.end.saturating_sub(1).max(span.start));
    (start_line, end_line)
}

// ============================================================================
// Line Utilities
// ============================================================================

/// Byte offsets at which each line starts.
///
/// The first entry is always 0. A trailing `\n` yields a final entry equal to
/// `content.len()` for the empty last line.
pub fn line_start_offsets(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        content
            .bytes()
            .enumerate()
            .filter(|&(_, b)| b == b'\n')
            .map(|(i, _)| i + 1),
    );
    starts
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod position_tests {
        use super::*;

        #[test]
        fn to_offset_simple() {
            let content = "class A {\n  int x;\n}\n";
            assert_eq!(Position::new(1, 1).to_offset(content), Some(0));
            assert_eq!(Position::new(1, 7).to_offset(content), Some(6));
            assert_eq!(Position::new(2, 7).to_offset(content), Some(16));
            assert_eq!(Position::new(3, 1).to_offset(content), Some(19));
        }

        #[test]
        fn end_of_line_is_valid() {
            let content = "ab\ncd";
            assert_eq!(Position::new(1, 3).to_offset(content), Some(2));
            assert_eq!(Position::new(2, 3).to_offset(content), Some(5));
        }

        #[test]
        fn past_end_of_line_rejected() {
            let content = "ab\ncd";
            assert_eq!(Position::new(1, 4).to_offset(content), None);
            assert_eq!(Position::new(2, 10).to_offset(content), None);
        }

        #[test]
        fn zero_line_or_col_rejected() {
            let content = "ab";
            assert_eq!(Position::new(0, 1).to_offset(content), None);
            assert_eq!(Position::new(1, 0).to_offset(content), None);
        }

        #[test]
        fn line_past_end_rejected() {
            assert_eq!(Position::new(2, 1).to_offset("ab"), None);
            assert_eq!(Position::new(5, 1).to_offset("ab\n"), None);
        }

        #[test]
        fn trailing_newline_final_line() {
            let content = "ab\n";
            assert_eq!(Position::new(2, 1).to_offset(content), Some(3));
            assert_eq!(Position::new(2, 2).to_offset(content), None);
        }

        #[test]
        fn multibyte_columns_count_chars() {
            let content = "String s = \"héllo\"; int y;";
            // 'i' of "int" is char 21 (1-indexed), byte 21 because of the 2-byte 'é'
            assert_eq!(Position::new(1, 21).to_offset(content), Some(21));
            assert_eq!(&content[21..24], "int");
        }

        #[test]
        fn from_offset_agrees_with_to_offset() {
            let content = "class A {\n  void m() {}\n}\n";
            for offset in 0..content.len() {
                let pos = Position::from_offset(content, offset);
                assert_eq!(pos.to_offset(content), Some(offset), "offset {}", offset);
            }
        }

        #[test]
        fn empty_content() {
            assert_eq!(Position::new(1, 1).to_offset(""), Some(0));
            assert_eq!(Position::from_offset("", 0), Position::new(1, 1));
        }

        #[test]
        fn display() {
            assert_eq!(Position::new(3, 14).to_string(), "3:14");
        }
    }

    mod byte_based_tests {
        use super::*;

        #[test]
        fn offset_to_position_simple() {
            let content = b"line1\nline2\nline3\n";
            assert_eq!(byte_offset_to_position(content, 0), (1, 1));
            assert_eq!(byte_offset_to_position(content, 4), (1, 5));
            assert_eq!(byte_offset_to_position(content, 5), (1, 6));
            assert_eq!(byte_offset_to_position(content, 6), (2, 1));
            assert_eq!(byte_offset_to_position(content, 12), (3, 1));
        }

        #[test]
        fn offset_beyond_content() {
            assert_eq!(byte_offset_to_position(b"short", 100), (1, 6));
        }
    }

    mod char_based_tests {
        use super::*;

        #[test]
        fn offset_to_position_str_simple() {
            let content = "int a;\nint b;\n";
            assert_eq!(byte_offset_to_position_str(content, 0), (1, 1));
            assert_eq!(byte_offset_to_position_str(content, 4), (1, 5));
            assert_eq!(byte_offset_to_position_str(content, 7), (2, 1));
        }
    }

    mod span_tests {
        use super::*;

        #[test]
        fn span_to_line_range_multi_line() {
            let content = b"line1\nline2\nline3\n";
            assert_eq!(span_to_line_range(content, &Span::new(0, 11)), (1, 2));
            assert_eq!(span_to_line_range(content, &Span::new(6, 8)), (2, 2));
        }
    }

    mod line_utilities {
        use super::*;

        #[test]
        fn line_starts() {
            assert_eq!(line_start_offsets(""), vec![0]);
            assert_eq!(line_start_offsets("a\nbc\n"), vec![0, 2, 5]);
            assert_eq!(line_start_offsets("a\nbc"), vec![0, 2]);
        }
    }
}
