//! Common types shared between error and output modules.

use serde::{Deserialize, Serialize};

use crate::patch::Span;
use crate::text::byte_offset_to_position_str;

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source file.
///
/// - `file`: path as given by the caller
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, counted in chars
/// - `byte_start` / `byte_end`: byte span, when the location names a token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub col: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_start: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_end: Option<usize>,
}

impl Location {
    /// Create a new location without byte offsets.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
            byte_start: None,
            byte_end: None,
        }
    }

    /// Create a location for `span` in `source`, computing line and column.
    pub fn from_span(file: impl Into<String>, source: &str, span: Span) -> Self {
        let (line, col) = byte_offset_to_position_str(source, span.start);
        Location {
            file: file.into(),
            line,
            col,
            byte_start: Some(span.start),
            byte_end: Some(span.end),
        }
    }

    /// Parse a location from "path:line:col" format.
    ///
    /// This parsing is robust against paths containing colons (e.g., Windows paths).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();
        if parts.len() != 3 {
            return None;
        }
        let col: u32 = parts[0].parse().ok()?;
        let line: u32 = parts[1].parse().ok()?;
        Some(Location::new(parts[2], line, col))
    }

    fn sort_key(&self) -> (&str, u32, u32) {
        (&self.file, self.line, self.col)
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

// ============================================================================
// SymbolInfo Type
// ============================================================================

/// Symbol descriptor for JSON output.
///
/// Named `SymbolInfo` to distinguish it from the resolver's internal symbol
/// table entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Symbol ID (stable for one analysis of one text).
    pub id: String,
    pub name: String,
    /// Symbol kind (type, method, field, local_variable, parameter).
    pub kind: String,
    /// Declaration location.
    pub location: Location,
    /// Enclosing type's symbol ID, for members.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl SymbolInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        location: Location,
    ) -> Self {
        SymbolInfo {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            location,
            container: None,
        }
    }

    /// Set the container symbol (builder pattern).
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod location_tests {
        use super::*;

        #[test]
        fn location_new_serializes_without_byte_offsets() {
            let json = serde_json::to_string(&Location::new("Foo.java", 42, 8)).unwrap();
            assert!(!json.contains("byte_start"));
            assert!(!json.contains("byte_end"));
            assert!(json.contains("\"file\":\"Foo.java\""));
            assert!(json.contains("\"line\":42"));
        }

        #[test]
        fn location_from_span() {
            let source = "class Foo {\n  int bar;\n}\n";
            let loc = Location::from_span("Foo.java", source, Span::new(18, 21));
            assert_eq!((loc.line, loc.col), (2, 7));
            assert_eq!(loc.byte_start, Some(18));
            assert_eq!(loc.byte_end, Some(21));
        }

        #[test]
        fn location_parse_valid() {
            let loc = Location::parse("src/Foo.java:42:5").unwrap();
            assert_eq!(loc.file, "src/Foo.java");
            assert_eq!(loc.line, 42);
            assert_eq!(loc.col, 5);
        }

        #[test]
        fn location_parse_windows_path() {
            let loc = Location::parse("C:/work/src/Foo.java:10:3").unwrap();
            assert_eq!(loc.file, "C:/work/src/Foo.java");
            assert_eq!(loc.line, 10);
        }

        #[test]
        fn location_parse_invalid() {
            assert!(Location::parse("Foo.java").is_none());
            assert!(Location::parse("Foo.java:42").is_none());
            assert!(Location::parse("Foo.java:abc:5").is_none());
        }

        #[test]
        fn locations_sort_by_file_line_col() {
            let mut locs = vec![
                Location::new("B.java", 1, 1),
                Location::new("A.java", 2, 1),
                Location::new("A.java", 1, 9),
            ];
            locs.sort();
            assert_eq!(locs[0], Location::new("A.java", 1, 9));
            assert_eq!(locs[2], Location::new("B.java", 1, 1));
        }
    }

    mod symbol_info_tests {
        use super::*;

        #[test]
        fn container_omitted_when_absent() {
            let sym = SymbolInfo::new("sym_3", "count", "local_variable", Location::new("A.java", 3, 9));
            let json = serde_json::to_string(&sym).unwrap();
            assert!(!json.contains("container"));
            assert!(json.contains("\"kind\":\"local_variable\""));
        }

        #[test]
        fn container_serialized() {
            let sym = SymbolInfo::new("sym_2", "run", "method", Location::new("A.java", 2, 10))
                .with_container("sym_1");
            let json = serde_json::to_string(&sym).unwrap();
            assert!(json.contains("\"container\":\"sym_1\""));
        }
    }
}
