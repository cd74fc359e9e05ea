//! One analyzed source file.
//!
//! [`JavaAnalysis`] owns the syntax tree and scope tree of a file and answers
//! the dispatcher's requests in line/column terms. Query errors, which only
//! know byte offsets, are mapped to [`LookupError`]s that name the file and
//! the requested position.

use presso_core::error::PressoError;
use presso_core::output::{DeclarationInfo, FileRename, ReferenceInfo, Warning};
use presso_core::patch::Span;
use presso_core::text::Position;
use presso_core::types::{Location, SymbolInfo};
use thiserror::Error;
use tracing::debug;

use crate::kinds::DeclarationKind;
use crate::ops::rename::{self, RenameError, RenamePlan};
use crate::project;
use crate::query::{self, QueryError};
use crate::scope::{self, Diagnostic, DiagnosticKind, ScopeTree, SymbolId};
use crate::tree::{self, ParseError, SyntaxTree};

/// Unresolved names listed in a file-level warning before truncating.
const MAX_UNRESOLVED_LISTED: usize = 10;

/// Distance in bytes within which a near miss is suggested.
const NEAREST_SYMBOL_DISTANCE: usize = 10;

// ============================================================================
// Error Types
// ============================================================================

/// Errors from position-based lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("position {file}:{line}:{col} is out of range")]
    PositionOutOfRange { file: String, line: u32, col: u32 },

    #[error("position {file}:{line}:{col} is inside a syntax error region {region}")]
    PositionInErrorRegion {
        file: String,
        line: u32,
        col: u32,
        region: Span,
    },

    /// Includes the nearest symbol within a few bytes, to help with off-by-one positions.
    #[error("{}", format_symbol_not_found(.file, .line, .col, .nearest_symbol))]
    SymbolNotFound {
        file: String,
        line: u32,
        col: u32,
        nearest_symbol: Option<(String, Span)>,
    },

    #[error("no enclosing {kind} at {file}:{line}:{col}")]
    DeclarationNotFound {
        file: String,
        line: u32,
        col: u32,
        kind: DeclarationKind,
    },
}

fn format_symbol_not_found(
    file: &str,
    line: &u32,
    col: &u32,
    nearest_symbol: &Option<(String, Span)>,
) -> String {
    let mut msg = format!("no symbol found at {file}:{line}:{col}");
    if let Some((name, span)) = nearest_symbol {
        msg.push_str(&format!(
            "; nearest symbol: '{}' at bytes {}..{}",
            name, span.start, span.end
        ));
    }
    msg
}

/// Result type for lookup operations.
pub type LookupResult<T> = Result<T, LookupError>;

// ============================================================================
// Analysis
// ============================================================================

/// A parsed and resolved source file.
#[derive(Debug, Clone)]
pub struct JavaAnalysis {
    path: String,
    tree: SyntaxTree,
    scopes: ScopeTree,
}

impl JavaAnalysis {
    /// Parse and resolve `source`. `path` is only used for reporting.
    pub fn analyze(path: impl Into<String>, source: impl Into<String>) -> Result<Self, ParseError> {
        let path = path.into();
        let tree = tree::parse(source)?;
        let scopes = scope::resolve(&tree);
        debug!(
            file = %path,
            bytes = tree.source().len(),
            nodes = tree.len(),
            error_regions = tree.error_regions().len(),
            symbols = scopes.symbols().len(),
            "analyzed"
        );
        Ok(JavaAnalysis { path, tree, scopes })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn source(&self) -> &str {
        self.tree.source()
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    /// Byte offset of a 1-indexed line/column.
    pub fn offset_at(&self, line: u32, col: u32) -> LookupResult<usize> {
        self.tree
            .offset_of(Position::new(line, col))
            .ok_or_else(|| LookupError::PositionOutOfRange {
                file: self.path.clone(),
                line,
                col,
            })
    }

    /// The symbol at a line/column.
    pub fn locate_symbol(&self, line: u32, col: u32) -> LookupResult<SymbolId> {
        let offset = self.offset_at(line, col)?;
        query::symbol_at(&self.tree, &self.scopes, offset)
            .map_err(|e| self.lookup_error(e, line, col))
    }

    /// Every occurrence of a symbol, declaration first.
    pub fn list_references(&self, symbol: SymbolId) -> Vec<ReferenceInfo> {
        query::references_of(&self.scopes, symbol)
            .into_iter()
            .map(|r| ReferenceInfo::new(self.location(r.span), r.kind.as_str()))
            .collect()
    }

    /// Plan a rename. Collisions are reported with the clashing location.
    pub fn plan_rename(&self, symbol: SymbolId, new_name: &str) -> Result<RenamePlan, PressoError> {
        rename::plan_rename(&self.tree, &self.scopes, symbol, new_name).map_err(|e| match e {
            RenameError::NameCollision {
                name,
                reason,
                existing,
            } => PressoError::NameCollision {
                name,
                reason,
                existing: existing.map(|span| self.location(span)),
            },
            other => other.into(),
        })
    }

    /// The file move that accompanies renaming a top-level type.
    pub fn file_rename(&self, symbol: SymbolId, new_name: &str) -> Option<FileRename> {
        rename::file_rename_for(&self.path, &self.scopes, symbol, new_name)
    }

    /// The nearest declaration of `kind` around a line/column.
    pub fn enclosing_declaration(
        &self,
        line: u32,
        col: u32,
        kind: DeclarationKind,
    ) -> LookupResult<DeclarationInfo> {
        let offset = self.offset_at(line, col)?;
        let node = query::enclosing_declaration(&self.tree, offset, kind).map_err(|e| match e {
            QueryError::NotFound { .. } => LookupError::DeclarationNotFound {
                file: self.path.clone(),
                line,
                col,
                kind,
            },
            other => self.lookup_error(other, line, col),
        })?;

        let span = self.tree.span(node);
        Ok(DeclarationInfo {
            kind: kind.as_str().to_string(),
            node_kind: self.tree.node(node).kind_name.to_string(),
            name: query::declaration_name(&self.tree, node).map(str::to_string),
            location: self.location(span),
            span,
        })
    }

    /// Descriptor of a symbol for output.
    pub fn symbol_info(&self, symbol: SymbolId) -> SymbolInfo {
        let sym = self.scopes.symbol(symbol);
        let info = SymbolInfo::new(
            sym.id.to_string(),
            sym.name.clone(),
            sym.kind.as_str(),
            self.location(sym.declaration_span()),
        );
        match sym.container {
            Some(container) => info.with_container(container.to_string()),
            None => info,
        }
    }

    /// Number of occurrences of a symbol.
    pub fn occurrence_count(&self, symbol: SymbolId) -> u32 {
        self.scopes.symbol(symbol).occurrences.len() as u32
    }

    /// Warnings to attach to a response about one symbol.
    pub fn symbol_warnings(&self, symbol: SymbolId) -> Vec<Warning> {
        self.scopes
            .diagnostics_for(symbol)
            .map(|d| self.diagnostic_warning(d))
            .collect()
    }

    /// File-level warnings: syntax errors, duplicate declarations and a
    /// summary of names that resolve outside the file.
    pub fn file_warnings(&self) -> Vec<Warning> {
        let mut warnings: Vec<Warning> = self
            .tree
            .error_regions()
            .iter()
            .map(|&region| {
                Warning::with_location(
                    "syntax_error",
                    format!("unparseable source in {}", region),
                    self.location(region),
                )
            })
            .collect();

        warnings.extend(
            self.scopes
                .diagnostics()
                .iter()
                .filter(|d| d.kind == DiagnosticKind::DuplicateDeclaration)
                .map(|d| self.diagnostic_warning(d)),
        );

        let mut names: Vec<&str> = self
            .scopes
            .unresolved()
            .iter()
            .map(|u| u.name.as_str())
            .collect();
        names.sort_unstable();
        names.dedup();
        if !names.is_empty() {
            let listed = names
                .iter()
                .take(MAX_UNRESOLVED_LISTED)
                .copied()
                .collect::<Vec<_>>()
                .join(", ");
            let more = names.len().saturating_sub(MAX_UNRESOLVED_LISTED);
            let message = if more > 0 {
                format!("{} names do not resolve within this file: {}, and {} more", names.len(), listed, more)
            } else {
                format!("{} names do not resolve within this file: {}", names.len(), listed)
            };
            warnings.push(Warning::new(DiagnosticKind::UnresolvedReference.code(), message));
        }

        warnings
    }

    /// The file's package, if declared.
    pub fn package_name(&self) -> Option<String> {
        project::package_name(&self.tree)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn location(&self, span: Span) -> Location {
        Location::from_span(self.path.clone(), self.tree.source(), span)
    }

    fn diagnostic_warning(&self, diagnostic: &Diagnostic) -> Warning {
        let warning = Warning::with_location(
            diagnostic.kind.code(),
            diagnostic.message.clone(),
            self.location(diagnostic.span),
        );
        match diagnostic.kind {
            DiagnosticKind::DuplicateDeclaration => {
                warning.with_suggestion("rename one of the declarations")
            }
            DiagnosticKind::UnresolvedReference => warning,
        }
    }

    fn lookup_error(&self, error: QueryError, line: u32, col: u32) -> LookupError {
        let file = self.path.clone();
        match error {
            QueryError::OutOfRange { .. } => LookupError::PositionOutOfRange { file, line, col },
            QueryError::PositionInErrorRegion { region, .. } => LookupError::PositionInErrorRegion {
                file,
                line,
                col,
                region,
            },
            QueryError::NotFound { offset } => LookupError::SymbolNotFound {
                file,
                line,
                col,
                nearest_symbol: self.nearest_occurrence(offset),
            },
        }
    }

    fn nearest_occurrence(&self, offset: usize) -> Option<(String, Span)> {
        self.scopes
            .symbols()
            .iter()
            .flat_map(|s| s.occurrences.iter().map(move |o| (s, o.span)))
            .map(|(s, span)| {
                let distance = if offset < span.start {
                    span.start - offset
                } else {
                    offset.saturating_sub(span.end) + 1
                };
                (distance, span.start, s.name.clone(), span)
            })
            .filter(|(distance, ..)| *distance <= NEAREST_SYMBOL_DISTANCE)
            .min_by_key(|(distance, start, ..)| (*distance, *start))
            .map(|(_, _, name, span)| (name, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::SymbolKind;

    const SOURCE: &str = "package app;\n\nclass Foo {\n    int count;\n    void bump() {\n        count++;\n    }\n}\n";

    fn analysis() -> JavaAnalysis {
        JavaAnalysis::analyze("src/app/Foo.java", SOURCE).unwrap()
    }

    mod positions {
        use super::*;

        #[test]
        fn offset_at_checks_bounds() {
            let a = analysis();
            assert_eq!(a.offset_at(1, 1), Ok(0));
            assert!(matches!(
                a.offset_at(99, 1),
                Err(LookupError::PositionOutOfRange { line: 99, .. })
            ));
            assert!(a.offset_at(0, 1).is_err());
        }

        #[test]
        fn locate_symbol_by_line_col() {
            let a = analysis();
            let sym = a.locate_symbol(6, 9).unwrap();
            let info = a.symbol_info(sym);
            assert_eq!(info.name, "count");
            assert_eq!(info.kind, SymbolKind::Field.as_str());
            assert_eq!((info.location.line, info.location.col), (4, 9));
            assert!(info.container.is_some());
        }

        #[test]
        fn symbol_not_found_names_the_position() {
            let a = analysis();
            let err = a.locate_symbol(5, 18).unwrap_err();
            match err {
                LookupError::SymbolNotFound { file, line, col, .. } => {
                    assert_eq!(file, "src/app/Foo.java");
                    assert_eq!((line, col), (5, 18));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    mod references {
        use super::*;

        #[test]
        fn references_have_locations() {
            let a = analysis();
            let sym = a.locate_symbol(4, 9).unwrap();
            let refs = a.list_references(sym);
            assert_eq!(refs.len(), 2);
            assert_eq!(refs[0].kind, "declaration");
            assert_eq!((refs[1].location.line, refs[1].location.col), (6, 9));
            assert_eq!(a.occurrence_count(sym), 2);
        }
    }

    mod enclosing {
        use super::*;

        #[test]
        fn method_around_statement() {
            let a = analysis();
            let decl = a.enclosing_declaration(6, 9, DeclarationKind::Method).unwrap();
            assert_eq!(decl.name.as_deref(), Some("bump"));
            assert_eq!(decl.node_kind, "method_declaration");
            assert_eq!(decl.location.line, 5);
        }

        #[test]
        fn missing_kind() {
            let a = analysis();
            assert!(matches!(
                a.enclosing_declaration(6, 9, DeclarationKind::Lambda),
                Err(LookupError::DeclarationNotFound { .. })
            ));
        }
    }

    mod rename_facade {
        use super::*;

        #[test]
        fn collision_carries_location() {
            let a = JavaAnalysis::analyze("A.java", "class A { int a; int b; }").unwrap();
            let sym = a.locate_symbol(1, 15).unwrap();
            match a.plan_rename(sym, "b").unwrap_err() {
                PressoError::NameCollision { existing, .. } => {
                    let existing = existing.unwrap();
                    assert_eq!((existing.line, existing.col), (1, 22));
                }
                other => panic!("unexpected error: {other}"),
            }
        }

        #[test]
        fn file_rename_for_top_level_type() {
            let a = analysis();
            let sym = a.locate_symbol(3, 7).unwrap();
            let rename = a.file_rename(sym, "Bar").unwrap();
            assert_eq!(rename.to, "src/app/Bar.java");
        }
    }

    mod warnings {
        use super::*;

        #[test]
        fn duplicate_and_unresolved_warnings() {
            let source = "class A { void m() { int x = 1; int x = 2; print(y); } }";
            let a = JavaAnalysis::analyze("A.java", source).unwrap();
            let warnings = a.file_warnings();
            let codes: Vec<&str> = warnings.iter().map(|w| w.code.as_str()).collect();
            assert!(codes.contains(&"duplicate_declaration"));
            assert!(codes.contains(&"unresolved_reference"));
            let unresolved = warnings
                .iter()
                .find(|w| w.code == "unresolved_reference")
                .unwrap();
            assert!(unresolved.message.contains("print"));
            assert!(unresolved.message.contains('y'));
        }

        #[test]
        fn syntax_errors_become_warnings() {
            let a = JavaAnalysis::analyze("Bad.java", "class Bad { void m( }").unwrap();
            assert!(a
                .file_warnings()
                .iter()
                .any(|w| w.code == "syntax_error" && w.location.is_some()));
        }

        #[test]
        fn package_from_facade() {
            assert_eq!(analysis().package_name().as_deref(), Some("app"));
        }
    }
}
