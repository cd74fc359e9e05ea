//! Java language support for presso.
//!
//! The pipeline for one source text is:
//!
//! ```text
//! source -> tree (parse) -> scope (resolve) -> query | ops::rename -> apply
//! ```
//!
//! - [`tree`]: owned syntax tree over the tree-sitter Java grammar
//! - [`kinds`]: closed node-kind and symbol-kind tags
//! - [`scope`]: single-pass scope and symbol resolution
//! - [`query`]: symbol-at-position, references, enclosing declarations
//! - [`validation`]: Java identifier rules
//! - [`ops`]: edit planners (rename)
//! - [`analysis`]: the per-file facade tying the above together
//! - [`batch`]: fork-join analysis of many files
//! - [`project`]: package names, main classes and new-file templates

pub mod analysis;
pub mod batch;
pub mod error_bridges;
pub mod kinds;
pub mod ops;
pub mod project;
pub mod query;
pub mod scope;
pub mod tree;
pub mod validation;

pub use analysis::{JavaAnalysis, LookupError};
pub use kinds::{DeclarationKind, NodeKind, SymbolKind};
pub use tree::{parse, NodeId, ParseError, SyntaxTree};
