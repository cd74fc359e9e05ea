//! Point queries over a resolved file.
//!
//! All queries take byte offsets; line/column conversion happens in
//! [`crate::analysis`].

use presso_core::patch::Span;
use thiserror::Error;
use tracing::trace;

use crate::kinds::{DeclarationKind, NodeKind};
use crate::scope::{OccurrenceKind, ScopeTree, SymbolId};
use crate::tree::{NodeId, SyntaxTree};

// ============================================================================
// Error Types
// ============================================================================

/// Errors from point queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The offset lies inside a fragment the grammar could not parse.
    #[error("offset {offset} is inside a syntax error region {region}")]
    PositionInErrorRegion { offset: usize, region: Span },

    /// Nothing of the requested shape at the offset.
    #[error("nothing found at offset {offset}")]
    NotFound { offset: usize },

    #[error("offset {offset} is past the end of the text ({len} bytes)")]
    OutOfRange { offset: usize, len: usize },
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// One occurrence returned by [`references_of`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub span: Span,
    pub kind: OccurrenceKind,
}

// ============================================================================
// Queries
// ============================================================================

/// The symbol at a byte offset.
///
/// Tried in order:
/// 1. an occurrence containing the offset
/// 2. an occurrence ending at the offset (cursor right after a name)
/// 3. the nearest declaration whose header contains the offset, e.g. the
///    `void` of a method; bodies and argument lists stop the search
pub fn symbol_at(tree: &SyntaxTree, scopes: &ScopeTree, offset: usize) -> QueryResult<SymbolId> {
    check_offset(tree, offset)?;

    if let Some((span, sym)) = scopes.occurrence_at(offset) {
        trace!(offset, %span, %sym, "occurrence hit");
        return Ok(sym);
    }
    if let Some((span, sym)) = scopes.occurrence_ending_at(offset) {
        trace!(offset, %span, %sym, "occurrence ends at offset");
        return Ok(sym);
    }

    let start = tree.node_at(offset);
    for node in std::iter::once(start).chain(tree.ancestors(start)) {
        if stops_declaration_search(tree, node) {
            break;
        }
        if let Some(sym) = declared_symbol(tree, scopes, node) {
            trace!(offset, node = tree.node(node).kind_name, %sym, "declaration header");
            return Ok(sym);
        }
    }

    Err(QueryError::NotFound { offset })
}

/// Every occurrence of a symbol: declaration first, then the rest in source order.
pub fn references_of(scopes: &ScopeTree, symbol: SymbolId) -> Vec<Reference> {
    scopes
        .symbol(symbol)
        .occurrences
        .iter()
        .map(|o| Reference {
            span: o.span,
            kind: o.kind,
        })
        .collect()
}

/// The nearest node at or above `offset` declaring something of `kind`.
pub fn enclosing_declaration(
    tree: &SyntaxTree,
    offset: usize,
    kind: DeclarationKind,
) -> QueryResult<NodeId> {
    check_offset(tree, offset)?;

    let start = tree.node_at(offset);
    std::iter::once(start)
        .chain(tree.ancestors(start))
        .find(|&n| tree.kind(n).declaration_kind() == Some(kind))
        .ok_or(QueryError::NotFound { offset })
}

/// The declared name of a declaration node, if it has one.
///
/// Field and local variable declarations report their first declarator.
pub fn declaration_name(tree: &SyntaxTree, node: NodeId) -> Option<&str> {
    let named = match tree.kind(node) {
        NodeKind::FieldDeclaration
        | NodeKind::ConstantDeclaration
        | NodeKind::LocalVariableDeclaration => tree
            .child_by_field(node, "declarator")
            .and_then(|d| tree.child_by_field(d, "name")),
        NodeKind::SpreadParameter => tree
            .child_of_kind(node, NodeKind::VariableDeclarator)
            .and_then(|d| tree.child_by_field(d, "name")),
        _ => tree.child_by_field(node, "name"),
    };
    named.map(|n| tree.text(n))
}

// ============================================================================
// Helpers
// ============================================================================

fn check_offset(tree: &SyntaxTree, offset: usize) -> QueryResult<()> {
    let len = tree.source().len();
    if offset > len {
        return Err(QueryError::OutOfRange { offset, len });
    }
    if let Some(region) = tree.error_region_at(offset) {
        return Err(QueryError::PositionInErrorRegion { offset, region });
    }
    Ok(())
}

fn stops_declaration_search(tree: &SyntaxTree, node: NodeId) -> bool {
    match tree.kind(node) {
        NodeKind::Program
        | NodeKind::Block
        | NodeKind::ConstructorBody
        | NodeKind::SwitchBlock
        | NodeKind::FormalParameters => true,
        k if k.is_type_body() => true,
        _ => tree.node(node).kind_name == "argument_list",
    }
}

fn declared_symbol(tree: &SyntaxTree, scopes: &ScopeTree, node: NodeId) -> Option<SymbolId> {
    if let Some(sym) = scopes.symbol_declared_by(node) {
        return Some(sym);
    }
    match tree.kind(node) {
        NodeKind::FieldDeclaration
        | NodeKind::ConstantDeclaration
        | NodeKind::LocalVariableDeclaration => tree
            .child_by_field(node, "declarator")
            .and_then(|d| scopes.symbol_declared_by(d)),
        NodeKind::SpreadParameter => tree
            .child_of_kind(node, NodeKind::VariableDeclarator)
            .and_then(|d| scopes.symbol_declared_by(d)),
        NodeKind::ConstructorDeclaration | NodeKind::CompactConstructorDeclaration => {
            // A constructor header stands for its type.
            tree.ancestors(node)
                .find(|&a| tree.kind(a).is_type_declaration())
                .and_then(|t| scopes.symbol_declared_by(t))
        }
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
