//! Owned syntax tree over the tree-sitter Java grammar.
//!
//! [`parse`] runs the grammar parser once and copies the result into an arena
//! of [`SyntaxNode`]s addressed by [`NodeId`]. The arena is stored in
//! depth-first preorder, so iterating ids in ascending order visits parents
//! before children and siblings in source order.
//!
//! ## Error regions
//!
//! The grammar never fails on bad input. It produces `ERROR` nodes around
//! fragments it could not fit, and zero-width `MISSING` nodes for tokens it had
//! to invent (e.g. the `}` of an unterminated block). Both are reported as
//! error regions:
//!
//! - an `ERROR` node contributes its own span
//! - a `MISSING` node contributes the span of its parent, the construct left
//!   incomplete, unless that parent is the root

use presso_core::patch::Span;
use presso_core::text::Position;
use thiserror::Error;
use tracing::debug;

use crate::kinds::NodeKind;

/// The grammar parser could not produce a tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct ParseError {
    pub reason: String,
    pub offset: Option<usize>,
}

/// Index of a node in its [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One node of the syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Grammar kind name, e.g. `method_declaration` or `{`.
    pub kind_name: &'static str,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Field name under which the parent holds this node.
    pub field: Option<&'static str>,
    pub is_named: bool,
    pub is_error: bool,
    pub is_missing: bool,
}

/// A parsed source text and its nodes.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<SyntaxNode>,
    error_regions: Vec<Span>,
}

/// Parse Java source text.
pub fn parse(source: impl Into<String>) -> Result<SyntaxTree, ParseError> {
    let source = source.into();

    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&tree_sitter_java::LANGUAGE.into())
        .map_err(|e| ParseError {
            reason: format!("failed to load Java grammar: {}", e),
            offset: None,
        })?;
    let ts_tree = parser.parse(&source, None).ok_or_else(|| ParseError {
        reason: "parser produced no tree".to_string(),
        offset: Some(0),
    })?;

    let mut nodes = build_arena(&ts_tree);
    if let Some(root) = nodes.first_mut() {
        root.span = Span::new(0, source.len());
    }
    let error_regions = collect_error_regions(&nodes);

    debug!(
        nodes = nodes.len(),
        bytes = source.len(),
        error_regions = error_regions.len(),
        "parsed java source"
    );

    Ok(SyntaxTree {
        source,
        nodes,
        error_regions,
    })
}

/// Copy the tree-sitter tree into a preorder arena.
fn build_arena(ts_tree: &tree_sitter::Tree) -> Vec<SyntaxNode> {
    let mut nodes: Vec<SyntaxNode> = Vec::new();
    let mut cursor = ts_tree.walk();
    // Ids of the nodes above the cursor.
    let mut stack: Vec<NodeId> = Vec::new();

    loop {
        let ts_node = cursor.node();
        let id = NodeId(nodes.len() as u32);
        let parent = stack.last().copied();
        let kind_name = ts_node.kind();
        let start = ts_node.start_byte();
        let end = ts_node.end_byte().max(start);

        nodes.push(SyntaxNode {
            kind: if ts_node.is_error() {
                NodeKind::Error
            } else {
                NodeKind::from_grammar(kind_name)
            },
            kind_name,
            span: Span::new(start, end),
            parent,
            children: Vec::new(),
            field: cursor.field_name(),
            is_named: ts_node.is_named(),
            is_error: ts_node.is_error(),
            is_missing: ts_node.is_missing(),
        });
        if let Some(parent) = parent {
            nodes[parent.index()].children.push(id);
        }

        if cursor.goto_first_child() {
            stack.push(id);
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return nodes;
            }
            stack.pop();
        }
    }
}

/// `ERROR` spans plus, for each `MISSING` token, the construct it leaves
/// incomplete. A missing closer inherits every enclosing construct that is
/// also cut short, so only the innermost of those is kept.
fn collect_error_regions(nodes: &[SyntaxNode]) -> Vec<Span> {
    let mut errors: Vec<Span> = Vec::new();
    let mut incomplete: Vec<Span> = Vec::new();
    for node in nodes {
        if node.is_error {
            errors.push(node.span);
        } else if node.is_missing {
            incomplete.push(match node.parent {
                Some(parent) if parent.index() != 0 => nodes[parent.index()].span,
                _ => node.span,
            });
        }
    }

    let strictly_contains = |outer: &Span, inner: &Span| {
        outer != inner && outer.start <= inner.start && inner.end <= outer.end
    };
    let mut regions: Vec<Span> = incomplete
        .iter()
        .filter(|outer| {
            !incomplete
                .iter()
                .chain(&errors)
                .any(|inner| strictly_contains(*outer, inner))
        })
        .copied()
        .chain(errors.iter().copied())
        .collect();
    regions.sort();
    regions.dedup();
    regions
}

impl SyntaxTree {
    /// The text this tree was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in preorder.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).span
    }

    /// Source text covered by a node.
    pub fn text(&self, id: NodeId) -> &str {
        let span = self.span(id);
        self.source.get(span.start..span.end).unwrap_or_default()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Named children, skipping punctuation and keywords.
    pub fn named_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.node(c).is_named)
    }

    /// First child held under `field`.
    pub fn child_by_field(&self, id: NodeId, field: &str) -> Option<NodeId> {
        self.children_by_field(id, field).next()
    }

    /// All children held under `field` (e.g. every `declarator`).
    pub fn children_by_field<'a>(
        &'a self,
        id: NodeId,
        field: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&c| self.node(c).field == Some(field))
    }

    /// First direct child of the given kind.
    pub fn child_of_kind(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&c| self.kind(c) == kind)
    }

    /// Proper ancestors of a node, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// The deepest node whose span contains `offset`.
    ///
    /// Zero-width nodes are never returned. Offsets at or past the end of the
    /// text resolve to the root.
    pub fn node_at(&self, offset: usize) -> NodeId {
        let mut current = self.root();
        'descend: loop {
            for &child in self.children(current) {
                let span = self.span(child);
                if !span.is_empty() && span.start <= offset && offset < span.end {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Spans of unparseable fragments, sorted by start.
    pub fn error_regions(&self) -> &[Span] {
        &self.error_regions
    }

    /// Whether the grammar reported any error or missing node.
    pub fn has_errors(&self) -> bool {
        !self.error_regions.is_empty()
    }

    /// The smallest error region containing `offset`.
    pub fn error_region_at(&self, offset: usize) -> Option<Span> {
        self.error_regions
            .iter()
            .copied()
            .filter(|region| region.contains_offset(offset))
            .min_by_key(|region| region.len())
    }

    /// Whether a node lies inside (or is) an `ERROR` node.
    pub fn is_in_error(&self, id: NodeId) -> bool {
        self.node(id).is_error || self.ancestors(id).any(|a| self.node(a).is_error)
    }

    /// Line and column of a byte offset.
    pub fn position_of(&self, offset: usize) -> Position {
        Position::from_offset(&self.source, offset)
    }

    /// Byte offset of a position, or `None` when it is outside the text.
    pub fn offset_of(&self, position: Position) -> Option<usize> {
        position.to_offset(&self.source)
    }
}
