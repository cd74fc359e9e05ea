//! Scope and symbol resolution for Java.
//!
//! [`resolve`] walks a [`SyntaxTree`] once, in source order, with an explicit
//! work stack and an explicit scope stack. It produces an immutable
//! [`ScopeTree`]: an arena of scopes and symbols plus an occurrence index
//! sorted by start offset.
//!
//! ## Scopes
//!
//! | Scope | Opened by |
//! |-------|-----------|
//! | `File` | the compilation unit |
//! | `Type` | class, interface, enum, record and annotation declarations; anonymous class bodies |
//! | `Method` | method, constructor and compact constructor declarations (parameters and body) |
//! | `Lambda` | lambda expressions |
//! | `Block` | nested blocks, `for`, enhanced `for`, `catch`, try-with-resources, switch blocks |
//!
//! ## Binding rules
//!
//! - Names are unique per scope *and namespace* (types, methods, variables).
//!   A second declaration with the same key is a `DuplicateDeclaration`; it gets
//!   its own symbol but the first binding stays in place.
//! - Overloads of a method in one type share a single symbol.
//! - Type members are bound when their type scope is entered, so a method may
//!   use a field declared below it. Locals are bound when their name is reached.
//! - A constructor's name is an occurrence of the enclosing type's symbol.
//! - `ERROR` subtrees are skipped.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use presso_core::patch::Span;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::kinds::{Namespace, NodeKind, SymbolKind};
use crate::tree::{NodeId, SyntaxTree};

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a scope in its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope_{}", self.0)
    }
}

/// Index of a symbol in its [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym_{}", self.0)
    }
}

// ============================================================================
// Scopes and Symbols
// ============================================================================

/// The kind of a lexical scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    File,
    Type,
    Method,
    Lambda,
    Block,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::File => "file",
            ScopeKind::Type => "type",
            ScopeKind::Method => "method",
            ScopeKind::Lambda => "lambda",
            ScopeKind::Block => "block",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A lexical region and the names declared directly in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    /// Enclosing scope; `None` only for the file scope.
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Node that opened the scope.
    pub node: NodeId,
    pub span: Span,
    /// For named type scopes, the type's own symbol.
    pub owner: Option<SymbolId>,
    bindings: BTreeMap<(Namespace, String), SymbolId>,
}

impl Scope {
    /// The symbol bound to `name` in this scope only.
    pub fn lookup(&self, namespace: Namespace, name: &str) -> Option<SymbolId> {
        self.bindings.get(&(namespace, name.to_string())).copied()
    }

    /// All bindings of this scope, ordered by namespace then name.
    pub fn bindings(&self) -> impl Iterator<Item = (Namespace, &str, SymbolId)> + '_ {
        self.bindings
            .iter()
            .map(|((ns, name), &sym)| (*ns, name.as_str(), sym))
    }
}

/// How a symbol's name appears at one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceKind {
    Declaration,
    Reference,
    /// A constructor declaration naming its type.
    Constructor,
}

impl OccurrenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccurrenceKind::Declaration => "declaration",
            OccurrenceKind::Reference => "reference",
            OccurrenceKind::Constructor => "constructor",
        }
    }
}

/// One appearance of a symbol's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Span of the identifier token.
    pub span: Span,
    pub kind: OccurrenceKind,
    /// Innermost scope at the occurrence.
    pub scope: ScopeId,
}

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    /// The declaring node (e.g. `method_declaration`, `variable_declarator`).
    pub decl_node: NodeId,
    /// Scope the symbol is declared in.
    pub scope: ScopeId,
    /// Enclosing type symbol, for members.
    pub container: Option<SymbolId>,
    /// Declaration first, then every other occurrence in source order.
    pub occurrences: Vec<Occurrence>,
    /// Other symbols declared with the same name in the same scope.
    pub duplicates: Vec<SymbolId>,
}

impl Symbol {
    /// Span of the declaring identifier.
    pub fn declaration_span(&self) -> Span {
        self.occurrences
            .first()
            .map(|o| o.span)
            .unwrap_or(Span::new(0, 0))
    }
}

/// Kind of a non-fatal resolver finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    DuplicateDeclaration,
    UnresolvedReference,
}

impl DiagnosticKind {
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticKind::DuplicateDeclaration => "duplicate_declaration",
            DiagnosticKind::UnresolvedReference => "unresolved_reference",
        }
    }
}

/// A non-fatal resolver finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub name: String,
    pub span: Span,
    /// The symbol the diagnostic is attached to, if any.
    pub symbol: Option<SymbolId>,
    pub message: String,
}

/// An identifier use that matched no declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedRef {
    pub name: String,
    pub span: Span,
    pub scope: ScopeId,
    pub namespace: Namespace,
    /// An expression name: a type of the same name would also bind it.
    pub type_fallback: bool,
}

// ============================================================================
// Scope Tree
// ============================================================================

/// Result of resolving one syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    /// Every occurrence span, sorted by start.
    index: Vec<(Span, SymbolId)>,
    decl_nodes: HashMap<NodeId, SymbolId>,
    unresolved: Vec<UnresolvedRef>,
    diagnostics: Vec<Diagnostic>,
}

impl ScopeTree {
    /// The file scope.
    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn unresolved(&self) -> &[UnresolvedRef] {
        &self.unresolved
    }

    /// Diagnostics attached to one symbol.
    pub fn diagnostics_for(&self, id: SymbolId) -> impl Iterator<Item = &Diagnostic> + '_ {
        let duplicates = &self.symbol(id).duplicates;
        self.diagnostics.iter().filter(move |d| {
            d.symbol
                .is_some_and(|s| s == id || duplicates.contains(&s))
        })
    }

    /// The occurrence whose span contains `offset`.
    pub fn occurrence_at(&self, offset: usize) -> Option<(Span, SymbolId)> {
        let idx = self.index.partition_point(|(span, _)| span.start <= offset);
        let (span, sym) = *self.index.get(idx.checked_sub(1)?)?;
        span.contains_offset(offset).then_some((span, sym))
    }

    /// The occurrence ending exactly at `offset` (a cursor right after a name).
    pub fn occurrence_ending_at(&self, offset: usize) -> Option<(Span, SymbolId)> {
        let idx = self.index.partition_point(|(span, _)| span.start < offset);
        let (span, sym) = *self.index.get(idx.checked_sub(1)?)?;
        (span.end == offset).then_some((span, sym))
    }

    /// The symbol declared by a declaration node.
    pub fn symbol_declared_by(&self, node: NodeId) -> Option<SymbolId> {
        self.decl_nodes.get(&node).copied()
    }

    /// A scope followed by its enclosing scopes up to the file scope.
    pub fn chain(&self, from: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(from), move |&s| self.scope(s).parent)
    }

    /// Resolve `name` from `from` outward, innermost first.
    pub fn lookup(&self, from: ScopeId, namespace: Namespace, name: &str) -> Option<SymbolId> {
        self.chain(from)
            .find_map(|s| self.scope(s).lookup(namespace, name))
    }

    /// Whether `ancestor` is `scope` or encloses it.
    pub fn encloses(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        self.chain(scope).any(|s| s == ancestor)
    }

    /// All symbols with a name in a namespace.
    pub fn symbols_named<'a>(
        &'a self,
        namespace: Namespace,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.symbols
            .iter()
            .filter(move |s| s.name == name && s.kind.namespace() == namespace)
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Build the scope tree of a syntax tree.
pub fn resolve(tree: &SyntaxTree) -> ScopeTree {
    let mut resolver = Resolver::new(tree);
    resolver.run();
    resolver.finish()
}

enum Frame {
    Enter(NodeId),
    Leave,
}

struct Resolver<'t> {
    tree: &'t SyntaxTree,
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
    decl_nodes: HashMap<NodeId, SymbolId>,
    unresolved: Vec<UnresolvedRef>,
    diagnostics: Vec<Diagnostic>,
    scope_stack: Vec<ScopeId>,
    /// Identifier nodes already accounted for (hoisted names, constructor names).
    handled: HashSet<NodeId>,
}

impl<'t> Resolver<'t> {
    fn new(tree: &'t SyntaxTree) -> Self {
        Resolver {
            tree,
            scopes: Vec::new(),
            symbols: Vec::new(),
            decl_nodes: HashMap::new(),
            unresolved: Vec::new(),
            diagnostics: Vec::new(),
            scope_stack: Vec::new(),
            handled: HashSet::new(),
        }
    }

    fn run(&mut self) {
        let mut work = vec![Frame::Enter(self.tree.root())];

        while let Some(frame) = work.pop() {
            let id = match frame {
                Frame::Leave => {
                    self.scope_stack.pop();
                    continue;
                }
                Frame::Enter(id) => id,
            };

            if id != self.tree.root() && self.tree.node(id).is_error {
                trace!(span = %self.tree.span(id), "skipping error subtree");
                continue;
            }

            if self.enter(id) {
                work.push(Frame::Leave);
            }
            for &child in self.tree.children(id).iter().rev() {
                work.push(Frame::Enter(child));
            }
        }
    }

    fn finish(mut self) -> ScopeTree {
        for symbol in &mut self.symbols {
            if symbol.occurrences.len() > 2 {
                symbol.occurrences[1..].sort_by_key(|o| o.span.start);
            }
        }

        let mut index: Vec<(Span, SymbolId)> = self
            .symbols
            .iter()
            .flat_map(|s| s.occurrences.iter().map(move |o| (o.span, s.id)))
            .collect();
        index.sort_by_key(|(span, _)| span.start);

        debug!(
            scopes = self.scopes.len(),
            symbols = self.symbols.len(),
            occurrences = index.len(),
            unresolved = self.unresolved.len(),
            duplicates = self
                .diagnostics
                .iter()
                .filter(|d| d.kind == DiagnosticKind::DuplicateDeclaration)
                .count(),
            "resolved scopes"
        );

        ScopeTree {
            scopes: self.scopes,
            symbols: self.symbols,
            index,
            decl_nodes: self.decl_nodes,
            unresolved: self.unresolved,
            diagnostics: self.diagnostics,
        }
    }

    // ------------------------------------------------------------------------
    // Node dispatch
    // ------------------------------------------------------------------------

    /// Process a node on the way down. Returns true if it opened a scope.
    fn enter(&mut self, id: NodeId) -> bool {
        let kind = self.tree.kind(id);
        match kind {
            NodeKind::Program if id == self.tree.root() => {
                self.push_scope(ScopeKind::File, id, None);
                for child in self.tree.named_children(id).collect::<Vec<_>>() {
                    if self.tree.kind(child).is_type_declaration() {
                        self.declare_name_of(child, SymbolKind::Type);
                    }
                }
                true
            }
            k if k.is_type_declaration() => {
                let owner = match self.decl_nodes.get(&id) {
                    Some(&sym) => Some(sym),
                    // Local classes are not hoisted.
                    None => self.declare_name_of(id, SymbolKind::Type),
                };
                self.push_scope(ScopeKind::Type, id, owner);
                self.hoist_type_parameters(id);
                if kind == NodeKind::RecordDeclaration {
                    self.hoist_record_components(id);
                }
                if let Some(body) = self.tree.child_by_field(id, "body") {
                    self.hoist_members(body);
                }
                true
            }
            NodeKind::ClassBody if self.is_anonymous_body(id) => {
                self.push_scope(ScopeKind::Type, id, None);
                self.hoist_members(id);
                true
            }
            NodeKind::MethodDeclaration => {
                if !self.decl_nodes.contains_key(&id) {
                    self.declare_name_of(id, SymbolKind::Method);
                }
                self.push_scope(ScopeKind::Method, id, None);
                self.hoist_type_parameters(id);
                true
            }
            NodeKind::ConstructorDeclaration | NodeKind::CompactConstructorDeclaration => {
                self.enter_constructor(id);
                self.push_scope(ScopeKind::Method, id, None);
                self.hoist_type_parameters(id);
                true
            }
            NodeKind::LambdaExpression => {
                self.push_scope(ScopeKind::Lambda, id, None);
                true
            }
            NodeKind::Block => {
                let is_callable_body = self.tree.parent(id).is_some_and(|p| {
                    let pk = self.tree.kind(p);
                    pk.is_callable_declaration() || pk == NodeKind::LambdaExpression
                });
                if is_callable_body {
                    false
                } else {
                    self.push_scope(ScopeKind::Block, id, None);
                    true
                }
            }
            NodeKind::SwitchBlock
            | NodeKind::ForStatement
            | NodeKind::EnhancedForStatement
            | NodeKind::CatchClause
            | NodeKind::TryWithResourcesStatement => {
                self.push_scope(ScopeKind::Block, id, None);
                true
            }
            NodeKind::Identifier => {
                self.visit_identifier(id);
                false
            }
            NodeKind::TypeIdentifier => {
                self.visit_type_identifier(id);
                false
            }
            _ => false,
        }
    }

    fn is_anonymous_body(&self, body: NodeId) -> bool {
        self.tree.parent(body).is_some_and(|p| {
            matches!(
                self.tree.kind(p),
                NodeKind::ObjectCreationExpression | NodeKind::EnumConstant
            )
        })
    }

    fn enter_constructor(&mut self, id: NodeId) {
        let Some(name) = self.tree.child_by_field(id, "name") else {
            return;
        };
        if self.handled.contains(&name) {
            // Hoisted as a method: its name does not match the type.
            return;
        }
        match self.enclosing_type_owner() {
            Some(owner) if self.symbols[owner.index()].name == self.tree.text(name) => {
                let scope = self.current_scope();
                self.symbols[owner.index()].occurrences.push(Occurrence {
                    span: self.tree.span(name),
                    kind: OccurrenceKind::Constructor,
                    scope,
                });
                self.handled.insert(name);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------------
    // Hoisting
    // ------------------------------------------------------------------------

    fn hoist_type_parameters(&mut self, decl: NodeId) {
        let Some(params) = self.tree.child_by_field(decl, "type_parameters") else {
            return;
        };
        let type_params: Vec<NodeId> = self.tree.named_children(params).collect();
        for param in type_params {
            if self.tree.kind(param) != NodeKind::TypeParameter {
                continue;
            }
            if let Some(name) = self.tree.child_of_kind(param, NodeKind::TypeIdentifier) {
                self.declare(name, param, SymbolKind::Type);
            }
        }
    }

    fn hoist_record_components(&mut self, record: NodeId) {
        let Some(params) = self.tree.child_by_field(record, "parameters") else {
            return;
        };
        let components: Vec<NodeId> = self.tree.named_children(params).collect();
        for component in components {
            if self.tree.kind(component) == NodeKind::FormalParameter {
                self.declare_name_of(component, SymbolKind::Field);
            }
        }
    }

    /// Bind the members of a type body in the current (type) scope.
    fn hoist_members(&mut self, body: NodeId) {
        let members: Vec<NodeId> = self.tree.named_children(body).collect();
        for member in members {
            match self.tree.kind(member) {
                NodeKind::FieldDeclaration | NodeKind::ConstantDeclaration => {
                    let declarators: Vec<NodeId> =
                        self.tree.children_by_field(member, "declarator").collect();
                    for declarator in declarators {
                        self.declare_name_of(declarator, SymbolKind::Field);
                    }
                }
                NodeKind::MethodDeclaration | NodeKind::AnnotationTypeElementDeclaration => {
                    self.declare_name_of(member, SymbolKind::Method);
                }
                NodeKind::ConstructorDeclaration | NodeKind::CompactConstructorDeclaration => {
                    // A constructor whose name does not match its type is really
                    // a method missing its return type.
                    let matches_type = self
                        .enclosing_type_owner()
                        .zip(self.tree.child_by_field(member, "name"))
                        .is_some_and(|(owner, name)| {
                            self.symbols[owner.index()].name == self.tree.text(name)
                        });
                    if !matches_type {
                        self.declare_name_of(member, SymbolKind::Method);
                    }
                }
                NodeKind::EnumConstant => {
                    self.declare_name_of(member, SymbolKind::Field);
                }
                NodeKind::EnumBodyDeclarations => self.hoist_members(member),
                k if k.is_type_declaration() => {
                    self.declare_name_of(member, SymbolKind::Type);
                }
                _ => {}
            }
        }
    }

    // ------------------------------------------------------------------------
    // Identifiers
    // ------------------------------------------------------------------------

    fn visit_identifier(&mut self, id: NodeId) {
        if self.handled.contains(&id) {
            return;
        }
        let Some(parent) = self.tree.parent(id) else {
            return;
        };
        let field = self.tree.node(id).field;
        let parent_kind = self.tree.kind(parent);

        if let Some(kind) = self.local_declaration_kind(parent, parent_kind, field) {
            // These parents also hold bodies or operands; the name alone declares.
            let decl = match parent_kind {
                NodeKind::LambdaExpression
                | NodeKind::InferredParameters
                | NodeKind::EnhancedForStatement
                | NodeKind::InstanceofExpression => id,
                _ => parent,
            };
            self.declare(id, decl, kind);
            return;
        }

        match parent_kind {
            NodeKind::PackageDeclaration
            | NodeKind::ImportDeclaration
            | NodeKind::ScopedIdentifier
            | NodeKind::LabeledStatement
            | NodeKind::BreakStatement
            | NodeKind::ContinueStatement => {}
            NodeKind::ElementValuePair if field == Some("key") => {}
            NodeKind::MarkerAnnotation | NodeKind::Annotation if field == Some("name") => {
                self.resolve_use(id, Namespace::Type, false);
            }
            NodeKind::MethodReference => {
                if self.tree.children(parent).first() == Some(&id) {
                    self.resolve_expression(id);
                }
            }
            NodeKind::FieldAccess if field == Some("field") => {
                if self.receiver_is_this(parent) {
                    self.resolve_member_of_this(id, Namespace::Variable);
                }
            }
            NodeKind::MethodInvocation if field == Some("name") => {
                match self.tree.child_by_field(parent, "object") {
                    None => self.resolve_use(id, Namespace::Method, false),
                    Some(_) if self.receiver_is_this(parent) => {
                        self.resolve_member_of_this(id, Namespace::Method)
                    }
                    Some(_) => {}
                }
            }
            _ => self.resolve_expression(id),
        }
    }

    /// Symbol kind if `parent` declares a non-member name through this identifier.
    fn local_declaration_kind(
        &self,
        parent: NodeId,
        parent_kind: NodeKind,
        field: Option<&str>,
    ) -> Option<SymbolKind> {
        match (parent_kind, field) {
            (NodeKind::VariableDeclarator, Some("name")) => {
                match self.tree.parent(parent).map(|g| self.tree.kind(g)) {
                    Some(NodeKind::SpreadParameter) => Some(SymbolKind::Parameter),
                    _ => Some(SymbolKind::LocalVariable),
                }
            }
            (NodeKind::FormalParameter, Some("name"))
            | (NodeKind::CatchFormalParameter, Some("name"))
            | (NodeKind::LambdaExpression, Some("parameters")) => Some(SymbolKind::Parameter),
            (NodeKind::InferredParameters, _) => Some(SymbolKind::Parameter),
            // The binding is the only `identifier` child of a type pattern.
            (NodeKind::TypePattern, _)
            | (NodeKind::EnhancedForStatement, Some("name"))
            | (NodeKind::Resource, Some("name"))
            | (NodeKind::InstanceofExpression, Some("name")) => Some(SymbolKind::LocalVariable),
            _ => None,
        }
    }

    fn visit_type_identifier(&mut self, id: NodeId) {
        if self.handled.contains(&id) {
            return;
        }
        if let Some(parent) = self.tree.parent(id) {
            // In `Outer.Inner` only the leftmost name resolves lexically.
            if self.tree.kind(parent) == NodeKind::ScopedTypeIdentifier
                && self.tree.children(parent).first() != Some(&id)
            {
                return;
            }
        }
        self.resolve_use(id, Namespace::Type, false);
    }

    fn receiver_is_this(&self, access: NodeId) -> bool {
        self.tree
            .child_by_field(access, "object")
            .is_some_and(|object| self.tree.kind(object) == NodeKind::This)
    }

    /// A bare name in expression position: a variable, else a type (`Foo.bar()`).
    fn resolve_expression(&mut self, id: NodeId) {
        let name = self.tree.text(id);
        if self.lookup(Namespace::Variable, name).is_none()
            && self.lookup(Namespace::Type, name).is_some()
        {
            self.resolve_use(id, Namespace::Type, false);
        } else {
            self.resolve_use(id, Namespace::Variable, false);
        }
    }

    /// `this.name`: only the innermost type scope is searched.
    fn resolve_member_of_this(&mut self, id: NodeId, namespace: Namespace) {
        self.resolve_use(id, namespace, true);
    }

    fn resolve_use(&mut self, id: NodeId, namespace: Namespace, this_only: bool) {
        let name = self.tree.text(id).to_string();
        let found = if this_only {
            self.innermost_type_scope()
                .and_then(|s| self.scopes[s.index()].lookup(namespace, &name))
        } else {
            self.lookup(namespace, &name)
        };

        let span = self.tree.span(id);
        let scope = self.current_scope();
        match found {
            Some(sym) => {
                self.symbols[sym.index()].occurrences.push(Occurrence {
                    span,
                    kind: OccurrenceKind::Reference,
                    scope,
                });
            }
            None => {
                trace!(%name, %span, "unresolved reference");
                self.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::UnresolvedReference,
                    name: name.clone(),
                    span,
                    symbol: None,
                    message: format!("'{}' does not resolve to a declaration in this file", name),
                });
                self.unresolved.push(UnresolvedRef {
                    name,
                    span,
                    scope,
                    namespace,
                    // Only `resolve_expression` reaches here with a lexical variable lookup.
                    type_fallback: namespace == Namespace::Variable && !this_only,
                });
            }
        }
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    /// Declare the `name` field of `decl`.
    fn declare_name_of(&mut self, decl: NodeId, kind: SymbolKind) -> Option<SymbolId> {
        let name = self.tree.child_by_field(decl, "name")?;
        Some(self.declare(name, decl, kind))
    }

    /// Bind a name in the current scope.
    fn declare(&mut self, name_node: NodeId, decl: NodeId, kind: SymbolKind) -> SymbolId {
        let scope = self.current_scope();
        let name = self.tree.text(name_node).to_string();
        let span = self.tree.span(name_node);
        let key = (kind.namespace(), name.clone());
        self.handled.insert(name_node);

        let existing = self.scopes[scope.index()].bindings.get(&key).copied();

        if let Some(existing) = existing {
            if kind == SymbolKind::Method && self.symbols[existing.index()].kind == kind {
                // Another overload of the same method.
                self.symbols[existing.index()].occurrences.push(Occurrence {
                    span,
                    kind: OccurrenceKind::Declaration,
                    scope,
                });
                self.decl_nodes.insert(decl, existing);
                return existing;
            }
        }

        let id = SymbolId(self.symbols.len() as u32);
        let container = match self.scopes[scope.index()].kind {
            ScopeKind::Type => self.scopes[scope.index()].owner,
            _ => None,
        };
        self.symbols.push(Symbol {
            id,
            name: name.clone(),
            kind,
            decl_node: decl,
            scope,
            container,
            occurrences: vec![Occurrence {
                span,
                kind: OccurrenceKind::Declaration,
                scope,
            }],
            duplicates: Vec::new(),
        });
        self.decl_nodes.insert(decl, id);

        match existing {
            Some(first) => {
                debug!(%name, %span, "duplicate declaration");
                self.symbols[first.index()].duplicates.push(id);
                self.symbols[id.index()].duplicates.push(first);
                self.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::DuplicateDeclaration,
                    name: name.clone(),
                    span,
                    symbol: Some(id),
                    message: format!("'{}' is already declared in this scope", name),
                });
            }
            None => {
                self.scopes[scope.index()].bindings.insert(key, id);
            }
        }

        trace!(%name, kind = %kind, scope = %scope, "declared");
        id
    }

    // ------------------------------------------------------------------------
    // Scope stack
    // ------------------------------------------------------------------------

    fn push_scope(&mut self, kind: ScopeKind, node: NodeId, owner: Option<SymbolId>) {
        let id = ScopeId(self.scopes.len() as u32);
        let parent = self.scope_stack.last().copied();
        self.scopes.push(Scope {
            id,
            kind,
            parent,
            children: Vec::new(),
            node,
            span: self.tree.span(node),
            owner,
            bindings: BTreeMap::new(),
        });
        if let Some(parent) = parent {
            self.scopes[parent.index()].children.push(id);
        }
        self.scope_stack.push(id);
    }

    fn current_scope(&self) -> ScopeId {
        self.scope_stack.last().copied().unwrap_or(ScopeId(0))
    }

    fn innermost_type_scope(&self) -> Option<ScopeId> {
        self.scope_stack
            .iter()
            .rev()
            .copied()
            .find(|s| self.scopes[s.index()].kind == ScopeKind::Type)
    }

    fn enclosing_type_owner(&self) -> Option<SymbolId> {
        self.innermost_type_scope()
            .and_then(|s| self.scopes[s.index()].owner)
    }

    fn lookup(&self, namespace: Namespace, name: &str) -> Option<SymbolId> {
        self.scope_stack
            .iter()
            .rev()
            .find_map(|s| self.scopes[s.index()].lookup(namespace, name))
    }
}

// ============================================================================
// Tests
// ============================================================================
