//! Rename a symbol within one file.
//!
//! 1. Validate the new name for the symbol's kind
//! 2. Reject names that would change what any occurrence binds to
//! 3. Emit one edit per occurrence (declaration, references, constructor names)
//! 4. Finalize the plan (sort descending, verify no overlap)
//!
//! Renaming a symbol to its current name yields an empty valid plan.

use std::path::Path;

use presso_core::output::FileRename;
use presso_core::patch::{EditConflict, EditLabels, EditPlan, Span, TextEdit};
use thiserror::Error;
use tracing::{debug, info};

use crate::kinds::{Namespace, NodeKind, SymbolKind};
use crate::scope::{Diagnostic, OccurrenceKind, ScopeId, ScopeKind, ScopeTree, Symbol, SymbolId};
use crate::tree::SyntaxTree;
use crate::validation::{validate_name_for, ValidationError};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while planning a rename.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    /// Invalid new name (syntax error or keyword).
    #[error("invalid name: {0}")]
    InvalidName(#[from] ValidationError),

    /// The new name would rebind an occurrence.
    #[error("name collision for '{name}': {reason}")]
    NameCollision {
        name: String,
        reason: String,
        /// Declaration (or use) the new name clashes with.
        existing: Option<Span>,
    },

    /// The computed edits conflict with each other.
    #[error("rename produced conflicting edits: {}", format_conflicts(.conflicts))]
    Conflict { conflicts: Vec<EditConflict> },
}

fn format_conflicts(conflicts: &[EditConflict]) -> String {
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for rename operations.
pub type RenameResult<T> = Result<T, RenameError>;

// ============================================================================
// Types
// ============================================================================

/// A validated rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlan {
    pub symbol: SymbolId,
    pub old_name: String,
    pub new_name: String,
    pub plan: EditPlan,
    /// Duplicate-declaration diagnostics touching the symbol.
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Planning
// ============================================================================

/// Plan renaming `symbol` to `new_name`.
pub fn plan_rename(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    symbol: SymbolId,
    new_name: &str,
) -> RenameResult<RenamePlan> {
    let sym = scopes.symbol(symbol);
    validate_name_for(new_name, sym.kind)?;

    let labels = EditLabels {
        operation: Some("rename".to_string()),
        symbol: Some(sym.name.clone()),
        reason: None,
    };
    let diagnostics: Vec<Diagnostic> = scopes.diagnostics_for(symbol).cloned().collect();

    if sym.name == new_name {
        debug!(name = %sym.name, "rename to current name, nothing to do");
        let plan = EditPlan::new(tree.source())
            .with_labels(labels)
            .finalize()
            .map_err(|conflicts| RenameError::Conflict { conflicts })?;
        return Ok(RenamePlan {
            symbol,
            old_name: sym.name.clone(),
            new_name: new_name.to_string(),
            plan,
            diagnostics,
        });
    }

    check_collisions(tree, scopes, sym, new_name)?;

    let mut plan = EditPlan::new(tree.source()).with_labels(labels);
    for occurrence in &sym.occurrences {
        plan.push(TextEdit::replace(occurrence.span, new_name));
    }
    let plan = plan
        .finalize()
        .map_err(|conflicts| RenameError::Conflict { conflicts })?;

    info!(
        old = %sym.name,
        new = new_name,
        edits = plan.edit_count(),
        "planned rename"
    );

    Ok(RenamePlan {
        symbol,
        old_name: sym.name.clone(),
        new_name: new_name.to_string(),
        plan,
        diagnostics,
    })
}

/// The file move that goes with renaming a top-level type named after its file.
pub fn file_rename_for(
    path: &str,
    scopes: &ScopeTree,
    symbol: SymbolId,
    new_name: &str,
) -> Option<FileRename> {
    let sym = scopes.symbol(symbol);
    if sym.kind != SymbolKind::Type || sym.scope != scopes.root() || sym.name == new_name {
        return None;
    }
    let file = Path::new(path);
    if file.extension()? != "java" || file.file_stem()? != sym.name.as_str() {
        return None;
    }
    let to = file.with_file_name(format!("{}.java", new_name));
    Some(FileRename {
        from: path.to_string(),
        to: to.to_string_lossy().into_owned(),
    })
}

// ============================================================================
// Collision Checks
// ============================================================================

fn collision(name: &str, reason: String, existing: Option<Span>) -> RenameError {
    RenameError::NameCollision {
        name: name.to_string(),
        reason,
        existing,
    }
}

/// Reject `new_name` if it would change the binding of any occurrence.
fn check_collisions(
    tree: &SyntaxTree,
    scopes: &ScopeTree,
    sym: &Symbol,
    new_name: &str,
) -> RenameResult<()> {
    let namespace = sym.kind.namespace();
    let declaring = sym.scope;

    // The declaring scope already binds the name.
    if let Some(other) = scopes.scope(declaring).lookup(namespace, new_name) {
        if other != sym.id {
            let other = scopes.symbol(other);
            return Err(collision(
                new_name,
                format!("a {} named '{}' is already declared in the same scope", other.kind, new_name),
                Some(other.declaration_span()),
            ));
        }
    }

    // A reference would be captured by an inner declaration of the new name.
    for occurrence in &sym.occurrences {
        if occurrence.kind != OccurrenceKind::Reference || is_this_qualified(tree, occurrence.span) {
            continue;
        }
        let inner = scopes
            .chain(occurrence.scope)
            .take_while(|&s| s != declaring)
            .filter_map(|s| scopes.scope(s).lookup(namespace, new_name))
            .map(|id| scopes.symbol(id))
            .find(|inner| visible_at(inner, occurrence.span.start));
        if let Some(inner) = inner {
            return Err(collision(
                new_name,
                format!(
                    "the reference at byte {} would resolve to the {} '{}' declared closer to it",
                    occurrence.span.start, inner.kind, new_name
                ),
                Some(inner.declaration_span()),
            ));
        }

        // `Foo.bar()`: a type used in expression position loses to any variable.
        if sym.kind == SymbolKind::Type && is_expression_name(tree, occurrence.span) {
            if let Some(var) = scopes.lookup(occurrence.scope, Namespace::Variable, new_name) {
                return Err(collision(
                    new_name,
                    format!(
                        "the reference at byte {} would resolve to the variable '{}'",
                        occurrence.span.start, new_name
                    ),
                    Some(scopes.symbol(var).declaration_span()),
                ));
            }
        }
    }

    if is_local(sym.kind) {
        check_local_shadowing(scopes, sym, new_name)?;
    }

    // Existing uses of the new name would be captured by the renamed declaration.
    for other in scopes.symbols_named(namespace, new_name) {
        if other.id == sym.id || other.scope == declaring || !scopes.encloses(other.scope, declaring) {
            continue;
        }
        for occurrence in &other.occurrences {
            if occurrence.kind != OccurrenceKind::Reference
                || is_this_qualified(tree, occurrence.span)
                || !captures(scopes, sym, occurrence.scope, occurrence.span)
            {
                continue;
            }
            return Err(collision(
                new_name,
                format!(
                    "the existing use of '{}' at byte {} would resolve to the renamed {}",
                    new_name, occurrence.span.start, sym.kind
                ),
                Some(occurrence.span),
            ));
        }
    }

    for unresolved in scopes.unresolved() {
        // `Math.abs(1)`: an unbound expression name falls back to a type.
        let same_namespace = unresolved.namespace == namespace
            || (sym.kind == SymbolKind::Type && unresolved.type_fallback);
        if unresolved.name == new_name
            && same_namespace
            && captures(scopes, sym, unresolved.scope, unresolved.span)
        {
            return Err(collision(
                new_name,
                format!(
                    "the unresolved use of '{}' at byte {} would resolve to the renamed {}",
                    new_name, unresolved.span.start, sym.kind
                ),
                Some(unresolved.span),
            ));
        }
    }

    Ok(())
}

/// A local or parameter may not share its name with another local or
/// parameter in scope at the same point of one method body.
fn check_local_shadowing(scopes: &ScopeTree, sym: &Symbol, new_name: &str) -> RenameResult<()> {
    let at = sym.declaration_span().start;

    let outer = scopes
        .chain(sym.scope)
        .skip(1)
        .take_while(|&s| scopes.scope(s).kind != ScopeKind::Type)
        .filter_map(|s| scopes.scope(s).lookup(Namespace::Variable, new_name))
        .map(|id| scopes.symbol(id))
        .find(|outer| is_local(outer.kind) && visible_at(outer, at));

    let inner = || {
        scopes.symbols_named(Namespace::Variable, new_name).find(|other| {
            is_local(other.kind)
                && other.scope != sym.scope
                && within_body(scopes, sym.scope, other.scope)
                && visible_at(sym, other.declaration_span().start)
        })
    };

    match outer.or_else(inner) {
        Some(other) => Err(collision(
            new_name,
            format!(
                "the {} '{}' is already in scope and Java locals cannot shadow each other",
                other.kind, new_name
            ),
            Some(other.declaration_span()),
        )),
        None => Ok(()),
    }
}

/// Whether `scope` lies inside `body` without crossing a type declaration.
fn within_body(scopes: &ScopeTree, body: ScopeId, scope: ScopeId) -> bool {
    scopes
        .chain(scope)
        .take_while(|&s| s != body)
        .all(|s| scopes.scope(s).kind != ScopeKind::Type)
        && scopes.encloses(body, scope)
}

fn is_local(kind: SymbolKind) -> bool {
    matches!(kind, SymbolKind::LocalVariable | SymbolKind::Parameter)
}

/// Locals are only visible after their declaration.
fn visible_at(sym: &Symbol, offset: usize) -> bool {
    !(sym.kind == SymbolKind::LocalVariable && offset < sym.declaration_span().start)
}

/// Whether a use at `scope`/`span` would see `sym` under a new name.
fn captures(scopes: &ScopeTree, sym: &Symbol, scope: ScopeId, span: Span) -> bool {
    scopes.encloses(sym.scope, scope) && visible_at(sym, span.start)
}

/// `this.name` or `this.name()`: resolved against the enclosing type only.
fn is_this_qualified(tree: &SyntaxTree, span: Span) -> bool {
    let node = tree.node_at(span.start);
    let Some(parent) = tree.parent(node) else {
        return false;
    };
    matches!(
        tree.kind(parent),
        NodeKind::FieldAccess | NodeKind::MethodInvocation
    ) && tree.node(node).field != Some("object")
        && tree
            .child_by_field(parent, "object")
            .is_some_and(|object| tree.kind(object) == NodeKind::This)
}

fn is_expression_name(tree: &SyntaxTree, span: Span) -> bool {
    tree.kind(tree.node_at(span.start)) == NodeKind::Identifier
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::symbol_at;
    use crate::scope::resolve;
    use crate::tree::parse;
    use presso_core::patch::apply;

    fn rename_at(source: &str, needle: &str, new_name: &str) -> RenameResult<(RenamePlan, String)> {
        let tree = parse(source).unwrap();
        let scopes = resolve(&tree);
        let offset = source.find(needle).unwrap();
        let symbol = symbol_at(&tree, &scopes, offset).unwrap();
        let planned = plan_rename(&tree, &scopes, symbol, new_name)?;
        let output = apply(source, &planned.plan).unwrap();
        Ok((planned, output))
    }

    mod planning {
        use super::*;

        #[test]
        fn local_variable() {
            let source = "class Foo { void bar() { int x = 1; return x; } }";
            let (planned, output) = rename_at(source, "x = 1", "count").unwrap();
            assert_eq!(planned.plan.edit_count(), 2);
            assert!(planned.plan.valid);
            assert_eq!(
                output,
                "class Foo { void bar() { int count = 1; return count; } }"
            );
        }

        #[test]
        fn type_and_constructor() {
            let source = "class Foo { Foo() {} }";
            let (planned, output) = rename_at(source, "Foo", "Baz").unwrap();
            assert_eq!(planned.plan.edit_count(), 2);
            assert_eq!(output, "class Baz { Baz() {} }");
        }

        #[test]
        fn edits_sorted_descending() {
            let source = "class A { int v; void m() { v = v + 1; } }";
            let (planned, _) = rename_at(source, "v;", "value").unwrap();
            let starts: Vec<usize> = planned.plan.edits.iter().map(|e| e.span.start).collect();
            let mut sorted = starts.clone();
            sorted.sort_by(|a, b| b.cmp(a));
            assert_eq!(starts, sorted);
            assert_eq!(planned.plan.labels.operation.as_deref(), Some("rename"));
        }

        #[test]
        fn same_name_is_empty() {
            let source = "class Foo { void bar() { int x = 1; return x; } }";
            let (planned, output) = rename_at(source, "x = 1", "x").unwrap();
            assert!(planned.plan.valid);
            assert!(!planned.plan.has_edits());
            assert_eq!(output, source);
        }

        #[test]
        fn overloaded_methods_renamed_together() {
            let source = "class A { void f(int a) {} void f(String s) {} void g() { f(1); } }";
            let (planned, output) = rename_at(source, "f(int", "h").unwrap();
            assert_eq!(planned.plan.edit_count(), 3);
            assert_eq!(
                output,
                "class A { void h(int a) {} void h(String s) {} void g() { h(1); } }"
            );
        }

        #[test]
        fn shadowed_field_left_alone() {
            let source = "class A { int v; void m() { int v = 2; v++; } int k() { return v; } }";
            let (_, output) = rename_at(source, "v;", "w").unwrap();
            assert_eq!(
                output,
                "class A { int w; void m() { int v = 2; v++; } int k() { return w; } }"
            );
        }

        #[test]
        fn duplicate_declaration_reported() {
            let source = "class A { void m() { int x = 1; int x = 2; } }";
            let (planned, _) = rename_at(source, "x = 1", "y").unwrap();
            assert_eq!(planned.diagnostics.len(), 1);
        }
    }

    mod validation {
        use super::*;

        #[test]
        fn keyword_rejected() {
            let source = "class Foo { int x; }";
            let err = rename_at(source, "x;", "class").unwrap_err();
            assert!(matches!(err, RenameError::InvalidName(_)));
        }

        #[test]
        fn restricted_type_name_rejected() {
            let err = rename_at("class Foo {}", "Foo", "var").unwrap_err();
            assert!(matches!(err, RenameError::InvalidName(_)));
        }
    }

    mod collisions {
        use super::*;

        #[test]
        fn same_scope() {
            let source = "class A { void m() { int a = 1; int b = 2; } }";
            let err = rename_at(source, "a = 1", "b").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn same_name_other_namespace_allowed() {
            let source = "class A { int size; int count() { return size; } }";
            let (_, output) = rename_at(source, "size;", "count").unwrap();
            assert_eq!(output, "class A { int count; int count() { return count; } }");
        }

        #[test]
        fn reference_captured_by_inner_declaration() {
            let source = "class A { int v; void m() { int w = 0; v++; } }";
            let err = rename_at(source, "v;", "w").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn this_qualified_reference_not_captured() {
            let source = "class A { int v; A(int w) { this.v = w; } }";
            let (_, output) = rename_at(source, "v;", "w").unwrap();
            assert_eq!(output, "class A { int w; A(int w) { this.w = w; } }");
        }

        #[test]
        fn outer_use_captured_by_renamed_local() {
            let source = "class A { int total; void m() { int t = 0; total++; } }";
            let err = rename_at(source, "t = 0", "total").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn use_before_local_is_not_captured() {
            let source = "class A { int total; void m() { total++; int t = 0; } }";
            let (_, output) = rename_at(source, "t = 0", "total").unwrap();
            assert_eq!(output, "class A { int total; void m() { total++; int total = 0; } }");
        }

        #[test]
        fn unresolved_use_captured() {
            let source = "class A { void m() { int a = 0; log(other); } }";
            let err = rename_at(source, "a = 0", "other").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn type_rename_captures_unbound_qualifier() {
            let source = "class Foo { int m() { return Math.abs(1); } }";
            let err = rename_at(source, "Foo", "Math").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));

            let source = "class Foo { void m() { System.out.println(1); } }";
            let err = rename_at(source, "Foo", "System").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn reference_before_inner_local_not_captured() {
            let source = "class A { int v; void m() { v++; int w = 0; } }";
            let (_, output) = rename_at(source, "v;", "w").unwrap();
            assert_eq!(output, "class A { int w; void m() { w++; int w = 0; } }");
        }

        #[test]
        fn local_shadowed_by_nested_local() {
            let source = "class A { void m() { int a = 0; { int b = 1; } a++; } }";
            let err = rename_at(source, "a = 0", "b").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn nested_local_shadowing_outer_local() {
            let source = "class A { void m() { int b = 0; { int a = 1; a++; } } }";
            let err = rename_at(source, "a = 1", "b").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn parameter_shadowed_by_lambda_parameter() {
            let source = "class A { void m(int p) { Runnable r = q -> {}; } }";
            let err = rename_at(source, "p)", "q").unwrap_err();
            assert!(matches!(err, RenameError::NameCollision { .. }));
        }

        #[test]
        fn finished_block_local_does_not_shadow() {
            let source = "class A { void m() { { int b = 1; } int a = 0; a++; } }";
            let (_, output) = rename_at(source, "a = 0", "b").unwrap();
            assert_eq!(output, "class A { void m() { { int b = 1; } int b = 0; b++; } }");
        }

        #[test]
        fn local_class_members_may_reuse_name() {
            let source =
                "class A { void m() { int a = 0; class L { void k() { int b = 1; } } a++; } }";
            let (_, output) = rename_at(source, "a = 0", "b").unwrap();
            assert!(output.contains("int b = 0;"));
            assert!(output.contains("b++;"));
        }

        #[test]
        fn collision_produces_no_plan() {
            let source = "class A { void m() { int a = 1; int b = 2; } }";
            assert!(rename_at(source, "a = 1", "b").is_err());
        }
    }

    mod file_rename {
        use super::*;

        fn suggestion(path: &str, source: &str, needle: &str, new_name: &str) -> Option<FileRename> {
            let tree = parse(source).unwrap();
            let scopes = resolve(&tree);
            let symbol = symbol_at(&tree, &scopes, source.find(needle).unwrap()).unwrap();
            file_rename_for(path, &scopes, symbol, new_name)
        }

        #[test]
        fn top_level_type_matching_file() {
            let rename = suggestion("src/Foo.java", "class Foo {}", "Foo", "Bar").unwrap();
            assert_eq!(rename.from, "src/Foo.java");
            assert_eq!(rename.to, "src/Bar.java");
        }

        #[test]
        fn nested_or_mismatched_types() {
            let source = "class Foo { class Inner {} }";
            assert!(suggestion("Foo.java", source, "Inner", "Other").is_none());
            assert!(suggestion("Other.java", source, "Foo", "Bar").is_none());
            assert!(suggestion("Foo.java", "class Foo { int x; }", "x;", "y").is_none());
        }
    }
}
