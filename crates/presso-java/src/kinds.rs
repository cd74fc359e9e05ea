//! Closed tags for the grammar node kinds that matter to scoping.
//!
//! The tree-sitter Java grammar defines a few hundred node kinds. Only the
//! ones that open scopes, declare names or carry identifier uses get their own
//! [`NodeKind`] variant; everything else is [`NodeKind::Other`] and is treated
//! as an opaque container by the resolver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind tag of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Program,
    PackageDeclaration,
    ImportDeclaration,

    // Type declarations and their bodies
    ClassDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    RecordDeclaration,
    AnnotationTypeDeclaration,
    ClassBody,
    InterfaceBody,
    EnumBody,
    EnumBodyDeclarations,
    AnnotationTypeBody,
    EnumConstant,
    TypeParameter,

    // Members
    FieldDeclaration,
    ConstantDeclaration,
    AnnotationTypeElementDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    CompactConstructorDeclaration,
    ConstructorBody,

    // Parameters and variables
    FormalParameters,
    FormalParameter,
    SpreadParameter,
    InferredParameters,
    CatchFormalParameter,
    LocalVariableDeclaration,
    VariableDeclarator,
    Resource,

    // Statements that open block scopes
    Block,
    StaticInitializer,
    SwitchBlock,
    ForStatement,
    EnhancedForStatement,
    CatchClause,
    TryWithResourcesStatement,
    LambdaExpression,

    // Pattern bindings
    InstanceofExpression,
    TypePattern,

    // Uses
    MethodInvocation,
    FieldAccess,
    ObjectCreationExpression,
    MethodReference,
    ScopedIdentifier,
    ScopedTypeIdentifier,
    Identifier,
    TypeIdentifier,
    This,

    // Non-variable names
    LabeledStatement,
    BreakStatement,
    ContinueStatement,
    MarkerAnnotation,
    Annotation,
    ElementValuePair,

    /// Grammar error node.
    Error,
    /// Any kind without scoping significance.
    Other,
}

impl NodeKind {
    /// Map a grammar kind name to its tag.
    pub fn from_grammar(kind: &str) -> Self {
        match kind {
            "program" => NodeKind::Program,
            "package_declaration" => NodeKind::PackageDeclaration,
            "import_declaration" => NodeKind::ImportDeclaration,
            "class_declaration" => NodeKind::ClassDeclaration,
            "interface_declaration" => NodeKind::InterfaceDeclaration,
            "enum_declaration" => NodeKind::EnumDeclaration,
            "record_declaration" => NodeKind::RecordDeclaration,
            "annotation_type_declaration" => NodeKind::AnnotationTypeDeclaration,
            "class_body" => NodeKind::ClassBody,
            "interface_body" => NodeKind::InterfaceBody,
            "enum_body" => NodeKind::EnumBody,
            "enum_body_declarations" => NodeKind::EnumBodyDeclarations,
            "annotation_type_body" => NodeKind::AnnotationTypeBody,
            "enum_constant" => NodeKind::EnumConstant,
            "type_parameter" => NodeKind::TypeParameter,
            "field_declaration" => NodeKind::FieldDeclaration,
            "constant_declaration" => NodeKind::ConstantDeclaration,
            "annotation_type_element_declaration" => NodeKind::AnnotationTypeElementDeclaration,
            "method_declaration" => NodeKind::MethodDeclaration,
            "constructor_declaration" => NodeKind::ConstructorDeclaration,
            "compact_constructor_declaration" => NodeKind::CompactConstructorDeclaration,
            "constructor_body" => NodeKind::ConstructorBody,
            "formal_parameters" => NodeKind::FormalParameters,
            "formal_parameter" => NodeKind::FormalParameter,
            "spread_parameter" => NodeKind::SpreadParameter,
            "inferred_parameters" => NodeKind::InferredParameters,
            "catch_formal_parameter" => NodeKind::CatchFormalParameter,
            "local_variable_declaration" => NodeKind::LocalVariableDeclaration,
            "variable_declarator" => NodeKind::VariableDeclarator,
            "resource" => NodeKind::Resource,
            "block" => NodeKind::Block,
            "static_initializer" => NodeKind::StaticInitializer,
            "switch_block" => NodeKind::SwitchBlock,
            "for_statement" => NodeKind::ForStatement,
            "enhanced_for_statement" => NodeKind::EnhancedForStatement,
            "catch_clause" => NodeKind::CatchClause,
            "try_with_resources_statement" => NodeKind::TryWithResourcesStatement,
            "lambda_expression" => NodeKind::LambdaExpression,
            "instanceof_expression" => NodeKind::InstanceofExpression,
            "type_pattern" => NodeKind::TypePattern,
            "method_invocation" => NodeKind::MethodInvocation,
            "field_access" => NodeKind::FieldAccess,
            "object_creation_expression" => NodeKind::ObjectCreationExpression,
            "method_reference" => NodeKind::MethodReference,
            "scoped_identifier" => NodeKind::ScopedIdentifier,
            "scoped_type_identifier" => NodeKind::ScopedTypeIdentifier,
            "identifier" => NodeKind::Identifier,
            "type_identifier" => NodeKind::TypeIdentifier,
            "this" => NodeKind::This,
            "labeled_statement" => NodeKind::LabeledStatement,
            "break_statement" => NodeKind::BreakStatement,
            "continue_statement" => NodeKind::ContinueStatement,
            "marker_annotation" => NodeKind::MarkerAnnotation,
            "annotation" => NodeKind::Annotation,
            "element_value_pair" => NodeKind::ElementValuePair,
            "ERROR" => NodeKind::Error,
            _ => NodeKind::Other,
        }
    }

    /// Class, interface, enum, record or annotation type declaration.
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::ClassDeclaration
                | NodeKind::InterfaceDeclaration
                | NodeKind::EnumDeclaration
                | NodeKind::RecordDeclaration
                | NodeKind::AnnotationTypeDeclaration
        )
    }

    /// Method-like declarations that own a parameter scope.
    pub fn is_callable_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
                | NodeKind::CompactConstructorDeclaration
        )
    }

    /// Containers whose direct children are type members.
    pub fn is_type_body(self) -> bool {
        matches!(
            self,
            NodeKind::ClassBody
                | NodeKind::InterfaceBody
                | NodeKind::EnumBody
                | NodeKind::EnumBodyDeclarations
                | NodeKind::AnnotationTypeBody
        )
    }

    /// The declaration kind this node represents, if any.
    pub fn declaration_kind(self) -> Option<DeclarationKind> {
        match self {
            k if k.is_type_declaration() => Some(DeclarationKind::Type),
            NodeKind::MethodDeclaration | NodeKind::AnnotationTypeElementDeclaration => {
                Some(DeclarationKind::Method)
            }
            NodeKind::ConstructorDeclaration | NodeKind::CompactConstructorDeclaration => {
                Some(DeclarationKind::Constructor)
            }
            NodeKind::FieldDeclaration | NodeKind::ConstantDeclaration | NodeKind::EnumConstant => {
                Some(DeclarationKind::Field)
            }
            NodeKind::LocalVariableDeclaration => Some(DeclarationKind::LocalVariable),
            NodeKind::FormalParameter
            | NodeKind::SpreadParameter
            | NodeKind::CatchFormalParameter => Some(DeclarationKind::Parameter),
            NodeKind::LambdaExpression => Some(DeclarationKind::Lambda),
            _ => None,
        }
    }
}

/// Kind of a resolved symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Class, interface, enum, record, annotation type or type parameter.
    Type,
    Method,
    /// Field, enum constant or record component.
    Field,
    LocalVariable,
    Parameter,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Type => "type",
            SymbolKind::Method => "method",
            SymbolKind::Field => "field",
            SymbolKind::LocalVariable => "local_variable",
            SymbolKind::Parameter => "parameter",
        }
    }

    /// Java keeps types, methods and variables in separate namespaces.
    pub fn namespace(&self) -> Namespace {
        match self {
            SymbolKind::Type => Namespace::Type,
            SymbolKind::Method => Namespace::Method,
            SymbolKind::Field | SymbolKind::LocalVariable | SymbolKind::Parameter => {
                Namespace::Variable
            }
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Name space a binding lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Type,
    Method,
    Variable,
}

/// Declaration kinds accepted by enclosing-declaration queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    Type,
    Method,
    Constructor,
    Field,
    LocalVariable,
    Parameter,
    Lambda,
}

impl DeclarationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclarationKind::Type => "type",
            DeclarationKind::Method => "method",
            DeclarationKind::Constructor => "constructor",
            DeclarationKind::Field => "field",
            DeclarationKind::LocalVariable => "local_variable",
            DeclarationKind::Parameter => "parameter",
            DeclarationKind::Lambda => "lambda",
        }
    }
}

impl fmt::Display for DeclarationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_are_opaque() {
        assert_eq!(NodeKind::from_grammar("binary_expression"), NodeKind::Other);
        assert_eq!(NodeKind::from_grammar("{"), NodeKind::Other);
        assert_eq!(NodeKind::from_grammar("ERROR"), NodeKind::Error);
    }

    #[test]
    fn declaration_kinds() {
        assert_eq!(
            NodeKind::from_grammar("record_declaration").declaration_kind(),
            Some(DeclarationKind::Type)
        );
        assert_eq!(
            NodeKind::from_grammar("compact_constructor_declaration").declaration_kind(),
            Some(DeclarationKind::Constructor)
        );
        assert_eq!(
            NodeKind::from_grammar("enum_constant").declaration_kind(),
            Some(DeclarationKind::Field)
        );
        assert_eq!(NodeKind::Block.declaration_kind(), None);
    }

    #[test]
    fn namespaces() {
        assert_eq!(SymbolKind::Field.namespace(), Namespace::Variable);
        assert_eq!(SymbolKind::Parameter.namespace(), Namespace::Variable);
        assert_eq!(SymbolKind::Method.namespace(), Namespace::Method);
        assert_eq!(SymbolKind::Type.namespace(), Namespace::Type);
    }

    #[test]
    fn symbol_kind_serializes_snake_case() {
        let json = serde_json::to_string(&SymbolKind::LocalVariable).unwrap();
        assert_eq!(json, "\"local_variable\"");
    }
}
