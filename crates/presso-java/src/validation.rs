//! Java identifier validation.
//!
//! Rename targets must be legal Java identifiers that are not reserved words.

use thiserror::Error;

use crate::kinds::SymbolKind;

/// Error for validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Invalid Java identifier name.
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Reserved keywords, including the literals `true`, `false` and `null`.
pub const JAVA_KEYWORDS: &[&str] = &[
    "_", "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
    "const", "continue", "default", "do", "double", "else", "enum", "extends", "false", "final",
    "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
    "interface", "long", "native", "new", "null", "package", "private", "protected", "public",
    "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this", "throw",
    "throws", "transient", "true", "try", "void", "volatile", "while",
];

/// Contextual keywords that may not name a type.
pub const RESTRICTED_TYPE_NAMES: &[&str] = &["permits", "record", "sealed", "var", "yield"];

/// Check if a name is a reserved Java keyword or literal.
pub fn is_java_keyword(name: &str) -> bool {
    JAVA_KEYWORDS.contains(&name)
}

fn invalid(name: &str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate that a string is a legal Java identifier.
///
/// ```
/// use presso_java::validation::validate_java_identifier;
///
/// assert!(validate_java_identifier("count").is_ok());
/// assert!(validate_java_identifier("$tmp").is_ok());
/// assert!(validate_java_identifier("9lives").is_err());
/// assert!(validate_java_identifier("class").is_err());
/// ```
pub fn validate_java_identifier(name: &str) -> ValidationResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(invalid(name, "name cannot be empty"));
    };

    if !first.is_alphabetic() && first != '_' && first != '$' {
        return Err(invalid(name, "must start with a letter, '_' or '$'"));
    }

    if let Some(ch) = chars.find(|&ch| !ch.is_alphanumeric() && ch != '_' && ch != '$') {
        return Err(invalid(name, format!("invalid character: '{}'", ch)));
    }

    if is_java_keyword(name) {
        return Err(invalid(name, "cannot use a Java keyword as identifier"));
    }

    Ok(())
}

/// Validate a new name for a symbol of the given kind.
pub fn validate_name_for(name: &str, kind: SymbolKind) -> ValidationResult<()> {
    validate_java_identifier(name)?;
    if kind == SymbolKind::Type && RESTRICTED_TYPE_NAMES.contains(&name) {
        return Err(invalid(name, "restricted identifier cannot name a type"));
    }
    Ok(())
}
