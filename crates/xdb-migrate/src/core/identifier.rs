//! Identifier validation, quoting policy and normalization.
//!
//! SQL identifiers cannot be bound as statement parameters, so every name
//! that reaches generated SQL is validated here and then rendered by the
//! dialect's quoting rules under the configured [`IdentifierQuoting`]
//! policy and [`IdentifierNormalizer`].

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

/// Maximum identifier length (conservative limit across databases).
/// - PostgreSQL: 63 bytes
/// - SQL Server: 128 characters
/// - MySQL: 64 characters
const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Validate an identifier for security issues.
///
/// Rejects empty identifiers, identifiers containing null bytes, and
/// identifiers exceeding the maximum length.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(MigrateError::Config(
            "Identifier cannot be empty".to_string(),
        ));
    }

    if name.contains('\0') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier contains null byte (possible injection attempt): {:?}",
            name
        )));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(MigrateError::Config(format!(
            "SECURITY: Identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    Ok(())
}

/// Wrap `name` in `open`/`close`, doubling any embedded `close` character.
pub fn quote_with(name: &str, open: char, close: char) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push(open);
    for c in name.chars() {
        if c == close {
            quoted.push(close);
        }
        quoted.push(c);
    }
    quoted.push(close);
    quoted
}

/// True when `name` is a regular identifier that needs no quoting:
/// a letter or underscore followed by letters, digits or underscores.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// When identifiers are quoted in generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierQuoting {
    /// Quote every identifier.
    #[default]
    Always,
    /// Quote only identifiers that are not plain or are reserved words.
    Minimal,
    /// Never quote.
    Never,
}

/// Case folding applied to identifiers before quoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierNormalizer {
    /// Keep names as introspected.
    #[default]
    Noop,
    /// Fold to the target dialect's native case for unquoted names.
    Standard,
    Lower,
    Upper,
}

/// Native case folding of a dialect for unquoted identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierCase {
    Lower,
    Upper,
    Preserve,
}

impl IdentifierNormalizer {
    /// Apply the normalizer given the dialect's native case.
    pub fn normalize(&self, name: &str, native: IdentifierCase) -> String {
        let case = match self {
            IdentifierNormalizer::Noop => IdentifierCase::Preserve,
            IdentifierNormalizer::Standard => native,
            IdentifierNormalizer::Lower => IdentifierCase::Lower,
            IdentifierNormalizer::Upper => IdentifierCase::Upper,
        };
        match case {
            IdentifierCase::Lower => name.to_lowercase(),
            IdentifierCase::Upper => name.to_uppercase(),
            IdentifierCase::Preserve => name.to_string(),
        }
    }
}

/// Reject check expressions that could smuggle extra statements into DDL.
///
/// Check expressions are copied verbatim from source metadata into
/// `CREATE TABLE`, so statement separators and comment markers are refused.
pub fn validate_check_expression(expression: &str) -> Result<()> {
    if expression.contains(';') {
        return Err(MigrateError::Config(format!(
            "SECURITY: Check constraint contains semicolon (possible injection): {:?}",
            expression
        )));
    }

    if expression.contains("--") || expression.contains("/*") || expression.contains("*/") {
        return Err(MigrateError::Config(format!(
            "SECURITY: Check constraint contains SQL comment markers (possible injection): {:?}",
            expression
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_normal() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("column with spaces").is_ok());
        assert!(validate_identifier("日本語").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_empty() {
        let result = validate_identifier("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_validate_identifier_rejects_null_byte() {
        let result = validate_identifier("table\0name");
        assert!(result.unwrap_err().to_string().contains("null byte"));
    }

    #[test]
    fn test_validate_identifier_rejects_too_long() {
        let long_name = "a".repeat(MAX_IDENTIFIER_LENGTH + 1);
        let result = validate_identifier(&long_name);
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn test_quote_with_escapes_closing_char() {
        assert_eq!(quote_with("users", '"', '"'), "\"users\"");
        assert_eq!(quote_with("table\"name", '"', '"'), "\"table\"\"name\"");
        assert_eq!(quote_with("a]b", '[', ']'), "[a]]b]");
        assert_eq!(quote_with("a`b", '`', '`'), "`a``b`");
    }

    #[test]
    fn test_is_plain_identifier() {
        assert!(is_plain_identifier("users"));
        assert!(is_plain_identifier("_x1"));
        assert!(!is_plain_identifier("1abc"));
        assert!(!is_plain_identifier("with space"));
        assert!(!is_plain_identifier(""));
    }

    #[test]
    fn test_normalizer() {
        assert_eq!(
            IdentifierNormalizer::Standard.normalize("Users", IdentifierCase::Upper),
            "USERS"
        );
        assert_eq!(
            IdentifierNormalizer::Noop.normalize("Users", IdentifierCase::Upper),
            "Users"
        );
        assert_eq!(
            IdentifierNormalizer::Lower.normalize("Users", IdentifierCase::Preserve),
            "users"
        );
    }

    #[test]
    fn test_check_expression_rejects_semicolon_and_comments() {
        assert!(validate_check_expression("price > 0").is_ok());
        assert!(validate_check_expression("1=1; DROP TABLE x").is_err());
        assert!(validate_check_expression("a > 0 -- x").is_err());
    }
}
