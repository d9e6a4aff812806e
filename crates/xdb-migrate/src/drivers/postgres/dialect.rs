//! PostgreSQL SQL dialect (Strategy pattern).
//!
//! Provides PostgreSQL-specific identifier quoting, referential actions,
//! parameter placeholders and DDL type names.

use crate::core::identifier::{quote_with, IdentifierCase};
use crate::core::traits::{Dialect, DropForeignKeySyntax};
use crate::core::types::codes;
use crate::dialect::TypeNameMap;

/// PostgreSQL dialect implementation.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    types: TypeNameMap,
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresDialect {
    /// Create a new PostgreSQL dialect instance.
    pub fn new() -> Self {
        let mut types = TypeNameMap::new();
        types
            .add_code(codes::BIT, "BOOLEAN")
            .add_code(codes::BOOLEAN, "BOOLEAN")
            .add_code(codes::TINYINT, "SMALLINT")
            .add_code(codes::SMALLINT, "SMALLINT")
            .add_code(codes::INTEGER, "INTEGER")
            .add_code(codes::BIGINT, "BIGINT")
            .add_code(codes::REAL, "REAL")
            .add_code(codes::FLOAT, "DOUBLE PRECISION")
            .add_code(codes::DOUBLE, "DOUBLE PRECISION")
            .add_code(codes::NUMERIC, "NUMERIC({P},{S})")
            .add_code(codes::DECIMAL, "NUMERIC({P},{S})")
            .add_code(codes::CHAR, "CHAR({N})")
            .add_code(codes::NCHAR, "CHAR({N})")
            .add_code(codes::VARCHAR, "VARCHAR({N})")
            .add_code(codes::NVARCHAR, "VARCHAR({N})")
            .add_code(codes::LONGVARCHAR, "TEXT")
            .add_code(codes::LONGNVARCHAR, "TEXT")
            .add_code(codes::CLOB, "TEXT")
            .add_code(codes::NCLOB, "TEXT")
            .add_code(codes::DATE, "DATE")
            .add_code(codes::TIME, "TIME")
            .add_code(codes::TIME_WITH_TIMEZONE, "TIMETZ")
            .add_code(codes::TIMESTAMP, "TIMESTAMP")
            .add_code(codes::TIMESTAMP_WITH_TIMEZONE, "TIMESTAMPTZ")
            .add_code(codes::BINARY, "BYTEA")
            .add_code(codes::VARBINARY, "BYTEA")
            .add_code(codes::LONGVARBINARY, "BYTEA")
            .add_code(codes::BLOB, "BYTEA")
            .add(codes::OTHER, "uuid", "UUID")
            .add(codes::OTHER, "uniqueidentifier", "UUID")
            .add(codes::OTHER, "json", "JSONB")
            .add(codes::OTHER, "jsonb", "JSONB");
        Self { types }
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_ident(&self, name: &str) -> String {
        // PostgreSQL uses double quotes; embedded double quotes are doubled
        quote_with(name, '"', '"')
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Lower
    }

    fn drop_foreign_key(&self) -> DropForeignKeySyntax {
        DropForeignKeySyntax::ByName("DROP CONSTRAINT")
    }

    fn drop_primary_key_by_name(&self) -> bool {
        true
    }

    fn no_columns_insert(&self) -> Option<&'static str> {
        Some("DEFAULT VALUES")
    }

    fn param_placeholder(&self, index: usize) -> String {
        // PostgreSQL uses $1, $2, etc. (1-based)
        format!("${}", index)
    }

    fn type_names(&self) -> &TypeNameMap {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::TypeDesc;

    #[test]
    fn test_quote_ident() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.quote_ident("users"), "\"users\"");
        assert_eq!(dialect.quote_ident("table\"name"), "\"table\"\"name\"");
    }

    #[test]
    fn test_param_placeholder() {
        let dialect = PostgresDialect::new();
        assert_eq!(dialect.param_placeholder(1), "$1");
        assert_eq!(dialect.param_placeholder(10), "$10");
    }

    #[test]
    fn test_type_names() {
        let dialect = PostgresDialect::new();
        let types = dialect.type_names();
        assert_eq!(
            types
                .type_name(&TypeDesc::code(codes::VARCHAR), Some(50), None, None)
                .as_deref(),
            Some("VARCHAR(50)")
        );
        assert_eq!(
            types
                .type_name(&TypeDesc::new(codes::OTHER, "UUID"), None, None, None)
                .as_deref(),
            Some("UUID")
        );
        assert_eq!(
            types
                .type_name(&TypeDesc::code(codes::BLOB), None, None, None)
                .as_deref(),
            Some("BYTEA")
        );
    }
}
