//! NuoDB SQL dialect (Strategy pattern).
//!
//! NuoDB folds unquoted names to upper case, drops foreign keys by
//! referencing the key columns and target table rather than by name, and
//! supports `REPLACE` as an insert-or-update statement.

use crate::core::identifier::{quote_with, IdentifierCase};
use crate::core::schema::ReferentialAction;
use crate::core::traits::{Dialect, DropForeignKeySyntax};
use crate::core::types::codes;
use crate::dialect::TypeNameMap;
use crate::error::Result;

/// NuoDB dialect implementation.
#[derive(Debug, Clone)]
pub struct NuodbDialect {
    types: TypeNameMap,
}

impl Default for NuodbDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl NuodbDialect {
    /// Create a new NuoDB dialect instance.
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
            .add_code(codes::FLOAT, "DOUBLE")
            .add_code(codes::DOUBLE, "DOUBLE")
            .add_code(codes::NUMERIC, "NUMERIC({P},{S})")
            .add_code(codes::DECIMAL, "DECIMAL({P},{S})")
            .add_code(codes::CHAR, "CHAR({N})")
            .add_code(codes::NCHAR, "NCHAR({N})")
            .add_code(codes::VARCHAR, "VARCHAR({N})")
            .add_code(codes::NVARCHAR, "NVARCHAR({N})")
            .add_code(codes::LONGVARCHAR, "STRING")
            .add_code(codes::LONGNVARCHAR, "STRING")
            .add_code(codes::CLOB, "CLOB")
            .add_code(codes::NCLOB, "NCLOB")
            .add_code(codes::DATE, "DATE")
            .add_code(codes::TIME, "TIME")
            .add_code(codes::TIMESTAMP, "TIMESTAMP")
            .add_code(codes::TIMESTAMP_WITH_TIMEZONE, "TIMESTAMP")
            .add_code(codes::BINARY, "BINARY({N})")
            .add_code(codes::VARBINARY, "VARBINARY({N})")
            .add_code(codes::LONGVARBINARY, "BLOB")
            .add_code(codes::BLOB, "BLOB")
            .add(codes::OTHER, "uuid", "CHAR(36)");
        Self { types }
    }
}

impl Dialect for NuodbDialect {
    fn name(&self) -> &str {
        "nuodb"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_with(name, '"', '"')
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Upper
    }

    fn drop_foreign_key(&self) -> DropForeignKeySyntax {
        DropForeignKeySyntax::ByReference("DROP FOREIGN KEY")
    }

    fn referential_action(&self, action: ReferentialAction) -> Result<Option<&'static str>> {
        match action {
            ReferentialAction::NoAction => Ok(None),
            ReferentialAction::SetDefault => Err(self.unsupported("ON UPDATE/DELETE SET DEFAULT")),
            other => Ok(Some(other.keyword())),
        }
    }

    fn no_columns_insert(&self) -> Option<&'static str> {
        Some("DEFAULT VALUES")
    }

    fn replace_keyword(&self) -> Option<&'static str> {
        Some("REPLACE")
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn type_names(&self) -> &TypeNameMap {
        &self.types
    }
}
