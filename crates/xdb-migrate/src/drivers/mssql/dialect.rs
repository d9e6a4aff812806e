//! MSSQL SQL dialect (Strategy pattern).
//!
//! Provides SQL Server identifier quoting, referential actions, parameter
//! placeholders and DDL type names.

use crate::core::identifier::quote_with;
use crate::core::schema::ReferentialAction;
use crate::core::traits::{Dialect, DropForeignKeySyntax};
use crate::core::types::codes;
use crate::dialect::TypeNameMap;
use crate::error::Result;

/// Microsoft SQL Server dialect implementation.
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    types: TypeNameMap,
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MssqlDialect {
    /// Create a new MSSQL dialect instance.
    pub fn new() -> Self {
        let mut types = TypeNameMap::new();
        types
            .add_code(codes::BIT, "BIT")
            .add_code(codes::BOOLEAN, "BIT")
            .add_code(codes::TINYINT, "TINYINT")
            .add_code(codes::SMALLINT, "SMALLINT")
            .add_code(codes::INTEGER, "INT")
            .add_code(codes::BIGINT, "BIGINT")
            .add_code(codes::REAL, "REAL")
            .add_code(codes::FLOAT, "FLOAT")
            .add_code(codes::DOUBLE, "FLOAT")
            .add_code(codes::NUMERIC, "NUMERIC({P},{S})")
            .add_code(codes::DECIMAL, "DECIMAL({P},{S})")
            .add_code(codes::CHAR, "CHAR({N})")
            .add_code(codes::NCHAR, "NCHAR({N})")
            .add_code(codes::VARCHAR, "VARCHAR({N})")
            .add_code(codes::NVARCHAR, "NVARCHAR({N})")
            .add_code(codes::LONGVARCHAR, "VARCHAR(MAX)")
            .add_code(codes::LONGNVARCHAR, "NVARCHAR(MAX)")
            .add_code(codes::CLOB, "VARCHAR(MAX)")
            .add_code(codes::NCLOB, "NVARCHAR(MAX)")
            .add_code(codes::DATE, "DATE")
            .add_code(codes::TIME, "TIME")
            .add_code(codes::TIMESTAMP, "DATETIME2")
            .add_code(codes::TIMESTAMP_WITH_TIMEZONE, "DATETIMEOFFSET")
            .add_code(codes::BINARY, "BINARY({N})")
            .add_code(codes::VARBINARY, "VARBINARY({N})")
            .add_code(codes::LONGVARBINARY, "VARBINARY(MAX)")
            .add_code(codes::BLOB, "VARBINARY(MAX)")
            .add(codes::OTHER, "uuid", "UNIQUEIDENTIFIER")
            .add(codes::OTHER, "json", "NVARCHAR(MAX)");
        Self { types }
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        "mssql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // MSSQL uses square brackets; closing brackets are doubled
        quote_with(name, '[', ']')
    }

    fn supports_catalogs(&self) -> bool {
        true
    }

    fn drop_foreign_key(&self) -> DropForeignKeySyntax {
        DropForeignKeySyntax::ByName("DROP CONSTRAINT")
    }

    fn referential_action(&self, action: ReferentialAction) -> Result<Option<&'static str>> {
        // SQL Server has no RESTRICT; NO ACTION has the same effect
        match action {
            ReferentialAction::NoAction => Ok(None),
            ReferentialAction::Restrict => Ok(Some("NO ACTION")),
            other => Ok(Some(other.keyword())),
        }
    }

    fn drop_primary_key_by_name(&self) -> bool {
        true
    }

    fn no_columns_insert(&self) -> Option<&'static str> {
        Some("DEFAULT VALUES")
    }

    fn param_placeholder(&self, index: usize) -> String {
        // MSSQL uses @P1, @P2, etc. (1-based)
        format!("@P{}", index)
    }

    fn drop_index_on_table(&self) -> bool {
        true
    }

    fn type_names(&self) -> &TypeNameMap {
        &self.types
    }
}
