//! MySQL/MariaDB SQL dialect (Strategy pattern).
//!
//! MySQL quotes with backticks, treats the catalog as the database name,
//! drops foreign keys by name and rejects `SET DEFAULT` actions on InnoDB.

use crate::core::identifier::quote_with;
use crate::core::schema::ReferentialAction;
use crate::core::traits::{Dialect, DropForeignKeySyntax};
use crate::core::types::codes;
use crate::dialect::TypeNameMap;
use crate::error::Result;

/// MySQL dialect implementation.
#[derive(Debug, Clone)]
pub struct MysqlDialect {
    types: TypeNameMap,
}

impl Default for MysqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MysqlDialect {
    /// Create a new MySQL dialect instance.
    pub fn new() -> Self {
        let mut types = TypeNameMap::new();
        types
            .add_code(codes::BIT, "BIT(1)")
            .add_code(codes::BOOLEAN, "BOOLEAN")
            .add_code(codes::TINYINT, "TINYINT")
            .add_code(codes::SMALLINT, "SMALLINT")
            .add_code(codes::INTEGER, "INT")
            .add_code(codes::BIGINT, "BIGINT")
            .add_code(codes::REAL, "FLOAT")
            .add_code(codes::FLOAT, "DOUBLE")
            .add_code(codes::DOUBLE, "DOUBLE")
            .add_code(codes::NUMERIC, "DECIMAL({P},{S})")
            .add_code(codes::DECIMAL, "DECIMAL({P},{S})")
            .add_code(codes::CHAR, "CHAR({N})")
            .add_code(codes::NCHAR, "CHAR({N})")
            .add_code(codes::VARCHAR, "VARCHAR({N})")
            .add_code(codes::NVARCHAR, "VARCHAR({N})")
            .add_code(codes::LONGVARCHAR, "LONGTEXT")
            .add_code(codes::LONGNVARCHAR, "LONGTEXT")
            .add_code(codes::CLOB, "LONGTEXT")
            .add_code(codes::NCLOB, "LONGTEXT")
            .add_code(codes::DATE, "DATE")
            .add_code(codes::TIME, "TIME(6)")
            .add_code(codes::TIMESTAMP, "DATETIME(6)")
            .add_code(codes::TIMESTAMP_WITH_TIMEZONE, "TIMESTAMP(6)")
            .add_code(codes::BINARY, "BINARY({N})")
            .add_code(codes::VARBINARY, "VARBINARY({N})")
            .add_code(codes::LONGVARBINARY, "LONGBLOB")
            .add_code(codes::BLOB, "LONGBLOB")
            .add(codes::OTHER, "uuid", "CHAR(36)")
            .add(codes::OTHER, "json", "JSON")
            .add(codes::OTHER, "jsonb", "JSON")
            // VARCHAR and VARBINARY need a length in MySQL
            .default_size(codes::VARCHAR, 255)
            .default_size(codes::NVARCHAR, 255)
            .default_size(codes::VARBINARY, 255);
        Self { types }
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_with(name, '`', '`')
    }

    fn supports_catalogs(&self) -> bool {
        true
    }

    fn drop_foreign_key(&self) -> DropForeignKeySyntax {
        DropForeignKeySyntax::ByName("DROP FOREIGN KEY")
    }

    fn referential_action(&self, action: ReferentialAction) -> Result<Option<&'static str>> {
        match action {
            ReferentialAction::NoAction => Ok(None),
            ReferentialAction::SetDefault => Err(self.unsupported("ON UPDATE/DELETE SET DEFAULT")),
            other => Ok(Some(other.keyword())),
        }
    }

    fn no_columns_insert(&self) -> Option<&'static str> {
        Some("() VALUES ()")
    }

    fn replace_keyword(&self) -> Option<&'static str> {
        Some("REPLACE")
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn drop_index_on_table(&self) -> bool {
        true
    }

    fn type_names(&self) -> &TypeNameMap {
        &self.types
    }
}
