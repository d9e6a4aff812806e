//! Generic SQL:2003 dialect.
//!
//! Used for portable script output when no specific target engine is
//! named. It has no foreign key drop syntax and no empty-insert form, so
//! those operations fail with an unsupported-capability error.

use crate::core::identifier::{quote_with, IdentifierCase};
use crate::core::traits::{Dialect, DropForeignKeySyntax};
use crate::core::types::codes;
use crate::dialect::TypeNameMap;

/// ANSI dialect implementation.
#[derive(Debug, Clone)]
pub struct AnsiDialect {
    types: TypeNameMap,
}

impl Default for AnsiDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl AnsiDialect {
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
            .add_code(codes::FLOAT, "FLOAT")
            .add_code(codes::DOUBLE, "DOUBLE PRECISION")
            .add_code(codes::NUMERIC, "NUMERIC({P},{S})")
            .add_code(codes::DECIMAL, "DECIMAL({P},{S})")
            .add_code(codes::CHAR, "CHARACTER({N})")
            .add_code(codes::NCHAR, "NATIONAL CHARACTER({N})")
            .add_code(codes::VARCHAR, "CHARACTER VARYING({N})")
            .add_code(codes::NVARCHAR, "NATIONAL CHARACTER VARYING({N})")
            .add_code(codes::LONGVARCHAR, "CHARACTER LARGE OBJECT")
            .add_code(codes::LONGNVARCHAR, "NATIONAL CHARACTER LARGE OBJECT")
            .add_code(codes::CLOB, "CHARACTER LARGE OBJECT")
            .add_code(codes::NCLOB, "NATIONAL CHARACTER LARGE OBJECT")
            .add_code(codes::DATE, "DATE")
            .add_code(codes::TIME, "TIME")
            .add_code(codes::TIME_WITH_TIMEZONE, "TIME WITH TIME ZONE")
            .add_code(codes::TIMESTAMP, "TIMESTAMP")
            .add_code(codes::TIMESTAMP_WITH_TIMEZONE, "TIMESTAMP WITH TIME ZONE")
            .add_code(codes::BINARY, "BINARY({N})")
            .add_code(codes::VARBINARY, "BINARY VARYING({N})")
            .add_code(codes::LONGVARBINARY, "BINARY LARGE OBJECT")
            .add_code(codes::BLOB, "BINARY LARGE OBJECT");
        Self { types }
    }
}

impl Dialect for AnsiDialect {
    fn name(&self) -> &str {
        "ansi"
    }

    fn quote_ident(&self, name: &str) -> String {
        quote_with(name, '"', '"')
    }

    fn identifier_case(&self) -> IdentifierCase {
        IdentifierCase::Upper
    }

    fn drop_foreign_key(&self) -> DropForeignKeySyntax {
        DropForeignKeySyntax::Unsupported
    }

    fn no_columns_insert(&self) -> Option<&'static str> {
        None
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn type_names(&self) -> &TypeNameMap {
        &self.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_has_no_fk_drop() {
        let dialect = AnsiDialect::new();
        assert_eq!(dialect.drop_foreign_key(), DropForeignKeySyntax::Unsupported);
        assert!(dialect.no_columns_insert().is_none());
        assert_eq!(dialect.quote_ident("t"), "\"t\"");
    }
}
