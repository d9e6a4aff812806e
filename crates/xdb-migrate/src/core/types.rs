//! Declared column types.
//!
//! A column type is identified by a numeric type code (the portable
//! driver-level codes below) plus an optional database type name that
//! distinguishes vendor types sharing a code, e.g. `(OTHER, "uuid")`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Portable type codes.
pub mod codes {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const SMALLINT: i32 = 5;
    pub const INTEGER: i32 = 4;
    pub const BIGINT: i32 = -5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const CHAR: i32 = 1;
    pub const VARCHAR: i32 = 12;
    pub const LONGVARCHAR: i32 = -1;
    pub const NCHAR: i32 = -15;
    pub const NVARCHAR: i32 = -9;
    pub const LONGNVARCHAR: i32 = -16;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const TIME_WITH_TIMEZONE: i32 = 2013;
    pub const TIMESTAMP_WITH_TIMEZONE: i32 = 2014;
    pub const BINARY: i32 = -2;
    pub const VARBINARY: i32 = -3;
    pub const LONGVARBINARY: i32 = -4;
    pub const NULL: i32 = 0;
    pub const OTHER: i32 = 1111;
    pub const BLOB: i32 = 2004;
    pub const CLOB: i32 = 2005;
    pub const NCLOB: i32 = 2011;
    pub const BOOLEAN: i32 = 16;
}

/// Type descriptor: (type code, type name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeDesc {
    #[serde(rename = "type_code")]
    pub code: i32,
    #[serde(rename = "type_name", default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TypeDesc {
    pub fn new(code: i32, name: impl Into<String>) -> Self {
        Self {
            code,
            name: Some(name.into()),
        }
    }

    /// Descriptor with only a type code.
    pub fn code(code: i32) -> Self {
        Self { code, name: None }
    }

    /// Same code without the vendor name, used for fallback lookups.
    pub fn without_name(&self) -> Self {
        Self::code(self.code)
    }

    /// Uniform text typing for formats that do not record column types.
    pub fn text() -> Self {
        Self::new(codes::VARCHAR, "VARCHAR")
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.code),
        }
    }
}
