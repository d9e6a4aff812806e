//! Type handlers and the handler registry.
//!
//! A handler knows how to read and write one declared column type in its
//! natural value class. Handlers are registered by `(type code, type name)`
//! and looked up on every access: the exact pair first, then the code alone.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::core::types::{codes, TypeDesc};
use crate::core::value::{Lob, LobKind, Value, ValueClass};
use crate::error::{MigrateError, Result};

use super::cursor::{ParameterSink, RowCursor};

/// Reads and writes one declared type in its natural value class.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// Natural class of values produced and accepted by this handler.
    fn value_class(&self) -> ValueClass;

    fn get(&self, cursor: &dyn RowCursor, column: usize) -> Result<Value> {
        cursor.get(column, self.value_class())
    }

    /// Bind a value of the natural class (or NULL).
    fn set(&self, sink: &mut dyn ParameterSink, column: usize, value: Value) -> Result<()> {
        let class = self.value_class();
        match value {
            Value::Null(_) => sink.bind(column, Value::Null(class)),
            v if v.class() == class => sink.bind(column, v),
            v => Err(MigrateError::Format(format!(
                "cannot bind {} value to a {} parameter",
                v.class(),
                class
            ))),
        }
    }
}

/// Handler whose natural class maps one-to-one onto a driver type.
#[derive(Debug, Clone, Copy)]
pub struct SimpleTypeHandler {
    class: ValueClass,
}

impl SimpleTypeHandler {
    pub fn new(class: ValueClass) -> Self {
        Self { class }
    }
}

impl TypeHandler for SimpleTypeHandler {
    fn value_class(&self) -> ValueClass {
        self.class
    }
}

/// Handler for BLOB/CLOB columns.
///
/// Drivers report large objects without their kind, so the handler stamps
/// the declared kind on every value it reads.
#[derive(Debug, Clone, Copy)]
pub struct LobHandler {
    kind: LobKind,
}

impl LobHandler {
    pub fn new(kind: LobKind) -> Self {
        Self { kind }
    }
}

impl TypeHandler for LobHandler {
    fn value_class(&self) -> ValueClass {
        ValueClass::Lob
    }

    fn get(&self, cursor: &dyn RowCursor, column: usize) -> Result<Value> {
        match cursor.get(column, ValueClass::Lob)? {
            Value::Lob(lob) if lob.kind != self.kind => Ok(Value::Lob(Lob {
                kind: self.kind,
                data: lob.data,
            })),
            other => Ok(other),
        }
    }
}

/// Registry of type handlers keyed by `(type code, type name)`.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_desc: HashMap<(i32, String), Arc<dyn TypeHandler>>,
    by_code: HashMap<i32, Arc<dyn TypeHandler>>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with handlers for the portable type codes and the
    /// common vendor types that share `OTHER`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let simple = |class| Arc::new(SimpleTypeHandler::new(class)) as Arc<dyn TypeHandler>;

        for (code, class) in [
            (codes::BIT, ValueClass::Bool),
            (codes::BOOLEAN, ValueClass::Bool),
            (codes::TINYINT, ValueClass::I16),
            (codes::SMALLINT, ValueClass::I16),
            (codes::INTEGER, ValueClass::I32),
            (codes::BIGINT, ValueClass::I64),
            (codes::REAL, ValueClass::F32),
            (codes::FLOAT, ValueClass::F64),
            (codes::DOUBLE, ValueClass::F64),
            (codes::NUMERIC, ValueClass::Decimal),
            (codes::DECIMAL, ValueClass::Decimal),
            (codes::CHAR, ValueClass::Text),
            (codes::VARCHAR, ValueClass::Text),
            (codes::LONGVARCHAR, ValueClass::Text),
            (codes::NCHAR, ValueClass::Text),
            (codes::NVARCHAR, ValueClass::Text),
            (codes::LONGNVARCHAR, ValueClass::Text),
            (codes::BINARY, ValueClass::Bytes),
            (codes::VARBINARY, ValueClass::Bytes),
            (codes::LONGVARBINARY, ValueClass::Bytes),
            (codes::DATE, ValueClass::Date),
            (codes::TIME, ValueClass::Time),
            (codes::TIME_WITH_TIMEZONE, ValueClass::Text),
            (codes::TIMESTAMP, ValueClass::Timestamp),
            (codes::TIMESTAMP_WITH_TIMEZONE, ValueClass::TimestampTz),
        ] {
            registry.register_code(code, simple(class));
        }

        registry.register_code(codes::BLOB, Arc::new(LobHandler::new(LobKind::Binary)));
        registry.register_code(codes::CLOB, Arc::new(LobHandler::new(LobKind::Character)));
        registry.register_code(codes::NCLOB, Arc::new(LobHandler::new(LobKind::Character)));

        registry.register(codes::OTHER, "uuid", simple(ValueClass::Uuid));
        registry.register(codes::OTHER, "uniqueidentifier", simple(ValueClass::Uuid));
        registry.register(codes::OTHER, "json", simple(ValueClass::Text));
        registry.register(codes::OTHER, "jsonb", simple(ValueClass::Text));

        registry
    }

    /// Register a handler for one `(code, name)` pair.
    pub fn register(&mut self, code: i32, name: &str, handler: Arc<dyn TypeHandler>) {
        self.by_desc.insert((code, name.to_lowercase()), handler);
    }

    /// Register a handler for every type with this code.
    pub fn register_code(&mut self, code: i32, handler: Arc<dyn TypeHandler>) {
        self.by_code.insert(code, handler);
    }

    /// Resolve the handler for a declared type.
    pub fn handler(&self, desc: &TypeDesc) -> Result<Arc<dyn TypeHandler>> {
        desc.name
            .as_ref()
            .and_then(|name| self.by_desc.get(&(desc.code, name.to_lowercase())))
            .or_else(|| self.by_code.get(&desc.code))
            .cloned()
            .ok_or_else(|| MigrateError::TypeNotSupported(desc.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::cursor::{MemoryRow, ParameterRow};

    #[test]
    fn test_unknown_type_names_the_type() {
        let registry = TypeRegistry::with_defaults();
        let err = registry
            .handler(&TypeDesc::new(9999, "UNKNOWN"))
            .unwrap_err();
        assert!(matches!(err, MigrateError::TypeNotSupported(_)));
        assert!(err.to_string().contains("UNKNOWN"));
    }

    #[test]
    fn test_exact_pair_before_code() {
        let registry = TypeRegistry::with_defaults();
        let uuid = registry.handler(&TypeDesc::new(codes::OTHER, "UUID")).unwrap();
        assert_eq!(uuid.value_class(), ValueClass::Uuid);
        let int = registry.handler(&TypeDesc::new(codes::INTEGER, "int4")).unwrap();
        assert_eq!(int.value_class(), ValueClass::I32);
        assert!(registry
            .handler(&TypeDesc::new(codes::OTHER, "geometry"))
            .is_err());
    }

    #[test]
    fn test_lob_handler_stamps_kind() {
        let handler = LobHandler::new(LobKind::Character);
        let row = MemoryRow::new(vec![Value::Lob(Lob::binary(b"abc".to_vec()))]);
        match handler.get(&row, 0).unwrap() {
            Value::Lob(lob) => assert_eq!(lob.kind, LobKind::Character),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_set_rejects_wrong_class() {
        let handler = SimpleTypeHandler::new(ValueClass::I32);
        let mut params = ParameterRow::with_columns(1);
        assert!(handler.set(&mut params, 0, Value::from("x")).is_err());
        handler
            .set(&mut params, 0, Value::Null(ValueClass::Text))
            .unwrap();
        assert_eq!(params.into_values(), vec![Value::Null(ValueClass::I32)]);
    }
}
