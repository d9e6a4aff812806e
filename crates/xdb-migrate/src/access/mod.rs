//! Value access layer.
//!
//! Uniform get/set of typed values against row cursors and statement
//! parameters. [`ValueAccessProvider`] resolves a [`TypeHandler`] from a
//! column's declared type and applies an adapter from the
//! [`AdapterRegistry`] when the caller asks for, or supplies, a class other
//! than the handler's natural one.

mod adapter;
mod codec;
mod cursor;
mod types;

use std::sync::Arc;

pub use adapter::{convert, parse_text, render_text, AdapterRegistry, ConversionAdapter, TypeAdapter};
pub use codec::{FieldValue, ValueCodec};
pub use cursor::{MemoryRow, ParameterRow, ParameterSink, RowCursor};
pub use types::{LobHandler, SimpleTypeHandler, TypeHandler, TypeRegistry};

use crate::core::types::TypeDesc;
use crate::core::value::{Value, ValueClass};
use crate::error::Result;

/// Entry point for typed column access.
#[derive(Debug, Clone)]
pub struct ValueAccessProvider {
    types: TypeRegistry,
    adapters: AdapterRegistry,
}

impl Default for ValueAccessProvider {
    fn default() -> Self {
        Self::new(TypeRegistry::with_defaults(), AdapterRegistry::with_defaults())
    }
}

impl ValueAccessProvider {
    pub fn new(types: TypeRegistry, adapters: AdapterRegistry) -> Self {
        Self { types, adapters }
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Resolve the handler for a declared type.
    pub fn handler(&self, desc: &TypeDesc) -> Result<Arc<dyn TypeHandler>> {
        self.types.handler(desc)
    }

    /// Natural value class of a declared type.
    pub fn value_class(&self, desc: &TypeDesc) -> Result<ValueClass> {
        Ok(self.handler(desc)?.value_class())
    }

    /// Read a column in its natural class.
    pub fn get_value(&self, cursor: &dyn RowCursor, column: usize, desc: &TypeDesc) -> Result<Value> {
        self.handler(desc)?.get(cursor, column)
    }

    /// Read a column and present it as `requested`.
    pub fn get_value_as(
        &self,
        cursor: &dyn RowCursor,
        column: usize,
        desc: &TypeDesc,
        requested: ValueClass,
    ) -> Result<Value> {
        let value = self.get_value(cursor, column, desc)?;
        self.adapters.adapt(value, requested)
    }

    /// Bind a value, wrapping it into the handler's class when needed.
    pub fn set_value(
        &self,
        sink: &mut dyn ParameterSink,
        column: usize,
        desc: &TypeDesc,
        value: Value,
    ) -> Result<()> {
        let handler = self.handler(desc)?;
        let value = self.adapters.wrap(value, handler.value_class())?;
        handler.set(sink, column, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::codes;
    use crate::core::value::Lob;
    use crate::error::MigrateError;

    #[test]
    fn test_get_value_natural_and_adapted() {
        let provider = ValueAccessProvider::default();
        let row = MemoryRow::new(vec![Value::Text("hello".into())]);
        let desc = TypeDesc::new(codes::VARCHAR, "varchar");

        assert_eq!(
            provider.get_value(&row, 0, &desc).unwrap(),
            Value::Text("hello".into())
        );
        assert_eq!(
            provider
                .get_value_as(&row, 0, &desc, ValueClass::Lob)
                .unwrap(),
            Value::Lob(Lob::character("hello"))
        );
    }

    #[test]
    fn test_get_date_as_text() {
        let provider = ValueAccessProvider::default();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        let row = MemoryRow::new(vec![Value::Date(date)]);
        assert_eq!(
            provider
                .get_value_as(&row, 0, &TypeDesc::code(codes::DATE), ValueClass::Text)
                .unwrap(),
            Value::Text("2024-02-29".into())
        );
    }

    #[test]
    fn test_get_value_as_without_adapter_fails() {
        let provider = ValueAccessProvider::new(TypeRegistry::with_defaults(), AdapterRegistry::new());
        let row = MemoryRow::new(vec![Value::Text("x".into())]);
        let err = provider
            .get_value_as(&row, 0, &TypeDesc::code(codes::VARCHAR), ValueClass::Lob)
            .unwrap_err();
        assert!(matches!(err, MigrateError::AdapterNotFound { .. }));
    }

    #[test]
    fn test_unregistered_type_not_supported() {
        let provider = ValueAccessProvider::default();
        let row = MemoryRow::new(vec![Value::I32(1)]);
        let err = provider
            .get_value(&row, 0, &TypeDesc::new(9999, "UNKNOWN"))
            .unwrap_err();
        assert!(err.to_string().contains("UNKNOWN"));
    }

    #[test]
    fn test_set_value_wraps_mismatched_class() {
        let provider = ValueAccessProvider::default();
        let mut params = ParameterRow::with_columns(2);
        provider
            .set_value(&mut params, 0, &TypeDesc::code(codes::INTEGER), Value::from("12"))
            .unwrap();
        provider
            .set_value(
                &mut params,
                1,
                &TypeDesc::code(codes::CLOB),
                Value::from("long text"),
            )
            .unwrap();
        assert_eq!(
            params.into_values(),
            vec![Value::I32(12), Value::Lob(Lob::character("long text"))]
        );
    }
}
