//! Row cursors and parameter sinks.
//!
//! A [`RowCursor`] is the read side of a driver row; a [`ParameterSink`]
//! is the write side of a prepared statement. Both use 0-based column
//! positions.

use crate::core::value::{Value, ValueClass};
use crate::error::{MigrateError, Result};

/// One row positioned in a driver result set.
pub trait RowCursor: Send {
    fn column_count(&self) -> usize;

    /// Read a column as the given value class.
    ///
    /// NULL columns come back as `Value::Null(class)`.
    fn get(&self, column: usize, class: ValueClass) -> Result<Value>;
}

/// Parameter binding target of a prepared statement.
pub trait ParameterSink {
    fn bind(&mut self, column: usize, value: Value) -> Result<()>;
}

/// Parameters for one statement execution, filled positionally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterRow {
    values: Vec<Value>,
}

impl ParameterRow {
    /// Create a row with `count` untyped NULL slots.
    pub fn with_columns(count: usize) -> Self {
        Self {
            values: vec![Value::Null(ValueClass::Text); count],
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl ParameterSink for ParameterRow {
    fn bind(&mut self, column: usize, value: Value) -> Result<()> {
        let count = self.values.len();
        let slot = self.values.get_mut(column).ok_or_else(|| {
            MigrateError::State(format!(
                "parameter {} out of range for {} columns",
                column + 1,
                count
            ))
        })?;
        *slot = value;
        Ok(())
    }
}

/// Row held in memory, used by the in-memory session.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRow {
    values: Vec<Value>,
}

impl MemoryRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl RowCursor for MemoryRow {
    fn column_count(&self) -> usize {
        self.values.len()
    }

    fn get(&self, column: usize, class: ValueClass) -> Result<Value> {
        let value = self.values.get(column).ok_or_else(|| {
            MigrateError::State(format!(
                "column {} out of range for {} columns",
                column + 1,
                self.values.len()
            ))
        })?;
        match value {
            Value::Null(_) => Ok(Value::Null(class)),
            v if v.class() == class => Ok(v.clone()),
            v => Err(MigrateError::Format(format!(
                "column {} holds a {} value, not {}",
                column + 1,
                v.class(),
                class
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_row_binds_positionally() {
        let mut row = ParameterRow::with_columns(2);
        row.bind(1, Value::I32(7)).unwrap();
        assert_eq!(
            row.into_values(),
            vec![Value::Null(ValueClass::Text), Value::I32(7)]
        );
    }

    #[test]
    fn test_parameter_row_out_of_range() {
        let mut row = ParameterRow::with_columns(1);
        assert!(row.bind(3, Value::I32(1)).is_err());
    }

    #[test]
    fn test_memory_row_types_nulls() {
        let row = MemoryRow::new(vec![Value::Null(ValueClass::Text), Value::I64(3)]);
        assert_eq!(
            row.get(0, ValueClass::Date).unwrap(),
            Value::Null(ValueClass::Date)
        );
        assert_eq!(row.get(1, ValueClass::I64).unwrap(), Value::I64(3));
        assert!(row.get(1, ValueClass::Text).is_err());
    }
}
