//! Neutral value representation shared by dump and load.
//!
//! Every column read from a source and every parameter bound on a target
//! passes through [`Value`], so the backup format never depends on a
//! particular driver's native types.

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Value class tag.
///
/// Each type handler has one natural class; adapters convert between
/// classes. NULL values carry the class so targets can bind a typed NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    Bool,
    I16,
    I32,
    I64,
    F32,
    F64,
    Decimal,
    Text,
    Bytes,
    Lob,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
}

impl ValueClass {
    /// Lowercase name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            ValueClass::Bool => "bool",
            ValueClass::I16 => "i16",
            ValueClass::I32 => "i32",
            ValueClass::I64 => "i64",
            ValueClass::F32 => "f32",
            ValueClass::F64 => "f64",
            ValueClass::Decimal => "decimal",
            ValueClass::Text => "text",
            ValueClass::Bytes => "bytes",
            ValueClass::Lob => "lob",
            ValueClass::Uuid => "uuid",
            ValueClass::Date => "date",
            ValueClass::Time => "time",
            ValueClass::Timestamp => "timestamp",
            ValueClass::TimestampTz => "timestamptz",
        }
    }

    /// Whether values of this class are written as raw bytes in backups.
    pub fn is_binary(&self) -> bool {
        matches!(self, ValueClass::Bytes)
    }
}

impl fmt::Display for ValueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of large object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LobKind {
    /// Binary large object (BLOB).
    Binary,
    /// Character large object (CLOB/NCLOB), UTF-8 encoded.
    Character,
}

/// Large-object handle.
///
/// The content is held in a reference-counted buffer so handing a LOB
/// between the reader, codec and writer does not copy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lob {
    pub kind: LobKind,
    pub data: Bytes,
}

impl Lob {
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            kind: LobKind::Binary,
            data: data.into(),
        }
    }

    pub fn character(text: impl Into<String>) -> Self {
        Self {
            kind: LobKind::Character,
            data: Bytes::from(text.into()),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Driver-independent column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL with the class of the column it came from or goes to.
    Null(ValueClass),

    Bool(bool),

    /// 16-bit signed integer (smallint/tinyint).
    I16(i16),

    /// 32-bit signed integer (int).
    I32(i32),

    /// 64-bit signed integer (bigint).
    I64(i64),

    /// 32-bit floating point (real).
    F32(f32),

    /// 64-bit floating point (double precision).
    F64(f64),

    /// Exact numeric.
    Decimal(Decimal),

    Text(String),

    Bytes(Vec<u8>),

    /// Large object.
    Lob(Lob),

    Uuid(Uuid),

    Date(NaiveDate),

    Time(NaiveTime),

    /// Timestamp without time zone, interpreted in the session time zone.
    Timestamp(NaiveDateTime),

    /// Timestamp with an explicit offset.
    TimestampTz(DateTime<FixedOffset>),
}

impl Value {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Runtime class of this value.
    #[must_use]
    pub fn class(&self) -> ValueClass {
        match self {
            Value::Null(c) => *c,
            Value::Bool(_) => ValueClass::Bool,
            Value::I16(_) => ValueClass::I16,
            Value::I32(_) => ValueClass::I32,
            Value::I64(_) => ValueClass::I64,
            Value::F32(_) => ValueClass::F32,
            Value::F64(_) => ValueClass::F64,
            Value::Decimal(_) => ValueClass::Decimal,
            Value::Text(_) => ValueClass::Text,
            Value::Bytes(_) => ValueClass::Bytes,
            Value::Lob(_) => ValueClass::Lob,
            Value::Uuid(_) => ValueClass::Uuid,
            Value::Date(_) => ValueClass::Date,
            Value::Time(_) => ValueClass::Time,
            Value::Timestamp(_) => ValueClass::Timestamp,
            Value::TimestampTz(_) => ValueClass::TimestampTz,
        }
    }

    /// Rough in-memory size, used for batch accounting.
    pub fn size_hint(&self) -> usize {
        match self {
            Value::Text(s) => s.len(),
            Value::Bytes(b) => b.len(),
            Value::Lob(l) => l.len(),
            Value::Null(_) => 1,
            _ => 16,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::TimestampTz(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value
where
    T: HasValueClass,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Value::Null(T::CLASS),
        }
    }
}

/// Rust types with a fixed value class, for typed NULLs from `Option`.
pub trait HasValueClass {
    const CLASS: ValueClass;
}

macro_rules! has_value_class {
    ($($ty:ty => $class:ident),* $(,)?) => {
        $(impl HasValueClass for $ty {
            const CLASS: ValueClass = ValueClass::$class;
        })*
    };
}

has_value_class! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    f64 => F64,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    NaiveDate => Date,
    NaiveDateTime => Timestamp,
    DateTime<FixedOffset> => TimestampTz,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_of_values() {
        assert_eq!(Value::from(1i32).class(), ValueClass::I32);
        assert_eq!(Value::from("x").class(), ValueClass::Text);
        assert_eq!(Value::Null(ValueClass::Date).class(), ValueClass::Date);
        assert_eq!(Value::Lob(Lob::character("abc")).class(), ValueClass::Lob);
    }

    #[test]
    fn test_option_into_typed_null() {
        let v: Value = Option::<i64>::None.into();
        assert_eq!(v, Value::Null(ValueClass::I64));
        let v: Value = Some(5i64).into();
        assert_eq!(v, Value::I64(5));
    }

    #[test]
    fn test_lob_length() {
        let lob = Lob::binary(vec![1u8, 2, 3]);
        assert_eq!(lob.len(), 3);
        assert!(!lob.is_empty());
        assert_eq!(lob.kind, LobKind::Binary);
    }
}
