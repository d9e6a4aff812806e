//! Value adapters.
//!
//! An adapter presents a value of a handler's natural class as another
//! class (`unwrap`) and turns a supplied value into the natural class
//! (`wrap`). Adapters are registered by natural class; asking for a class
//! no adapter covers is an [`MigrateError::AdapterNotFound`] error.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::value::{Lob, LobKind, Value, ValueClass};
use crate::error::{MigrateError, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Converts between a natural value class and other classes.
pub trait TypeAdapter: Send + Sync + fmt::Debug {
    fn natural(&self) -> ValueClass;

    /// Present a natural value as `requested`.
    fn unwrap(&self, value: Value, requested: ValueClass) -> Result<Value>;

    /// Convert a supplied value into the natural class.
    fn wrap(&self, value: Value) -> Result<Value>;
}

/// Adapter backed by the standard conversions, limited to a target list.
#[derive(Debug, Clone)]
pub struct ConversionAdapter {
    natural: ValueClass,
    targets: Vec<ValueClass>,
}

impl ConversionAdapter {
    pub fn new(natural: ValueClass, targets: &[ValueClass]) -> Self {
        Self {
            natural,
            targets: targets.to_vec(),
        }
    }
}

impl TypeAdapter for ConversionAdapter {
    fn natural(&self) -> ValueClass {
        self.natural
    }

    fn unwrap(&self, value: Value, requested: ValueClass) -> Result<Value> {
        if !self.targets.contains(&requested) {
            return Err(not_found(self.natural, requested));
        }
        convert(value, requested)
    }

    fn wrap(&self, value: Value) -> Result<Value> {
        convert(value, self.natural)
    }
}

/// Adapters keyed by natural value class.
#[derive(Debug, Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ValueClass, Arc<dyn TypeAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the adapters used by dump and load.
    pub fn with_defaults() -> Self {
        use ValueClass as C;

        let mut registry = Self::new();
        let integer_targets = [C::Text, C::I16, C::I32, C::I64, C::Decimal, C::F64];
        let text_targets = [
            C::Bool,
            C::I16,
            C::I32,
            C::I64,
            C::F32,
            C::F64,
            C::Decimal,
            C::Bytes,
            C::Lob,
            C::Uuid,
            C::Date,
            C::Time,
            C::Timestamp,
            C::TimestampTz,
        ];
        for (natural, targets) in [
            (C::Text, &text_targets[..]),
            (C::Lob, &[C::Text, C::Bytes][..]),
            (C::Bytes, &[C::Lob, C::Text][..]),
            (C::Bool, &[C::Text, C::I16, C::I32, C::I64][..]),
            (C::I16, &integer_targets[..]),
            (C::I32, &integer_targets[..]),
            (C::I64, &integer_targets[..]),
            (C::Decimal, &[C::Text, C::I64, C::F64][..]),
            (C::F32, &[C::Text, C::F64, C::Decimal][..]),
            (C::F64, &[C::Text, C::Decimal][..]),
            (C::Uuid, &[C::Text][..]),
            (C::Date, &[C::Text, C::Timestamp][..]),
            (C::Time, &[C::Text][..]),
            (C::Timestamp, &[C::Text, C::TimestampTz, C::Date][..]),
            (C::TimestampTz, &[C::Text, C::Timestamp][..]),
        ] {
            registry.register(Arc::new(ConversionAdapter::new(natural, targets)));
        }
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn TypeAdapter>) {
        self.adapters.insert(adapter.natural(), adapter);
    }

    pub fn get(&self, natural: ValueClass) -> Option<&Arc<dyn TypeAdapter>> {
        self.adapters.get(&natural)
    }

    /// Present `value` as `requested`, applying the adapter for its class.
    pub fn adapt(&self, value: Value, requested: ValueClass) -> Result<Value> {
        let natural = value.class();
        if natural == requested {
            return Ok(value);
        }
        if value.is_null() {
            return Ok(Value::Null(requested));
        }
        self.get(natural)
            .ok_or_else(|| not_found(natural, requested))?
            .unwrap(value, requested)
    }

    /// Convert `value` into `natural` through the adapter for `natural`.
    pub fn wrap(&self, value: Value, natural: ValueClass) -> Result<Value> {
        let supplied = value.class();
        if supplied == natural {
            return Ok(value);
        }
        if value.is_null() {
            return Ok(Value::Null(natural));
        }
        self.get(natural)
            .ok_or_else(|| not_found(supplied, natural))?
            .wrap(value)
    }
}

fn not_found(natural: ValueClass, requested: ValueClass) -> MigrateError {
    MigrateError::AdapterNotFound {
        natural: natural.to_string(),
        requested: requested.to_string(),
    }
}

fn out_of_range(value: impl fmt::Display, to: ValueClass) -> MigrateError {
    MigrateError::Format(format!("value {} out of range for {}", value, to))
}

/// Convert a value between classes.
pub fn convert(value: Value, to: ValueClass) -> Result<Value> {
    let from = value.class();
    if from == to {
        return Ok(value);
    }
    if value.is_null() {
        return Ok(Value::Null(to));
    }
    match (value, to) {
        (Value::Text(s), to) => parse_text(&s, to),
        (v, ValueClass::Text) => render_text(&v).map(Value::Text),
        (Value::Lob(lob), ValueClass::Bytes) => Ok(Value::Bytes(lob.data.to_vec())),
        (Value::Bytes(b), ValueClass::Lob) => Ok(Value::Lob(Lob::binary(b))),
        (Value::Bool(b), to) if is_integer(to) => narrow(i64::from(b), to),
        (Value::I16(n), to) => from_integer(i64::from(n), to),
        (Value::I32(n), to) => from_integer(i64::from(n), to),
        (Value::I64(n), to) => from_integer(n, to),
        (Value::Decimal(d), ValueClass::I64) => {
            if d.fract().is_zero() {
                d.to_i64().map(Value::I64).ok_or_else(|| out_of_range(d, to))
            } else {
                Err(out_of_range(d, to))
            }
        }
        (Value::Decimal(d), ValueClass::F64) => {
            d.to_f64().map(Value::F64).ok_or_else(|| out_of_range(d, to))
        }
        (Value::F32(f), ValueClass::F64) => Ok(Value::F64(f64::from(f))),
        (Value::F32(f), ValueClass::Decimal) => Decimal::from_f32(f)
            .map(Value::Decimal)
            .ok_or_else(|| out_of_range(f, to)),
        (Value::F64(f), ValueClass::Decimal) => Decimal::from_f64(f)
            .map(Value::Decimal)
            .ok_or_else(|| out_of_range(f, to)),
        (Value::Timestamp(ts), ValueClass::TimestampTz) => {
            Ok(Value::TimestampTz(ts.and_utc().fixed_offset()))
        }
        (Value::Timestamp(ts), ValueClass::Date) => Ok(Value::Date(ts.date())),
        (Value::TimestampTz(ts), ValueClass::Timestamp) => Ok(Value::Timestamp(ts.naive_utc())),
        (Value::Date(d), ValueClass::Timestamp) => Ok(Value::Timestamp(d.and_time(NaiveTime::default()))),
        (_, to) => Err(not_found(from, to)),
    }
}

fn is_integer(class: ValueClass) -> bool {
    matches!(class, ValueClass::I16 | ValueClass::I32 | ValueClass::I64)
}

fn from_integer(n: i64, to: ValueClass) -> Result<Value> {
    match to {
        ValueClass::Decimal => Ok(Value::Decimal(Decimal::from(n))),
        ValueClass::F64 => Ok(Value::F64(n as f64)),
        ValueClass::Bool => Ok(Value::Bool(n != 0)),
        to if is_integer(to) => narrow(n, to),
        to => Err(not_found(ValueClass::I64, to)),
    }
}

fn narrow(n: i64, to: ValueClass) -> Result<Value> {
    match to {
        ValueClass::I16 => i16::try_from(n)
            .map(Value::I16)
            .map_err(|_| out_of_range(n, to)),
        ValueClass::I32 => i32::try_from(n)
            .map(Value::I32)
            .map_err(|_| out_of_range(n, to)),
        _ => Ok(Value::I64(n)),
    }
}

/// Canonical text form of a non-null value.
///
/// Binary values render as `\x` followed by lowercase hex.
pub fn render_text(value: &Value) -> Result<String> {
    Ok(match value {
        Value::Null(class) => {
            return Err(MigrateError::Format(format!(
                "cannot render NULL {} as text",
                class
            )))
        }
        Value::Bool(b) => b.to_string(),
        Value::I16(n) => n.to_string(),
        Value::I32(n) => n.to_string(),
        Value::I64(n) => n.to_string(),
        Value::F32(n) => n.to_string(),
        Value::F64(n) => n.to_string(),
        Value::Decimal(d) => d.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => format!("\\x{}", hex::encode(b)),
        Value::Lob(lob) => match lob.kind {
            LobKind::Character => String::from_utf8(lob.data.to_vec())
                .map_err(|e| MigrateError::Format(format!("character LOB is not UTF-8: {}", e)))?,
            LobKind::Binary => format!("\\x{}", hex::encode(&lob.data)),
        },
        Value::Uuid(u) => u.to_string(),
        Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        Value::Time(t) => t.format(TIME_FORMAT).to_string(),
        Value::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
        Value::TimestampTz(ts) => ts.to_rfc3339_opts(SecondsFormat::AutoSi, false),
    })
}

/// Parse the canonical text form produced by [`render_text`].
pub fn parse_text(text: &str, to: ValueClass) -> Result<Value> {
    let invalid = || MigrateError::Format(format!("cannot parse {:?} as {}", text, to));
    let trimmed = text.trim();
    Ok(match to {
        ValueClass::Text => Value::Text(text.to_string()),
        ValueClass::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" | "y" => Value::Bool(true),
            "false" | "f" | "0" | "no" | "n" => Value::Bool(false),
            _ => return Err(invalid()),
        },
        ValueClass::I16 => Value::I16(trimmed.parse().map_err(|_| invalid())?),
        ValueClass::I32 => Value::I32(trimmed.parse().map_err(|_| invalid())?),
        ValueClass::I64 => Value::I64(trimmed.parse().map_err(|_| invalid())?),
        ValueClass::F32 => Value::F32(trimmed.parse().map_err(|_| invalid())?),
        ValueClass::F64 => Value::F64(trimmed.parse().map_err(|_| invalid())?),
        ValueClass::Decimal => Value::Decimal(
            Decimal::from_str(trimmed)
                .or_else(|_| Decimal::from_scientific(trimmed))
                .map_err(|_| invalid())?,
        ),
        ValueClass::Bytes => match text.strip_prefix("\\x") {
            Some(hex_text) => Value::Bytes(hex::decode(hex_text).map_err(|_| invalid())?),
            None => Value::Bytes(text.as_bytes().to_vec()),
        },
        ValueClass::Lob => Value::Lob(Lob::character(text)),
        ValueClass::Uuid => Value::Uuid(Uuid::parse_str(trimmed).map_err(|_| invalid())?),
        ValueClass::Date => Value::Date(
            NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| invalid())?,
        ),
        ValueClass::Time => Value::Time(
            NaiveTime::parse_from_str(trimmed, TIME_FORMAT).map_err(|_| invalid())?,
        ),
        ValueClass::Timestamp => Value::Timestamp(
            NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
                .map_err(|_| invalid())?,
        ),
        ValueClass::TimestampTz => Value::TimestampTz(
            DateTime::parse_from_rfc3339(trimmed)
                .or_else(|_| DateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f%#z"))
                .map_err(|_| invalid())?,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapt_text_to_lob() {
        let registry = AdapterRegistry::with_defaults();
        let v = registry
            .adapt(Value::from("hello"), ValueClass::Lob)
            .unwrap();
        assert_eq!(v, Value::Lob(Lob::character("hello")));
    }

    #[test]
    fn test_adapter_not_found() {
        let registry = AdapterRegistry::with_defaults();
        let err = registry
            .adapt(Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()), ValueClass::I64)
            .unwrap_err();
        assert!(matches!(err, MigrateError::AdapterNotFound { .. }));

        let err = registry
            .adapt(Value::Bool(true), ValueClass::Uuid)
            .unwrap_err();
        assert!(err.to_string().contains("uuid"));
    }

    #[test]
    fn test_every_class_presents_as_text() {
        let registry = AdapterRegistry::with_defaults();
        let id = uuid::Uuid::nil();
        let cases = vec![
            (Value::F32(1.5), "1.5"),
            (Value::F64(-0.25), "-0.25"),
            (Value::Uuid(id), "00000000-0000-0000-0000-000000000000"),
            (Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()), "2024-01-02"),
            (Value::Time(NaiveTime::from_hms_opt(13, 5, 0).unwrap()), "13:05:00"),
        ];
        for (value, text) in cases {
            assert_eq!(
                registry.adapt(value, ValueClass::Text).unwrap(),
                Value::Text(text.into())
            );
        }
    }

    #[test]
    fn test_wrap_parses_text_into_natural_class() {
        let registry = AdapterRegistry::with_defaults();
        assert_eq!(
            registry.wrap(Value::from("42"), ValueClass::I32).unwrap(),
            Value::I32(42)
        );
        assert_eq!(
            registry.wrap(Value::I64(7), ValueClass::I16).unwrap(),
            Value::I16(7)
        );
        assert!(registry.wrap(Value::I64(70_000), ValueClass::I16).is_err());
    }

    #[test]
    fn test_null_keeps_requested_class() {
        let registry = AdapterRegistry::with_defaults();
        assert_eq!(
            registry
                .adapt(Value::Null(ValueClass::Date), ValueClass::Text)
                .unwrap(),
            Value::Null(ValueClass::Text)
        );
    }

    #[test]
    fn test_render_and_parse_temporal() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_micro_opt(8, 30, 0, 250)
            .unwrap();
        let text = render_text(&Value::Timestamp(ts)).unwrap();
        assert_eq!(text, "2024-03-10 08:30:00.000250");
        assert_eq!(
            parse_text(&text, ValueClass::Timestamp).unwrap(),
            Value::Timestamp(ts)
        );
    }

    #[test]
    fn test_render_and_parse_bytes() {
        let text = render_text(&Value::Bytes(vec![0xde, 0xad])).unwrap();
        assert_eq!(text, "\\xdead");
        assert_eq!(
            parse_text(&text, ValueClass::Bytes).unwrap(),
            Value::Bytes(vec![0xde, 0xad])
        );
    }

    #[test]
    fn test_decimal_to_integer_requires_whole_number() {
        let d = Decimal::from_str("12.50").unwrap();
        assert!(convert(Value::Decimal(d), ValueClass::I64).is_err());
        let d = Decimal::from_str("12").unwrap();
        assert_eq!(convert(Value::Decimal(d), ValueClass::I64).unwrap(), Value::I64(12));
    }
}
