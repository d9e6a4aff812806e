//! Conversion between [`Value`] and backup field values.
//!
//! At the backup format boundary every value is a nullable string or byte
//! span. Numeric and temporal fidelity is kept here: values are written in
//! their canonical text form, and timestamps without a zone are
//! interpreted in the configured time zone and stored as UTC so a load in
//! another zone restores the same instant.

use chrono::{Duration, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::core::value::{Lob, LobKind, Value, ValueClass};
use crate::error::{MigrateError, Result};

use super::adapter::{parse_text, render_text};

/// One field as stored in a backup data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Text(String),
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Encoded length in bytes, excluding framing.
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Null => 0,
            FieldValue::Text(s) => s.len(),
            FieldValue::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes and decodes values for one dump or load session.
#[derive(Debug, Clone, Copy)]
pub struct ValueCodec {
    time_zone: Tz,
}

impl Default for ValueCodec {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl ValueCodec {
    pub fn new(time_zone: Tz) -> Self {
        Self { time_zone }
    }

    /// Create a codec from an IANA zone name such as `Europe/Berlin`.
    pub fn for_zone(name: &str) -> Result<Self> {
        name.parse::<Tz>()
            .map(Self::new)
            .map_err(|_| MigrateError::Config(format!("Unknown time zone: '{}'", name)))
    }

    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    pub fn encode(&self, value: &Value) -> Result<FieldValue> {
        Ok(match value {
            Value::Null(_) => FieldValue::Null,
            Value::Bytes(b) => FieldValue::Binary(b.clone()),
            Value::Lob(lob) if lob.kind == LobKind::Binary => FieldValue::Binary(lob.data.to_vec()),
            Value::Timestamp(local) => {
                let utc = self.local_to_utc(local);
                FieldValue::Text(render_text(&Value::Timestamp(utc))?)
            }
            other => FieldValue::Text(render_text(other)?),
        })
    }

    /// Decode a field into `class`, the natural class of its column.
    pub fn decode(&self, field: FieldValue, class: ValueClass) -> Result<Value> {
        match field {
            FieldValue::Null => Ok(Value::Null(class)),
            FieldValue::Binary(bytes) => match class {
                ValueClass::Bytes => Ok(Value::Bytes(bytes)),
                ValueClass::Lob => Ok(Value::Lob(Lob::binary(bytes))),
                ValueClass::Text => String::from_utf8(bytes).map(Value::Text).map_err(|e| {
                    MigrateError::Format(format!("binary field is not UTF-8 text: {}", e))
                }),
                other => Err(MigrateError::Format(format!(
                    "binary field cannot be decoded as {}",
                    other
                ))),
            },
            FieldValue::Text(text) => match class {
                ValueClass::Timestamp => match parse_text(&text, class)? {
                    Value::Timestamp(utc) => Ok(Value::Timestamp(self.utc_to_local(&utc))),
                    other => Ok(other),
                },
                _ => parse_text(&text, class),
            },
        }
    }

    /// Wall-clock time in the configured zone to UTC. Ambiguous times take
    /// the earlier instant; times inside a DST gap use the offset in effect
    /// before the gap, so they load back shifted forward by the gap.
    fn local_to_utc(&self, local: &NaiveDateTime) -> NaiveDateTime {
        match self.time_zone.from_local_datetime(local).earliest() {
            Some(dt) => dt.naive_utc(),
            None => {
                let before = self
                    .time_zone
                    .offset_from_utc_datetime(&(*local - Duration::days(1)))
                    .fix();
                *local - Duration::seconds(i64::from(before.local_minus_utc()))
            }
        }
    }

    fn utc_to_local(&self, utc: &NaiveDateTime) -> NaiveDateTime {
        Utc.from_utc_datetime(utc)
            .with_timezone(&self.time_zone)
            .naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_timestamp_stored_as_utc() {
        let codec = ValueCodec::for_zone("Europe/Berlin").unwrap();
        let field = codec.encode(&Value::Timestamp(ts(12))).unwrap();
        assert_eq!(field, FieldValue::Text("2024-07-01 10:00:00".into()));
        assert_eq!(
            codec.decode(field.clone(), ValueClass::Timestamp).unwrap(),
            Value::Timestamp(ts(12))
        );

        let utc = ValueCodec::default();
        assert_eq!(
            utc.decode(field, ValueClass::Timestamp).unwrap(),
            Value::Timestamp(ts(10))
        );
    }

    #[test]
    fn test_timestamp_in_dst_gap_shifts_forward() {
        let codec = ValueCodec::for_zone("Europe/Berlin").unwrap();
        let gap = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let field = codec.encode(&Value::Timestamp(gap)).unwrap();
        assert_eq!(field, FieldValue::Text("2024-03-31 01:30:00".into()));

        let shifted = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(3, 30, 0)
            .unwrap();
        assert_eq!(
            codec.decode(field, ValueClass::Timestamp).unwrap(),
            Value::Timestamp(shifted)
        );
    }

    #[test]
    fn test_ambiguous_timestamp_takes_earlier_instant() {
        let codec = ValueCodec::for_zone("Europe/Berlin").unwrap();
        let fold = NaiveDate::from_ymd_opt(2024, 10, 27)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let field = codec.encode(&Value::Timestamp(fold)).unwrap();
        assert_eq!(field, FieldValue::Text("2024-10-27 00:30:00".into()));
    }

    #[test]
    fn test_unknown_zone_is_config_error() {
        assert!(matches!(
            ValueCodec::for_zone("Mars/Olympus"),
            Err(MigrateError::Config(_))
        ));
    }

    #[test]
    fn test_scalar_values_survive_codec() {
        let codec = ValueCodec::default();
        let values = vec![
            (Value::I32(-5), ValueClass::I32),
            (Value::Decimal(Decimal::from_str("123.4500").unwrap()), ValueClass::Decimal),
            (Value::Text("tab\there".into()), ValueClass::Text),
            (Value::Bool(true), ValueClass::Bool),
            (Value::F64(0.1), ValueClass::F64),
            (Value::Null(ValueClass::Date), ValueClass::Date),
            (Value::Bytes(vec![0, 1, 2]), ValueClass::Bytes),
        ];
        for (value, class) in values {
            let field = codec.encode(&value).unwrap();
            assert_eq!(codec.decode(field, class).unwrap(), value);
        }
    }

    #[test]
    fn test_binary_lob_encodes_as_binary() {
        let codec = ValueCodec::default();
        let field = codec.encode(&Value::Lob(Lob::binary(vec![9u8, 8]))).unwrap();
        assert_eq!(field, FieldValue::Binary(vec![9, 8]));
        assert_eq!(
            codec.decode(field, ValueClass::Lob).unwrap(),
            Value::Lob(Lob::binary(vec![9u8, 8]))
        );
    }
}
