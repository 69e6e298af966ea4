//! Backend-neutral values.
//!
//! [`Value`] is both the bound-parameter type and the decoded cell type. Drivers convert it to and from
//! their native representations.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use crate::error::{OrmError, OrmResult};

/// A SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in decode errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
        }
    }

    /// Convert a JSON document into the closest scalar value.
    ///
    /// Objects and arrays stay JSON.
    pub fn from_json_scalar(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident $(as $cast:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $cast)?)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float,
    Decimal => Decimal,
    String => Text,
    Vec<u8> => Bytes,
    serde_json::Value => Json,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

fn mismatch<T>(expected: &str, got: &Value) -> OrmResult<T> {
    Err(OrmError::decode(
        "",
        format!("expected {expected}, got {}", got.kind()),
    ))
}

/// Conversion from a decoded [`Value`].
///
/// Conversions are lenient where backends disagree on storage (SQLite and Oracle store booleans as
/// integers, SQLite stores timestamps as text).
pub trait FromValue: Sized {
    fn from_value(value: Value) -> OrmResult<Self>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        Ok(value)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            Value::Decimal(d) => Ok(!d.is_zero()),
            Value::Text(ref s) if s == "0" || s == "1" => Ok(s == "1"),
            other => mismatch("bool", &other),
        }
    }
}

macro_rules! impl_from_value_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> OrmResult<Self> {
                    let wide = match value {
                        Value::Int(i) => i,
                        Value::Bool(b) => i64::from(b),
                        Value::Decimal(d) if d.fract().is_zero() => d
                            .to_i64()
                            .ok_or_else(|| OrmError::decode("", "decimal out of range"))?,
                        Value::Text(ref s) => s
                            .trim()
                            .parse::<i64>()
                            .map_err(|e| OrmError::decode("", e.to_string()))?,
                        other => return mismatch(stringify!($ty), &other),
                    };
                    <$ty>::try_from(wide).map_err(|e| OrmError::decode("", e.to_string()))
                }
            }
        )*
    };
}

impl_from_value_int!(i16, i32, i64, u32);

impl FromValue for f64 {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Decimal(d) => d
                .to_f64()
                .ok_or_else(|| OrmError::decode("", "decimal out of range")),
            Value::Text(ref s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| OrmError::decode("", e.to_string())),
            other => mismatch("f64", &other),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> OrmResult<Self> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for Decimal {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Decimal(d) => Ok(d),
            Value::Int(i) => Ok(Decimal::from(i)),
            Value::Float(f) => {
                Decimal::try_from(f).map_err(|e| OrmError::decode("", e.to_string()))
            }
            Value::Text(ref s) => s
                .trim()
                .parse::<Decimal>()
                .map_err(|e| OrmError::decode("", e.to_string())),
            other => mismatch("decimal", &other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Json(serde_json::Value::String(s)) => Ok(s),
            Value::Json(j) => Ok(j.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Decimal(d) => Ok(d.to_string()),
            Value::Uuid(u) => Ok(u.to_string()),
            other => mismatch("text", &other),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            other => mismatch("bytes", &other),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Text(s) => Ok(serde_json::from_str(&s)?),
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(b)),
            Value::Int(i) => Ok(serde_json::Value::from(i)),
            Value::Float(f) => Ok(serde_json::Value::from(f)),
            other => mismatch("json", &other),
        }
    }
}

const TIMESTAMP_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::TimestampTz(ts) => Ok(ts.naive_utc()),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::Text(ref s) => TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
                .ok_or_else(|| OrmError::decode("", format!("invalid timestamp '{s}'"))),
            other => mismatch("timestamp", &other),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::TimestampTz(ts) => Ok(ts),
            Value::Text(s) => match DateTime::parse_from_rfc3339(s.trim()) {
                Ok(ts) => Ok(ts.with_timezone(&Utc)),
                Err(_) => NaiveDateTime::from_value(Value::Text(s)).map(|ts| ts.and_utc()),
            },
            other => NaiveDateTime::from_value(other).map(|ts| ts.and_utc()),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Date(d) => Ok(d),
            Value::Timestamp(ts) => Ok(ts.date()),
            Value::TimestampTz(ts) => Ok(ts.date_naive()),
            Value::Text(s) => match NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d") {
                Ok(d) => Ok(d),
                Err(_) => NaiveDateTime::from_value(Value::Text(s)).map(|ts| ts.date()),
            },
            other => mismatch("date", &other),
        }
    }
}

impl FromValue for NaiveTime {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Time(t) => Ok(t),
            Value::Timestamp(ts) => Ok(ts.time()),
            Value::Text(ref s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map_err(|e| OrmError::decode("", e.to_string())),
            other => mismatch("time", &other),
        }
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(ref s) => {
                Uuid::parse_str(s.trim()).map_err(|e| OrmError::decode("", e.to_string()))
            }
            Value::Bytes(ref b) => {
                Uuid::from_slice(b).map_err(|e| OrmError::decode("", e.to_string()))
            }
            other => mismatch("uuid", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
