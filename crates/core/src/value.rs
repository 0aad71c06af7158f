//! Cell values, column types and partition keys.

use core::fmt;
use core::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Primitive column type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DType {
    Bool,
    Int,
    Float,
    Str,
    Timestamp,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int => "int",
            DType::Float => "float",
            DType::Str => "str",
            DType::Timestamp => "timestamp",
        }
    }

    /// Whether a value of type `from` may be stored in a column of this type.
    ///
    /// Integers widen into float columns; everything else must match exactly.
    pub fn accepts(&self, from: DType) -> bool {
        *self == from || (*self == DType::Float && from == DType::Int)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(DType::Bool),
            "int" | "long" | "int64" | "int32" => Ok(DType::Int),
            "float" | "double" | "float32" | "float64" => Ok(DType::Float),
            "str" | "string" => Ok(DType::Str),
            "timestamp" | "datetime" => Ok(DType::Timestamp),
            other => Err(CoreError::schema(format!("unknown type `{other}`"))),
        }
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// The type of this value, or `None` for `Null`.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(DType::Bool),
            Value::Int(_) => Some(DType::Int),
            Value::Float(_) => Some(DType::Float),
            Value::Str(_) => Some(DType::Str),
            Value::Timestamp(_) => Some(DType::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric view of the value; `Null` reads as NaN.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Null => Some(f64::NAN),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Convert into a value storable under `dtype`, widening ints to floats.
    pub fn cast_to(self, dtype: DType) -> Option<Value> {
        match (self, dtype) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Int(v), DType::Float) => Some(Value::Float(v as f64)),
            (v, t) if v.dtype() == Some(t) => Some(v),
            _ => None,
        }
    }

    /// Interpret the value as a partition key.
    pub fn to_key(&self) -> Option<KeyValue> {
        match self {
            Value::Bool(v) => Some(KeyValue::Bool(*v)),
            Value::Int(v) => Some(KeyValue::Int(*v)),
            Value::Str(v) => Some(KeyValue::Str(v.clone())),
            Value::Timestamp(v) => Some(KeyValue::Timestamp(*v)),
            Value::Null | Value::Float(_) => None,
        }
    }

    /// Midnight timestamp for a calendar date.
    pub fn date(year: i32, month: u32, day: u32) -> Option<Value> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Value::Timestamp)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
            Value::Timestamp(v) => write_timestamp(f, v),
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

/// A hashable, totally ordered value usable as a partition key.
///
/// Floats and nulls are excluded: neither identifies an entity reliably.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Timestamp(NaiveDateTime),
}

impl From<KeyValue> for Value {
    fn from(key: KeyValue) -> Self {
        match key {
            KeyValue::Bool(v) => Value::Bool(v),
            KeyValue::Int(v) => Value::Int(v),
            KeyValue::Str(v) => Value::Str(v),
            KeyValue::Timestamp(v) => Value::Timestamp(v),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Bool(v) => write!(f, "{v}"),
            KeyValue::Int(v) => write!(f, "{v}"),
            KeyValue::Str(v) => f.write_str(v),
            KeyValue::Timestamp(v) => write_timestamp(f, v),
        }
    }
}

fn write_timestamp(f: &mut fmt::Formatter<'_>, ts: &NaiveDateTime) -> fmt::Result {
    if ts.time() == chrono::NaiveTime::MIN {
        write!(f, "{}", ts.format("%Y-%m-%d"))
    } else {
        write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_aliases_parse() {
        assert_eq!("long".parse::<DType>().unwrap(), DType::Int);
        assert_eq!("double".parse::<DType>().unwrap(), DType::Float);
        assert_eq!("datetime".parse::<DType>().unwrap(), DType::Timestamp);
        assert!("decimal".parse::<DType>().is_err());
    }

    #[test]
    fn ints_widen_into_float_columns_only() {
        assert_eq!(Value::Int(3).cast_to(DType::Float), Some(Value::Float(3.0)));
        assert_eq!(Value::Float(3.0).cast_to(DType::Int), None);
        assert_eq!(Value::Null.cast_to(DType::Str), Some(Value::Null));
    }

    #[test]
    fn floats_and_nulls_are_not_keys() {
        assert!(Value::Float(1.0).to_key().is_none());
        assert!(Value::Null.to_key().is_none());
        assert_eq!(Value::from("a").to_key(), Some(KeyValue::Str("a".into())));
    }

    #[test]
    fn midnight_timestamps_display_as_dates() {
        let v = Value::date(2024, 1, 31).unwrap();
        assert_eq!(v.to_string(), "2024-01-31");
    }
}
