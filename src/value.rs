use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::ser;
use serde::{Deserialize, Serialize, Serializer};

use crate::{Result, TsdbError};

/// Numeric value of a data point.
///
/// The server may send numbers as integers, floats or numeric strings; all of
/// them decode to an `f64`. Encoding always produces a JSON number.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct Value(f64);

impl Value {
    pub fn from_float(value: f64) -> Self {
        Value(value)
    }

    pub fn from_int(value: i64) -> Self {
        Value(value as f64)
    }

    /// Parses a numeric string. `NaN` and infinities are rejected.
    pub fn from_string(value: &str) -> Result<Self> {
        let parsed = value
            .trim()
            .parse::<f64>()
            .map_err(|e| TsdbError::InvalidValue(format!("{:?}: {}", value, e)))?;
        Self::finite(parsed)
    }

    fn finite(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(TsdbError::InvalidValue(format!("{} is not a finite number", value)));
        }
        Ok(Value(value))
    }

    pub fn is_finite(&self) -> bool {
        self.0.is_finite()
    }

    pub fn as_f64(&self) -> f64 {
        self.0
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::from_float(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::from_int(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if !self.0.is_finite() {
            return Err(ser::Error::custom(TsdbError::InvalidValue(format!(
                "{} is not a finite number",
                self.0
            ))));
        }
        // Whole numbers go out as integers so the server stores them as longs.
        if self.0.fract() == 0.0 && self.0.abs() < i64::MAX as f64 {
            serializer.serialize_i64(self.0 as i64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::from_int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value(v as f64))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Value::finite(v).map_err(E::custom)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Value::from_string(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}
