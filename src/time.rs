//! Timestamps accepted by the TSDB HTTP API.
//!
//! A [`TimeValue`] can be written in three grammars:
//!
//! * absolute: `yyyy/MM/dd[{-| }HH[:mm[:ss]]]`
//! * relative: `<amount><unit>-ago` with unit in `s m h d w n y`
//! * unix: 10 digits (seconds) or 13 digits (milliseconds)
//!
//! The grammar a value was parsed from is kept as its [`TimeFormat`] so that
//! serializing it back to JSON produces the same kind of literal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::{Result, TsdbError};

lazy_static! {
    static ref ABSOLUTE_PREFIX: Regex = Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}").unwrap();
    static ref ABSOLUTE_TIME: Regex = Regex::new(
        r"^(\d{4})/(\d{1,2})/(\d{1,2})(?:[- ](\d{1,2})(?::(\d{1,2})(?::(\d{1,2}))?)?)?$"
    )
    .unwrap();
    static ref RELATIVE_TIME: Regex = Regex::new(r"^(\d+)([smhdwmny])-ago$").unwrap();
    static ref UNIX_TIME: Regex = Regex::new(r"^(?:\d{10}|\d{13})$").unwrap();
}

const UNIX_MILLIS_DIGITS: usize = 13;

/// Grammar a [`TimeValue`] was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeFormat {
    Absolute,
    Relative,
    Unix,
}

/// Returns true if `time_in` starts with an absolute `yyyy/MM/dd` date.
pub fn is_absolute_time(time_in: &str) -> bool {
    ABSOLUTE_PREFIX.is_match(time_in.trim())
}

pub fn is_relative_time(time_in: &str) -> bool {
    RELATIVE_TIME.is_match(time_in.trim())
}

pub fn is_unix_time(time_in: &str) -> bool {
    UNIX_TIME.is_match(time_in.trim())
}

pub fn is_valid_time(time_in: &str) -> bool {
    is_absolute_time(time_in) || is_relative_time(time_in) || is_unix_time(time_in)
}

/// A TSDB timestamp that remembers its input grammar.
///
/// A default `TimeValue` is unset and serializes as JSON `null`. Relative
/// values carry no instant: the server anchors them at query time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeValue {
    instant: Option<DateTime<Utc>>,
    format: Option<TimeFormat>,
    literal: String,
}

impl TimeValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute time at the given instant, truncated to whole seconds.
    pub fn from_datetime(instant: DateTime<Utc>) -> Self {
        let instant = instant.with_nanosecond(0).unwrap_or(instant);
        Self {
            literal: format_absolute(&instant),
            instant: Some(instant),
            format: Some(TimeFormat::Absolute),
        }
    }

    pub fn from_unix_seconds(seconds: i64) -> Result<Self> {
        let instant = Utc
            .timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| TsdbError::InvalidTime(format!("{} is out of range", seconds)))?;
        Ok(Self {
            instant: Some(instant),
            format: Some(TimeFormat::Unix),
            literal: seconds.to_string(),
        })
    }

    /// Unix time for the current wall clock second.
    pub fn now() -> Self {
        let seconds = Utc::now().timestamp();
        Self {
            instant: Utc.timestamp_opt(seconds, 0).single(),
            format: Some(TimeFormat::Unix),
            literal: seconds.to_string(),
        }
    }

    /// Parses `time_in` as absolute, relative or unix time, in that order.
    ///
    /// On failure `self` is left untouched.
    pub fn parse(&mut self, time_in: &str) -> Result<()> {
        let trimmed = time_in.trim();

        let parsed = if is_absolute_time(trimmed) {
            Self::from_absolute_time(trimmed)?
        } else if is_relative_time(trimmed) {
            Self::from_relative_time(trimmed)
        } else if is_unix_time(trimmed) {
            Self::from_unix_time(trimmed)?
        } else {
            return Err(TsdbError::InvalidTime(format!("{:?}", time_in)));
        };

        *self = parsed;
        Ok(())
    }

    fn from_absolute_time(time_in: &str) -> Result<Self> {
        let invalid = || TsdbError::InvalidTime(format!("{:?} is not a valid absolute time", time_in));
        let caps = ABSOLUTE_TIME.captures(time_in).ok_or_else(invalid)?;

        let field = |idx: usize| -> Result<u32> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse::<u32>().map_err(|_| invalid()),
                None => Ok(0),
            }
        };
        let year = caps[1].parse::<i32>().map_err(|_| invalid())?;
        let (month, day) = (field(2)?, field(3)?);
        let (hour, minute, second) = (field(4)?, field(5)?, field(6)?);

        let naive = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(invalid)?;

        Ok(Self {
            instant: Some(Utc.from_utc_datetime(&naive)),
            format: Some(TimeFormat::Absolute),
            literal: time_in.to_string(),
        })
    }

    fn from_relative_time(time_in: &str) -> Self {
        Self {
            instant: None,
            format: Some(TimeFormat::Relative),
            literal: time_in.to_string(),
        }
    }

    fn from_unix_time(time_in: &str) -> Result<Self> {
        let value: i64 = time_in
            .parse()
            .map_err(|_| TsdbError::InvalidTime(format!("{:?} is not a unix time", time_in)))?;

        let instant = if time_in.len() == UNIX_MILLIS_DIGITS {
            Utc.timestamp_millis_opt(value).single()
        } else {
            Utc.timestamp_opt(value, 0).single()
        }
        .ok_or_else(|| TsdbError::InvalidTime(format!("{} is out of range", time_in)))?;

        Ok(Self {
            instant: Some(instant),
            format: Some(TimeFormat::Unix),
            literal: time_in.to_string(),
        })
    }

    /// Decodes a JSON token: numbers are unix seconds (truncated), strings are
    /// parsed, `null` leaves the value unset.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Number(n) => {
                let seconds = n
                    .as_i64()
                    .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
                    .ok_or_else(|| TsdbError::InvalidTime(n.to_string()))?;
                Self::from_unix_seconds(seconds)
            }
            serde_json::Value::String(s) => s.parse(),
            other => Err(TsdbError::InvalidTime(format!("unexpected JSON value {}", other))),
        }
    }

    pub fn is_set(&self) -> bool {
        self.format.is_some()
    }

    pub fn format(&self) -> Option<TimeFormat> {
        self.format
    }

    /// The string this value was parsed from, trimmed.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Wall clock instant. `None` when unset or relative.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.instant
    }

    /// Instant this value designates when evaluated at `now`.
    ///
    /// Relative units follow the server: `m` is minutes, `n` is 30 days and
    /// `y` is 365 days.
    pub fn resolve(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.format? {
            TimeFormat::Relative => {
                let caps = RELATIVE_TIME.captures(&self.literal)?;
                let amount: i64 = caps[1].parse().ok()?;
                let unit = match &caps[2] {
                    "s" => Duration::seconds(1),
                    "m" => Duration::minutes(1),
                    "h" => Duration::hours(1),
                    "d" => Duration::days(1),
                    "w" => Duration::weeks(1),
                    "n" => Duration::days(30),
                    "y" => Duration::days(365),
                    _ => return None,
                };
                now.checked_sub_signed(unit.checked_mul(amount.try_into().ok()?)?)
            }
            TimeFormat::Absolute | TimeFormat::Unix => self.instant,
        }
    }
}

/// Shortest absolute literal that keeps every non-zero time component.
fn format_absolute(instant: &DateTime<Utc>) -> String {
    let pattern = if instant.second() != 0 {
        "%Y/%m/%d-%H:%M:%S"
    } else if instant.minute() != 0 {
        "%Y/%m/%d-%H:%M"
    } else if instant.hour() != 0 {
        "%Y/%m/%d-%H"
    } else {
        "%Y/%m/%d"
    };
    instant.format(pattern).to_string()
}

impl FromStr for TimeValue {
    type Err = TsdbError;

    fn from_str(s: &str) -> Result<Self> {
        let mut value = TimeValue::new();
        value.parse(s)?;
        Ok(value)
    }
}

impl fmt::Display for TimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.format, self.instant) {
            (Some(TimeFormat::Unix), Some(instant)) => write!(f, "{}", instant.timestamp()),
            (Some(TimeFormat::Absolute), Some(instant)) => f.write_str(&format_absolute(&instant)),
            (Some(TimeFormat::Relative), _) => f.write_str(&self.literal),
            _ => Ok(()),
        }
    }
}

impl Serialize for TimeValue {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match (self.format, self.instant) {
            (Some(TimeFormat::Unix), Some(instant)) => serializer.serialize_i64(instant.timestamp()),
            (Some(TimeFormat::Absolute), Some(instant)) => {
                serializer.serialize_str(&format_absolute(&instant))
            }
            (Some(TimeFormat::Relative), _) => serializer.serialize_str(&self.literal),
            _ => serializer.serialize_none(),
        }
    }
}

struct TimeValueVisitor;

impl<'de> Visitor<'de> for TimeValueVisitor {
    type Value = TimeValue;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a unix timestamp number or a time string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<TimeValue, E> {
        TimeValue::from_unix_seconds(v).map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<TimeValue, E> {
        let seconds = i64::try_from(v)
            .map_err(|_| E::custom(TsdbError::InvalidTime(format!("{} is out of range", v))))?;
        self.visit_i64(seconds)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<TimeValue, E> {
        if !v.is_finite() {
            return Err(E::custom(TsdbError::InvalidTime(v.to_string())));
        }
        self.visit_i64(v.trunc() as i64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<TimeValue, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<TimeValue, E> {
        Ok(TimeValue::default())
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<TimeValue, E> {
        Ok(TimeValue::default())
    }
}

impl<'de> Deserialize<'de> for TimeValue {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(TimeValueVisitor)
    }
}
