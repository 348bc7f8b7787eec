//! Capture timestamp parsing.
//!
//! Accepted forms:
//! - `2021-06-01` (midnight)
//! - `2021-06-01T05:42:10`, optionally with fractional seconds or a space
//!   instead of `T`
//! - a numeric Unix epoch in seconds, as a number or a numeric string (UTC)

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tc_core::{Error, Result};

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A parsed capture time. Naive: the taxonomy carries no zone information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// Parse a timestamp from its textual form.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();

        for format in DATE_TIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
                return Ok(Self(dt));
            }
        }

        if let Ok(date) = NaiveDate::parse_from_str(value, DATE_FORMAT) {
            return Ok(Self::from_date(date));
        }

        if let Ok(secs) = value.parse::<f64>() {
            return Self::from_epoch(secs);
        }

        Err(Error::Validation(format!("unrecognized timestamp: {value:?}")))
    }

    /// Build a timestamp from Unix epoch seconds (fractional allowed).
    pub fn from_epoch(secs: f64) -> Result<Self> {
        if !secs.is_finite() {
            return Err(Error::Validation(format!("epoch out of range: {secs}")));
        }
        let whole = secs.floor();
        let nanos = ((secs - whole) * 1e9).round().min(999_999_999.0) as u32;
        DateTime::from_timestamp(whole as i64, nanos)
            .map(|dt| Self(dt.naive_utc()))
            .ok_or_else(|| Error::Validation(format!("epoch out of range: {secs}")))
    }

    /// Midnight at the start of `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.and_time(NaiveTime::MIN))
    }

    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(dt: NaiveDateTime) -> Self {
        Self(dt)
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
    }
}
