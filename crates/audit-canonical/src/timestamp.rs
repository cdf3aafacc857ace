use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validation::ValidationError;

/// Layout accepted for timestamps that carry no zone designator.
const NAIVE_LAYOUT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// UTC instant rendered as `YYYY-MM-DDTHH:MM:SS.ffffffZ` for hashing and signing.
///
/// Parsing accepts RFC 3339 (trailing `Z` or a numeric offset) and the same
/// layout without any zone designator, which is read as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wraps a chrono UTC datetime.
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value)
    }

    /// Underlying chrono value.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parses either accepted layout.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Ok(Self(parsed.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(value, NAIVE_LAYOUT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|_| ValidationError::InvalidTimestamp(value.to_string()))
    }

    /// Canonical rendering with six fractional digits and a `Z` suffix.
    pub fn to_canonical_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Micros, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_canonical_string())
    }
}

impl FromStr for Timestamp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
