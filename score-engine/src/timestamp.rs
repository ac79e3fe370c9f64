//! Points in time.
//!
//! A [`Timestamp`] has two encodings:
//! - the storage encoding, milliseconds since the Unix epoch, used for records
//!   in the durable tables (this is what `Serialize`/`Deserialize` produce);
//! - the wire encoding, an ISO-8601 string with millisecond precision and a
//!   `Z` suffix, used only in export/import documents.

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self::from_date(Utc::now())
    }

    /// Truncates to whole milliseconds so that the value survives both
    /// encodings unchanged.
    pub fn from_date(date: DateTime<Utc>) -> Self {
        Self(date.trunc_subsecs(3))
    }

    pub fn from_millis(millis: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(millis).single().map(Self)
    }

    pub fn to_date(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn to_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn to_wire(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn parse_wire(value: &str) -> Result<Self> {
        DateTime::parse_from_rfc3339(value)
            .map(|date| Self::from_date(date.with_timezone(&Utc)))
            .map_err(|e| Error::invalid_format(format!("bad timestamp '{}': {}", value, e)))
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Self::from_date(date)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.to_millis())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = i64::deserialize(deserializer)?;
        Timestamp::from_millis(millis)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {}", millis)))
    }
}
