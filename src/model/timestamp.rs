//! Wire timestamps and the calendar-zone convention used to project them.
//!
//! The backend emits zone-less local date-times (`2025-06-01T10:15:30.123`);
//! some deployments emit RFC 3339 with an offset. Anything else is kept
//! verbatim as [`Timestamp::Unparseable`] so records still load and render.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// A parsed (or unparseable) wire timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    /// Wall-clock date-time without zone information.
    Naive(NaiveDateTime),
    /// Instant with an explicit UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Raw value that matched no supported format.
    Unparseable(String),
}

impl Timestamp {
    /// Parse a wire value. Never fails; unknown formats are preserved.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(zoned) = DateTime::parse_from_rfc3339(trimmed) {
            return Self::Zoned(zoned);
        }
        for format in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Self::Naive(naive);
            }
        }
        Self::Unparseable(raw.to_string())
    }

    /// Timestamp for "now", in the backend's native zone-less form.
    #[must_use]
    pub fn now_local() -> Self {
        Self::Naive(Local::now().naive_local())
    }

    /// Wire representation.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Naive(naive) => naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Self::Zoned(zoned) => zoned.to_rfc3339(),
            Self::Unparseable(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Time zone in which naive timestamps are read and calendar days are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarZone {
    /// The machine's local zone.
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
}

impl CalendarZone {
    /// Absolute instant of a timestamp; `None` for unparseable values.
    #[must_use]
    pub fn instant(self, ts: &Timestamp) -> Option<DateTime<Utc>> {
        match ts {
            Timestamp::Zoned(zoned) => Some(zoned.with_timezone(&Utc)),
            Timestamp::Naive(naive) => match self {
                Self::Utc => Some(Utc.from_utc_datetime(naive)),
                // DST gaps have no local mapping; fall back to reading the
                // wall clock as UTC so the value still orders.
                Self::Local => Some(
                    Local
                        .from_local_datetime(naive)
                        .earliest()
                        .map_or_else(|| Utc.from_utc_datetime(naive), |dt| dt.with_timezone(&Utc)),
                ),
            },
            Timestamp::Unparseable(_) => None,
        }
    }

    /// Calendar day a timestamp falls on in this zone.
    #[must_use]
    pub fn day(self, ts: &Timestamp) -> Option<NaiveDate> {
        match ts {
            Timestamp::Naive(naive) => Some(naive.date()),
            Timestamp::Zoned(zoned) => Some(match self {
                Self::Local => zoned.with_timezone(&Local).date_naive(),
                Self::Utc => zoned.with_timezone(&Utc).date_naive(),
            }),
            Timestamp::Unparseable(_) => None,
        }
    }

    /// `DD-MM-YYYY` display form, or `N/A` when absent or unparseable.
    #[must_use]
    pub fn display_day(self, ts: Option<&Timestamp>) -> String {
        ts.and_then(|t| self.day(t))
            .map_or_else(|| "N/A".to_string(), |d| d.format("%d-%m-%Y").to_string())
    }

    /// Total order on optional timestamps: valid values by instant (latest
    /// first when `newest_first`), then absent or unparseable values, which
    /// compare equal to each other in either direction.
    #[must_use]
    pub fn compare(
        self,
        a: Option<&Timestamp>,
        b: Option<&Timestamp>,
        newest_first: bool,
    ) -> Ordering {
        let a = a.and_then(|t| self.instant(t));
        let b = b.and_then(|t| self.instant(t));
        match (a, b) {
            (Some(a), Some(b)) if newest_first => b.cmp(&a),
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Parse a `YYYY-MM-DD` filter date.
pub fn parse_filter_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}
