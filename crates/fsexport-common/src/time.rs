//! Timestamps and inclusive time ranges.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point in time as microseconds since the Unix epoch.
///
/// One microsecond is the smallest distinguishable step ("tick").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for "no timestamp yet". Never a valid frame timestamp.
    pub const UNSET: Timestamp = Timestamp(i64::MIN);

    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == i64::MIN
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Convert to a UTC datetime, `None` for the sentinel or out-of-range values.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.is_unset() {
            return None;
        }
        DateTime::from_timestamp_micros(self.0)
    }

    /// Local-time rendering used in channel listings: `YYYY-MM-DD HH:MM:SS.mmm`.
    #[must_use]
    pub fn format_local(self) -> String {
        match self.to_datetime() {
            Some(dt) => dt
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.3f")
                .to_string(),
            None => "-".to_string(),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_micros())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None if self.is_unset() => write!(f, "unset"),
            None => write!(f, "{}us", self.0),
        }
    }
}

/// Inclusive `[begin, end]` time range that can only grow.
///
/// A default interval is unset: it contains nothing and intersects nothing
/// until the first [`TimeInterval::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInterval {
    begin: Option<Timestamp>,
    end: Option<Timestamp>,
}

impl TimeInterval {
    /// Interval covering `a` through `b`; the bounds are ordered if needed.
    #[must_use]
    pub fn new(a: Timestamp, b: Timestamp) -> Self {
        Self {
            begin: Some(a.min(b)),
            end: Some(a.max(b)),
        }
    }

    #[must_use]
    pub fn begin(&self) -> Option<Timestamp> {
        self.begin
    }

    #[must_use]
    pub fn end(&self) -> Option<Timestamp> {
        self.end
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.begin.is_some() && self.end.is_some()
    }

    /// Widen the interval to include `[begin, end]`.
    pub fn update(&mut self, begin: Timestamp, end: Timestamp) {
        let (lo, hi) = (begin.min(end), begin.max(end));
        self.begin = Some(self.begin.map_or(lo, |b| b.min(lo)));
        self.end = Some(self.end.map_or(hi, |e| e.max(hi)));
    }

    /// Widen the interval to include another interval. Unset bounds are ignored.
    pub fn merge(&mut self, other: &TimeInterval) {
        if let (Some(b), Some(e)) = (other.begin, other.end) {
            self.update(b, e);
        }
    }

    /// `begin <= t <= end`; both ends inclusive.
    #[must_use]
    pub fn contains(&self, t: Timestamp) -> bool {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => b <= t && t <= e,
            _ => false,
        }
    }

    /// Whether `[begin, end]` overlaps this interval (touching counts).
    #[must_use]
    pub fn intersects(&self, begin: Timestamp, end: Timestamp) -> bool {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => !(end < b || begin > e),
            _ => false,
        }
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.begin, self.end) {
            (Some(b), Some(e)) => write!(f, "[{b}, {e}]"),
            _ => write!(f, "[unset]"),
        }
    }
}
