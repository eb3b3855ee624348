//! Local wall-clock scheduling primitives for geofence rules.
//!
//! Rules are scoped by local weekday and by a local `HH:MM` window. Matching
//! is done at minute granularity: seconds are ignored.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Day of the week, serialized in lowercase (`"monday"`).
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    /// Local weekday of `at`.
    #[must_use]
    pub fn of(at: &DateTime<FixedOffset>) -> Self {
        at.weekday().into()
    }

    /// Monday through Friday.
    pub const WEEKDAYS: [Self; 5] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
    ];

    /// Saturday and Sunday.
    pub const WEEKEND: [Self; 2] = [Self::Saturday, Self::Sunday];
}

impl From<Weekday> for DayOfWeek {
    fn from(w: Weekday) -> Self {
        match w {
            Weekday::Mon => Self::Monday,
            Weekday::Tue => Self::Tuesday,
            Weekday::Wed => Self::Wednesday,
            Weekday::Thu => Self::Thursday,
            Weekday::Fri => Self::Friday,
            Weekday::Sat => Self::Saturday,
            Weekday::Sun => Self::Sunday,
        }
    }
}

/// A local time of day with minute precision, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    minutes: u16,
}

impl ClockTime {
    /// Creates a clock time.
    ///
    /// # Errors
    ///
    /// Returns `InvalidClockTime` if `hour > 23` or `minute > 59`.
    pub fn new(hour: u8, minute: u8) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidClockTime {
                input: format!("{hour:02}:{minute:02}"),
            });
        }
        Ok(Self {
            minutes: u16::from(hour) * 60 + u16::from(minute),
        })
    }

    /// Local time of day of `at`, truncated to the minute.
    #[must_use]
    pub fn of(at: &DateTime<FixedOffset>) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let minutes = (at.hour() * 60 + at.minute()) as u16;
        Self { minutes }
    }

    /// Minutes since local midnight.
    #[must_use]
    pub const fn minutes_since_midnight(&self) -> u16 {
        self.minutes
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

impl FromStr for ClockTime {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidClockTime {
            input: s.to_string(),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        if h.is_empty() || h.len() > 2 || m.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = h.parse().map_err(|_| invalid())?;
        let minute: u8 = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(t: ClockTime) -> Self {
        t.to_string()
    }
}

/// A half-open local time window `[start, end)`.
///
/// When `start > end` the window wraps past midnight, so `22:00`-`06:00`
/// contains `23:30` and `05:59` but not `06:00`.
///
/// [`TimeWindow::new`] rejects `start == end`. A stored window with equal
/// bounds still deserializes, so one bad rule does not fail a whole rule
/// list; it is empty and never matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: ClockTime,
    /// End of the window (exclusive).
    pub end: ClockTime,
}

impl TimeWindow {
    /// Creates a window.
    ///
    /// # Errors
    ///
    /// Returns `EmptyTimeWindow` if `start == end`.
    pub fn new(start: ClockTime, end: ClockTime) -> Result<Self, ValidationError> {
        if start == end {
            return Err(ValidationError::EmptyTimeWindow {
                at: start.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parses a window from two `HH:MM` strings.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for malformed times or an empty window.
    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(start.parse()?, end.parse()?)
    }

    /// True if the window contains no time at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the window wraps past midnight.
    #[must_use]
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Check if a time of day falls within this window.
    #[must_use]
    pub fn contains(&self, t: ClockTime) -> bool {
        if self.wraps_midnight() {
            t >= self.start || t < self.end
        } else {
            t >= self.start && t < self.end
        }
    }
}
