//! Time sources.
//!
//! Rule matching needs local wall-clock time, so clocks return
//! `DateTime<FixedOffset>` rather than UTC.

use std::sync::Mutex;

use chrono::{DateTime, Duration, FixedOffset, Local, Utc};

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current local time.
    fn now(&self) -> DateTime<FixedOffset>;

    /// Current time as Unix milliseconds.
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Wall clock. Uses the host's local offset unless a fixed one is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    offset: Option<FixedOffset>,
}

impl SystemClock {
    /// Clock in the host's local time zone.
    #[must_use]
    pub const fn local() -> Self {
        Self { offset: None }
    }

    /// Clock pinned to a fixed UTC offset.
    #[must_use]
    pub const fn with_offset(offset: FixedOffset) -> Self {
        Self {
            offset: Some(offset),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        match self.offset {
            Some(offset) => Utc::now().with_timezone(&offset),
            None => Local::now().fixed_offset(),
        }
    }
}

/// A clock that only moves when told to. Used by tests and replays.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl ManualClock {
    /// Creates a clock frozen at `at`.
    #[must_use]
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { now: Mutex::new(at) }
    }

    /// Moves the clock to `at`.
    pub fn set(&self, at: DateTime<FixedOffset>) {
        let mut guard = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = at;
    }

    /// Advances the clock by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard += by;
    }

    /// Advances the clock by `ms` milliseconds.
    pub fn advance_millis(&self, ms: i64) {
        self.advance(Duration::milliseconds(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
