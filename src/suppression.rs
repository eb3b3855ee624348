//! Per-toll-point alert suppression.
//!
//! A `SuppressionTracker` lives for one monitoring session and is reset when
//! the session restarts. It keeps two independent maps, one per alert kind,
//! from toll point to the instant of the last alert.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::toll::TollPointId;

/// Default cooldown between alerts of the same kind for the same point.
pub const DEFAULT_COOLDOWN_MS: i64 = 3_600_000;

/// The two independently suppressed alert kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Early "toll ahead" warning inside the predictive band.
    Proximity,
    /// Geofence crossing.
    Crossing,
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proximity => f.write_str("proximity"),
            Self::Crossing => f.write_str("crossing"),
        }
    }
}

/// Last-alert timestamps (Unix millis) per toll point and alert kind.
#[derive(Debug, Clone, Default)]
pub struct SuppressionTracker {
    proximity: HashMap<TollPointId, i64>,
    crossing: HashMap<TollPointId, i64>,
}

impl SuppressionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, kind: AlertKind) -> &HashMap<TollPointId, i64> {
        match kind {
            AlertKind::Proximity => &self.proximity,
            AlertKind::Crossing => &self.crossing,
        }
    }

    fn map_mut(&mut self, kind: AlertKind) -> &mut HashMap<TollPointId, i64> {
        match kind {
            AlertKind::Proximity => &mut self.proximity,
            AlertKind::Crossing => &mut self.crossing,
        }
    }

    /// Instant of the last recorded alert, if any.
    #[must_use]
    pub fn last_alert(&self, kind: AlertKind, id: &TollPointId) -> Option<i64> {
        self.map(kind).get(id).copied()
    }

    /// True if no alert was recorded or the last one is strictly older than
    /// `cooldown_ms`.
    #[must_use]
    pub fn should_alert(&self, kind: AlertKind, id: &TollPointId, now_ms: i64, cooldown_ms: i64) -> bool {
        self.last_alert(kind, id)
            .map_or(true, |last| now_ms.saturating_sub(last) > cooldown_ms)
    }

    /// Records an alert at `now_ms`.
    pub fn record_alert(&mut self, kind: AlertKind, id: &TollPointId, now_ms: i64) {
        self.map_mut(kind).insert(id.clone(), now_ms);
    }

    /// Check-and-set in one step: records the alert and returns true if it
    /// was allowed, returns false and leaves state untouched otherwise.
    ///
    /// Evaluations sharing a tracker must go through this method; calling
    /// `should_alert` and `record_alert` separately with I/O in between lets
    /// two evaluations both pass the check.
    pub fn try_claim(&mut self, kind: AlertKind, id: &TollPointId, now_ms: i64, cooldown_ms: i64) -> bool {
        if !self.should_alert(kind, id, now_ms, cooldown_ms) {
            return false;
        }
        self.record_alert(kind, id, now_ms);
        true
    }

    /// Forgets every recorded alert.
    pub fn clear(&mut self) {
        self.proximity.clear();
        self.crossing.clear();
    }

    /// Number of toll points with a recorded alert of `kind`.
    #[must_use]
    pub fn len(&self, kind: AlertKind) -> usize {
        self.map(kind).len()
    }
}
