//! Input samples and emitted action types for the monitor.
//!
//! These types are serializable so replays can stream them as JSON lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinates;
use crate::notification::Notification;
use crate::record::{GeofenceEvent, Trip};
use crate::rule::{RuleAction, RuleId};
use crate::storage::StorageError;
use crate::toll::TollPointId;

/// One device position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    /// Creates a sample.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }

    /// Creates a sample at `position`.
    #[must_use]
    pub const fn at(position: Coordinates, timestamp: DateTime<Utc>) -> Self {
        Self::new(position.latitude, position.longitude, timestamp)
    }

    /// The sample's coordinates.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Collaborator calls made while handling an alert.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ListRules,
    ListVehicles,
    CreateEvent,
    ListPaymentMethods,
    CreateTrip,
    CreateNotification,
}

/// A collaborator call that failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// The call that failed.
    pub step: Step,
    /// Rendered error.
    pub error: String,
}

impl StepFailure {
    pub(crate) fn new(step: Step, err: &StorageError) -> Self {
        Self {
            step,
            error: err.to_string(),
        }
    }
}

/// Aggregate result of the writes made for one alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Every step succeeded.
    Completed,
    /// Some writes landed, some steps failed. Nothing was rolled back.
    Partial,
    /// Nothing was written.
    Failed,
}

impl WriteOutcome {
    pub(crate) fn from_parts(wrote_any: bool, failures: &[StepFailure]) -> Self {
        if failures.is_empty() {
            Self::Completed
        } else if wrote_any {
            Self::Partial
        } else {
            Self::Failed
        }
    }
}

/// What happened on the auto-pay path of a crossing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AutoPayStatus {
    /// The action was not `auto_pay`.
    NotRequested,
    /// A paid trip was written.
    Charged {
        /// The trip written.
        trip: Trip,
    },
    /// No default payment method on file; no trip was written.
    NoPaymentMethod,
    /// The lookup or trip write failed; see the report's failures.
    Failed,
}

/// Everything done for one geofence crossing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossingReport {
    /// The crossed toll point.
    pub toll_point_id: TollPointId,
    /// Distance from the center at detection, in meters.
    pub distance_meters: f64,
    /// Selected action.
    pub action: RuleAction,
    /// Rule that selected it; `None` for the default.
    pub rule_id: Option<RuleId>,
    /// The event, if it was written.
    pub event: Option<GeofenceEvent>,
    /// Auto-pay result.
    pub auto_pay: AutoPayStatus,
    /// The notification, if one was written.
    pub notification: Option<Notification>,
    /// Steps that failed and were skipped.
    pub failures: Vec<StepFailure>,
    /// Aggregate write outcome.
    pub outcome: WriteOutcome,
}

impl CrossingReport {
    /// The trip written by auto-pay, if any.
    #[must_use]
    pub fn trip(&self) -> Option<&Trip> {
        match &self.auto_pay {
            AutoPayStatus::Charged { trip } => Some(trip),
            _ => None,
        }
    }
}

/// Everything done for one "toll ahead" alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityReport {
    /// The approached toll point.
    pub toll_point_id: TollPointId,
    /// Distance from the center, in meters.
    pub distance_meters: f64,
    /// Distance in miles, one decimal place.
    pub distance_miles: String,
    /// The notification, if it was written.
    pub notification: Option<Notification>,
    /// Set when the notification write failed.
    pub failure: Option<StepFailure>,
}

/// An alert emitted by one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmittedAction {
    /// Predictive band alert.
    Proximity(ProximityReport),
    /// Geofence crossing.
    Crossing(CrossingReport),
}

impl EmittedAction {
    /// The toll point the action concerns.
    #[must_use]
    pub fn toll_point_id(&self) -> &TollPointId {
        match self {
            Self::Proximity(p) => &p.toll_point_id,
            Self::Crossing(c) => &c.toll_point_id,
        }
    }

    /// The notification written, if any.
    #[must_use]
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            Self::Proximity(p) => p.notification.as_ref(),
            Self::Crossing(c) => c.notification.as_ref(),
        }
    }
}
