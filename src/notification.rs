//! Driver notifications emitted by the monitor.
//!
//! Each notification kind carries its own typed payload instead of a free-form
//! metadata map. Notifications are write-once from the monitor's side; only
//! the UI marks them read.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::{ConfirmationNumber, GeofenceEventId, TripId};
use crate::rule::RuleAction;
use crate::suppression::AlertKind;
use crate::toll::{format_usd, TollPoint, TollPointId};

/// Unique identifier for a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random notification ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display priority.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Typed notification payloads.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Approaching a toll point inside the predictive band.
    TollAhead {
        toll_point_id: TollPointId,
        toll_name: String,
        road: String,
        amount_cents: u32,
        /// Distance in miles, one decimal place.
        distance_miles: String,
        alert_type: AlertKind,
    },

    /// Crossing that needs the driver's attention.
    TollDetected {
        toll_point_id: TollPointId,
        toll_name: String,
        road: String,
        amount_cents: u32,
        event_id: GeofenceEventId,
        action: RuleAction,
        alert_type: AlertKind,
    },

    /// Crossing settled automatically.
    AutoPaid {
        toll_point_id: TollPointId,
        toll_name: String,
        road: String,
        amount_cents: u32,
        event_id: GeofenceEventId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        trip_id: Option<TripId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        confirmation_number: Option<ConfirmationNumber>,
        alert_type: AlertKind,
    },
}

impl NotificationPayload {
    /// The toll point this payload refers to.
    #[must_use]
    pub fn toll_point_id(&self) -> &TollPointId {
        match self {
            Self::TollAhead { toll_point_id, .. }
            | Self::TollDetected { toll_point_id, .. }
            | Self::AutoPaid { toll_point_id, .. } => toll_point_id,
        }
    }

    /// Which suppression bucket the payload belongs to.
    #[must_use]
    pub fn alert_type(&self) -> AlertKind {
        match self {
            Self::TollAhead { alert_type, .. }
            | Self::TollDetected { alert_type, .. }
            | Self::AutoPaid { alert_type, .. } => *alert_type,
        }
    }
}

/// A notification record.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub payload: NotificationPayload,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn build(
        title: &str,
        message: String,
        priority: Priority,
        payload: NotificationPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: NotificationId::new(),
            title: title.to_string(),
            message,
            priority,
            payload,
            read: false,
            created_at,
        }
    }

    /// "Toll ahead" warning for a point `distance_miles` away.
    #[must_use]
    pub fn toll_ahead(point: &TollPoint, distance_miles: String, created_at: DateTime<Utc>) -> Self {
        let message = format!(
            "{} on {} is {} miles ahead. Toll: {}",
            point.name,
            point.road,
            distance_miles,
            format_usd(point.amount_cents)
        );
        Self::build(
            "⚠️ Toll Ahead",
            message,
            Priority::Medium,
            NotificationPayload::TollAhead {
                toll_point_id: point.id.clone(),
                toll_name: point.name.clone(),
                road: point.road.clone(),
                amount_cents: point.amount_cents,
                distance_miles,
                alert_type: AlertKind::Proximity,
            },
            created_at,
        )
    }

    /// Crossing the driver has to confirm under "Pending Tolls".
    #[must_use]
    pub fn toll_detected(
        point: &TollPoint,
        event_id: GeofenceEventId,
        action: RuleAction,
        created_at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "You passed {} on {}. Confirm the {} toll in Pending Tolls.",
            point.name,
            point.road,
            format_usd(point.amount_cents)
        );
        Self::build(
            "🚨 Toll Detected",
            message,
            Priority::Urgent,
            NotificationPayload::TollDetected {
                toll_point_id: point.id.clone(),
                toll_name: point.name.clone(),
                road: point.road.clone(),
                amount_cents: point.amount_cents,
                event_id,
                action,
                alert_type: AlertKind::Crossing,
            },
            created_at,
        )
    }

    /// Crossing charged automatically.
    #[must_use]
    pub fn auto_paid(
        point: &TollPoint,
        event_id: GeofenceEventId,
        trip_id: Option<TripId>,
        confirmation_number: Option<ConfirmationNumber>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "{} was automatically charged for {} on {}.",
            format_usd(point.amount_cents),
            point.name,
            point.road
        );
        Self::build(
            "✅ Toll Auto-Paid",
            message,
            Priority::Medium,
            NotificationPayload::AutoPaid {
                toll_point_id: point.id.clone(),
                toll_name: point.name.clone(),
                road: point.road.clone(),
                amount_cents: point.amount_cents,
                event_id,
                trip_id,
                confirmation_number,
                alert_type: AlertKind::Crossing,
            },
            created_at,
        )
    }
}
