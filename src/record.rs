//! Records written by the monitor: geofence events, trips, and the
//! externally owned vehicles and payment methods it reads.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::Coordinates;
use crate::rule::{RuleAction, RuleId};
use crate::toll::{TollPoint, TollPointId};

/// Unique identifier for a geofence event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeofenceEventId(Uuid);

impl GeofenceEventId {
    /// Creates a new random event ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GeofenceEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GeofenceEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripId(Uuid);

impl TripId {
    /// Creates a new random trip ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TripId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a geofence event.
///
/// The monitor only ever creates events as `Pending` or `Confirmed`; the
/// remaining transitions belong to the confirmation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Awaiting driver confirmation.
    Pending,
    /// Accepted automatically by an auto-pay rule.
    Confirmed,
    /// Paid through the manual flow.
    Paid,
    /// Rejected by the driver.
    Declined,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Paid => "paid",
            Self::Declined => "declined",
        };
        f.write_str(s)
    }
}

/// A detected geofence crossing.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceEvent {
    pub id: GeofenceEventId,
    pub toll_point_id: TollPointId,
    pub toll_name: String,
    pub amount_cents: u32,
    pub detected_at: DateTime<Utc>,
    pub status: EventStatus,
    pub position: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    pub action: RuleAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<RuleId>,
}

impl GeofenceEvent {
    /// Builds the event for a crossing. Auto-pay crossings start `Confirmed`,
    /// everything else starts `Pending`.
    #[must_use]
    pub fn for_crossing(
        point: &TollPoint,
        position: Coordinates,
        detected_at: DateTime<Utc>,
        action: RuleAction,
        rule_id: Option<RuleId>,
        license_plate: Option<String>,
    ) -> Self {
        let status = if action == RuleAction::AutoPay {
            EventStatus::Confirmed
        } else {
            EventStatus::Pending
        };
        Self {
            id: GeofenceEventId::new(),
            toll_point_id: point.id.clone(),
            toll_name: point.name.clone(),
            amount_cents: point.amount_cents,
            detected_at,
            status,
            position,
            license_plate,
            action,
            rule_id,
        }
    }
}

/// Payment state of a trip.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Paid,
}

/// A toll charge.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub toll_point_id: TollPointId,
    pub toll_name: String,
    pub road: String,
    pub amount_cents: u32,
    pub status: TripStatus,
    pub payment_method_id: String,
    pub confirmation_number: ConfirmationNumber,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_plate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geofence_event_id: Option<GeofenceEventId>,
    pub crossed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Trip {
    /// A trip paid at `paid_at` with the given method.
    #[must_use]
    pub fn paid(
        event: &GeofenceEvent,
        road: impl Into<String>,
        payment_method_id: impl Into<String>,
        confirmation_number: ConfirmationNumber,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TripId::new(),
            toll_point_id: event.toll_point_id.clone(),
            toll_name: event.toll_name.clone(),
            road: road.into(),
            amount_cents: event.amount_cents,
            status: TripStatus::Paid,
            payment_method_id: payment_method_id.into(),
            confirmation_number,
            license_plate: event.license_plate.clone(),
            geofence_event_id: Some(event.id),
            crossed_at: event.detected_at,
            paid_at: Some(paid_at),
        }
    }
}

/// A vehicle registered by the user.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: String,
    pub license_plate: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Picks the plate recorded on events: the primary vehicle, else the first.
#[must_use]
pub fn primary_plate(vehicles: &[Vehicle]) -> Option<String> {
    vehicles
        .iter()
        .find(|v| v.is_primary)
        .or_else(|| vehicles.first())
        .map(|v| v.license_plate.clone())
}

/// A stored payment method.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_four: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// The method flagged as default, if any.
#[must_use]
pub fn default_payment_method(methods: &[PaymentMethod]) -> Option<&PaymentMethod> {
    methods.iter().find(|m| m.is_default)
}

const CONFIRMATION_PREFIX: &str = "QS";
const CONFIRMATION_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn confirmation_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^QS-\d+-[0-9A-Z]{9}$").ok()).as_ref()
}

/// Payment confirmation number: `QS-<unix millis>-<9 base-36 chars>`, uppercase.
///
/// Shared by auto-pay and manual payments; downstream parsers depend on the
/// exact format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfirmationNumber(String);

impl ConfirmationNumber {
    /// Generates a number for `now_millis` with a random suffix from `rng`.
    #[must_use]
    pub fn generate<R: Rng + ?Sized>(now_millis: i64, rng: &mut R) -> Self {
        let suffix: String = (0..CONFIRMATION_SUFFIX_LEN)
            .map(|_| char::from(BASE36[rng.random_range(0..BASE36.len())]))
            .collect();
        Self(format!("{CONFIRMATION_PREFIX}-{}-{suffix}", now_millis.max(0)))
    }

    /// Generates a number for `now_millis` using the thread-local RNG.
    #[must_use]
    pub fn for_millis(now_millis: i64) -> Self {
        Self::generate(now_millis, &mut rand::rng())
    }

    /// Generates a number for the current wall-clock time.
    #[must_use]
    pub fn new_now() -> Self {
        Self::for_millis(Utc::now().timestamp_millis())
    }

    /// Validates an existing confirmation number.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfirmationNumber` if `s` does not match
    /// `QS-\d+-[0-9A-Z]{9}`.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if confirmation_regex().is_some_and(|re| re.is_match(s)) {
            Ok(Self(s.to_string()))
        } else {
            Err(ValidationError::InvalidConfirmationNumber {
                input: s.to_string(),
            })
        }
    }

    /// The millisecond timestamp embedded in the number.
    #[must_use]
    pub fn issued_at_millis(&self) -> Option<i64> {
        self.0.split('-').nth(1).and_then(|s| s.parse().ok())
    }

    /// The number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfirmationNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ConfirmationNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ConfirmationNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ConfirmationNumber> for String {
    fn from(c: ConfirmationNumber) -> Self {
        c.0
    }
}
