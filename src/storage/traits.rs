//! Collaborator traits for QuickSilver.
//!
//! The monitor never owns persistence. It talks to three collaborators:
//! - a position tracker that receives every accepted device position
//! - a rule store holding the user's geofence rules
//! - a per-user record store for events, trips, notifications, vehicles
//!   and payment methods
//!
//! Each call is independent. No implementation is expected to batch or make
//! the monitor's writes for a single crossing atomic.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::geo::Coordinates;
use crate::notification::{Notification, NotificationId};
use crate::record::{EventStatus, GeofenceEvent, GeofenceEventId, PaymentMethod, Trip, Vehicle};
use crate::rule::GeofenceRule;

/// Errors that can occur during collaborator calls.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    /// Geofence event not found.
    #[error("Geofence event not found: {0}")]
    EventNotFound(GeofenceEventId),

    /// Notification not found.
    #[error("Notification not found: {0}")]
    NotificationNotFound(NotificationId),

    /// Payment method not found.
    #[error("Payment method not found: {0}")]
    PaymentMethodNotFound(String),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),

    /// Serialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Connection failed.
    #[error("Connection error: {0}")]
    ConnectionError(String),
}

/// Receives device positions.
pub trait PositionTracker: Send + Sync {
    /// Records the device position observed at `at`.
    fn push_position(&self, position: &Coordinates, at: DateTime<Utc>) -> Result<(), StorageError>;
}

/// Read access to the user's geofence rules.
pub trait RuleStore: Send + Sync {
    /// Active rules in the user's configured order.
    fn list_active_rules(&self) -> Result<Vec<GeofenceRule>, StorageError>;
}

/// Per-user record storage.
pub trait RecordStore: Send + Sync {
    /// Insert a new geofence event. Returns error if the ID already exists.
    fn create_event(&self, event: GeofenceEvent) -> Result<(), StorageError>;

    /// Get an event by ID.
    fn get_event(&self, id: GeofenceEventId) -> Result<Option<GeofenceEvent>, StorageError>;

    /// Set an event's status. Returns the updated event.
    fn update_event_status(&self, id: GeofenceEventId, status: EventStatus) -> Result<GeofenceEvent, StorageError>;

    /// All events, oldest first.
    fn list_events(&self) -> Result<Vec<GeofenceEvent>, StorageError>;

    /// Insert a new trip.
    fn create_trip(&self, trip: Trip) -> Result<(), StorageError>;

    /// All trips, oldest first.
    fn list_trips(&self) -> Result<Vec<Trip>, StorageError>;

    /// Insert a new notification.
    fn create_notification(&self, notification: Notification) -> Result<(), StorageError>;

    /// All notifications, oldest first.
    fn list_notifications(&self) -> Result<Vec<Notification>, StorageError>;

    /// Mark a notification read.
    fn mark_notification_read(&self, id: NotificationId) -> Result<(), StorageError>;

    /// The user's vehicles.
    fn list_vehicles(&self) -> Result<Vec<Vehicle>, StorageError>;

    /// The user's payment methods.
    fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, StorageError>;
}
