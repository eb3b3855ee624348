//! Error types for QuickSilver.
//!
//! All errors are strongly typed using thiserror so callers can match on
//! specific conditions. Collaborator failures during evaluation are not
//! surfaced through these types; they are logged and recorded on the
//! evaluation report instead (see [`crate::monitor::StepFailure`]).

use thiserror::Error;

use crate::record::{EventStatus, GeofenceEventId};
use crate::storage::StorageError;

/// Validation errors that occur during input validation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Latitude {value} is out of range [-90, 90]")]
    LatitudeOutOfRange {
        value: f64,
    },

    #[error("Longitude {value} is out of range [-180, 180]")]
    LongitudeOutOfRange {
        value: f64,
    },

    #[error("Geofence radius must be positive, got {value}")]
    InvalidRadius {
        value: f64,
    },

    #[error("Invalid clock time '{input}': expected HH:MM")]
    InvalidClockTime {
        input: String,
    },

    #[error("Time window is empty: start and end are both {at}")]
    EmptyTimeWindow {
        at: String,
    },

    #[error("Invalid proximity band: min {min_meters}m must be below max {max_meters}m")]
    InvalidBand {
        min_meters: f64,
        max_meters: f64,
    },

    #[error("Invalid confirmation number '{input}'")]
    InvalidConfirmationNumber {
        input: String,
    },

    #[error("Duplicate toll point id '{id}'")]
    DuplicateTollPoint {
        id: String,
    },

    #[error("Required field '{field}' is missing")]
    MissingField {
        field: String,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Event {id} is {status}, expected pending")]
    EventNotPending {
        id: GeofenceEventId,
        status: EventStatus,
    },
}

/// Errors from the monitoring session lifecycle.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Failed to spawn monitor worker: {message}")]
    Spawn {
        message: String,
    },
}

/// Top-level error type for QuickSilver.
#[derive(Debug, Error)]
pub enum QuickSilverError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl QuickSilverError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Creates an I/O error for the given path.
    #[must_use]
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Returns true if this is a storage error.
    #[must_use]
    pub const fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    /// Returns true if this is a monitor lifecycle error.
    #[must_use]
    pub const fn is_monitor(&self) -> bool {
        matches!(self, Self::Monitor(_))
    }

    /// Returns true if this is a local I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Io { .. } | Self::Internal { .. } => false,
            Self::Storage(e) => matches!(e, StorageError::ConnectionError(_)),
            Self::Monitor(e) => matches!(e, MonitorError::Timeout { .. }),
        }
    }
}

/// Result type alias for QuickSilver operations.
pub type QuickSilverResult<T> = Result<T, QuickSilverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_clock_time() {
        let err = ValidationError::InvalidClockTime {
            input: "25:99".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("25:99"));
        assert!(msg.contains("HH:MM"));
    }

    #[test]
    fn test_validation_error_band() {
        let err = ValidationError::InvalidBand {
            min_meters: 3200.0,
            max_meters: 1600.0,
        };
        let msg = format!("{err}");
        assert!(msg.contains("3200"));
        assert!(msg.contains("1600"));
    }

    #[test]
    fn test_event_not_pending_message() {
        let id = GeofenceEventId::new();
        let err = ValidationError::EventNotPending {
            id,
            status: EventStatus::Paid,
        };
        let msg = format!("{err}");
        assert!(msg.contains(&id.to_string()));
        assert!(msg.contains("paid"));
    }

    #[test]
    fn test_monitor_error_timeout() {
        let err = MonitorError::Timeout { duration_ms: 5000 };
        assert!(format!("{err}").contains("5000ms"));
    }

    #[test]
    fn test_quicksilver_error_from_validation() {
        let err: QuickSilverError = ValidationError::MissingField {
            field: "id".to_string(),
        }
        .into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_quicksilver_error_from_storage() {
        let err: QuickSilverError = StorageError::ConnectionError("reset".to_string()).into();
        assert!(err.is_storage());
        assert!(err.is_retryable());

        let err: QuickSilverError = StorageError::BackendError("boom".to_string()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_quicksilver_error_internal() {
        let err = QuickSilverError::internal("unexpected state");
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("unexpected state"));
    }

    #[test]
    fn test_quicksilver_error_retryable_timeout() {
        let err: QuickSilverError = MonitorError::Timeout { duration_ms: 10 }.into();
        assert!(err.is_monitor());
        assert!(err.is_retryable());
    }

    #[test]
    fn test_quicksilver_error_io_keeps_source() {
        use std::error::Error as _;

        let err = QuickSilverError::io(
            "/etc/quicksilver.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert!(err.is_io());
        assert!(!err.is_validation());
        assert!(!err.is_retryable());
        let msg = format!("{err}");
        assert!(msg.contains("/etc/quicksilver.toml"));
        assert!(msg.contains("no such file"));
        assert!(err.source().is_some());
    }
}
