//! # QuickSilver - toll proximity monitor
//!
//! QuickSilver watches a stream of device positions and reacts to a fixed set
//! of toll points: it warns the driver one to two miles ahead of a toll, and
//! when a geofence is crossed it records a geofence event, optionally pays the
//! toll automatically, and notifies the driver, according to the user's
//! geofence rules.
//!
//! ## Core Concepts
//!
//! - **TollPoint**: a named toll location with a circular geofence
//! - **GeofenceRule**: a day/time-scoped action (`auto_pay`, `notify_with_confirm`, `notify_only`, `silent`)
//! - **SuppressionTracker**: at most one alert per toll point and alert kind per cooldown window
//! - **ProximityMonitor**: evaluates a sample and writes through the collaborator traits
//! - **MonitorSession**: a worker thread feeding samples to the monitor in order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quicksilver::{MonitorConfig, MonitorSession, PositionSample, ProximityMonitor, TollCatalog};
//! use quicksilver::storage::{InMemoryPositionTracker, InMemoryRecordStore, InMemoryRuleStore};
//!
//! let config = MonitorConfig::default();
//! let monitor = ProximityMonitor::new(
//!     TollCatalog::builtin(),
//!     Arc::new(InMemoryRuleStore::new()),
//!     Arc::new(InMemoryRecordStore::new()),
//!     Arc::new(InMemoryPositionTracker::new()),
//!     Arc::new(config.system_clock()),
//!     &config,
//! );
//! let (session, actions) = MonitorSession::start(Arc::new(monitor), &config)?;
//! session.submit(PositionSample::new(37.8077, -122.4750, chrono::Utc::now()));
//! let action = actions.recv()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Reference data and geometry
pub mod geo;
pub mod schedule;
pub mod toll;

// Rules, suppression and records
pub mod notification;
pub mod record;
pub mod rule;
pub mod suppression;

// Runtime
pub mod clock;
pub mod config;
pub mod error;
pub mod monitor;
pub mod payment;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MonitorConfig, ProximityBand, WatchOptions};
pub use error::{MonitorError, QuickSilverError, QuickSilverResult, ValidationError};
pub use geo::{haversine_distance, Coordinates};
pub use monitor::{
    ActionStream, AutoPayStatus, CrossingReport, EmittedAction, MonitorSession, PositionSample, ProximityMonitor,
    ProximityReport, WriteOutcome, Zone,
};
pub use notification::{Notification, NotificationId, NotificationPayload, Priority};
pub use payment::{decline_pending_event, pending_events, settle_pending_event};
pub use record::{
    ConfirmationNumber, EventStatus, GeofenceEvent, GeofenceEventId, PaymentMethod, Trip, TripId, TripStatus, Vehicle,
};
pub use rule::{GeofenceRule, RuleAction, RuleId, RuleSet};
pub use schedule::{ClockTime, DayOfWeek, TimeWindow};
pub use storage::{PositionTracker, RecordStore, RuleStore, StorageError};
pub use suppression::{AlertKind, SuppressionTracker};
pub use toll::{TollCatalog, TollPoint, TollPointId};
