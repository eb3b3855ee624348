//! In-memory collaborator implementations.
//!
//! Thread-safe implementations of the collaborator traits, intended for
//! embedded usage, tests and replays. Every store can be told to fail a
//! given call so partial-failure behavior can be exercised.

use std::collections::HashSet;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::geo::Coordinates;
use crate::notification::{Notification, NotificationId};
use crate::record::{EventStatus, GeofenceEvent, GeofenceEventId, PaymentMethod, Trip, Vehicle};
use crate::rule::GeofenceRule;
use crate::storage::traits::{PositionTracker, RecordStore, RuleStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Collaborator calls that can be made to fail.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    PushPosition,
    ListRules,
    CreateEvent,
    GetEvent,
    UpdateEvent,
    CreateTrip,
    CreateNotification,
    MarkRead,
    ListVehicles,
    ListPaymentMethods,
}

impl FaultPoint {
    const fn name(self) -> &'static str {
        match self {
            Self::PushPosition => "push_position",
            Self::ListRules => "list_active_rules",
            Self::CreateEvent => "create_event",
            Self::GetEvent => "get_event",
            Self::UpdateEvent => "update_event_status",
            Self::CreateTrip => "create_trip",
            Self::CreateNotification => "create_notification",
            Self::MarkRead => "mark_notification_read",
            Self::ListVehicles => "list_vehicles",
            Self::ListPaymentMethods => "list_payment_methods",
        }
    }
}

#[derive(Debug, Default)]
struct Faults {
    failing: RwLock<HashSet<FaultPoint>>,
}

impl Faults {
    fn set(&self, point: FaultPoint, failing: bool) {
        let mut guard = self
            .failing
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if failing {
            guard.insert(point);
        } else {
            guard.remove(&point);
        }
    }

    fn check(&self, point: FaultPoint) -> Result<(), StorageError> {
        let guard = self.failing.read().map_err(|_| lock_err("faults.check"))?;
        if guard.contains(&point) {
            return Err(StorageError::ConnectionError(format!(
                "injected failure: {}",
                point.name()
            )));
        }
        Ok(())
    }
}

/// In-memory position tracker. Keeps every pushed position.
#[derive(Debug, Default)]
pub struct InMemoryPositionTracker {
    positions: RwLock<Vec<(Coordinates, DateTime<Utc>)>>,
    faults: Faults,
}

impl InMemoryPositionTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `push_position` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.faults.set(FaultPoint::PushPosition, failing);
    }

    /// Positions received so far.
    pub fn positions(&self) -> Result<Vec<(Coordinates, DateTime<Utc>)>, StorageError> {
        let guard = self.positions.read().map_err(|_| lock_err("positions.list"))?;
        Ok(guard.clone())
    }
}

impl PositionTracker for InMemoryPositionTracker {
    fn push_position(&self, position: &Coordinates, at: DateTime<Utc>) -> Result<(), StorageError> {
        self.faults.check(FaultPoint::PushPosition)?;
        let mut guard = self.positions.write().map_err(|_| lock_err("positions.push"))?;
        guard.push((*position, at));
        Ok(())
    }
}

/// In-memory rule store. Rules are kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryRuleStore {
    rules: RwLock<Vec<GeofenceRule>>,
    faults: Faults,
}

impl InMemoryRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `rules` in order.
    #[must_use]
    pub fn with_rules(rules: Vec<GeofenceRule>) -> Self {
        Self {
            rules: RwLock::new(rules),
            faults: Faults::default(),
        }
    }

    /// Replaces all rules.
    pub fn replace(&self, rules: Vec<GeofenceRule>) -> Result<(), StorageError> {
        let mut guard = self.rules.write().map_err(|_| lock_err("rules.replace"))?;
        *guard = rules;
        Ok(())
    }

    /// Appends a rule at the end of the match order.
    pub fn push(&self, rule: GeofenceRule) -> Result<(), StorageError> {
        let mut guard = self.rules.write().map_err(|_| lock_err("rules.push"))?;
        guard.push(rule);
        Ok(())
    }

    /// Makes `list_active_rules` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.faults.set(FaultPoint::ListRules, failing);
    }
}

impl RuleStore for InMemoryRuleStore {
    fn list_active_rules(&self) -> Result<Vec<GeofenceRule>, StorageError> {
        self.faults.check(FaultPoint::ListRules)?;
        let guard = self.rules.read().map_err(|_| lock_err("rules.list"))?;
        Ok(guard.iter().filter(|r| r.active).cloned().collect())
    }
}

#[derive(Debug, Default)]
struct RecordState {
    events: Vec<GeofenceEvent>,
    trips: Vec<Trip>,
    notifications: Vec<Notification>,
    vehicles: Vec<Vehicle>,
    payment_methods: Vec<PaymentMethod>,
}

/// In-memory record store for a single user.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<RecordState>,
    faults: Faults,
}

impl InMemoryRecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the given call fail (or succeed again).
    pub fn set_failing(&self, point: FaultPoint, failing: bool) {
        self.faults.set(point, failing);
    }

    /// Registers a vehicle.
    pub fn add_vehicle(&self, vehicle: Vehicle) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("vehicle.add"))?;
        if state.vehicles.iter().any(|v| v.id == vehicle.id) {
            return Err(StorageError::DuplicateKey(vehicle.id));
        }
        state.vehicles.push(vehicle);
        Ok(())
    }

    /// Registers a payment method.
    pub fn add_payment_method(&self, method: PaymentMethod) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("payment_method.add"))?;
        if state.payment_methods.iter().any(|m| m.id == method.id) {
            return Err(StorageError::DuplicateKey(method.id));
        }
        state.payment_methods.push(method);
        Ok(())
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create_event(&self, event: GeofenceEvent) -> Result<(), StorageError> {
        self.faults.check(FaultPoint::CreateEvent)?;
        let mut state = self.state.write().map_err(|_| lock_err("event.create"))?;
        if state.events.iter().any(|e| e.id == event.id) {
            return Err(StorageError::DuplicateKey(event.id.to_string()));
        }
        state.events.push(event);
        Ok(())
    }

    fn get_event(&self, id: GeofenceEventId) -> Result<Option<GeofenceEvent>, StorageError> {
        self.faults.check(FaultPoint::GetEvent)?;
        let state = self.state.read().map_err(|_| lock_err("event.get"))?;
        Ok(state.events.iter().find(|e| e.id == id).cloned())
    }

    fn update_event_status(&self, id: GeofenceEventId, status: EventStatus) -> Result<GeofenceEvent, StorageError> {
        self.faults.check(FaultPoint::UpdateEvent)?;
        let mut state = self.state.write().map_err(|_| lock_err("event.update"))?;
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StorageError::EventNotFound(id))?;
        event.status = status;
        Ok(event.clone())
    }

    fn list_events(&self) -> Result<Vec<GeofenceEvent>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("event.list"))?;
        Ok(state.events.clone())
    }

    fn create_trip(&self, trip: Trip) -> Result<(), StorageError> {
        self.faults.check(FaultPoint::CreateTrip)?;
        let mut state = self.state.write().map_err(|_| lock_err("trip.create"))?;
        if state.trips.iter().any(|t| t.id == trip.id) {
            return Err(StorageError::DuplicateKey(trip.id.to_string()));
        }
        state.trips.push(trip);
        Ok(())
    }

    fn list_trips(&self) -> Result<Vec<Trip>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("trip.list"))?;
        Ok(state.trips.clone())
    }

    fn create_notification(&self, notification: Notification) -> Result<(), StorageError> {
        self.faults.check(FaultPoint::CreateNotification)?;
        let mut state = self.state.write().map_err(|_| lock_err("notification.create"))?;
        if state.notifications.iter().any(|n| n.id == notification.id) {
            return Err(StorageError::DuplicateKey(notification.id.to_string()));
        }
        state.notifications.push(notification);
        Ok(())
    }

    fn list_notifications(&self) -> Result<Vec<Notification>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("notification.list"))?;
        Ok(state.notifications.clone())
    }

    fn mark_notification_read(&self, id: NotificationId) -> Result<(), StorageError> {
        self.faults.check(FaultPoint::MarkRead)?;
        let mut state = self.state.write().map_err(|_| lock_err("notification.mark_read"))?;
        let n = state
            .notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or(StorageError::NotificationNotFound(id))?;
        n.read = true;
        Ok(())
    }

    fn list_vehicles(&self) -> Result<Vec<Vehicle>, StorageError> {
        self.faults.check(FaultPoint::ListVehicles)?;
        let state = self.state.read().map_err(|_| lock_err("vehicle.list"))?;
        Ok(state.vehicles.clone())
    }

    fn list_payment_methods(&self) -> Result<Vec<PaymentMethod>, StorageError> {
        self.faults.check(FaultPoint::ListPaymentMethods)?;
        let state = self.state.read().map_err(|_| lock_err("payment_method.list"))?;
        Ok(state.payment_methods.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::RuleAction;
    use crate::toll::TollPoint;

    fn event() -> GeofenceEvent {
        let point = TollPoint::new("a", "A", "R", Coordinates::new(0.0, 0.0), 100, 50.0);
        GeofenceEvent::for_crossing(&point, Coordinates::new(0.0, 0.0), Utc::now(), RuleAction::NotifyOnly, None, None)
    }

    #[test]
    fn event_create_get_update() {
        let store = InMemoryRecordStore::new();
        let ev = event();
        store.create_event(ev.clone()).unwrap();
        assert!(matches!(store.create_event(ev.clone()), Err(StorageError::DuplicateKey(_))));

        let got = store.get_event(ev.id).unwrap().unwrap();
        assert_eq!(got.status, EventStatus::Pending);

        let updated = store.update_event_status(ev.id, EventStatus::Declined).unwrap();
        assert_eq!(updated.status, EventStatus::Declined);
        assert_eq!(store.list_events().unwrap()[0].status, EventStatus::Declined);
    }

    #[test]
    fn update_missing_event_fails() {
        let store = InMemoryRecordStore::new();
        let id = GeofenceEventId::new();
        assert_eq!(
            store.update_event_status(id, EventStatus::Paid).unwrap_err(),
            StorageError::EventNotFound(id)
        );
    }

    #[test]
    fn injected_faults_fail_only_their_call() {
        let store = InMemoryRecordStore::new();
        store.set_failing(FaultPoint::CreateEvent, true);
        assert!(matches!(store.create_event(event()), Err(StorageError::ConnectionError(_))));
        assert!(store.list_vehicles().is_ok());

        store.set_failing(FaultPoint::CreateEvent, false);
        assert!(store.create_event(event()).is_ok());
    }

    #[test]
    fn rule_store_filters_inactive_and_keeps_order() {
        let a = GeofenceRule::new("a", RuleAction::AutoPay);
        let b = GeofenceRule::new("b", RuleAction::Silent).deactivated();
        let c = GeofenceRule::new("c", RuleAction::NotifyOnly);
        let store = InMemoryRuleStore::with_rules(vec![a.clone(), b, c.clone()]);
        let rules = store.list_active_rules().unwrap();
        assert_eq!(rules, vec![a, c]);

        store.set_failing(true);
        assert!(store.list_active_rules().is_err());
    }

    #[test]
    fn position_tracker_records_and_fails() {
        let tracker = InMemoryPositionTracker::new();
        tracker.push_position(&Coordinates::new(1.0, 2.0), Utc::now()).unwrap();
        assert_eq!(tracker.positions().unwrap().len(), 1);
        tracker.set_failing(true);
        assert!(tracker.push_position(&Coordinates::new(1.0, 2.0), Utc::now()).is_err());
        assert_eq!(tracker.positions().unwrap().len(), 1);
    }

    #[test]
    fn mark_notification_read() {
        let store = InMemoryRecordStore::new();
        let point = TollPoint::new("a", "A", "R", Coordinates::new(0.0, 0.0), 100, 50.0);
        let n = Notification::toll_ahead(&point, "1.2".to_string(), Utc::now());
        let id = n.id;
        store.create_notification(n).unwrap();
        store.mark_notification_read(id).unwrap();
        assert!(store.list_notifications().unwrap()[0].read);
        assert!(store.mark_notification_read(NotificationId::new()).is_err());
    }
}
