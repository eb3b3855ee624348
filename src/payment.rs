//! Manual settlement of pending geofence events.
//!
//! Crossings that were not auto-paid wait as `pending` events until the
//! driver confirms or declines them. Unlike the monitor, these flows return
//! errors to the caller.

use chrono::Utc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{QuickSilverResult, ValidationError};
use crate::record::{ConfirmationNumber, EventStatus, GeofenceEvent, GeofenceEventId, Trip};
use crate::storage::{RecordStore, StorageError};
use crate::toll::TollCatalog;

fn pending_event(store: &dyn RecordStore, id: GeofenceEventId) -> QuickSilverResult<GeofenceEvent> {
    let event = store.get_event(id)?.ok_or(StorageError::EventNotFound(id))?;
    if event.status != EventStatus::Pending {
        return Err(ValidationError::EventNotPending {
            id,
            status: event.status,
        }
        .into());
    }
    Ok(event)
}

/// Pays a pending event with the given payment method.
///
/// Writes a paid trip, then marks the event `paid`. If the status update
/// fails the trip stays written and the error is returned.
///
/// # Errors
///
/// - `EventNotFound` / `PaymentMethodNotFound` for unknown ids
/// - `EventNotPending` if the event was already settled
/// - any storage error from the writes
pub fn settle_pending_event(
    store: &dyn RecordStore,
    catalog: &TollCatalog,
    event_id: GeofenceEventId,
    payment_method_id: &str,
    clock: &dyn Clock,
) -> QuickSilverResult<Trip> {
    let event = pending_event(store, event_id)?;

    let methods = store.list_payment_methods()?;
    let method = methods
        .iter()
        .find(|m| m.id == payment_method_id)
        .ok_or_else(|| StorageError::PaymentMethodNotFound(payment_method_id.to_string()))?;

    let road = catalog
        .get(&event.toll_point_id)
        .map(|p| p.road.clone())
        .unwrap_or_default();

    let now = clock.now();
    let trip = Trip::paid(
        &event,
        road,
        method.id.clone(),
        ConfirmationNumber::for_millis(now.timestamp_millis()),
        now.with_timezone(&Utc),
    );
    store.create_trip(trip.clone())?;

    if let Err(e) = store.update_event_status(event_id, EventStatus::Paid) {
        warn!(event = %event_id, trip = %trip.id, error = %e, "trip written but event status not updated");
        return Err(e.into());
    }

    info!(event = %event_id, confirmation = %trip.confirmation_number, "pending toll paid");
    Ok(trip)
}

/// Declines a pending event.
///
/// # Errors
///
/// - `EventNotFound` for an unknown id
/// - `EventNotPending` if the event was already settled
pub fn decline_pending_event(store: &dyn RecordStore, event_id: GeofenceEventId) -> QuickSilverResult<GeofenceEvent> {
    pending_event(store, event_id)?;
    let event = store.update_event_status(event_id, EventStatus::Declined)?;
    info!(event = %event_id, "pending toll declined");
    Ok(event)
}

/// Pending events, oldest first.
///
/// # Errors
///
/// Returns the storage error if listing fails.
pub fn pending_events(store: &dyn RecordStore) -> QuickSilverResult<Vec<GeofenceEvent>> {
    Ok(store
        .list_events()?
        .into_iter()
        .filter(|e| e.status == EventStatus::Pending)
        .collect())
}
