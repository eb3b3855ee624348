//! Proximity evaluation.
//!
//! Evaluation is split in two. [`decide`] is pure: it classifies every toll
//! point against a sample, applies suppression and picks rule actions.
//! [`ProximityMonitor`] then carries out each decision against the
//! collaborators, one independent call at a time.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{MonitorConfig, ProximityBand};
use crate::geo::{format_miles, haversine_distance, Coordinates};
use crate::notification::Notification;
use crate::record::{default_payment_method, primary_plate, ConfirmationNumber, GeofenceEvent, Trip};
use crate::rule::{RuleAction, RuleMatch, RuleSet};
use crate::storage::{PositionTracker, RecordStore, RuleStore};
use crate::suppression::{AlertKind, SuppressionTracker};
use crate::toll::{TollCatalog, TollPoint};

use super::actions::{
    AutoPayStatus, CrossingReport, EmittedAction, PositionSample, ProximityReport, Step, StepFailure, WriteOutcome,
};

/// Where a sample lies relative to one toll point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Outside the geofence and outside the predictive band.
    Far,
    /// Outside the geofence, inside the predictive band.
    Approaching,
    /// Inside the geofence (boundary included).
    Inside,
}

/// Classifies a distance against a geofence radius and predictive band.
///
/// The inside test is closed (`distance <= radius`) and wins over the band.
#[must_use]
pub fn classify(distance: f64, radius: f64, band: &ProximityBand) -> Zone {
    if distance <= radius {
        Zone::Inside
    } else if band.contains(distance) {
        Zone::Approaching
    } else {
        Zone::Far
    }
}

/// An alert that passed suppression and must be carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision<'a> {
    /// Send a "toll ahead" warning.
    TollAhead {
        /// Approached point.
        point: &'a TollPoint,
        /// Distance from its center, in meters.
        distance_meters: f64,
    },
    /// Handle a geofence crossing.
    Crossing {
        /// Crossed point.
        point: &'a TollPoint,
        /// Distance from its center, in meters.
        distance_meters: f64,
        /// Selected rule.
        rule: RuleMatch,
    },
}

/// Suppression and rule parameters for [`decide`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionParams {
    /// Cooldown per (point, alert kind), in milliseconds.
    pub cooldown_ms: i64,
    /// Predictive band.
    pub band: ProximityBand,
}

impl From<&MonitorConfig> for DecisionParams {
    fn from(c: &MonitorConfig) -> Self {
        Self {
            cooldown_ms: c.cooldown_ms,
            band: c.band,
        }
    }
}

/// Decides which alerts a sample triggers.
///
/// Each point is handled independently. Alerts that pass suppression are
/// claimed in `suppression` before being returned, so a second call at the
/// same instant yields nothing for them.
pub fn decide<'a>(
    position: &Coordinates,
    points: &'a [TollPoint],
    rules: &RuleSet,
    suppression: &mut SuppressionTracker,
    now: &DateTime<FixedOffset>,
    params: &DecisionParams,
) -> Vec<Decision<'a>> {
    let now_ms = now.timestamp_millis();
    let mut out = Vec::new();

    for point in points {
        let distance = haversine_distance(position, &point.location);
        match classify(distance, point.radius_meters, &params.band) {
            Zone::Far => {}
            Zone::Approaching => {
                if suppression.try_claim(AlertKind::Proximity, &point.id, now_ms, params.cooldown_ms) {
                    out.push(Decision::TollAhead {
                        point,
                        distance_meters: distance,
                    });
                } else {
                    debug!(toll_point = %point.id, distance, "proximity alert suppressed");
                }
            }
            Zone::Inside => {
                if suppression.try_claim(AlertKind::Crossing, &point.id, now_ms, params.cooldown_ms) {
                    out.push(Decision::Crossing {
                        point,
                        distance_meters: distance,
                        rule: rules.select(now),
                    });
                } else {
                    debug!(toll_point = %point.id, distance, "crossing alert suppressed");
                }
            }
        }
    }

    out
}

/// Evaluates position samples against the toll catalog and writes the
/// resulting records.
pub struct ProximityMonitor {
    catalog: TollCatalog,
    rules: Arc<dyn RuleStore>,
    records: Arc<dyn RecordStore>,
    positions: Arc<dyn PositionTracker>,
    clock: Arc<dyn Clock>,
    params: DecisionParams,
}

impl std::fmt::Debug for ProximityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximityMonitor")
            .field("toll_points", &self.catalog.len())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl ProximityMonitor {
    /// Creates a monitor.
    #[must_use]
    pub fn new(
        catalog: TollCatalog,
        rules: Arc<dyn RuleStore>,
        records: Arc<dyn RecordStore>,
        positions: Arc<dyn PositionTracker>,
        clock: Arc<dyn Clock>,
        config: &MonitorConfig,
    ) -> Self {
        Self {
            catalog,
            rules,
            records,
            positions,
            clock,
            params: DecisionParams::from(config),
        }
    }

    /// The toll catalog being monitored.
    #[must_use]
    pub fn catalog(&self) -> &TollCatalog {
        &self.catalog
    }

    /// The monitor's time source.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Forwards the sample to the position tracker, then evaluates it.
    ///
    /// A failed position push is logged and does not affect evaluation.
    pub fn process_sample(&self, sample: &PositionSample, suppression: &mut SuppressionTracker) -> Vec<EmittedAction> {
        if let Err(e) = self.positions.push_position(&sample.coordinates(), sample.timestamp) {
            warn!(error = %e, "failed to push device position");
        }
        self.evaluate(sample, suppression)
    }

    /// Evaluates one sample.
    ///
    /// Rules are fetched fresh, at most once, and only when a crossing may
    /// fire. Collaborator failures are logged and reported per alert; they
    /// never abort evaluation of the remaining toll points.
    pub fn evaluate(&self, sample: &PositionSample, suppression: &mut SuppressionTracker) -> Vec<EmittedAction> {
        let now = self.clock.now();
        let position = sample.coordinates();

        let (rules, rules_failure) = if self.crossing_possible(&position, suppression, &now) {
            self.load_rules()
        } else {
            (RuleSet::empty(), None)
        };
        let mut rules_failure = rules_failure;

        let decisions = decide(&position, self.catalog.points(), &rules, suppression, &now, &self.params);

        let now_utc = now.with_timezone(&Utc);
        decisions
            .into_iter()
            .map(|decision| match decision {
                Decision::TollAhead { point, distance_meters } => {
                    EmittedAction::Proximity(self.warn_toll_ahead(point, distance_meters, now_utc))
                }
                Decision::Crossing {
                    point,
                    distance_meters,
                    rule,
                } => EmittedAction::Crossing(self.handle_crossing(
                    point,
                    position,
                    distance_meters,
                    rule,
                    rules_failure.take(),
                    &now,
                )),
            })
            .collect()
    }

    fn crossing_possible(
        &self,
        position: &Coordinates,
        suppression: &SuppressionTracker,
        now: &DateTime<FixedOffset>,
    ) -> bool {
        let now_ms = now.timestamp_millis();
        self.catalog.points().iter().any(|p| {
            haversine_distance(position, &p.location) <= p.radius_meters
                && suppression.should_alert(AlertKind::Crossing, &p.id, now_ms, self.params.cooldown_ms)
        })
    }

    fn load_rules(&self) -> (RuleSet, Option<StepFailure>) {
        match self.rules.list_active_rules() {
            Ok(rules) => (RuleSet::new(rules), None),
            Err(e) => {
                warn!(error = %e, "failed to fetch geofence rules, using default action");
                (RuleSet::empty(), Some(StepFailure::new(Step::ListRules, &e)))
            }
        }
    }

    fn warn_toll_ahead(&self, point: &TollPoint, distance_meters: f64, now: DateTime<Utc>) -> ProximityReport {
        let distance_miles = format_miles(distance_meters);
        info!(toll_point = %point.id, miles = %distance_miles, "toll ahead");

        let notification = Notification::toll_ahead(point, distance_miles.clone(), now);
        let (notification, failure) = match self.records.create_notification(notification.clone()) {
            Ok(()) => (Some(notification), None),
            Err(e) => {
                warn!(toll_point = %point.id, step = "create_notification", error = %e, "toll ahead notification dropped");
                (None, Some(StepFailure::new(Step::CreateNotification, &e)))
            }
        };

        ProximityReport {
            toll_point_id: point.id.clone(),
            distance_meters,
            distance_miles,
            notification,
            failure,
        }
    }

    fn handle_crossing(
        &self,
        point: &TollPoint,
        position: Coordinates,
        distance_meters: f64,
        rule: RuleMatch,
        rules_failure: Option<StepFailure>,
        now: &DateTime<FixedOffset>,
    ) -> CrossingReport {
        let now_utc = now.with_timezone(&Utc);
        let action = rule.action;
        info!(toll_point = %point.id, %action, distance = distance_meters, "geofence crossing");

        let mut failures: Vec<StepFailure> = rules_failure.into_iter().collect();

        let plate = match self.records.list_vehicles() {
            Ok(vehicles) => primary_plate(&vehicles),
            Err(e) => {
                warn!(toll_point = %point.id, step = "list_vehicles", error = %e, "vehicle lookup failed");
                failures.push(StepFailure::new(Step::ListVehicles, &e));
                None
            }
        };

        let event = GeofenceEvent::for_crossing(point, position, now_utc, action, rule.rule_id, plate);
        let written_event = match self.records.create_event(event.clone()) {
            Ok(()) => Some(event.clone()),
            Err(e) => {
                warn!(toll_point = %point.id, step = "create_event", error = %e, "geofence event dropped");
                failures.push(StepFailure::new(Step::CreateEvent, &e));
                None
            }
        };

        let auto_pay = if action == RuleAction::AutoPay {
            self.auto_pay(point, &event, now, &mut failures)
        } else {
            AutoPayStatus::NotRequested
        };

        let notification = if action.notifies() {
            let n = if action == RuleAction::AutoPay {
                let trip = match &auto_pay {
                    AutoPayStatus::Charged { trip } => Some(trip),
                    _ => None,
                };
                Notification::auto_paid(
                    point,
                    event.id,
                    trip.map(|t| t.id),
                    trip.map(|t| t.confirmation_number.clone()),
                    now_utc,
                )
            } else {
                Notification::toll_detected(point, event.id, action, now_utc)
            };
            match self.records.create_notification(n.clone()) {
                Ok(()) => Some(n),
                Err(e) => {
                    warn!(toll_point = %point.id, step = "create_notification", error = %e, "crossing notification dropped");
                    failures.push(StepFailure::new(Step::CreateNotification, &e));
                    None
                }
            }
        } else {
            None
        };

        let wrote_any = written_event.is_some()
            || matches!(auto_pay, AutoPayStatus::Charged { .. })
            || notification.is_some();
        let outcome = WriteOutcome::from_parts(wrote_any, &failures);
        if outcome != WriteOutcome::Completed {
            warn!(toll_point = %point.id, ?outcome, failed_steps = failures.len(), "crossing handled with failures");
        }

        CrossingReport {
            toll_point_id: point.id.clone(),
            distance_meters,
            action,
            rule_id: rule.rule_id,
            event: written_event,
            auto_pay,
            notification,
            failures,
            outcome,
        }
    }

    fn auto_pay(
        &self,
        point: &TollPoint,
        event: &GeofenceEvent,
        now: &DateTime<FixedOffset>,
        failures: &mut Vec<StepFailure>,
    ) -> AutoPayStatus {
        let methods = match self.records.list_payment_methods() {
            Ok(m) => m,
            Err(e) => {
                warn!(toll_point = %point.id, step = "list_payment_methods", error = %e, "auto-pay lookup failed");
                failures.push(StepFailure::new(Step::ListPaymentMethods, &e));
                return AutoPayStatus::Failed;
            }
        };

        let Some(method) = default_payment_method(&methods) else {
            info!(toll_point = %point.id, "auto-pay skipped: no default payment method");
            return AutoPayStatus::NoPaymentMethod;
        };

        let confirmation = ConfirmationNumber::for_millis(now.timestamp_millis());
        let trip = Trip::paid(event, point.road.clone(), method.id.clone(), confirmation, now.with_timezone(&Utc));
        match self.records.create_trip(trip.clone()) {
            Ok(()) => {
                info!(toll_point = %point.id, confirmation = %trip.confirmation_number, "toll auto-paid");
                AutoPayStatus::Charged { trip }
            }
            Err(e) => {
                warn!(toll_point = %point.id, step = "create_trip", error = %e, "auto-pay trip dropped");
                failures.push(StepFailure::new(Step::CreateTrip, &e));
                AutoPayStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination_point;
    use crate::rule::GeofenceRule;
    use crate::schedule::TimeWindow;
    use chrono::TimeZone;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
            .unwrap()
    }

    fn point() -> TollPoint {
        TollPoint::new("gg", "Golden Gate Bridge", "US-101", Coordinates::new(37.8077, -122.4750), 875, 500.0)
    }

    fn params() -> DecisionParams {
        DecisionParams::from(&MonitorConfig::default())
    }

    #[test]
    fn classify_boundaries() {
        let band = ProximityBand::default();
        assert_eq!(classify(0.0, 500.0, &band), Zone::Inside);
        assert_eq!(classify(500.0, 500.0, &band), Zone::Inside);
        assert_eq!(classify(500.1, 500.0, &band), Zone::Far);
        assert_eq!(classify(1599.9, 500.0, &band), Zone::Far);
        assert_eq!(classify(1600.0, 500.0, &band), Zone::Approaching);
        assert_eq!(classify(3200.0, 500.0, &band), Zone::Approaching);
        assert_eq!(classify(3200.1, 500.0, &band), Zone::Far);
    }

    #[test]
    fn radius_inside_band_is_still_inside() {
        // A huge geofence swallows the band entirely.
        let band = ProximityBand::default();
        assert_eq!(classify(2000.0, 2500.0, &band), Zone::Inside);
        assert_eq!(classify(2600.0, 2500.0, &band), Zone::Approaching);
    }

    #[test]
    fn decide_toll_ahead_then_suppressed() {
        let points = vec![point()];
        let pos = destination_point(&points[0].location, 0.0, 1700.0);
        let mut sup = SuppressionTracker::new();

        let d = decide(&pos, &points, &RuleSet::empty(), &mut sup, &now(), &params());
        assert_eq!(d.len(), 1);
        assert!(matches!(d[0], Decision::TollAhead { .. }));

        let d = decide(&pos, &points, &RuleSet::empty(), &mut sup, &now(), &params());
        assert!(d.is_empty());
    }

    #[test]
    fn decide_crossing_uses_rules() {
        let points = vec![point()];
        let rules = RuleSet::new(vec![GeofenceRule::new("commute", RuleAction::AutoPay)
            .during(TimeWindow::parse("07:00", "09:00").unwrap())]);
        let mut sup = SuppressionTracker::new();

        let d = decide(&points[0].location, &points, &rules, &mut sup, &now(), &params());
        match &d[..] {
            [Decision::Crossing { rule, distance_meters, .. }] => {
                assert_eq!(rule.action, RuleAction::AutoPay);
                assert_eq!(*distance_meters, 0.0);
            }
            other => panic!("expected one crossing, got {other:?}"),
        }
    }

    #[test]
    fn decide_far_is_silent() {
        let points = vec![point()];
        let pos = destination_point(&points[0].location, 90.0, 10_000.0);
        let mut sup = SuppressionTracker::new();
        assert!(decide(&pos, &points, &RuleSet::empty(), &mut sup, &now(), &params()).is_empty());
        assert_eq!(sup.len(AlertKind::Proximity), 0);
    }
}
