use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use quicksilver::geo::destination_point;
use quicksilver::storage::{InMemoryPositionTracker, InMemoryRecordStore, InMemoryRuleStore};
use quicksilver::{
    Clock, Coordinates, EmittedAction, ManualClock, MonitorConfig, MonitorError, MonitorSession, PositionSample,
    ProximityMonitor, RecordStore, TollCatalog, TollPoint,
};

const PLAZA: Coordinates = Coordinates::new(40.0, -100.0);

fn start_time() -> DateTime<FixedOffset> {
    FixedOffset::west_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
        .unwrap()
}

struct Fixture {
    monitor: Arc<ProximityMonitor>,
    records: Arc<InMemoryRecordStore>,
    clock: Arc<ManualClock>,
    config: MonitorConfig,
}

fn fixture() -> Fixture {
    let catalog =
        TollCatalog::new(vec![TollPoint::new("test-plaza", "Test Plaza", "I-1", PLAZA, 500, 400.0)]).unwrap();
    let records = Arc::new(InMemoryRecordStore::new());
    let clock = Arc::new(ManualClock::new(start_time()));
    let config = MonitorConfig::default();
    let monitor = ProximityMonitor::new(
        catalog,
        Arc::new(InMemoryRuleStore::new()),
        records.clone(),
        Arc::new(InMemoryPositionTracker::new()),
        clock.clone(),
        &config,
    );
    Fixture {
        monitor: Arc::new(monitor),
        records,
        clock,
        config,
    }
}

impl Fixture {
    fn sample(&self, position: Coordinates) -> PositionSample {
        PositionSample::at(position, self.clock.now().with_timezone(&Utc))
    }
}

#[test]
fn session_emits_actions_in_sample_order() {
    let f = fixture();
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();
    assert!(session.is_running());

    assert!(session.submit(f.sample(destination_point(&PLAZA, 0.0, 2000.0))));
    assert!(session.submit(f.sample(PLAZA)));

    let first = stream.recv_timeout(Duration::from_secs(5)).unwrap();
    let second = stream.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(first, EmittedAction::Proximity(_)));
    assert!(matches!(second, EmittedAction::Crossing(_)));

    let stats = session.shutdown();
    assert_eq!(stats.accepted, 2);
    assert_eq!(stats.evaluated, 2);
    assert_eq!(stats.emitted, 2);
    assert_eq!(stats.dropped_actions, 0);
}

#[test]
fn suppression_holds_within_a_session() {
    let f = fixture();
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();

    for _ in 0..5 {
        assert!(session.submit(f.sample(PLAZA)));
    }
    let stats = session.shutdown();

    assert_eq!(stats.evaluated, 5);
    assert_eq!(stats.emitted, 1);
    assert_eq!(stream.drain().len(), 1);
    assert_eq!(f.records.list_events().unwrap().len(), 1);
}

#[test]
fn new_session_starts_unsuppressed() {
    let f = fixture();

    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();
    session.submit(f.sample(PLAZA));
    session.shutdown();
    assert_eq!(stream.drain().len(), 1);

    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();
    session.submit(f.sample(PLAZA));
    session.shutdown();
    assert_eq!(stream.drain().len(), 1);

    assert_eq!(f.records.list_events().unwrap().len(), 2);
}

#[test]
fn stale_samples_are_discarded() {
    let f = fixture();
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();

    let old = PositionSample::at(PLAZA, (start_time() - chrono::Duration::milliseconds(30_001)).with_timezone(&Utc));
    let aged = PositionSample::at(PLAZA, (start_time() - chrono::Duration::milliseconds(30_000)).with_timezone(&Utc));
    session.submit(old);
    session.submit(aged);
    let stats = session.shutdown();

    assert_eq!(stats.stale_samples, 1);
    assert_eq!(stats.evaluated, 1);
    assert_eq!(stream.drain().len(), 1);
}

#[test]
fn stopped_session_rejects_samples() {
    let f = fixture();
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();

    session.stop();
    assert!(!session.is_running());
    assert!(!session.submit(f.sample(PLAZA)));

    let stats = session.shutdown();
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.dropped_samples, 1);
    assert!(matches!(stream.recv(), Err(MonitorError::Disconnected { .. })));
    assert!(f.records.list_events().unwrap().is_empty());
}

#[test]
fn dropping_session_closes_stream() {
    let f = fixture();
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();
    session.submit(f.sample(PLAZA));
    drop(session);

    let actions: Vec<_> = stream.iter().collect();
    assert_eq!(actions.len(), 1);
}

#[test]
fn recv_timeout_reports_timeout() {
    let f = fixture();
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();
    let err = stream.recv_timeout(Duration::from_millis(20)).unwrap_err();
    assert!(matches!(err, MonitorError::Timeout { duration_ms: 20 }));
    session.shutdown();
}

#[test]
fn blocking_submit_feeds_every_sample_through_a_small_queue() {
    let f = fixture();
    let config = MonitorConfig {
        sample_queue_capacity: 4,
        ..MonitorConfig::default()
    };
    let (session, stream) = MonitorSession::start(Arc::clone(&f.monitor), &config).unwrap();

    // Far from the plaza: every sample is evaluated, none alerts.
    let far = destination_point(&PLAZA, 0.0, 50_000.0);
    for _ in 0..2_000 {
        assert!(session.submit_blocking(f.sample(far)));
    }
    assert!(session.submit_blocking(f.sample(PLAZA)));
    let stats = session.shutdown();

    assert_eq!(stats.accepted, 2_001);
    assert_eq!(stats.dropped_samples, 0);
    assert_eq!(stats.evaluated, 2_001);
    assert_eq!(stream.drain().len(), 1);
}

#[test]
fn blocking_submit_after_stop_is_rejected() {
    let f = fixture();
    let (session, _stream) = MonitorSession::start(Arc::clone(&f.monitor), &f.config).unwrap();
    session.stop();
    assert!(!session.submit_blocking(f.sample(PLAZA)));
    assert_eq!(session.shutdown().dropped_samples, 1);
}
