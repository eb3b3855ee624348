use std::hint::black_box;
use std::sync::Arc;

use chrono::{FixedOffset, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use quicksilver::geo::destination_point;
use quicksilver::monitor::{decide, DecisionParams};
use quicksilver::storage::{InMemoryPositionTracker, InMemoryRecordStore, InMemoryRuleStore};
use quicksilver::{
    Coordinates, DayOfWeek, GeofenceRule, ManualClock, MonitorConfig, PositionSample, ProximityMonitor, RuleAction,
    RuleSet, SuppressionTracker, TimeWindow, TollCatalog, TollPointId,
};

fn rules() -> Vec<GeofenceRule> {
    vec![
        GeofenceRule::new("commute", RuleAction::AutoPay)
            .on_days(DayOfWeek::WEEKDAYS)
            .during(TimeWindow::parse("07:00", "10:00").unwrap()),
        GeofenceRule::new("weekend", RuleAction::NotifyOnly).on_days(DayOfWeek::WEEKEND),
        GeofenceRule::new("late", RuleAction::Silent).during(TimeWindow::parse("22:00", "05:00").unwrap()),
    ]
}

fn bench_decide_far(c: &mut Criterion) {
    let catalog = TollCatalog::builtin();
    let rules = RuleSet::new(rules());
    let params = DecisionParams::from(&MonitorConfig::default());
    let now = FixedOffset::west_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
        .unwrap();
    // Central Valley, far from every built-in toll point.
    let position = Coordinates::new(37.0, -120.0);

    let mut group = c.benchmark_group("evaluate");
    group.throughput(Throughput::Elements(catalog.len() as u64));
    group.bench_function("decide_far", |b| {
        let mut suppression = SuppressionTracker::new();
        b.iter(|| {
            let decisions = decide(
                black_box(&position),
                catalog.points(),
                &rules,
                &mut suppression,
                &now,
                &params,
            );
            black_box(decisions.len())
        });
    });
    group.finish();
}

fn bench_process_crossing(c: &mut Criterion) {
    let catalog = TollCatalog::builtin();
    let gate = catalog.get(&TollPointId::from("golden-gate")).unwrap().location;
    let approach = destination_point(&gate, 0.0, 2000.0);
    let config = MonitorConfig::default();
    let clock = Arc::new(ManualClock::new(
        FixedOffset::west_opt(7 * 3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 8, 0, 0)
            .unwrap(),
    ));
    let monitor = ProximityMonitor::new(
        catalog,
        Arc::new(InMemoryRuleStore::with_rules(rules())),
        Arc::new(InMemoryRecordStore::new()),
        Arc::new(InMemoryPositionTracker::new()),
        Arc::clone(&clock),
        &config,
    );

    c.bench_function("evaluate/approach_and_cross", |b| {
        b.iter(|| {
            // Fresh suppression so every iteration alerts.
            let mut suppression = SuppressionTracker::new();
            let now = Utc::now();
            let ahead = monitor.evaluate(&PositionSample::at(approach, now), &mut suppression);
            let crossed = monitor.evaluate(&PositionSample::at(gate, now), &mut suppression);
            black_box(ahead.len() + crossed.len())
        });
    });
}

criterion_group!(benches, bench_decide_far, bench_process_crossing);
criterion_main!(benches);
