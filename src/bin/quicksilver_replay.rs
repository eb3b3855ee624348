//! QuickSilver replay tool
//!
//! Feeds recorded position samples (JSON lines) through the proximity monitor
//! with in-memory stores and prints every emitted action as a JSON line.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use clap::Parser;
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter, warn};

use quicksilver::storage::{InMemoryPositionTracker, InMemoryRecordStore, InMemoryRuleStore};
use quicksilver::{
    Clock, EmittedAction, GeofenceRule, ManualClock, MonitorConfig, MonitorSession, PaymentMethod, PositionSample,
    ProximityMonitor, SuppressionTracker, TollCatalog, Vehicle,
};

#[derive(Parser, Debug)]
#[command(version, about = "Replay position samples through the toll proximity monitor")]
struct Cli {
    /// Monitor config (TOML).
    #[clap(long)]
    config: Option<PathBuf>,
    /// Position samples, one JSON object per line.
    #[clap(long)]
    samples: PathBuf,
    /// Geofence rules (JSON array), in match order.
    #[clap(long)]
    rules: Option<PathBuf>,
    /// Vehicles and payment methods (JSON object).
    #[clap(long)]
    account: Option<PathBuf>,
    /// Run through a live session on the system clock instead of replaying
    /// each sample at its own timestamp.
    #[clap(long)]
    live: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Account {
    vehicles: Vec<Vehicle>,
    payment_methods: Vec<PaymentMethod>,
}

type ReplayResult<T> = Result<T, String>;

fn fail<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> String + '_ {
    move |e| format!("{context}: {e}")
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> ReplayResult<T> {
    let file = File::open(path).map_err(fail(&path.display().to_string()))?;
    serde_json::from_reader(BufReader::new(file)).map_err(fail(&path.display().to_string()))
}

fn read_samples(path: &Path) -> ReplayResult<Vec<PositionSample>> {
    let file = File::open(path).map_err(fail(&path.display().to_string()))?;
    let mut out = Vec::new();
    for (n, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(fail("read samples"))?;
        if line.trim().is_empty() {
            continue;
        }
        let sample: PositionSample =
            serde_json::from_str(&line).map_err(fail(&format!("{}:{}", path.display(), n + 1)))?;
        out.push(sample);
    }
    Ok(out)
}

fn emit(out: &mut impl Write, action: &EmittedAction) -> ReplayResult<()> {
    let line = serde_json::to_string(action).map_err(fail("encode action"))?;
    writeln!(out, "{line}").map_err(fail("write action"))
}

fn run(cli: Cli) -> ReplayResult<()> {
    let config = match &cli.config {
        Some(path) => MonitorConfig::load(path).map_err(fail("load config"))?,
        None => MonitorConfig::default(),
    };

    let mut log_fmt = tracing_subscriber::fmt().with_writer(io::stderr);
    if let Some(ref level) = config.log_level {
        if let Ok(lv) = level.as_str().parse::<LevelFilter>() {
            log_fmt = log_fmt.with_max_level(lv);
        }
    }
    log_fmt.try_init().ok();

    let rules: Vec<GeofenceRule> = match &cli.rules {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };
    let account: Account = match &cli.account {
        Some(path) => read_json(path)?,
        None => Account::default(),
    };
    let samples = read_samples(&cli.samples)?;

    let records = Arc::new(InMemoryRecordStore::new());
    for v in account.vehicles {
        records.add_vehicle(v).map_err(fail("add vehicle"))?;
    }
    for m in account.payment_methods {
        records.add_payment_method(m).map_err(fail("add payment method"))?;
    }
    let rule_store = Arc::new(InMemoryRuleStore::with_rules(rules));
    let tracker = Arc::new(InMemoryPositionTracker::new());

    info!(samples = samples.len(), live = cli.live, "replay starting");

    if cli.live {
        let monitor = ProximityMonitor::new(
            TollCatalog::builtin(),
            rule_store,
            records,
            tracker,
            Arc::new(config.system_clock()),
            &config,
        );
        let (session, stream) = MonitorSession::start(Arc::new(monitor), &config).map_err(fail("start session"))?;
        let stats = thread::scope(|scope| {
            // Drain actions while samples are still being fed.
            let printer = scope.spawn(|| -> ReplayResult<()> {
                let mut out = io::stdout().lock();
                for action in stream.iter() {
                    emit(&mut out, &action)?;
                }
                Ok(())
            });
            for sample in samples {
                if !session.submit_blocking(sample) {
                    warn!("session closed before all samples were submitted");
                    break;
                }
            }
            let stats = session.shutdown();
            printer
                .join()
                .map_err(|_| "action printer panicked".to_string())
                .and_then(|printed| printed)
                .map(|()| stats)
        })?;
        if stats.dropped_actions > 0 || stats.stale_samples > 0 {
            warn!(
                dropped_actions = stats.dropped_actions,
                stale_samples = stats.stale_samples,
                "live replay lost samples or actions"
            );
        }
        info!(?stats, "replay finished");
        return Ok(());
    }

    let offset = config.local_offset().unwrap_or_else(|| *chrono::Local::now().offset());
    let Some(first) = samples.first() else {
        return Ok(());
    };
    let clock = Arc::new(ManualClock::new(first.timestamp.with_timezone(&offset)));
    let monitor = ProximityMonitor::new(
        TollCatalog::builtin(),
        rule_store,
        records,
        tracker,
        Arc::clone(&clock) as Arc<dyn Clock>,
        &config,
    );

    let mut out = io::stdout().lock();
    let mut suppression = SuppressionTracker::new();
    for sample in &samples {
        clock.set(sample.timestamp.with_timezone(&offset));
        for action in monitor.process_sample(sample, &mut suppression) {
            emit(&mut out, &action)?;
        }
    }
    info!("replay finished");
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
