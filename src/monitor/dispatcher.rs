//! Monitoring session worker.
//!
//! A session owns one `SuppressionTracker` and a dedicated worker thread that
//! evaluates position samples in arrival order. Samples are enqueued with a
//! bounded channel and `submit` never blocks the location callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::config::{MonitorConfig, WatchOptions};
use crate::error::{MonitorError, QuickSilverResult};
use crate::suppression::SuppressionTracker;

use super::actions::{EmittedAction, PositionSample};
use super::evaluator::ProximityMonitor;
use super::stream::ActionStream;

#[derive(Debug, Default)]
struct Counters {
    accepted: AtomicU64,
    dropped_samples: AtomicU64,
    stale_samples: AtomicU64,
    evaluated: AtomicU64,
    emitted: AtomicU64,
    dropped_actions: AtomicU64,
}

/// Point-in-time session counters.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStats {
    /// Samples queued by `submit`.
    pub accepted: u64,
    /// Samples rejected because the queue was full or closed.
    pub dropped_samples: u64,
    /// Samples discarded for exceeding `watch.maximum_age_ms`.
    pub stale_samples: u64,
    /// Samples evaluated.
    pub evaluated: u64,
    /// Actions delivered to the stream.
    pub emitted: u64,
    /// Actions dropped because the stream was full or gone.
    pub dropped_actions: u64,
}

impl Counters {
    fn snapshot(&self) -> SessionStats {
        SessionStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            dropped_samples: self.dropped_samples.load(Ordering::Relaxed),
            stale_samples: self.stale_samples.load(Ordering::Relaxed),
            evaluated: self.evaluated.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            dropped_actions: self.dropped_actions.load(Ordering::Relaxed),
        }
    }
}

/// A running monitoring session.
///
/// Suppression state lives only as long as the session; starting a new
/// session starts with no suppressed points.
#[derive(Debug)]
pub struct MonitorSession {
    sample_tx: Mutex<Option<Sender<PositionSample>>>,
    counters: Arc<Counters>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorSession {
    /// Starts a session and returns it with the stream of emitted actions.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Spawn` if the worker thread cannot be started.
    pub fn start(monitor: Arc<ProximityMonitor>, config: &MonitorConfig) -> QuickSilverResult<(Self, ActionStream)> {
        let (sample_tx, sample_rx) = bounded::<PositionSample>(config.sample_queue_capacity.max(1));
        let (action_tx, action_rx) = bounded::<EmittedAction>(config.action_queue_capacity.max(1));

        let counters = Arc::new(Counters::default());
        let thread_counters = Arc::clone(&counters);
        let watch = config.watch;

        let join = thread::Builder::new()
            .name("quicksilver-monitor".to_string())
            .spawn(move || worker_loop(&monitor, watch, &thread_counters, &sample_rx, &action_tx))
            .map_err(|e| MonitorError::Spawn {
                message: e.to_string(),
            })?;

        info!(
            sample_queue = config.sample_queue_capacity,
            action_queue = config.action_queue_capacity,
            "monitoring session started"
        );

        let session = Self {
            sample_tx: Mutex::new(Some(sample_tx)),
            counters,
            join: Mutex::new(Some(join)),
        };
        Ok((session, ActionStream::new(action_rx)))
    }

    /// Non-blocking sample enqueue. Returns false if the sample was dropped.
    pub fn submit(&self, sample: PositionSample) -> bool {
        let guard = self
            .sample_tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(tx) = guard.as_ref() else {
            self.counters.dropped_samples.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        match tx.try_send(sample) {
            Ok(()) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                self.counters.dropped_samples.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Blocking sample enqueue for batch producers such as replays.
    ///
    /// Waits while the queue is full. Returns false only if the session was
    /// stopped or the worker is gone. `stop` is not blocked by a waiting
    /// producer.
    pub fn submit_blocking(&self, sample: PositionSample) -> bool {
        let tx = self
            .sample_tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        let Some(tx) = tx else {
            self.counters.dropped_samples.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if tx.send(sample).is_ok() {
            self.counters.accepted.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            self.counters.dropped_samples.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// True until `stop` is called.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sample_tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_some()
    }

    /// Stops accepting samples.
    ///
    /// Samples already queued, and the evaluation in progress, still run to
    /// completion; their collaborator calls are not cancelled.
    pub fn stop(&self) {
        let mut guard = self
            .sample_tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if guard.take().is_some() {
            info!("monitoring session stopping");
        }
    }

    /// Stops the session and waits for the worker to drain and exit.
    pub fn shutdown(self) -> SessionStats {
        self.stop();
        let handle = self
            .join
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("monitor worker panicked");
            }
        }
        self.counters.snapshot()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        // Close the queue so the worker exits after draining. Do not join:
        // the worker may be blocked in a slow collaborator call.
        self.stop();
        if let Ok(mut guard) = self.join.lock() {
            drop(guard.take());
        }
    }
}

fn worker_loop(
    monitor: &ProximityMonitor,
    watch: WatchOptions,
    counters: &Counters,
    sample_rx: &Receiver<PositionSample>,
    action_tx: &Sender<EmittedAction>,
) {
    let mut suppression = SuppressionTracker::new();
    let timeout = Duration::from_millis(watch.timeout_ms.max(1));
    let max_age_ms = i64::try_from(watch.maximum_age_ms).unwrap_or(i64::MAX);

    loop {
        let sample = match sample_rx.recv_timeout(timeout) {
            Ok(sample) => sample,
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_ms = watch.timeout_ms, "no position fix received");
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let age_ms = monitor.clock().now_millis() - sample.timestamp.timestamp_millis();
        if age_ms > max_age_ms {
            counters.stale_samples.fetch_add(1, Ordering::Relaxed);
            debug!(age_ms, max_age_ms, "discarding stale position sample");
            continue;
        }

        let actions = monitor.process_sample(&sample, &mut suppression);
        counters.evaluated.fetch_add(1, Ordering::Relaxed);

        for action in actions {
            // Never block the worker on a slow consumer.
            match action_tx.try_send(action) {
                Ok(()) => {
                    counters.emitted.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Full(_) | TrySendError::Disconnected(_)) => {
                    counters.dropped_actions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    debug!("monitor worker exiting");
}
