//! Proximity monitor.
//!
//! Consumes device position samples, detects approaching and crossed toll
//! points, and writes events, trips and notifications through the
//! collaborator traits. The session worker runs evaluations one at a time in
//! arrival order, so suppression state is never shared between concurrent
//! evaluations.

/// Samples, reports and outcome types.
pub mod actions;
/// Session worker.
pub mod dispatcher;
/// Classification, decision and execution.
pub mod evaluator;
/// Emitted action stream.
pub mod stream;

pub use actions::{
    AutoPayStatus, CrossingReport, EmittedAction, PositionSample, ProximityReport, Step, StepFailure, WriteOutcome,
};
pub use dispatcher::{MonitorSession, SessionStats};
pub use evaluator::{classify, decide, Decision, DecisionParams, ProximityMonitor, Zone};
pub use stream::ActionStream;
