use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::error::MonitorError;

use super::actions::EmittedAction;

/// Receiving end of a monitoring session's emitted actions.
///
/// The stream disconnects once the session worker has exited and every
/// buffered action has been received.
#[derive(Debug)]
pub struct ActionStream {
    rx: Receiver<EmittedAction>,
}

impl ActionStream {
    pub(crate) fn new(rx: Receiver<EmittedAction>) -> Self {
        Self { rx }
    }

    /// Receive the next action (blocking).
    pub fn recv(&self) -> Result<EmittedAction, MonitorError> {
        self.rx.recv().map_err(|_| MonitorError::Disconnected {
            path: "action_stream".to_string(),
        })
    }

    /// Receive the next action with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<EmittedAction, MonitorError> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => MonitorError::Timeout {
                duration_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            },
            RecvTimeoutError::Disconnected => MonitorError::Disconnected {
                path: "action_stream".to_string(),
            },
        })
    }

    /// Receive an action if one is buffered.
    pub fn try_recv(&self) -> Option<EmittedAction> {
        match self.rx.try_recv() {
            Ok(a) => Some(a),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Drain every buffered action without blocking.
    pub fn drain(&self) -> Vec<EmittedAction> {
        self.rx.try_iter().collect()
    }

    /// Iterate until the session ends.
    pub fn iter(&self) -> impl Iterator<Item = EmittedAction> + '_ {
        self.rx.iter()
    }
}
