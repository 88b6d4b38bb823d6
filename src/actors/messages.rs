//! Message types for communicating with the scheduler actor
//!
//! Commands travel over an mpsc channel; answers come back on oneshot
//! channels embedded in the command.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::{HealthResult, Snapshot, monitors::thresholds::AlertEvent};

/// Commands that can be sent to the scheduler
#[derive(Debug)]
pub enum SchedulerCommand {
    /// Run a tick immediately (bypassing the interval timer)
    ///
    /// Used for testing and manual refresh operations.
    TickNow {
        respond_to: oneshot::Sender<HealthResult<TickOutcome>>,
    },

    /// Re-arm the timer with a new interval
    UpdateInterval { interval: Duration },

    /// Stop the scheduler
    ///
    /// The in-flight tick (if any) completes before the acknowledgement is
    /// sent.
    Shutdown { respond_to: oneshot::Sender<()> },
}

/// Whether a tick is pending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// No tick scheduled (stopped)
    Idle,
    /// The next tick is pending
    Armed,
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchedulerState::Idle => write!(f, "idle"),
            SchedulerState::Armed => write!(f, "armed"),
        }
    }
}

/// Result of a successful tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// The snapshot that was written to the store
    pub snapshot: Snapshot,

    /// Alerts produced by this tick (already published)
    pub alerts: Vec<AlertEvent>,
}
