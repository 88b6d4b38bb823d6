//! Scheduler - the single writer of the snapshot store
//!
//! ## Message Flow
//!
//! ```text
//! Timer tick → sample source → compute → evaluate → store.write → publish alerts
//!     ↑
//!     └─── Commands (TickNow, UpdateInterval, Shutdown)
//! ```
//!
//! Ticks run inside the actor loop, so two ticks can never overlap. A tick
//! that is due while another one is still running is delayed until the loop
//! gets back to the timer. Stopping goes through the same loop, which means
//! the in-flight tick always finishes before the scheduler acknowledges the
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::{
    HealthError, HealthResult, RawCounters, Snapshot,
    alerts::AlertSink,
    config::validate_interval,
    monitors::{sample::compute, thresholds::{ThresholdHandle, evaluate}},
    sources::MetricSource,
    store::StatsStore,
};

use super::messages::{SchedulerCommand, SchedulerState, TickOutcome};

pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(5000);
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_millis(2000);

/// Timer settings of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Time between two ticks
    pub interval: Duration,

    /// Upper bound for a single source read
    pub source_timeout: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            source_timeout: DEFAULT_SOURCE_TIMEOUT,
        }
    }
}

/// Publishes `Idle` once the actor is gone, however it exits (panics
/// included).
struct IdleOnExit(watch::Sender<SchedulerState>);

impl IdleOnExit {
    fn idle(&self) {
        self.0.send_replace(SchedulerState::Idle);
    }
}

impl Drop for IdleOnExit {
    fn drop(&mut self) {
        self.idle();
    }
}

/// Actor driving the sampling pipeline
pub struct Scheduler {
    source: Box<dyn MetricSource>,

    store: StatsStore,

    thresholds: ThresholdHandle,

    sink: Arc<dyn AlertSink>,

    /// Counters of the last successful tick, the baseline for deltas
    previous: Option<RawCounters>,

    command_rx: mpsc::Receiver<SchedulerCommand>,

    state: IdleOnExit,

    timing: Timing,

    /// Number of successful ticks so far
    tick: u64,

    /// Set while the source keeps failing, so the failure is logged once
    source_failing: bool,
}

impl Scheduler {
    pub fn new(
        source: Box<dyn MetricSource>,
        store: StatsStore,
        thresholds: ThresholdHandle,
        sink: Arc<dyn AlertSink>,
        timing: Timing,
        command_rx: mpsc::Receiver<SchedulerCommand>,
        state_tx: watch::Sender<SchedulerState>,
    ) -> Self {
        Self {
            source,
            store,
            thresholds,
            sink,
            previous: None,
            command_rx,
            state: IdleOnExit(state_tx),
            timing,
            tick: 0,
            source_failing: false,
        }
    }

    fn arm(period: Duration) -> Interval {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// Run the actor's main loop until a Shutdown command arrives or the
    /// command channel is closed.
    #[instrument(skip(self), fields(source = %self.source.name()))]
    pub async fn run(mut self) {
        debug!("starting scheduler with interval {:?}", self.timing.interval);

        let mut ticker = Self::arm(self.timing.interval);
        let mut shutdown_ack = None;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // failures are logged inside fire(); the timer stays armed
                    let _ = self.fire().await;
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::TickNow { respond_to }) => {
                            debug!("received TickNow command");
                            let result = self.fire().await;
                            let _ = respond_to.send(result);
                        }

                        Some(SchedulerCommand::UpdateInterval { interval }) => {
                            debug!("updating interval to {interval:?}");
                            self.timing.interval = interval;
                            ticker = Self::arm(interval);
                        }

                        Some(SchedulerCommand::Shutdown { respond_to }) => {
                            debug!("received shutdown command");
                            shutdown_ack = Some(respond_to);
                            break;
                        }

                        None => {
                            warn!("command channel closed, shutting down");
                            break;
                        }
                    }
                }
            }
        }

        self.state.idle();
        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }

        debug!("scheduler stopped after {} successful ticks", self.tick);
    }

    /// One pass of the pipeline.
    ///
    /// A source failure skips the write entirely: readers keep seeing the
    /// last good snapshot and the delta baseline stays untouched.
    async fn fire(&mut self) -> HealthResult<TickOutcome> {
        let source_timeout = self.timing.source_timeout;
        let counters = match timeout(source_timeout, self.source.sample()).await {
            Ok(Ok(counters)) => counters,
            Ok(Err(e)) => return Err(self.source_failed(e)),
            Err(_) => {
                let err = HealthError::source_unavailable(
                    self.source.name(),
                    format!("no response within {source_timeout:?}"),
                );
                return Err(self.source_failed(err));
            }
        };

        if self.source_failing {
            info!("metric source '{}' recovered", self.source.name());
            self.source_failing = false;
        }

        let sample = compute(&counters, self.previous.as_ref());
        self.previous = Some(counters);

        let thresholds = self.thresholds.current().await;
        let now = Utc::now();
        let alerts = evaluate(&sample, &thresholds, now);

        self.tick += 1;
        let snapshot = Snapshot {
            sample,
            thresholds,
            taken_at: now,
            tick: self.tick,
        };
        self.store.write(snapshot).await;

        trace!("tick {} stored, {} alerts", self.tick, alerts.len());
        self.sink.publish(&alerts);

        Ok(TickOutcome { snapshot, alerts })
    }

    fn source_failed(&mut self, err: HealthError) -> HealthError {
        if self.source_failing {
            debug!("source still unavailable: {err}");
        } else {
            warn!("skipping tick: {err}");
            self.source_failing = true;
        }
        err
    }
}

/// Handle for controlling the scheduler
///
/// Cheap to clone; all clones talk to the same actor.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    sender: mpsc::Sender<SchedulerCommand>,

    state: watch::Receiver<SchedulerState>,

    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SchedulerHandle {
    /// Spawn the scheduler and arm its first tick at `now + interval`.
    pub fn spawn(
        source: Box<dyn MetricSource>,
        store: StatsStore,
        thresholds: ThresholdHandle,
        sink: Arc<dyn AlertSink>,
        timing: Timing,
    ) -> HealthResult<Self> {
        validate_interval(timing.interval)?;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(SchedulerState::Armed);

        let actor = Scheduler::new(source, store, thresholds, sink, timing, cmd_rx, state_tx);
        let task = tokio::spawn(actor.run());

        Ok(Self {
            sender: cmd_tx,
            state: state_rx,
            task: Arc::new(Mutex::new(Some(task))),
        })
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Run a tick right now and return its outcome
    pub async fn tick_now(&self) -> HealthResult<TickOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SchedulerCommand::TickNow { respond_to: tx })
            .await
            .map_err(|_| HealthError::SchedulerStopped)?;

        rx.await.map_err(|_| HealthError::SchedulerStopped)?
    }

    /// Change the tick interval; the timer is re-armed from now
    pub async fn update_interval(&self, interval: Duration) -> HealthResult<()> {
        let interval = validate_interval(interval)?;
        self.sender
            .send(SchedulerCommand::UpdateInterval { interval })
            .await
            .map_err(|_| HealthError::SchedulerStopped)
    }

    /// Stop the scheduler.
    ///
    /// Returns once the in-flight tick (if any) has completed and the actor
    /// task has exited. No tick runs after this returns. Calling it again is
    /// a no-op.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };

        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(SchedulerCommand::Shutdown { respond_to: tx })
            .await
            .is_ok()
        {
            let _ = rx.await;
        }

        if let Err(e) = handle.await {
            error!("scheduler task failed: {e}");
        }
    }
}
