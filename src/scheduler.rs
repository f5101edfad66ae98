//! Sampler/scheduler
//!
//! Drives periodic sampling at the profile's interval and owns the
//! start/stop lifecycle.
//!
//! ## Message Flow
//!
//! ```text
//! start() ── immediate first cycle ──► spawn worker
//!                                          │
//! Timer tick → sample → evaluate → report  │ (single task, cycles run inline)
//!     ↑                                    │
//!     └── stop() signal (bounded channel, never blocks the caller)
//! ```
//!
//! ## Guarantees
//!
//! - At most one cycle in flight: cycles run inline in the single worker
//!   loop, so the next tick cannot fire while one is still executing.
//! - Ticks that fire during a slow cycle are coalesced, not queued
//!   (`MissedTickBehavior::Skip`); no backlog accumulates.
//! - The tick schedule is anchored to absolute deadlines (`interval_at`), so
//!   slow cycles do not shift subsequent deadlines cumulatively.
//! - `stop()` signals cancellation and returns; the in-flight cycle
//!   completes, observable through [`Scheduler::drained`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, instrument, warn};

use crate::config::Profile;
use crate::evaluator::AlertEvaluator;
use crate::reporter::Reporter;
use crate::sources::MetricsSource;

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPED: u8 = 2;

/// Lifecycle state of a [`Scheduler`].
///
/// `Stopped` is terminal: a new scheduler instance is required to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// Lifecycle misuse, returned to the caller rather than panicking
#[derive(Debug, PartialEq, Eq)]
pub enum SchedulerError {
    /// `start()` was called while the scheduler is already running
    AlreadyRunning,

    /// `start()` was called on a stopped scheduler
    Terminated,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::AlreadyRunning => write!(f, "scheduler is already running"),
            SchedulerError::Terminated => {
                write!(f, "scheduler has been stopped and cannot be restarted")
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

/// Cloneable handle for stopping a scheduler from any execution context.
#[derive(Clone)]
pub struct StopHandle {
    state: Arc<AtomicU8>,
    shutdown_tx: mpsc::Sender<()>,
}

impl StopHandle {
    /// Signal cancellation. Non-blocking and idempotent; any in-flight cycle
    /// is allowed to complete.
    pub fn stop(&self) {
        // A scheduler stopped before it ever started skips straight to the
        // terminal state.
        let _ = self
            .state
            .compare_exchange(IDLE, STOPPED, Ordering::SeqCst, Ordering::SeqCst);
        let _ = self.shutdown_tx.try_send(());
    }
}

/// Periodic sampler over one profile and one metrics source.
pub struct Scheduler {
    profile: Profile,
    source: Arc<dyn MetricsSource>,
    reporter: Arc<Reporter>,
    state: Arc<AtomicU8>,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: Option<mpsc::Receiver<()>>,
    drained_tx: Option<watch::Sender<bool>>,
    drained_rx: watch::Receiver<bool>,
    worker_spawned: bool,
}

impl Scheduler {
    pub fn new(profile: Profile, source: Arc<dyn MetricsSource>, reporter: Arc<Reporter>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (drained_tx, drained_rx) = watch::channel(false);

        Self {
            profile,
            source,
            reporter,
            state: Arc::new(AtomicU8::new(IDLE)),
            shutdown_tx,
            shutdown_rx: Some(shutdown_rx),
            drained_tx: Some(drained_tx),
            drained_rx,
            worker_spawned: false,
        }
    }

    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::SeqCst) {
            IDLE => SchedulerState::Idle,
            RUNNING => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// Take one sample immediately, then begin periodic sampling.
    ///
    /// The first cycle completes before this method returns; subsequent
    /// cycles run on the worker task at the profile's interval.
    pub async fn start(&mut self) -> Result<(), SchedulerError> {
        match self
            .state
            .compare_exchange(IDLE, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
        {
            Ok(_) => {}
            Err(RUNNING) => return Err(SchedulerError::AlreadyRunning),
            Err(_) => return Err(SchedulerError::Terminated),
        }

        let (Some(shutdown_rx), Some(drained_tx)) =
            (self.shutdown_rx.take(), self.drained_tx.take())
        else {
            return Err(SchedulerError::Terminated);
        };

        let mut evaluator = AlertEvaluator::new();
        run_cycle(
            &self.profile,
            self.source.as_ref(),
            &self.reporter,
            &mut evaluator,
        )
        .await;

        let worker = SamplerWorker {
            profile: self.profile.clone(),
            source: self.source.clone(),
            reporter: self.reporter.clone(),
            evaluator,
            shutdown_rx,
            state: self.state.clone(),
            drained_tx,
        };

        tokio::spawn(worker.run());
        self.worker_spawned = true;

        Ok(())
    }

    /// Cancel future ticks. Non-blocking, idempotent, safe from any context.
    pub fn stop(&self) {
        self.stop_handle().stop();
    }

    /// A handle for stopping this scheduler from another execution context.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: self.state.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
        }
    }

    /// Resolve once the worker has fully exited (any in-flight cycle done).
    ///
    /// Returns immediately if the scheduler never started.
    pub async fn drained(&self) {
        if !self.worker_spawned {
            return;
        }

        let mut rx = self.drained_rx.clone();
        // Err means the worker dropped its sender after exiting
        let _ = rx.wait_for(|drained| *drained).await;
    }
}

/// One sample → evaluate → report cycle.
///
/// A transient source failure skips the cycle (logged at WARN) and leaves the
/// scheduler running; the source is retried on the next tick.
async fn run_cycle(
    profile: &Profile,
    source: &dyn MetricsSource,
    reporter: &Reporter,
    evaluator: &mut AlertEvaluator,
) {
    let sample = match source.sample().await {
        Ok(sample) => sample,
        Err(e) => {
            warn!("skipping cycle, source {} failed: {e}", source.name());
            return;
        }
    };

    let (status, event) = evaluator.evaluate(&sample, profile);

    if let Some(event) = &event {
        debug!(
            "status changed to {:?} (previous: {:?})",
            event.status, event.previous
        );
    }

    reporter
        .report(profile, &sample, status, event.as_ref())
        .await;
}

struct SamplerWorker {
    profile: Profile,
    source: Arc<dyn MetricsSource>,
    reporter: Arc<Reporter>,
    evaluator: AlertEvaluator,
    shutdown_rx: mpsc::Receiver<()>,
    state: Arc<AtomicU8>,
    drained_tx: watch::Sender<bool>,
}

impl SamplerWorker {
    /// Run the periodic loop until stopped.
    ///
    /// The loop also exits when every stop handle and the owning scheduler
    /// have been dropped.
    #[instrument(skip(self), fields(profile = %self.profile.name))]
    async fn run(mut self) {
        debug!("starting sampler worker");

        let period = self.profile.interval();
        // The immediate first sample already ran; the first tick is one full
        // period out.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.recv() => {
                    debug!("received stop signal");
                    break;
                }

                _ = ticker.tick() => {
                    run_cycle(
                        &self.profile,
                        self.source.as_ref(),
                        &self.reporter,
                        &mut self.evaluator,
                    )
                    .await;
                }
            }
        }

        self.state.store(STOPPED, Ordering::SeqCst);
        let _ = self.drained_tx.send(true);

        debug!("sampler worker stopped");
    }
}
