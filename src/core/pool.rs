//! # Worker pool over the shared tokio runtime.
//!
//! Pooled commands are tokio tasks on the runtime that was current at
//! `start()`, bounded by an optional permit semaphore and tracked by a
//! [`TaskTracker`] so `stop()` can drain them with a bounded wait.
//!
//! ## Submission
//! ```text
//! submit(cmd)
//!   ├─ pool closed                      → Err(cmd)   (caller runs it)
//!   ├─ permit available                 → spawn
//!   └─ saturated
//!        ├─ fair_threading = false      → Err(cmd)   (caller runs it)
//!        ├─ submitter is a pooled task  → Err(cmd)   (caller runs it)
//!        └─ fair_threading = true       → wait for permit (FIFO, ≤ fair_handoff_wait)
//!             ├─ permit                 → spawn
//!             └─ timeout / pool closed  → Err(cmd)   (caller runs it)
//! ```
//!
//! ## Rules
//! - A rejected command is handed back, never dropped
//! - A pooled task never waits for a permit: it may hold the last one
//! - `queued` counts submitters waiting for a permit; `active` counts spawned,
//!   unfinished commands; both are visible before `submit` returns
//! - Panics are caught and logged

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::core::EventConfig;
use crate::error::panic_message;
use crate::events::Command;

tokio::task_local! {
    static POOLED: ();
}

fn in_pooled_task() -> bool {
    POOLED.try_with(|_| ()).is_ok()
}

/// FIFO permit wait bounded by `wait`; `None` on timeout or close.
async fn wait_for_permit(permits: &Arc<Semaphore>, wait: Duration) -> Option<OwnedSemaphorePermit> {
    match time::timeout(wait, Arc::clone(permits).acquire_owned()).await {
        Ok(Ok(permit)) => Some(permit),
        Ok(Err(_closed)) => None,
        Err(_elapsed) => {
            debug!(?wait, "fair handoff timed out; running on caller");
            None
        }
    }
}

/// Counter held up for as long as the gauge is alive.
pub(crate) struct Gauge(Arc<AtomicUsize>);

impl Gauge {
    pub(crate) fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for Gauge {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bounded task pool with caller-runs rejection.
pub(crate) struct WorkerPool {
    handle: Handle,
    permits: Option<Arc<Semaphore>>,
    handoff: Option<Duration>,
    tracker: TaskTracker,
    closed: AtomicBool,
    queued: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub(crate) fn new(cfg: &EventConfig, handle: Handle) -> Self {
        Self {
            handle,
            permits: cfg.worker_limit().map(Semaphore::new).map(Arc::new),
            handoff: cfg.fair_handoff(),
            tracker: TaskTracker::new(),
            closed: AtomicBool::new(false),
            queued: Arc::new(AtomicUsize::new(0)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Schedules `task`; hands it back if the pool rejects it.
    pub(crate) async fn submit(&self, task: Command) -> Result<(), Command> {
        if self.closed.load(Ordering::Acquire) {
            return Err(task);
        }

        let (permit, waiting) = match &self.permits {
            None => (None, None),
            Some(permits) => match Arc::clone(permits).try_acquire_owned() {
                Ok(permit) => (Some(permit), None),
                Err(TryAcquireError::NoPermits) => match self.handoff {
                    Some(wait) if !in_pooled_task() => {
                        let waiting = Gauge::enter(&self.queued);
                        match wait_for_permit(permits, wait).await {
                            Some(permit) => (Some(permit), Some(waiting)),
                            None => return Err(task),
                        }
                    }
                    _ => return Err(task),
                },
                Err(TryAcquireError::Closed) => return Err(task),
            },
        };

        let active = Gauge::enter(&self.active);
        drop(waiting);

        self.tracker.spawn_on(
            POOLED.scope((), async move {
                let _permit = permit;
                let _active = active;
                if let Err(panic) = AssertUnwindSafe(task).catch_unwind().await {
                    error!(panic = %panic_message(panic.as_ref()), "pooled command panicked");
                }
            }),
            &self.handle,
        );
        Ok(())
    }

    /// Spawns a coordination lane drain; lanes do not consume worker permits.
    pub(crate) fn spawn_coordinator(&self, drain: Command) {
        self.tracker.spawn_on(drain, &self.handle);
    }

    pub(crate) fn queued(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.queued() == 0 && self.active() == 0
    }

    /// Stops accepting work and waits up to `grace` for tracked tasks.
    ///
    /// Returns the number of commands still active when the grace ran out.
    pub(crate) async fn shutdown(&self, grace: Duration) -> Result<(), usize> {
        self.closed.store(true, Ordering::Release);
        if let Some(permits) = &self.permits {
            permits.close();
        }
        self.tracker.close();

        match time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => Ok(()),
            Err(_) => Err(self.active()),
        }
    }
}
