//! # Coordination lane: a sequential executor over the shared runtime.
//!
//! A [`Lane`] runs the jobs pushed to it strictly one at a time, in push order,
//! without owning a thread or a long-lived task. When a job is pushed onto an
//! idle lane, [`Lane::push`] hands back a drain future; the caller spawns it on
//! the worker runtime and it runs until the queue is empty.
//!
//! ```text
//! push(j1) ─► idle? ─yes─► drain future ─► spawn ─► j1 ─► j2 ─► j3 ─► (empty → idle)
//! push(j2) ─► busy, queued ────────────────────────────┘      │
//! push(j3) ─► busy, queued ───────────────────────────────────┘
//! ```
//!
//! One lane per affinity key keeps distinct keys independent; a single shared
//! lane serializes every round (single-coordinator mode).

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use tracing::error;

use crate::error::panic_message;
use crate::events::Command;

#[derive(Default)]
struct LaneQueue {
    jobs: VecDeque<Command>,
    draining: bool,
}

/// Sequential job queue drained by at most one task at a time.
#[derive(Default)]
pub(crate) struct Lane {
    queue: Mutex<LaneQueue>,
}

impl Lane {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Enqueues `job`; returns the drain future to spawn if the lane was idle.
    #[must_use]
    pub(crate) fn push(self: &Arc<Self>, job: Command) -> Option<Command> {
        let start = {
            let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
            queue.jobs.push_back(job);
            !std::mem::replace(&mut queue.draining, true)
        };

        if start {
            let lane = Arc::clone(self);
            Some(Box::pin(async move { lane.drain().await }))
        } else {
            None
        }
    }

    async fn drain(&self) {
        loop {
            let job = {
                let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
                match queue.jobs.pop_front() {
                    Some(job) => job,
                    None => {
                        queue.draining = false;
                        return;
                    }
                }
            };

            if let Err(panic) = std::panic::AssertUnwindSafe(job).catch_unwind().await {
                error!(panic = %panic_message(panic.as_ref()), "coordination job panicked");
            }
        }
    }
}
