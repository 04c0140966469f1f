//! # Generational affinity barrier.
//!
//! One [`AffinityBarrier`] exists per affinity key. It serializes posting
//! rounds for that key and bounds how long a round can be held back by the
//! async deliveries of the round before it.
//!
//! ## Generations
//! ```text
//! cycle:      -1          0           1           2
//! round:      R1 ───────► R2 ───────► R3 ───────► R4
//!              │ registers │ arrives   │ arrives
//!              ▼           ▼           ▼
//! phase 0:  [slot, d1a, d1b]          (R2 waits until phase 0 completes)
//! phase 1:              [slot, d2a]   (R3 waits until phase 1 completes)
//! ```
//!
//! - Every phase starts with one party: the posting slot of the next round.
//! - Deliveries scheduled by a round register as parties of the current phase.
//! - Round `c` arrives for the slot of phase `c`, then waits for `phase > c`.
//! - When the last party of a phase arrives, the phase advances.
//!
//! ## Rules
//! - **Bounded wait**: a round waits at most `timeout` per phase; then all parties
//!   still outstanding are force-arrived ("bumped") and the phase advances.
//! - **Bumping is bookkeeping only**: bumped deliveries keep running. Their late
//!   arrival targets an older phase and is ignored.
//! - **Cancellation**: a cancelled wait is abandoned (warned), never retried.
//! - **No timeout** (`None`): rounds never wait.
//! - **One waiter**: `await_turn` must only be called from the key's lane.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use tokio::{select, sync::watch, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::events::Command;

use super::lane::Lane;

/// Phase bookkeeping guarded by the watch channel's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Generation {
    phase: i64,
    outstanding: usize,
}

impl Generation {
    fn advance(&mut self) {
        self.phase += 1;
        self.outstanding = 1;
    }
}

enum Wait {
    Advanced,
    TimedOut,
    Cancelled,
}

/// Per-key synchronization primitive for ordered async delivery.
pub struct AffinityBarrier {
    key: String,
    timeout: Option<Duration>,
    generation: watch::Sender<Generation>,
    cycles: AtomicI64,
    bumped: AtomicU64,
    lane: Arc<Lane>,
}

impl AffinityBarrier {
    /// Creates a barrier for `key` whose rounds wait at most `timeout` per phase.
    ///
    /// With `None` rounds never wait.
    pub fn new(key: impl Into<String>, timeout: Option<Duration>) -> Self {
        let (generation, _) = watch::channel(Generation {
            phase: 0,
            outstanding: 1,
        });
        Self {
            key: key.into(),
            timeout,
            generation,
            cycles: AtomicI64::new(-1),
            bumped: AtomicU64::new(0),
            lane: Arc::new(Lane::new()),
        }
    }

    /// The affinity key this barrier orders.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current generation number.
    pub fn phase(&self) -> i64 {
        self.generation.borrow().phase
    }

    /// Parties of the current phase that have not arrived yet (slot included).
    pub fn outstanding(&self) -> usize {
        self.generation.borrow().outstanding
    }

    /// Total number of parties force-arrived after timeouts.
    pub fn bumped_parties(&self) -> u64 {
        self.bumped.load(Ordering::Relaxed)
    }

    /// Coordination lane through which this key's rounds run one at a time.
    pub(crate) fn lane(&self) -> &Arc<Lane> {
        &self.lane
    }

    /// Waits until the previous round's deliveries have all arrived, or the
    /// timeout forces them through.
    ///
    /// Called once per round, from the key's lane, before the round's command.
    pub async fn await_turn(&self, cancel: &CancellationToken) {
        let Some(timeout) = self.timeout else {
            return;
        };

        let cycle = self.cycles.fetch_add(1, Ordering::AcqRel);
        let mut rx = self.generation.subscribe();

        loop {
            let phase = self.phase();
            if cycle < phase {
                return;
            }
            if cycle == phase {
                self.arrive(phase);
            }

            let wait = select! {
                biased;
                _ = cancel.cancelled() => Wait::Cancelled,
                res = time::timeout(timeout, rx.wait_for(|g| g.phase > cycle)) => match res {
                    Ok(Ok(_)) => Wait::Advanced,
                    Ok(Err(_)) => Wait::Cancelled,
                    Err(_) => Wait::TimedOut,
                },
            };

            match wait {
                Wait::Advanced => {}
                Wait::TimedOut => self.bump(cycle),
                Wait::Cancelled => {
                    warn!(key = %self.key, cycle, "affinity wait abandoned; delivering unordered");
                    return;
                }
            }
        }
    }

    /// Registers `task` as a party of the current phase.
    ///
    /// The returned command arrives exactly once when it completes, fails,
    /// panics or is dropped.
    pub fn track_delivery(self: &Arc<Self>, task: Command) -> Command {
        let arrival = Arrival {
            phase: self.register(),
            barrier: Arc::clone(self),
        };
        Box::pin(async move {
            let _arrival = arrival;
            task.await;
        })
    }

    fn register(&self) -> i64 {
        let mut phase = 0;
        self.generation.send_if_modified(|g| {
            g.outstanding += 1;
            phase = g.phase;
            // Registration never completes a phase; nobody needs waking.
            false
        });
        phase
    }

    fn arrive(&self, phase: i64) {
        self.generation.send_if_modified(|g| {
            if g.phase != phase || g.outstanding == 0 {
                return false;
            }
            g.outstanding -= 1;
            if g.outstanding == 0 {
                g.advance();
                true
            } else {
                false
            }
        });
    }

    /// Force-arrives every outstanding party of the phase `cycle` is stuck on.
    fn bump(&self, cycle: i64) {
        let mut bumped = 0;
        let mut phase = 0;
        self.generation.send_if_modified(|g| {
            if g.phase > cycle {
                return false;
            }
            bumped = g.outstanding;
            phase = g.phase;
            g.advance();
            true
        });

        if bumped > 0 {
            self.bumped.fetch_add(bumped as u64, Ordering::Relaxed);
            debug!(key = %self.key, phase, bumped, "affinity wait timed out; bumped outstanding parties");
        }
    }
}

impl fmt::Debug for AffinityBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = *self.generation.borrow();
        f.debug_struct("AffinityBarrier")
            .field("key", &self.key)
            .field("timeout", &self.timeout)
            .field("phase", &g.phase)
            .field("outstanding", &g.outstanding)
            .field("bumped", &self.bumped_parties())
            .finish()
    }
}

/// Arrives for a tracked delivery when dropped.
struct Arrival {
    barrier: Arc<AffinityBarrier>,
    phase: i64,
}

impl Drop for Arrival {
    fn drop(&mut self) {
        self.barrier.arrive(self.phase);
    }
}
