//! # Event dispatch configuration.
//!
//! Provides [`EventConfig`], centralized settings for the executor and manager.
//! Loading the values (files, env, system properties) is up to the host; this
//! module only defines the shape and the defaults.
//!
//! ## Sentinel values
//! - `max_workers = 0` → unbounded worker pool (no permit semaphore)
//! - `affinity_timeout = 0s` → rounds never wait (ordering effectively off per key)
//! - `affinity_cache_size = 0` → clamped to 1
//! - `fair_handoff_wait = 0s` → fair mode never queues (caller-runs)

use std::num::NonZeroUsize;
use std::time::Duration;

/// Configuration for the event executor and manager.
///
/// ## Field semantics
/// - `affinity_enabled`: order async deliveries per affinity key
/// - `affinity_cache_size`: max number of live barriers (LRU-evicted beyond it)
/// - `affinity_timeout`: max wait of a round on its predecessor's deliveries
/// - `single_coordinator`: one global lane coordinates all rounds instead of one lane per key
/// - `fair_threading`: saturated pool hands off in FIFO order before falling back to the caller
/// - `fair_handoff_wait`: max time a fair submitter queues for a permit
/// - `max_workers`: worker pool permit count (`0` = unbounded)
/// - `shutdown_grace`: bounded wait for in-flight work on stop
#[derive(Clone, Debug)]
pub struct EventConfig {
    /// Whether events declaring an affinity key get per-key FIFO delivery.
    pub affinity_enabled: bool,

    /// Maximum number of cached per-key barriers.
    ///
    /// Evicting a barrier only resets that key's ordering window.
    pub affinity_cache_size: usize,

    /// How long a round waits for its predecessor's deliveries before bumping them.
    ///
    /// - `Duration::ZERO` = never wait
    pub affinity_timeout: Duration,

    /// Route every round through one coordination lane.
    ///
    /// Delivery stays pool-parallel; only the submission of rounds is serialized,
    /// so a stalled key delays every other key's rounds.
    pub single_coordinator: bool,

    /// FIFO handoff when the pool is saturated.
    ///
    /// - `false`: the submitter runs the task itself (caller-runs)
    /// - `true`: the submitter queues for a permit in arrival order, for at most
    ///   `fair_handoff_wait`, then runs the task itself. Submitters that are
    ///   themselves pooled tasks never queue.
    pub fair_threading: bool,

    /// Upper bound on a fair submitter's wait for a permit.
    ///
    /// - `Duration::ZERO` = never queue
    pub fair_handoff_wait: Duration,

    /// Maximum number of concurrently running pooled tasks.
    ///
    /// - `0` = unbounded
    pub max_workers: usize,

    /// Maximum time `stop()` waits for pooled work to finish.
    pub shutdown_grace: Duration,
}

impl EventConfig {
    /// Returns the worker bound as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` pooled tasks run at once
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.max_workers == 0 {
            None
        } else {
            Some(self.max_workers)
        }
    }

    /// Returns the barrier cache capacity clamped to a minimum of 1.
    #[inline]
    pub fn cache_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.affinity_cache_size).unwrap_or(NonZeroUsize::MIN)
    }

    /// Returns the round wait bound as an `Option`.
    ///
    /// - `None` → rounds never wait
    /// - `Some(d)` → bounded wait per round
    #[inline]
    pub fn affinity_wait(&self) -> Option<Duration> {
        if self.affinity_timeout == Duration::ZERO {
            None
        } else {
            Some(self.affinity_timeout)
        }
    }

    /// Returns how long a saturated submitter may queue for a permit.
    ///
    /// - `None` → caller-runs immediately (fair mode off, or zero handoff wait)
    /// - `Some(d)` → FIFO wait of at most `d`, then caller-runs
    #[inline]
    pub fn fair_handoff(&self) -> Option<Duration> {
        if self.fair_threading && !self.fair_handoff_wait.is_zero() {
            Some(self.fair_handoff_wait)
        } else {
            None
        }
    }
}

impl Default for EventConfig {
    /// Default configuration:
    ///
    /// - `affinity_enabled = true`
    /// - `affinity_cache_size = 1000`
    /// - `affinity_timeout = 1s`
    /// - `single_coordinator = false` (per-key lanes)
    /// - `fair_threading = false` (caller-runs on saturation)
    /// - `fair_handoff_wait = 100ms`
    /// - `max_workers = 500`
    /// - `shutdown_grace = 10s`
    fn default() -> Self {
        Self {
            affinity_enabled: true,
            affinity_cache_size: 1000,
            affinity_timeout: Duration::from_secs(1),
            single_coordinator: false,
            fair_threading: false,
            fair_handoff_wait: Duration::from_millis(100),
            max_workers: 500,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}
