//! # EventExecutor: direct vs pooled dispatch with per-key ordering.
//!
//! The executor starts in **direct** mode: every command runs inline on the
//! caller. `start()` builds the worker pool and switches to **async** mode;
//! `stop()` switches back to direct *before* draining the pool, so callers
//! arriving during shutdown run inline instead of landing on a dying pool.
//!
//! ## Async mode wiring
//! ```text
//! execute_with_affinity(key, ctx, post)
//!     │
//!     ├─► cache.get(key) ─► barrier
//!     ├─► lane = single coordinator lane | barrier.lane()
//!     └─► lane.push(round) ──► (drain spawned on the runtime if lane was idle)
//!                                 │
//!                          round: ├─► barrier.await_turn()      (bounded by affinity_timeout)
//!                                 └─► post(ctx + barrier)
//!                                         │
//!                                         └─► execute(ctx, delivery)   (per async subscriber)
//!                                                ├─► barrier.track_delivery(delivery)
//!                                                └─► pool.submit(...) ─rejected─► run inline
//! ```
//!
//! ## Rules
//! - **Register before next wait**: a lane runs one round at a time and a round
//!   registers all its deliveries before it returns, so the next round of the
//!   key never starts waiting on an undercounted phase.
//! - **Replication flag**: every scheduled command runs under the flag captured
//!   in its [`DispatchContext`].
//! - **Nothing is dropped**: rejected commands run on the caller.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use eventvisor::{DispatchContext, EventConfig, EventExecutor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), eventvisor::EventError> {
//! let executor = Arc::new(EventExecutor::new(EventConfig::default()));
//! executor.start()?;
//!
//! let inner = Arc::clone(&executor);
//! executor
//!     .execute_with_affinity("maven-releases", DispatchContext::capture(), move |ctx| {
//!         Box::pin(async move {
//!             inner.execute(&ctx, Box::pin(async { /* deliver */ })).await;
//!         })
//!     })
//!     .await;
//!
//! while !executor.is_calm_period() {
//!     tokio::task::yield_now().await;
//! }
//! executor.stop().await
//! # }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::affinity::{AffinityBarrier, AffinityBarrierCache, Lane};
use crate::core::context::DispatchContext;
use crate::core::pool::{Gauge, WorkerPool};
use crate::core::EventConfig;
use crate::error::EventError;
use crate::events::{Command, ReplicationContext};

/// Machinery that only exists while the executor is async.
struct Dispatch {
    pool: WorkerPool,
    coordinator: Option<Arc<Lane>>,
    cancel: CancellationToken,
}

enum Mode {
    Direct,
    Async(Arc<Dispatch>),
}

/// Point-in-time view of executor load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Whether the executor is in async mode.
    pub asynchronous: bool,
    /// Rounds pushed to a lane and not finished.
    pub coordinating: usize,
    /// Submitters waiting for a worker permit.
    pub queued: usize,
    /// Pooled commands spawned and not finished.
    pub active: usize,
    /// Live cached barriers.
    pub barriers: usize,
}

/// Mode-switching dispatcher owning the barrier cache and the worker pool.
pub struct EventExecutor {
    cfg: EventConfig,
    barriers: Option<AffinityBarrierCache>,
    mode: RwLock<Mode>,
    coordinating: Arc<AtomicUsize>,
}

impl EventExecutor {
    /// Creates an executor in direct mode.
    pub fn new(cfg: EventConfig) -> Self {
        let barriers = cfg
            .affinity_enabled
            .then(|| AffinityBarrierCache::new(cfg.cache_capacity(), cfg.affinity_wait()));
        Self {
            cfg,
            barriers,
            mode: RwLock::new(Mode::Direct),
            coordinating: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Configuration this executor was built with.
    pub fn config(&self) -> &EventConfig {
        &self.cfg
    }

    /// Whether per-key ordering is active.
    pub fn is_affinity_enabled(&self) -> bool {
        self.barriers.is_some()
    }

    /// Whether commands are currently scheduled onto the pool.
    pub fn is_async(&self) -> bool {
        self.dispatch().is_some()
    }

    /// Switches to async mode on the current tokio runtime.
    pub fn start(&self) -> Result<(), EventError> {
        let handle = Handle::try_current().map_err(|_| EventError::NoRuntime)?;

        let mut mode = self.mode.write().unwrap_or_else(PoisonError::into_inner);
        if matches!(*mode, Mode::Async(_)) {
            return Err(EventError::AlreadyStarted);
        }

        let dispatch = Dispatch {
            pool: WorkerPool::new(&self.cfg, handle),
            coordinator: self.cfg.single_coordinator.then(|| Arc::new(Lane::new())),
            cancel: CancellationToken::new(),
        };
        *mode = Mode::Async(Arc::new(dispatch));

        info!(
            affinity = self.is_affinity_enabled(),
            single_coordinator = self.cfg.single_coordinator,
            max_workers = self.cfg.max_workers,
            "event dispatch switched to async"
        );
        Ok(())
    }

    /// Switches back to direct mode, then drains the pool within `shutdown_grace`.
    ///
    /// The mode switch happens first and is not undone by a drain timeout.
    pub async fn stop(&self) -> Result<(), EventError> {
        let previous = {
            let mut mode = self.mode.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *mode, Mode::Direct)
        };
        let Mode::Async(dispatch) = previous else {
            return Err(EventError::NotStarted);
        };

        info!("event dispatch switched to direct; draining worker pool");
        dispatch.cancel.cancel();

        let grace = self.cfg.shutdown_grace;
        dispatch.pool.shutdown(grace).await.map_err(|active| {
            let coordinating = self.coordinating.load(Ordering::SeqCst);
            let pending = active + coordinating;
            warn!(?grace, active, coordinating, "worker pool drain timed out; continuing shutdown");
            EventError::DrainExceeded { grace, pending }
        })
    }

    /// Runs `post` under the barrier of `key`.
    ///
    /// In async mode the round is queued on the key's coordination lane and this
    /// returns once it is queued; in direct mode `post` runs inline.
    pub async fn execute_with_affinity<F>(&self, key: &str, ctx: DispatchContext, post: F)
    where
        F: FnOnce(DispatchContext) -> Command + Send + 'static,
    {
        let Some(barriers) = &self.barriers else {
            warn!(key, "affinity requested while disabled; delivering unordered");
            return post(ctx).await;
        };
        let Some(dispatch) = self.dispatch() else {
            return post(ctx).await;
        };

        let barrier = barriers.get(key);
        let lane = match &dispatch.coordinator {
            Some(single) => Arc::clone(single),
            None => Arc::clone(barrier.lane()),
        };
        let cancel = dispatch.cancel.clone();
        let coordinating = Gauge::enter(&self.coordinating);
        let replicating = ctx.replicating();

        let round = async move {
            let _coordinating = coordinating;
            barrier.await_turn(&cancel).await;
            post(ctx.with_barrier(barrier)).await;
        };

        if let Some(drain) = lane.push(Box::pin(ReplicationContext::scope(replicating, round))) {
            dispatch.pool.spawn_coordinator(drain);
        }
    }

    /// Schedules one command, tracked by `ctx`'s barrier if one is bound.
    pub async fn execute(&self, ctx: &DispatchContext, command: Command) {
        let Some(dispatch) = self.dispatch() else {
            return command.await;
        };

        let command = match ctx.barrier() {
            Some(barrier) => barrier.track_delivery(command),
            None => command,
        };
        let command: Command = Box::pin(ReplicationContext::scope(ctx.replicating(), command));

        if let Err(rejected) = dispatch.pool.submit(command).await {
            debug!("worker pool rejected command; running on caller");
            rejected.await;
        }
    }

    /// True if no asynchronous work is queued or running.
    pub fn is_calm_period(&self) -> bool {
        match self.dispatch() {
            None => true,
            Some(dispatch) => {
                self.coordinating.load(Ordering::SeqCst) == 0 && dispatch.pool.is_idle()
            }
        }
    }

    /// Cached barrier for `key`, without creating one.
    pub fn barrier(&self, key: &str) -> Option<Arc<AffinityBarrier>> {
        self.barriers.as_ref()?.peek(key)
    }

    /// Snapshot of current load.
    pub fn stats(&self) -> ExecutorStats {
        let dispatch = self.dispatch();
        ExecutorStats {
            asynchronous: dispatch.is_some(),
            coordinating: self.coordinating.load(Ordering::SeqCst),
            queued: dispatch.as_ref().map_or(0, |d| d.pool.queued()),
            active: dispatch.as_ref().map_or(0, |d| d.pool.active()),
            barriers: self.barriers.as_ref().map_or(0, AffinityBarrierCache::len),
        }
    }

    fn dispatch(&self) -> Option<Arc<Dispatch>> {
        match &*self.mode.read().unwrap_or_else(PoisonError::into_inner) {
            Mode::Direct => None,
            Mode::Async(dispatch) => Some(Arc::clone(dispatch)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::{self, Instant};

    fn executor(cfg: EventConfig) -> Arc<EventExecutor> {
        Arc::new(EventExecutor::new(cfg))
    }

    async fn wait_calm(executor: &EventExecutor) {
        while !executor.is_calm_period() {
            time::sleep(Duration::from_millis(1)).await;
        }
    }

    /// A round that schedules one delivery sleeping `delay_ms`, then logs `id`.
    fn round(
        executor: &Arc<EventExecutor>,
        log: &Arc<Mutex<Vec<u32>>>,
        id: u32,
        delay_ms: u64,
    ) -> impl FnOnce(DispatchContext) -> Command + Send + 'static {
        let executor = Arc::clone(executor);
        let log = Arc::clone(log);
        move |ctx: DispatchContext| -> Command {
            Box::pin(async move {
                let delivery: Command = Box::pin(async move {
                    time::sleep(Duration::from_millis(delay_ms)).await;
                    log.lock().unwrap().push(id);
                });
                executor.execute(&ctx, delivery).await;
            })
        }
    }

    #[test]
    fn start_requires_a_runtime() {
        let executor = EventExecutor::new(EventConfig::default());
        assert!(matches!(executor.start(), Err(EventError::NoRuntime)));
        assert!(!executor.is_async());
    }

    #[tokio::test]
    async fn lifecycle_transitions_once() {
        let executor = executor(EventConfig::default());
        assert!(matches!(executor.stop().await, Err(EventError::NotStarted)));

        executor.start().unwrap();
        assert!(executor.is_async());
        assert!(matches!(executor.start(), Err(EventError::AlreadyStarted)));

        executor.stop().await.unwrap();
        assert!(!executor.is_async());
        assert!(executor.is_calm_period());
    }

    #[tokio::test]
    async fn direct_mode_runs_inline() {
        let executor = executor(EventConfig::default());
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        executor
            .execute(
                &DispatchContext::capture(),
                Box::pin(async move { flag.store(true, Ordering::SeqCst) }),
            )
            .await;
        assert!(ran.load(Ordering::SeqCst));
        assert!(executor.is_calm_period());
    }

    #[tokio::test]
    async fn async_mode_is_busy_until_command_returns() {
        let executor = executor(EventConfig::default());
        executor.start().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        executor
            .execute(
                &DispatchContext::capture(),
                Box::pin(async move {
                    let _ = rx.await;
                }),
            )
            .await;

        assert!(!executor.is_calm_period());
        assert_eq!(executor.stats().active, 1);

        tx.send(()).unwrap();
        wait_calm(&executor).await;
        executor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn pooled_commands_inherit_replication_flag() {
        let executor = executor(EventConfig::default());
        executor.start().unwrap();

        let (tx, rx) = oneshot::channel::<bool>();
        let ctx = ReplicationContext::replicating(async { DispatchContext::capture() }).await;
        executor
            .execute(
                &ctx,
                Box::pin(async move {
                    let _ = tx.send(ReplicationContext::is_replicating());
                }),
            )
            .await;

        assert!(rx.await.unwrap());
        executor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn saturated_pool_runs_on_caller() {
        let executor = executor(EventConfig {
            max_workers: 1,
            ..EventConfig::default()
        });
        executor.start().unwrap();

        let (tx, rx) = oneshot::channel::<()>();
        let ctx = DispatchContext::capture();
        executor
            .execute(
                &ctx,
                Box::pin(async move {
                    let _ = rx.await;
                }),
            )
            .await;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        executor
            .execute(&ctx, Box::pin(async move { flag.store(true, Ordering::SeqCst) }))
            .await;
        assert!(ran.load(Ordering::SeqCst), "rejected command must run before execute returns");

        tx.send(()).unwrap();
        executor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn rounds_for_one_key_deliver_in_order() {
        let executor = executor(EventConfig::default());
        executor.start().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (id, delay) in [(1, 40), (2, 20), (3, 0)] {
            executor
                .execute_with_affinity(
                    "repo-a",
                    DispatchContext::capture(),
                    round(&executor, &log, id, delay),
                )
                .await;
        }

        wait_calm(&executor).await;
        assert_eq!(*log.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(executor.stats().barriers, 1);
        assert_eq!(executor.barrier("repo-a").unwrap().bumped_parties(), 0);
        executor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn single_coordinator_serializes_keys() {
        let executor = executor(EventConfig {
            single_coordinator: true,
            affinity_timeout: Duration::from_millis(100),
            ..EventConfig::default()
        });
        executor.start().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let b_started = Arc::new(Mutex::new(None));
        let start = Instant::now();

        executor
            .execute_with_affinity("a", DispatchContext::capture(), round(&executor, &log, 1, 500))
            .await;
        executor
            .execute_with_affinity("a", DispatchContext::capture(), round(&executor, &log, 2, 0))
            .await;
        let b_round = {
            let b_started = Arc::clone(&b_started);
            move |_ctx: DispatchContext| -> Command {
                Box::pin(async move {
                    *b_started.lock().unwrap() = Some(start.elapsed());
                })
            }
        };
        executor
            .execute_with_affinity("b", DispatchContext::capture(), b_round)
            .await;

        wait_calm(&executor).await;
        assert_eq!(*log.lock().unwrap(), vec![2, 1]);
        // "b" queued behind the stalled "a" round on the shared lane.
        let b_started = b_started.lock().unwrap().unwrap();
        assert!(b_started >= Duration::from_millis(100));
        assert!(b_started < Duration::from_millis(500));
        executor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn disabled_affinity_creates_no_barriers() {
        let executor = executor(EventConfig {
            affinity_enabled: false,
            ..EventConfig::default()
        });
        executor.start().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        executor
            .execute_with_affinity("repo-a", DispatchContext::capture(), round(&executor, &log, 1, 0))
            .await;

        wait_calm(&executor).await;
        assert_eq!(*log.lock().unwrap(), vec![1]);
        assert!(executor.barrier("repo-a").is_none());
        assert_eq!(executor.stats().barriers, 0);
        executor.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_blocked_rounds() {
        let executor = executor(EventConfig {
            affinity_timeout: Duration::from_secs(3600),
            shutdown_grace: Duration::from_millis(100),
            ..EventConfig::default()
        });
        executor.start().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let stuck = {
            let executor = Arc::clone(&executor);
            move |ctx: DispatchContext| -> Command {
                Box::pin(async move {
                    executor
                        .execute(&ctx, Box::pin(std::future::pending::<()>()))
                        .await;
                })
            }
        };
        executor
            .execute_with_affinity("repo-a", DispatchContext::capture(), stuck)
            .await;
        executor
            .execute_with_affinity("repo-a", DispatchContext::capture(), round(&executor, &log, 2, 0))
            .await;
        time::sleep(Duration::from_millis(10)).await;
        assert!(log.lock().unwrap().is_empty());

        let result = executor.stop().await;
        assert!(matches!(
            result,
            Err(EventError::DrainExceeded { pending: 1, .. })
        ));
        // The waiting round was released and its delivery ran inline.
        assert_eq!(*log.lock().unwrap(), vec![2]);
        assert!(executor.is_calm_period());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_counts_rounds_stuck_on_a_lane() {
        let executor = executor(EventConfig {
            shutdown_grace: Duration::from_millis(50),
            ..EventConfig::default()
        });
        executor.start().unwrap();

        let hung = |_ctx: DispatchContext| -> Command { Box::pin(std::future::pending::<()>()) };
        executor
            .execute_with_affinity("repo-a", DispatchContext::capture(), hung)
            .await;
        let queued_behind = |_ctx: DispatchContext| -> Command { Box::pin(async {}) };
        executor
            .execute_with_affinity("repo-a", DispatchContext::capture(), queued_behind)
            .await;
        assert_eq!(executor.stats().active, 0);
        assert_eq!(executor.stats().coordinating, 2);

        let result = executor.stop().await;
        assert!(matches!(
            result,
            Err(EventError::DrainExceeded { pending: 2, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_affinity_timeout_keeps_keys_but_never_waits() {
        let executor = executor(EventConfig {
            affinity_timeout: Duration::ZERO,
            ..EventConfig::default()
        });
        executor.start().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        for (id, delay) in [(1, 100), (2, 0)] {
            executor
                .execute_with_affinity(
                    "repo-a",
                    DispatchContext::capture(),
                    round(&executor, &log, id, delay),
                )
                .await;
        }

        wait_calm(&executor).await;
        assert_eq!(*log.lock().unwrap(), vec![2, 1]);
        let barrier = executor.barrier("repo-a").unwrap();
        assert_eq!(barrier.phase(), 0);
        assert_eq!(barrier.bumped_parties(), 0);
        executor.stop().await.unwrap();
    }
}
