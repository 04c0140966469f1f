//! # eventvisor
//!
//! **Eventvisor** is the event-distribution core of an artifact-repository
//! server: components post domain events, subscribers react to them.
//!
//! Slow subscribers (indexing, replication, metadata rebuilds) run on a worker
//! pool, while events concerning the same repository keep their relative order
//! through a per-key *generational affinity barrier*: a round for event N+1 of
//! a key waits until every delivery of event N finished, or until a bounded
//! timeout expires, whichever comes first.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   producer ──► EventManager::post(event)
//!                   │
//!                   ├──► sync bus  ──► sub.on_event()  (inline, registration order)
//!                   │
//!                   └──► async bus snapshot
//!                           │
//!                           ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  EventExecutor                                                    │
//! │  - Direct mode: everything inline                                 │
//! │  - Async mode:                                                    │
//! │      AffinityBarrierCache (LRU, key ─► AffinityBarrier)           │
//! │      per-key Lane (or one coordinator Lane)                       │
//! │      WorkerPool (permit-bounded tasks, caller-runs on rejection)  │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   repo "central"     repo "npm-proxy"    (no key)
//!   round 1 ─► round 2  round 1             unordered
//!     │  await_turn       │
//!     ▼                   ▼
//!   deliveries on pool  deliveries on pool
//! ```
//!
//! ### One key over time
//! ```text
//! phase 0: slot ─┬─ delivery A ──────────┐
//!                └─ delivery B ──┐       │
//!                                ▼       ▼
//! phase 1:                     arrive  arrive ─► phase advances
//!          next round's await_turn() ───────────► released
//!          (or timeout ─► remaining parties bumped, phase forced forward)
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                            |
//! |-------------------|-----------------------------------------------------------|-----------------------------------------------|
//! | **Posting**       | Register subscribers, post events, poll for quiescence.   | [`EventManager`], [`EventManagerBuilder`]     |
//! | **Subscriber API**| Sync or async handlers with optional event filtering.     | [`Subscribe`], [`Event`]                      |
//! | **Ordering**      | Per-key bounded-wait ordering of async deliveries.        | [`AffinityBarrier`], [`AffinityBarrierCache`] |
//! | **Dispatch**      | Direct/async modes, worker pool, calm-period detection.   | [`EventExecutor`], [`DispatchContext`]        |
//! | **Replication**   | Task-scoped "replicating" flag carried to deliveries.     | [`ReplicationContext`]                        |
//! | **Errors**        | Typed lifecycle and subscriber errors.                    | [`EventError`], [`SubscriberError`]           |
//! | **Configuration** | Centralize dispatch settings.                             | [`EventConfig`]                               |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use eventvisor::{Event, EventConfig, EventManager, Subscribe, SubscriberError};
//!
//! struct AssetUploaded {
//!     repository: String,
//!     path: String,
//! }
//!
//! impl Event for AssetUploaded {
//!     fn declares_affinity(&self) -> bool {
//!         true
//!     }
//!     fn affinity_key(&self) -> Option<&str> {
//!         Some(&self.repository)
//!     }
//! }
//!
//! struct Indexer;
//!
//! #[async_trait]
//! impl Subscribe<AssetUploaded> for Indexer {
//!     async fn on_event(&self, ev: &AssetUploaded) -> Result<(), SubscriberError> {
//!         println!("indexing {}/{}", ev.repository, ev.path);
//!         Ok(())
//!     }
//!     fn is_async(&self) -> bool {
//!         true
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = EventManager::<AssetUploaded>::builder(EventConfig::default())
//!         .with_subscriber(Arc::new(Indexer))
//!         .build();
//!     manager.start()?;
//!
//!     manager
//!         .post(AssetUploaded {
//!             repository: "maven-releases".into(),
//!             path: "org/acme/app/1.0/app-1.0.jar".into(),
//!         })
//!         .await;
//!
//!     while !manager.is_calm_period() {
//!         tokio::task::yield_now().await;
//!     }
//!     manager.stop().await?;
//!     Ok(())
//! }
//! ```
mod affinity;
mod core;
mod error;
mod events;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    DispatchContext, EventConfig, EventExecutor, EventManager, EventManagerBuilder, ExecutorStats,
};
pub use affinity::{AffinityBarrier, AffinityBarrierCache};
pub use error::{EventError, SubscriberError};
pub use events::{Command, Event, ReplicationContext};
pub use subscribers::Subscribe;

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
