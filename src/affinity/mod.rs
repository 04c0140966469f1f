//! Per-key ordering: barriers, their cache and coordination lanes.
//!
//! ## Contents
//! - [`AffinityBarrier`] generational barrier bounding how long a round waits on its predecessor
//! - [`AffinityBarrierCache`] bounded LRU of barriers, one per key
//! - `Lane` sequential executor through which a key's rounds run one at a time
//!
//! ## Wiring
//! ```text
//! execute_with_affinity(key, post)
//!     └─► cache.get(key) ─► barrier ─► barrier.lane().push(round)
//!                                           │
//!                                   round: barrier.await_turn()
//!                                          post(ctx + barrier)
//!                                              └─► execute(ctx, delivery)
//!                                                    └─► barrier.track_delivery(delivery)
//! ```

mod barrier;
mod cache;
mod lane;

pub use barrier::AffinityBarrier;
pub use cache::AffinityBarrierCache;
pub(crate) use lane::Lane;
