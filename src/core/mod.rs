//! Runtime core: dispatch and lifecycle.
//!
//! The public API from this module is [`EventManager`] (built directly or via
//! [`EventManagerBuilder`]), the [`EventExecutor`] it dispatches through, and
//! [`EventConfig`].
//!
//! Internal modules:
//! - [`pool`]: permit-bounded worker tasks with caller-runs rejection;
//! - [`executor`]: direct/async mode switch, per-key lanes, calm-period tracking;
//! - [`manager`]: subscriber buses and the post flow;
//! - [`context`]: the barrier/replication context handed to scheduled rounds.

mod builder;
mod config;
mod context;
mod executor;
mod manager;
mod pool;

pub use builder::EventManagerBuilder;
pub use config::EventConfig;
pub use context::DispatchContext;
pub use executor::{EventExecutor, ExecutorStats};
pub use manager::EventManager;
