//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the buses the
//! [`EventManager`](crate::EventManager) keeps them in.
//!
//! ## Architecture
//! ```text
//! register(sub)
//!     ├── sub.is_async() == false ──► sync bus  ──► delivered inline by post()
//!     └── sub.is_async() == true  ──► async bus ──► delivered through the executor
//!                                                    (pool, optionally ordered per key)
//! ```
//!
//! ## Subscriber types
//! - **Sync subscribers** - must be quick; they hold up the poster
//! - **Async subscribers** - may be slow (I/O, indexing); they hold up later
//!   events of the same affinity key only up to the configured timeout

mod bus;
#[cfg(feature = "logging")]
mod log;
mod subscribe;

pub(crate) use bus::{SubscriberBus, deliver};
#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscribe::Subscribe;
