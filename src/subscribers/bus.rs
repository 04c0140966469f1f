//! # Subscriber bus: registration and isolated delivery.
//!
//! The [`EventManager`](crate::EventManager) keeps two buses: one for sync
//! subscribers, one for async subscribers. A bus only knows who is registered;
//! *where* a delivery runs is decided by the executor.
//!
//! ## Architecture
//! ```text
//! post(&event)           (sync bus)
//!     ├──► subscriber1.on_event()  ── error/panic → warn, continue
//!     ├──► subscriber2.on_event()
//!     └──► subscriberN.on_event()
//!
//! snapshot(&event)       (async bus)
//!     └──► Vec<subscriber> captured at post time ─► one delivery command each
//! ```
//!
//! ## Rules
//! - **Registration order**: `post` and `snapshot` preserve it
//! - **Identity**: a subscriber is identified by its `Arc` allocation; registering
//!   the same instance twice is a no-op
//! - **Snapshot at post time**: unregistering after `post` does not retract a
//!   delivery already scheduled, and never adds one to a later post
//! - **Isolation**: errors and panics are caught per subscriber and logged
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a subscriber panics while holding a lock.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use tracing::warn;

use crate::error::{SubscriberError, panic_message};
use crate::events::Event;
use crate::subscribers::Subscribe;

/// Ordered set of subscribers of one delivery flavor.
pub(crate) struct SubscriberBus<E: Event> {
    subscribers: RwLock<Vec<Arc<dyn Subscribe<E>>>>,
}

impl<E: Event> SubscriberBus<E> {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Adds `sub`; returns `false` if this instance is already registered.
    pub(crate) fn register(&self, sub: Arc<dyn Subscribe<E>>) -> bool {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if subs.iter().any(|s| same_subscriber(s, &sub)) {
            return false;
        }
        subs.push(sub);
        true
    }

    /// Removes `sub`; returns `false` if it was not registered.
    pub(crate) fn unregister(&self, sub: &Arc<dyn Subscribe<E>>) -> bool {
        let mut subs = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subs.len();
        subs.retain(|s| !same_subscriber(s, sub));
        subs.len() != before
    }

    /// Subscribers interested in `event`, in registration order.
    pub(crate) fn snapshot(&self, event: &E) -> Vec<Arc<dyn Subscribe<E>>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.accepts(event))
            .cloned()
            .collect()
    }

    /// Number of registered subscribers.
    pub(crate) fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers `event` inline to every interested subscriber, in order.
    pub(crate) async fn post(&self, event: &E) {
        for sub in self.snapshot(event) {
            let _ = deliver(sub.as_ref(), event).await;
        }
    }
}

/// Runs one subscriber callback, converting a panic into an error and logging failures.
pub(crate) async fn deliver<E: Event>(
    sub: &dyn Subscribe<E>,
    event: &E,
) -> Result<(), SubscriberError> {
    let outcome = match AssertUnwindSafe(sub.on_event(event)).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => Err(SubscriberError::Panicked {
            info: panic_message(panic.as_ref()),
        }),
    };

    if let Err(err) = &outcome {
        warn!(
            subscriber = sub.name(),
            label = err.as_label(),
            error = %err,
            "subscriber failed to handle event"
        );
    }
    outcome
}

fn same_subscriber<E: Event>(a: &Arc<dyn Subscribe<E>>, b: &Arc<dyn Subscribe<E>>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
