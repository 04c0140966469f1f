//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging event handlers into the
//! [`EventManager`](crate::EventManager). A subscriber declares whether it
//! wants asynchronous delivery; that choice decides which bus it joins.
//!
//! ## Contract
//! - **Sync subscribers** (`is_async() == false`) run inline on the posting
//!   task, in registration order, before `post` moves on to async delivery.
//! - **Async subscribers** run on the worker pool once the executor is started
//!   (inline before that). Deliveries for events sharing an affinity key are
//!   ordered per key, within the configured timeout.
//! - Returning an error (or panicking) is logged and isolated: other
//!   subscribers still receive the event.
//!
//! ## Example
//! ```rust
//! use eventvisor::{Event, Subscribe, SubscriberError};
//! use async_trait::async_trait;
//!
//! struct ComponentCreated { repository: String }
//! impl Event for ComponentCreated {
//!     fn declares_affinity(&self) -> bool { true }
//!     fn affinity_key(&self) -> Option<&str> { Some(&self.repository) }
//! }
//!
//! struct SearchIndexer;
//!
//! #[async_trait]
//! impl Subscribe<ComponentCreated> for SearchIndexer {
//!     async fn on_event(&self, ev: &ComponentCreated) -> Result<(), SubscriberError> {
//!         if ev.repository.is_empty() {
//!             return Err(SubscriberError::fail("no repository"));
//!         }
//!         Ok(())
//!     }
//!     fn name(&self) -> &'static str { "search-indexer" }
//!     fn is_async(&self) -> bool { true }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SubscriberError;
use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe<E: Event>: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &E) -> Result<(), SubscriberError>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Whether this subscriber wants asynchronous delivery.
    fn is_async(&self) -> bool {
        false
    }

    /// Whether this subscriber is interested in `event`.
    ///
    /// Evaluated at post time; non-matching subscribers are skipped.
    fn accepts(&self, _event: &E) -> bool {
        true
    }
}
