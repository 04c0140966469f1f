//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] records every posted event through `tracing` at `info` level.
//! It is a sync subscriber, so events are logged on the posting task in post
//! order.
//!
//! ## Output format
//! ```text
//! INFO eventvisor: event posted affinity=Some("maven-central") replicating=false event=AssetUploaded { .. }
//! ```
//!
//! Not intended for production use - implement a custom [`Subscribe`] for
//! structured audit or metrics collection.

use std::fmt::Debug;

use async_trait::async_trait;
use tracing::info;

use crate::error::SubscriberError;
use crate::events::{Event, ReplicationContext};
use crate::subscribers::Subscribe;

/// Tracing-backed logging subscriber.
///
/// Enabled via the `logging` feature.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl<E: Event + Debug> Subscribe<E> for LogWriter {
    async fn on_event(&self, e: &E) -> Result<(), SubscriberError> {
        let affinity = if e.declares_affinity() {
            e.affinity_key()
        } else {
            None
        };
        info!(
            affinity = ?affinity,
            replicating = ReplicationContext::is_replicating(),
            event = ?e,
            "event posted"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
