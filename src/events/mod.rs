//! Event contract and ambient replication flag.
//!
//! ## Contents
//! - [`Event`] capability trait implemented by producer-owned event types
//! - [`ReplicationContext`] task-local flag inherited by scheduled work
//! - [`Command`] the unit of scheduled work passed through the executor

mod event;
mod replication;

pub use event::Event;
pub use replication::ReplicationContext;

/// A unit of work scheduled by the executor: one round's post, or one delivery.
pub type Command = futures::future::BoxFuture<'static, ()>;
