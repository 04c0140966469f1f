//! # Dispatch context carried alongside scheduled commands.
//!
//! Instead of a thread-bound "current barrier", the executor hands the running
//! round an explicit [`DispatchContext`]. Anything the round schedules through
//! [`EventExecutor::execute`](crate::EventExecutor::execute) with that context
//! is tracked by the round's barrier. The binding lives exactly as long as the
//! context value the round's command owns.

use std::sync::Arc;

use crate::affinity::AffinityBarrier;
use crate::events::ReplicationContext;

/// Scheduling context of one post.
#[derive(Clone, Debug, Default)]
pub struct DispatchContext {
    barrier: Option<Arc<AffinityBarrier>>,
    replicating: bool,
}

impl DispatchContext {
    /// Captures the calling task's replication flag, with no barrier bound.
    pub fn capture() -> Self {
        Self {
            barrier: None,
            replicating: ReplicationContext::is_replicating(),
        }
    }

    /// Barrier of the round this context belongs to, if any.
    pub fn barrier(&self) -> Option<&Arc<AffinityBarrier>> {
        self.barrier.as_ref()
    }

    /// Replication flag scheduled work must run under.
    pub fn replicating(&self) -> bool {
        self.replicating
    }

    pub(crate) fn with_barrier(mut self, barrier: Arc<AffinityBarrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }
}
