//! # Replication flag carried across scheduling boundaries.
//!
//! Work done while replaying events from another node is marked as
//! "replicating" so subscribers can skip side effects that would otherwise be
//! duplicated. The flag lives in a tokio task-local: it is set for the duration
//! of a future via [`ReplicationContext::scope`], and the executor re-applies
//! the poster's flag around every command it schedules, so the worker that
//! runs the command observes the same value only while the command runs.

use std::future::Future;

tokio::task_local! {
    static REPLICATING: bool;
}

/// Accessors for the ambient replication flag.
pub struct ReplicationContext;

impl ReplicationContext {
    /// Returns the flag of the current task (`false` outside any scope).
    pub fn is_replicating() -> bool {
        REPLICATING.try_with(|flag| *flag).unwrap_or(false)
    }

    /// Runs `fut` with the flag set to `replicating`.
    pub async fn scope<F: Future>(replicating: bool, fut: F) -> F::Output {
        REPLICATING.scope(replicating, fut).await
    }

    /// Runs `fut` marked as replicating.
    ///
    /// ```rust
    /// use eventvisor::ReplicationContext;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// assert!(!ReplicationContext::is_replicating());
    /// let inside = ReplicationContext::replicating(async { ReplicationContext::is_replicating() }).await;
    /// assert!(inside);
    /// # }
    /// ```
    pub async fn replicating<F: Future>(fut: F) -> F::Output {
        Self::scope(true, fut).await
    }
}
