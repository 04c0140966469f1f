//! # Event capability contract.
//!
//! Events are opaque, producer-owned values. The runtime only asks them two
//! questions, both optional:
//! - does the event take part in per-key ordering? ([`Event::declares_affinity`])
//! - if so, which key? ([`Event::affinity_key`])
//!
//! ## Affinity outcomes
//! ```text
//! declares_affinity() = false            → unordered async delivery
//! declares_affinity() = true, key = Some → ordered behind earlier events with the same key
//! declares_affinity() = true, key = None → warning, unordered async delivery (still delivered)
//! ```
//!
//! ## Example
//! ```rust
//! use eventvisor::Event;
//!
//! #[derive(Debug)]
//! struct AssetUploaded {
//!     repository: String,
//!     path: String,
//! }
//!
//! impl Event for AssetUploaded {
//!     fn declares_affinity(&self) -> bool { true }
//!     fn affinity_key(&self) -> Option<&str> { Some(&self.repository) }
//! }
//!
//! let ev = AssetUploaded { repository: "maven-central".into(), path: "a/b.jar".into() };
//! assert_eq!(ev.affinity_key(), Some("maven-central"));
//! ```

/// Contract for values posted through the [`EventManager`](crate::EventManager).
///
/// The runtime never mutates events; one instance is shared (behind an `Arc`)
/// by every subscriber that receives it.
pub trait Event: Send + Sync + 'static {
    /// Whether this event asks for per-key ordering of its async deliveries.
    fn declares_affinity(&self) -> bool {
        false
    }

    /// Ordering key, typically the repository name.
    ///
    /// Only consulted when [`declares_affinity`](Self::declares_affinity) is `true`.
    /// An empty string is treated the same as `None`.
    fn affinity_key(&self) -> Option<&str> {
        None
    }
}
