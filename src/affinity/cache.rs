//! # Bounded per-key barrier cache.
//!
//! [`AffinityBarrierCache`] hands out one [`AffinityBarrier`] per key, creating
//! it on first use and evicting the least recently used entry once
//! `capacity` keys are live.
//!
//! ## Rules
//! - **Single creation**: get-or-create runs under one lock, so concurrent first
//!   uses of a key observe the same barrier.
//! - **Eviction is safe**: an evicted barrier stays alive for whoever still holds
//!   it (lane jobs, tracked deliveries); the next use of the key creates a fresh
//!   barrier, which only resets that key's ordering window.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use lru::LruCache;

use super::barrier::AffinityBarrier;

/// LRU cache of per-key barriers.
pub struct AffinityBarrierCache {
    barriers: Mutex<LruCache<String, Arc<AffinityBarrier>>>,
    timeout: Option<Duration>,
}

impl AffinityBarrierCache {
    /// Creates a cache holding at most `capacity` barriers with the given round timeout.
    ///
    /// With `None` the barriers' rounds never wait.
    pub fn new(capacity: NonZeroUsize, timeout: Option<Duration>) -> Self {
        Self {
            barriers: Mutex::new(LruCache::new(capacity)),
            timeout,
        }
    }

    /// Returns the barrier for `key`, creating it if absent.
    pub fn get(&self, key: &str) -> Arc<AffinityBarrier> {
        let mut barriers = self.barriers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(barrier) = barriers.get(key) {
            return Arc::clone(barrier);
        }

        let barrier = Arc::new(AffinityBarrier::new(key, self.timeout));
        barriers.put(key.to_owned(), Arc::clone(&barrier));
        barrier
    }

    /// Returns the cached barrier for `key` without creating or promoting it.
    pub fn peek(&self, key: &str) -> Option<Arc<AffinityBarrier>> {
        self.barriers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .peek(key)
            .cloned()
    }

    /// Number of cached barriers.
    pub fn len(&self) -> usize {
        self.barriers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if no barrier has been created (or all were evicted).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
