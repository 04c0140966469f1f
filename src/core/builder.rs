use std::marker::PhantomData;
use std::sync::Arc;

use crate::core::{EventConfig, EventExecutor, EventManager};
use crate::events::Event;
use crate::subscribers::Subscribe;

/// Builder for constructing a shared [`EventManager`] with initial subscribers.
pub struct EventManagerBuilder<E: Event> {
    cfg: EventConfig,
    executor: Option<Arc<EventExecutor>>,
    subscribers: Vec<Arc<dyn Subscribe<E>>>,
    _event: PhantomData<fn(E)>,
}

impl<E: Event> EventManagerBuilder<E> {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: EventConfig) -> Self {
        Self {
            cfg,
            executor: None,
            subscribers: Vec::new(),
            _event: PhantomData,
        }
    }

    /// Replaces the initial subscriber list.
    ///
    /// Each subscriber lands on the sync or async bus according to
    /// [`Subscribe::is_async`].
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe<E>>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Appends one initial subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe<E>>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Dispatches through an existing executor instead of a new one.
    ///
    /// The builder's configuration is ignored in that case.
    pub fn with_executor(mut self, executor: Arc<EventExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Builds the manager in direct mode; call [`EventManager::start`] to go async.
    pub fn build(self) -> Arc<EventManager<E>> {
        let executor = self
            .executor
            .unwrap_or_else(|| Arc::new(EventExecutor::new(self.cfg)));
        let manager = EventManager::with_executor(executor);
        for sub in self.subscribers {
            manager.register(sub);
        }
        Arc::new(manager)
    }
}
