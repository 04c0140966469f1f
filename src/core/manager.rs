//! # EventManager: public entry point for posting events.
//!
//! The manager owns two [`SubscriberBus`]es and an [`EventExecutor`]. Sync
//! subscribers run on the posting task; async subscribers are fanned out through
//! the executor, ordered per affinity key when the event declares one.
//!
//! ## Post flow
//! ```text
//! post(event)
//!   ├─► sync bus: deliver inline, in registration order
//!   ├─► async bus: snapshot subscribers accepting the event (empty → done)
//!   └─► affinity enabled && event.declares_affinity()?
//!         ├─ key present → executor.execute_with_affinity(key, fan-out)
//!         ├─ key missing → warn, fan-out unordered
//!         └─ otherwise   → fan-out unordered
//!
//! fan-out(ctx): for each snapshotted subscriber → executor.execute(ctx, deliver)
//! ```

use std::sync::Arc;

use tracing::warn;

use crate::core::builder::EventManagerBuilder;
use crate::core::context::DispatchContext;
use crate::core::executor::EventExecutor;
use crate::core::EventConfig;
use crate::error::EventError;
use crate::events::{Command, Event};
use crate::subscribers::{Subscribe, SubscriberBus, deliver};

/// Registers subscribers and distributes posted events to them.
pub struct EventManager<E: Event> {
    executor: Arc<EventExecutor>,
    sync_bus: SubscriberBus<E>,
    async_bus: SubscriberBus<E>,
}

impl<E: Event> EventManager<E> {
    /// Creates a manager with its own executor, in direct mode.
    pub fn new(cfg: EventConfig) -> Self {
        Self::with_executor(Arc::new(EventExecutor::new(cfg)))
    }

    /// Creates a manager dispatching through an existing executor.
    pub fn with_executor(executor: Arc<EventExecutor>) -> Self {
        Self {
            executor,
            sync_bus: SubscriberBus::new(),
            async_bus: SubscriberBus::new(),
        }
    }

    /// Returns a builder for a shared manager.
    pub fn builder(cfg: EventConfig) -> EventManagerBuilder<E> {
        EventManagerBuilder::new(cfg)
    }

    pub fn executor(&self) -> &Arc<EventExecutor> {
        &self.executor
    }

    /// See [`EventExecutor::start`].
    pub fn start(&self) -> Result<(), EventError> {
        self.executor.start()
    }

    /// See [`EventExecutor::stop`].
    pub async fn stop(&self) -> Result<(), EventError> {
        self.executor.stop().await
    }

    /// Registers `sub` on the bus matching its [`Subscribe::is_async`] flag.
    ///
    /// Returns `false` if this instance is already registered.
    pub fn register(&self, sub: Arc<dyn Subscribe<E>>) -> bool {
        self.bus_for(sub.as_ref()).register(sub)
    }

    /// Returns `false` if `sub` was not registered.
    pub fn unregister(&self, sub: &Arc<dyn Subscribe<E>>) -> bool {
        self.bus_for(sub.as_ref()).unregister(sub)
    }

    /// Number of registered subscribers, sync and async.
    pub fn subscriber_count(&self) -> usize {
        self.sync_bus.len() + self.async_bus.len()
    }

    /// Delivers `event` to every interested subscriber.
    ///
    /// Returns after sync subscribers have run and async deliveries have been
    /// scheduled (or run, in direct mode).
    pub async fn post(&self, event: E) {
        self.sync_bus.post(&event).await;

        let subscribers = self.async_bus.snapshot(&event);
        if subscribers.is_empty() {
            return;
        }

        let ctx = DispatchContext::capture();
        let ordered = self.executor.is_affinity_enabled() && event.declares_affinity();
        let key = event.affinity_key().filter(|k| !k.is_empty()).map(str::to_owned);

        let fan_out = FanOut {
            executor: Arc::clone(&self.executor),
            subscribers,
            event: Arc::new(event),
        };

        match key {
            Some(key) if ordered => {
                self.executor
                    .execute_with_affinity(&key, ctx, move |ctx| fan_out.into_command(ctx))
                    .await;
            }
            None if ordered => {
                warn!("event declares affinity without a key; delivering unordered");
                fan_out.into_command(ctx).await;
            }
            _ => fan_out.into_command(ctx).await,
        }
    }

    /// True if no asynchronous delivery is queued or running.
    pub fn is_calm_period(&self) -> bool {
        self.executor.is_calm_period()
    }

    pub fn is_affinity_enabled(&self) -> bool {
        self.executor.is_affinity_enabled()
    }

    fn bus_for(&self, sub: &dyn Subscribe<E>) -> &SubscriberBus<E> {
        if sub.is_async() {
            &self.async_bus
        } else {
            &self.sync_bus
        }
    }
}

/// One event's async deliveries, captured at post time.
struct FanOut<E: Event> {
    executor: Arc<EventExecutor>,
    subscribers: Vec<Arc<dyn Subscribe<E>>>,
    event: Arc<E>,
}

impl<E: Event> FanOut<E> {
    fn into_command(self, ctx: DispatchContext) -> Command {
        Box::pin(async move {
            for sub in self.subscribers {
                let event = Arc::clone(&self.event);
                let delivery: Command = Box::pin(async move {
                    let _ = deliver(sub.as_ref(), event.as_ref()).await;
                });
                self.executor.execute(&ctx, delivery).await;
            }
        })
    }
}
