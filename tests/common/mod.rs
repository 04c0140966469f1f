#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use eventvisor::{Event, EventConfig, EventManager, ReplicationContext, Subscribe, SubscriberError};
use tokio::time::{self, Instant};

/// Repository event with an optional affinity key and a simulated handling cost.
#[derive(Debug, Clone)]
pub struct RepoEvent {
    pub repo: Option<String>,
    pub declares: bool,
    pub seq: u32,
    pub delay_ms: u64,
}

impl RepoEvent {
    pub fn keyed(repo: &str, seq: u32, delay_ms: u64) -> Self {
        Self {
            repo: Some(repo.to_owned()),
            declares: true,
            seq,
            delay_ms,
        }
    }

    pub fn unkeyed(seq: u32, delay_ms: u64) -> Self {
        Self {
            repo: None,
            declares: false,
            seq,
            delay_ms,
        }
    }

    /// Declares affinity but carries no key.
    pub fn malformed(seq: u32) -> Self {
        Self {
            repo: None,
            declares: true,
            seq,
            delay_ms: 0,
        }
    }
}

impl Event for RepoEvent {
    fn declares_affinity(&self) -> bool {
        self.declares
    }

    fn affinity_key(&self) -> Option<&str> {
        self.repo.as_deref()
    }
}

#[derive(Debug, Clone)]
pub struct Delivery {
    pub seq: u32,
    pub repo: Option<String>,
    pub started: Duration,
    pub finished: Duration,
    pub replicating: bool,
}

/// Subscriber recording every delivery, in completion order.
pub struct Recorder {
    asynchronous: bool,
    origin: Instant,
    deliveries: Mutex<Vec<Delivery>>,
}

impl Recorder {
    pub fn asynchronous() -> Arc<Self> {
        Self::new(true)
    }

    pub fn sync() -> Arc<Self> {
        Self::new(false)
    }

    fn new(asynchronous: bool) -> Arc<Self> {
        Arc::new(Self {
            asynchronous,
            origin: Instant::now(),
            deliveries: Mutex::new(Vec::new()),
        })
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    /// Sequence numbers in completion order.
    pub fn seqs(&self) -> Vec<u32> {
        self.deliveries().iter().map(|d| d.seq).collect()
    }

    /// Sequence numbers of `repo`, in start order.
    pub fn started_seqs(&self, repo: &str) -> Vec<u32> {
        let mut of_repo: Vec<_> = self
            .deliveries()
            .into_iter()
            .filter(|d| d.repo.as_deref() == Some(repo))
            .collect();
        of_repo.sort_by_key(|d| d.started);
        of_repo.iter().map(|d| d.seq).collect()
    }

    pub fn find(&self, seq: u32) -> Option<Delivery> {
        self.deliveries().into_iter().find(|d| d.seq == seq)
    }
}

#[async_trait]
impl Subscribe<RepoEvent> for Recorder {
    async fn on_event(&self, ev: &RepoEvent) -> Result<(), SubscriberError> {
        let started = self.origin.elapsed();
        let replicating = ReplicationContext::is_replicating();
        if ev.delay_ms > 0 {
            time::sleep(Duration::from_millis(ev.delay_ms)).await;
        }
        self.deliveries.lock().unwrap().push(Delivery {
            seq: ev.seq,
            repo: ev.repo.clone(),
            started,
            finished: self.origin.elapsed(),
            replicating,
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recorder"
    }

    fn is_async(&self) -> bool {
        self.asynchronous
    }
}

/// Subscriber that always fails, either with an error or a panic.
pub struct Broken {
    pub asynchronous: bool,
    pub panics: bool,
}

#[async_trait]
impl Subscribe<RepoEvent> for Broken {
    async fn on_event(&self, ev: &RepoEvent) -> Result<(), SubscriberError> {
        if self.panics {
            panic!("broken subscriber at seq {}", ev.seq);
        }
        Err(SubscriberError::fail(format!("cannot handle seq {}", ev.seq)))
    }

    fn is_async(&self) -> bool {
        self.asynchronous
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Starts a manager with `cfg` and one async recorder.
pub fn started(cfg: EventConfig) -> (Arc<EventManager<RepoEvent>>, Arc<Recorder>) {
    init_tracing();
    let recorder = Recorder::asynchronous();
    let manager = EventManager::<RepoEvent>::builder(cfg)
        .with_subscriber(recorder.clone())
        .build();
    manager.start().unwrap();
    (manager, recorder)
}

pub async fn wait_calm(manager: &EventManager<RepoEvent>) {
    while !manager.is_calm_period() {
        time::sleep(Duration::from_millis(1)).await;
    }
}
