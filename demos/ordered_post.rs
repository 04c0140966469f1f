//! # Ordered Post Example
//!
//! Posts events for two repositories through an async subscriber whose
//! handling time varies, then shows:
//! - events sharing an affinity key are handled in post order
//! - a round stuck past `affinity_timeout` is bumped so the key keeps moving
//!
//! ## Run
//! ```bash
//! RUST_LOG=eventvisor=debug cargo run --example ordered_post
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use eventvisor::{Event, EventConfig, EventManager, Subscribe, SubscriberError};

#[derive(Debug)]
struct AssetUploaded {
    repo: &'static str,
    seq: u32,
    cost_ms: u64,
}

impl Event for AssetUploaded {
    fn declares_affinity(&self) -> bool {
        true
    }

    fn affinity_key(&self) -> Option<&str> {
        Some(self.repo)
    }
}

#[derive(Default)]
struct Indexer {
    handled: Mutex<Vec<(&'static str, u32)>>,
}

#[async_trait::async_trait]
impl Subscribe<AssetUploaded> for Indexer {
    async fn on_event(&self, ev: &AssetUploaded) -> Result<(), SubscriberError> {
        tokio::time::sleep(Duration::from_millis(ev.cost_ms)).await;
        println!(" ├─► indexed {}#{}", ev.repo, ev.seq);
        if let Ok(mut handled) = self.handled.lock() {
            handled.push((ev.repo, ev.seq));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "indexer"
    }

    fn is_async(&self) -> bool {
        true
    }
}

async fn wait_calm(manager: &EventManager<AssetUploaded>) {
    while !manager.is_calm_period() {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let indexer = Arc::new(Indexer::default());
    let manager = EventManager::<AssetUploaded>::builder(EventConfig {
        affinity_timeout: Duration::from_millis(300),
        ..EventConfig::default()
    })
    .with_subscriber(indexer.clone())
    .build();
    manager.start()?;

    println!("Ordered delivery:");
    for (seq, cost_ms) in [(1, 120), (2, 10), (3, 60)] {
        manager
            .post(AssetUploaded { repo: "maven-releases", seq, cost_ms })
            .await;
        manager
            .post(AssetUploaded { repo: "npm-proxy", seq, cost_ms: 130 - cost_ms })
            .await;
    }
    wait_calm(&manager).await;

    println!();
    println!("Timeout bump:");
    manager
        .post(AssetUploaded { repo: "docker-hosted", seq: 1, cost_ms: 1_000 })
        .await;
    manager
        .post(AssetUploaded { repo: "docker-hosted", seq: 2, cost_ms: 0 })
        .await;
    wait_calm(&manager).await;

    let bumped = manager
        .executor()
        .barrier("docker-hosted")
        .map(|b| b.bumped_parties())
        .unwrap_or_default();
    println!();
    println!("Summary:");
    println!(" ├─► handled: {}", indexer.handled.lock().map(|h| h.len()).unwrap_or_default());
    println!(" └─► bumped parties on docker-hosted: {bumped}");

    manager.stop().await?;
    Ok(())
}
