//! Scriptorium: a versioned knowledge repository.
//!
//! Authors edit notes as private drafts, publish immutable versions into
//! named collections, and readers query the published corpus for
//! extractive, citation-backed answers. See `DESIGN.md` for how this crate
//! is put together.

pub mod anchor;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod index;
pub mod model;
pub mod observability;
pub mod publish;
pub mod query;
pub mod store;
pub mod visibility;

use std::sync::Arc;

use tracing::info;

pub use config::Config;
pub use error::{Result, ScriptoriumError};

/// Everything a running instance needs: the shared entity store, the
/// derived search corpus, and the metrics sink. Cloning is cheap (every
/// field is already reference-counted or interior-mutable).
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::StoragePort>,
    pub corpus: Arc<index::Corpus>,
    pub metrics: Arc<observability::MetricsRegistry>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let corpus = index::Corpus::new(config.chunker);
        Self {
            store: Arc::new(store::InMemoryStore::new()),
            corpus: Arc::new(corpus),
            metrics: Arc::new(observability::MetricsRegistry::new()),
            config: Arc::new(config),
        }
    }

    /// Drains the visibility outbox once. Intended to be called in a loop
    /// by a background task; exposed standalone so tests and the CLI can
    /// drive the pipeline deterministically without a timer.
    pub async fn pump_visibility_once(&self) -> Result<visibility::DrainReport> {
        visibility::drain_and_commit(
            &self.store,
            &self.corpus,
            &self.metrics,
            self.config.visibility_policy,
            64,
        )
        .await
    }

    /// Spawns the background visibility worker, looping `pump_visibility_once`
    /// with a short idle sleep between empty drains.
    pub fn spawn_visibility_worker(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            info!("visibility worker started");
            loop {
                match state.pump_visibility_once().await {
                    Ok(report) if report.committed == 0 && report.parked == 0 => {
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::error!(%err, "visibility worker iteration failed");
                        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
                    }
                }
            }
        })
    }
}

/// Installs the global tracing subscriber exactly once per process.
pub fn install_tracing_subscriber() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(filter).init();
    });
}
