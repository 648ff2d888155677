//! Visibility pipeline.
//!
//! A durable FIFO outbox of [`VisibilityEvent`]s, written in the same
//! transaction as the Version that produced them, drained by a single
//! background consumer that hands each event to the [`crate::index::Corpus`]
//! and retries with bounded exponential backoff on failure.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::ids::Id;
use crate::index::Corpus;
use crate::observability::MetricsRegistry;
use crate::store::StoragePort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityOp {
    Publish,
    Republish,
    Rollback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityEvent {
    pub version_id: Id,
    pub note_id: Id,
    pub collections: Vec<Id>,
    pub op: VisibilityOp,
    pub enqueued_at_millis: u64,
}

impl VisibilityEvent {
    /// Dedup key: a repeated publish for the same version produces no
    /// additional event.
    pub fn dedup_key(&self) -> (Id, VisibilityOp) {
        (self.version_id.clone(), self.op)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelinePolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base_ms: 50,
        }
    }
}

/// Outcome of draining and committing one batch of events, surfaced to
/// callers that want to observe pipeline progress (tests, admin tooling).
#[derive(Debug, Default)]
pub struct DrainReport {
    pub committed: usize,
    pub parked: usize,
}

/// Drains up to `max` pending events from the store and commits each into
/// the corpus, retrying transient [`crate::error::ScriptoriumError`]s with
/// exponential backoff before parking a permanently failing item.
pub async fn drain_and_commit(
    store: &Arc<dyn StoragePort>,
    corpus: &Corpus,
    metrics: &MetricsRegistry,
    policy: PipelinePolicy,
    max: usize,
) -> Result<DrainReport> {
    let events = store.drain_visibility_events(max).await?;
    let mut report = DrainReport::default();

    for event in events {
        let started = std::time::Instant::now();
        let mut attempt = 0u32;
        loop {
            match corpus.commit_version(store.as_ref(), &event).await {
                Ok(()) => {
                    info!(version_id = %event.version_id, op = ?event.op, "visibility event committed");
                    report.committed += 1;
                    metrics.record_latency_ms("visibility.latency_ms", started.elapsed().as_millis() as u64);
                    break;
                }
                Err(err) if err.is_retriable() && attempt < policy.max_retries => {
                    attempt += 1;
                    let backoff = policy.backoff_base_ms * (1u64 << attempt.min(10));
                    warn!(version_id = %event.version_id, attempt, %err, "visibility commit failed, retrying");
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    continue;
                }
                Err(err) => {
                    error!(version_id = %event.version_id, %err, "visibility event parked after exhausting retries");
                    metrics.increment_counter("visibility.parked");
                    report.parked += 1;
                    break;
                }
            }
        }
    }

    Ok(report)
}
