//! Idempotency-token map — part of the same guarded state as the rest of
//! the entity store. This is transactional storage, not in-process-only
//! memory, so idempotent replay holds across a restart of a persistent
//! backend; the in-memory implementation here keeps it in the same
//! `RwLock` as everything else for that reason.

use serde::{Deserialize, Serialize};

use crate::publish::{PublishResponse, RollbackResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IdempotentOutcome {
    Publish(PublishResponse),
    Rollback(RollbackResponse),
}

#[derive(Debug, Clone)]
pub struct IdempotencyEntry {
    pub outcome: IdempotentOutcome,
    pub recorded_at_millis: u64,
}
