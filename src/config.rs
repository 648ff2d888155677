//! Runtime configuration.
//!
//! A handful of named profiles rather than a file format: nothing here
//! needs to survive a restart independent of the workspace state itself,
//! so a builder over `Config::default()` is sufficient.

use crate::anchor::chunker::ChunkerConfig;
use crate::visibility::PipelinePolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub chunker: ChunkerConfig,
    pub top_k_retrieve: usize,
    pub top_k_rerank: usize,
    pub top_k_rerank_backoff: usize,
    pub page_size: usize,
    pub search_p95_backoff_ms: u64,
    pub estimated_searchable_in_ms: u64,
    pub visibility_policy: PipelinePolicy,
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            top_k_retrieve: 128,
            top_k_rerank: 64,
            top_k_rerank_backoff: 32,
            page_size: 10,
            search_p95_backoff_ms: 500,
            estimated_searchable_in_ms: crate::publish::ESTIMATED_SEARCHABLE_IN_MS,
            visibility_policy: PipelinePolicy::default(),
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    pub fn production() -> Self {
        Self {
            visibility_policy: crate::visibility::PipelinePolicy {
                max_retries: 8,
                backoff_base_ms: 100,
            },
            bind_addr: "0.0.0.0:8080".to_string(),
            ..Self::default()
        }
    }

    pub fn balanced() -> Self {
        Self {
            top_k_retrieve: 64,
            top_k_rerank: 32,
            ..Self::default()
        }
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn effective_top_k_rerank(&self, observed_p95_ms: Option<u64>) -> usize {
        match observed_p95_ms {
            Some(p95) if p95 > self.search_p95_backoff_ms => self.top_k_rerank_backoff,
            _ => self.top_k_rerank,
        }
    }
}
