//! Observability: counters, gauges, and rolling-percentile timers.
//!
//! A fixed-size ring buffer per metric lets P50/P95/P99 be derived without
//! external dependencies. No content bodies are ever recorded — only ids
//! and numeric samples.

use std::collections::HashMap;

use parking_lot::Mutex;

const RING_CAPACITY: usize = 512;
/// Retention window for counters and events.
pub const EVENT_RETENTION_MS: u64 = 30 * 24 * 60 * 60 * 1000;
/// Retention window for traces.
pub const TRACE_RETENTION_MS: u64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Default)]
pub struct Percentiles {
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

#[derive(Debug, Default)]
struct LatencyRing {
    samples: Vec<(u64, u64)>, // (recorded_at_millis, value)
}

impl LatencyRing {
    fn push(&mut self, now_millis: u64, value: u64) {
        if self.samples.len() == RING_CAPACITY {
            self.samples.remove(0);
        }
        self.samples.push((now_millis, value));
    }

    fn percentiles(&self) -> Percentiles {
        if self.samples.is_empty() {
            return Percentiles::default();
        }
        let mut values: Vec<u64> = self.samples.iter().map(|(_, v)| *v).collect();
        values.sort_unstable();
        let pick = |p: f64| -> u64 {
            let idx = ((values.len() as f64 - 1.0) * p).round() as usize;
            values[idx]
        };
        Percentiles {
            p50: pick(0.50),
            p95: pick(0.95),
            p99: pick(0.99),
        }
    }

    fn prune(&mut self, now_millis: u64, retention_ms: u64) {
        self.samples
            .retain(|(recorded_at, _)| now_millis.saturating_sub(*recorded_at) <= retention_ms);
    }
}

#[derive(Default)]
struct Inner {
    counters: HashMap<String, u64>,
    timers: HashMap<String, LatencyRing>,
}

/// Thread-safe metrics sink shared across the HTTP surface, the visibility
/// pipeline, and the query composer.
#[derive(Default)]
pub struct MetricsRegistry {
    inner: Mutex<Inner>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&self, name: &str) {
        let mut inner = self.inner.lock();
        *inner.counters.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn counter_value(&self, name: &str) -> u64 {
        self.inner.lock().counters.get(name).copied().unwrap_or(0)
    }

    /// Records a latency sample for `name` using the current wall clock.
    pub fn record_latency_ms(&self, name: &str, value_ms: u64) {
        let now = crate::ids::now_millis();
        self.record_latency_ms_at(name, value_ms, now);
    }

    pub fn record_latency_ms_at(&self, name: &str, value_ms: u64, now_millis: u64) {
        let mut inner = self.inner.lock();
        inner
            .timers
            .entry(name.to_string())
            .or_default()
            .push(now_millis, value_ms);
    }

    pub fn percentiles(&self, name: &str) -> Percentiles {
        self.inner
            .lock()
            .timers
            .get(name)
            .map(|ring| ring.percentiles())
            .unwrap_or_default()
    }

    /// Drops samples and (in a fuller backend) events older than the
    /// retention window, keyed off a caller-supplied "now" so the sweep is
    /// deterministic and testable.
    pub fn prune(&self, now_millis: u64, retention_ms: u64) {
        let mut inner = self.inner.lock();
        for ring in inner.timers.values_mut() {
            ring.prune(now_millis, retention_ms);
        }
    }
}
