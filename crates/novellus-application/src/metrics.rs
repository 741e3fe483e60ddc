//! In-process performance counters for the request path.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters shared by instrumented providers.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    queries: AtomicU64,
    failures: AtomicU64,
    cache_hits: AtomicU64,
    total_latency_ms: AtomicU64,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    /// Operations recorded
    pub queries: u64,
    /// Operations that failed
    pub failures: u64,
    /// Operations served from a cache
    pub cache_hits: u64,
    /// Mean latency over all recorded operations
    pub avg_latency_ms: f64,
}

impl QueryMetrics {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one operation.
    pub fn record_query(&self, duration_ms: u64, ok: bool, cache_hit: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(duration_ms, Ordering::Relaxed);
        if !ok {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        if cache_hit {
            self.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let queries = self.queries.load(Ordering::Relaxed);
        let total = self.total_latency_ms.load(Ordering::Relaxed);
        MetricsSnapshot {
            queries,
            failures: self.failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            avg_latency_ms: if queries == 0 {
                0.0
            } else {
                total as f64 / queries as f64
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_aggregates_records() {
        let metrics = QueryMetrics::new();
        metrics.record_query(10, true, false);
        metrics.record_query(30, false, false);
        metrics.record_query(20, true, true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queries, 3);
        assert_eq!(snapshot.failures, 1);
        assert_eq!(snapshot.cache_hits, 1);
        assert!((snapshot.avg_latency_ms - 20.0).abs() < f64::EPSILON);
    }
}
