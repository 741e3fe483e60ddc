//! Windowed latency and success-rate estimator.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::Utc;
use novellus_domain::constants::routing::HEALTH_WINDOW_SAMPLES;
use novellus_domain::entities::ModelHealth;

#[derive(Debug, Clone, Copy)]
struct Sample {
    latency_ms: f64,
    ok: bool,
}

/// Bounded sample window producing p50/p99 latency and success rate.
#[derive(Debug, Default)]
pub struct HealthTracker {
    samples: Mutex<VecDeque<Sample>>,
}

impl HealthTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one call outcome.
    pub fn record(&self, latency_ms: f64, ok: bool) {
        let Ok(mut samples) = self.samples.lock() else {
            return;
        };
        if samples.len() == HEALTH_WINDOW_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(Sample { latency_ms, ok });
    }

    /// Current estimate over the window. An empty window reports the
    /// optimistic default (untried models get a first chance).
    #[must_use]
    pub fn snapshot(&self) -> ModelHealth {
        let Ok(samples) = self.samples.lock() else {
            return ModelHealth::default();
        };
        if samples.is_empty() {
            return ModelHealth::default();
        }

        let mut latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
        latencies.sort_by(f64::total_cmp);
        let successes = samples.iter().filter(|s| s.ok).count();
        let last_error_at = if samples.iter().any(|s| !s.ok) {
            Some(Utc::now())
        } else {
            None
        };

        ModelHealth {
            success_rate: successes as f64 / samples.len() as f64,
            p50_latency_ms: percentile(&latencies, 0.50),
            p99_latency_ms: percentile(&latencies, 0.99),
            last_error_at,
        }
    }
}

fn percentile(sorted: &[f64], q: f64) -> f64 {
    let index = ((sorted.len() as f64 * q).ceil() as usize)
        .saturating_sub(1)
        .min(sorted.len() - 1);
    sorted[index]
}
