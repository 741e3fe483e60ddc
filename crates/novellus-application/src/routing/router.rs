//! Model router
//!
//! Capability + status filtering, non-consuming admission peek, and the
//! five selection strategies. Health estimates update on every recorded
//! outcome; repeated failures degrade a model until its cooldown lapses.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use novellus_domain::entities::ModelDescriptor;
use novellus_domain::ports::providers::RateLimiterProvider;
use novellus_domain::value_objects::{Capability, ModelId, ModelStatus, RouteStrategy};
use rand::RngExt;
use serde::{Deserialize, Serialize};

use super::health::HealthTracker;

/// Success rate below which a model is marked degraded.
const DEGRADE_SUCCESS_RATE: f64 = 0.5;
/// Success rate at which a degraded model is restored.
const RESTORE_SUCCESS_RATE: f64 = 0.9;
/// Cooldown before a failure-degraded model is reconsidered as active.
const DEGRADED_COOLDOWN: Duration = Duration::from_secs(30);

/// Weights for the adaptive strategy's blended score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWeights {
    /// Weight on inverse p50 latency
    pub latency: f64,
    /// Weight on success rate
    pub success: f64,
    /// Weight on inverse blended cost
    pub cost: f64,
    /// Weight on remaining daily budget ratio
    pub budget: f64,
}

impl Default for AdaptiveWeights {
    fn default() -> Self {
        Self {
            latency: 0.3,
            success: 0.3,
            cost: 0.2,
            budget: 0.2,
        }
    }
}

struct ModelState {
    descriptor: RwLock<ModelDescriptor>,
    health: HealthTracker,
    degraded_until: Mutex<Option<Instant>>,
}

/// Load balancer over the configured models (C5).
pub struct ModelRouter {
    models: DashMap<ModelId, Arc<ModelState>>,
    strategy: RouteStrategy,
    weights: AdaptiveWeights,
    limiter: Arc<dyn RateLimiterProvider>,
    rr_cursor: AtomicUsize,
}

impl ModelRouter {
    /// Create a router over the configured model descriptors.
    pub fn new(
        descriptors: Vec<ModelDescriptor>,
        strategy: RouteStrategy,
        weights: AdaptiveWeights,
        limiter: Arc<dyn RateLimiterProvider>,
    ) -> Self {
        let models = DashMap::new();
        for descriptor in descriptors {
            models.insert(
                descriptor.model_id.clone(),
                Arc::new(ModelState {
                    descriptor: RwLock::new(descriptor),
                    health: HealthTracker::new(),
                    degraded_until: Mutex::new(None),
                }),
            );
        }
        Self {
            models,
            strategy,
            weights,
            limiter,
            rr_cursor: AtomicUsize::new(0),
        }
    }

    /// Strategy this router applies.
    #[must_use]
    pub fn strategy(&self) -> RouteStrategy {
        self.strategy
    }

    /// Current descriptor for a model, health included.
    #[must_use]
    pub fn descriptor(&self, model: &ModelId) -> Option<ModelDescriptor> {
        let state = self.models.get(model)?;
        let descriptor = state.descriptor.read().ok()?.clone();
        Some(descriptor)
    }

    /// Snapshot of every configured model with live health estimates.
    #[must_use]
    pub fn health_report(&self) -> Vec<ModelDescriptor> {
        let mut out: Vec<ModelDescriptor> = self
            .models
            .iter()
            .filter_map(|entry| {
                let mut descriptor = entry.value().descriptor.read().ok()?.clone();
                descriptor.health = entry.value().health.snapshot();
                Some(descriptor)
            })
            .collect();
        out.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        out
    }

    /// Pick an eligible, admissible model for one attempt.
    ///
    /// Filters by capability and `status ∈ {active, degraded}`, drops
    /// already-tried models, peeks at the rate limiter without consuming
    /// budget, then applies the configured strategy. `None` iff no model
    /// is admissible right now.
    pub async fn select(
        &self,
        capability: Capability,
        hint: Option<&ModelId>,
        tried: &HashSet<ModelId>,
        estimated_tokens: u64,
    ) -> Option<ModelId> {
        let mut candidates: Vec<(ModelId, ModelDescriptor)> = Vec::new();
        for entry in self.models.iter() {
            self.restore_if_cooled(entry.value());
            let Ok(descriptor) = entry.value().descriptor.read() else {
                continue;
            };
            if !descriptor.has_capability(capability)
                || !descriptor.is_selectable()
                || tried.contains(&descriptor.model_id)
            {
                continue;
            }
            let mut descriptor = descriptor.clone();
            descriptor.health = entry.value().health.snapshot();
            candidates.push((descriptor.model_id.clone(), descriptor));
        }
        if candidates.is_empty() {
            return None;
        }

        // Admission peek: skip models whose windows are exhausted.
        let mut admissible = Vec::with_capacity(candidates.len());
        for (model_id, descriptor) in candidates {
            match self.limiter.would_admit(&model_id, estimated_tokens).await {
                Ok(true) => admissible.push((model_id, descriptor)),
                Ok(false) => {}
                Err(e) => {
                    novellus_domain::warn!("router", "admission peek failed", &e);
                }
            }
        }
        if admissible.is_empty() {
            return None;
        }

        if let Some(hint) = hint {
            if let Some((model_id, _)) = admissible.iter().find(|(id, _)| id == hint) {
                return Some(model_id.clone());
            }
        }

        admissible.sort_by(|(a, _), (b, _)| a.cmp(b));
        Some(self.apply_strategy(&admissible).await)
    }

    async fn apply_strategy(&self, admissible: &[(ModelId, ModelDescriptor)]) -> ModelId {
        match self.strategy {
            RouteStrategy::RoundRobin => {
                let index = self.rr_cursor.fetch_add(1, Ordering::Relaxed) % admissible.len();
                admissible[index].0.clone()
            }
            RouteStrategy::WeightedRandom => {
                let weights: Vec<f64> = admissible
                    .iter()
                    .map(|(_, d)| f64::from(d.priority.max(1)))
                    .collect();
                let total: f64 = weights.iter().sum();
                let mut roll = rand::rng().random_range(0.0..total);
                for (i, weight) in weights.iter().enumerate() {
                    if roll < *weight {
                        return admissible[i].0.clone();
                    }
                    roll -= weight;
                }
                admissible[admissible.len() - 1].0.clone()
            }
            RouteStrategy::LeastLatency => admissible
                .iter()
                .min_by(|(_, a), (_, b)| a.health.p50_latency_ms.total_cmp(&b.health.p50_latency_ms))
                .map(|(id, _)| id.clone())
                .unwrap_or_else(|| admissible[0].0.clone()),
            RouteStrategy::CostOptimized => admissible
                .iter()
                .min_by(|(_, a), (_, b)| {
                    a.cost
                        .blended()
                        .total_cmp(&b.cost.blended())
                        .then_with(|| b.priority.cmp(&a.priority))
                })
                .map(|(id, _)| id.clone())
                .unwrap_or_else(|| admissible[0].0.clone()),
            RouteStrategy::Adaptive => {
                let mut best: Option<(f64, &ModelId)> = None;
                for (model_id, descriptor) in admissible {
                    let score = self.adaptive_score(model_id, descriptor).await;
                    if best.is_none_or(|(s, _)| score > s) {
                        best = Some((score, model_id));
                    }
                }
                best.map_or_else(|| admissible[0].0.clone(), |(_, id)| id.clone())
            }
        }
    }

    /// `s = w_lat·(1/latency) + w_succ·success + w_cost·(1/cost) + w_budget·budget_ratio`
    async fn adaptive_score(&self, model_id: &ModelId, descriptor: &ModelDescriptor) -> f64 {
        let health = &descriptor.health;
        let latency_term = 1.0 / health.p50_latency_ms.max(1.0);
        let cost_term = 1.0 / descriptor.cost.blended().max(1e-9);

        let budget_ratio = if descriptor.rate_limits.rpd == 0 {
            1.0
        } else {
            match self.limiter.usage(model_id).await {
                Ok(Some(usage)) => {
                    let limit = f64::from(descriptor.rate_limits.rpd);
                    ((limit - usage.requests_today as f64) / limit).clamp(0.0, 1.0)
                }
                Ok(None) | Err(_) => 1.0,
            }
        };

        self.weights.latency * latency_term
            + self.weights.success * health.success_rate
            + self.weights.cost * cost_term
            + self.weights.budget * budget_ratio
    }

    /// Record one call outcome and fold it into status.
    pub fn record_outcome(&self, model: &ModelId, latency: Duration, ok: bool) {
        let Some(state) = self.models.get(model) else {
            return;
        };
        state
            .health
            .record(latency.as_secs_f64() * 1000.0, ok);
        let health = state.health.snapshot();

        let Ok(mut descriptor) = state.descriptor.write() else {
            return;
        };
        descriptor.health = health;
        match descriptor.status {
            ModelStatus::Active if !ok && health.success_rate < DEGRADE_SUCCESS_RATE => {
                descriptor.status = ModelStatus::Degraded;
                if let Ok(mut until) = state.degraded_until.lock() {
                    *until = Some(Instant::now() + DEGRADED_COOLDOWN);
                }
                novellus_domain::warn!(
                    "router",
                    "model degraded",
                    &format!(
                        "model = {model}, success_rate = {:.2}",
                        health.success_rate
                    )
                );
            }
            ModelStatus::Degraded if ok && health.success_rate >= RESTORE_SUCCESS_RATE => {
                descriptor.status = ModelStatus::Active;
                if let Ok(mut until) = state.degraded_until.lock() {
                    *until = None;
                }
            }
            ModelStatus::Active | ModelStatus::Degraded | ModelStatus::Disabled => {}
        }
    }

    /// Degrade a model for a bounded window (rate-limit overdraw, provider
    /// backpressure).
    pub fn mark_degraded_for(&self, model: &ModelId, cooldown: Duration) {
        let Some(state) = self.models.get(model) else {
            return;
        };
        if let Ok(mut descriptor) = state.descriptor.write() {
            if descriptor.status == ModelStatus::Active {
                descriptor.status = ModelStatus::Degraded;
            }
        }
        if let Ok(mut until) = state.degraded_until.lock() {
            *until = Some(Instant::now() + cooldown);
        }
    }

    fn restore_if_cooled(&self, state: &ModelState) {
        let expired = state
            .degraded_until
            .lock()
            .ok()
            .is_some_and(|until| until.is_some_and(|t| Instant::now() >= t));
        if !expired {
            return;
        }
        if let Ok(mut descriptor) = state.descriptor.write() {
            if descriptor.status == ModelStatus::Degraded {
                descriptor.status = ModelStatus::Active;
            }
        }
        if let Ok(mut until) = state.degraded_until.lock() {
            *until = None;
        }
    }
}
