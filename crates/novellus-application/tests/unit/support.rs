//! Shared fixtures for application-layer tests.

use std::sync::Arc;

use novellus_application::{AdaptiveWeights, ModelRouter};
use novellus_domain::entities::{ModelCost, ModelDescriptor, ModelHealth, RateLimits};
use novellus_domain::ports::providers::RateLimiterProvider;
use novellus_domain::value_objects::{Capability, ModelId, ModelStatus, RouteStrategy};
use novellus_providers::rate_limit::LocalRateLimiter;

pub fn descriptor(
    model_id: &str,
    provider: &str,
    input_cost: f64,
    priority: i32,
    limits: RateLimits,
) -> ModelDescriptor {
    ModelDescriptor {
        model_id: ModelId::from(model_id),
        provider: provider.to_owned(),
        capabilities: vec![Capability::Completion, Capability::Chat],
        context_window: 8192,
        max_output_tokens: 1024,
        cost: ModelCost {
            input_per_token: input_cost,
            output_per_token: input_cost * 2.0,
        },
        rate_limits: limits,
        priority,
        status: ModelStatus::Active,
        health: ModelHealth::default(),
        timeout_ms: None,
    }
}

pub fn unlimited() -> RateLimits {
    RateLimits {
        rpm: 0,
        tpm: 0,
        rpd: 0,
    }
}

pub async fn limiter_for(models: &[ModelDescriptor]) -> Arc<LocalRateLimiter> {
    let limiter = Arc::new(LocalRateLimiter::new());
    for model in models {
        limiter
            .register_model(&model.model_id, model.rate_limits)
            .await
            .expect("register model");
    }
    limiter
}

pub async fn router_for(
    models: Vec<ModelDescriptor>,
    strategy: RouteStrategy,
) -> (Arc<ModelRouter>, Arc<LocalRateLimiter>) {
    let limiter = limiter_for(&models).await;
    let router = Arc::new(ModelRouter::new(
        models,
        strategy,
        AdaptiveWeights::default(),
        Arc::clone(&limiter) as Arc<dyn RateLimiterProvider>,
    ));
    (router, limiter)
}
