//! Fail-fast validation of a loaded `AppConfig`.

use novellus_domain::error::{Error, Result};
use novellus_domain::value_objects::Capability;

use super::types::AppConfig;

/// Validate application configuration
///
/// Performs comprehensive validation of all configuration sections.
///
/// # Errors
///
/// Returns `ConfigInvalid` naming the offending key on the first failure.
pub fn validate_app_config(config: &AppConfig) -> Result<()> {
    validate_models(config)?;
    validate_embedding(config)?;
    validate_cache(config)?;
    validate_router(config)?;
    validate_backends(config)?;
    validate_timeouts(config)?;
    validate_retry(config)?;
    Ok(())
}

fn validate_models(config: &AppConfig) -> Result<()> {
    if config.models.is_empty() {
        return Err(Error::ConfigInvalid {
            key: "models".to_owned(),
            message: "at least one model must be configured".to_owned(),
        });
    }
    let mut seen = std::collections::HashSet::new();
    for model in &config.models {
        if model.model_id.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                key: "models.model_id".to_owned(),
                message: "model_id must not be empty".to_owned(),
            });
        }
        if model.provider.trim().is_empty() {
            return Err(Error::ConfigInvalid {
                key: "models.provider".to_owned(),
                message: format!("model '{}' has no provider", model.model_id),
            });
        }
        if !seen.insert(model.model_id.clone()) {
            return Err(Error::ConfigInvalid {
                key: "models.model_id".to_owned(),
                message: format!("duplicate model id '{}'", model.model_id),
            });
        }
    }
    if !config
        .models
        .iter()
        .any(|m| m.capabilities.contains(&Capability::Completion))
    {
        return Err(Error::ConfigInvalid {
            key: "models.capabilities".to_owned(),
            message: "at least one model must declare the completion capability".to_owned(),
        });
    }
    Ok(())
}

fn validate_embedding(config: &AppConfig) -> Result<()> {
    if config.embedding.dim == 0 {
        return Err(Error::ConfigInvalid {
            key: "embedding.dim".to_owned(),
            message: "embedding dimension must be positive".to_owned(),
        });
    }
    if config.embedding.batch_size == 0 {
        return Err(Error::ConfigInvalid {
            key: "embedding.batch_size".to_owned(),
            message: "batch size must be positive".to_owned(),
        });
    }
    Ok(())
}

fn validate_cache(config: &AppConfig) -> Result<()> {
    if config.cache.enabled && config.cache.default_ttl_secs == 0 {
        return Err(Error::ConfigInvalid {
            key: "cache.default_ttl_secs".to_owned(),
            message: "Cache TTL cannot be 0 when cache is enabled".to_owned(),
        });
    }
    if !(0.0..=1.0).contains(&config.cache.default_similarity_threshold) {
        return Err(Error::ConfigInvalid {
            key: "cache.default_similarity_threshold".to_owned(),
            message: "similarity threshold must be within [0, 1]".to_owned(),
        });
    }
    if config.cache.enabled && config.cache.sweep_batch == 0 {
        return Err(Error::ConfigInvalid {
            key: "cache.sweep_batch".to_owned(),
            message: "sweep batch cannot be 0 when cache is enabled".to_owned(),
        });
    }
    Ok(())
}

fn validate_router(config: &AppConfig) -> Result<()> {
    let weights = &config.router.adaptive_weights;
    let values = [weights.latency, weights.success, weights.cost, weights.budget];
    if values.iter().any(|w| *w < 0.0) {
        return Err(Error::ConfigInvalid {
            key: "router.adaptive_weights".to_owned(),
            message: "adaptive weights must be non-negative".to_owned(),
        });
    }
    if values.iter().sum::<f64>() == 0.0 {
        return Err(Error::ConfigInvalid {
            key: "router.adaptive_weights".to_owned(),
            message: "adaptive weights must not all be zero".to_owned(),
        });
    }
    Ok(())
}

fn validate_backends(config: &AppConfig) -> Result<()> {
    if config.vector_store.provider == "postgres" && config.vector_store.database_url.is_none() {
        return Err(Error::ConfigInvalid {
            key: "vector_store.database_url".to_owned(),
            message: "the postgres vector store requires database_url".to_owned(),
        });
    }
    if config.rate_limiter.provider == "redis" && config.rate_limiter.redis_url.is_none() {
        return Err(Error::ConfigInvalid {
            key: "rate_limiter.redis_url".to_owned(),
            message: "the redis rate limiter requires redis_url".to_owned(),
        });
    }
    if config.cache.provider == "postgres" && config.vector_store.database_url.is_none() {
        return Err(Error::ConfigInvalid {
            key: "cache.provider".to_owned(),
            message: "the postgres cache requires vector_store.database_url".to_owned(),
        });
    }
    Ok(())
}

fn validate_timeouts(config: &AppConfig) -> Result<()> {
    if config.timeouts.per_call_ms == 0 || config.timeouts.per_request_ms == 0 {
        return Err(Error::ConfigInvalid {
            key: "timeouts".to_owned(),
            message: "timeouts must be positive".to_owned(),
        });
    }
    Ok(())
}

fn validate_retry(config: &AppConfig) -> Result<()> {
    if config.retry.max_attempts == 0 {
        return Err(Error::ConfigInvalid {
            key: "retry.max_attempts".to_owned(),
            message: "at least one attempt is required".to_owned(),
        });
    }
    if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
        return Err(Error::ConfigInvalid {
            key: "retry.initial_backoff_ms".to_owned(),
            message: "initial backoff cannot exceed the backoff ceiling".to_owned(),
        });
    }
    Ok(())
}
