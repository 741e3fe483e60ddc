//! In-process rate limiter
//!
//! Token buckets per model for the three canonical windows: requests/min,
//! tokens/min, requests/day. Refill rates derive from the declared limits.
//! Acquisition is non-blocking and atomic per model (one async mutex per
//! model's buckets). A declared limit of 0 means "unlimited" for that
//! window.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use novellus_domain::entities::RateLimits;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::{Admission, RateLimiterProvider, RateUsage};
use novellus_domain::registry::rate_limiter::{
    RATE_LIMITER_PROVIDERS, RateLimiterProviderConfig, RateLimiterProviderEntry,
};
use novellus_domain::value_objects::ModelId;
use tokio::sync::Mutex;

const MINUTE_SECS: f64 = 60.0;
const DAY_SECS: f64 = 86_400.0;

#[derive(Debug)]
struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(limit: u64, window_secs: f64, now: Instant) -> Option<Self> {
        if limit == 0 {
            return None;
        }
        let capacity = limit as f64;
        Some(Self {
            capacity,
            tokens: capacity,
            refill_per_sec: capacity / window_secs,
            last_refill: now,
        })
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Seconds until `amount` tokens are available; 0 when available now.
    fn wait_for(&self, amount: f64) -> f64 {
        if self.tokens >= amount {
            0.0
        } else {
            (amount - self.tokens) / self.refill_per_sec
        }
    }

    fn take(&mut self, amount: f64) {
        self.tokens -= amount;
    }

    fn consumed(&self) -> u64 {
        (self.capacity - self.tokens).max(0.0).round() as u64
    }
}

#[derive(Debug)]
struct ModelBuckets {
    rpm: Option<TokenBucket>,
    tpm: Option<TokenBucket>,
    rpd: Option<TokenBucket>,
}

impl ModelBuckets {
    fn new(limits: RateLimits, now: Instant) -> Self {
        Self {
            rpm: TokenBucket::new(u64::from(limits.rpm), MINUTE_SECS, now),
            tpm: TokenBucket::new(u64::from(limits.tpm), MINUTE_SECS, now),
            rpd: TokenBucket::new(u64::from(limits.rpd), DAY_SECS, now),
        }
    }

    fn refill(&mut self, now: Instant) {
        for bucket in [&mut self.rpm, &mut self.tpm, &mut self.rpd]
            .into_iter()
            .flatten()
        {
            bucket.refill(now);
        }
    }

    /// Longest wait across the three windows for one request of
    /// `estimated_tokens`; 0 means admissible now.
    fn wait_secs(&self, estimated_tokens: u64) -> f64 {
        let mut wait = 0.0_f64;
        if let Some(rpm) = &self.rpm {
            wait = wait.max(rpm.wait_for(1.0));
        }
        if let Some(tpm) = &self.tpm {
            wait = wait.max(tpm.wait_for(estimated_tokens as f64));
        }
        if let Some(rpd) = &self.rpd {
            wait = wait.max(rpd.wait_for(1.0));
        }
        wait
    }

    fn take(&mut self, estimated_tokens: u64) {
        if let Some(rpm) = &mut self.rpm {
            rpm.take(1.0);
        }
        if let Some(tpm) = &mut self.tpm {
            tpm.take(estimated_tokens as f64);
        }
        if let Some(rpd) = &mut self.rpd {
            rpd.take(1.0);
        }
    }

    fn usage(&self) -> RateUsage {
        RateUsage {
            requests_this_minute: self.rpm.as_ref().map_or(0, TokenBucket::consumed),
            tokens_this_minute: self.tpm.as_ref().map_or(0, TokenBucket::consumed),
            requests_today: self.rpd.as_ref().map_or(0, TokenBucket::consumed),
            overdrawn: self.tpm.as_ref().is_some_and(|b| b.tokens < 0.0),
        }
    }
}

/// Token-bucket rate limiter for single-process deployments.
pub struct LocalRateLimiter {
    buckets: DashMap<ModelId, Arc<Mutex<ModelBuckets>>>,
}

impl Default for LocalRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRateLimiter {
    /// Create an empty limiter; models register at boot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    fn model_buckets(&self, model: &ModelId) -> Result<Arc<Mutex<ModelBuckets>>> {
        self.buckets
            .get(model)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::unknown_model(model.as_str()))
    }

    fn retry_at(wait_secs: f64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::milliseconds((wait_secs * 1000.0).ceil() as i64)
    }
}

#[async_trait]
impl RateLimiterProvider for LocalRateLimiter {
    async fn register_model(&self, model: &ModelId, limits: RateLimits) -> Result<()> {
        self.buckets.insert(
            model.clone(),
            Arc::new(Mutex::new(ModelBuckets::new(limits, Instant::now()))),
        );
        Ok(())
    }

    async fn try_acquire(&self, model: &ModelId, estimated_tokens: u64) -> Result<Admission> {
        let buckets = self.model_buckets(model)?;
        let mut buckets = buckets.lock().await;
        buckets.refill(Instant::now());

        let wait = buckets.wait_secs(estimated_tokens);
        if wait > 0.0 {
            return Ok(Admission::Denied {
                retry_at: Self::retry_at(wait),
            });
        }
        buckets.take(estimated_tokens);
        Ok(Admission::Admitted)
    }

    async fn would_admit(&self, model: &ModelId, estimated_tokens: u64) -> Result<bool> {
        let buckets = self.model_buckets(model)?;
        let mut buckets = buckets.lock().await;
        buckets.refill(Instant::now());
        Ok(buckets.wait_secs(estimated_tokens) == 0.0)
    }

    async fn reconcile(
        &self,
        model: &ModelId,
        estimated_tokens: u64,
        actual_tokens: u64,
    ) -> Result<RateUsage> {
        let buckets = self.model_buckets(model)?;
        let mut buckets = buckets.lock().await;
        buckets.refill(Instant::now());

        // Estimates may under-count; charge the difference. Overpaid
        // estimates are refunded.
        let delta = actual_tokens as f64 - estimated_tokens as f64;
        if let Some(tpm) = &mut buckets.tpm {
            tpm.take(delta);
            tpm.tokens = tpm.tokens.min(tpm.capacity);
        }
        Ok(buckets.usage())
    }

    async fn usage(&self, model: &ModelId) -> Result<Option<RateUsage>> {
        let Some(entry) = self.buckets.get(model) else {
            return Ok(None);
        };
        let buckets = Arc::clone(entry.value());
        drop(entry);
        let mut buckets = buckets.lock().await;
        buckets.refill(Instant::now());
        Ok(Some(buckets.usage()))
    }

    fn provider_name(&self) -> &str {
        "local"
    }
}

fn local_rate_limiter_factory(
    _config: &RateLimiterProviderConfig,
) -> std::result::Result<Arc<dyn RateLimiterProvider>, String> {
    Ok(Arc::new(LocalRateLimiter::new()))
}

#[linkme::distributed_slice(RATE_LIMITER_PROVIDERS)]
static LOCAL_PROVIDER: RateLimiterProviderEntry = RateLimiterProviderEntry {
    name: "local",
    description: "In-process token-bucket rate limiter",
    build: local_rate_limiter_factory,
};
