#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::RateLimits;
use crate::error::Result;
use crate::value_objects::ModelId;

/// Outcome of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The request may proceed against the model now
    Admitted,
    /// Budget exhausted; earliest instant a retry could be admitted
    Denied {
        retry_at: DateTime<Utc>,
    },
}

impl Admission {
    /// Whether the request was admitted.
    #[must_use]
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted)
    }
}

/// Point-in-time snapshot of one model's window consumption.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RateUsage {
    /// Requests admitted in the current minute window
    pub requests_this_minute: u64,
    /// Tokens charged in the current minute window
    pub tokens_this_minute: u64,
    /// Requests admitted in the current day window
    pub requests_today: u64,
    /// Whether reconciliation overdrew a window (model degraded until the
    /// window refills)
    pub overdrawn: bool,
}

/// Rolling-window admission control and token accounting (C4).
///
/// Three token buckets per model — requests/minute, tokens/minute,
/// requests/day — with refill rates derived from the declared limits.
/// `try_acquire` is atomic per model and non-blocking. Pre-call token
/// estimates may under-count; `reconcile` charges the difference once
/// actual usage is known, and an overdraft marks the model degraded for
/// the remainder of that window.
#[async_trait]
pub trait RateLimiterProvider: Send + Sync {
    /// Register a model's declared limits. Called once per model at boot;
    /// re-registering replaces the limits and resets its buckets.
    async fn register_model(&self, model: &ModelId, limits: RateLimits) -> Result<()>;

    /// Try to admit one request with an estimated token charge.
    async fn try_acquire(&self, model: &ModelId, estimated_tokens: u64) -> Result<Admission>;

    /// Whether a request of this size would currently be admitted, without
    /// consuming any budget. Used by the router's admission filter.
    async fn would_admit(&self, model: &ModelId, estimated_tokens: u64) -> Result<bool>;

    /// Adjust counters from estimate to actual usage after the call.
    /// Returns the post-reconciliation usage snapshot (callers degrade the
    /// model while `overdrawn` is set).
    async fn reconcile(
        &self,
        model: &ModelId,
        estimated_tokens: u64,
        actual_tokens: u64,
    ) -> Result<RateUsage>;

    /// Current window consumption, when the model is registered.
    async fn usage(&self, model: &ModelId) -> Result<Option<RateUsage>>;

    fn provider_name(&self) -> &str;
}
