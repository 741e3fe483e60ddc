//! Routing, retry, and token accounting constants.

/// Attempts per `complete` request when the caller does not say.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// First admission-wait backoff in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 100;

/// Admission-wait backoff ceiling in milliseconds.
pub const DEFAULT_MAX_BACKOFF_MS: u64 = 5_000;

/// Per-provider-call timeout in milliseconds.
pub const DEFAULT_PER_CALL_TIMEOUT_MS: u64 = 30_000;

/// Whole-request timeout in milliseconds.
pub const DEFAULT_PER_REQUEST_TIMEOUT_MS: u64 = 120_000;

/// Samples kept per model by the windowed latency/success estimator.
pub const HEALTH_WINDOW_SAMPLES: usize = 64;

/// Output-token weight in the cost-optimized blend
/// (`cost_in + BLEND * cost_out`): completions skew toward output tokens.
pub const COST_OUTPUT_BLEND: f64 = 3.0;

/// Characters per token for the pre-call estimate; reconciled with
/// provider-reported actuals after the call.
pub const TOKEN_ESTIMATE_CHARS_PER_TOKEN: usize = 4;
