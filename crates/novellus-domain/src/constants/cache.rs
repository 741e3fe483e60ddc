//! Semantic cache defaults.

/// Default entry lifetime in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default per-entry similarity threshold for semantic hits.
pub const DEFAULT_CACHE_SIMILARITY_THRESHOLD: f64 = 0.85;

/// Default capacity ceiling before eviction kicks in.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Expired entries deleted per sweep batch when the caller does not say.
pub const DEFAULT_SWEEP_BATCH: usize = 500;
