//! Similarity search and index maintenance constants.

/// Minimum score a row must reach to qualify when the caller does not say.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Result cap when the caller does not say.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// ivfflat `lists` floor for any vector index.
pub const MIN_IVFFLAT_LISTS: u64 = 10;

/// Row-count divisor for `lists` on the primary embedding relation.
pub const PRIMARY_LISTS_DIVISOR: u64 = 1000;

/// Row-count divisor for `lists` on the smaller specialized relations.
pub const SPECIALIZED_LISTS_DIVISOR: u64 = 100;
