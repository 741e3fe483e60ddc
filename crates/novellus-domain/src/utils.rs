//! Common utilities shared by the store and cache layers.

use sha2::{Digest, Sha256};

/// SHA-256 hex digest of content for deduplication.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical form of a query for exact-hash cache matching: trimmed,
/// lowercased, inner whitespace collapsed to single spaces.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Hash of the normalized form of a query.
pub fn query_hash(query: &str) -> String {
    content_hash(&normalize_query(query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_sha256_hex() {
        let h = content_hash("hello");
        assert_eq!(h.len(), 64);
        assert_eq!(
            h,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn normalization_collapses_whitespace_and_case() {
        assert_eq!(normalize_query("  Hello   World\n"), "hello world");
    }

    #[test]
    fn equivalent_queries_hash_identically() {
        assert_eq!(query_hash("Hello  World"), query_hash("hello world"));
        assert_ne!(query_hash("hello world"), query_hash("hello worlds"));
    }
}
