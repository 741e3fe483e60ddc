//! Unit tests for the in-memory semantic cache: exact and semantic hits,
//! per-entry thresholds, TTL, convergence under concurrent puts, and
//! eviction ordering.

use std::sync::Arc;
use std::time::Duration;

use novellus_domain::ports::providers::{CacheLookup, CachePut, SemanticCacheProvider};
use novellus_providers::semantic_cache::InMemorySemanticCache;

const DIM: usize = 4;

/// Unit vector at angle `theta` in the first two dimensions. Cosine
/// against `angle(0.0)` is `cos(theta)`.
fn angle(theta: f64) -> Vec<f32> {
    let mut v = vec![0.0_f32; DIM];
    v[0] = theta.cos() as f32;
    v[1] = theta.sin() as f32;
    v
}

fn put(query: &str, vector: Vec<f32>, content: &str, threshold: f64) -> CachePut {
    CachePut {
        query_text: query.to_owned(),
        query_vector: vector,
        payload: serde_json::json!({"content": content}),
        metadata: serde_json::json!({}),
        ttl: Some(Duration::from_secs(60)),
        similarity_threshold: threshold,
    }
}

#[tokio::test]
async fn exact_hit_matches_normalized_query() {
    let cache = InMemorySemanticCache::new(DIM);
    cache
        .put(put("Hello   World", angle(0.0), "cached", 0.99))
        .await
        .unwrap();

    // Different spacing and case, same normalized hash.
    let lookup = cache.lookup("hello world", &angle(1.5)).await.unwrap();
    assert!(matches!(lookup, CacheLookup::ExactHit(_)));

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.total_hits, 2); // put seeds 1, lookup bumps to 2
}

#[tokio::test]
async fn semantic_hit_respects_per_entry_threshold() {
    let cache = InMemorySemanticCache::new(DIM);
    cache
        .put(put("seed query", angle(0.0), "cached", 0.9))
        .await
        .unwrap();

    // cos(0.56) ≈ 0.847 < 0.9: miss.
    let low = cache.lookup("near miss", &angle(0.56)).await.unwrap();
    assert!(matches!(low, CacheLookup::Miss));

    // cos(0.40) ≈ 0.921 >= 0.9: hit.
    let high = cache.lookup("near hit", &angle(0.40)).await.unwrap();
    match high {
        CacheLookup::SemanticHit {
            response,
            similarity,
        } => {
            assert!(similarity >= 0.9);
            assert_eq!(response.payload["content"], "cached");
        }
        other => panic!("expected semantic hit, got {other:?}"),
    }
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let cache = InMemorySemanticCache::new(DIM);
    let mut entry = put("short lived", angle(0.0), "cached", 0.8);
    entry.ttl = Some(Duration::from_millis(20));
    cache.put(entry).await.unwrap();

    assert!(
        cache
            .lookup("short lived", &angle(0.0))
            .await
            .unwrap()
            .is_hit()
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    let lookup = cache.lookup("short lived", &angle(0.0)).await.unwrap();
    assert!(matches!(lookup, CacheLookup::Miss));

    let swept = cache.sweep_expired(100).await.unwrap();
    assert_eq!(swept, 1);
    assert_eq!(cache.stats().await.unwrap().entries, 0);
}

#[tokio::test]
async fn concurrent_puts_converge_to_one_entry() {
    let cache = Arc::new(InMemorySemanticCache::new(DIM));

    let mut handles = Vec::new();
    for i in 0..8 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            cache
                .put(put(
                    "race query",
                    angle(0.0),
                    &format!("response {i}"),
                    0.9,
                ))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stats = cache.stats().await.unwrap();
    assert_eq!(stats.entries, 1);
    // Hit counting tolerates double-counting but never under-counts inserts.
    assert!(stats.total_hits >= 8);

    // The surviving payload is one of the inputs.
    match cache.lookup("race query", &angle(0.0)).await.unwrap() {
        CacheLookup::ExactHit(response) => {
            let content = response.payload["content"].as_str().unwrap();
            assert!(content.starts_with("response "));
        }
        other => panic!("expected exact hit, got {other:?}"),
    }
}

#[tokio::test]
async fn eviction_removes_lowest_value_entries_first() {
    let cache = InMemorySemanticCache::new(DIM);
    cache
        .put(put("popular", angle(0.0), "a", 0.99))
        .await
        .unwrap();
    cache.put(put("cold", angle(1.0), "b", 0.99)).await.unwrap();
    cache
        .put(put("lukewarm", angle(0.5), "c", 0.99))
        .await
        .unwrap();

    // Drive hit counts apart.
    for _ in 0..5 {
        cache.lookup("popular", &angle(0.0)).await.unwrap();
    }
    cache.lookup("lukewarm", &angle(0.5)).await.unwrap();

    let evicted = cache.evict_to_capacity(2).await.unwrap();
    assert_eq!(evicted, 1);

    assert!(matches!(
        cache.lookup("cold", &angle(1.0)).await.unwrap(),
        CacheLookup::Miss
    ));
    assert!(cache.lookup("popular", &angle(0.0)).await.unwrap().is_hit());
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let cache = InMemorySemanticCache::new(DIM);
    let err = cache.lookup("q", &[0.0; DIM + 2]).await.unwrap_err();
    assert!(matches!(
        err,
        novellus_domain::Error::Dimension { .. }
    ));
}
