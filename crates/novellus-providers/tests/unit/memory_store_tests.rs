//! Unit tests for the in-memory vector store: insert uniqueness, search
//! ordering, specialized searches, and the dimension guard.

use chrono::Utc;
use novellus_domain::entities::{CharacterProfile, LawChainProfile, NewEmbeddingRecord};
use novellus_domain::error::Error;
use novellus_domain::ports::providers::VectorStoreProvider;
use novellus_domain::value_objects::{
    ChainAspect, ChainId, ChainSearchOptions, CharacterId, ContentKind, Metric, ProfileAspect,
    SearchOptions,
};
use novellus_providers::vector_store::InMemoryVectorStore;

const DIM: usize = 4;

/// Unit vector at angle `theta` (radians) in the first two dimensions,
/// zero elsewhere. Cosine against `angle(0.0)` is `cos(theta)`.
fn angle(theta: f64) -> Vec<f32> {
    let mut v = vec![0.0_f32; DIM];
    v[0] = theta.cos() as f32;
    v[1] = theta.sin() as f32;
    v
}

fn record(content_id: &str, text: &str, vector: Vec<f32>) -> NewEmbeddingRecord {
    NewEmbeddingRecord::from_text(content_id, ContentKind::Text, text, vector, "test-model", 1)
}

#[tokio::test]
async fn insert_enforces_uniqueness_triple() {
    let store = InMemoryVectorStore::new(DIM);

    let first = store
        .insert(record("c1", "命运链能够预见概率", angle(0.0)))
        .await
        .unwrap();
    assert!(first.inserted);

    // Same content, same model, same version: existing row returned unchanged.
    let second = store
        .insert(record("c1-again", "命运链能够预见概率", angle(0.4)))
        .await
        .unwrap();
    assert!(!second.inserted);
    assert_eq!(second.record.record_id, first.record.record_id);
    assert_eq!(second.record.embedding, first.record.embedding);

    // Bumped embedding version is a distinct record.
    let mut v2 = record("c1", "命运链能够预见概率", angle(0.0));
    v2.embedding_version = 2;
    let third = store.insert(v2).await.unwrap();
    assert!(third.inserted);
    assert_ne!(third.record.record_id, first.record.record_id);
}

#[tokio::test]
async fn dimension_mismatch_is_fatal_and_writes_nothing() {
    let store = InMemoryVectorStore::new(1536);

    let err = store
        .insert(record("c1", "wrong dims", vec![0.0; 768]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Dimension {
            expected: 1536,
            actual: 768
        }
    ));
    assert_eq!(store.stats().await.unwrap().record_count, 0);

    let err = store
        .search_similar(&vec![0.0; 768], &SearchOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Dimension { .. }));
}

#[tokio::test]
async fn empty_store_returns_empty_results() {
    let store = InMemoryVectorStore::new(DIM);
    let results = store
        .search_similar(&angle(0.0), &SearchOptions::default())
        .await
        .unwrap();
    assert!(results.is_empty());

    let matches = store
        .search_law_chain(&angle(0.0), &ChainSearchOptions::new(ChainAspect::Abilities))
        .await
        .unwrap();
    assert!(matches.is_empty());
}

#[tokio::test]
async fn threshold_separates_near_from_far() {
    // Scenario seed: the fate-chain text sits close to the query, the
    // causality-chain text far from it.
    let store = InMemoryVectorStore::new(DIM);
    store
        .insert(record("fate", "命运链能够预见概率", angle(0.35)))
        .await
        .unwrap();
    store
        .insert(record("causality", "因果链追溯责任", angle(1.4)))
        .await
        .unwrap();

    // Query "预见未来的能力" ~ angle 0: cos(0.35) ≈ 0.94, cos(1.4) ≈ 0.17.
    let results = store
        .search_similar(
            &angle(0.0),
            &SearchOptions::default().with_threshold(0.7).with_limit(10),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content_id, "fate");
    assert!(results[0].score >= 0.7);
}

#[tokio::test]
async fn results_are_ranked_and_bounded() {
    let store = InMemoryVectorStore::new(DIM);
    for (i, theta) in [0.1, 0.5, 0.9, 0.2, 0.7].into_iter().enumerate() {
        store
            .insert(record(&format!("c{i}"), &format!("text {i}"), angle(theta)))
            .await
            .unwrap();
    }

    let results = store
        .search_similar(
            &angle(0.0),
            &SearchOptions::default().with_threshold(0.0).with_limit(3),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    // Monotonically non-increasing scores.
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert_eq!(results[0].content_id, "c0");
}

#[tokio::test]
async fn l2_metric_ranks_ascending_by_distance() {
    let store = InMemoryVectorStore::new(DIM);
    store.insert(record("near", "near", angle(0.1))).await.unwrap();
    store.insert(record("far", "far", angle(1.2))).await.unwrap();

    let results = store
        .search_similar(
            &angle(0.0),
            &SearchOptions::default()
                .with_metric(Metric::L2)
                .with_threshold(10.0),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].content_id, "near");
    assert!(results[0].score <= results[1].score);
    assert!(results.iter().all(|r| r.score >= 0.0));
}

#[tokio::test]
async fn metadata_and_kind_filters_apply() {
    let store = InMemoryVectorStore::new(DIM);
    store
        .insert(
            record("scene-1", "scene text", angle(0.1))
                .with_metadata(serde_json::json!({"domain": "人域"})),
        )
        .await
        .unwrap();
    store
        .insert(NewEmbeddingRecord::from_text(
            "dialogue-1",
            ContentKind::Dialogue,
            "dialogue text",
            angle(0.15),
            "test-model",
            1,
        ))
        .await
        .unwrap();

    let by_kind = store
        .search_similar(
            &angle(0.0),
            &SearchOptions::default()
                .with_threshold(0.0)
                .with_content_kind(ContentKind::Dialogue),
        )
        .await
        .unwrap();
    assert_eq!(by_kind.len(), 1);
    assert_eq!(by_kind[0].content_id, "dialogue-1");

    let by_metadata = store
        .search_similar(
            &angle(0.0),
            &SearchOptions::default()
                .with_threshold(0.0)
                .with_metadata_filter("domain", serde_json::json!("人域")),
        )
        .await
        .unwrap();
    assert_eq!(by_metadata.len(), 1);
    assert_eq!(by_metadata[0].content_id, "scene-1");
}

fn chain(name: &str, description: Option<Vec<f32>>, overrides: &[(&str, f64)]) -> LawChainProfile {
    let now = Utc::now();
    LawChainProfile {
        chain_id: ChainId::from_name(name),
        novel_id: None,
        chain_name: name.to_owned(),
        description_embedding: description,
        abilities_embedding: None,
        combination_embedding: None,
        domain_affinity: vec![0.0; 9],
        cost_risk_profile: vec![0.0; 4],
        tags: vec!["天命".to_owned()],
        aspect_thresholds: overrides
            .iter()
            .map(|(k, v)| ((*k).to_owned(), *v))
            .collect(),
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn law_chain_search_honors_row_overrides_and_skips_null_vectors() {
    let store = InMemoryVectorStore::new(DIM);
    // cos(0.5) ≈ 0.88: above the caller's 0.7, below the row override 0.95.
    store
        .upsert_law_chain(chain("守序链", Some(angle(0.5)), &[("description", 0.95)]))
        .await
        .unwrap();
    store
        .upsert_law_chain(chain("混沌链", Some(angle(0.3)), &[]))
        .await
        .unwrap();
    // No description vector at all: silently excluded.
    store
        .upsert_law_chain(chain("虚无链", None, &[]))
        .await
        .unwrap();

    let matches = store
        .search_law_chain(
            &angle(0.0),
            &ChainSearchOptions::new(ChainAspect::Description).with_threshold(0.7),
        )
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].chain_name, "混沌链");
}

fn character(name: &str, decision: Option<Vec<f32>>) -> CharacterProfile {
    let now = Utc::now();
    CharacterProfile {
        character_id: CharacterId::from_name(name),
        novel_id: None,
        character_name: name.to_owned(),
        personality_embedding: None,
        skill_embedding: None,
        decision_embedding: decision,
        affinity_vector: vec![0.0; 16],
        tags: vec![],
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn behavior_prediction_excludes_target_and_buckets_confidence() {
    let store = InMemoryVectorStore::new(DIM);
    store
        .upsert_character_profile(character("林远", Some(angle(0.1))))
        .await
        .unwrap();
    store
        .upsert_character_profile(character("苏瑶", Some(angle(0.6))))
        .await
        .unwrap();

    let predictions = store
        .predict_character_behavior(
            CharacterId::from_name("林远"),
            &angle(0.0),
            ProfileAspect::Decision,
            0.7,
        )
        .await
        .unwrap();

    // The target's own near-identical profile never appears.
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].character_name, "苏瑶");
    // cos(0.6) ≈ 0.825 → bucket 0.85.
    assert_eq!(predictions[0].confidence, 0.85);
}

#[tokio::test]
async fn batch_similarity_preserves_query_order() {
    let store = InMemoryVectorStore::new(DIM);
    store.insert(record("a", "a", angle(0.0))).await.unwrap();
    store.insert(record("b", "b", angle(1.5))).await.unwrap();

    let matches = store
        .batch_similarity(&[angle(1.5), angle(0.0)], 0.9, 1)
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].query_index, 0);
    assert_eq!(matches[1].query_index, 1);
    assert!(matches.iter().all(|m| m.score >= 0.9));
}

#[tokio::test]
async fn search_logs_aggregate_by_type() {
    let store = InMemoryVectorStore::new(DIM);
    store.insert(record("a", "a", angle(0.2))).await.unwrap();
    for _ in 0..3 {
        store
            .search_similar(&angle(0.0), &SearchOptions::default())
            .await
            .unwrap();
    }

    let summary = store.search_log_summary().await.unwrap();
    let similarity = summary
        .iter()
        .find(|s| matches!(s.search_type, novellus_domain::value_objects::SearchType::Similarity))
        .unwrap();
    assert_eq!(similarity.count, 3);
    assert!(similarity.avg_execution_ms >= 0.0);
    assert!(similarity.p95_execution_ms >= 0.0);
}

#[tokio::test]
async fn reindex_triggers_on_doubling() {
    let store = InMemoryVectorStore::new(DIM);
    store.insert(record("r0", "t0", angle(0.1))).await.unwrap();
    assert!(store.reindex_if_grown().await.unwrap());

    // No growth: nothing to do.
    assert!(!store.reindex_if_grown().await.unwrap());

    store.insert(record("r1", "t1", angle(0.2))).await.unwrap();
    store.insert(record("r2", "t2", angle(0.3))).await.unwrap();
    assert!(store.reindex_if_grown().await.unwrap());
}

#[tokio::test]
async fn upsert_rejects_wrong_dimension_profiles() {
    let store = InMemoryVectorStore::new(DIM);
    let bad = chain("坏链", Some(vec![0.0; DIM + 1]), &[]);
    assert!(matches!(
        store.upsert_law_chain(bad).await.unwrap_err(),
        Error::Dimension { .. }
    ));
}
