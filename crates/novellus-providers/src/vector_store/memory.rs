//! In-memory vector store
//!
//! Exact-scan implementation used by tests and single-node development.
//! Honors the full C2 contract: ordering, tie-breaks, NULL-vector
//! exclusion, uniqueness collisions, and search logging.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use novellus_domain::constants::search::{
    DEFAULT_SEARCH_LIMIT, MIN_IVFFLAT_LISTS, PRIMARY_LISTS_DIVISOR,
};
use novellus_domain::entities::{
    CharacterProfile, EmbeddingRecord, InsertOutcome, LawChainProfile, NewEmbeddingRecord,
    SearchLog,
};
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::VectorStoreProvider;
use novellus_domain::registry::vector_store::{
    VECTOR_STORE_PROVIDERS, VectorStoreProviderConfig, VectorStoreProviderEntry,
};
use novellus_domain::value_objects::{
    BatchMatch, BehaviorPrediction, ChainMatch, ChainSearchOptions, CharacterId, Metric,
    ProfileAspect, RecordId, ScoredRecord, SearchLogSummary, SearchOptions, SearchType, StoreStats,
    confidence_bucket, cosine_score, l2_distance,
};

type UniqueKey = (String, String, i32);

/// DashMap-backed exact-scan store.
pub struct InMemoryVectorStore {
    dimensions: usize,
    records: DashMap<RecordId, EmbeddingRecord>,
    by_unique: DashMap<UniqueKey, RecordId>,
    chains: DashMap<novellus_domain::value_objects::ChainId, LawChainProfile>,
    characters: DashMap<CharacterId, CharacterProfile>,
    search_logs: Mutex<Vec<SearchLog>>,
    // (row count at last build, lists) per simulated index
    index_state: Mutex<HashMap<&'static str, (u64, u64)>>,
}

impl InMemoryVectorStore {
    /// Create a store provisioned for one vector dimension.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            records: DashMap::new(),
            by_unique: DashMap::new(),
            chains: DashMap::new(),
            characters: DashMap::new(),
            search_logs: Mutex::new(Vec::new()),
            index_state: Mutex::new(HashMap::new()),
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::dimension(self.dimensions, vector.len()));
        }
        Ok(())
    }

    fn log_search(&self, log: SearchLog) {
        if let Ok(mut logs) = self.search_logs.lock() {
            logs.push(log);
        }
    }

    fn matches_filters(record: &EmbeddingRecord, options: &SearchOptions) -> bool {
        if let Some(kind) = options.content_kind {
            if record.content_kind != kind {
                return false;
            }
        }
        if let Some(novel_id) = options.novel_id {
            if record.novel_id != Some(novel_id) {
                return false;
            }
        }
        options.metadata_filters.iter().all(|(key, expected)| {
            record
                .metadata
                .get(key)
                .is_some_and(|actual| actual == expected)
        })
    }

    /// Sort per the C2 ordering contract and truncate.
    fn rank(mut rows: Vec<ScoredRecord>, metric: Metric, limit: usize) -> Vec<ScoredRecord> {
        rows.sort_by(|a, b| {
            let by_score = match metric {
                Metric::Cosine => b.score.total_cmp(&a.score),
                Metric::L2 => a.score.total_cmp(&b.score),
            };
            by_score
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        rows.truncate(limit);
        rows
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn insert(&self, record: NewEmbeddingRecord) -> Result<InsertOutcome> {
        self.check_dimensions(&record.embedding)?;

        let key = (
            record.content_hash.clone(),
            record.model_name.clone(),
            record.embedding_version,
        );
        if let Some(existing_id) = self.by_unique.get(&key) {
            if let Some(existing) = self.records.get(&existing_id) {
                return Ok(InsertOutcome {
                    record: existing.clone(),
                    inserted: false,
                });
            }
        }

        let now = Utc::now();
        let stored = EmbeddingRecord {
            record_id: RecordId::new(),
            content_id: record.content_id,
            content_kind: record.content_kind,
            content_hash: record.content_hash,
            content_text: record.content_text,
            metadata: record.metadata,
            embedding: record.embedding,
            model_name: record.model_name,
            embedding_version: record.embedding_version,
            novel_id: record.novel_id,
            chain_id: record.chain_id,
            character_id: record.character_id,
            scene_id: record.scene_id,
            created_at: now,
            updated_at: now,
        };
        self.by_unique.insert(key, stored.record_id);
        self.records.insert(stored.record_id, stored.clone());

        Ok(InsertOutcome {
            record: stored,
            inserted: true,
        })
    }

    async fn search_similar(
        &self,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredRecord>> {
        self.check_dimensions(query_vector)?;
        let started = Instant::now();

        let mut rows = Vec::new();
        for entry in self.records.iter() {
            let record = entry.value();
            if !Self::matches_filters(record, options) {
                continue;
            }
            let score = match options.metric {
                Metric::Cosine => cosine_score(query_vector, &record.embedding)?,
                Metric::L2 => l2_distance(query_vector, &record.embedding)?,
            };
            let qualifies = match options.metric {
                Metric::Cosine => score >= options.threshold,
                Metric::L2 => score <= options.threshold,
            };
            if !qualifies {
                continue;
            }
            rows.push(ScoredRecord {
                record_id: record.record_id,
                score,
                content_id: record.content_id.clone(),
                content_kind: record.content_kind,
                content_text: record.content_text.clone(),
                metadata: record.metadata.clone(),
                created_at: record.created_at,
            });
        }

        let ranked = Self::rank(rows, options.metric, options.limit);
        let scores: Vec<f64> = ranked.iter().map(|r| r.score).collect();
        self.log_search(SearchLog::record(
            SearchType::Similarity,
            query_vector.to_vec(),
            serde_json::json!({
                "metric": options.metric,
                "threshold": options.threshold,
                "limit": options.limit,
            }),
            &scores,
            started.elapsed().as_secs_f64() * 1000.0,
        ));
        Ok(ranked)
    }

    async fn search_law_chain(
        &self,
        query_vector: &[f32],
        options: &ChainSearchOptions,
    ) -> Result<Vec<ChainMatch>> {
        self.check_dimensions(query_vector)?;
        let started = Instant::now();

        let mut rows = Vec::new();
        for entry in self.chains.iter() {
            let chain = entry.value();
            if let Some(novel_id) = options.novel_id {
                if chain.novel_id != Some(novel_id) {
                    continue;
                }
            }
            // NULL aspect vectors are silently skipped.
            let Some(vector) = chain.aspect_vector(options.aspect) else {
                continue;
            };
            let score = cosine_score(query_vector, vector)?;
            if score < chain.effective_threshold(options.aspect, options.threshold) {
                continue;
            }
            rows.push((chain.created_at, ChainMatch {
                chain_id: chain.chain_id,
                chain_name: chain.chain_name.clone(),
                novel_id: chain.novel_id,
                aspect: options.aspect,
                score,
                tags: chain.tags.clone(),
            }));
        }

        rows.sort_by(|(a_created, a), (b_created, b)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b_created.cmp(a_created))
                .then_with(|| a.chain_id.cmp(&b.chain_id))
        });
        rows.truncate(options.limit);
        let matches: Vec<ChainMatch> = rows.into_iter().map(|(_, m)| m).collect();

        let scores: Vec<f64> = matches.iter().map(|m| m.score).collect();
        self.log_search(SearchLog::record(
            SearchType::Hybrid,
            query_vector.to_vec(),
            serde_json::json!({
                "aspect": options.aspect,
                "threshold": options.threshold,
                "limit": options.limit,
            }),
            &scores,
            started.elapsed().as_secs_f64() * 1000.0,
        ));
        Ok(matches)
    }

    async fn predict_character_behavior(
        &self,
        target: CharacterId,
        situation_vector: &[f32],
        aspect: ProfileAspect,
        threshold: f64,
    ) -> Result<Vec<BehaviorPrediction>> {
        self.check_dimensions(situation_vector)?;

        let mut rows = Vec::new();
        for entry in self.characters.iter() {
            let profile = entry.value();
            if profile.character_id == target {
                continue;
            }
            let Some(vector) = profile.aspect_vector(aspect) else {
                continue;
            };
            let score = cosine_score(situation_vector, vector)?;
            if score < threshold {
                continue;
            }
            rows.push((profile.created_at, BehaviorPrediction {
                character_id: profile.character_id,
                character_name: profile.character_name.clone(),
                aspect,
                score,
                confidence: confidence_bucket(score),
            }));
        }

        rows.sort_by(|(a_created, a), (b_created, b)| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b_created.cmp(a_created))
                .then_with(|| a.character_id.cmp(&b.character_id))
        });
        rows.truncate(DEFAULT_SEARCH_LIMIT);
        Ok(rows.into_iter().map(|(_, p)| p).collect())
    }

    async fn batch_similarity(
        &self,
        query_vectors: &[Vec<f32>],
        threshold: f64,
        per_query_limit: usize,
    ) -> Result<Vec<BatchMatch>> {
        let mut out = Vec::new();
        for (query_index, query) in query_vectors.iter().enumerate() {
            self.check_dimensions(query)?;
            let mut rows = Vec::new();
            for entry in self.records.iter() {
                let record = entry.value();
                let score = cosine_score(query, &record.embedding)?;
                if score >= threshold {
                    rows.push((record.created_at, record.record_id, score));
                }
            }
            rows.sort_by(|(a_created, a_id, a_score), (b_created, b_id, b_score)| {
                b_score
                    .total_cmp(a_score)
                    .then_with(|| b_created.cmp(a_created))
                    .then_with(|| a_id.cmp(b_id))
            });
            rows.truncate(per_query_limit);
            out.extend(rows.into_iter().map(|(_, record_id, score)| BatchMatch {
                query_index,
                record_id,
                score,
            }));
        }
        Ok(out)
    }

    async fn upsert_law_chain(&self, profile: LawChainProfile) -> Result<()> {
        for vector in [
            profile.description_embedding.as_deref(),
            profile.abilities_embedding.as_deref(),
            profile.combination_embedding.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            self.check_dimensions(vector)?;
        }
        self.chains.insert(profile.chain_id, profile);
        Ok(())
    }

    async fn upsert_character_profile(&self, profile: CharacterProfile) -> Result<()> {
        for vector in [
            profile.personality_embedding.as_deref(),
            profile.skill_embedding.as_deref(),
            profile.decision_embedding.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            self.check_dimensions(vector)?;
        }
        self.characters.insert(profile.character_id, profile);
        Ok(())
    }

    async fn reindex_if_grown(&self) -> Result<bool> {
        let row_count = self.records.len() as u64;
        let lists = (row_count / PRIMARY_LISTS_DIVISOR).max(MIN_IVFFLAT_LISTS);

        let mut state = self
            .index_state
            .lock()
            .map_err(|_| Error::storage("index state poisoned"))?;
        let rebuilt = match state.get("content_embeddings") {
            None => row_count > 0,
            Some(&(last_count, _)) => {
                row_count >= last_count.saturating_mul(2) || row_count * 2 <= last_count
            }
        };
        if rebuilt {
            state.insert("content_embeddings", (row_count, lists));
        }
        Ok(rebuilt)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let search_log_count = self
            .search_logs
            .lock()
            .map_err(|_| Error::storage("search log poisoned"))?
            .len() as u64;
        Ok(StoreStats {
            record_count: self.records.len() as u64,
            chain_count: self.chains.len() as u64,
            character_count: self.characters.len() as u64,
            search_log_count,
        })
    }

    async fn search_log_summary(&self) -> Result<Vec<SearchLogSummary>> {
        let logs = self
            .search_logs
            .lock()
            .map_err(|_| Error::storage("search log poisoned"))?;

        let mut grouped: HashMap<SearchType, Vec<f64>> = HashMap::new();
        for log in logs.iter() {
            grouped
                .entry(log.search_type)
                .or_default()
                .push(log.execution_time_ms);
        }

        let mut out: Vec<SearchLogSummary> = grouped
            .into_iter()
            .map(|(search_type, mut times)| {
                times.sort_by(f64::total_cmp);
                let count = times.len() as u64;
                let avg = times.iter().sum::<f64>() / times.len() as f64;
                let p95_index = ((times.len() as f64 * 0.95).ceil() as usize)
                    .saturating_sub(1)
                    .min(times.len() - 1);
                SearchLogSummary {
                    search_type,
                    count,
                    avg_execution_ms: avg,
                    p95_execution_ms: times[p95_index],
                }
            })
            .collect();
        out.sort_by_key(|s| s.search_type.to_string());
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "memory"
    }
}

fn memory_store_factory(
    config: &VectorStoreProviderConfig,
) -> std::result::Result<Arc<dyn VectorStoreProvider>, String> {
    let dimensions = config
        .dimensions
        .ok_or_else(|| "Memory vector store requires dimensions in config".to_owned())?;
    Ok(Arc::new(InMemoryVectorStore::new(dimensions)))
}

#[linkme::distributed_slice(VECTOR_STORE_PROVIDERS)]
static MEMORY_PROVIDER: VectorStoreProviderEntry = VectorStoreProviderEntry {
    name: "memory",
    description: "Exact-scan in-memory vector store for tests and development",
    build: memory_store_factory,
};
