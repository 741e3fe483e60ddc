//! PostgreSQL + pgvector store
//!
//! All similarity queries are parameterized SQL built here, with vectors
//! bound as `$n::vector` literals. Reads retry once on transient pool
//! errors; writes never auto-retry. Index rebuilds run inside a
//! transaction so a failure leaves the previous index intact.

mod schema;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use novellus_domain::constants::search::{DEFAULT_SEARCH_LIMIT, MIN_IVFFLAT_LISTS};
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
    BatchMatch, BehaviorPrediction, ChainAspect, ChainMatch, ChainSearchOptions, CharacterId,
    ContentKind, Metric, ProfileAspect, RecordId, ScoredRecord, SearchLogSummary, SearchOptions,
    SearchType, StoreStats, confidence_bucket, vector_literal,
};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use self::schema::{ANN_INDICES, AnnIndex, store_ddl};
use super::parse_vector_literal;

const DEFAULT_MAX_CONNECTIONS: u32 = 8;

/// pgvector-backed vector store.
pub struct PgVectorStore {
    pool: PgPool,
    dimensions: usize,
}

fn storage_err(e: sqlx::Error) -> Error {
    Error::storage_with_source("postgres query failed", e)
}

fn is_transient(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut)
}

/// Run a read, retrying once on a transient backend error.
async fn retry_read<T, F, Fut>(mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    match op().await {
        Ok(value) => Ok(value),
        Err(e) if is_transient(&e) => op().await.map_err(storage_err),
        Err(e) => Err(storage_err(e)),
    }
}

fn parse_kind(raw: &str) -> Result<ContentKind> {
    ContentKind::from_str(raw.trim())
}

impl PgVectorStore {
    /// Create a store over a lazy connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is malformed.
    pub fn connect(
        database_url: &str,
        dimensions: usize,
        max_connections: Option<u32>,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .connect_lazy(database_url)
            .map_err(|e| Error::configuration_with_source("invalid postgres url", e))?;
        Ok(Self { pool, dimensions })
    }

    /// Build a store on an existing pool (tests, shared pools).
    #[must_use]
    pub fn with_pool(pool: PgPool, dimensions: usize) -> Self {
        Self { pool, dimensions }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::dimension(self.dimensions, vector.len()));
        }
        Ok(())
    }

    /// Fire-and-forget search log write; a failure never fails the search.
    async fn log_search(&self, log: SearchLog) {
        let result = sqlx::query(
            "INSERT INTO vector_search_logs
                (search_id, search_type, query_vector, params, result_count,
                 execution_time_ms, similarity_scores)
             VALUES ($1, $2, $3::vector, $4, $5, $6, $7)",
        )
        .bind(log.search_id.inner())
        .bind(log.search_type.to_string())
        .bind(vector_literal(&log.query_vector))
        .bind(&log.params)
        .bind(log.result_count)
        .bind(log.execution_time_ms)
        .bind(&log.similarity_scores)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            novellus_domain::warn!("vector_store", "search log write failed", &e);
        }
    }

    async fn fetch_existing(
        &self,
        content_hash: &str,
        model_name: &str,
        embedding_version: i32,
    ) -> Result<Option<EmbeddingRecord>> {
        let row = retry_read(|| {
            sqlx::query(
                "SELECT record_id, content_id, content_type, content_hash, content_text,
                        content_metadata, embedding::text AS embedding, model_name,
                        embedding_version, novel_id, chain_id, character_id, scene_id,
                        created_at, updated_at
                 FROM content_embeddings
                 WHERE content_hash = $1 AND model_name = $2 AND embedding_version = $3",
            )
            .bind(content_hash)
            .bind(model_name)
            .bind(embedding_version)
            .fetch_optional(&self.pool)
        })
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw_kind: String = row.try_get("content_type").map_err(storage_err)?;
        let raw_embedding: String = row.try_get("embedding").map_err(storage_err)?;
        let embedding = parse_vector_literal(&raw_embedding)
            .ok_or_else(|| Error::storage("unreadable embedding column"))?;
        let raw_hash: String = row.try_get("content_hash").map_err(storage_err)?;

        Ok(Some(EmbeddingRecord {
            record_id: RecordId::from_uuid(row.try_get("record_id").map_err(storage_err)?),
            content_id: row.try_get("content_id").map_err(storage_err)?,
            content_kind: parse_kind(&raw_kind)?,
            content_hash: raw_hash.trim().to_owned(),
            content_text: row.try_get("content_text").map_err(storage_err)?,
            metadata: row.try_get("content_metadata").map_err(storage_err)?,
            embedding,
            model_name: row.try_get("model_name").map_err(storage_err)?,
            embedding_version: row.try_get("embedding_version").map_err(storage_err)?,
            novel_id: row
                .try_get::<Option<Uuid>, _>("novel_id")
                .map_err(storage_err)?
                .map(Into::into),
            chain_id: row
                .try_get::<Option<Uuid>, _>("chain_id")
                .map_err(storage_err)?
                .map(Into::into),
            character_id: row
                .try_get::<Option<Uuid>, _>("character_id")
                .map_err(storage_err)?
                .map(Into::into),
            scene_id: row
                .try_get::<Option<Uuid>, _>("scene_id")
                .map_err(storage_err)?
                .map(Into::into),
            created_at: row.try_get("created_at").map_err(storage_err)?,
            updated_at: row.try_get("updated_at").map_err(storage_err)?,
        }))
    }

    async fn table_count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 =
            retry_read(|| sqlx::query_scalar(&sql).fetch_one(&self.pool)).await?;
        Ok(count as u64)
    }

    async fn build_index(&self, index: &AnnIndex, lists: u64, row_count: u64) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        sqlx::query(&format!("DROP INDEX IF EXISTS {}", index.name))
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        sqlx::query(&format!(
            "CREATE INDEX {name} ON {table} USING ivfflat ({column} {ops}) WITH (lists = {lists})",
            name = index.name,
            table = index.table,
            column = index.column,
            ops = index.ops,
        ))
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;
        sqlx::query(
            "INSERT INTO vector_index_state (index_name, row_count, lists, built_at)
             VALUES ($1, $2, $3, NOW())
             ON CONFLICT (index_name)
             DO UPDATE SET row_count = EXCLUDED.row_count, lists = EXCLUDED.lists,
                           built_at = NOW()",
        )
        .bind(index.name)
        .bind(row_count as i64)
        .bind(lists as i64)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;
        tx.commit().await.map_err(storage_err)
    }
}

#[async_trait]
impl VectorStoreProvider for PgVectorStore {
    async fn ensure_schema(&self) -> Result<()> {
        for statement in store_ddl(self.dimensions) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }

        // Initial ANN builds; later growth is handled by reindex_if_grown.
        for index in ANN_INDICES {
            let row_count = self.table_count(index.table).await?;
            let lists = (row_count / index.lists_divisor).max(MIN_IVFFLAT_LISTS);
            sqlx::query(&format!(
                "CREATE INDEX IF NOT EXISTS {name} ON {table}
                 USING ivfflat ({column} {ops}) WITH (lists = {lists})",
                name = index.name,
                table = index.table,
                column = index.column,
                ops = index.ops,
            ))
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
            sqlx::query(
                "INSERT INTO vector_index_state (index_name, row_count, lists)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (index_name) DO NOTHING",
            )
            .bind(index.name)
            .bind(row_count as i64)
            .bind(lists as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        }

        novellus_domain::info!(
            "vector_store",
            "schema ensured",
            &format!("dimensions = {}", self.dimensions)
        );
        Ok(())
    }

    async fn insert(&self, record: NewEmbeddingRecord) -> Result<InsertOutcome> {
        self.check_dimensions(&record.embedding)?;

        let inserted = sqlx::query(
            "INSERT INTO content_embeddings
                (content_id, content_type, content_hash, content_text, content_metadata,
                 embedding, model_name, embedding_version, novel_id, chain_id,
                 character_id, scene_id)
             VALUES ($1, $2, $3, $4, $5, $6::vector, $7, $8, $9, $10, $11, $12)
             ON CONFLICT (content_hash, model_name, embedding_version) DO NOTHING
             RETURNING record_id, created_at, updated_at",
        )
        .bind(&record.content_id)
        .bind(record.content_kind.as_str())
        .bind(&record.content_hash)
        .bind(&record.content_text)
        .bind(&record.metadata)
        .bind(vector_literal(&record.embedding))
        .bind(&record.model_name)
        .bind(record.embedding_version)
        .bind(record.novel_id.map(|id| id.inner()))
        .bind(record.chain_id.map(|id| id.inner()))
        .bind(record.character_id.map(|id| id.inner()))
        .bind(record.scene_id.map(|id| id.inner()))
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        if let Some(row) = inserted {
            let record_id: Uuid = row.try_get("record_id").map_err(storage_err)?;
            let created_at: DateTime<Utc> = row.try_get("created_at").map_err(storage_err)?;
            let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(storage_err)?;
            return Ok(InsertOutcome {
                record: EmbeddingRecord {
                    record_id: RecordId::from_uuid(record_id),
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
                    created_at,
                    updated_at,
                },
                inserted: true,
            });
        }

        // Lost the uniqueness race (or the row predates us): hand back the
        // winner unchanged.
        let existing = self
            .fetch_existing(
                &record.content_hash,
                &record.model_name,
                record.embedding_version,
            )
            .await?
            .ok_or_else(|| Error::storage("conflicting embedding row vanished"))?;
        Ok(InsertOutcome {
            record: existing,
            inserted: false,
        })
    }

    async fn search_similar(
        &self,
        query_vector: &[f32],
        options: &SearchOptions,
    ) -> Result<Vec<ScoredRecord>> {
        self.check_dimensions(query_vector)?;
        let started = Instant::now();

        let sql = match options.metric {
            Metric::Cosine => {
                "SELECT record_id, content_id, content_type, content_text, content_metadata,
                        created_at, 1 - (embedding <=> $1::vector) AS score
                 FROM content_embeddings
                 WHERE ($2::text IS NULL OR content_type = $2)
                   AND ($3::uuid IS NULL OR novel_id = $3)
                   AND ($4::jsonb IS NULL OR content_metadata @> $4)
                   AND 1 - (embedding <=> $1::vector) >= $5
                 ORDER BY score DESC, created_at DESC, record_id ASC
                 LIMIT $6"
            }
            Metric::L2 => {
                "SELECT record_id, content_id, content_type, content_text, content_metadata,
                        created_at, embedding <-> $1::vector AS score
                 FROM content_embeddings
                 WHERE ($2::text IS NULL OR content_type = $2)
                   AND ($3::uuid IS NULL OR novel_id = $3)
                   AND ($4::jsonb IS NULL OR content_metadata @> $4)
                   AND embedding <-> $1::vector <= $5
                 ORDER BY score ASC, created_at DESC, record_id ASC
                 LIMIT $6"
            }
        };

        let literal = vector_literal(query_vector);
        let kind_filter = options.content_kind.map(|k| k.as_str().to_owned());
        let novel_filter = options.novel_id.map(|id| id.inner());
        let metadata_filter = if options.metadata_filters.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(
                options
                    .metadata_filters
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ))
        };

        let rows = retry_read(|| {
            sqlx::query(sql)
                .bind(&literal)
                .bind(&kind_filter)
                .bind(novel_filter)
                .bind(&metadata_filter)
                .bind(options.threshold)
                .bind(options.limit as i64)
                .fetch_all(&self.pool)
        })
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_kind: String = row.try_get("content_type").map_err(storage_err)?;
            let score: f64 = row.try_get("score").map_err(storage_err)?;
            out.push(ScoredRecord {
                record_id: RecordId::from_uuid(row.try_get("record_id").map_err(storage_err)?),
                score: match options.metric {
                    Metric::Cosine => score.clamp(0.0, 1.0),
                    Metric::L2 => score,
                },
                content_id: row.try_get("content_id").map_err(storage_err)?,
                content_kind: parse_kind(&raw_kind)?,
                content_text: row.try_get("content_text").map_err(storage_err)?,
                metadata: row.try_get("content_metadata").map_err(storage_err)?,
                created_at: row.try_get("created_at").map_err(storage_err)?,
            });
        }

        let scores: Vec<f64> = out.iter().map(|r| r.score).collect();
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
        ))
        .await;
        Ok(out)
    }

    async fn search_law_chain(
        &self,
        query_vector: &[f32],
        options: &ChainSearchOptions,
    ) -> Result<Vec<ChainMatch>> {
        self.check_dimensions(query_vector)?;
        let started = Instant::now();

        let column = match options.aspect {
            ChainAspect::Description => "description_embedding",
            ChainAspect::Abilities => "abilities_embedding",
            ChainAspect::Combination => "combination_embedding",
        };
        // Per-row override can only raise the caller's threshold.
        let sql = format!(
            "SELECT chain_id, chain_name, novel_id, tags,
                    1 - ({column} <=> $1::vector) AS score
             FROM law_chain_embeddings
             WHERE {column} IS NOT NULL
               AND ($2::uuid IS NULL OR novel_id = $2)
               AND 1 - ({column} <=> $1::vector) >=
                   GREATEST(COALESCE((aspect_thresholds->>'{aspect}')::float8, 0), $3)
             ORDER BY score DESC, created_at DESC, chain_id ASC
             LIMIT $4",
            aspect = options.aspect.as_str(),
        );

        let literal = vector_literal(query_vector);
        let novel_filter = options.novel_id.map(|id| id.inner());
        let rows = retry_read(|| {
            sqlx::query(&sql)
                .bind(&literal)
                .bind(novel_filter)
                .bind(options.threshold)
                .bind(options.limit as i64)
                .fetch_all(&self.pool)
        })
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let score: f64 = row.try_get("score").map_err(storage_err)?;
            out.push(ChainMatch {
                chain_id: row
                    .try_get::<Uuid, _>("chain_id")
                    .map_err(storage_err)?
                    .into(),
                chain_name: row.try_get("chain_name").map_err(storage_err)?,
                novel_id: row
                    .try_get::<Option<Uuid>, _>("novel_id")
                    .map_err(storage_err)?
                    .map(Into::into),
                aspect: options.aspect,
                score: score.clamp(0.0, 1.0),
                tags: row.try_get("tags").map_err(storage_err)?,
            });
        }

        let scores: Vec<f64> = out.iter().map(|m| m.score).collect();
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
        ))
        .await;
        Ok(out)
    }

    async fn predict_character_behavior(
        &self,
        target: CharacterId,
        situation_vector: &[f32],
        aspect: ProfileAspect,
        threshold: f64,
    ) -> Result<Vec<BehaviorPrediction>> {
        self.check_dimensions(situation_vector)?;

        let column = match aspect {
            ProfileAspect::Personality => "personality_embedding",
            ProfileAspect::Skill => "skill_embedding",
            ProfileAspect::Decision => "decision_embedding",
        };
        let sql = format!(
            "SELECT character_id, character_name, 1 - ({column} <=> $1::vector) AS score
             FROM character_semantic_profiles
             WHERE {column} IS NOT NULL
               AND character_id <> $2
               AND 1 - ({column} <=> $1::vector) >= $3
             ORDER BY score DESC, created_at DESC, character_id ASC
             LIMIT $4",
        );

        let literal = vector_literal(situation_vector);
        let rows = retry_read(|| {
            sqlx::query(&sql)
                .bind(&literal)
                .bind(target.inner())
                .bind(threshold)
                .bind(DEFAULT_SEARCH_LIMIT as i64)
                .fetch_all(&self.pool)
        })
        .await?;

        rows.into_iter()
            .map(|row| {
                let score: f64 = row.try_get("score").map_err(storage_err)?;
                let score = score.clamp(0.0, 1.0);
                Ok(BehaviorPrediction {
                    character_id: row
                        .try_get::<Uuid, _>("character_id")
                        .map_err(storage_err)?
                        .into(),
                    character_name: row.try_get("character_name").map_err(storage_err)?,
                    aspect,
                    score,
                    confidence: confidence_bucket(score),
                })
            })
            .collect()
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
            let literal = vector_literal(query);
            let rows = retry_read(|| {
                sqlx::query(
                    "SELECT record_id, 1 - (embedding <=> $1::vector) AS score
                     FROM content_embeddings
                     WHERE 1 - (embedding <=> $1::vector) >= $2
                     ORDER BY score DESC, created_at DESC, record_id ASC
                     LIMIT $3",
                )
                .bind(&literal)
                .bind(threshold)
                .bind(per_query_limit as i64)
                .fetch_all(&self.pool)
            })
            .await?;

            for row in rows {
                let score: f64 = row.try_get("score").map_err(storage_err)?;
                out.push(BatchMatch {
                    query_index,
                    record_id: RecordId::from_uuid(
                        row.try_get("record_id").map_err(storage_err)?,
                    ),
                    score: score.clamp(0.0, 1.0),
                });
            }
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

        let thresholds = serde_json::to_value(&profile.aspect_thresholds)?;
        sqlx::query(
            "INSERT INTO law_chain_embeddings
                (chain_id, novel_id, chain_name, description_embedding,
                 abilities_embedding, combination_embedding, domain_affinity,
                 cost_risk_profile, tags, aspect_thresholds)
             VALUES ($1, $2, $3, $4::vector, $5::vector, $6::vector, $7, $8, $9, $10)
             ON CONFLICT (chain_id) DO UPDATE SET
                novel_id = EXCLUDED.novel_id,
                chain_name = EXCLUDED.chain_name,
                description_embedding = EXCLUDED.description_embedding,
                abilities_embedding = EXCLUDED.abilities_embedding,
                combination_embedding = EXCLUDED.combination_embedding,
                domain_affinity = EXCLUDED.domain_affinity,
                cost_risk_profile = EXCLUDED.cost_risk_profile,
                tags = EXCLUDED.tags,
                aspect_thresholds = EXCLUDED.aspect_thresholds,
                updated_at = NOW()",
        )
        .bind(profile.chain_id.inner())
        .bind(profile.novel_id.map(|id| id.inner()))
        .bind(&profile.chain_name)
        .bind(profile.description_embedding.as_deref().map(vector_literal))
        .bind(profile.abilities_embedding.as_deref().map(vector_literal))
        .bind(profile.combination_embedding.as_deref().map(vector_literal))
        .bind(&profile.domain_affinity)
        .bind(&profile.cost_risk_profile)
        .bind(&profile.tags)
        .bind(&thresholds)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
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

        sqlx::query(
            "INSERT INTO character_semantic_profiles
                (character_id, novel_id, character_name, personality_embedding,
                 skill_embedding, decision_embedding, affinity_vector, tags)
             VALUES ($1, $2, $3, $4::vector, $5::vector, $6::vector, $7, $8)
             ON CONFLICT (character_id) DO UPDATE SET
                novel_id = EXCLUDED.novel_id,
                character_name = EXCLUDED.character_name,
                personality_embedding = EXCLUDED.personality_embedding,
                skill_embedding = EXCLUDED.skill_embedding,
                decision_embedding = EXCLUDED.decision_embedding,
                affinity_vector = EXCLUDED.affinity_vector,
                tags = EXCLUDED.tags,
                updated_at = NOW()",
        )
        .bind(profile.character_id.inner())
        .bind(profile.novel_id.map(|id| id.inner()))
        .bind(&profile.character_name)
        .bind(profile.personality_embedding.as_deref().map(vector_literal))
        .bind(profile.skill_embedding.as_deref().map(vector_literal))
        .bind(profile.decision_embedding.as_deref().map(vector_literal))
        .bind(&profile.affinity_vector)
        .bind(&profile.tags)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn reindex_if_grown(&self) -> Result<bool> {
        let mut rebuilt_any = false;
        for index in ANN_INDICES {
            let row_count = self.table_count(index.table).await?;
            let state: Option<(i64,)> = retry_read(|| {
                sqlx::query_as("SELECT row_count FROM vector_index_state WHERE index_name = $1")
                    .bind(index.name)
                    .fetch_optional(&self.pool)
            })
            .await?;

            let needs_rebuild = match state {
                None => true,
                Some((last_count,)) => {
                    let last_count = last_count as u64;
                    row_count >= last_count.saturating_mul(2) || row_count * 2 <= last_count
                }
            };
            if !needs_rebuild {
                continue;
            }

            let lists = (row_count / index.lists_divisor).max(MIN_IVFFLAT_LISTS);
            self.build_index(index, lists, row_count).await?;
            novellus_domain::info!(
                "vector_store",
                "ANN index rebuilt",
                &format!("index = {}, rows = {row_count}, lists = {lists}", index.name)
            );
            rebuilt_any = true;
        }
        Ok(rebuilt_any)
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            record_count: self.table_count("content_embeddings").await?,
            chain_count: self.table_count("law_chain_embeddings").await?,
            character_count: self.table_count("character_semantic_profiles").await?,
            search_log_count: self.table_count("vector_search_logs").await?,
        })
    }

    async fn search_log_summary(&self) -> Result<Vec<SearchLogSummary>> {
        let rows: Vec<(String, i64, Option<f64>, Option<f64>)> = retry_read(|| {
            sqlx::query_as(
                "SELECT search_type, COUNT(*),
                        AVG(execution_time_ms),
                        PERCENTILE_CONT(0.95) WITHIN GROUP (ORDER BY execution_time_ms)
                 FROM vector_search_logs
                 GROUP BY search_type
                 ORDER BY search_type",
            )
            .fetch_all(&self.pool)
        })
        .await?;

        rows.into_iter()
            .map(|(raw_type, count, avg, p95)| {
                let search_type = match raw_type.as_str() {
                    "similarity" => SearchType::Similarity,
                    "cache_lookup" => SearchType::CacheLookup,
                    "hybrid" => SearchType::Hybrid,
                    other => {
                        return Err(Error::storage(format!("unknown search type '{other}'")));
                    }
                };
                Ok(SearchLogSummary {
                    search_type,
                    count: count as u64,
                    avg_execution_ms: avg.unwrap_or(0.0),
                    p95_execution_ms: p95.unwrap_or(0.0),
                })
            })
            .collect()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "postgres"
    }
}

fn postgres_store_factory(
    config: &VectorStoreProviderConfig,
) -> std::result::Result<Arc<dyn VectorStoreProvider>, String> {
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| "Postgres vector store requires database_url in config".to_owned())?;
    let dimensions = config
        .dimensions
        .ok_or_else(|| "Postgres vector store requires dimensions in config".to_owned())?;
    let store = PgVectorStore::connect(&database_url, dimensions, config.max_connections)
        .map_err(|e| e.to_string())?;
    Ok(Arc::new(store))
}

#[linkme::distributed_slice(VECTOR_STORE_PROVIDERS)]
static POSTGRES_PROVIDER: VectorStoreProviderEntry = VectorStoreProviderEntry {
    name: "postgres",
    description: "PostgreSQL + pgvector vector store",
    build: postgres_store_factory,
};

#[cfg(test)]
mod tests {
    use super::schema::store_ddl;

    #[test]
    fn ddl_pins_dimension_and_uniqueness() {
        let ddl = store_ddl(1536).join("\n");
        assert!(ddl.contains("VECTOR(1536)"));
        assert!(ddl.contains("UNIQUE (content_hash, model_name, embedding_version)"));
        assert!(ddl.contains("CREATE EXTENSION IF NOT EXISTS vector"));
        assert!(ddl.contains("law_chain_embeddings"));
        assert!(ddl.contains("character_semantic_profiles"));
        assert!(ddl.contains("vector_search_logs"));
    }

    #[test]
    fn every_content_kind_is_in_the_check_constraint() {
        let ddl = store_ddl(8).join("\n");
        for kind in novellus_domain::value_objects::ContentKind::get_all() {
            assert!(ddl.contains(&format!("'{}'", kind.as_str())), "{kind} missing");
        }
    }
}
