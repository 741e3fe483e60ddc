//! PostgreSQL + pgvector semantic cache
//!
//! Shares the database with the vector store but owns its own relation.
//! The upsert on `query_hash` makes `put` idempotent, so concurrent misses
//! for the same query converge to one live entry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::{
    CacheLookup, CachePut, CacheStats, CachedResponse, SemanticCacheProvider,
};
use novellus_domain::registry::semantic_cache::{
    SEMANTIC_CACHE_PROVIDERS, SemanticCacheProviderConfig, SemanticCacheProviderEntry,
};
use novellus_domain::utils::query_hash;
use novellus_domain::value_objects::{EntryId, vector_literal};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

const DEFAULT_MAX_CONNECTIONS: u32 = 4;

/// pgvector-backed semantic cache.
pub struct PgSemanticCache {
    pool: PgPool,
    dimensions: usize,
    swept: AtomicU64,
    evicted: AtomicU64,
}

fn storage_err(e: sqlx::Error) -> Error {
    Error::storage_with_source("postgres cache query failed", e)
}

impl PgSemanticCache {
    /// Create a cache over a lazy connection pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is malformed.
    pub fn connect(database_url: &str, dimensions: usize) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .connect_lazy(database_url)
            .map_err(|e| Error::configuration_with_source("invalid postgres url", e))?;
        Ok(Self::with_pool(pool, dimensions))
    }

    /// Build a cache on an existing pool.
    #[must_use]
    pub fn with_pool(pool: PgPool, dimensions: usize) -> Self {
        Self {
            pool,
            dimensions,
            swept: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
        }
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(Error::dimension(self.dimensions, vector.len()));
        }
        Ok(())
    }
}

#[async_trait]
impl SemanticCacheProvider for PgSemanticCache {
    async fn ensure_schema(&self) -> Result<()> {
        let statements = [
            format!(
                "CREATE TABLE IF NOT EXISTS semantic_cache (
                    entry_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                    query_text TEXT NOT NULL,
                    query_hash CHAR(64) NOT NULL UNIQUE,
                    query_embedding VECTOR({dim}) NOT NULL,
                    response_data JSONB NOT NULL,
                    response_metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                    similarity_threshold DOUBLE PRECISION NOT NULL
                        CHECK (similarity_threshold BETWEEN 0 AND 1),
                    hit_count INT NOT NULL DEFAULT 1 CHECK (hit_count >= 0),
                    last_hit_at TIMESTAMPTZ,
                    expires_at TIMESTAMPTZ,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )",
                dim = self.dimensions,
            ),
            "CREATE INDEX IF NOT EXISTS idx_semantic_cache_embedding
                ON semantic_cache USING ivfflat (query_embedding vector_cosine_ops)
                WITH (lists = 10)"
                .to_owned(),
            "CREATE INDEX IF NOT EXISTS idx_semantic_cache_expires
                ON semantic_cache (expires_at)"
                .to_owned(),
        ];
        for statement in statements {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .map_err(storage_err)?;
        }
        Ok(())
    }

    async fn lookup(&self, query_text: &str, query_vector: &[f32]) -> Result<CacheLookup> {
        self.check_dimensions(query_vector)?;
        let hash = query_hash(query_text);

        // Exact live entry: bump and return in one statement.
        let exact = sqlx::query(
            "UPDATE semantic_cache
             SET hit_count = hit_count + 1, last_hit_at = NOW(), updated_at = NOW()
             WHERE query_hash = $1 AND (expires_at IS NULL OR expires_at > NOW())
             RETURNING entry_id, response_data, response_metadata",
        )
        .bind(&hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        if let Some(row) = exact {
            return Ok(CacheLookup::ExactHit(CachedResponse {
                entry_id: EntryId::from_uuid(row.try_get("entry_id").map_err(storage_err)?),
                payload: row.try_get("response_data").map_err(storage_err)?,
                metadata: row.try_get("response_metadata").map_err(storage_err)?,
            }));
        }

        // k=1 semantic probe over live entries.
        let literal = vector_literal(query_vector);
        let nearest = sqlx::query(
            "SELECT entry_id, response_data, response_metadata, similarity_threshold,
                    1 - (query_embedding <=> $1::vector) AS similarity
             FROM semantic_cache
             WHERE expires_at IS NULL OR expires_at > NOW()
             ORDER BY query_embedding <=> $1::vector
             LIMIT 1",
        )
        .bind(&literal)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = nearest else {
            return Ok(CacheLookup::Miss);
        };
        let similarity: f64 = row.try_get("similarity").map_err(storage_err)?;
        let similarity = similarity.clamp(0.0, 1.0);
        let threshold: f64 = row.try_get("similarity_threshold").map_err(storage_err)?;
        if similarity < threshold {
            return Ok(CacheLookup::Miss);
        }

        let entry_id: Uuid = row.try_get("entry_id").map_err(storage_err)?;
        sqlx::query(
            "UPDATE semantic_cache
             SET hit_count = hit_count + 1, last_hit_at = NOW(), updated_at = NOW()
             WHERE entry_id = $1",
        )
        .bind(entry_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(CacheLookup::SemanticHit {
            response: CachedResponse {
                entry_id: EntryId::from_uuid(entry_id),
                payload: row.try_get("response_data").map_err(storage_err)?,
                metadata: row.try_get("response_metadata").map_err(storage_err)?,
            },
            similarity,
        })
    }

    async fn put(&self, put: CachePut) -> Result<EntryId> {
        self.check_dimensions(&put.query_vector)?;
        let hash = query_hash(&put.query_text);
        let expires_at = put
            .ttl
            .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
            .map(|ttl| Utc::now() + ttl);

        let row = sqlx::query(
            "INSERT INTO semantic_cache
                (query_text, query_hash, query_embedding, response_data,
                 response_metadata, similarity_threshold, hit_count, expires_at)
             VALUES ($1, $2, $3::vector, $4, $5, $6, 1, $7)
             ON CONFLICT (query_hash) DO UPDATE SET
                response_data = EXCLUDED.response_data,
                response_metadata = EXCLUDED.response_metadata,
                query_embedding = EXCLUDED.query_embedding,
                similarity_threshold = EXCLUDED.similarity_threshold,
                hit_count = semantic_cache.hit_count + 1,
                expires_at = EXCLUDED.expires_at,
                updated_at = NOW()
             RETURNING entry_id",
        )
        .bind(&put.query_text)
        .bind(&hash)
        .bind(vector_literal(&put.query_vector))
        .bind(&put.payload)
        .bind(&put.metadata)
        .bind(put.similarity_threshold)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(EntryId::from_uuid(
            row.try_get("entry_id").map_err(storage_err)?,
        ))
    }

    async fn sweep_expired(&self, batch_limit: usize) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM semantic_cache
             WHERE ctid IN (
                 SELECT ctid FROM semantic_cache
                 WHERE expires_at IS NOT NULL AND expires_at <= NOW()
                 LIMIT $1
             )",
        )
        .bind(batch_limit as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        let deleted = result.rows_affected();
        self.swept.fetch_add(deleted, Ordering::Relaxed);
        Ok(deleted)
    }

    async fn evict_to_capacity(&self, max_entries: usize) -> Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM semantic_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        let excess = (total as u64).saturating_sub(max_entries as u64);
        if excess == 0 {
            return Ok(0);
        }

        let result = sqlx::query(
            "DELETE FROM semantic_cache
             WHERE ctid IN (
                 SELECT ctid FROM semantic_cache
                 ORDER BY (expires_at IS NOT NULL AND expires_at <= NOW()) DESC,
                          hit_count ASC,
                          last_hit_at ASC NULLS FIRST
                 LIMIT $1
             )",
        )
        .bind(excess as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        let evicted = result.rows_affected();
        self.evicted.fetch_add(evicted, Ordering::Relaxed);
        Ok(evicted)
    }

    async fn stats(&self) -> Result<CacheStats> {
        let row: (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(hit_count), 0)::bigint
             FROM semantic_cache
             WHERE expires_at IS NULL OR expires_at > NOW()",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(CacheStats {
            entries: row.0 as u64,
            total_hits: row.1 as u64,
            swept: self.swept.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        })
    }

    fn provider_name(&self) -> &str {
        "postgres"
    }
}

fn postgres_cache_factory(
    config: &SemanticCacheProviderConfig,
) -> std::result::Result<Arc<dyn SemanticCacheProvider>, String> {
    let database_url = config
        .database_url
        .clone()
        .ok_or_else(|| "Postgres semantic cache requires database_url in config".to_owned())?;
    let dimensions = config
        .dimensions
        .ok_or_else(|| "Postgres semantic cache requires dimensions in config".to_owned())?;
    let cache = PgSemanticCache::connect(&database_url, dimensions).map_err(|e| e.to_string())?;
    Ok(Arc::new(cache))
}

#[linkme::distributed_slice(SEMANTIC_CACHE_PROVIDERS)]
static POSTGRES_PROVIDER: SemanticCacheProviderEntry = SemanticCacheProviderEntry {
    name: "postgres",
    description: "PostgreSQL + pgvector semantic cache",
    build: postgres_cache_factory,
};
