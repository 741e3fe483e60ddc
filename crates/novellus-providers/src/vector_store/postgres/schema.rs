//! DDL for the pgvector-backed store.
//!
//! Statements are generated in the host language (the vector dimension is
//! configuration, not source), executed idempotently by `ensure_schema`.
//! ANN index `lists` parameters are recomputed at rebuild time from live
//! row counts.

use novellus_domain::constants::search::{PRIMARY_LISTS_DIVISOR, SPECIALIZED_LISTS_DIVISOR};
use novellus_domain::value_objects::ContentKind;

/// All content kinds, quoted for the CHECK constraint.
fn content_kind_set() -> String {
    ContentKind::get_all()
        .iter()
        .map(|k| format!("'{}'", k.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// DDL statements for the store relations, in execution order.
pub(super) fn store_ddl(dim: usize) -> Vec<String> {
    vec![
        "CREATE EXTENSION IF NOT EXISTS vector".to_owned(),
        format!(
            "CREATE TABLE IF NOT EXISTS content_embeddings (
                record_id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                content_id TEXT NOT NULL,
                content_type TEXT NOT NULL CHECK (content_type IN ({kinds})),
                content_hash CHAR(64) NOT NULL,
                content_text TEXT,
                content_metadata JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                embedding VECTOR({dim}) NOT NULL,
                model_name TEXT NOT NULL,
                embedding_version INT NOT NULL DEFAULT 1,
                novel_id UUID,
                chain_id UUID,
                character_id UUID,
                scene_id UUID,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT uq_content_embeddings_identity
                    UNIQUE (content_hash, model_name, embedding_version),
                CONSTRAINT ck_content_embeddings_times CHECK (updated_at >= created_at)
            )",
            kinds = content_kind_set(),
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS law_chain_embeddings (
                chain_id UUID PRIMARY KEY,
                novel_id UUID,
                chain_name TEXT NOT NULL,
                description_embedding VECTOR({dim}),
                abilities_embedding VECTOR({dim}),
                combination_embedding VECTOR({dim}),
                domain_affinity REAL[] NOT NULL DEFAULT '{{}}',
                cost_risk_profile REAL[] NOT NULL DEFAULT '{{}}',
                tags TEXT[] NOT NULL DEFAULT '{{}}',
                aspect_thresholds JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS character_semantic_profiles (
                character_id UUID PRIMARY KEY,
                novel_id UUID,
                character_name TEXT NOT NULL,
                personality_embedding VECTOR({dim}),
                skill_embedding VECTOR({dim}),
                decision_embedding VECTOR({dim}),
                affinity_vector REAL[] NOT NULL DEFAULT '{{}}',
                tags TEXT[] NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS vector_search_logs (
                search_id UUID PRIMARY KEY,
                search_type TEXT NOT NULL,
                query_vector VECTOR({dim}),
                params JSONB NOT NULL DEFAULT '{{}}'::jsonb,
                result_count INT NOT NULL DEFAULT 0,
                execution_time_ms DOUBLE PRECISION NOT NULL DEFAULT 0,
                similarity_scores DOUBLE PRECISION[] NOT NULL DEFAULT '{{}}',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"
        ),
        "CREATE TABLE IF NOT EXISTS vector_index_state (
            index_name TEXT PRIMARY KEY,
            row_count BIGINT NOT NULL,
            lists INT NOT NULL,
            built_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )"
        .to_owned(),
        // Secondary indices: inverted for metadata/tags, B-tree for links.
        "CREATE INDEX IF NOT EXISTS idx_content_embeddings_metadata
            ON content_embeddings USING gin (content_metadata)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_content_embeddings_type
            ON content_embeddings (content_type)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_content_embeddings_novel
            ON content_embeddings (novel_id)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_content_embeddings_created
            ON content_embeddings (created_at)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_content_embeddings_links
            ON content_embeddings (chain_id, character_id, scene_id)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_law_chain_embeddings_tags
            ON law_chain_embeddings USING gin (tags)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_law_chain_embeddings_novel
            ON law_chain_embeddings (novel_id)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_character_profiles_tags
            ON character_semantic_profiles USING gin (tags)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_character_profiles_novel
            ON character_semantic_profiles (novel_id)"
            .to_owned(),
        "CREATE INDEX IF NOT EXISTS idx_vector_search_logs_created
            ON vector_search_logs (created_at)"
            .to_owned(),
    ]
}

/// One ANN index this store maintains.
pub(super) struct AnnIndex {
    pub table: &'static str,
    pub column: &'static str,
    /// pgvector operator class (cosine or L2 flavor)
    pub ops: &'static str,
    pub name: &'static str,
    /// Row-count divisor for the `lists` parameter
    pub lists_divisor: u64,
}

/// The ANN indices required by the query surface: cosine and L2 flavors on
/// the primary relation, cosine on each specialized aspect column.
pub(super) const ANN_INDICES: &[AnnIndex] = &[
    AnnIndex {
        table: "content_embeddings",
        column: "embedding",
        ops: "vector_cosine_ops",
        name: "idx_content_embeddings_embedding_cosine",
        lists_divisor: PRIMARY_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "content_embeddings",
        column: "embedding",
        ops: "vector_l2_ops",
        name: "idx_content_embeddings_embedding_l2",
        lists_divisor: PRIMARY_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "law_chain_embeddings",
        column: "description_embedding",
        ops: "vector_cosine_ops",
        name: "idx_law_chain_description_cosine",
        lists_divisor: SPECIALIZED_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "law_chain_embeddings",
        column: "abilities_embedding",
        ops: "vector_cosine_ops",
        name: "idx_law_chain_abilities_cosine",
        lists_divisor: SPECIALIZED_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "law_chain_embeddings",
        column: "combination_embedding",
        ops: "vector_cosine_ops",
        name: "idx_law_chain_combination_cosine",
        lists_divisor: SPECIALIZED_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "character_semantic_profiles",
        column: "personality_embedding",
        ops: "vector_cosine_ops",
        name: "idx_character_personality_cosine",
        lists_divisor: SPECIALIZED_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "character_semantic_profiles",
        column: "skill_embedding",
        ops: "vector_cosine_ops",
        name: "idx_character_skill_cosine",
        lists_divisor: SPECIALIZED_LISTS_DIVISOR,
    },
    AnnIndex {
        table: "character_semantic_profiles",
        column: "decision_embedding",
        ops: "vector_cosine_ops",
        name: "idx_character_decision_cosine",
        lists_divisor: SPECIALIZED_LISTS_DIVISOR,
    },
];
