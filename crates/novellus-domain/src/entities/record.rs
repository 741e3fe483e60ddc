//! Embedding record entity - one stored vector with its payload and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::content_hash;
use crate::value_objects::{ChainId, CharacterId, ContentKind, NovelId, RecordId, SceneId};

/// A persisted embedding with payload, provenance, and worldbuilding links.
///
/// `(content_hash, model_name, embedding_version)` uniquely identifies a
/// record. Content is immutable once stored; new vectors for the same
/// content go in under a bumped `embedding_version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Record identity
    pub record_id: RecordId,
    /// Caller-supplied content identifier
    pub content_id: String,
    /// Kind of content this vector represents
    pub content_kind: ContentKind,
    /// SHA-256 hex digest of the source content
    pub content_hash: String,
    /// Source text, retained when available
    pub content_text: Option<String>,
    /// Free-form metadata payload
    pub metadata: serde_json::Value,
    /// The stored vector
    pub embedding: Vec<f32>,
    /// Model that produced the vector
    pub model_name: String,
    /// Version of the embedding scheme for this model
    pub embedding_version: i32,
    /// Owning novel, when linked
    pub novel_id: Option<NovelId>,
    /// Linked law chain, when any
    pub chain_id: Option<ChainId>,
    /// Linked character, when any
    pub character_id: Option<CharacterId>,
    /// Linked scene, when any
    pub scene_id: Option<SceneId>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time; always `>= created_at`
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a new embedding record.
#[derive(Debug, Clone)]
pub struct NewEmbeddingRecord {
    /// Caller-supplied content identifier
    pub content_id: String,
    /// Kind of content
    pub content_kind: ContentKind,
    /// SHA-256 hex digest of the source content
    pub content_hash: String,
    /// Source text, when the content is textual
    pub content_text: Option<String>,
    /// Free-form metadata payload
    pub metadata: serde_json::Value,
    /// The vector to store
    pub embedding: Vec<f32>,
    /// Model that produced the vector
    pub model_name: String,
    /// Version of the embedding scheme
    pub embedding_version: i32,
    /// Owning novel, when linked
    pub novel_id: Option<NovelId>,
    /// Linked law chain, when any
    pub chain_id: Option<ChainId>,
    /// Linked character, when any
    pub character_id: Option<CharacterId>,
    /// Linked scene, when any
    pub scene_id: Option<SceneId>,
}

impl NewEmbeddingRecord {
    /// Build a textual record, deriving `content_hash` from the text.
    pub fn from_text(
        content_id: impl Into<String>,
        content_kind: ContentKind,
        text: impl Into<String>,
        embedding: Vec<f32>,
        model_name: impl Into<String>,
        embedding_version: i32,
    ) -> Self {
        let text = text.into();
        Self {
            content_id: content_id.into(),
            content_kind,
            content_hash: content_hash(&text),
            content_text: Some(text),
            metadata: serde_json::Value::Object(serde_json::Map::new()),
            embedding,
            model_name: model_name.into(),
            embedding_version,
            novel_id: None,
            chain_id: None,
            character_id: None,
            scene_id: None,
        }
    }

    /// Attach a metadata payload
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Link the owning novel
    #[must_use]
    pub fn with_novel(mut self, novel_id: NovelId) -> Self {
        self.novel_id = Some(novel_id);
        self
    }

    /// Link a law chain
    #[must_use]
    pub fn with_chain(mut self, chain_id: ChainId) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Link a character
    #[must_use]
    pub fn with_character(mut self, character_id: CharacterId) -> Self {
        self.character_id = Some(character_id);
        self
    }

    /// Link a scene
    #[must_use]
    pub fn with_scene(mut self, scene_id: SceneId) -> Self {
        self.scene_id = Some(scene_id);
        self
    }
}

/// Result of an insert: the stored row plus whether this call created it.
///
/// A collision on `(content_hash, model_name, embedding_version)` returns
/// the existing row unchanged with `inserted == false`.
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    /// The row now present in the store
    pub record: EmbeddingRecord,
    /// Whether this call created the row
    pub inserted: bool,
}
