//! Strong-typed UUID identifiers for all domain entities.

define_id!(RecordId, "Strong typed identifier for an embedding record");
define_id!(EntryId, "Strong typed identifier for a semantic cache entry");
define_id!(NovelId, "Strong typed identifier for a novel");
define_id!(ChainId, "Strong typed identifier for a law chain");
define_id!(
    CharacterId,
    "Strong typed identifier for a character semantic profile"
);
define_id!(SceneId, "Strong typed identifier for a scene");
define_id!(SearchId, "Strong typed identifier for a search log entry");
