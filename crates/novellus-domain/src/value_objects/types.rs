//! Domain Type Definitions
//!
//! Closed sets and identifier newtypes shared across the AI-content core.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifier of a configured model (e.g. `"gpt-4o-mini"`).
///
/// Model ids come from configuration, not from the database, so this is a
/// string newtype rather than a UUID id.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    derive_more::From,
    derive_more::Into,
    Serialize,
    Deserialize,
)]
#[display("{_0}")]
pub struct ModelId(String);

impl ModelId {
    /// Wrap a model identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Closed set of content kinds an embedding record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Plain narrative text
    #[display("text")]
    Text,
    /// Image content (caption/description embedding)
    #[display("image")]
    Image,
    /// Audio content
    #[display("audio")]
    Audio,
    /// Video content
    #[display("video")]
    Video,
    /// Long-form document
    #[display("document")]
    Document,
    /// Law chain description
    #[display("law_chain")]
    LawChain,
    /// Character profile
    #[display("character")]
    Character,
    /// Scene description
    #[display("scene")]
    Scene,
    /// Dialogue excerpt
    #[display("dialogue")]
    Dialogue,
}

impl ContentKind {
    /// Get the string representation of this content kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::LawChain => "law_chain",
            Self::Character => "character",
            Self::Scene => "scene",
            Self::Dialogue => "dialogue",
        }
    }

    /// Get all supported content kinds
    #[must_use]
    pub fn get_all() -> &'static [Self] {
        &[
            Self::Text,
            Self::Image,
            Self::Audio,
            Self::Video,
            Self::Document,
            Self::LawChain,
            Self::Character,
            Self::Scene,
            Self::Dialogue,
        ]
    }
}

impl_from_str!(ContentKind, "Unsupported content kind: {}", {
    "text" => ContentKind::Text,
    "image" => ContentKind::Image,
    "audio" => ContentKind::Audio,
    "video" => ContentKind::Video,
    "document" => ContentKind::Document,
    "law_chain" => ContentKind::LawChain,
    "character" => ContentKind::Character,
    "scene" => ContentKind::Scene,
    "dialogue" => ContentKind::Dialogue,
});

/// What a configured model can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    /// Text to vector
    #[display("embedding")]
    Embedding,
    /// Single-turn text completion
    #[display("completion")]
    Completion,
    /// Multi-turn chat
    #[display("chat")]
    Chat,
    /// Image understanding
    #[display("vision")]
    Vision,
}

impl_from_str!(Capability, "Unknown capability: {}", {
    "embedding" => Capability::Embedding,
    "completion" => Capability::Completion,
    "chat" => Capability::Chat,
    "vision" => Capability::Vision,
});

/// Online status of a configured model.
///
/// `Active ↔ Degraded` transitions happen online (rate-limit overdraw,
/// provider failures); `Disabled` only via configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    /// Eligible for selection
    #[default]
    #[display("active")]
    Active,
    /// Eligible, but deprioritized after recent failures or overdraw
    #[display("degraded")]
    Degraded,
    /// Never selected
    #[display("disabled")]
    Disabled,
}

/// Distance metric for similarity search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine distance; scores reported as `1 - distance`, clamped to [0, 1]
    #[default]
    #[display("cosine")]
    Cosine,
    /// Euclidean distance; ranked ascending, reported raw (>= 0)
    #[display("l2")]
    L2,
}

/// Law-chain vector aspect selectable in chain searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ChainAspect {
    /// What the chain is
    #[display("description")]
    Description,
    /// What the chain can do
    #[display("abilities")]
    Abilities,
    /// How the chain combines with others
    #[display("combination")]
    Combination,
}

impl ChainAspect {
    /// Column-name form used by stores and threshold override maps.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Abilities => "abilities",
            Self::Combination => "combination",
        }
    }
}

/// Character profile vector aspect selectable in behavior prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum ProfileAspect {
    /// Personality profile
    #[display("personality")]
    Personality,
    /// Skill profile
    #[display("skill")]
    Skill,
    /// Decision-making profile
    #[display("decision")]
    Decision,
}

impl ProfileAspect {
    /// Column-name form used by stores.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personality => "personality",
            Self::Skill => "skill",
            Self::Decision => "decision",
        }
    }
}

/// Kind of search recorded in the append-only search log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    /// Plain k-NN similarity search
    #[display("similarity")]
    Similarity,
    /// Semantic cache probe
    #[display("cache_lookup")]
    CacheLookup,
    /// Combined multi-aspect search
    #[display("hybrid")]
    Hybrid,
}

/// Model selection strategy for the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, Default)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Cycle through eligible models in order
    #[display("round_robin")]
    RoundRobin,
    /// Random pick weighted by priority
    #[display("weighted_random")]
    WeightedRandom,
    /// Lowest p50 latency wins
    #[display("least_latency")]
    LeastLatency,
    /// Cheapest blended token cost wins
    #[display("cost_optimized")]
    CostOptimized,
    /// Weighted score over latency, success rate, cost, and remaining budget
    #[default]
    #[display("adaptive")]
    Adaptive,
}

impl_from_str!(RouteStrategy, "Unknown routing strategy: {}", {
    "round_robin" => RouteStrategy::RoundRobin,
    "weighted_random" => RouteStrategy::WeightedRandom,
    "least_latency" => RouteStrategy::LeastLatency,
    "cost_optimized" => RouteStrategy::CostOptimized,
    "adaptive" => RouteStrategy::Adaptive,
});
