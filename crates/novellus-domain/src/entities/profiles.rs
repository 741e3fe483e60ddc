//! Specialized embedding rows: law chains and character semantic profiles.
//!
//! Unlike the primary relation these carry multiple named vector columns,
//! any of which may be NULL. NULL vectors are silently excluded from
//! similarity queries, never an error.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ChainAspect, ChainId, CharacterId, NovelId, ProfileAspect};

/// Number of domains in the nine-domain cosmology; fixes the
/// `domain_affinity` feature-vector length.
pub const DOMAIN_COUNT: usize = 9;

/// Length of the chain cost/risk feature vector.
pub const COST_RISK_DIMENSIONS: usize = 4;

/// Length of the character affinity feature vector.
pub const AFFINITY_DIMENSIONS: usize = 16;

/// Semantic profile of one law chain: full-dimension vectors per aspect
/// plus small fixed-dimension feature vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LawChainProfile {
    /// Chain identity
    pub chain_id: ChainId,
    /// Owning novel, when scoped
    pub novel_id: Option<NovelId>,
    /// Chain display name
    pub chain_name: String,
    /// What the chain is
    pub description_embedding: Option<Vec<f32>>,
    /// What the chain can do
    pub abilities_embedding: Option<Vec<f32>>,
    /// How the chain combines with others
    pub combination_embedding: Option<Vec<f32>>,
    /// Nine-domain preference profile (`DOMAIN_COUNT` entries)
    pub domain_affinity: Vec<f32>,
    /// Activation cost/risk profile (`COST_RISK_DIMENSIONS` entries)
    pub cost_risk_profile: Vec<f32>,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Per-aspect similarity threshold overrides, keyed by aspect name.
    /// An override can only raise the caller's threshold, never lower it.
    pub aspect_thresholds: HashMap<String, f64>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl LawChainProfile {
    /// The vector stored for an aspect, when any.
    #[must_use]
    pub fn aspect_vector(&self, aspect: ChainAspect) -> Option<&[f32]> {
        match aspect {
            ChainAspect::Description => self.description_embedding.as_deref(),
            ChainAspect::Abilities => self.abilities_embedding.as_deref(),
            ChainAspect::Combination => self.combination_embedding.as_deref(),
        }
    }

    /// Effective threshold for this row: `max(row_override, caller)`.
    #[must_use]
    pub fn effective_threshold(&self, aspect: ChainAspect, caller_threshold: f64) -> f64 {
        self.aspect_thresholds
            .get(aspect.as_str())
            .copied()
            .map_or(caller_threshold, |row| row.max(caller_threshold))
    }
}

/// Semantic profile of one character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Character identity
    pub character_id: CharacterId,
    /// Owning novel, when scoped
    pub novel_id: Option<NovelId>,
    /// Character display name
    pub character_name: String,
    /// Personality profile vector
    pub personality_embedding: Option<Vec<f32>>,
    /// Skill profile vector
    pub skill_embedding: Option<Vec<f32>>,
    /// Decision-making profile vector
    pub decision_embedding: Option<Vec<f32>>,
    /// Inter-character affinity features (`AFFINITY_DIMENSIONS` entries)
    pub affinity_vector: Vec<f32>,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Row creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl CharacterProfile {
    /// The vector stored for an aspect, when any.
    #[must_use]
    pub fn aspect_vector(&self, aspect: ProfileAspect) -> Option<&[f32]> {
        match aspect {
            ProfileAspect::Personality => self.personality_embedding.as_deref(),
            ProfileAspect::Skill => self.skill_embedding.as_deref(),
            ProfileAspect::Decision => self.decision_embedding.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(thresholds: &[(&str, f64)]) -> LawChainProfile {
        let now = Utc::now();
        LawChainProfile {
            chain_id: ChainId::new(),
            novel_id: None,
            chain_name: "命运链".to_owned(),
            description_embedding: None,
            abilities_embedding: None,
            combination_embedding: None,
            domain_affinity: vec![0.0; DOMAIN_COUNT],
            cost_risk_profile: vec![0.0; COST_RISK_DIMENSIONS],
            tags: vec![],
            aspect_thresholds: thresholds
                .iter()
                .map(|(k, v)| ((*k).to_owned(), *v))
                .collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn override_raises_caller_threshold() {
        let c = chain(&[("description", 0.9)]);
        assert_eq!(c.effective_threshold(ChainAspect::Description, 0.7), 0.9);
    }

    #[test]
    fn override_never_lowers_caller_threshold() {
        let c = chain(&[("abilities", 0.5)]);
        assert_eq!(c.effective_threshold(ChainAspect::Abilities, 0.8), 0.8);
    }

    #[test]
    fn missing_override_keeps_caller_threshold() {
        let c = chain(&[]);
        assert_eq!(c.effective_threshold(ChainAspect::Combination, 0.75), 0.75);
    }
}
