/// Engine configuration — scoring magnitudes, thresholds and family buckets.
///
/// The archetype and anchor selectors differ only in configuration, so
/// both are presets of one `EngineConfig`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::core::encounter::EncounterThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Magnitudes of each scoring term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub outcome_match: f32,
    pub related_outcome: f32,
    /// Scaled by the fraction of requested phases the motif covers.
    pub phase_overlap: f32,
    /// Relationship levels 2 and 3.
    pub familiar_bonus: f32,
    /// Relationship level 4.
    pub mastered_bonus: f32,
    /// Full penalty at zero sessions since use, decaying across the window.
    pub recency_penalty: f32,
    pub overuse_penalty: f32,
    pub novelty_bonus: f32,
    pub synergy_bonus: f32,
    /// Upper bound on the summed synergy bonus.
    pub synergy_cap: f32,
    pub conflict_penalty: f32,
    /// Applied when the family was used in the most recent session.
    pub family_rotation_penalty: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            outcome_match: 1.0,
            related_outcome: 0.4,
            phase_overlap: 0.3,
            familiar_bonus: 0.2,
            mastered_bonus: 0.1,
            recency_penalty: 0.15,
            overuse_penalty: 0.2,
            novelty_bonus: 0.1,
            synergy_bonus: 0.2,
            synergy_cap: 0.4,
            conflict_penalty: 0.5,
            family_rotation_penalty: 0.0,
        }
    }
}

impl ScoringWeights {
    fn all(&self) -> [(&'static str, f32); 12] {
        [
            ("outcome_match", self.outcome_match),
            ("related_outcome", self.related_outcome),
            ("phase_overlap", self.phase_overlap),
            ("familiar_bonus", self.familiar_bonus),
            ("mastered_bonus", self.mastered_bonus),
            ("recency_penalty", self.recency_penalty),
            ("overuse_penalty", self.overuse_penalty),
            ("novelty_bonus", self.novelty_bonus),
            ("synergy_bonus", self.synergy_bonus),
            ("synergy_cap", self.synergy_cap),
            ("conflict_penalty", self.conflict_penalty),
            ("family_rotation_penalty", self.family_rotation_penalty),
        ]
    }
}

/// Family groups the selector guarantees at least one pick from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityBuckets {
    /// Physical / primary families (breath, body, guide, ...).
    pub primary: Vec<String>,
    /// Mental / secondary families (visual, nature, shadow, ...).
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    pub thresholds: EncounterThresholds,
    /// Sessions after which a used motif carries no recency penalty.
    pub cooldown_window: u32,
    /// Lifetime uses above which the overuse penalty applies.
    pub repetition_ceiling: u32,
    pub min_count: usize,
    pub max_count: usize,
    /// How many sessions of family rotation state to keep.
    pub recent_family_sessions: usize,
    /// Families the catalog is expected to use. Empty disables the check.
    pub known_families: Vec<String>,
    /// Outcome → outcomes that partially satisfy it.
    pub related_outcomes: HashMap<String, Vec<String>>,
    pub buckets: DiversityBuckets,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            thresholds: EncounterThresholds::default(),
            cooldown_window: 3,
            repetition_ceiling: 5,
            min_count: 1,
            max_count: 5,
            recent_family_sessions: 5,
            known_families: Vec::new(),
            related_outcomes: HashMap::new(),
            buckets: DiversityBuckets::default(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_related_outcomes() -> HashMap<String, Vec<String>> {
    HashMap::from([
        ("healing".to_string(), strings(&["relaxation", "release"])),
        ("sleep".to_string(), strings(&["relaxation"])),
        ("relaxation".to_string(), strings(&["healing", "sleep"])),
        ("transformation".to_string(), strings(&["empowerment", "release"])),
        ("confidence".to_string(), strings(&["empowerment"])),
        ("empowerment".to_string(), strings(&["confidence", "transformation"])),
    ])
}

impl EngineConfig {
    /// Archetypal figures: guides and healers on one side, shadow and
    /// trickster figures on the other.
    pub fn archetypes() -> Self {
        Self {
            max_count: 3,
            known_families: strings(&[
                "guide", "healer", "elder", "shadow", "trickster", "animal", "elemental",
            ]),
            related_outcomes: default_related_outcomes(),
            buckets: DiversityBuckets {
                primary: strings(&["guide", "healer", "elder"]),
                secondary: strings(&["shadow", "trickster", "animal", "elemental"]),
            },
            ..Self::default()
        }
    }

    /// Sensory anchors: physical (breath, body, touch) and mental
    /// (visual, sound, nature, light) families, rotated between sessions.
    pub fn anchors() -> Self {
        Self {
            weights: ScoringWeights {
                family_rotation_penalty: 0.05,
                ..ScoringWeights::default()
            },
            min_count: 2,
            max_count: 5,
            known_families: strings(&[
                "breath", "body", "touch", "visual", "sound", "nature", "light",
            ]),
            related_outcomes: default_related_outcomes(),
            buckets: DiversityBuckets {
                primary: strings(&["breath", "body", "touch"]),
                secondary: strings(&["visual", "sound", "nature", "light"]),
            },
            ..Self::default()
        }
    }

    /// Load a configuration from a RON file. Missing fields take defaults.
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cooldown_window == 0 {
            return Err(ConfigError::Invalid(
                "cooldown_window must be at least 1".to_string(),
            ));
        }
        if self.min_count == 0 {
            return Err(ConfigError::Invalid(
                "min_count must be at least 1".to_string(),
            ));
        }
        if self.min_count > self.max_count {
            return Err(ConfigError::Invalid(format!(
                "min_count ({}) exceeds max_count ({})",
                self.min_count, self.max_count
            )));
        }
        if !self.thresholds.is_monotonic() {
            return Err(ConfigError::Invalid(format!(
                "encounter thresholds must be non-decreasing: {:?}",
                self.thresholds
            )));
        }
        for (name, value) in self.weights.all() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "weight '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn is_known_family(&self, family: &str) -> bool {
        self.known_families.is_empty() || self.known_families.iter().any(|f| f == family)
    }

    /// True if `outcome` and `other` are declared related in either direction.
    pub fn outcomes_related(&self, outcome: &str, other: &str) -> bool {
        let listed = |from: &str, to: &str| {
            self.related_outcomes
                .get(from)
                .map(|list| list.iter().any(|o| o == to))
                .unwrap_or(false)
        };
        listed(outcome, other) || listed(other, outcome)
    }
}
