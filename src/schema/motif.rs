use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::fragment::Template;

/// How strongly a motif is felt by the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    Gentle,
    Moderate,
    Strong,
    VeryStrong,
}

impl Default for Intensity {
    fn default() -> Self {
        Self::Moderate
    }
}

/// Familiarity stage of a listener with a motif, derived from encounter count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncounterStage {
    First,
    Return,
    Mastery,
}

impl EncounterStage {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Return => "return",
            Self::Mastery => "mastery",
        }
    }
}

impl fmt::Display for EncounterStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A reusable content motif (an archetypal figure, a sensory anchor, ...)
/// with the metadata the scorer needs and a fragment per encounter stage.
///
/// Entries are immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MotifEntry {
    /// Globally unique, conventionally `<family>.<name>`.
    pub id: String,
    pub name: String,
    /// Diversity bucket this motif belongs to.
    pub family: String,
    pub outcome_alignment: FxHashSet<String>,
    pub applicable_phases: FxHashSet<String>,
    pub intensity: Intensity,
    pub stage_fragments: HashMap<EncounterStage, Template>,
    pub synergies: FxHashSet<String>,
    pub conflicts: FxHashSet<String>,
}

impl MotifEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            family: family.into(),
            outcome_alignment: FxHashSet::default(),
            applicable_phases: FxHashSet::default(),
            intensity: Intensity::default(),
            stage_fragments: HashMap::new(),
            synergies: FxHashSet::default(),
            conflicts: FxHashSet::default(),
        }
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome_alignment.insert(outcome.into());
        self
    }

    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.applicable_phases.insert(phase.into());
        self
    }

    pub fn with_intensity(mut self, intensity: Intensity) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_fragment(mut self, stage: EncounterStage, template: Template) -> Self {
        self.stage_fragments.insert(stage, template);
        self
    }

    pub fn with_synergy(mut self, id: impl Into<String>) -> Self {
        self.synergies.insert(id.into());
        self
    }

    pub fn with_conflict(mut self, id: impl Into<String>) -> Self {
        self.conflicts.insert(id.into());
        self
    }

    pub fn supports_outcome(&self, outcome: &str) -> bool {
        self.outcome_alignment.contains(outcome)
    }

    /// Number of requested phases this motif is valid in.
    pub fn phase_overlap<'a, I>(&self, phases: I) -> usize
    where
        I: IntoIterator<Item = &'a String>,
    {
        phases
            .into_iter()
            .filter(|p| self.applicable_phases.contains(p.as_str()))
            .count()
    }

    pub fn fragment(&self, stage: EncounterStage) -> Option<&Template> {
        self.stage_fragments.get(&stage)
    }

    /// True when either side declares a conflict with the other.
    pub fn conflicts_with(&self, other: &MotifEntry) -> bool {
        self.conflicts.contains(&other.id) || other.conflicts.contains(&self.id)
    }
}
