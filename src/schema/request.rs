use serde::{Deserialize, Serialize};
use std::fmt;

use super::motif::EncounterStage;

/// Parameters for one selection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub outcome: String,
    #[serde(default)]
    pub journey_phases: Vec<String>,
    pub count: usize,
    #[serde(default)]
    pub exclude_ids: Vec<String>,
    #[serde(default)]
    pub required_categories: Option<Vec<String>>,
    #[serde(default = "default_prefer_recurring")]
    pub prefer_recurring: bool,
}

fn default_prefer_recurring() -> bool {
    true
}

impl SelectionRequest {
    pub fn new(outcome: impl Into<String>, count: usize) -> Self {
        Self {
            outcome: outcome.into(),
            journey_phases: Vec::new(),
            count,
            exclude_ids: Vec::new(),
            required_categories: None,
            prefer_recurring: default_prefer_recurring(),
        }
    }

    pub fn with_phases(mut self, phases: &[&str]) -> Self {
        self.journey_phases = phases.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn excluding(mut self, ids: &[&str]) -> Self {
        self.exclude_ids = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn requiring(mut self, families: &[&str]) -> Self {
        self.required_categories = Some(families.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn prefer_recurring(mut self, prefer: bool) -> Self {
        self.prefer_recurring = prefer;
        self
    }
}

/// Position of a pick within the session's motif set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Primary,
    Secondary,
    Support,
}

impl Role {
    pub fn for_position(index: usize) -> Self {
        match index {
            0 => Self::Primary,
            1 => Self::Secondary,
            _ => Self::Support,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Support => "support",
        })
    }
}

/// A motif chosen for a session, ready to embed into generated content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedMotif {
    pub motif_id: String,
    pub name: String,
    pub family: String,
    pub role: Role,
    pub encounter_stage: EncounterStage,
    pub relationship_level: u8,
    pub content_fragment: String,
    pub score: f32,
    /// The stage had no bespoke fragment and the `first` fragment was used.
    pub used_fallback: bool,
}

/// A filter the selector relaxed because it left no candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Broadening {
    PhaseFilterDropped,
    OutcomeFilterDropped,
}

/// Result of a selection call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub motifs: Vec<SelectedMotif>,
    /// Effective count after clamping to the configured maximum.
    pub requested: usize,
    /// Fewer motifs than requested were available.
    pub partial: bool,
    pub broadened: Vec<Broadening>,
}

impl SelectionOutcome {
    pub fn ids(&self) -> Vec<&str> {
        self.motifs.iter().map(|m| m.motif_id.as_str()).collect()
    }

    pub fn primary(&self) -> Option<&SelectedMotif> {
        self.motifs.iter().find(|m| m.role == Role::Primary)
    }

    pub fn any_fallback(&self) -> bool {
        self.motifs.iter().any(|m| m.used_fallback)
    }
}
