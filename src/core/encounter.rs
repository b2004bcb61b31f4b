/// Encounter resolution — stage and relationship level from encounter count,
/// and stage fragment lookup with fallback to `first`.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::fragment::{FragmentContext, Template};
use crate::schema::motif::{EncounterStage, MotifEntry};

/// Breakpoints on `total_encounters`.
///
/// Stages: `first` below `return_at`, `return` below `mastery_at`, then
/// `mastery`. Levels: 1 below `return_at`, 2 below `deepening_at`, 3 below
/// `mastery_at`, then 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterThresholds {
    pub return_at: u32,
    pub deepening_at: u32,
    pub mastery_at: u32,
}

impl Default for EncounterThresholds {
    fn default() -> Self {
        Self {
            return_at: 1,
            deepening_at: 4,
            mastery_at: 7,
        }
    }
}

impl EncounterThresholds {
    pub fn is_monotonic(&self) -> bool {
        self.return_at <= self.deepening_at && self.deepening_at <= self.mastery_at
    }

    pub fn stage(&self, total_encounters: u32) -> EncounterStage {
        if total_encounters >= self.mastery_at {
            EncounterStage::Mastery
        } else if total_encounters >= self.return_at {
            EncounterStage::Return
        } else {
            EncounterStage::First
        }
    }

    pub fn level(&self, total_encounters: u32) -> u8 {
        if total_encounters >= self.mastery_at {
            4
        } else if total_encounters >= self.deepening_at {
            3
        } else if total_encounters >= self.return_at {
            2
        } else {
            1
        }
    }
}

/// Stage for a given encounter count using the default thresholds.
pub fn encounter_stage(total_encounters: u32) -> EncounterStage {
    EncounterThresholds::default().stage(total_encounters)
}

/// Relationship level for a given encounter count using the default thresholds.
pub fn relationship_level(total_encounters: u32) -> u8 {
    EncounterThresholds::default().level(total_encounters)
}

/// A fragment resolved for a motif at a given stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFragment {
    pub stage: EncounterStage,
    pub content: String,
    pub used_fallback: bool,
}

/// Look up the fragment for `stage`, falling back to the `first` fragment.
///
/// A motif with neither yields empty content, still flagged as a fallback.
pub fn resolve_fragment(
    entry: &MotifEntry,
    stage: EncounterStage,
    total_encounters: u32,
) -> ResolvedFragment {
    let (template, used_fallback): (Option<&Template>, bool) = match entry.fragment(stage) {
        Some(t) => (Some(t), false),
        None if stage == EncounterStage::First => (None, true),
        None => (entry.fragment(EncounterStage::First), true),
    };

    if used_fallback {
        warn!(
            "motif '{}' has no '{}' fragment, falling back to 'first'",
            entry.id, stage
        );
    }

    let content = template
        .map(|t| {
            t.render(&FragmentContext {
                name: &entry.name,
                family: &entry.family,
                encounters: total_encounters,
                stage,
            })
        })
        .unwrap_or_default();

    ResolvedFragment {
        stage,
        content,
        used_fallback,
    }
}
