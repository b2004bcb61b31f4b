use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::motif::EncounterStage;

/// Identity and timestamp of a completed content session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStamp {
    pub id: String,
    pub date: DateTime<Utc>,
}

impl SessionStamp {
    pub fn new(id: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            date,
        }
    }

    pub fn now(id: impl Into<String>) -> Self {
        Self::new(id, Utc::now())
    }
}

/// One delivery of a motif to the listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub session_id: String,
    pub stage: EncounterStage,
}

/// Cumulative relationship between the listener and a single motif.
///
/// `relationship_level` is derived from `total_encounters` and is only
/// written by the history updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipRecord {
    pub motif_id: String,
    pub total_encounters: u32,
    pub first_session_id: Option<String>,
    pub first_session_date: Option<DateTime<Utc>>,
    pub last_session_id: Option<String>,
    pub last_session_date: Option<DateTime<Utc>>,
    pub(crate) relationship_level: u8,
    #[serde(default)]
    pub encounter_history: Vec<EncounterRecord>,
}

impl RelationshipRecord {
    pub(crate) fn new(motif_id: impl Into<String>) -> Self {
        Self {
            motif_id: motif_id.into(),
            total_encounters: 0,
            first_session_id: None,
            first_session_date: None,
            last_session_id: None,
            last_session_date: None,
            relationship_level: 1,
            encounter_history: Vec::new(),
        }
    }

    pub fn relationship_level(&self) -> u8 {
        self.relationship_level
    }

    /// How many encounters were delivered at each stage.
    pub fn stage_counts(&self) -> BTreeMap<EncounterStage, u32> {
        let mut counts = BTreeMap::new();
        for encounter in &self.encounter_history {
            *counts.entry(encounter.stage).or_insert(0) += 1;
        }
        counts
    }
}

/// Rotation and recency counters used to suppress over-repetition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    /// Sessions since each motif was last used. Absent means never used.
    #[serde(default)]
    pub sessions_since_use: BTreeMap<String, u32>,
    /// Families used per recent session, oldest first.
    #[serde(default)]
    pub recent_session_families: Vec<Vec<String>>,
    #[serde(default)]
    pub family_usage_counts: BTreeMap<String, u32>,
}

impl CooldownState {
    pub fn sessions_since_use(&self, motif_id: &str) -> Option<u32> {
        self.sessions_since_use.get(motif_id).copied()
    }

    /// Families used in the most recent recorded session.
    pub fn last_session_families(&self) -> &[String] {
        self.recent_session_families
            .last()
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Everything persisted for one listener.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryState {
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipRecord>,
    #[serde(default)]
    pub cooldowns: CooldownState,
    #[serde(default)]
    pub sessions_recorded: u32,
}

impl HistoryState {
    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty() && self.sessions_recorded == 0
    }

    pub fn relationship(&self, motif_id: &str) -> Option<&RelationshipRecord> {
        self.relationships.get(motif_id)
    }

    pub fn total_encounters(&self, motif_id: &str) -> u32 {
        self.relationship(motif_id)
            .map(|r| r.total_encounters)
            .unwrap_or(0)
    }

    /// Family with the highest cumulative usage; ties go to the
    /// alphabetically first family.
    pub fn most_used_family(&self) -> Option<(&str, u32)> {
        self.cooldowns
            .family_usage_counts
            .iter()
            .fold(None, |best: Option<(&str, u32)>, (family, count)| match best {
                Some((_, best_count)) if best_count >= *count => best,
                _ => Some((family.as_str(), *count)),
            })
    }
}
