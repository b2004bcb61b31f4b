/// Motif catalog — RON loading, validation and lint.

use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::core::config::EngineConfig;
use crate::core::fragment::{FragmentError, Template};
use crate::schema::motif::{EncounterStage, Intensity, MotifEntry};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("catalog entry #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },
    #[error("duplicate motif id '{0}'")]
    DuplicateId(String),
    #[error("motif '{id}' has an invalid '{stage}' fragment: {source}")]
    Fragment {
        id: String,
        stage: EncounterStage,
        #[source]
        source: FragmentError,
    },
}

// The catalog file shape differs from `MotifEntry`: fragments are plain
// strings keyed by stage name and every field is optional until validated.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RonStageFragments {
    first: Option<String>,
    #[serde(rename = "return")]
    return_: Option<String>,
    mastery: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "Motif")]
struct RonMotif {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    family: String,
    #[serde(default)]
    outcome_alignment: Vec<String>,
    #[serde(default)]
    applicable_phases: Vec<String>,
    #[serde(default)]
    intensity: Intensity,
    #[serde(default)]
    stage_fragments: RonStageFragments,
    #[serde(default)]
    synergies: Vec<String>,
    #[serde(default)]
    conflicts: Vec<String>,
}

/// Non-fatal catalog problems worth reporting to an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintIssue {
    UnknownFamily { id: String, family: String },
    DanglingSynergy { id: String, target: String },
    DanglingConflict { id: String, target: String },
    AsymmetricConflict { id: String, target: String },
    SelfReference { id: String },
    MissingFirstFragment { id: String },
    IdFamilyMismatch { id: String, family: String },
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFamily { id, family } => {
                write!(f, "'{}' uses unknown family '{}'", id, family)
            }
            Self::DanglingSynergy { id, target } => {
                write!(f, "'{}' lists synergy with unknown motif '{}'", id, target)
            }
            Self::DanglingConflict { id, target } => {
                write!(f, "'{}' lists conflict with unknown motif '{}'", id, target)
            }
            Self::AsymmetricConflict { id, target } => write!(
                f,
                "'{}' conflicts with '{}' but not the other way around",
                id, target
            ),
            Self::SelfReference { id } => {
                write!(f, "'{}' lists itself as a synergy or conflict", id)
            }
            Self::MissingFirstFragment { id } => {
                write!(f, "'{}' has no 'first' fragment to fall back on", id)
            }
            Self::IdFamilyMismatch { id, family } => {
                write!(f, "'{}' is not prefixed with its family '{}'", id, family)
            }
        }
    }
}

/// All loaded motifs, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: FxHashMap<String, MotifEntry>,
    known_families: Vec<String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from already-typed entries, rejecting duplicate ids.
    pub fn from_entries(
        entries: impl IntoIterator<Item = MotifEntry>,
        config: &EngineConfig,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Catalog {
            entries: FxHashMap::default(),
            known_families: config.known_families.clone(),
        };
        for entry in entries {
            catalog.insert(entry, config)?;
        }
        Ok(catalog)
    }

    /// Load a catalog from a RON file containing a list of motifs.
    pub fn load_from_ron(path: &Path, config: &EngineConfig) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::parse_ron(&contents, config)?;
        info!(
            "loaded {} motifs from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    pub fn parse_ron(input: &str, config: &EngineConfig) -> Result<Self, CatalogError> {
        let raw: Vec<RonMotif> = ron::from_str(input)?;
        let mut entries = Vec::with_capacity(raw.len());

        for (index, motif) in raw.into_iter().enumerate() {
            for (field, value) in [
                ("id", &motif.id),
                ("name", &motif.name),
                ("family", &motif.family),
            ] {
                if value.trim().is_empty() {
                    return Err(CatalogError::MissingField { index, field });
                }
            }

            let mut stage_fragments = HashMap::new();
            for (stage, text) in [
                (EncounterStage::First, motif.stage_fragments.first),
                (EncounterStage::Return, motif.stage_fragments.return_),
                (EncounterStage::Mastery, motif.stage_fragments.mastery),
            ] {
                let Some(text) = text else { continue };
                if text.trim().is_empty() {
                    continue;
                }
                let template = Template::parse(&text).map_err(|source| CatalogError::Fragment {
                    id: motif.id.clone(),
                    stage,
                    source,
                })?;
                stage_fragments.insert(stage, template);
            }

            entries.push(MotifEntry {
                id: motif.id,
                name: motif.name,
                family: motif.family,
                outcome_alignment: motif.outcome_alignment.into_iter().collect(),
                applicable_phases: motif.applicable_phases.into_iter().collect(),
                intensity: motif.intensity,
                stage_fragments,
                synergies: motif.synergies.into_iter().collect(),
                conflicts: motif.conflicts.into_iter().collect(),
            });
        }

        Self::from_entries(entries, config)
    }

    fn insert(&mut self, entry: MotifEntry, config: &EngineConfig) -> Result<(), CatalogError> {
        if self.entries.contains_key(&entry.id) {
            return Err(CatalogError::DuplicateId(entry.id));
        }
        if !config.is_known_family(&entry.family) {
            warn!(
                "motif '{}' uses unknown family '{}'; keeping it",
                entry.id, entry.family
            );
        }
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&MotifEntry> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by id, so callers iterate in a stable order.
    pub fn sorted(&self) -> Vec<&MotifEntry> {
        let mut entries: Vec<&MotifEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn families(&self) -> FxHashSet<&str> {
        self.entries.values().map(|e| e.family.as_str()).collect()
    }

    /// Collect non-fatal issues, sorted by motif id.
    pub fn lint(&self) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        for entry in self.sorted() {
            let id = entry.id.clone();

            if !self.known_families.is_empty() && !self.known_families.contains(&entry.family) {
                issues.push(LintIssue::UnknownFamily {
                    id: id.clone(),
                    family: entry.family.clone(),
                });
            }

            if !entry.id.starts_with(&format!("{}.", entry.family)) {
                issues.push(LintIssue::IdFamilyMismatch {
                    id: id.clone(),
                    family: entry.family.clone(),
                });
            }

            if entry.synergies.contains(&entry.id) || entry.conflicts.contains(&entry.id) {
                issues.push(LintIssue::SelfReference { id: id.clone() });
            }

            if entry.fragment(EncounterStage::First).is_none() {
                issues.push(LintIssue::MissingFirstFragment { id: id.clone() });
            }

            let mut synergies: Vec<&String> = entry.synergies.iter().collect();
            synergies.sort();
            for target in synergies {
                if target != &entry.id && !self.contains(target) {
                    issues.push(LintIssue::DanglingSynergy {
                        id: id.clone(),
                        target: target.clone(),
                    });
                }
            }

            let mut conflicts: Vec<&String> = entry.conflicts.iter().collect();
            conflicts.sort();
            for target in conflicts {
                if target == &entry.id {
                    continue;
                }
                match self.get(target) {
                    None => issues.push(LintIssue::DanglingConflict {
                        id: id.clone(),
                        target: target.clone(),
                    }),
                    Some(other) if !other.conflicts.contains(&entry.id) => {
                        issues.push(LintIssue::AsymmetricConflict {
                            id: id.clone(),
                            target: target.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }
}

/// Load a catalog file. Shorthand for [`Catalog::load_from_ron`].
pub fn load_catalog(path: &Path, config: &EngineConfig) -> Result<Catalog, CatalogError> {
    Catalog::load_from_ron(path, config)
}
