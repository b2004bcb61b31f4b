/// History updater — applies a completed session's motif usage to the
/// relationship, cooldown and rotation state. Never touches storage.

use log::{info, warn};
use rustc_hash::FxHashSet;

use crate::core::catalog::Catalog;
use crate::core::config::EngineConfig;
use crate::core::encounter::EncounterThresholds;
use crate::schema::history::{EncounterRecord, HistoryState, RelationshipRecord, SessionStamp};
use crate::schema::request::SelectedMotif;

pub struct HistoryUpdater {
    thresholds: EncounterThresholds,
    recent_family_sessions: usize,
}

impl HistoryUpdater {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            thresholds: config.thresholds,
            recent_family_sessions: config.recent_family_sessions,
        }
    }

    /// Record the motifs a session actually used.
    pub fn record_usage(
        &self,
        hist: HistoryState,
        session: &SessionStamp,
        used: &[SelectedMotif],
    ) -> HistoryState {
        let pairs: Vec<(String, String)> = used
            .iter()
            .map(|m| (m.motif_id.clone(), m.family.clone()))
            .collect();
        self.apply(hist, session, &pairs)
    }

    /// Record usage by motif id, resolving families through the catalog.
    /// Ids missing from the catalog are skipped with a warning.
    pub fn record_usage_by_id<S: AsRef<str>>(
        &self,
        hist: HistoryState,
        session: &SessionStamp,
        ids: &[S],
        catalog: &Catalog,
    ) -> HistoryState {
        let mut pairs = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            match catalog.get(id) {
                Some(entry) => pairs.push((entry.id.clone(), entry.family.clone())),
                None => warn!(
                    "session '{}' used unknown motif '{}'; not recorded",
                    session.id, id
                ),
            }
        }
        self.apply(hist, session, &pairs)
    }

    /// Apply `(motif_id, family)` usage for one session.
    pub(crate) fn apply(
        &self,
        mut hist: HistoryState,
        session: &SessionStamp,
        used: &[(String, String)],
    ) -> HistoryState {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut families: Vec<String> = Vec::new();

        for (motif_id, family) in used {
            if !seen.insert(motif_id.as_str()) {
                continue;
            }

            let record = hist
                .relationships
                .entry(motif_id.clone())
                .or_insert_with(|| RelationshipRecord::new(motif_id.clone()));

            // The stage delivered this session is the one before counting it.
            let stage = self.thresholds.stage(record.total_encounters);
            record.total_encounters = record.total_encounters.saturating_add(1);
            record.relationship_level = self.thresholds.level(record.total_encounters);
            if record.first_session_id.is_none() {
                record.first_session_id = Some(session.id.clone());
                record.first_session_date = Some(session.date);
            }
            record.last_session_id = Some(session.id.clone());
            record.last_session_date = Some(session.date);
            record.encounter_history.push(EncounterRecord {
                session_id: session.id.clone(),
                stage,
            });

            if !families.contains(family) {
                families.push(family.clone());
            }
        }

        let cooldowns = &mut hist.cooldowns;
        for (motif_id, since) in cooldowns.sessions_since_use.iter_mut() {
            if !seen.contains(motif_id.as_str()) {
                *since = since.saturating_add(1);
            }
        }
        for motif_id in &seen {
            cooldowns.sessions_since_use.insert(motif_id.to_string(), 0);
        }

        for family in &families {
            *cooldowns.family_usage_counts.entry(family.clone()).or_insert(0) += 1;
        }
        cooldowns.recent_session_families.push(families);
        let excess = cooldowns
            .recent_session_families
            .len()
            .saturating_sub(self.recent_family_sessions);
        cooldowns.recent_session_families.drain(..excess);

        hist.sessions_recorded = hist.sessions_recorded.saturating_add(1);

        info!(
            "recorded session '{}' with {} motifs",
            session.id,
            seen.len()
        );
        hist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::motif::{EncounterStage, MotifEntry};
    use chrono::{TimeZone, Utc};

    fn stamp(n: u32) -> SessionStamp {
        SessionStamp::new(
            format!("session-{}", n),
            Utc.with_ymd_and_hms(2024, 3, 1 + n, 9, 0, 0).unwrap(),
        )
    }

    fn pair(id: &str, family: &str) -> (String, String) {
        (id.to_string(), family.to_string())
    }

    #[test]
    fn first_use_creates_record() {
        let updater = HistoryUpdater::new(&EngineConfig::default());
        let hist = updater.apply(
            HistoryState::default(),
            &stamp(1),
            &[pair("guide.elder", "guide")],
        );

        let record = hist.relationship("guide.elder").unwrap();
        assert_eq!(record.total_encounters, 1);
        assert_eq!(record.relationship_level(), 2);
        assert_eq!(record.first_session_id.as_deref(), Some("session-1"));
        assert_eq!(record.last_session_id.as_deref(), Some("session-1"));
        assert_eq!(record.encounter_history[0].stage, EncounterStage::First);
        assert_eq!(hist.cooldowns.sessions_since_use("guide.elder"), Some(0));
        assert_eq!(hist.sessions_recorded, 1);
    }

    #[test]
    fn seven_sessions_reach_mastery() {
        let config = EngineConfig::default();
        let updater = HistoryUpdater::new(&config);
        let mut hist = HistoryState::default();
        for n in 1..=7 {
            hist = updater.apply(hist, &stamp(n), &[pair("guide.elder", "guide")]);
        }
        let record = hist.relationship("guide.elder").unwrap();
        assert_eq!(record.total_encounters, 7);
        assert_eq!(record.relationship_level(), 4);
        assert_eq!(
            config.thresholds.stage(record.total_encounters),
            EncounterStage::Mastery
        );
        assert_eq!(record.first_session_id.as_deref(), Some("session-1"));
        assert_eq!(record.last_session_id.as_deref(), Some("session-7"));
        assert_eq!(record.stage_counts().get(&EncounterStage::Return), Some(&6));
    }

    #[test]
    fn unused_motifs_cool_down() {
        let updater = HistoryUpdater::new(&EngineConfig::default());
        let mut hist = updater.apply(
            HistoryState::default(),
            &stamp(1),
            &[pair("guide.elder", "guide"), pair("nature.forest", "nature")],
        );
        hist = updater.apply(hist, &stamp(2), &[pair("nature.forest", "nature")]);
        hist = updater.apply(hist, &stamp(3), &[pair("breath.box", "breath")]);

        assert_eq!(hist.cooldowns.sessions_since_use("guide.elder"), Some(2));
        assert_eq!(hist.cooldowns.sessions_since_use("nature.forest"), Some(1));
        assert_eq!(hist.cooldowns.sessions_since_use("breath.box"), Some(0));
        assert_eq!(hist.cooldowns.sessions_since_use("shadow.double"), None);
    }

    #[test]
    fn duplicate_ids_count_once() {
        let updater = HistoryUpdater::new(&EngineConfig::default());
        let hist = updater.apply(
            HistoryState::default(),
            &stamp(1),
            &[pair("guide.elder", "guide"), pair("guide.elder", "guide")],
        );
        assert_eq!(hist.total_encounters("guide.elder"), 1);
        assert_eq!(hist.cooldowns.family_usage_counts.get("guide"), Some(&1));
    }

    #[test]
    fn family_rotation_is_bounded() {
        let updater = HistoryUpdater::new(&EngineConfig::default());
        let mut hist = HistoryState::default();
        for n in 1..=8 {
            let family = if n % 2 == 0 { "breath" } else { "nature" };
            hist = updater.apply(
                hist,
                &stamp(n),
                &[pair(&format!("{}.m{}", family, n), family)],
            );
        }
        assert_eq!(hist.cooldowns.recent_session_families.len(), 5);
        assert_eq!(hist.cooldowns.last_session_families(), &["breath".to_string()]);
        assert_eq!(hist.cooldowns.family_usage_counts.get("breath"), Some(&4));
        assert_eq!(hist.cooldowns.family_usage_counts.get("nature"), Some(&4));
    }

    #[test]
    fn encounters_never_decrease() {
        let updater = HistoryUpdater::new(&EngineConfig::default());
        let mut hist = HistoryState::default();
        let mut previous = 0;
        for n in 1..=10 {
            let used = if n % 3 == 0 {
                vec![]
            } else {
                vec![pair("guide.elder", "guide")]
            };
            hist = updater.apply(hist, &stamp(n), &used);
            let now = hist.total_encounters("guide.elder");
            assert!(now >= previous);
            previous = now;
        }
    }

    #[test]
    fn record_by_id_skips_unknown() {
        let config = EngineConfig::default();
        let catalog = Catalog::from_entries(
            vec![MotifEntry::new("guide.elder", "The Elder", "guide")],
            &config,
        )
        .unwrap();
        let updater = HistoryUpdater::new(&config);
        let hist = updater.record_usage_by_id(
            HistoryState::default(),
            &stamp(1),
            &["guide.elder", "ghost.missing"],
            &catalog,
        );
        assert_eq!(hist.total_encounters("guide.elder"), 1);
        assert!(hist.relationship("ghost.missing").is_none());
        assert_eq!(hist.cooldowns.family_usage_counts.len(), 1);
    }
}
