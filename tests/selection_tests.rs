/// Selection integration tests — catalog fixtures through the full selector.

use motif_engine::core::catalog::Catalog;
use motif_engine::core::config::EngineConfig;
use motif_engine::core::engine::MotifEngine;
use motif_engine::core::scorer::Scorer;
use motif_engine::core::selector::{SelectionError, Selector};
use motif_engine::core::updater::HistoryUpdater;
use motif_engine::schema::history::{HistoryState, SessionStamp};
use motif_engine::schema::motif::EncounterStage;
use motif_engine::schema::request::{Broadening, Role, SelectionRequest};
use std::collections::HashSet;
use std::path::Path;

fn archetype_catalog(config: &EngineConfig) -> Catalog {
    Catalog::load_from_ron(Path::new("tests/fixtures/test_catalog.ron"), config).unwrap()
}

#[test]
fn fixture_catalog_is_clean() {
    let config = EngineConfig::archetypes();
    let catalog = archetype_catalog(&config);
    assert_eq!(catalog.len(), 5);
    assert!(catalog.lint().is_empty(), "{:?}", catalog.lint());
}

#[test]
fn new_listener_gets_three_first_encounters() {
    let config = EngineConfig::archetypes();
    let catalog = archetype_catalog(&config);
    let req = SelectionRequest::new("healing", 3).with_phases(&["journey"]);

    let outcome = Selector::new(&config)
        .select(&catalog, &req, &HistoryState::default())
        .unwrap();

    assert_eq!(outcome.motifs.len(), 3);
    assert!(!outcome.partial);
    assert!(outcome.broadened.is_empty());
    assert_eq!(outcome.motifs[0].role, Role::Primary);
    assert_eq!(outcome.primary(), Some(&outcome.motifs[0]));
    assert!(!outcome.any_fallback());
    assert!(outcome
        .motifs
        .iter()
        .all(|m| m.encounter_stage == EncounterStage::First));

    let families: HashSet<&str> = outcome.motifs.iter().map(|m| m.family.as_str()).collect();
    assert!(families.len() >= 2);

    assert_eq!(
        outcome.ids(),
        vec!["guide.elder", "shadow.double", "guide.healer"]
    );
    assert_eq!(
        outcome.motifs[0].content_fragment,
        "An old figure waits at the edge of the path."
    );
}

#[test]
fn repeated_selection_is_identical() {
    let config = EngineConfig::archetypes();
    let catalog = archetype_catalog(&config);
    let req = SelectionRequest::new("transformation", 3).with_phases(&["journey", "return"]);
    let selector = Selector::new(&config);
    let hist = HistoryState::default();

    let first = selector.select(&catalog, &req, &hist).unwrap();
    for _ in 0..10 {
        assert_eq!(selector.select(&catalog, &req, &hist).unwrap(), first);
    }
}

#[test]
fn results_respect_bounds_duplicates_and_conflicts() {
    let config = EngineConfig::default();
    let catalog = archetype_catalog(&config);
    let selector = Selector::new(&config);

    for outcome_tag in ["healing", "transformation", "sleep", "confidence"] {
        for count in 1..=7 {
            let req = SelectionRequest::new(outcome_tag, count);
            let outcome = selector
                .select(&catalog, &req, &HistoryState::default())
                .unwrap();

            assert!(outcome.motifs.len() <= count.min(config.max_count));
            assert!(!outcome.motifs.is_empty());

            let ids: HashSet<&str> = outcome.ids().into_iter().collect();
            assert_eq!(ids.len(), outcome.motifs.len(), "duplicate ids");

            for a in &outcome.motifs {
                let entry = catalog.get(&a.motif_id).unwrap();
                for b in &outcome.motifs {
                    assert!(
                        !entry.conflicts.contains(&b.motif_id),
                        "{} conflicts with {}",
                        a.motif_id,
                        b.motif_id
                    );
                }
            }
        }
    }
}

#[test]
fn recently_used_motif_scores_lower() {
    let config = EngineConfig::archetypes();
    let catalog = archetype_catalog(&config);
    let updater = HistoryUpdater::new(&config);

    let mut hist = HistoryState::default();
    for n in 1..=3 {
        hist = updater.record_usage_by_id(
            hist,
            &SessionStamp::now(format!("s{}", n)),
            &["guide.elder"],
            &catalog,
        );
    }

    let req = SelectionRequest::new("healing", 3).with_phases(&["journey"]);
    let scorer = Scorer::new(&config);
    let elder = scorer.score(catalog.get("guide.elder").unwrap(), &req, &hist, &[]);
    let healer = scorer.score(catalog.get("guide.healer").unwrap(), &req, &hist, &[]);
    assert!(elder < healer, "elder {} vs healer {}", elder, healer);
}

#[test]
fn seven_sessions_reach_mastery_fragment() {
    let mut engine = MotifEngine::builder()
        .config(EngineConfig::archetypes())
        .catalog_path("tests/fixtures/test_catalog.ron")
        .build()
        .unwrap();

    for n in 1..=7 {
        engine
            .record_session_ids(&SessionStamp::now(format!("s{}", n)), &["guide.elder"])
            .unwrap();
    }

    let record = engine.history().relationship("guide.elder").unwrap();
    assert_eq!(record.total_encounters, 7);
    assert_eq!(record.relationship_level(), 4);

    let req = SelectionRequest::new("healing", 3)
        .with_phases(&["journey"])
        .excluding(&["guide.healer"]);
    let outcome = engine.select(&req).unwrap();
    let elder = outcome
        .motifs
        .iter()
        .find(|m| m.motif_id == "guide.elder")
        .unwrap();
    assert_eq!(elder.encounter_stage, EncounterStage::Mastery);
    assert_eq!(elder.relationship_level, 4);
    assert!(!elder.used_fallback);
    assert!(!outcome.any_fallback());
    assert_eq!(
        elder.content_fragment,
        "The Elder walks beside you now, as familiar as breath."
    );
}

#[test]
fn anchors_cover_physical_and_mental_buckets() {
    let config = EngineConfig::anchors();
    let catalog =
        Catalog::load_from_ron(Path::new("tests/fixtures/anchors_catalog.ron"), &config).unwrap();
    let req = SelectionRequest::new("sleep", 3).with_phases(&["induction", "deepening"]);

    let outcome = Selector::new(&config)
        .select(&catalog, &req, &HistoryState::default())
        .unwrap();
    assert_eq!(
        outcome.ids(),
        vec!["breath.wave", "sound.ocean", "body.heavy_limbs"]
    );
}

#[test]
fn unmatched_outcome_broadens_and_still_fills() {
    let config = EngineConfig::archetypes();
    let catalog = archetype_catalog(&config);
    let req = SelectionRequest::new("grief", 3).with_phases(&["journey"]);

    let outcome = Selector::new(&config)
        .select(&catalog, &req, &HistoryState::default())
        .unwrap();
    assert_eq!(
        outcome.broadened,
        vec![
            Broadening::PhaseFilterDropped,
            Broadening::OutcomeFilterDropped
        ]
    );
    assert_eq!(outcome.motifs.len(), 3);
}

#[test]
fn everything_excluded_is_partial_not_error() {
    let config = EngineConfig::archetypes();
    let catalog = archetype_catalog(&config);
    let req = SelectionRequest::new("healing", 2).excluding(&[
        "guide.elder",
        "guide.healer",
        "guide.lantern",
        "shadow.double",
        "shadow.wolf",
    ]);

    let outcome = Selector::new(&config)
        .select(&catalog, &req, &HistoryState::default())
        .unwrap();
    assert!(outcome.motifs.is_empty());
    assert!(outcome.partial);
}

#[test]
fn empty_catalog_fails() {
    let config = EngineConfig::default();
    let catalog = Catalog::parse_ron("[]", &config).unwrap();
    let err = Selector::new(&config)
        .select(
            &catalog,
            &SelectionRequest::new("healing", 3),
            &HistoryState::default(),
        )
        .unwrap_err();
    assert!(matches!(err, SelectionError::InsufficientCandidates { .. }));
}

#[test]
fn config_fixture_loads() {
    let config = EngineConfig::load_from_ron(Path::new("tests/fixtures/test_config.ron")).unwrap();
    assert_eq!(config.cooldown_window, 4);
    assert_eq!(config.repetition_ceiling, 6);
    assert_eq!(config.max_count, 4);
    assert_eq!(config.weights.family_rotation_penalty, 0.05);
    assert_eq!(config.weights.outcome_match, 1.0);
    assert!(config.outcomes_related("relaxation", "healing"));
    assert_eq!(config.buckets.secondary, vec!["shadow".to_string()]);
}
