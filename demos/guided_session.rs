//! Guided session demo: one listener, a small archetype catalog, and a
//! week of sessions showing relationships deepen and motifs rotate.
//!
//! Run with: cargo run --example guided_session

use motif_engine::core::config::EngineConfig;
use motif_engine::core::engine::MotifEngine;
use motif_engine::core::fragment::Template;
use motif_engine::schema::history::SessionStamp;
use motif_engine::schema::motif::{EncounterStage, Intensity, MotifEntry};
use motif_engine::schema::request::SelectionRequest;

fn fragment(text: &str) -> Template {
    Template::parse(text).expect("demo fragments are valid")
}

fn catalog() -> Vec<MotifEntry> {
    vec![
        MotifEntry::new("guide.elder", "The Elder", "guide")
            .with_outcome("healing")
            .with_phase("journey")
            .with_intensity(Intensity::Gentle)
            .with_fragment(EncounterStage::First, fragment("An old figure waits by the fire."))
            .with_fragment(EncounterStage::Return, fragment("{name} remembers you."))
            .with_fragment(
                EncounterStage::Mastery,
                fragment("{name} no longer needs to speak; you know the way."),
            )
            .with_synergy("elemental.fire"),
        MotifEntry::new("healer.river_woman", "The River Woman", "healer")
            .with_outcome("healing")
            .with_phase("journey")
            .with_fragment(EncounterStage::First, fragment("Cool water runs over your hands.")),
        MotifEntry::new("elemental.fire", "Hearth Fire", "elemental")
            .with_outcome("transformation")
            .with_phase("journey")
            .with_fragment(EncounterStage::First, fragment("The fire crackles softly."))
            .with_fragment(EncounterStage::Return, fragment("The {name} burns a little brighter.")),
        MotifEntry::new("animal.owl", "The Owl", "animal")
            .with_outcome("healing")
            .with_phase("return")
            .with_fragment(EncounterStage::First, fragment("An owl watches from the branch.")),
        MotifEntry::new("shadow.mask", "The Mask", "shadow")
            .with_outcome("transformation")
            .with_phase("journey")
            .with_intensity(Intensity::Strong)
            .with_fragment(EncounterStage::First, fragment("A mask lies face-down in the path.")),
    ]
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut engine = MotifEngine::builder()
        .config(EngineConfig::archetypes())
        .with_entries(catalog())
        .build()
        .expect("demo catalog is valid");

    let request = SelectionRequest::new("healing", 3).with_phases(&["journey", "return"]);

    for day in 1..=7 {
        let outcome = engine.select(&request).expect("selection succeeds");
        println!("--- Session {} ---", day);
        for m in &outcome.motifs {
            println!(
                "  {:<9} {:<20} [{} / level {}] {}",
                m.role.to_string(),
                m.name,
                m.encounter_stage,
                m.relationship_level,
                m.content_fragment
            );
        }
        engine
            .record_session(&SessionStamp::now(format!("day-{}", day)), &outcome.motifs)
            .expect("recording succeeds");
    }

    if let Some((family, uses)) = engine.history().most_used_family() {
        println!("\nMost used family: {} ({} sessions)", family, uses);
    }
}
