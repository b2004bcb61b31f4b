/// Catalog Linter — validates a motif catalog and reports authoring issues.
///
/// Usage: catalog_linter <catalog.ron> [--preset archetypes|anchors] [--config <file>]

use motif_engine::core::catalog::Catalog;
use motif_engine::core::config::EngineConfig;
use motif_engine::schema::motif::EncounterStage;
use std::collections::BTreeMap;
use std::path::Path;
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: catalog_linter <catalog.ron> [--preset archetypes|anchors] [--config <file>]");
        process::exit(0);
    }

    let catalog_path = &args[1];
    let mut config = EngineConfig::default();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--preset" if i + 1 < args.len() => {
                i += 1;
                config = match args[i].as_str() {
                    "archetypes" => EngineConfig::archetypes(),
                    "anchors" => EngineConfig::anchors(),
                    other => {
                        eprintln!("ERROR: Unknown preset '{}'", other);
                        process::exit(1);
                    }
                };
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config = match EngineConfig::load_from_ron(Path::new(&args[i])) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("ERROR: Failed to load config: {}", e);
                        process::exit(1);
                    }
                };
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let catalog = match Catalog::load_from_ron(Path::new(catalog_path), &config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("Loaded {} motifs", catalog.len());

    let mut by_family: BTreeMap<&str, usize> = BTreeMap::new();
    let mut bespoke = [0usize; 3];
    for entry in catalog.sorted() {
        *by_family.entry(entry.family.as_str()).or_insert(0) += 1;
        for (slot, stage) in [
            EncounterStage::First,
            EncounterStage::Return,
            EncounterStage::Mastery,
        ]
        .iter()
        .enumerate()
        {
            if entry.fragment(*stage).is_some() {
                bespoke[slot] += 1;
            }
        }
    }

    println!("\n=== Families ===\n");
    for (family, count) in &by_family {
        println!("  {:<12} {}", family, count);
    }

    println!(
        "\nFragments: first {}, return {}, mastery {}",
        bespoke[0], bespoke[1], bespoke[2]
    );

    let families = catalog.families();
    for (name, bucket) in [
        ("primary", &config.buckets.primary),
        ("secondary", &config.buckets.secondary),
    ] {
        if !bucket.is_empty() && !bucket.iter().any(|f| families.contains(f.as_str())) {
            println!(
                "WARNING: no motifs in the {} diversity bucket ({})",
                name,
                bucket.join(", ")
            );
        }
    }

    let issues = catalog.lint();

    println!("\n=== Catalog Lint Report ===\n");
    if issues.is_empty() {
        println!("All checks passed!");
    }
    for issue in &issues {
        println!("WARNING: {}", issue);
    }
    println!("\nSummary: {} warnings", issues.len());
}
