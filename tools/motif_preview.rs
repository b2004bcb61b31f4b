/// Motif Preview — run one selection against a catalog and listener history.
///
/// Usage: motif_preview --catalog <file> --outcome <tag> [options]
///
/// Options:
///   --history <file>        listener history (missing file = new listener)
///   --preset <name>         archetypes | anchors
///   --config <file>         RON engine configuration
///   --phases <a,b,..>       journey phases
///   --count <n>             motifs to select (default 3)
///   --exclude <id,id,..>    motif ids to leave out
///   --require <fam,fam,..>  families to pick first
///   --no-recurring          do not favour familiar motifs
///   --record <session-id>   record the selection into the history file

use motif_engine::core::config::EngineConfig;
use motif_engine::core::engine::MotifEngine;
use motif_engine::schema::history::SessionStamp;
use motif_engine::schema::request::SelectionRequest;
use std::process;

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn print_usage() {
    println!("Usage: motif_preview --catalog <file> --outcome <tag> [--history <file>]");
    println!("       [--preset archetypes|anchors] [--config <file>] [--phases a,b]");
    println!("       [--count n] [--exclude id,id] [--require fam,fam] [--no-recurring]");
    println!("       [--record <session-id>]");
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut history_path = None;
    let mut config_path = None;
    let mut config = EngineConfig::default();
    let mut request = SelectionRequest::new("", 3);
    let mut record_as = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--history" if i + 1 < args.len() => {
                i += 1;
                history_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--preset" if i + 1 < args.len() => {
                i += 1;
                config = match args[i].as_str() {
                    "archetypes" => EngineConfig::archetypes(),
                    "anchors" => EngineConfig::anchors(),
                    other => {
                        eprintln!("Unknown preset: {}", other);
                        process::exit(1);
                    }
                };
            }
            "--outcome" if i + 1 < args.len() => {
                i += 1;
                request.outcome = args[i].clone();
            }
            "--phases" if i + 1 < args.len() => {
                i += 1;
                request.journey_phases = split_list(&args[i]);
            }
            "--count" if i + 1 < args.len() => {
                i += 1;
                request.count = match args[i].parse() {
                    Ok(n) => n,
                    Err(_) => {
                        eprintln!("Invalid --count: {}", args[i]);
                        process::exit(1);
                    }
                };
            }
            "--exclude" if i + 1 < args.len() => {
                i += 1;
                request.exclude_ids = split_list(&args[i]);
            }
            "--require" if i + 1 < args.len() => {
                i += 1;
                request.required_categories = Some(split_list(&args[i]));
            }
            "--no-recurring" => {
                request.prefer_recurring = false;
            }
            "--record" if i + 1 < args.len() => {
                i += 1;
                record_as = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let Some(catalog_path) = catalog_path else {
        eprintln!("ERROR: --catalog is required");
        process::exit(1);
    };
    if request.outcome.is_empty() {
        eprintln!("ERROR: --outcome is required");
        process::exit(1);
    }

    let mut builder = MotifEngine::builder().config(config).catalog_path(&catalog_path);
    if let Some(ref path) = config_path {
        builder = builder.config_path(path);
    }
    if let Some(ref path) = history_path {
        builder = builder.history_path(path);
    }

    let mut engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    let history = engine.history();
    println!(
        "Catalog: {} motifs | History: {} sessions, {} relationships",
        engine.catalog().len(),
        history.sessions_recorded,
        history.relationships.len()
    );
    if let Some((family, uses)) = history.most_used_family() {
        println!("Most used family: {} ({} sessions)", family, uses);
    }

    let outcome = match engine.select(&request) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!(
        "\n=== Selection ({} of {}) ===\n",
        outcome.motifs.len(),
        outcome.requested
    );
    for m in &outcome.motifs {
        println!(
            "  [{:<9}] {:<24} {:<10} stage={:<8} level={} score={:.3}{}",
            m.role.to_string(),
            m.motif_id,
            m.family,
            m.encounter_stage.to_string(),
            m.relationship_level,
            m.score,
            if m.used_fallback { " (fallback)" } else { "" }
        );
        if !m.content_fragment.is_empty() {
            println!("      {}", m.content_fragment);
        }
    }
    if let Some(primary) = outcome.primary() {
        println!("\nPrimary: {} ({})", primary.name, primary.motif_id);
    }
    if outcome.any_fallback() {
        println!("NOTE: some motifs used their first-encounter fragment as a fallback");
    }
    if outcome.partial {
        println!("\nNOTE: fewer motifs available than requested");
    }
    for step in &outcome.broadened {
        println!("NOTE: filter relaxed: {:?}", step);
    }

    if let Some(session_id) = record_as {
        if history_path.is_none() {
            eprintln!("ERROR: --record needs --history");
            process::exit(1);
        }
        match engine.record_session(&SessionStamp::now(session_id.as_str()), &outcome.motifs) {
            Ok(()) => println!(
                "\nRecorded session '{}' ({} sessions total)",
                session_id,
                engine.history().sessions_recorded
            ),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
    }
}
