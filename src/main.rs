mod terminal;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use cyberaware::scenario::story::cyberbullying_scenario;
use cyberaware::{PlayerConfig, ScenarioGraph};

fn load_scenario(path: Option<&String>) -> Result<ScenarioGraph> {
    let graph = match path {
        Some(path) => {
            info!("Loading scenario from: {path}");
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read scenario file {path}"))?;
            ScenarioGraph::from_json(&text).with_context(|| format!("invalid scenario file {path}"))?
        }
        None => {
            let graph = cyberbullying_scenario();
            graph.validate().context("built-in scenario is malformed")?;
            graph
        }
    };

    for warning in graph.lint() {
        warn!("Scenario lint: {warning}");
    }
    info!(
        "Scenario ready: {} nodes, entry {}, up to {} decisions",
        graph.len(),
        graph.entry_node_id(),
        graph.longest_path()
    );

    Ok(graph)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging. Control verbosity with RUST_LOG env var:
    //   RUST_LOG=info   cargo run               # node changes + choices
    //   RUST_LOG=debug  cargo run               # + ignored stimuli, timer scheduling
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.get(1).is_some_and(|a| a == "-h" || a == "--help") {
        println!(
            "Usage: cyberaware [scenario.json] [auto_advance_ms]\n\
             \n\
             Without a scenario file the built-in group chat story is played.\n\
             \n\
             Logging: set RUST_LOG=debug for verbose output"
        );
        return Ok(());
    }

    let mut config = PlayerConfig::default();
    if let Some(ms) = args.get(2) {
        let ms: u64 = ms
            .parse()
            .with_context(|| format!("auto_advance_ms must be a number of milliseconds, got '{ms}'"))?;
        config.auto_advance_delay = Duration::from_millis(ms);
    }

    // "-" keeps the built-in story while still allowing a custom delay.
    let path = args.get(1).filter(|p| p.as_str() != "-");
    let graph = load_scenario(path)?;

    println!("Auto-advance delay: {:?}", config.auto_advance_delay);

    terminal::run(Arc::new(graph), config).await
}
