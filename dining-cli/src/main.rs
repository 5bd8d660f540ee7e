// ABOUTME: Command-line runner for the dining simulation.
// ABOUTME: Reads dining.json and env overrides, then draws a live status board.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use dining::prelude::*;

const CONFIG_FILE: &str = "dining.json";

fn find_config() -> Option<PathBuf> {
    // Try dining.json in current directory
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return Some(local);
    }

    // Try ~/.dining.json
    if let Some(home) = dirs::home_dir() {
        let global = home.join(format!(".{}", CONFIG_FILE));
        if global.exists() {
            return Some(global);
        }
    }

    None
}

fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid value for {}: {:?}", name, raw))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn load_config() -> Result<SimulationConfig> {
    let mut config = match find_config() {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            SimulationConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };

    if let Some(agents) = env_override("DINING_AGENTS")? {
        config = config.agent_count(agents);
    }
    if let Some(seed) = env_override("DINING_SEED")? {
        config = config.seed(seed);
    }
    if let Some(ms) = env_override("DINING_TIME_UNIT_MS")? {
        config = config.time_unit(Duration::from_millis(ms));
    }

    Ok(config)
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    // Logs go to stderr so they never tear the status board.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_logging("warn")?;

    let config = load_config()?;
    let agents = config.agent_count;
    let coordinator = Coordinator::new(config).context("Invalid configuration")?;

    println!("The {} agents begin dining\n", agents);
    let report = coordinator
        .run(Arc::new(ConsoleSink::stdout().in_place()))
        .await?;

    println!();
    println!("Every agent has died.");
    println!("Seed: {}", report.seed);
    println!("Feasts: {}", report.total_feasts());
    let starved = report.starved();
    if starved.is_empty() {
        println!("Nobody starved without a single feast.");
    } else {
        let names: Vec<String> = starved.iter().map(|id| format!("agent-{}", id)).collect();
        println!("Starved: {}", names.join(", "));
    }

    Ok(())
}
