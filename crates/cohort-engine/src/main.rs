//! Engine binary for Cohort.
//!
//! Wires configuration, the scripted decision provider, operator
//! controls, and the observer together, then either runs the configured
//! experiment or replays a recorded live feed.
//!
//! # Usage
//!
//! ```text
//! cohort-engine [--config <path>] [run [--personas <path>]]
//! cohort-engine [--config <path>] replay <feed.jsonl> [--serve]
//! ```
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `cohort-config.yaml` (defaults if absent)
//! 3. Create operator state and install the Ctrl-C handler
//! 4. Start the observer API server, if enabled
//! 5. Run the experiment (or replay the feed)
//! 6. Log the results and print them as JSON

mod error;
mod observer_callback;
mod scripted;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cohort_core::{CohortConfig, ExperimentRunner, OperatorState};
use cohort_core::config::ObserverSettings;
use cohort_observer::{AppState, ServerConfig};
use cohort_stream::{LiveStreamAggregator, consume, frames};
use cohort_types::{IdAllocator, UuidV7Ids};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::observer_callback::ObserverCallback;
use crate::scripted::ScriptedDecisionProvider;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG: &str = "cohort-config.yaml";

/// Command line arguments for the engine.
#[derive(Parser, Debug)]
#[command(name = "cohort-engine")]
#[command(about = "Run Cohort experiments or replay a recorded live feed")]
struct Cli {
    /// Configuration file; defaults are used when it does not exist
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// What to do; runs the configured experiment when omitted
    #[command(subcommand)]
    command: Option<Command>,
}

/// What the binary was asked to do.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Run the configured experiment
    Run {
        /// JSON persona file to use instead of generated populations
        #[arg(long)]
        personas: Option<PathBuf>,
    },
    /// Feed a recorded JSON-lines event file through the live aggregator
    Replay {
        /// The JSON-lines feed file
        feed: PathBuf,

        /// Keep the observer serving the replayed state until Ctrl-C
        #[arg(long)]
        serve: bool,
    },
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the experiment, or the replay fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|e| {
            eprintln!("RUST_LOG not usable ({e}), defaulting to info");
            EnvFilter::new("info")
        }))
        .with_target(true)
        .init();

    info!("cohort-engine starting");

    match cli.command.unwrap_or(Command::Run { personas: None }) {
        Command::Run { personas } => run(&cli.config, personas.as_deref()).await?,
        Command::Replay { feed, serve } => replay(&cli.config, &feed, serve).await?,
    }
    Ok(())
}

async fn run(config_path: &Path, personas: Option<&Path>) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    info!(
        agents = config.simulation.agent_count,
        ticks_per_condition = config.simulation.ticks_per_condition,
        conditions = config.conditions.len(),
        tick_interval_ms = config.simulation.tick_interval_ms,
        decision_timeout_ms = config.simulation.decision_timeout_ms,
        seed = ?config.simulation.seed,
        "Configuration loaded"
    );

    let operator = Arc::new(OperatorState::new(config.simulation.tick_interval_ms));
    stop_on_ctrl_c(Arc::clone(&operator));

    let app_state = Arc::new(
        AppState::new(config.history.interaction_log_view).with_operator(Arc::clone(&operator)),
    );
    if config.observer.enabled {
        spawn_observer(&config.observer, Arc::clone(&app_state));
    }

    let ids: Arc<dyn IdAllocator> = Arc::new(UuidV7Ids);
    let mut runner =
        ExperimentRunner::new(config, ScriptedDecisionProvider, ids, Arc::clone(&operator))?;
    if let Some(path) = personas {
        let raw = read(path).await?;
        let personas = cohort_agents::parse_personas(&raw)?;
        info!(count = personas.len(), path = %path.display(), "External personas loaded");
        runner = runner.with_personas(personas);
    }

    let mut callback = ObserverCallback::new(app_state);
    let report = runner.run(&mut callback).await?;
    callback.flush().await;

    for result in &report.results {
        info!(
            condition = %result.condition_name,
            avg_sentiment = format!("{:+.3}", result.avg_sentiment),
            polarization = format!("{:.3}", result.polarization),
            cooperation_rate = format!("{:.3}", result.cooperation_rate),
            groups = result.group_count,
            ticks = result.tick_count,
            "Condition summary"
        );
    }
    info!(
        experiment = %report.experiment_id,
        end_reason = ?report.end_reason,
        completed = report.results.len(),
        "cohort-engine run complete"
    );

    println!("{}", serde_json::to_string_pretty(&report.results)?);
    Ok(())
}

async fn replay(config_path: &Path, feed: &Path, serve: bool) -> Result<(), EngineError> {
    let config = load_config(config_path)?;
    let raw = read(feed).await?;
    let lines: Vec<String> = raw.lines().map(str::to_owned).collect();
    info!(path = %feed.display(), frames = lines.len(), "Replaying live feed");

    let app_state = Arc::new(AppState::new(config.history.interaction_log_view));
    if serve {
        spawn_observer(&config.observer, Arc::clone(&app_state));
    }

    let mut aggregator = LiveStreamAggregator::new(config.stream.reasoning_history_cap);
    let live = Arc::clone(&app_state.live);
    let result = consume(frames(lines), &mut aggregator, ctrl_c(), |agg| {
        if let Ok(mut slot) = live.try_write() {
            *slot = Some(agg.snapshot());
        }
    })
    .await;

    let snapshot = aggregator.snapshot();
    *app_state.live.write().await = Some(snapshot.clone());
    match &result {
        Ok(outcome) => info!(?outcome, summary = %snapshot.summary, "Replay finished"),
        Err(e) => warn!(error = %e, summary = %snapshot.summary, "Replay stopped on feed error"),
    }
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    if serve {
        info!("Observer still serving the replay; Ctrl-C to exit");
        ctrl_c().await;
    }
    result?;
    Ok(())
}

/// Load configuration, falling back to defaults when the file is absent.
fn load_config(path: &Path) -> Result<CohortConfig, EngineError> {
    if path.exists() {
        Ok(CohortConfig::from_file(path)?)
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        let mut config = CohortConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

async fn read(path: &Path) -> Result<String, EngineError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| EngineError::Read {
            path: path.display().to_string(),
            source,
        })
}

/// Resolve on Ctrl-C. Never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}

fn stop_on_ctrl_c(operator: Arc<OperatorState>) {
    tokio::spawn(async move {
        ctrl_c().await;
        info!("Ctrl-C received, requesting stop");
        operator.request_stop();
    });
}

fn spawn_observer(settings: &ObserverSettings, state: Arc<AppState>) {
    let server = ServerConfig {
        host: settings.host.clone(),
        port: settings.port,
    };
    tokio::spawn(async move {
        if let Err(e) = cohort_observer::start_server(&server, state).await {
            error!(error = %e, "Observer API server stopped");
        }
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(raw: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("cohort-engine").chain(raw.iter().copied()))
    }

    #[test]
    fn no_arguments_runs_with_default_config() {
        let cli = parse(&[]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(cli.command, None);
    }

    #[test]
    fn run_accepts_config_and_personas() {
        let cli = parse(&["run", "--personas", "p.json", "--config", "c.yaml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("c.yaml"));
        assert_eq!(
            cli.command,
            Some(Command::Run {
                personas: Some(PathBuf::from("p.json")),
            })
        );
    }

    #[test]
    fn replay_needs_a_feed() {
        assert!(parse(&["replay"]).is_err());
        let cli = parse(&["replay", "feed.jsonl", "--serve"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(
            cli.command,
            Some(Command::Replay {
                feed: PathBuf::from("feed.jsonl"),
                serve: true,
            })
        );
    }

    #[test]
    fn stray_arguments_are_rejected() {
        assert!(parse(&["--serve"]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["replay", "a", "b"]).is_err());
        assert!(parse(&["replay", "a", "--personas", "p.json"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
