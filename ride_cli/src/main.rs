use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use live_engine::{CaptureEvent, Command, Configuration, LiveEngine};
use ride_tracker_data_management::DataManager;
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "RideCLI")]
#[command(about = "Replay recorded rides and inspect stored measurements", long_about = None)]
struct Cli {
    /// Measurement database. Defaults to the data directory of the project.
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    /// `key = value` configuration file for the live statistics.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed a JSON lines file of commands and capture events through the live engine.
    /// An unfinished measurement is restored first
    Replay { file: PathBuf },
    /// Show the statistics of the unfinished measurement, if there is one
    Status,
    /// List stored measurements
    List,
}

/// One line of a replay file: either `{"command":"pause"}` or a capture event.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayLine {
    Command { command: Command },
    Event(CaptureEvent),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=trace,live_engine=info,ride_tracker_data_management=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Configuration::load(path)?,
        None => Configuration::default(),
    };
    let data_manager = match &cli.database {
        Some(path) => DataManager::open(path).await?,
        None => DataManager::start().await?,
    };
    let data_manager = Arc::new(data_manager);

    match &cli.command {
        Commands::Replay { file } => replay(data_manager, config, file).await?,
        Commands::Status => {
            let mut engine = LiveEngine::new(data_manager, config);
            if engine.restore_paused_session().await? {
                println!("{}", engine.statistics().summary());
            } else {
                println!("No unfinished measurement");
            }
        }
        Commands::List => {
            for measurement in data_manager.get_measurements().await? {
                let tracks = data_manager.get_track_count(measurement.session_id).await?;
                println!(
                    "{}\t{}\t{}\t{} tracks\t{}",
                    measurement.session_id,
                    measurement.timestamp.with_timezone(&Local).format("%d/%m/%Y %H:%M"),
                    measurement.state,
                    tracks,
                    if measurement.synchronized { "synced" } else { "-" },
                );
            }
        }
    }

    Ok(())
}

async fn replay(data_manager: Arc<DataManager>, config: Configuration, file: &PathBuf) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read replay file {}", file.display()))?;

    let mut engine = LiveEngine::new(data_manager, config);
    if engine.restore_paused_session().await? {
        println!("restored  {}", engine.statistics().summary());
    }

    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parsed: ReplayLine =
            serde_json::from_str(line).with_context(|| format!("Line {} is neither a command nor an event", number + 1))?;

        match parsed {
            ReplayLine::Command { command } => {
                if let Err(e) = engine.execute(command).await {
                    tracing::error!("Line {}: {}", number + 1, e);
                }
            }
            ReplayLine::Event(event) => engine.handle_event(event).await,
        }

        println!("{:>8}  {}", number + 1, engine.statistics().summary());
    }

    let counts = engine.event_counts();
    tracing::info!(
        "Replayed {} locations, {} altitudes, {} boundary events, {} dropped",
        counts.locations,
        counts.altitudes,
        counts.boundaries,
        counts.dropped
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_lines_parse() {
        let command: ReplayLine = serde_json::from_str(r#"{"command":"resume"}"#).unwrap();
        assert!(matches!(command, ReplayLine::Command { command: Command::Resume }));

        let event: ReplayLine = serde_json::from_str(
            r#"{"kind":"altitude","timestamp":"2024-05-01T10:00:00Z","relative_altitude":1.5,"pressure":101.2}"#,
        )
        .unwrap();
        assert!(matches!(event, ReplayLine::Event(CaptureEvent::Altitude(_))));

        assert!(serde_json::from_str::<ReplayLine>(r#"{"speed":3}"#).is_err());
    }

    #[test]
    fn cli_parses() {
        let cli = Cli::parse_from(["ride_cli", "--database", "/tmp/rides.db", "replay", "ride.jsonl"]);
        assert_eq!(cli.database, Some(PathBuf::from("/tmp/rides.db")));
        assert!(matches!(cli.command, Commands::Replay { .. }));
    }
}
