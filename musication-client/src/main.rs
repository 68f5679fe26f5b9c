//! musication - audio similarity analysis client
//!
//! Uploads an audio file to the Analysis Service, follows the job through its
//! lifecycle and prints the ranked similarity matches.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use musication_client::{build_controller, render, AudioFile, EVENT_BUS_CAPACITY};
use musication_common::config::{self, TomlConfig};
use musication_common::events::{EventBus, MusicationEvent};
use musication_common::models::JobPhase;

/// Exit code for a rejected input file
const EXIT_INVALID_INPUT: u8 = 2;
/// Exit code after Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser, Debug)]
#[command(name = "musication")]
#[command(about = "Find library tracks similar to an audio file")]
#[command(version)]
struct Args {
    /// Analysis Service base URL (overrides MUSICATION_API_URL and config file)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Config file path (overrides MUSICATION_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, env = "MUSICATION_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload an audio file and wait for similarity results
    Analyze {
        /// Audio file (MP3, WAV, FLAC, M4A, OGG)
        file: PathBuf,

        /// Print events and results as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show Analysis Service library statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let (toml_config, config_problem) = config::load_or_default(config_path.as_deref());

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("musication_client={level},musication_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(e) = config_problem {
        warn!("{}; using defaults", e);
    }

    toml_config
        .polling
        .validate()
        .context("Invalid polling configuration")?;
    let service_url = config::resolve_service_url(args.api_url.as_deref(), &toml_config)
        .context("Invalid Analysis Service URL")?;
    info!(service_url = %service_url, "Using Analysis Service");

    match args.command {
        Command::Analyze { file, json } => analyze(&service_url, &toml_config, file, json).await,
        Command::Stats => stats(&service_url, &toml_config).await,
    }
}

async fn analyze(
    service_url: &str,
    toml_config: &TomlConfig,
    path: PathBuf,
    json: bool,
) -> Result<ExitCode> {
    let audio = match AudioFile::from_path(&path) {
        Ok(audio) => audio,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Rejected input file");
            eprintln!("Error: {}", e.to_failure().message);
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let (controller, client) = build_controller(service_url, toml_config, event_bus)
        .context("Failed to create Analysis Service client")?;
    let mut events = controller.subscribe();

    if !json {
        println!("Selected {}", render::render_upload_candidate(&audio));
    }
    controller.submit(audio)?;

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                controller.cancel();
                // Flush the cancellation notice
                while let Ok(event) = events.try_recv() {
                    print_event(&event, controller.id(), json)?;
                }
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
            received = events.recv() => match received {
                Ok(event) => {
                    print_event(&event, controller.id(), json)?;
                    if let MusicationEvent::PhaseChanged { new_phase, controller_id, .. } = &event {
                        if *controller_id == controller.id() && new_phase.is_terminal() {
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    match controller.phase() {
        JobPhase::Ready { results } => {
            if !json {
                println!();
                for line in render::render_results(&results, client.base_url()) {
                    println!("{}", line);
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::FAILURE),
    }
}

fn print_event(event: &MusicationEvent, controller_id: uuid::Uuid, json: bool) -> Result<()> {
    if event.controller_id() != controller_id {
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string(event)?);
    } else if let Some(line) = render::render_event(event) {
        println!("{}", line);
    }
    Ok(())
}

async fn stats(service_url: &str, toml_config: &TomlConfig) -> Result<ExitCode> {
    let client = musication_client::AnalysisServiceClient::new(
        service_url,
        toml_config.polling.request_timeout(),
    )?;
    let stats = client
        .library_stats()
        .await
        .context("Failed to load library statistics")?;

    for line in render::render_library_stats(&stats) {
        println!("{}", line);
    }
    Ok(ExitCode::SUCCESS)
}
