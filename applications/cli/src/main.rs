//! Harmony - playlist analysis from the command line
use clap::{Parser, Subcommand};
use harmony_cli::{AppConfig, CliError, PlaylistService};
use harmony_client::{HarmonyClient, Session};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "harmony")]
#[command(about = "Analyze and compare music playlists", long_about = None)]
struct Cli {
    /// Configuration file path (defaults to ./harmony.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Identity token for the Harmony backend
    #[arg(long, env = "HARMONY_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Capability token for external-platform endpoints
    #[arg(long, env = "HARMONY_CAPABILITY_TOKEN", global = true, hide_env_values = true)]
    capability_token: Option<String>,

    /// Refresh token used to renew the capability token
    #[arg(long, env = "HARMONY_REFRESH_TOKEN", global = true, hide_env_values = true)]
    refresh_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a playlist
    Analyze {
        /// Playlist ID
        playlist_id: String,
    },
    /// Compare two playlists
    Compare {
        /// First playlist ID
        a: String,
        /// Second playlist ID
        b: String,
    },
    /// List the signed-in user's playlists
    Playlists {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing (stderr, so stdout stays pure JSON)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harmony_cli=info,harmony_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;
    config.validate()?;

    tracing::debug!(url = %config.backend.url, "Using backend");

    let client = HarmonyClient::new(&config.backend.url, config.pipeline.clone())?;
    if let Some(identity_token) = cli.token {
        client
            .sign_in(Session {
                identity_token,
                capability_token: cli.capability_token,
                capability_refresh_token: cli.refresh_token,
                capability_expires_in: None,
            })
            .await?;
    }

    let service = PlaylistService::new(client);
    match cli.command {
        Commands::Analyze { playlist_id } => {
            print_json(&service.analyze(&playlist_id).await?)?;
        }
        Commands::Compare { a, b } => {
            print_json(&service.compare(&a, &b).await?)?;
        }
        Commands::Playlists { limit, offset } => {
            print_json(&service.playlists(limit, offset).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Pipeline failures are printed as the error envelope; anything else as text.
fn report_error(err: &anyhow::Error) {
    let envelope = match err.downcast_ref::<CliError>() {
        Some(CliError::Client(e)) => Some(e.to_envelope()),
        _ => err
            .downcast_ref::<harmony_client::PipelineError>()
            .map(|e| e.to_envelope()),
    };

    match envelope.and_then(|e| serde_json::to_string_pretty(&e).ok()) {
        Some(json) => eprintln!("{}", json),
        None => eprintln!("Error: {:#}", err),
    }
}
