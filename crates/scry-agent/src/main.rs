//! scry Agent Daemon
//!
//! Connects outward to the relay, registers with the shared secret, and
//! streams frames while registered. This binary wires in the synthetic
//! collaborators (test-pattern frames, logged input) so the pipeline
//! runs anywhere; embedders with a real capture/injection backend use
//! the library entry point with their own `FrameSource`/`InputSink`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scry_agent::synthetic::{LoggingSink, SyntheticSource};
use scry_core::config::{self, AgentConfig};

#[derive(Parser)]
#[command(name = "scry-agent")]
#[command(about = "scry streaming agent - connects to a relay and streams the screen")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Relay address to connect to (overrides config)
    #[arg(short, long)]
    relay: Option<String>,

    /// Shared secret (overrides config)
    #[arg(long, env = "SCRY_SHARED_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Send frames in the legacy base64 text encoding
    #[arg(long)]
    legacy_text: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("scry agent starting...");

    // Load configuration
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config::default_config_dir().join("agent.toml"));

    let mut config = if config_path.exists() {
        config::load_config(&config_path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {:?}: {}", config_path, e);
            AgentConfig::default()
        })
    } else {
        AgentConfig::default()
    };

    // Apply command-line overrides
    if let Some(relay) = args.relay {
        config.relay_address = relay;
    }
    if let Some(secret) = args.secret {
        config.shared_secret = secret;
    }
    if args.legacy_text {
        config.legacy_text_frames = true;
    }

    if config.shared_secret.is_empty() {
        tracing::warn!("No shared secret configured - the relay will reject registration");
    }
    tracing::info!(
        "Relay: {} | capture {:.1} fps | {} frames",
        config.relay_address,
        config.capture_fps,
        if config.legacy_text_frames {
            "base64 text"
        } else {
            "binary"
        }
    );
    tracing::info!("Using synthetic capture source and logging input sink");

    let shutdown = CancellationToken::new();
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        shutdown_clone.cancel();
    });

    scry_agent::run(
        config,
        Box::new(|| Box::new(SyntheticSource::new())),
        LoggingSink::new(1920, 1080),
        shutdown,
    )
    .await
    .context("Agent run loop failed")?;

    tracing::info!("Agent shutdown complete");
    Ok(())
}
