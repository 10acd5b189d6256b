//! scry Relay Daemon
//!
//! Accepts one streaming agent and any number of viewer connections,
//! fans frames out under the configured rate ceiling, and routes input
//! commands back to the agent.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scry_core::config::{self, RelayConfig};
use scry_core::traits::SharedSecretAuthenticator;
use scry_relay::server::RelayServer;
use scry_relay::{LifecycleManager, RelayEvent};

/// Capacity of the dispatcher event channel.
///
/// Sized for bursts of per-connection events (a flapping agent plus a
/// room of viewers reconnecting) without letting a stalled dispatcher
/// buffer unbounded frames.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Parser)]
#[command(name = "scry-relay")]
#[command(about = "scry relay daemon - streams one agent's screen to many viewers")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Shared secret (overrides config)
    #[arg(long, env = "SCRY_SHARED_SECRET", hide_env_values = true)]
    secret: Option<String>,

    /// Target broadcast frame rate (overrides config)
    #[arg(long)]
    fps: Option<f64>,

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

    tracing::info!("scry relay starting...");

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_dir().join("relay.toml");
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                RelayConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            RelayConfig::default()
        }
    };

    // Apply command-line overrides
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }
    if let Some(secret) = args.secret {
        config.shared_secret = secret;
    }
    if let Some(fps) = args.fps {
        config.target_fps = fps;
    }

    if config.shared_secret.is_empty() {
        tracing::warn!(
            "No shared secret configured - all agent registrations and viewer credentials will be rejected"
        );
    }
    tracing::info!(
        "Broadcast ceiling: {:.1} fps ({:?} between frames)",
        config.target_fps,
        config.min_broadcast_interval()
    );

    let cancel = CancellationToken::new();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
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

        cancel_clone.cancel();
    });

    // Single dispatcher task owns all session state
    let (event_tx, event_rx) = mpsc::channel::<RelayEvent>(EVENT_CHANNEL_CAPACITY);
    let authenticator = Arc::new(SharedSecretAuthenticator::new(&config.shared_secret));
    let manager = LifecycleManager::new(&config, authenticator);
    tokio::spawn(manager.run(event_rx));

    let server = RelayServer::bind(&config, event_tx, cancel.clone()).await?;
    server.run().await?;

    tracing::info!("Relay shutdown complete");
    Ok(())
}
