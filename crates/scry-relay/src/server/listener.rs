//! TCP listener
//!
//! Accepts incoming connections and spawns a handler per peer.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scry_core::config::RelayConfig;
use scry_core::ConnectionId;

use crate::lifecycle::RelayEvent;
use crate::server::handler::{run_connection, PingSettings};

/// TCP server that feeds the lifecycle dispatcher
pub struct RelayServer {
    listener: TcpListener,
    events: mpsc::Sender<RelayEvent>,
    cancel: CancellationToken,
    ping: PingSettings,
    next_id: u64,
}

impl RelayServer {
    /// Bind the listener. Port 0 binds an ephemeral port, which the
    /// integration tests use.
    pub async fn bind(
        config: &RelayConfig,
        events: mpsc::Sender<RelayEvent>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .with_context(|| format!("Failed to bind to {}", config.bind_address))?;

        Ok(Self {
            listener,
            events,
            cancel,
            ping: PingSettings {
                interval: config.ping_interval,
                timeout: config.ping_timeout,
            },
            next_id: 1,
        })
    }

    /// The address the listener actually bound
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until cancelled
    pub async fn run(mut self) -> Result<()> {
        let local_addr = self.local_addr()?;
        tracing::info!("Relay listening on {}", local_addr);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("Relay server shutting down");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((socket, peer_addr)) => {
                            self.handle_connection(socket, peer_addr);
                        }
                        Err(e) => {
                            tracing::error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawn the handler for a newly accepted connection
    fn handle_connection(&mut self, socket: tokio::net::TcpStream, peer_addr: SocketAddr) {
        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;

        tracing::info!(%id, "New connection from {}", peer_addr);

        let events = self.events.clone();
        // Child token: server shutdown tears every connection down, and
        // the dispatcher can still cancel this one connection alone.
        let cancel = self.cancel.child_token();
        let ping = self.ping;

        tokio::spawn(async move {
            run_connection(id, socket, events, cancel, ping).await;
            tracing::debug!(%id, "Connection handler finished");
        });
    }
}
