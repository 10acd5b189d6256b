//! Agent connection state machine
//!
//! Drives `Disconnected → Connecting → Connected → Registered` for the
//! life of the process. The capture loop runs only while registered:
//! it is started (idempotently) on registration success and stopped
//! with a bounded join before the machine re-enters `Disconnected`.
//! A fixed configured delay separates consecutive connection attempts;
//! registration rejection retries on the same schedule because the
//! agent cannot tell a wrong secret from a transient relay fault.

use std::fmt;

use anyhow::Result;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scry_core::config::AgentConfig;
use scry_core::traits::{FrameSource, InputSink};
use scry_protocol::Message;

use crate::capture::CaptureLoop;
use crate::input::CommandExecutor;
use crate::link::connector::{Connector, LinkEvent};

/// Produces a fresh frame source for each capture-loop run. Capture
/// backends often hold thread-bound handles, so the source is built on
/// the thread that uses it.
pub type SourceFactory = Box<dyn Fn() -> Box<dyn FrameSource> + Send>;

/// Queue between the capture thread and the link
const FRAME_CHANNEL_CAPACITY: usize = 8;

/// Queue between the link and the command executor thread
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No transport connection
    Disconnected,
    /// Transport connect in progress
    Connecting,
    /// Transport up, registration not yet acknowledged
    Connected,
    /// Registered and streaming
    Registered,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Registered => write!(f, "registered"),
        }
    }
}

/// Run the agent until `shutdown` is cancelled.
///
/// Owns the reconnection loop and the capture/executor thread
/// lifecycles. Returns once the capture loop is stopped and the
/// transport is closed.
pub async fn run<S: InputSink + 'static>(
    config: AgentConfig,
    make_source: SourceFactory,
    sink: S,
    shutdown: CancellationToken,
) -> Result<()> {
    let connector = Connector::new(config.clone());

    // One executor thread for the process lifetime; commands from
    // successive connections all funnel through it in order.
    let (command_tx, mut command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let move_duration = config.mouse_move_duration;
    let move_steps = config.mouse_move_steps;
    let executor_task = tokio::task::spawn_blocking(move || {
        let mut executor = CommandExecutor::new(sink, move_duration, move_steps);
        while let Some(command) = command_rx.blocking_recv() {
            executor.execute(command);
        }
        tracing::debug!("Command executor stopped");
    });

    let mut state = LinkState::Disconnected;
    tracing::debug!(%state, "Agent driver starting");

    loop {
        if shutdown.is_cancelled() {
            break;
        }

        state = LinkState::Connecting;
        tracing::info!(%state, "Connecting to relay at {}", config.relay_address);

        let mut link = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = connector.try_connect() => match result {
                Ok(link) => link,
                Err(e) => {
                    state = LinkState::Disconnected;
                    tracing::warn!(%state, "Connection failed: {}. Retrying in {:?}", e, config.reconnect_delay);
                    if !wait_before_retry(&shutdown, &config).await {
                        break;
                    }
                    continue;
                }
            }
        };

        // The registration request is already on the wire
        state = LinkState::Connected;
        tracing::info!(%state, "Transport connected, awaiting registration ack");

        let (frame_tx, mut frame_rx) = mpsc::channel::<Bytes>(FRAME_CHANNEL_CAPACITY);
        let mut capture: Option<CaptureLoop> = None;

        let disconnect_reason = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break "shutdown requested",

                event = link.recv_event() => match event {
                    None => break "link closed",

                    Some(LinkEvent::RegistrationAccepted) => {
                        state = LinkState::Registered;
                        tracing::info!(%state, "Registration accepted");

                        // Idempotent: a duplicate ack never starts a
                        // second loop while one is alive.
                        let alive = capture.as_ref().map(CaptureLoop::is_running).unwrap_or(false);
                        if alive {
                            tracing::debug!("Capture loop already running");
                        } else {
                            capture = Some(CaptureLoop::spawn(
                                make_source(),
                                frame_tx.clone(),
                                config.capture_interval(),
                            ));
                        }
                    }

                    Some(LinkEvent::RegistrationRejected { message }) => {
                        tracing::error!("Registration rejected: {}", message);
                        break "registration rejected";
                    }

                    Some(LinkEvent::Command(command)) => {
                        if state == LinkState::Registered {
                            if command_tx.try_send(command).is_err() {
                                tracing::warn!("Command queue full, dropping command");
                            }
                        }
                    }

                    Some(LinkEvent::Ping { timestamp }) => {
                        if link.send(Message::Pong { timestamp }).await.is_err() {
                            break "link closed";
                        }
                    }

                    Some(LinkEvent::Disconnected) => break "disconnected by relay",
                },

                frame = frame_rx.recv() => {
                    // frame_tx is held locally, so recv never yields None here
                    if let Some(frame) = frame {
                        if let Err(e) = link.send_frame(frame, config.legacy_text_frames).await {
                            tracing::warn!("Frame send failed: {}", e);
                            break "send failure";
                        }
                    }
                }
            }
        };

        tracing::warn!(reason = disconnect_reason, "Link down");

        // Unblock the capture thread before joining it, then close the
        // transport. Order matters: a capture thread stuck in a full
        // channel send can only exit once the receiver is gone.
        drop(frame_rx);
        if let Some(capture) = capture.take() {
            capture.stop().await;
        }
        link.close().await;

        state = LinkState::Disconnected;

        if shutdown.is_cancelled() {
            break;
        }
        tracing::info!(%state, "Waiting {:?} before reconnecting", config.reconnect_delay);
        if !wait_before_retry(&shutdown, &config).await {
            break;
        }
    }

    // Shut the executor down by closing its queue
    drop(command_tx);
    let _ = executor_task.await;

    tracing::info!("Agent stopped");
    Ok(())
}

/// Fixed-delay backoff between manual connection attempts. Returns
/// false if shutdown was requested during the wait.
async fn wait_before_retry(shutdown: &CancellationToken, config: &AgentConfig) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(config.reconnect_delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_state_display() {
        assert_eq!(format!("{}", LinkState::Disconnected), "disconnected");
        assert_eq!(format!("{}", LinkState::Registered), "registered");
    }
}
