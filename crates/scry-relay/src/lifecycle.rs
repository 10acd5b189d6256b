//! Connection lifecycle manager
//!
//! The single event-dispatch domain of the relay: every connect,
//! disconnect, registration, authentication, frame, and command event is
//! processed to completion here before the next one, which serializes
//! all agent-slot and viewer-set mutations without any locking.
//! Per-connection sends stay parallel: the dispatcher only queues onto
//! each connection's outbound channel.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scry_core::config::RelayConfig;
use scry_core::traits::{secret_digest, verify_secret, WebAuthenticator};
use scry_core::ConnectionId;
use scry_protocol::{ControlCommand, Message};

use crate::registry::{ConnectionHandle, SessionRegistry};
use crate::relay::{FrameRelay, RelayOutcome};
use crate::router::{route_command, RouteOutcome};

/// Status text sent alongside agent presence transitions
const AGENT_PRESENT_TEXT: &str = "Remote screen connected";
const AGENT_ABSENT_TEXT: &str = "Remote screen disconnected";

/// Events flowing from the transport layer into the dispatcher
#[derive(Debug)]
pub enum RelayEvent {
    /// A transport connection was established
    Connected {
        id: ConnectionId,
        /// Queue drained by the connection's writer task
        outbound: mpsc::Sender<Message>,
        /// Token that tears the connection down when cancelled
        cancel: CancellationToken,
    },

    /// A transport connection went away
    Disconnected { id: ConnectionId },

    /// The connection asked to register as the agent
    RegisterAgent { id: ConnectionId, token: String },

    /// The connection presented a web-session credential
    Authenticate { id: ConnectionId, credential: String },

    /// The connection sent a screen frame (either wire encoding)
    FrameReceived { id: ConnectionId, frame: Message },

    /// The connection sent an input command
    CommandReceived {
        id: ConnectionId,
        command: ControlCommand,
    },
}

/// Owns the session registry and processes all lifecycle events
pub struct LifecycleManager {
    registry: SessionRegistry,
    relay: FrameRelay,
    authenticator: Arc<dyn WebAuthenticator>,
    /// SHA-256 of the configured shared secret
    secret: [u8; 32],
    /// An empty configured secret rejects all registrations
    secret_empty: bool,
}

impl LifecycleManager {
    /// Create a manager from relay configuration and the web-session
    /// authenticator collaborator.
    pub fn new(config: &RelayConfig, authenticator: Arc<dyn WebAuthenticator>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            relay: FrameRelay::new(config.min_broadcast_interval()),
            authenticator,
            secret: secret_digest(&config.shared_secret),
            secret_empty: config.shared_secret.is_empty(),
        }
    }

    /// Consume events until the channel closes
    pub async fn run(mut self, mut events: mpsc::Receiver<RelayEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event);
        }
        tracing::debug!("Lifecycle dispatcher stopped");
    }

    /// Process one event to completion
    pub fn handle_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected { id, outbound, cancel } => {
                self.on_connect(id, outbound, cancel)
            }
            RelayEvent::Disconnected { id } => self.on_disconnect(id),
            RelayEvent::RegisterAgent { id, token } => self.on_register_agent(id, &token),
            RelayEvent::Authenticate { id, credential } => self.on_authenticate(id, &credential),
            RelayEvent::FrameReceived { id, frame } => self.on_frame(id, &frame),
            RelayEvent::CommandReceived { id, command } => self.on_command(id, command),
        }
    }

    /// Read-only view of the registry, for status reporting and tests
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Strip a connection's web-authenticated attribute (external
    /// session revocation). Takes effect on its next command.
    pub fn revoke(&mut self, id: ConnectionId) {
        self.registry.revoke(id);
    }

    fn on_connect(
        &mut self,
        id: ConnectionId,
        outbound: mpsc::Sender<Message>,
        cancel: CancellationToken,
    ) {
        tracing::info!(%id, "Connection established");
        self.registry
            .insert(ConnectionHandle::new(id, outbound, cancel));

        // Late joiners learn about a live agent immediately so a
        // reconnecting viewer UI doesn't sit in "waiting" state.
        if self.registry.agent_id().is_some() {
            if let Some(handle) = self.registry.get(id) {
                handle.try_send(Message::AgentPresent {
                    message: AGENT_PRESENT_TEXT.to_string(),
                });
            }
        }
    }

    fn on_disconnect(&mut self, id: ConnectionId) {
        let was_agent = self.registry.is_agent(id);

        // Idempotent: displacement already removed this connection, and
        // the transport-level disconnect that follows finds nothing.
        if self.registry.remove(id).is_none() {
            return;
        }

        tracing::info!(%id, "Connection closed");

        if was_agent {
            tracing::info!(%id, "Agent disconnected");
            self.broadcast_to_viewers(Message::AgentAbsent {
                message: AGENT_ABSENT_TEXT.to_string(),
            });
        }
    }

    fn on_register_agent(&mut self, id: ConnectionId, token: &str) {
        let Some(handle) = self.registry.get(id) else {
            return;
        };

        if !verify_secret(token, &self.secret, self.secret_empty) {
            tracing::warn!(%id, "Agent registration rejected: bad token");
            handle.try_send(Message::RegistrationFail {
                message: "Authentication failed".to_string(),
            });
            // Fatal for this connection; the agent reconnects from
            // scratch if it wants another try.
            self.force_disconnect(id);
            return;
        }

        // Re-registration by the current occupant is acknowledged but
        // does not re-trigger the viewer broadcast.
        if self.registry.is_agent(id) {
            tracing::debug!(%id, "Agent re-registered");
            if let Some(handle) = self.registry.get(id) {
                handle.try_send(Message::RegistrationSuccess);
            }
            return;
        }

        // Displace any other occupant through the normal disconnect
        // path, so the displacement side effects stay auditable.
        if let Some(old) = self.registry.agent_id() {
            tracing::info!(old = %old, new = %id, "Displacing registered agent");
            self.force_disconnect(old);
        }

        self.registry.set_agent(id);
        tracing::info!(%id, "Agent registered");

        self.broadcast_to_viewers(Message::AgentPresent {
            message: AGENT_PRESENT_TEXT.to_string(),
        });

        if let Some(handle) = self.registry.get(id) {
            handle.try_send(Message::RegistrationSuccess);
        }
    }

    fn on_authenticate(&mut self, id: ConnectionId, credential: &str) {
        if self.authenticator.check(credential) {
            tracing::info!(%id, "Viewer authenticated");
            self.registry.authenticate(id);
        } else {
            tracing::warn!(%id, "Viewer authentication rejected");
        }
    }

    fn on_frame(&mut self, id: ConnectionId, frame: &Message) {
        match self.relay.on_agent_frame(&self.registry, id, frame) {
            RelayOutcome::Broadcast { .. } | RelayOutcome::Throttled => {}
            RelayOutcome::NotAgent => {
                // Silent drop; logging at trace only so a flapping old
                // agent can't flood the logs.
                tracing::trace!(%id, "Frame from non-agent connection dropped");
            }
            RelayOutcome::BadPayload => {
                tracing::debug!(%id, "Undecodable frame payload dropped");
            }
        }
    }

    fn on_command(&mut self, id: ConnectionId, command: ControlCommand) {
        match route_command(&self.registry, id, command) {
            RouteOutcome::Forwarded | RouteOutcome::Unauthenticated => {}
            RouteOutcome::NoAgent => {
                tracing::debug!(%id, "Command received with no agent registered");
            }
        }
    }

    /// Forcibly disconnect: cancel the transport tasks, then run the
    /// same cleanup a transport-initiated disconnect runs. The later
    /// transport `Disconnected` event for this id becomes a no-op.
    fn force_disconnect(&mut self, id: ConnectionId) {
        if let Some(handle) = self.registry.get(id) {
            handle.force_disconnect();
        }
        self.on_disconnect(id);
    }

    fn broadcast_to_viewers(&self, message: Message) {
        for viewer in self.registry.viewers() {
            viewer.try_send(message.clone());
        }
    }
}
