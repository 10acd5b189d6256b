//! Command router
//!
//! Commands are real-time: a command that cannot be delivered now is
//! reported and discarded, never buffered for a later agent.

use scry_core::ConnectionId;
use scry_protocol::{ControlCommand, Message};

use crate::registry::SessionRegistry;

/// What happened to a routed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Forwarded to the registered agent
    Forwarded,
    /// Sender lacks the web-authenticated attribute; dropped silently
    Unauthenticated,
    /// No agent registered; sender was told
    NoAgent,
}

/// Route a viewer command to the registered agent.
///
/// The authenticated attribute is checked here, at dispatch time, so a
/// web session revoked mid-connection is honored on the very next
/// command. Field semantics are not validated: the agent's input sink
/// clamps and ignores as needed.
pub fn route_command(
    registry: &SessionRegistry,
    sender: ConnectionId,
    command: ControlCommand,
) -> RouteOutcome {
    if !registry.is_authenticated(sender) {
        tracing::warn!(id = %sender, action = command.action(), "Unauthenticated command dropped");
        return RouteOutcome::Unauthenticated;
    }

    match registry.agent() {
        Some(agent) => {
            tracing::trace!(from = %sender, to = %agent.id, action = command.action(), "Forwarding command");
            agent.try_send(Message::Command(command));
            RouteOutcome::Forwarded
        }
        None => {
            if let Some(handle) = registry.get(sender) {
                handle.try_send(Message::CommandError {
                    message: "Agent not connected".to_string(),
                });
            }
            RouteOutcome::NoAgent
        }
    }
}
