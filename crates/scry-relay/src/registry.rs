//! Session registry
//!
//! Single source of truth for "who is the agent" and which connections
//! are web-authenticated viewers. The registry is owned exclusively by
//! the lifecycle dispatcher task; there is no lock because there is no
//! sharing; every mutation happens on that one task.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use scry_core::{ConnectionId, ConnectionRole};
use scry_protocol::Message;

/// Handle to a live transport connection.
///
/// The transport layer owns the socket; the registry holds only what the
/// dispatcher needs: the outbound queue, the authenticated attribute, and
/// the token that force-disconnects the connection.
pub struct ConnectionHandle {
    /// Connection identity
    pub id: ConnectionId,
    /// Outbound message queue drained by the connection's writer task
    outbound: mpsc::Sender<Message>,
    /// Whether the web-session check has succeeded for this connection
    pub authenticated: bool,
    /// Cancels the connection's transport tasks
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a new handle for a freshly connected transport
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Message>, cancel: CancellationToken) -> Self {
        Self {
            id,
            outbound,
            authenticated: false,
            cancel,
        }
    }

    /// Queue a message for this connection, best effort.
    ///
    /// A full queue or a closed channel drops the message and returns
    /// false; it never blocks the dispatcher.
    pub fn try_send(&self, message: Message) -> bool {
        match self.outbound.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::debug!(id = %self.id, "Outbound queue full, dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(id = %self.id, "Outbound channel closed, dropping message");
                false
            }
        }
    }

    /// Tear down this connection's transport tasks
    pub fn force_disconnect(&self) {
        self.cancel.cancel();
    }
}

/// Tracks the agent slot and all live connections
pub struct SessionRegistry {
    /// All transport-connected peers, by identity
    connections: HashMap<ConnectionId, ConnectionHandle>,
    /// The single agent slot. Invariant: at most one occupant, and the
    /// occupant is always present in `connections`.
    agent: Option<ConnectionId>,
}

impl SessionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            connections: HashMap::new(),
            agent: None,
        }
    }

    /// Track a new connection
    pub fn insert(&mut self, handle: ConnectionHandle) {
        self.connections.insert(handle.id, handle);
    }

    /// Remove a connection. Clears the agent slot if it was the occupant.
    pub fn remove(&mut self, id: ConnectionId) -> Option<ConnectionHandle> {
        let handle = self.connections.remove(&id)?;
        if self.agent == Some(id) {
            self.agent = None;
        }
        Some(handle)
    }

    /// Get a connection by identity
    pub fn get(&self, id: ConnectionId) -> Option<&ConnectionHandle> {
        self.connections.get(&id)
    }

    /// Identity of the current agent slot occupant
    pub fn agent_id(&self) -> Option<ConnectionId> {
        self.agent
    }

    /// Handle of the current agent slot occupant
    pub fn agent(&self) -> Option<&ConnectionHandle> {
        self.agent.and_then(|id| self.connections.get(&id))
    }

    /// Whether the given connection occupies the agent slot
    pub fn is_agent(&self, id: ConnectionId) -> bool {
        self.agent == Some(id)
    }

    /// Put a connection into the agent slot. The caller is responsible
    /// for having displaced any previous occupant first.
    pub fn set_agent(&mut self, id: ConnectionId) {
        debug_assert!(self.connections.contains_key(&id));
        self.agent = Some(id);
    }

    /// Mark a connection as web-authenticated. Returns false if the
    /// connection is unknown.
    pub fn authenticate(&mut self, id: ConnectionId) -> bool {
        match self.connections.get_mut(&id) {
            Some(handle) => {
                handle.authenticated = true;
                true
            }
            None => false,
        }
    }

    /// Strip the web-authenticated attribute from a connection. Honored
    /// at the next command dispatch.
    pub fn revoke(&mut self, id: ConnectionId) {
        if let Some(handle) = self.connections.get_mut(&id) {
            handle.authenticated = false;
        }
    }

    /// Whether a connection currently carries the web-authenticated
    /// attribute. Checked per command, not just at connect time.
    pub fn is_authenticated(&self, id: ConnectionId) -> bool {
        self.connections
            .get(&id)
            .map(|h| h.authenticated)
            .unwrap_or(false)
    }

    /// Iterate the viewer set: authenticated connections that do not
    /// occupy the agent slot.
    pub fn viewers(&self) -> impl Iterator<Item = &ConnectionHandle> + '_ {
        let agent = self.agent;
        self.connections
            .values()
            .filter(move |h| h.authenticated && Some(h.id) != agent)
    }

    /// Role of a connection as the registry currently sees it
    pub fn role(&self, id: ConnectionId) -> Option<ConnectionRole> {
        let handle = self.connections.get(&id)?;
        Some(if self.agent == Some(id) {
            ConnectionRole::Agent
        } else if handle.authenticated {
            ConnectionRole::Viewer
        } else {
            ConnectionRole::Unauthenticated
        })
    }

    /// Number of tracked connections
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if no connections are tracked
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
