//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a transport connection.
///
/// Assigned by the relay's listener as a monotonic counter; never reused
/// within a relay process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

impl From<u64> for ConnectionId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Role of a connection as tracked by the session registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionRole {
    /// Connected at the transport level, no privileges yet
    Unauthenticated,
    /// Web-session-authenticated viewer
    Viewer,
    /// The registered streaming agent
    Agent,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Unauthenticated => write!(f, "unauthenticated"),
            ConnectionRole::Viewer => write!(f, "viewer"),
            ConnectionRole::Agent => write!(f, "agent"),
        }
    }
}
