//! Relay uplink
//!
//! The outward connection to the relay: a connector that performs one
//! bounded connection attempt, an active link wrapping the socket
//! tasks, and the driver state machine that owns reconnection and the
//! capture-loop start/stop contract.

pub mod connector;
pub mod driver;

pub use connector::{ActiveLink, Connector, LinkEvent};
pub use driver::{run, LinkState};
