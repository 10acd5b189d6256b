//! TCP transport layer
//!
//! Accepts connections and runs one reader/writer task pair per peer.
//! The transport owns sockets; everything above it refers to peers only
//! by `ConnectionId`.

mod handler;
mod listener;

pub use handler::{run_connection, PingSettings};
pub use listener::RelayServer;
