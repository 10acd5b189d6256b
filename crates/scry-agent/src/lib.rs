//! scry-agent: Streaming agent
//!
//! The agent runs on the controlled machine. It maintains an outbound
//! connection to the relay, registers with the shared secret, streams
//! captured screen frames while registered, and executes input commands
//! routed back from viewers.
//!
//! The OS-facing pieces (screen grab + encode, input injection) sit
//! behind the `FrameSource` and `InputSink` traits from `scry-core`.
//! The `synthetic` module provides in-process stand-ins so the full
//! pipeline can run without a platform backend.

pub mod capture;
pub mod input;
pub mod link;
pub mod synthetic;

pub use capture::CaptureLoop;
pub use input::CommandExecutor;
pub use link::driver::{run, LinkState};
