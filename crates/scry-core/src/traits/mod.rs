//! Collaborator traits
//!
//! The relay and agent are wired against these seams. The OS-level
//! implementations (screen grab + JPEG encode, input injection, the web
//! login flow) live outside this workspace; tests and the built-in
//! synthetic collaborators implement them in-process.

mod auth;
mod capture;
mod input;

pub use auth::{secret_digest, verify_secret, SharedSecretAuthenticator, WebAuthenticator};
pub use capture::FrameSource;
pub use input::InputSink;
