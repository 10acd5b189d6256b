//! Synthetic collaborators
//!
//! In-process stand-ins for the platform capture and injection
//! backends. They let the full agent↔relay pipeline run on any machine
//! (frames flow, commands round-trip), which is what the shipped
//! binary uses. Real deployments implement `FrameSource`/`InputSink`
//! against their platform APIs and call `link::driver::run` directly.

use bytes::Bytes;

use scry_core::traits::{FrameSource, InputSink};
use scry_core::CaptureError;
use scry_protocol::MouseButton;

/// Frame source emitting a small deterministic test pattern with a
/// frame counter, enough to exercise the pipeline without an encoder.
pub struct SyntheticSource {
    counter: u64,
}

impl SyntheticSource {
    /// Create a source starting at frame zero
    pub fn new() -> Self {
        Self { counter: 0 }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticSource {
    fn capture(&mut self) -> Result<Bytes, CaptureError> {
        self.counter += 1;
        let mut frame = Vec::with_capacity(16);
        frame.extend_from_slice(b"SCRYSYN\0");
        frame.extend_from_slice(&self.counter.to_be_bytes());
        Ok(Bytes::from(frame))
    }
}

/// Input sink that logs every command instead of injecting it, while
/// still tracking cursor position so smoothing behaves realistically.
pub struct LoggingSink {
    size: (u32, u32),
    position: (i32, i32),
}

impl LoggingSink {
    /// Create a sink pretending to control a screen of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            position: (width as i32 / 2, height as i32 / 2),
        }
    }
}

impl InputSink for LoggingSink {
    fn screen_size(&self) -> (u32, u32) {
        self.size
    }

    fn cursor_position(&self) -> Option<(i32, i32)> {
        Some(self.position)
    }

    fn move_to(&mut self, x: i32, y: i32) {
        self.position = (x, y);
        tracing::info!(x, y, "input: move");
    }

    fn press(&mut self, button: MouseButton) {
        tracing::info!(%button, "input: press");
    }

    fn release(&mut self, button: MouseButton) {
        tracing::info!(%button, "input: release");
    }

    fn key_down(&mut self, key: &str) {
        tracing::info!(key, "input: key down");
    }

    fn key_up(&mut self, key: &str) {
        tracing::info!(key, "input: key up");
    }

    fn scroll(&mut self, dx: i32, dy: i32) {
        tracing::info!(dx, dy, "input: scroll");
    }
}
