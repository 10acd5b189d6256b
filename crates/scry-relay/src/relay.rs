//! Frame relay with broadcast rate control
//!
//! Screen video is lossy-tolerant: dropping stale frames under load
//! bounds memory and latency where queuing would build unbounded
//! backlog. The gate therefore never buffers: a frame either fans out
//! now or is gone.

use std::time::Duration;

use tokio::time::Instant;

use scry_core::ConnectionId;
use scry_protocol::Message;

use crate::registry::SessionRegistry;

/// Minimum-interval throttle protecting fan-out from exceeding the
/// target frame rate.
pub struct BroadcastGate {
    /// Interval floor between two successful broadcasts
    min_interval: Duration,
    /// When the last admitted frame was broadcast
    last_broadcast: Option<Instant>,
}

impl BroadcastGate {
    /// Create a gate with the given interval floor
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_broadcast: None,
        }
    }

    /// Admit or drop a frame arriving at `now`.
    ///
    /// Admission updates the gate; a dropped frame leaves it untouched,
    /// so the time between two admitted frames is never less than the
    /// configured interval.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_broadcast {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_broadcast = Some(now);
        true
    }

    /// The configured interval floor
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// What happened to a frame offered to the relay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Fanned out to this many viewer connections
    Broadcast { viewers: usize },
    /// Sender does not occupy the agent slot; dropped silently
    NotAgent,
    /// Arrived inside the minimum interval; dropped, not queued
    Throttled,
    /// Not a frame message, or a text frame that failed to decode
    BadPayload,
}

/// Receives frames from the registered agent and fans them out to the
/// viewer set under the broadcast gate.
pub struct FrameRelay {
    gate: BroadcastGate,
}

impl FrameRelay {
    /// Create a relay with the given minimum broadcast interval
    pub fn new(min_interval: Duration) -> Self {
        Self {
            gate: BroadcastGate::new(min_interval),
        }
    }

    /// Handle a frame message from `sender`.
    ///
    /// Only the agent slot occupant may inject frames. Anything else
    /// (a displaced agent still flushing, an unregistered connection) is
    /// dropped without an error so it cannot probe the relay. Fan-out is
    /// best effort per viewer: one slow or dead viewer never blocks the
    /// others and never perturbs the gate.
    pub fn on_agent_frame(
        &mut self,
        registry: &SessionRegistry,
        sender: ConnectionId,
        frame: &Message,
    ) -> RelayOutcome {
        if !registry.is_agent(sender) {
            return RelayOutcome::NotAgent;
        }

        // Normalize both wire encodings to bytes; a text frame with a
        // broken base64 payload is dropped like any other bad frame.
        let Some(payload) = frame.frame_payload() else {
            return RelayOutcome::BadPayload;
        };

        if !self.gate.admit(Instant::now()) {
            return RelayOutcome::Throttled;
        }

        let mut delivered = 0;
        for viewer in registry.viewers() {
            if viewer.try_send(frame.clone()) {
                delivered += 1;
            }
        }

        tracing::trace!(
            bytes = payload.len(),
            viewers = delivered,
            "Broadcast frame"
        );
        RelayOutcome::Broadcast { viewers: delivered }
    }
}
