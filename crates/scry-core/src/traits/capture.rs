//! Screen capture trait

use bytes::Bytes;

use crate::error::CaptureError;

/// Source of encoded screen frames.
///
/// `capture` blocks for the duration of one grab+encode and must return
/// within a bounded latency. The capture loop calls it from a dedicated
/// blocking thread, checks its stop signal between calls, and treats each
/// error as "skip this frame, retry next interval".
pub trait FrameSource: Send {
    /// Grab the screen and return one encoded frame
    fn capture(&mut self) -> Result<Bytes, CaptureError>;
}
