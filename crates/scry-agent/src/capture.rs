//! Screen capture loop
//!
//! Runs the blocking `FrameSource` on a dedicated thread, paced to the
//! configured capture interval. The stop signal is polled only at
//! iteration boundaries, so the loop can always be cancelled within one
//! frame interval but never mid-frame.

use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use scry_core::traits::FrameSource;

/// Consecutive capture failures before the loop surfaces a warning
const FAILURE_WARN_THRESHOLD: u32 = 3;

/// How long to wait for the capture thread when stopping
const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Sleeps shorter than this aren't worth taking
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Handle to a running capture loop
pub struct CaptureLoop {
    task: tokio::task::JoinHandle<()>,
    stop: CancellationToken,
}

impl CaptureLoop {
    /// Spawn the capture loop on a blocking thread.
    ///
    /// Frames are fire-and-forget into `frames`; when that channel
    /// closes (the link went away) the loop ends, and the next
    /// successful registration spawns a fresh one.
    pub fn spawn(
        mut source: Box<dyn FrameSource>,
        frames: mpsc::Sender<Bytes>,
        interval: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let stop_signal = stop.clone();
        let task = tokio::task::spawn_blocking(move || {
            capture_loop(source.as_mut(), &frames, interval, &stop_signal);
        });
        Self { task, stop }
    }

    /// Whether the loop thread is still alive. Guards against starting
    /// a second loop on a duplicate registration ack.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop to stop and wait briefly for it to wind down.
    pub async fn stop(self) {
        self.stop.cancel();
        if timeout(STOP_JOIN_TIMEOUT, self.task).await.is_err() {
            tracing::warn!("Capture loop did not stop within {:?}", STOP_JOIN_TIMEOUT);
        }
    }
}

fn capture_loop(
    source: &mut dyn FrameSource,
    frames: &mpsc::Sender<Bytes>,
    interval: Duration,
    stop: &CancellationToken,
) {
    tracing::info!(?interval, "Capture loop started");
    let mut consecutive_failures = 0u32;

    loop {
        // Poll the stop signal only between frames
        if stop.is_cancelled() {
            break;
        }

        let started = Instant::now();

        match source.capture() {
            Ok(frame) => {
                consecutive_failures = 0;
                if frames.blocking_send(frame).is_err() {
                    tracing::debug!("Frame channel closed, stopping capture");
                    break;
                }
            }
            Err(e) => {
                // Skip this frame and retry next interval; the loop
                // itself never dies to a capture fault.
                consecutive_failures += 1;
                if consecutive_failures >= FAILURE_WARN_THRESHOLD {
                    tracing::warn!(consecutive_failures, "Screen capture failing: {}", e);
                } else {
                    tracing::debug!("Capture error, skipping frame: {}", e);
                }
                std::thread::sleep(interval);
                continue;
            }
        }

        // Pace to the capture interval, sleeping only the residual
        let elapsed = started.elapsed();
        match interval.checked_sub(elapsed) {
            Some(residual) if residual >= MIN_SLEEP => std::thread::sleep(residual),
            Some(_) => {}
            None => {
                if elapsed > interval + Duration::from_millis(10) {
                    tracing::debug!(?elapsed, "Frame processing exceeded capture interval");
                }
            }
        }
    }

    tracing::info!("Capture loop stopped");
}
