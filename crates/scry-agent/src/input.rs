//! Command execution against the input sink
//!
//! Translates viewer commands into primitive sink operations. This is
//! where malformed input degrades gracefully: coordinates are clamped
//! to the screen, unknown keys are passed through for the sink to
//! ignore, and nothing here returns an error to the caller.
//!
//! Runs on a blocking thread. Mouse-move smoothing sleeps between
//! interpolation steps and may briefly stall command processing for
//! that one command, which is acceptable for input.

use std::time::{Duration, Instant};

use scry_protocol::{ControlCommand, MouseButton};

use scry_core::traits::InputSink;

/// Gap between button press and release in a click
const CLICK_HOLD: Duration = Duration::from_millis(10);

/// Sleeps shorter than this aren't worth taking
const MIN_SLEEP: Duration = Duration::from_millis(1);

/// Executes commands against an input sink, tracking cursor position
/// for smoothed movement.
pub struct CommandExecutor<S> {
    sink: S,
    last_position: (i32, i32),
    move_duration: Duration,
    move_steps: u32,
}

impl<S: InputSink> CommandExecutor<S> {
    /// Create an executor. The starting cursor position comes from the
    /// sink when it can report one, otherwise the screen center.
    pub fn new(sink: S, move_duration: Duration, move_steps: u32) -> Self {
        let last_position = sink.cursor_position().unwrap_or_else(|| {
            let (w, h) = sink.screen_size();
            (w as i32 / 2, h as i32 / 2)
        });
        Self {
            sink,
            last_position,
            move_duration,
            move_steps,
        }
    }

    /// Execute one command. Never fails.
    pub fn execute(&mut self, command: ControlCommand) {
        tracing::trace!(action = command.action(), "Executing command");
        match command {
            ControlCommand::Move { x, y } => self.move_to(x, y, true),

            ControlCommand::Click { button, x, y } => {
                // A click always repositions instantly, no interpolation;
                // only bare moves animate.
                if let (Some(x), Some(y)) = (x, y) {
                    self.move_to(x, y, false);
                }
                self.click(button);
            }

            ControlCommand::KeyDown { key, code } => {
                self.sink.key_down(code.as_deref().unwrap_or(&key));
            }

            ControlCommand::KeyUp { key, code } => {
                self.sink.key_up(code.as_deref().unwrap_or(&key));
            }

            ControlCommand::Scroll { dx, dy } => {
                if dx != 0 || dy != 0 {
                    self.sink.scroll(dx, dy);
                }
            }
        }
    }

    fn click(&mut self, button: MouseButton) {
        self.sink.press(button);
        std::thread::sleep(CLICK_HOLD);
        self.sink.release(button);
    }

    fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        let (w, h) = self.sink.screen_size();
        (
            x.clamp(0, w.saturating_sub(1) as i32),
            y.clamp(0, h.saturating_sub(1) as i32),
        )
    }

    fn move_to(&mut self, x: i32, y: i32, smooth: bool) {
        let (tx, ty) = self.clamp(x, y);
        let (cx, cy) = self.last_position;
        if (tx, ty) == (cx, cy) {
            return;
        }

        if !smooth || self.move_duration < MIN_SLEEP || self.move_steps == 0 {
            self.sink.move_to(tx, ty);
        } else {
            let start = Instant::now();
            let steps = self.move_steps;
            let step_interval = self.move_duration / steps;

            for i in 1..=steps {
                let progress = i as f64 / steps as f64;
                let ix = cx + ((tx - cx) as f64 * progress).round() as i32;
                let iy = cy + ((ty - cy) as f64 * progress).round() as i32;
                self.sink.move_to(ix, iy);

                // Sleep only the residual to this step's deadline, so
                // the animation never accumulates drift.
                let deadline = start + step_interval * i;
                let residual = deadline.saturating_duration_since(Instant::now());
                if residual >= MIN_SLEEP {
                    std::thread::sleep(residual);
                }
            }

            // Land exactly on target regardless of rounding
            self.sink.move_to(tx, ty);
        }

        self.last_position = (tx, ty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum SinkOp {
        MoveTo(i32, i32),
        Press(MouseButton),
        Release(MouseButton),
        KeyDown(String),
        KeyUp(String),
        Scroll(i32, i32),
    }

    struct RecordingSink {
        size: (u32, u32),
        ops: Arc<Mutex<Vec<SinkOp>>>,
    }

    impl RecordingSink {
        fn new(size: (u32, u32)) -> (Self, Arc<Mutex<Vec<SinkOp>>>) {
            let ops = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    size,
                    ops: Arc::clone(&ops),
                },
                ops,
            )
        }
    }

    impl InputSink for RecordingSink {
        fn screen_size(&self) -> (u32, u32) {
            self.size
        }

        fn cursor_position(&self) -> Option<(i32, i32)> {
            Some((0, 0))
        }

        fn move_to(&mut self, x: i32, y: i32) {
            self.ops.lock().unwrap().push(SinkOp::MoveTo(x, y));
        }

        fn press(&mut self, button: MouseButton) {
            self.ops.lock().unwrap().push(SinkOp::Press(button));
        }

        fn release(&mut self, button: MouseButton) {
            self.ops.lock().unwrap().push(SinkOp::Release(button));
        }

        fn key_down(&mut self, key: &str) {
            self.ops.lock().unwrap().push(SinkOp::KeyDown(key.to_string()));
        }

        fn key_up(&mut self, key: &str) {
            self.ops.lock().unwrap().push(SinkOp::KeyUp(key.to_string()));
        }

        fn scroll(&mut self, dx: i32, dy: i32) {
            self.ops.lock().unwrap().push(SinkOp::Scroll(dx, dy));
        }
    }

    fn executor_with(
        size: (u32, u32),
        duration: Duration,
        steps: u32,
    ) -> (CommandExecutor<RecordingSink>, Arc<Mutex<Vec<SinkOp>>>) {
        let (sink, ops) = RecordingSink::new(size);
        (CommandExecutor::new(sink, duration, steps), ops)
    }

    #[test]
    fn test_click_repositions_instantly_then_presses() {
        let (mut executor, ops) = executor_with((1920, 1080), Duration::from_millis(25), 3);

        executor.execute(ControlCommand::Click {
            button: MouseButton::Left,
            x: Some(100),
            y: Some(200),
        });

        let ops = ops.lock().unwrap();
        // Exactly one move (no interpolation steps), then press/release
        assert_eq!(
            *ops,
            vec![
                SinkOp::MoveTo(100, 200),
                SinkOp::Press(MouseButton::Left),
                SinkOp::Release(MouseButton::Left),
            ]
        );
    }

    #[test]
    fn test_click_without_coordinates_keeps_cursor() {
        let (mut executor, ops) = executor_with((1920, 1080), Duration::ZERO, 0);

        executor.execute(ControlCommand::Click {
            button: MouseButton::Right,
            x: None,
            y: None,
        });

        let ops = ops.lock().unwrap();
        assert_eq!(
            *ops,
            vec![
                SinkOp::Press(MouseButton::Right),
                SinkOp::Release(MouseButton::Right),
            ]
        );
    }

    #[test]
    fn test_smoothed_move_interpolates_to_target() {
        let (mut executor, ops) = executor_with((1920, 1080), Duration::from_millis(6), 3);

        executor.execute(ControlCommand::Move { x: 300, y: 90 });

        let ops = ops.lock().unwrap();
        let moves: Vec<_> = ops
            .iter()
            .map(|op| match op {
                SinkOp::MoveTo(x, y) => (*x, *y),
                other => panic!("unexpected op {:?}", other),
            })
            .collect();

        // Three interpolation steps plus the exact landing
        assert_eq!(moves, vec![(100, 30), (200, 60), (300, 90), (300, 90)]);
    }

    #[test]
    fn test_zero_duration_moves_instantly() {
        let (mut executor, ops) = executor_with((1920, 1080), Duration::ZERO, 3);

        executor.execute(ControlCommand::Move { x: 50, y: 60 });

        assert_eq!(*ops.lock().unwrap(), vec![SinkOp::MoveTo(50, 60)]);
    }

    #[test]
    fn test_out_of_range_coordinates_are_clamped() {
        let (mut executor, ops) = executor_with((800, 600), Duration::ZERO, 0);

        executor.execute(ControlCommand::Move { x: 5000, y: -40 });

        assert_eq!(*ops.lock().unwrap(), vec![SinkOp::MoveTo(799, 0)]);
    }

    #[test]
    fn test_move_to_current_position_is_a_noop() {
        let (mut executor, ops) = executor_with((800, 600), Duration::ZERO, 0);

        executor.execute(ControlCommand::Move { x: 0, y: 0 });

        assert!(ops.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_code_preferred_over_key_name() {
        let (mut executor, ops) = executor_with((800, 600), Duration::ZERO, 0);

        executor.execute(ControlCommand::KeyDown {
            key: "a".to_string(),
            code: Some("KeyA".to_string()),
        });
        executor.execute(ControlCommand::KeyUp {
            key: "a".to_string(),
            code: None,
        });

        assert_eq!(
            *ops.lock().unwrap(),
            vec![
                SinkOp::KeyDown("KeyA".to_string()),
                SinkOp::KeyUp("a".to_string()),
            ]
        );
    }

    #[test]
    fn test_zero_scroll_is_dropped() {
        let (mut executor, ops) = executor_with((800, 600), Duration::ZERO, 0);

        executor.execute(ControlCommand::Scroll { dx: 0, dy: 0 });
        executor.execute(ControlCommand::Scroll { dx: 0, dy: 2 });

        assert_eq!(*ops.lock().unwrap(), vec![SinkOp::Scroll(0, 2)]);
    }
}
