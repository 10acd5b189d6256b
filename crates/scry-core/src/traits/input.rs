//! Input injection trait

use scry_protocol::MouseButton;

/// Sink for injected input events.
///
/// Implementations wrap platform input APIs. The contract is that no
/// method may panic or otherwise propagate a failure: unknown keys are
/// ignored, and coordinates arrive pre-clamped to `screen_size()` by the
/// command executor.
pub trait InputSink: Send {
    /// Width and height of the controlled screen in pixels
    fn screen_size(&self) -> (u32, u32);

    /// Current cursor position, if the platform can report one
    fn cursor_position(&self) -> Option<(i32, i32)>;

    /// Place the cursor at absolute coordinates
    fn move_to(&mut self, x: i32, y: i32);

    /// Press a mouse button
    fn press(&mut self, button: MouseButton);

    /// Release a mouse button
    fn release(&mut self, button: MouseButton);

    /// Press a key. `key` is the browser key/code name; implementations
    /// ignore names they cannot map.
    fn key_down(&mut self, key: &str);

    /// Release a key
    fn key_up(&mut self, key: &str);

    /// Wheel scroll in notch units
    fn scroll(&mut self, dx: i32, dy: i32);
}
