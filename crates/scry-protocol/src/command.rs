//! Viewer control commands
//!
//! Commands originate in a viewer session, pass through the relay
//! unmodified, and are executed against the agent's input sink. Field
//! semantics are deliberately loose at this layer: the input sink clamps
//! out-of-range coordinates and ignores keys it cannot map, so nothing
//! here validates beyond the type shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mouse button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl Default for MouseButton {
    fn default() -> Self {
        Self::Left
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// A single input command issued by a viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlCommand {
    /// Move the cursor to absolute screen coordinates
    Move { x: i32, y: i32 },

    /// Press and release a mouse button.
    ///
    /// Coordinates are optional: the web UI has coordinate-less click
    /// buttons that act at the current cursor position.
    Click {
        #[serde(default)]
        button: MouseButton,
        #[serde(default)]
        x: Option<i32>,
        #[serde(default)]
        y: Option<i32>,
    },

    /// Key pressed. `key` is the browser key name; `code` the physical
    /// key code, preferred by sinks when present.
    KeyDown {
        key: String,
        #[serde(default)]
        code: Option<String>,
    },

    /// Key released
    KeyUp {
        key: String,
        #[serde(default)]
        code: Option<String>,
    },

    /// Wheel scroll in notch units (positive dy scrolls down)
    Scroll { dx: i32, dy: i32 },
}

impl ControlCommand {
    /// Short action name, used for logging
    pub fn action(&self) -> &'static str {
        match self {
            ControlCommand::Move { .. } => "move",
            ControlCommand::Click { .. } => "click",
            ControlCommand::KeyDown { .. } => "keydown",
            ControlCommand::KeyUp { .. } => "keyup",
            ControlCommand::Scroll { .. } => "scroll",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_bincode_roundtrip() {
        let commands = vec![
            ControlCommand::Move { x: 100, y: -5 },
            ControlCommand::Click {
                button: MouseButton::Right,
                x: Some(640),
                y: Some(360),
            },
            ControlCommand::KeyDown {
                key: "a".to_string(),
                code: Some("KeyA".to_string()),
            },
            ControlCommand::KeyUp {
                key: "Shift".to_string(),
                code: None,
            },
            ControlCommand::Scroll { dx: 0, dy: -1 },
        ];

        for command in commands {
            let encoded = bincode::serialize(&command).unwrap();
            let decoded: ControlCommand = bincode::deserialize(&encoded).unwrap();
            assert_eq!(decoded, command);
        }
    }

    #[test]
    fn test_click_defaults_from_json() {
        // A bare click from the web UI carries no button or coordinates
        let decoded: ControlCommand = serde_json::from_str(r#"{"click": {}}"#).unwrap();
        assert_eq!(
            decoded,
            ControlCommand::Click {
                button: MouseButton::Left,
                x: None,
                y: None,
            }
        );
    }

    #[test]
    fn test_action_names() {
        assert_eq!(ControlCommand::Move { x: 0, y: 0 }.action(), "move");
        assert_eq!(ControlCommand::Scroll { dx: 1, dy: 0 }.action(), "scroll");
    }
}
