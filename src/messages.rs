// Wire types for the runtime

use serde::{Deserialize, Serialize};

use crate::input::{Button, InputEvent};

/// Errors raised while turning a network sample into an input event
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Malformed key command: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unknown key name: {0:?}")]
    UnknownKey(String),
}

// Key event from teleop -> runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyCommand {
    pub key: String,
    pub down: bool,
    #[serde(default)]
    pub shift: bool,
}

/// Logical keys on the network channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkKey {
    Press(Button),
    Coast,
}

impl NetworkKey {
    /// Accepts `w/a/s/d`, `SPACE` and `X` in any case
    pub fn from_name(name: &str) -> Result<Self, CommandError> {
        let key = match name {
            " " => NetworkKey::Press(Button::Brake),
            n if n.eq_ignore_ascii_case("space") => NetworkKey::Press(Button::Brake),
            n if n.eq_ignore_ascii_case("w") => NetworkKey::Press(Button::Forward),
            n if n.eq_ignore_ascii_case("s") => NetworkKey::Press(Button::Back),
            n if n.eq_ignore_ascii_case("a") => NetworkKey::Press(Button::Left),
            n if n.eq_ignore_ascii_case("d") => NetworkKey::Press(Button::Right),
            n if n.eq_ignore_ascii_case("x") => NetworkKey::Coast,
            other => return Err(CommandError::UnknownKey(other.to_string())),
        };
        Ok(key)
    }
}

impl KeyCommand {
    pub fn new(key: impl Into<String>, down: bool, shift: bool) -> Self {
        Self {
            key: key.into(),
            down,
            shift,
        }
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self, CommandError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Event for the aggregator; `None` when the command changes nothing
    /// (releasing the coast key).
    pub fn to_event(&self) -> Result<Option<InputEvent>, CommandError> {
        let event = match NetworkKey::from_name(&self.key)? {
            NetworkKey::Press(button) => Some(InputEvent::Network {
                button,
                down: self.down,
                boost: self.shift,
            }),
            NetworkKey::Coast if self.down => Some(InputEvent::NetworkCoast),
            NetworkKey::Coast => None,
        };
        Ok(event)
    }
}

// Duty output from runtime -> PWM registers
// Has default values (all zero = coast)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DutyFrame {
    pub left_a: u16,
    pub left_b: u16,
    pub right_a: u16,
    pub right_b: u16,
}

impl DutyFrame {
    pub fn coast() -> Self {
        Self::default()
    }

    pub fn as_array(&self) -> [u16; 4] {
        [self.left_a, self.left_b, self.right_a, self.right_b]
    }
}

/// Network link status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LinkHealth {
    NeverSeen,
    Ok,
    Quiet,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub link: LinkHealth,
    pub ticks: u64,
    pub last_seen_ms_ago: Option<u64>,
}
