// Timing, duty ranges, topics, serial configuration
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

// Control loop period (50 Hz)
pub const TICK_PERIOD_MS: u64 = 20;

// How often the host loop services adapters; must be well under the tick period
pub const HOST_POLL: Duration = Duration::from_millis(2);

// A serial keystroke counts as held for this long
pub const HOLD_WINDOW_MS: u64 = 120;

// Ramp & kick
pub const RAMP_STEP: u16 = 30;
pub const KICK_DURATION_MS: u64 = 80;
pub const MIN_START_MAGNITUDE: u16 = 90;

// Duty range: 9-bit PWM at 20 kHz (above the audible range)
pub const PWM_RESOLUTION_BITS: u32 = 9;
pub const MAX_DUTY: u16 = (1 << PWM_RESOLUTION_BITS) - 1; // 511
pub const CRUISE_DUTY: u16 = 420;
pub const PWM_FREQ_HZ: u32 = 20_000;

// Motors are mirror-mounted, so one side is wired inverted
pub const LEFT_INVERTED: bool = false;
pub const RIGHT_INVERTED: bool = true;

// Upper bound for any configured time span
pub const MAX_CONFIG_SPAN_MS: u64 = 60_000;

// Health goes quiet when neither a key command nor a ping arrived for this long
pub const LINK_QUIET_AFTER_MS: u64 = 3_000;

// Zenoh topics
pub const TOPIC_CMD_KEY: &str = "drive/cmd/key"; // key events
pub const TOPIC_CMD_PING: &str = "drive/cmd/ping"; // connectivity pings
pub const TOPIC_RT_DUTY: &str = "drive/rt/duty"; // duty outputs
pub const TOPIC_HEALTH: &str = "drive/state/health"; // link health

// Local serial command channel
pub const SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const SERIAL_BAUD: u32 = 115_200;
pub const SERIAL_TIMEOUT_MS: u64 = 5;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Tunables for the control core.
///
/// Every field falls back to the matching constant above, so a JSON override
/// file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub tick_period_ms: u64,
    pub hold_window_ms: u64,
    pub ramp_step: u16,
    pub kick_duration_ms: u64,
    pub min_start_magnitude: u16,
    pub cruise_duty: u16,
    pub max_duty: u16,
    pub left_inverted: bool,
    pub right_inverted: bool,
    /// Coast after this much network silence. `None` keeps the last command
    /// running indefinitely.
    pub network_timeout_ms: Option<u64>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: TICK_PERIOD_MS,
            hold_window_ms: HOLD_WINDOW_MS,
            ramp_step: RAMP_STEP,
            kick_duration_ms: KICK_DURATION_MS,
            min_start_magnitude: MIN_START_MAGNITUDE,
            cruise_duty: CRUISE_DUTY,
            max_duty: MAX_DUTY,
            left_inverted: LEFT_INVERTED,
            right_inverted: RIGHT_INVERTED,
            network_timeout_ms: None,
        }
    }
}

impl DriveConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: DriveConfig = serde_json::from_str(raw)?;
        Ok(config.sanitized())
    }

    /// Clamp values into ranges the core relies on
    pub fn sanitized(mut self) -> Self {
        self.max_duty = self.max_duty.min(MAX_DUTY);
        self.cruise_duty = self.cruise_duty.min(self.max_duty);
        self.min_start_magnitude = self.min_start_magnitude.min(self.max_duty);
        self.ramp_step = self.ramp_step.clamp(1, self.max_duty.max(1));
        self.tick_period_ms = self.tick_period_ms.clamp(1, MAX_CONFIG_SPAN_MS);
        self.kick_duration_ms = self.kick_duration_ms.min(MAX_CONFIG_SPAN_MS);
        self.hold_window_ms = self.hold_window_ms.min(MAX_CONFIG_SPAN_MS);
        self
    }
}
