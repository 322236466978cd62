//! Cadence configuration and validation.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const MIN_TRIGGER_THRESHOLD: u32 = 1;
pub const MAX_TRIGGER_THRESHOLD: u32 = 10;

/// Timing parameters for the cadence state machine and alert lifecycle.
///
/// Immutable once handed to the engine; replace it through
/// [`Engine::update_config`](crate::engine::Engine::update_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Largest gap (exclusive) between two taps that still counts as consecutive.
    #[serde(default = "default_consecutive_window_ms")]
    pub consecutive_window_ms: i64,
    /// Consecutive taps needed to fire the alert (1-10).
    #[serde(default = "default_trigger_threshold")]
    pub trigger_threshold: u32,
    /// Press durations strictly below this are dots, the rest dashes.
    #[serde(default = "default_dot_threshold_ms")]
    pub dot_threshold_ms: i64,
    /// How long an alert sounds before stopping on its own.
    #[serde(default = "default_alert_auto_stop_ms")]
    pub alert_auto_stop_ms: u64,
}

fn default_consecutive_window_ms() -> i64 {
    3000
}
fn default_trigger_threshold() -> u32 {
    2
}
fn default_dot_threshold_ms() -> i64 {
    250
}
fn default_alert_auto_stop_ms() -> u64 {
    5000
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            consecutive_window_ms: default_consecutive_window_ms(),
            trigger_threshold: default_trigger_threshold(),
            dot_threshold_ms: default_dot_threshold_ms(),
            alert_auto_stop_ms: default_alert_auto_stop_ms(),
        }
    }
}

impl CadenceConfig {
    /// Check every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_TRIGGER_THRESHOLD..=MAX_TRIGGER_THRESHOLD).contains(&self.trigger_threshold) {
            return Err(ConfigError::invalid(
                "cadence.trigger_threshold",
                format!(
                    "must be between {MIN_TRIGGER_THRESHOLD} and {MAX_TRIGGER_THRESHOLD}, got {}",
                    self.trigger_threshold
                ),
            ));
        }
        if self.consecutive_window_ms <= 0 {
            return Err(ConfigError::invalid(
                "cadence.consecutive_window_ms",
                format!("must be positive, got {}", self.consecutive_window_ms),
            ));
        }
        if self.dot_threshold_ms <= 0 {
            return Err(ConfigError::invalid(
                "cadence.dot_threshold_ms",
                format!("must be positive, got {}", self.dot_threshold_ms),
            ));
        }
        if self.alert_auto_stop_ms == 0 {
            return Err(ConfigError::invalid(
                "cadence.alert_auto_stop_ms",
                "must be positive",
            ));
        }
        Ok(())
    }

    pub fn tap_speed(&self) -> TapSpeed {
        TapSpeed::from_dot_threshold(self.dot_threshold_ms)
    }
}

/// Human-facing label for how fast the operator taps, derived from the
/// dot threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapSpeed {
    VeryFast,
    Fast,
    Normal,
    Slow,
    VerySlow,
}

impl TapSpeed {
    pub fn from_dot_threshold(dot_threshold_ms: i64) -> Self {
        match dot_threshold_ms {
            i64::MIN..=150 => TapSpeed::VeryFast,
            151..=250 => TapSpeed::Fast,
            251..=350 => TapSpeed::Normal,
            351..=450 => TapSpeed::Slow,
            _ => TapSpeed::VerySlow,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TapSpeed::VeryFast => "Very Fast",
            TapSpeed::Fast => "Fast",
            TapSpeed::Normal => "Normal",
            TapSpeed::Slow => "Slow",
            TapSpeed::VerySlow => "Very Slow",
        }
    }
}
