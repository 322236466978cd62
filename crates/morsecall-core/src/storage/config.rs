//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Cadence timing (consecutive window, trigger threshold, dot threshold)
//! - Alert auto-stop duration and ringtone
//! - Morse dash/pause durations
//!
//! Configuration is stored at `<config dir>/morsecall/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::config_dir;
use crate::cadence::{CadenceConfig, DEFAULT_LOG_CAPACITY};
use crate::error::ConfigError;

pub const MAX_LOG_CAPACITY: usize = 100;

/// Morse timing beyond the dot threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorseTiming {
    #[serde(default = "default_dash_duration_ms")]
    pub dash_duration_ms: i64,
    #[serde(default = "default_pause_duration_ms")]
    pub pause_duration_ms: i64,
}

/// Alert presentation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Ringtone identifier handed to the sink (path or URI).
    #[serde(default)]
    pub ringtone: Option<String>,
    #[serde(default = "default_log_capacity")]
    pub activity_log_capacity: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<config dir>/morsecall/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cadence: CadenceConfig,
    #[serde(default)]
    pub morse: MorseTiming,
    #[serde(default)]
    pub alert: AlertConfig,
}

fn default_dash_duration_ms() -> i64 {
    750
}
fn default_pause_duration_ms() -> i64 {
    500
}
fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for MorseTiming {
    fn default() -> Self {
        Self {
            dash_duration_ms: default_dash_duration_ms(),
            pause_duration_ms: default_pause_duration_ms(),
        }
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            ringtone: None,
            activity_log_capacity: default_log_capacity(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(ConfigError::invalid(
                                key,
                                format!("cannot parse '{value}' as integer"),
                            ));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value)
                            .map_err(|e| ConfigError::invalid(key, e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cadence.validate()?;
        if self.morse.dash_duration_ms <= 0 {
            return Err(ConfigError::invalid(
                "morse.dash_duration_ms",
                "must be positive",
            ));
        }
        if self.morse.pause_duration_ms <= 0 {
            return Err(ConfigError::invalid(
                "morse.pause_duration_ms",
                "must be positive",
            ));
        }
        if !(1..=MAX_LOG_CAPACITY).contains(&self.alert.activity_log_capacity) {
            return Err(ConfigError::invalid(
                "alert.activity_log_capacity",
                format!("must be between 1 and {MAX_LOG_CAPACITY}"),
            ));
        }
        Ok(())
    }

    /// Location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(config_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults if no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed or fails
    /// validation, or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path, writing defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content)?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to an explicit path.
    ///
    /// # Errors
    ///
    /// See [`Config::save`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Change one value in memory. The result is validated before it
    /// replaces `self`; on error `self` is untouched.
    ///
    /// Setting `cadence.dot_threshold_ms` also re-derives
    /// `morse.dash_duration_ms` as three dots.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed
    /// or the resulting config is invalid.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let mut updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::invalid(key, e.to_string()))?;
        if key == "cadence.dot_threshold_ms" {
            updated.morse.dash_duration_ms = updated.cadence.dot_threshold_ms.saturating_mul(3);
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save. An invalid value leaves both
    /// memory and disk unchanged.
    ///
    /// # Errors
    ///
    /// See [`Config::apply`] and [`Config::save`].
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.apply(key, value)?;
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn empty_file_yields_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.cadence.trigger_threshold, 2);
        assert_eq!(parsed.morse.dash_duration_ms, 750);
        assert_eq!(parsed.alert.activity_log_capacity, 5);
        assert!(parsed.alert.ringtone.is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("cadence.trigger_threshold").as_deref(), Some("2"));
        assert_eq!(cfg.get("cadence.consecutive_window_ms").as_deref(), Some("3000"));
        assert_eq!(cfg.get("alert.ringtone").as_deref(), Some("null"));
        assert!(cfg.get("cadence.missing_key").is_none());
    }

    #[test]
    fn apply_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.apply("cadence.trigger_threshold", "4").unwrap();
        assert_eq!(cfg.cadence.trigger_threshold, 4);
    }

    #[test]
    fn apply_sets_optional_string() {
        let mut cfg = Config::default();
        cfg.apply("alert.ringtone", "/sounds/bell.ogg").unwrap();
        assert_eq!(cfg.alert.ringtone.as_deref(), Some("/sounds/bell.ogg"));
    }

    #[test]
    fn apply_rejects_out_of_range_and_keeps_previous() {
        let mut cfg = Config::default();
        let err = cfg.apply("cadence.trigger_threshold", "11").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.cadence.trigger_threshold, 2);

        assert!(cfg.apply("cadence.consecutive_window_ms", "-1").is_err());
        assert_eq!(cfg.cadence.consecutive_window_ms, 3000);
    }

    #[test]
    fn apply_rejects_unknown_key() {
        let mut cfg = Config::default();
        assert_eq!(
            cfg.apply("cadence.nonexistent", "1"),
            Err(ConfigError::UnknownKey("cadence.nonexistent".into()))
        );
        assert!(cfg.apply("", "1").is_err());
    }

    #[test]
    fn apply_rejects_non_numeric() {
        let mut cfg = Config::default();
        assert!(cfg.apply("cadence.trigger_threshold", "three").is_err());
    }

    #[test]
    fn dot_threshold_rederives_dash() {
        let mut cfg = Config::default();
        cfg.apply("cadence.dot_threshold_ms", "300").unwrap();
        assert_eq!(cfg.morse.dash_duration_ms, 900);
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }

    #[test]
    fn load_from_reads_saved_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.apply("cadence.trigger_threshold", "5").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().cadence.trigger_threshold, 5);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cadence]\ntrigger_threshold = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cadence\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }
}
