mod config;

pub use config::{AlertConfig, Config, MorseTiming, MAX_LOG_CAPACITY};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `<config dir>/morsecall/`, or `$MORSECALL_CONFIG_DIR` when set.
///
/// Set MORSECALL_CONFIG_DIR to keep tests and development runs away from
/// the real configuration.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("MORSECALL_CONFIG_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("morsecall"),
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::LoadFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
