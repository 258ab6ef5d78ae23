//! Telemetry configuration.

use crate::error::{Result, TelemetryError};
use crate::metrics::TOTAL_PROCESSOR_TIME;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable that overrides the default volume.
pub const VOLUME_ENV_VAR: &str = "HOST_TELEMETRY_VOLUME";

/// Volume reported when the caller does not name one.
#[cfg(windows)]
pub const DEFAULT_VOLUME: &str = r"C:\";

/// Volume reported when the caller does not name one.
#[cfg(not(windows))]
pub const DEFAULT_VOLUME: &str = "/";

/// Configuration for the collectors and the sampler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Volume used by the disk collector when no path is given
    pub default_volume: PathBuf,
    /// Counter path registered by the CPU sampler
    pub counter_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_volume: PathBuf::from(DEFAULT_VOLUME),
            counter_path: TOTAL_PROCESSOR_TIME.to_string(),
        }
    }
}

impl TelemetryConfig {
    /// Default configuration with the volume taken from the environment, if set.
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        match std::env::var(VOLUME_ENV_VAR) {
            Ok(volume) => config.with_volume(volume).validated(),
            Err(std::env::VarError::NotPresent) => Ok(config),
            Err(e) => Err(TelemetryError::config_error(format!("{}: {}", VOLUME_ENV_VAR, e))),
        }
    }

    /// Set the default volume.
    pub fn with_volume(mut self, volume: impl Into<PathBuf>) -> Self {
        self.default_volume = volume.into();
        self
    }

    /// Set the counter path.
    pub fn with_counter_path(mut self, path: impl Into<String>) -> Self {
        self.counter_path = path.into();
        self
    }

    /// Check that the configuration can be used.
    pub fn validated(self) -> Result<Self> {
        if self.default_volume.as_os_str().is_empty() {
            return Err(TelemetryError::config_error("default volume must not be empty"));
        }
        if !self.default_volume.is_absolute() {
            return Err(TelemetryError::config_error(format!(
                "default volume must be an absolute path, got '{}'",
                self.default_volume.display()
            )));
        }
        if self.counter_path.trim().is_empty() {
            return Err(TelemetryError::config_error("counter path must not be empty"));
        }
        Ok(self)
    }
}
