//! Service configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! config file (`config/armsight.toml`, or the path in `ARMSIGHT_CONFIG`),
//! then `ARMSIGHT_`-prefixed environment variables using `__` between
//! nested keys, e.g. `ARMSIGHT_TWILIO__AUTH_TOKEN`.

use alerting::{AlertConfig, FirebaseConfig, TwilioConfig};
use config::{Config, ConfigError, Environment, File};
use detector::DetectorConfig;
use serde::{Deserialize, Serialize};

/// Default config file, resolved without extension
pub const DEFAULT_CONFIG_PATH: &str = "config/armsight";

/// Top-level settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub model: DetectorConfig,
    pub storage: StorageSettings,
    pub alerts: AlertConfig,
    pub twilio: TwilioConfig,
    pub firebase: FirebaseConfig,
    pub logging: LoggingSettings,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address
    pub bind_addr: String,
    /// Expose destructive operator endpoints
    pub enable_admin: bool,
    /// Per-IP token replenishment interval (seconds)
    pub rate_limit_per_second: u64,
    /// Per-IP burst size
    pub rate_limit_burst: u32,
    /// Request body limit (uploads and base64 frames)
    pub max_body_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            enable_admin: false,
            rate_limit_per_second: 1,
            rate_limit_burst: 10,
            max_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Detection log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub log_dir: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default file location and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("ARMSIGHT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load settings from `path` (optional) and the environment
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Config::try_from(&Settings::default())?)
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("ARMSIGHT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
