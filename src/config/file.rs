//! Configuration file handling

use super::{EndpointConfig, Schedule};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// RPC endpoints (replaces the built-in list when non-empty)
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Symbol -> contract address (replaces the built-in table when non-empty)
    #[serde(default)]
    pub tokens: BTreeMap<String, String>,

    /// Burn sink addresses (replaces the built-in pair when non-empty)
    #[serde(default)]
    pub burn_addresses: Vec<String>,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Job schedule
    #[serde(default)]
    pub schedule: Schedule,

    /// Record store settings
    #[serde(default)]
    pub store: StoreSettings,
}

/// Global settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of provider workers per run
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Liveness probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_seconds: u64,

    /// Retries after the first attempt
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// First backoff delay, doubled on each retry
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Spacing between successive remote calls
    #[serde(default = "default_call_delay")]
    pub call_delay_ms: u64,

    /// Spacing between tokens on one worker
    #[serde(default = "default_token_delay")]
    pub token_delay_ms: u64,

    /// Deadline for one token's computation (0 disables)
    #[serde(default = "default_token_timeout")]
    pub token_timeout_seconds: u64,

    /// Freshness hint written into each record
    #[serde(default = "default_next_update")]
    pub next_update_minutes: i64,
}

fn default_concurrency() -> usize {
    3
}

fn default_timeout() -> u64 {
    30
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    2000
}

fn default_call_delay() -> u64 {
    200
}

fn default_token_delay() -> u64 {
    600
}

fn default_token_timeout() -> u64 {
    900
}

fn default_next_update() -> i64 {
    5
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            timeout_seconds: default_timeout(),
            probe_timeout_seconds: default_probe_timeout(),
            max_retries: default_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            call_delay_ms: default_call_delay(),
            token_delay_ms: default_token_delay(),
            token_timeout_seconds: default_token_timeout(),
            next_update_minutes: default_next_update(),
        }
    }
}

impl Settings {
    /// Settings with every delay zeroed, for offline runs against in-memory chains
    pub fn without_delays() -> Self {
        Self {
            retry_base_delay_ms: 0,
            call_delay_ms: 0,
            token_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn call_delay(&self) -> Duration {
        Duration::from_millis(self.call_delay_ms)
    }

    pub fn token_delay(&self) -> Duration {
        Duration::from_millis(self.token_delay_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn token_timeout(&self) -> Option<Duration> {
        (self.token_timeout_seconds > 0).then(|| Duration::from_secs(self.token_timeout_seconds))
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Record store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Directory holding one JSON document per token
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl StoreSettings {
    /// Configured directory or the platform data directory
    pub fn resolved_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("burn-tracker")
                .join("burn-data")
        })
    }
}

impl ConfigFile {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("burn-tracker")
            .join("config.toml")
    }

    /// Load from default path
    pub fn load_default() -> Result<Option<Self>> {
        let path = Self::default_path();
        if path.exists() {
            Ok(Some(Self::load(&path)?))
        } else {
            Ok(None)
        }
    }

    /// Load from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier;

    #[test]
    fn test_parse_config() {
        let toml = r#"
burn_addresses = ["0x000000000000000000000000000000000000dEaD"]

[settings]
concurrency = 2
call_delay_ms = 50

[[endpoints]]
url = "https://example.com/rpc"

[[endpoints]]
url = "https://backup.example.com/rpc"
tier = "fallback"

[tokens]
PHT = "0x885c99a787BE6b41cbf964174C771A9f7ec48e04"

[server]
bind = "127.0.0.1:8080"

[schedule]
mode = "daily"
hour_utc = 3
"#;

        let config: ConfigFile = toml::from_str(toml).unwrap();
        assert_eq!(config.settings.concurrency, 2);
        assert_eq!(config.settings.call_delay_ms, 50);
        assert_eq!(config.settings.max_retries, 3);
        assert_eq!(config.endpoints.len(), 2);
        assert_eq!(config.endpoints[1].tier, Tier::Fallback);
        assert_eq!(config.tokens.len(), 1);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(matches!(config.schedule, Schedule::Daily { hour_utc: 3, .. }));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ConfigFile = toml::from_str("").unwrap();
        assert_eq!(config.settings, Settings::default());
        assert_eq!(config.settings.retry_base_delay_ms, 2000);
        assert_eq!(config.settings.call_delay_ms, 200);
        assert_eq!(config.settings.token_delay_ms, 600);
        assert!(config.endpoints.is_empty());
        assert!(matches!(config.schedule, Schedule::Interval { minutes: 5, .. }));
    }

    #[test]
    fn test_default_path() {
        let path = ConfigFile::default_path();
        assert!(path.to_string_lossy().contains("burn-tracker"));
    }
}
