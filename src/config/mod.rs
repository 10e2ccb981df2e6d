//! Configuration types and runtime config resolution

mod endpoint;
mod file;
mod tokens;

pub use endpoint::{redact_url, EndpointConfig, Tier};
pub use file::{ConfigFile, ServerSettings, Settings, StoreSettings};
pub use tokens::{Token, TokenTable};

use crate::error::{ConfigError, Result};
use crate::rpc::defaults;
use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// When the burn job runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Schedule {
    /// Every `minutes`, aligned to process start
    Interval {
        #[serde(default = "default_interval_minutes")]
        minutes: u64,
        #[serde(default = "default_run_on_start")]
        run_on_start: bool,
    },
    /// Once a day at `hour_utc:00`
    Daily {
        hour_utc: u32,
        #[serde(default = "default_run_on_start")]
        run_on_start: bool,
    },
}

fn default_interval_minutes() -> u64 {
    5
}

fn default_run_on_start() -> bool {
    true
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::Interval {
            minutes: default_interval_minutes(),
            run_on_start: default_run_on_start(),
        }
    }
}

impl Schedule {
    pub fn validate(&self) -> Result<()> {
        match self {
            Schedule::Interval { minutes: 0, .. } => {
                Err(ConfigError::InvalidSchedule("interval must be at least 1 minute".into()).into())
            }
            Schedule::Daily { hour_utc, .. } if *hour_utc > 23 => Err(ConfigError::InvalidSchedule(
                format!("hour_utc {} is out of range 0-23", hour_utc),
            )
            .into()),
            _ => Ok(()),
        }
    }
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    pub endpoints: Vec<EndpointConfig>,
    pub tokens: TokenTable,
    pub burn_addresses: Vec<Address>,
    pub server: ServerSettings,
    pub schedule: Schedule,
    pub store_dir: PathBuf,
}

impl Config {
    /// Merge a config file (if any) over the built-in defaults
    pub fn resolve(file: Option<ConfigFile>) -> Result<Self> {
        let file = file.unwrap_or_default();

        let mut endpoints = if file.endpoints.is_empty() {
            defaults::default_endpoints()
        } else {
            file.endpoints
        };
        endpoints.retain(|e| e.enabled);
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints.into());
        }

        let tokens = if file.tokens.is_empty() {
            TokenTable::from_pairs(defaults::DEFAULT_TOKENS.iter().copied())?
        } else {
            TokenTable::from_pairs(file.tokens.iter())?
        };

        let burn_addresses = if file.burn_addresses.is_empty() {
            defaults::burn_addresses()
        } else {
            file.burn_addresses
                .iter()
                .map(|a| {
                    Address::from_str(a.trim()).map_err(|_| {
                        crate::Error::from(ConfigError::InvalidAddress {
                            symbol: "burn_addresses".to_string(),
                            address: a.clone(),
                        })
                    })
                })
                .collect::<Result<Vec<_>>>()?
        };

        file.schedule.validate()?;

        Ok(Self {
            settings: file.settings,
            endpoints,
            tokens,
            burn_addresses,
            server: file.server,
            schedule: file.schedule,
            store_dir: file.store.resolved_dir(),
        })
    }

    /// Load from an explicit path, or the default path when present
    pub fn load(path: Option<&std::path::Path>) -> Result<Self> {
        let file = match path {
            Some(p) => Some(ConfigFile::load(p)?),
            None => ConfigFile::load_default()?,
        };
        Self::resolve(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = Config::resolve(None).unwrap();
        assert!(!config.endpoints.is_empty());
        assert!(config.tokens.get("pht").is_some());
        assert_eq!(config.burn_addresses.len(), 2);
        assert_eq!(config.schedule, Schedule::default());
    }

    #[test]
    fn test_disabled_endpoints_removed() {
        let file: ConfigFile = toml::from_str(
            r#"
[[endpoints]]
url = "https://off.example"
enabled = false
"#,
        )
        .unwrap();

        let err = Config::resolve(Some(file)).unwrap_err();
        assert!(matches!(err, crate::Error::Config(ConfigError::NoEndpoints)));
    }

    #[test]
    fn test_invalid_schedule() {
        let file: ConfigFile = toml::from_str("[schedule]\nmode = \"daily\"\nhour_utc = 24\n").unwrap();
        assert!(Config::resolve(Some(file)).is_err());

        let file: ConfigFile = toml::from_str("[schedule]\nmode = \"interval\"\nminutes = 0\n").unwrap();
        assert!(Config::resolve(Some(file)).is_err());
    }

    #[test]
    fn test_custom_burn_addresses() {
        let file: ConfigFile =
            toml::from_str("burn_addresses = [\"0x000000000000000000000000000000000000dEaD\"]").unwrap();
        let config = Config::resolve(Some(file)).unwrap();
        assert_eq!(config.burn_addresses.len(), 1);
    }
}
