//! RPC endpoint configuration

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which acquisition tier an endpoint belongs to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Probed on every acquisition
    #[default]
    Primary,
    /// Probed in order only while primaries fall short
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Primary => write!(f, "primary"),
            Tier::Fallback => write!(f, "fallback"),
        }
    }
}

/// Configuration for a single RPC endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// RPC URL
    pub url: String,
    /// Acquisition tier
    #[serde(default)]
    pub tier: Tier,
    /// Optional note about the endpoint
    #[serde(default)]
    pub note: Option<String>,
    /// Whether this endpoint is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl EndpointConfig {
    /// Create a new primary endpoint config
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            tier: Tier::Primary,
            note: None,
            enabled: true,
        }
    }

    /// Create a new fallback endpoint config
    pub fn fallback(url: impl Into<String>) -> Self {
        Self::new(url).with_tier(Tier::Fallback)
    }

    /// Builder-style setter for tier
    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    /// Builder-style setter for note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// URL with any path segment after the host elided (hides API keys in logs)
    pub fn display_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self::new("http://localhost:8545")
    }
}

/// Strip path and query from a URL so embedded keys never reach the logs
pub fn redact_url(url: &str) -> String {
    let (scheme, rest) = match url.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, url),
    };
    let host = rest.split(['/', '?']).next().unwrap_or(rest);
    let redacted = if host.len() < rest.len() {
        format!("{}/…", host)
    } else {
        host.to_string()
    };

    match scheme {
        Some(scheme) => format!("{}://{}", scheme, redacted),
        None => redacted,
    }
}
