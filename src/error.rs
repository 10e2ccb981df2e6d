//! Error types for burn-tracker

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// RPC-related errors
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Symbol not present in the token table
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    /// A run was requested while another one is active
    #[error("A burn job is already running")]
    RunRejected,

    /// Per-token deadline elapsed
    #[error("Timed out after {0}s")]
    Deadline(u64),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// RPC-specific errors
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("No healthy endpoints available")]
    NoHealthyEndpoints,

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited by endpoint: {0}")]
    RateLimited(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response from endpoint: {0}")]
    InvalidResponse(String),

    #[error("Missing field in response: {0}")]
    MissingField(String),

    #[error("Could not read decimals for token {0}")]
    DecimalsUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl RpcError {
    /// Map an untyped transport/provider message onto the taxonomy
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();

        if has_status_429(&lower)
            || lower.contains("rate limit")
            || lower.contains("too many requests")
        {
            RpcError::RateLimited(message)
        } else if lower.contains("timeout") || lower.contains("timed out") {
            RpcError::Timeout(message)
        } else if lower.contains("connection reset")
            || lower.contains("connection refused")
            || lower.contains("network")
        {
            RpcError::ConnectionFailed(message)
        } else {
            RpcError::Provider(message)
        }
    }

    /// Rate-limit and transient network failures are worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::RateLimited(_) | RpcError::Timeout(_) | RpcError::ConnectionFailed(_) => true,
            RpcError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map(|s| s.as_u16() == 429).unwrap_or(false)
            }
            RpcError::Provider(msg) => {
                !matches!(RpcError::from_message(msg.as_str()), RpcError::Provider(_))
            }
            _ => false,
        }
    }
}

/// `429` as a standalone status code; URLs and longer digit runs never match
fn has_status_429(lower: &str) -> bool {
    lower
        .split_whitespace()
        .filter(|word| !word.contains("://"))
        .flat_map(|word| word.split(|c: char| !c.is_ascii_alphanumeric()))
        .any(|part| part == "429")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid config file: {0}")]
    InvalidFile(String),

    #[error("Invalid address format for {symbol}: {address}")]
    InvalidAddress { symbol: String, address: String },

    #[error("Duplicate token symbol: {0}")]
    DuplicateToken(String),

    #[error("No RPC endpoints configured")]
    NoEndpoints,

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("Config file parse error: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to write record for {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to read record for {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Corrupted record for {0}")]
    Corrupted(String),
}

impl Error {
    /// Whether the shared retrier should try the operation again
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Rpc(e) => e.is_retryable(),
            Error::Other(msg) => RpcError::from_message(msg.as_str()).is_retryable(),
            _ => false,
        }
    }
}

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}
