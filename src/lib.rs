//! burn-tracker - Rolling-window ERC-20 burn tracker
//!
//! A Rust library and CLI that measures how many tokens were sent to burn
//! addresses over trailing windows (5 minutes up to 24 hours), spreading the
//! work across several JSON-RPC endpoints with rate-limit aware retries and
//! one-shot failover.
//!
//! # Example
//!
//! ```rust,no_run
//! use burn_tracker::{Config, FleetProcessor, MemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(None)?;
//!     let store = Arc::new(MemoryStore::new());
//!     let fleet = FleetProcessor::from_config(&config, store)?;
//!
//!     let symbols: Vec<String> = config.tokens.tokens().into_iter().map(|t| t.symbol).collect();
//!     let results = fleet.run_all(&symbols).await?;
//!
//!     println!("{} tokens processed", results.len());
//!     Ok(())
//! }
//! ```

pub mod burn;
pub mod config;
pub mod error;
pub mod fleet;
pub mod rpc;
pub mod scheduler;
pub mod server;
pub mod store;

// Re-exports for convenience
pub use burn::{
    scale_amount, BlockTimeResolver, BurnLogAggregator, BurnRecord, BurnWindow, Computation,
    TokenBurnCalculator, TransferQuery,
};
pub use config::{
    Config, ConfigFile, EndpointConfig, Schedule, Settings, Tier, Token, TokenTable,
};
pub use error::{ConfigError, Error, Result, RpcError, StoreError};
pub use fleet::{distribute, FleetProcessor, JobRunResult};
pub use rpc::{
    default_endpoints, BlockRef, ChainReader, Endpoint, EndpointStatus, ProviderPool,
    RateLimitedRetrier,
};
pub use scheduler::{JobRunner, RunStatus, Scheduler};
pub use server::AppState;
pub use store::{BurnStore, JsonFileStore, MemoryStore};
