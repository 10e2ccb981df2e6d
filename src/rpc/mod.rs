//! RPC endpoint access, retry policy, and the provider pool

pub mod defaults;
mod endpoint;
#[cfg(test)]
pub(crate) mod mock;
mod pool;
mod retry;

pub use defaults::default_endpoints;
pub use endpoint::{BlockRef, ChainReader, Endpoint};
pub use pool::{EndpointStatus, ProbeRecord, ProviderPool};
pub use retry::RateLimitedRetrier;
