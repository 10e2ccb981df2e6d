//! Timestamp -> block number resolution by binary search

use crate::error::{Error, Result, RpcError};
use crate::rpc::{ChainReader, RateLimitedRetrier};
use std::time::Duration;

/// Finds the latest block at or before a wall-clock time.
///
/// Nodes expose no time index, so this binary-searches block numbers using
/// `block(n)` lookups. Each lookup goes through the retrier on its own, so a
/// rate-limited midpoint is retried without discarding the narrowed range.
#[derive(Debug, Clone, Copy)]
pub struct BlockTimeResolver {
    retrier: RateLimitedRetrier,
    call_delay: Duration,
}

impl BlockTimeResolver {
    pub fn new(retrier: RateLimitedRetrier, call_delay: Duration) -> Self {
        Self {
            retrier,
            call_delay,
        }
    }

    /// Greatest `b` in `[1, upper_bound]` with `timestamp(b) <= target`, or 1.
    ///
    /// A block the node cannot return (missing, or a malformed header) is
    /// treated as later than `target`, biasing towards an earlier valid block.
    /// Retry exhaustion and other fatal errors abort the search.
    pub async fn resolve(
        &self,
        chain: &dyn ChainReader,
        target_timestamp: u64,
        upper_bound: u64,
    ) -> Result<u64> {
        let mut left = 1u64;
        let mut right = upper_bound;
        let mut best: Option<u64> = None;
        let mut lookups = 0u32;

        while left <= right {
            let mid = left + (right - left) / 2;

            let lookup = self
                .retrier
                .execute("getBlock", || chain.block(mid))
                .await;
            lookups += 1;
            tokio::time::sleep(self.call_delay).await;

            let timestamp = match lookup {
                Ok(Some(block)) => Some(block.timestamp),
                Ok(None) => None,
                Err(Error::Rpc(RpcError::InvalidResponse(e) | RpcError::MissingField(e))) => {
                    tracing::debug!("Unreadable block {} treated as too late: {}", mid, e);
                    None
                }
                Err(e) => return Err(e),
            };

            match timestamp {
                Some(ts) if ts <= target_timestamp => {
                    best = Some(mid);
                    left = mid + 1;
                }
                _ => right = mid - 1,
            }
        }

        let block = best.unwrap_or(1);
        tracing::debug!(
            "Resolved timestamp {} to block {} in {} lookups",
            target_timestamp,
            block,
            lookups
        );
        Ok(block)
    }
}
