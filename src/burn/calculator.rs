//! Per-token burn calculation across all windows, with one-shot failover

use crate::burn::{scale_amount, BlockTimeResolver, BurnLogAggregator, BurnRecord, BurnWindow};
use crate::config::{redact_url, Settings, Token, TokenTable};
use crate::error::{Error, Result, RpcError};
use crate::rpc::{BlockRef, ChainReader, ProviderPool, RateLimitedRetrier};
use alloy::primitives::Address;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Endpoint reassignments allowed per token computation
const MAX_FAILOVERS: u32 = 1;

/// Progress of one token computation
enum State {
    /// Compute everything on `chain`
    Attempt {
        chain: Arc<dyn ChainReader>,
        failovers_left: u32,
    },
    /// `failed` broke mid-computation; look for a different endpoint
    Failover {
        failed: Arc<dyn ChainReader>,
        error: Error,
        failovers_left: u32,
    },
    Success(BurnRecord),
    GiveUp(Error),
}

/// Outcome of one token computation
pub struct Computation {
    pub result: Result<BurnRecord>,
    /// Endpoint the computation finished on; a replacement after failover
    pub endpoint: Arc<dyn ChainReader>,
}

/// Computes a [`BurnRecord`] for one token
pub struct TokenBurnCalculator {
    tokens: Arc<TokenTable>,
    burn_addresses: Arc<Vec<Address>>,
    pool: Arc<ProviderPool>,
    retrier: RateLimitedRetrier,
    resolver: BlockTimeResolver,
    aggregator: BurnLogAggregator,
    call_delay: Duration,
    next_update_in: chrono::Duration,
}

impl TokenBurnCalculator {
    pub fn new(
        tokens: Arc<TokenTable>,
        burn_addresses: Arc<Vec<Address>>,
        pool: Arc<ProviderPool>,
        settings: &Settings,
    ) -> Self {
        let retrier = RateLimitedRetrier::from_settings(settings);
        let call_delay = settings.call_delay();

        Self {
            tokens,
            burn_addresses,
            pool,
            retrier,
            resolver: BlockTimeResolver::new(retrier, call_delay),
            aggregator: BurnLogAggregator::new(retrier, call_delay),
            call_delay,
            next_update_in: chrono::Duration::minutes(settings.next_update_minutes),
        }
    }

    /// Burn record for `symbol`, or `None` if it could not be computed this cycle
    pub async fn compute(&self, symbol: &str, chain: Arc<dyn ChainReader>) -> Option<BurnRecord> {
        match self.try_compute(symbol, chain).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!("Burn calculation for {} failed: {}", symbol, e);
                None
            }
        }
    }

    /// Like [`compute`](Self::compute) but keeps the failure reason
    pub async fn try_compute(&self, symbol: &str, chain: Arc<dyn ChainReader>) -> Result<BurnRecord> {
        self.compute_with(symbol, chain, &[]).await.result
    }

    /// Compute `symbol` starting on `chain`, failing over at most once.
    ///
    /// A replacement is preferably one whose URL is not in `busy`. The
    /// returned endpoint is the one that served the last attempt, so callers
    /// can stop using an endpoint that just failed.
    pub async fn compute_with(
        &self,
        symbol: &str,
        chain: Arc<dyn ChainReader>,
        busy: &[String],
    ) -> Computation {
        let token = match self.tokens.get(symbol) {
            Some(token) => token.clone(),
            None => {
                return Computation {
                    result: Err(Error::UnknownToken(symbol.to_string())),
                    endpoint: chain,
                }
            }
        };

        let mut serving = chain.clone();
        let mut state = State::Attempt {
            chain,
            failovers_left: MAX_FAILOVERS,
        };

        let result = loop {
            state = match state {
                State::Attempt {
                    chain,
                    failovers_left,
                } => match self.attempt(&token, chain.as_ref()).await {
                    Ok(record) => State::Success(record),
                    Err(error) if failovers_left > 0 => State::Failover {
                        failed: chain,
                        error,
                        failovers_left,
                    },
                    Err(error) => State::GiveUp(error),
                },
                State::Failover {
                    failed,
                    error,
                    failovers_left,
                } => {
                    tracing::warn!(
                        "{} failed on {}: {} - looking for another endpoint",
                        token.symbol,
                        redact_url(failed.url()),
                        error
                    );
                    match self.pool.acquire_replacement(failed.url(), busy).await {
                        Some(chain) => {
                            serving = chain.clone();
                            State::Attempt {
                                chain,
                                failovers_left: failovers_left - 1,
                            }
                        }
                        None => State::GiveUp(error),
                    }
                }
                State::Success(record) => break Ok(record),
                State::GiveUp(error) => break Err(error),
            };
        };

        Computation {
            result,
            endpoint: serving,
        }
    }

    /// One full computation on a single endpoint
    async fn attempt(&self, token: &Token, chain: &dyn ChainReader) -> Result<BurnRecord> {
        tracing::info!(
            "Calculating burns for {} on {}",
            token.symbol,
            redact_url(chain.url())
        );

        let latest = self.latest_block(chain).await?;

        let decimals = self
            .retrier
            .execute("decimals", || chain.decimals(token.address))
            .await
            .map_err(|e| RpcError::DecimalsUnavailable(format!("{}: {}", token.symbol, e)))?;
        tokio::time::sleep(self.call_delay).await;

        let mut starts = Vec::with_capacity(BurnWindow::ALL.len());
        for window in BurnWindow::ALL {
            let target = latest.timestamp.saturating_sub(window.seconds());
            let start = self.resolver.resolve(chain, target, latest.number).await?;
            starts.push((window, start));
            tokio::time::sleep(self.call_delay).await;
        }

        let mut record = BurnRecord::empty(token.address, Utc::now(), self.next_update_in);
        for (window, start) in starts {
            let raw = self
                .aggregator
                .sum_burns(chain, token.address, &self.burn_addresses, start, latest.number)
                .await;
            record.set(window, scale_amount(raw, decimals));
            tokio::time::sleep(self.call_delay * 2).await;
        }

        let now = Utc::now();
        record.last_updated = now;
        record.next_update = now + self.next_update_in;

        tracing::info!(
            "{}: 5min={} 1h={} 24h={} (head {})",
            token.symbol,
            record.burn_5min,
            record.burn_1h,
            record.burn_24h,
            latest.number
        );
        Ok(record)
    }

    /// Head block with its timestamp, stepping back one block if the head
    /// is not yet readable
    async fn latest_block(&self, chain: &dyn ChainReader) -> Result<BlockRef> {
        let head = self
            .retrier
            .execute("getBlockNumber", || chain.block_number())
            .await?;
        tokio::time::sleep(self.call_delay).await;

        let head_block = self.retrier.execute("getBlock", || chain.block(head)).await;
        tokio::time::sleep(self.call_delay).await;
        match head_block {
            Ok(Some(block)) => return Ok(block),
            Ok(None) => tracing::debug!("Head block {} not available yet", head),
            Err(e) => tracing::debug!("Head block {} unreadable: {}", head, e),
        }

        let previous = head.saturating_sub(1).max(1);
        let block = self
            .retrier
            .execute("getBlock", || chain.block(previous))
            .await?;
        tokio::time::sleep(self.call_delay).await;
        block.ok_or_else(|| RpcError::MissingField(format!("block {}", previous)).into())
    }
}
