//! Transfer log queries and burn summation

use crate::error::Error;
use crate::rpc::{ChainReader, RateLimitedRetrier};
use alloy::primitives::{b256, Address, B256, U256, U512};
use alloy::rpc::types::{Filter, Log};
use std::time::Duration;

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");

/// Transfers of `token` into `burn_address` within an inclusive block range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferQuery {
    pub token: Address,
    pub burn_address: Address,
    pub from_block: u64,
    pub to_block: u64,
}

impl TransferQuery {
    /// `eth_getLogs` filter: topic0 = Transfer, topic1 = any sender,
    /// topic2 = burn address left-padded to 32 bytes
    pub fn filter(&self) -> Filter {
        Filter::new()
            .address(self.token)
            .event_signature(TRANSFER_TOPIC)
            .topic2(self.burn_address.into_word())
            .from_block(self.from_block)
            .to_block(self.to_block)
    }
}

/// Value field of a `Transfer` log, if the log is one
pub fn decode_transfer_value(log: &Log) -> Option<U256> {
    let topics = log.topics();
    if topics.len() != 3 || topics[0] != TRANSFER_TOPIC {
        return None;
    }

    let data = &log.data().data;
    if data.len() < 32 {
        return None;
    }
    Some(U256::from_be_slice(&data[..32]))
}

/// Sums tokens sent to burn addresses over a block range.
///
/// Totals are kept in 512 bits so no realistic number of 256-bit transfers
/// can overflow.
#[derive(Debug, Clone, Copy)]
pub struct BurnLogAggregator {
    retrier: RateLimitedRetrier,
    call_delay: Duration,
}

impl BurnLogAggregator {
    pub fn new(retrier: RateLimitedRetrier, call_delay: Duration) -> Self {
        Self {
            retrier,
            call_delay,
        }
    }

    /// Raw (undecimalized) amount burned in `[from_block, to_block]`.
    ///
    /// A burn address whose query fails even after retries contributes zero.
    pub async fn sum_burns(
        &self,
        chain: &dyn ChainReader,
        token: Address,
        burn_addresses: &[Address],
        from_block: u64,
        to_block: u64,
    ) -> U512 {
        let mut total = U512::ZERO;

        for &burn_address in burn_addresses {
            let query = TransferQuery {
                token,
                burn_address,
                from_block,
                to_block,
            };

            let result = self
                .retrier
                .execute("getLogs", || chain.transfer_logs(&query))
                .await;
            tokio::time::sleep(self.call_delay).await;

            match result {
                Ok(logs) => {
                    let subtotal = sum_transfer_logs(&logs);
                    tracing::debug!(
                        "{} logs to {} for {} in [{}, {}]: {}",
                        logs.len(),
                        burn_address,
                        token,
                        from_block,
                        to_block,
                        subtotal
                    );
                    total += subtotal;
                }
                Err(e) => {
                    log_query_failure(&e, token, burn_address);
                }
            }
        }

        total
    }
}

fn log_query_failure(e: &Error, token: Address, burn_address: Address) {
    tracing::warn!(
        "Log query for {} -> {} failed, counting as zero: {}",
        token,
        burn_address,
        e
    );
}

/// Sum the value field of every decodable `Transfer` log
pub fn sum_transfer_logs(logs: &[Log]) -> U512 {
    logs.iter().fold(U512::ZERO, |acc, log| match decode_transfer_value(log) {
        Some(value) => acc + U512::from(value),
        None => {
            tracing::debug!("Skipping undecodable log in tx {:?}", log.transaction_hash);
            acc
        }
    })
}
