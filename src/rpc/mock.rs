//! In-memory chain used by unit tests

use crate::burn::{TransferQuery, TRANSFER_TOPIC};
use crate::error::{Error, Result, RpcError};
use crate::rpc::{BlockRef, ChainReader};
use alloy::primitives::{Address, Bytes, LogData, U256};
use alloy::rpc::types::Log;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const BLOCK_TIME: u64 = 3;

/// Build a `Transfer(from, to, value)` log emitted by `token` in `block`
pub fn transfer_log(token: Address, from: Address, to: Address, value: U256, block: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: token,
            data: LogData::new_unchecked(
                vec![TRANSFER_TOPIC, from.into_word(), to.into_word()],
                Bytes::from(value.to_be_bytes::<32>().to_vec()),
            ),
        },
        block_number: Some(block),
        ..Default::default()
    }
}

/// Scripted chain: block `n` has timestamp `GENESIS_TIME + n * BLOCK_TIME`
/// unless overridden, and serves whatever transfer logs were seeded.
pub struct MockChain {
    url: String,
    head: u64,
    timestamps: Option<Vec<u64>>,
    decimals: Option<u8>,
    logs: Vec<Log>,
    missing_blocks: HashSet<u64>,
    failing_burn_addresses: HashSet<Address>,
    down: AtomicBool,
    rate_limits_left: AtomicU32,
    calls: AtomicUsize,
    call_times: Mutex<Vec<Instant>>,
    log_queries: Mutex<Vec<TransferQuery>>,
}

impl MockChain {
    pub fn new(url: &str, head: u64) -> Self {
        Self {
            url: url.to_string(),
            head,
            timestamps: None,
            decimals: Some(18),
            logs: Vec::new(),
            missing_blocks: HashSet::new(),
            failing_burn_addresses: HashSet::new(),
            down: AtomicBool::new(false),
            rate_limits_left: AtomicU32::new(0),
            calls: AtomicUsize::new(0),
            call_times: Mutex::new(Vec::new()),
            log_queries: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with a fatal provider error
    pub fn down(url: &str) -> Self {
        let chain = Self::new(url, 1_000);
        chain.down.store(true, Ordering::SeqCst);
        chain
    }

    /// Explicit timestamps; index 0 is block 1
    pub fn with_timestamps(mut self, timestamps: Vec<u64>) -> Self {
        self.head = timestamps.len() as u64;
        self.timestamps = Some(timestamps);
        self
    }

    pub fn with_decimals(mut self, decimals: Option<u8>) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_log(mut self, log: Log) -> Self {
        self.logs.push(log);
        self
    }

    pub fn with_missing_block(mut self, number: u64) -> Self {
        self.missing_blocks.insert(number);
        self
    }

    pub fn with_failing_burn_address(mut self, address: Address) -> Self {
        self.failing_burn_addresses.insert(address);
        self
    }

    /// The next `count` calls fail with a rate-limit error
    pub fn with_rate_limits(self, count: u32) -> Self {
        self.rate_limits_left.store(count, Ordering::SeqCst);
        self
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// When each call arrived, on the tokio clock
    pub fn call_times(&self) -> Vec<Instant> {
        self.call_times.lock().unwrap().clone()
    }

    pub fn log_queries(&self) -> Vec<TransferQuery> {
        self.log_queries.lock().unwrap().clone()
    }

    pub fn timestamp_of(&self, number: u64) -> u64 {
        match &self.timestamps {
            Some(ts) => ts[(number - 1) as usize],
            None => GENESIS_TIME + number * BLOCK_TIME,
        }
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(Instant::now());
        if self.down.load(Ordering::SeqCst) {
            return Err(RpcError::Provider(format!("{} is down", self.url)).into());
        }
        let limited = self
            .rate_limits_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if limited {
            return Err(RpcError::RateLimited("429 Too Many Requests".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockChain {
    fn url(&self) -> &str {
        &self.url
    }

    async fn block_number(&self) -> Result<u64> {
        self.enter()?;
        Ok(self.head)
    }

    async fn block(&self, number: u64) -> Result<Option<BlockRef>> {
        self.enter()?;
        if number == 0 || number > self.head || self.missing_blocks.contains(&number) {
            return Ok(None);
        }
        Ok(Some(BlockRef {
            number,
            timestamp: self.timestamp_of(number),
        }))
    }

    async fn transfer_logs(&self, query: &TransferQuery) -> Result<Vec<Log>> {
        self.enter()?;
        self.log_queries.lock().unwrap().push(query.clone());
        if self.failing_burn_addresses.contains(&query.burn_address) {
            return Err(Error::from("log query rejected"));
        }

        let burn_topic = query.burn_address.into_word();
        Ok(self
            .logs
            .iter()
            .filter(|log| log.address() == query.token)
            .filter(|log| log.topics().get(2) == Some(&burn_topic))
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                block >= query.from_block && block <= query.to_block
            })
            .cloned()
            .collect())
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        self.enter()?;
        self.decimals
            .ok_or_else(|| RpcError::InvalidResponse(format!("no decimals for {}", token)).into())
    }
}
