//! Single RPC endpoint and the chain-reading seam the burn engine depends on

use crate::burn::TransferQuery;
use crate::config::EndpointConfig;
use crate::error::{ConfigError, Result, RpcError};
use alloy::eips::BlockNumberOrTag;
use alloy::network::Ethereum;
use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{Log, TransactionRequest};
use alloy::transports::http::Http;
use alloy::transports::{TransportError, TransportErrorKind};
use async_trait::async_trait;
use serde::Serialize;
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::{Duration, Instant};

/// `decimals()` selector
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// A block number and its timestamp (seconds since epoch)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRef {
    pub number: u64,
    pub timestamp: u64,
}

/// Read-only chain queries used by the burn engine
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Endpoint URL (identity for logs and failover)
    fn url(&self) -> &str;

    /// Current chain height
    async fn block_number(&self) -> Result<u64>;

    /// Block header by number; `None` when the node does not have it yet
    async fn block(&self, number: u64) -> Result<Option<BlockRef>>;

    /// `Transfer` logs matching a topic-filtered query
    async fn transfer_logs(&self, query: &TransferQuery) -> Result<Vec<Log>>;

    /// ERC-20 `decimals()`
    async fn decimals(&self, token: Address) -> Result<u8>;
}

/// A JSON-RPC endpoint backed by an alloy HTTP provider
#[derive(Clone)]
pub struct Endpoint {
    config: EndpointConfig,
    provider: RootProvider<Ethereum>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.config.display_url())
            .field("tier", &self.config.tier)
            .finish()
    }
}

impl Endpoint {
    /// Create an endpoint with a per-request timeout
    pub fn new(config: EndpointConfig, timeout_secs: u64) -> Result<Self> {
        let url: reqwest::Url = config
            .url
            .parse()
            .map_err(|_| ConfigError::InvalidUrl(config.display_url()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(RpcError::Http)?;

        let transport = Http::with_client(client, url);
        let provider = RootProvider::new(RpcClient::new(transport, false));

        Ok(Self { config, provider })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Get current block number along with the round-trip latency
    pub async fn probe(&self) -> Result<(u64, Duration)> {
        let start = Instant::now();
        let block = self.block_number().await?;
        Ok((block, start.elapsed()))
    }
}

/// Map an alloy transport failure onto the retry taxonomy
fn classify(err: TransportError) -> RpcError {
    match err {
        TransportError::ErrorResp(payload) => {
            // -32005 is the conventional "limit exceeded" code
            if payload.code == 429 || payload.code == -32005 {
                RpcError::RateLimited(payload.message.to_string())
            } else {
                RpcError::from_message(payload.message.to_string())
            }
        }
        TransportError::NullResp => RpcError::MissingField("result".to_string()),
        TransportError::DeserError { err, .. } => RpcError::InvalidResponse(err.to_string()),
        TransportError::Transport(TransportErrorKind::HttpError(http)) => {
            classify_status(http.status)
        }
        TransportError::Transport(TransportErrorKind::Custom(source)) => classify_source(&*source),
        TransportError::Transport(TransportErrorKind::BackendGone) => {
            RpcError::ConnectionFailed("backend connection task has stopped".to_string())
        }
        other => RpcError::Provider(other.to_string()),
    }
}

fn classify_status(status: u16) -> RpcError {
    let message = format!("HTTP {}", status);
    match status {
        429 => RpcError::RateLimited(message),
        408 => RpcError::Timeout(message),
        500..=599 => RpcError::ConnectionFailed(message),
        _ => RpcError::Provider(message),
    }
}

/// Walk the source chain for a reqwest or IO cause
fn classify_source(err: &(dyn StdError + 'static)) -> RpcError {
    let detail = root_cause(err);

    let mut cause = Some(err);
    while let Some(e) = cause {
        if let Some(req) = e.downcast_ref::<reqwest::Error>() {
            if req.is_timeout() {
                return RpcError::Timeout(detail);
            }
            if let Some(status) = req.status() {
                return classify_status(status.as_u16());
            }
            if req.is_connect() || req.is_request() {
                return RpcError::ConnectionFailed(detail);
            }
        }
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            match io.kind() {
                ErrorKind::TimedOut => return RpcError::Timeout(detail),
                ErrorKind::ConnectionRefused
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof => return RpcError::ConnectionFailed(detail),
                _ => {}
            }
        }
        cause = e.source();
    }

    RpcError::from_message(detail)
}

/// Innermost message of the chain; reqwest's own message carries the full URL
fn root_cause(err: &(dyn StdError + 'static)) -> String {
    let mut current = err;
    while let Some(next) = current.source() {
        current = next;
    }
    match current.downcast_ref::<reqwest::Error>() {
        Some(_) => "request failed".to_string(),
        None => current.to_string(),
    }
}

#[async_trait]
impl ChainReader for Endpoint {
    fn url(&self) -> &str {
        &self.config.url
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| classify(e).into())
    }

    async fn block(&self, number: u64) -> Result<Option<BlockRef>> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Number(number))
            .await
            .map_err(classify)?;

        Ok(block.map(|b| BlockRef {
            number: b.header.number,
            timestamp: b.header.timestamp,
        }))
    }

    async fn transfer_logs(&self, query: &TransferQuery) -> Result<Vec<Log>> {
        let filter = query.filter();
        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| classify(e).into())
    }

    async fn decimals(&self, token: Address) -> Result<u8> {
        let tx = TransactionRequest::default()
            .to(token)
            .input(Bytes::from_static(&DECIMALS_SELECTOR).into());

        let output = self
            .provider
            .call(tx)
            .await
            .map_err(classify)?;

        decode_decimals(&output).ok_or_else(|| {
            RpcError::InvalidResponse(format!("decimals() returned {} for {}", output, token))
                .into()
        })
    }
}

/// `uint8` return word: exactly one 32-byte word whose value fits in `u8`
fn decode_decimals(output: &[u8]) -> Option<u8> {
    if output.len() != 32 || output[..31].iter().any(|b| *b != 0) {
        return None;
    }
    Some(output[31])
}
