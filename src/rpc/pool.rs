//! Provider pool with tiered, on-demand health checks

use crate::config::{redact_url, EndpointConfig, Settings, Tier};
use crate::error::{Result, RpcError};
use crate::rpc::{ChainReader, Endpoint};
use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Outcome of the most recent liveness probe for one endpoint
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeRecord {
    /// `None` until the endpoint has been probed once
    pub healthy: Option<bool>,
    pub last_block: Option<u64>,
    pub latency_ms: Option<u64>,
    pub last_error: Option<String>,
}

/// Health snapshot for reporting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStatus {
    pub url: String,
    pub tier: Tier,
    #[serde(flatten)]
    pub probe: ProbeRecord,
}

struct PoolMember {
    reader: Arc<dyn ChainReader>,
    tier: Tier,
    probe: Mutex<ProbeRecord>,
    /// Serializes probes of this endpoint
    probe_lock: tokio::sync::Mutex<()>,
}

impl PoolMember {
    async fn probe(&self, timeout: Duration) -> Option<Duration> {
        let _guard = self.probe_lock.lock().await;
        let start = Instant::now();

        let outcome = match tokio::time::timeout(timeout, self.reader.block_number()).await {
            Ok(Ok(block)) => Ok(block),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("probe timed out after {}s", timeout.as_secs())),
        };
        let latency = start.elapsed();

        let mut record = self.probe.lock().unwrap_or_else(|e| e.into_inner());
        match outcome {
            Ok(block) => {
                tracing::debug!(
                    "Probe ok: {} at block {} ({}ms)",
                    redact_url(self.reader.url()),
                    block,
                    latency.as_millis()
                );
                *record = ProbeRecord {
                    healthy: Some(true),
                    last_block: Some(block),
                    latency_ms: Some(latency.as_millis() as u64),
                    last_error: None,
                };
                Some(latency)
            }
            Err(e) => {
                tracing::warn!("Probe failed: {}: {}", redact_url(self.reader.url()), e);
                record.healthy = Some(false);
                record.last_error = Some(e);
                None
            }
        }
    }
}

/// Pool of RPC endpoints split into primary and fallback tiers
pub struct ProviderPool {
    members: Vec<PoolMember>,
    probe_timeout: Duration,
}

impl ProviderPool {
    /// Build a pool over arbitrary chain readers
    pub fn new(readers: Vec<(Arc<dyn ChainReader>, Tier)>, probe_timeout: Duration) -> Self {
        let members = readers
            .into_iter()
            .map(|(reader, tier)| PoolMember {
                reader,
                tier,
                probe: Mutex::new(ProbeRecord::default()),
                probe_lock: tokio::sync::Mutex::new(()),
            })
            .collect();

        Self {
            members,
            probe_timeout,
        }
    }

    /// Build a pool of HTTP endpoints from configuration
    pub fn from_configs(configs: &[EndpointConfig], settings: &Settings) -> Result<Self> {
        let mut readers: Vec<(Arc<dyn ChainReader>, Tier)> = Vec::new();

        for cfg in configs.iter().filter(|c| c.enabled) {
            match Endpoint::new(cfg.clone(), settings.timeout_seconds) {
                Ok(ep) => readers.push((Arc::new(ep), cfg.tier)),
                Err(e) => {
                    tracing::warn!("Failed to create endpoint {}: {}", cfg.display_url(), e);
                }
            }
        }

        if readers.is_empty() {
            return Err(RpcError::NoHealthyEndpoints.into());
        }

        Ok(Self::new(readers, settings.probe_timeout()))
    }

    /// Get number of configured endpoints
    pub fn endpoint_count(&self) -> usize {
        self.members.len()
    }

    /// Probe primaries, then fallbacks in order until `required` are healthy.
    ///
    /// Returns healthy primaries ordered by probe latency followed by healthy
    /// fallbacks in configuration order. May return fewer than `required`;
    /// fails only when nothing is reachable.
    pub async fn acquire_healthy(&self, required: usize) -> Result<Vec<Arc<dyn ChainReader>>> {
        let primaries: Vec<&PoolMember> = self
            .members
            .iter()
            .filter(|m| m.tier == Tier::Primary)
            .collect();

        let probes = join_all(primaries.iter().map(|m| m.probe(self.probe_timeout))).await;

        let mut healthy: Vec<(Duration, &PoolMember)> = primaries
            .into_iter()
            .zip(probes)
            .filter_map(|(m, latency)| latency.map(|l| (l, m)))
            .collect();
        healthy.sort_by_key(|(latency, _)| *latency);

        let mut selected: Vec<Arc<dyn ChainReader>> =
            healthy.into_iter().map(|(_, m)| m.reader.clone()).collect();

        if selected.len() < required {
            for member in self.members.iter().filter(|m| m.tier == Tier::Fallback) {
                if selected.len() >= required {
                    break;
                }
                if member.probe(self.probe_timeout).await.is_some() {
                    selected.push(member.reader.clone());
                }
            }
        }

        if selected.is_empty() {
            return Err(RpcError::NoHealthyEndpoints.into());
        }

        tracing::info!(
            "Acquired {} healthy endpoint(s) (wanted {})",
            selected.len(),
            required
        );
        Ok(selected)
    }

    /// First reachable endpoint other than `failed_url`.
    ///
    /// Endpoints whose URL is not in `busy` are tried first, primaries before
    /// fallbacks. A busy endpoint is only handed out when nothing idle is
    /// reachable.
    pub async fn acquire_replacement(
        &self,
        failed_url: &str,
        busy: &[String],
    ) -> Option<Arc<dyn ChainReader>> {
        let (idle, shared): (Vec<&PoolMember>, Vec<&PoolMember>) = self
            .members
            .iter()
            .filter(|m| m.tier == Tier::Primary)
            .chain(self.members.iter().filter(|m| m.tier == Tier::Fallback))
            .filter(|m| m.reader.url() != failed_url)
            .partition(|m| !busy.iter().any(|url| url == m.reader.url()));

        for member in idle {
            if member.probe(self.probe_timeout).await.is_some() {
                return Some(member.reader.clone());
            }
        }
        for member in shared {
            if member.probe(self.probe_timeout).await.is_some() {
                tracing::warn!(
                    "No idle endpoint left, sharing {}",
                    redact_url(member.reader.url())
                );
                return Some(member.reader.clone());
            }
        }
        None
    }

    /// Latest probe results for every endpoint
    pub fn health(&self) -> Vec<EndpointStatus> {
        self.members
            .iter()
            .map(|m| EndpointStatus {
                url: redact_url(m.reader.url()),
                tier: m.tier,
                probe: m.probe.lock().unwrap_or_else(|e| e.into_inner()).clone(),
            })
            .collect()
    }

    /// Probe every endpoint regardless of tier
    pub async fn probe_all(&self) -> Vec<EndpointStatus> {
        join_all(self.members.iter().map(|m| m.probe(self.probe_timeout))).await;
        self.health()
    }
}
