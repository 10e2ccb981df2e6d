//! Fleet run: spread tokens over healthy endpoints and compute them in parallel

use crate::burn::{BurnRecord, TokenBurnCalculator};
use crate::config::{redact_url, Config};
use crate::error::{Error, Result};
use crate::rpc::{ChainReader, ProviderPool};
use crate::store::BurnStore;
use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Outcome for one token in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRunResult {
    pub token_symbol: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRunResult {
    fn ok(symbol: &str) -> Self {
        Self {
            token_symbol: symbol.to_string(),
            success: true,
            error: None,
        }
    }

    fn failed(symbol: &str, error: &Error) -> Self {
        Self {
            token_symbol: symbol.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Round-robin `items` over `workers` slices: item `i` goes to slice `i % workers`
pub fn distribute<T: Clone>(items: &[T], workers: usize) -> Vec<Vec<T>> {
    if workers == 0 {
        return Vec::new();
    }

    let mut slices = vec![Vec::new(); workers];
    for (i, item) in items.iter().enumerate() {
        slices[i % workers].push(item.clone());
    }
    slices
}

/// Runs `fut` under an optional deadline
async fn with_deadline<T>(
    deadline: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or_else(|_| Err(Error::Deadline(limit.as_secs()))),
        None => fut.await,
    }
}

/// Endpoint URLs currently owned by a worker in this run
#[derive(Debug)]
struct Assignments {
    urls: Mutex<Vec<String>>,
}

impl Assignments {
    fn new(urls: Vec<String>) -> Self {
        Self {
            urls: Mutex::new(urls),
        }
    }

    fn snapshot(&self) -> Vec<String> {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Hand `from`'s slot over to `to`
    fn reassign(&self, from: &str, to: &str) {
        let mut urls = self.urls.lock().unwrap_or_else(|e| e.into_inner());
        urls.retain(|url| url != from);
        urls.push(to.to_string());
    }
}

/// Computes every token once per run, one sequential worker per endpoint
pub struct FleetProcessor {
    pool: Arc<ProviderPool>,
    calculator: Arc<TokenBurnCalculator>,
    store: Arc<dyn BurnStore>,
    concurrency: usize,
    token_delay: Duration,
    token_timeout: Option<Duration>,
}

impl FleetProcessor {
    pub fn new(
        pool: Arc<ProviderPool>,
        calculator: Arc<TokenBurnCalculator>,
        store: Arc<dyn BurnStore>,
        config: &Config,
    ) -> Self {
        Self {
            pool,
            calculator,
            store,
            concurrency: config.settings.concurrency.max(1),
            token_delay: config.settings.token_delay(),
            token_timeout: config.settings.token_timeout(),
        }
    }

    /// Wire pool, calculator and store from configuration
    pub fn from_config(config: &Config, store: Arc<dyn BurnStore>) -> Result<Self> {
        let pool = Arc::new(ProviderPool::from_configs(&config.endpoints, &config.settings)?);
        let calculator = Arc::new(TokenBurnCalculator::new(
            Arc::new(config.tokens.clone()),
            Arc::new(config.burn_addresses.clone()),
            pool.clone(),
            &config.settings,
        ));
        Ok(Self::new(pool, calculator, store, config))
    }

    pub fn pool(&self) -> &Arc<ProviderPool> {
        &self.pool
    }

    /// Compute and persist every token in `tokens`.
    ///
    /// Fails without attempting any token when no endpoint is healthy.
    /// Otherwise returns one result per token, successful or not.
    pub async fn run_all(&self, tokens: &[String]) -> Result<Vec<JobRunResult>> {
        let endpoints = match self.pool.acquire_healthy(self.concurrency).await {
            Ok(endpoints) => endpoints,
            Err(e) => {
                tracing::error!("Burn run aborted, no endpoint reachable: {}", e);
                return Err(e);
            }
        };

        let workers = endpoints.len().min(self.concurrency);
        let slices = distribute(tokens, workers);
        tracing::info!(
            "Processing {} tokens across {} endpoint(s)",
            tokens.len(),
            workers
        );

        let assignments = Assignments::new(
            endpoints
                .iter()
                .take(workers)
                .map(|chain| chain.url().to_string())
                .collect(),
        );
        let runs = endpoints
            .into_iter()
            .zip(slices)
            .enumerate()
            .map(|(worker, (chain, slice))| self.run_worker(worker, chain, slice, &assignments));
        let results: Vec<JobRunResult> = join_all(runs).await.into_iter().flatten().collect();

        let succeeded = results.iter().filter(|r| r.success).count();
        tracing::info!(
            "Burn run finished: {}/{} tokens succeeded",
            succeeded,
            results.len()
        );
        Ok(results)
    }

    /// Process `symbols` in order on one endpoint. After a failover the
    /// worker stays on the replacement for the rest of its slice.
    async fn run_worker(
        &self,
        worker: usize,
        mut chain: Arc<dyn ChainReader>,
        symbols: Vec<String>,
        assignments: &Assignments,
    ) -> Vec<JobRunResult> {
        tracing::debug!(
            "Worker {} on {} takes {:?}",
            worker,
            redact_url(chain.url()),
            symbols
        );

        let mut results = Vec::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.token_delay).await;
            }

            let busy = assignments.snapshot();
            let computed = with_deadline(self.token_timeout, async {
                Ok::<_, Error>(
                    self.calculator
                        .compute_with(symbol, chain.clone(), &busy)
                        .await,
                )
            })
            .await;

            let result = match computed {
                Ok(computation) => {
                    if computation.endpoint.url() != chain.url() {
                        tracing::warn!(
                            "Worker {} drops {} for this run, continuing on {}",
                            worker,
                            redact_url(chain.url()),
                            redact_url(computation.endpoint.url())
                        );
                        assignments.reassign(chain.url(), computation.endpoint.url());
                        chain = computation.endpoint;
                    }
                    computation.result
                }
                Err(e) => Err(e),
            };

            let outcome = match result {
                Ok(record) => self.persist(symbol, &record).await,
                Err(e) => Err(e),
            };

            results.push(match outcome {
                Ok(()) => JobRunResult::ok(symbol),
                Err(e) => {
                    tracing::error!("Worker {}: {} failed: {}", worker, symbol, e);
                    JobRunResult::failed(symbol, &e)
                }
            });
        }
        results
    }

    async fn persist(&self, symbol: &str, record: &BurnRecord) -> Result<()> {
        self.store.upsert(symbol, record).await?;
        tracing::info!("Stored burn data for {}", symbol);
        Ok(())
    }
}

/// Default configuration with every delay zeroed
#[cfg(test)]
pub(crate) fn offline_config() -> Config {
    let mut config = Config::resolve(None).unwrap();
    config.settings = crate::config::Settings::without_delays();
    config
}

/// Fleet over in-memory chains, all registered as primaries
#[cfg(test)]
pub(crate) fn mock_fleet(
    chains: Vec<Arc<crate::rpc::mock::MockChain>>,
    store: Arc<dyn BurnStore>,
    config: Config,
) -> FleetProcessor {
    let tiered = chains
        .into_iter()
        .map(|c| (c, crate::config::Tier::Primary))
        .collect();
    tiered_mock_fleet(tiered, store, config)
}

#[cfg(test)]
pub(crate) fn tiered_mock_fleet(
    chains: Vec<(Arc<crate::rpc::mock::MockChain>, crate::config::Tier)>,
    store: Arc<dyn BurnStore>,
    config: Config,
) -> FleetProcessor {
    let readers = chains
        .into_iter()
        .map(|(c, tier)| (c as Arc<dyn ChainReader>, tier))
        .collect();
    let pool = Arc::new(ProviderPool::new(readers, Duration::from_secs(1)));
    let calculator = Arc::new(TokenBurnCalculator::new(
        Arc::new(config.tokens.clone()),
        Arc::new(config.burn_addresses.clone()),
        pool.clone(),
        &config.settings,
    ));
    FleetProcessor::new(pool, calculator, store, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Tier, TokenTable};
    use crate::error::RpcError;
    use crate::rpc::mock::MockChain;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashSet};
    use tokio::time::Instant;

    /// Memory store that remembers when each record was written
    #[derive(Default)]
    struct TimedStore {
        inner: MemoryStore,
        writes: Mutex<Vec<(String, Instant)>>,
    }

    impl TimedStore {
        fn writes(&self) -> Vec<(String, Instant)> {
            self.writes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BurnStore for TimedStore {
        async fn upsert(&self, symbol: &str, record: &BurnRecord) -> Result<()> {
            self.writes
                .lock()
                .unwrap()
                .push((symbol.to_string(), Instant::now()));
            self.inner.upsert(symbol, record).await
        }

        async fn get(&self, symbol: &str) -> Result<Option<BurnRecord>> {
            self.inner.get(symbol).await
        }

        async fn all(&self) -> Result<BTreeMap<String, BurnRecord>> {
            self.inner.all().await
        }
    }

    fn config() -> Config {
        let mut config = offline_config();
        config.tokens = TokenTable::from_pairs([
            ("aaa", "0x1000000000000000000000000000000000000001"),
            ("bbb", "0x1000000000000000000000000000000000000002"),
            ("ccc", "0x1000000000000000000000000000000000000003"),
            ("ddd", "0x1000000000000000000000000000000000000004"),
            ("eee", "0x1000000000000000000000000000000000000005"),
        ])
        .unwrap();
        config
    }

    fn fleet(chains: Vec<Arc<MockChain>>, store: Arc<MemoryStore>) -> FleetProcessor {
        mock_fleet(chains, store, config())
    }

    fn symbols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_distribute_round_robin() {
        let slices = distribute(&[1, 2, 3, 4, 5, 6, 7], 3);
        assert_eq!(slices, vec![vec![1, 4, 7], vec![2, 5], vec![3, 6]]);
    }

    #[test]
    fn test_distribute_more_workers_than_items() {
        let slices = distribute(&["a"], 3);
        assert_eq!(slices.len(), 3);
        assert_eq!(slices.iter().map(Vec::len).sum::<usize>(), 1);
        assert!(distribute(&["a"], 0).is_empty());
    }

    #[tokio::test]
    async fn test_all_tokens_processed_and_stored() {
        let chains: Vec<_> = (0..3)
            .map(|i| Arc::new(MockChain::new(&format!("https://rpc{}", i), 40_000)))
            .collect();
        let store = Arc::new(MemoryStore::new());
        let fleet = fleet(chains.clone(), store.clone());

        let tokens = symbols(&["aaa", "bbb", "ccc", "ddd", "eee"]);
        let results = fleet.run_all(&tokens).await.unwrap();

        assert_eq!(results.len(), 5);
        assert!(results.iter().all(|r| r.success));
        assert_eq!(store.all().await.unwrap().len(), 5);
        // Every endpoint got a slice
        assert!(chains.iter().all(|c| !c.log_queries().is_empty()));
    }

    #[tokio::test]
    async fn test_two_healthy_of_three() {
        let chains = vec![
            Arc::new(MockChain::new("https://a", 40_000)),
            Arc::new(MockChain::down("https://b")),
            Arc::new(MockChain::new("https://c", 40_000)),
        ];
        let store = Arc::new(MemoryStore::new());
        let fleet = fleet(chains.clone(), store.clone());

        let tokens = symbols(&["aaa", "bbb", "ccc", "ddd"]);
        let results = fleet.run_all(&tokens).await.unwrap();

        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.success));
        assert!(chains[1].log_queries().is_empty());

        let mut seen: Vec<_> = results.iter().map(|r| r.token_symbol.clone()).collect();
        seen.sort();
        assert_eq!(seen, tokens);
    }

    #[tokio::test]
    async fn test_no_healthy_endpoints_fails_run() {
        let chains = vec![
            Arc::new(MockChain::down("https://a")),
            Arc::new(MockChain::down("https://b")),
        ];
        let store = Arc::new(MemoryStore::new());
        let fleet = fleet(chains, store.clone());

        let result = fleet.run_all(&symbols(&["aaa"])).await;
        assert!(matches!(
            result,
            Err(Error::Rpc(RpcError::NoHealthyEndpoints))
        ));
        assert!(store.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_token_does_not_stop_worker() {
        let chains = vec![Arc::new(MockChain::new("https://a", 40_000))];
        let store = Arc::new(MemoryStore::new());
        let fleet = fleet(chains, store.clone());

        let results = fleet
            .run_all(&symbols(&["aaa", "zzz", "bbb"]))
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert!(results[1].error.as_deref().unwrap().contains("zzz"));
        assert!(results[2].success);
        assert_eq!(store.all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_endpoint_dropped_for_rest_of_run() {
        // Passes the health check, then cannot serve decimals()
        let bad = Arc::new(MockChain::new("https://bad", 40_000).with_decimals(None));
        let spare = Arc::new(MockChain::new("https://spare", 40_000));
        let store = Arc::new(MemoryStore::new());
        let mut config = config();
        config.settings.concurrency = 1;
        let fleet = tiered_mock_fleet(
            vec![(bad.clone(), Tier::Primary), (spare.clone(), Tier::Fallback)],
            store.clone(),
            config,
        );

        let results = fleet
            .run_all(&symbols(&["aaa", "bbb", "ccc"]))
            .await
            .unwrap();

        assert!(results.iter().all(|r| r.success));
        assert_eq!(store.all().await.unwrap().len(), 3);
        // Health check, head number, head block, decimals; then never again
        assert_eq!(bad.calls(), 4);
    }

    #[tokio::test]
    async fn test_failover_avoids_endpoints_owned_by_other_workers() {
        let bad = Arc::new(MockChain::new("https://bad", 40_000).with_decimals(None));
        let good = Arc::new(MockChain::new("https://good", 40_000));
        let spare = Arc::new(MockChain::new("https://spare", 40_000));
        let store = Arc::new(MemoryStore::new());
        let mut config = config();
        config.settings.concurrency = 2;
        let fleet = tiered_mock_fleet(
            vec![
                (bad.clone(), Tier::Primary),
                (good.clone(), Tier::Primary),
                (spare.clone(), Tier::Fallback),
            ],
            store.clone(),
            config,
        );

        let results = fleet
            .run_all(&symbols(&["aaa", "bbb", "ccc", "ddd"]))
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.success));

        // The healthy primary only ever served its own two tokens
        let served: HashSet<_> = good.log_queries().iter().map(|q| q.token).collect();
        assert_eq!(served.len(), 2);
        assert!(!spare.log_queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_paced_and_persisted_one_by_one() {
        let mut config = config();
        config.settings.concurrency = 1;
        config.settings.call_delay_ms = 200;
        config.settings.token_delay_ms = 600;
        let call_delay = Duration::from_millis(200);
        let token_delay = Duration::from_millis(600);

        // Virtual time one token takes on its own
        let solo = Arc::new(MockChain::new("https://solo", 40_000));
        let fleet = mock_fleet(vec![solo], Arc::new(MemoryStore::new()), config.clone());
        let start = Instant::now();
        fleet.run_all(&symbols(&["aaa"])).await.unwrap();
        let per_token = start.elapsed();
        // Head number, head block, decimals, eight window starts, eight sums
        // spaced by twice the call delay
        assert!(per_token >= call_delay * 26);

        let chain = Arc::new(MockChain::new("https://a", 40_000));
        let store = Arc::new(TimedStore::default());
        let fleet = mock_fleet(vec![chain.clone()], store.clone(), config);
        let start = Instant::now();
        let results = fleet
            .run_all(&symbols(&["aaa", "bbb", "ccc"]))
            .await
            .unwrap();
        assert!(results.iter().all(|r| r.success));

        // Each record lands as soon as its token finishes
        let writes = store.writes();
        let order: Vec<&str> = writes.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(order, vec!["aaa", "bbb", "ccc"]);
        for (i, (_, at)) in writes.iter().enumerate() {
            let k = i as u32 + 1;
            assert_eq!(*at - start, per_token * k + token_delay * (k - 1));
        }

        // Every call after the health check waits out the call delay
        let times = chain.call_times();
        assert!(times.len() > 3 * 26);
        for pair in times[1..].windows(2) {
            assert!(pair[1] - pair[0] >= call_delay);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cuts_off_hung_token() {
        let hung = std::future::pending::<Result<()>>();
        let result = with_deadline(Some(Duration::from_secs(900)), hung).await;
        assert!(matches!(result, Err(Error::Deadline(900))));

        let quick = with_deadline(None, async { Ok(7) }).await;
        assert_eq!(quick.unwrap(), 7);
    }
}
