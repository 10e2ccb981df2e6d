//! Single-token burn calculation

use burn_tracker::{
    BurnStore, ChainReader, Config, Endpoint, EndpointConfig, JsonFileStore, ProviderPool,
    TokenBurnCalculator,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args)]
pub struct TokenArgs {
    /// Token symbol (case-insensitive)
    pub symbol: String,

    /// Use this RPC endpoint first (configured endpoints remain the failover)
    #[arg(long)]
    pub rpc: Option<String>,

    /// Store the record in the store directory
    #[arg(long)]
    pub save: bool,
}

pub async fn handle(args: &TokenArgs, config: &Config, quiet: bool) -> anyhow::Result<()> {
    let symbol = args.symbol.to_lowercase();
    if config.tokens.get(&symbol).is_none() {
        anyhow::bail!(
            "Unknown token '{}'. Run `burn-tracker tokens` to list tracked tokens",
            args.symbol
        );
    }

    let pool = Arc::new(ProviderPool::from_configs(
        &config.endpoints,
        &config.settings,
    )?);

    let chain: Arc<dyn ChainReader> = match &args.rpc {
        Some(url) => {
            let endpoint = Endpoint::new(EndpointConfig::new(url), config.settings.timeout_seconds)?;
            let (block, latency) = endpoint.probe().await?;
            if !quiet {
                eprintln!(
                    "Connected to {} at block {} ({}ms)",
                    endpoint.config().display_url(),
                    block,
                    latency.as_millis()
                );
            }
            Arc::new(endpoint)
        }
        None => pool
            .acquire_healthy(1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No healthy endpoint available"))?,
    };

    let calculator = TokenBurnCalculator::new(
        Arc::new(config.tokens.clone()),
        Arc::new(config.burn_addresses.clone()),
        pool,
        &config.settings,
    );

    let record = calculator.try_compute(&symbol, chain).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    if args.save {
        let store = JsonFileStore::open(&config.store_dir).await?;
        store.upsert(&symbol, &record).await?;
        if !quiet {
            eprintln!("Saved to {}", store.dir().join(format!("{}.json", symbol)).display());
        }
    }

    Ok(())
}
