//! One-shot fleet run

use burn_tracker::{BurnStore, Config, FleetProcessor, JsonFileStore, MemoryStore};
use clap::Args;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

#[derive(Args)]
pub struct RunArgs {
    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Keep records in memory instead of the store directory
    #[arg(long)]
    pub ephemeral: bool,

    /// Only these tokens (default: all configured)
    #[arg(long = "only", value_delimiter = ',')]
    pub only: Vec<String>,
}

pub async fn handle(args: &RunArgs, config: &Config, quiet: bool) -> anyhow::Result<()> {
    let store: Arc<dyn BurnStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(JsonFileStore::open(&config.store_dir).await?)
    };

    let symbols: Vec<String> = if args.only.is_empty() {
        config.tokens.tokens().into_iter().map(|t| t.symbol).collect()
    } else {
        args.only.iter().map(|s| s.to_lowercase()).collect()
    };

    let fleet = FleetProcessor::from_config(config, store.clone())?;
    if !quiet && !args.json {
        eprintln!(
            "Computing {} tokens over {} endpoints...",
            symbols.len(),
            fleet.pool().endpoint_count()
        );
    }

    let started = Instant::now();
    let results = fleet.run_all(&symbols).await?;
    let elapsed = started.elapsed();

    if args.json {
        let records = store.all().await?;
        let output = json!({
            "results": results,
            "records": records,
            "elapsedSeconds": elapsed.as_secs_f64(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for result in &results {
        match &result.error {
            None => println!("  ✓ {}", result.token_symbol),
            Some(err) => println!("  ✗ {:<15} {}", result.token_symbol, err),
        }
    }

    let succeeded = results.iter().filter(|r| r.success).count();
    println!(
        "\n{}/{} tokens succeeded in {:.1}s",
        succeeded,
        results.len(),
        elapsed.as_secs_f64()
    );
    if !args.ephemeral && !quiet {
        eprintln!("Records saved to {}", config.store_dir.display());
    }

    Ok(())
}
