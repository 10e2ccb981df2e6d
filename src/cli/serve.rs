//! HTTP server with the scheduled burn job

use burn_tracker::server::{self, AppState};
use burn_tracker::{
    BurnStore, Config, FleetProcessor, JobRunner, JsonFileStore, MemoryStore, Scheduler,
};
use clap::Args;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Args)]
pub struct ServeArgs {
    /// Listen address (default from config, PORT env overrides the port)
    #[arg(long)]
    pub bind: Option<SocketAddr>,

    /// Keep records in memory only
    #[arg(long)]
    pub ephemeral: bool,

    /// Serve only; never run the job on a schedule
    #[arg(long)]
    pub no_schedule: bool,
}

/// Bind address from flag, config and the `PORT` variable
fn bind_address(args: &ServeArgs, config: &Config) -> anyhow::Result<SocketAddr> {
    if let Some(addr) = args.bind {
        return Ok(addr);
    }

    let mut addr: SocketAddr = config
        .server
        .bind
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address '{}': {}", config.server.bind, e))?;

    if let Ok(port) = std::env::var("PORT") {
        let port: u16 = port
            .parse()
            .map_err(|_| anyhow::anyhow!("Invalid PORT value '{}'", port))?;
        addr.set_port(port);
    }
    Ok(addr)
}

pub async fn handle(args: &ServeArgs, config: &Config) -> anyhow::Result<()> {
    let addr = bind_address(args, config)?;

    let store: Arc<dyn BurnStore> = if args.ephemeral {
        tracing::info!("Using in-memory store");
        Arc::new(MemoryStore::new())
    } else {
        let store = JsonFileStore::open(&config.store_dir).await?;
        tracing::info!("Using store directory {}", store.dir().display());
        Arc::new(store)
    };

    let fleet = FleetProcessor::from_config(config, store.clone())?;
    let symbols = config.tokens.tokens().into_iter().map(|t| t.symbol).collect();
    let runner = Arc::new(JobRunner::new(fleet, symbols));

    if !args.no_schedule {
        Scheduler::new(runner.clone(), config.schedule.clone()).spawn();
    }

    let state = AppState {
        runner,
        store,
        tokens: Arc::new(config.tokens.clone()),
    };

    tokio::select! {
        result = server::serve(addr, state) => result?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    Ok(())
}
