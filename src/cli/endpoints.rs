//! RPC endpoint management commands

use burn_tracker::{Config, ProviderPool, Tier};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum EndpointCommands {
    /// List configured endpoints by tier
    List,

    /// Probe every endpoint and report its head block
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn handle(action: &EndpointCommands, config: &Config) -> anyhow::Result<()> {
    match action {
        EndpointCommands::List => {
            println!("RPC ENDPOINTS ({} configured)\n", config.endpoints.len());

            for tier in [Tier::Primary, Tier::Fallback] {
                let eps: Vec<_> = config.endpoints.iter().filter(|e| e.tier == tier).collect();
                if eps.is_empty() {
                    continue;
                }
                println!("{}:", tier);
                for ep in eps {
                    println!(
                        "  {}{}",
                        ep.display_url(),
                        ep.note
                            .as_ref()
                            .map(|n| format!(" ({})", n))
                            .unwrap_or_default()
                    );
                }
                println!();
            }
        }

        EndpointCommands::Check { json } => {
            let pool = ProviderPool::from_configs(&config.endpoints, &config.settings)?;
            let statuses = pool.probe_all().await;

            if *json {
                println!("{}", serde_json::to_string_pretty(&statuses)?);
                return Ok(());
            }

            for status in &statuses {
                let mark = match status.probe.healthy {
                    Some(true) => "✓",
                    _ => "✗",
                };
                let detail = match (&status.probe.last_block, &status.probe.last_error) {
                    (Some(block), _) if status.probe.healthy == Some(true) => format!(
                        "block {} ({}ms)",
                        block,
                        status.probe.latency_ms.unwrap_or_default()
                    ),
                    (_, Some(err)) => err.clone(),
                    _ => "unreachable".to_string(),
                };
                println!(
                    "{} [{:<8}] {:<45} {}",
                    mark,
                    status.tier.to_string(),
                    status.url,
                    detail
                );
            }

            let healthy = statuses
                .iter()
                .filter(|s| s.probe.healthy == Some(true))
                .count();
            println!("\n{}/{} endpoints reachable", healthy, statuses.len());
        }
    }

    Ok(())
}
