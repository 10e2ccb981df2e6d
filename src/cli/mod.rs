//! CLI command modules
//!
//! Each subcommand has its own module with argument definitions and handlers.

pub mod config;
pub mod endpoints;
pub mod info;
pub mod run;
pub mod serve;
pub mod token;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "burn-tracker")]
#[command(
    version,
    about = "Rolling-window token burn tracker with multi-endpoint RPC failover"
)]
#[command(after_help = r#"EXAMPLES:
    # Serve burn data over HTTP, refreshing every 5 minutes
    burn-tracker serve --bind 0.0.0.0:3000

    # One full run over every configured token
    burn-tracker run --json

    # Compute a single token against a specific RPC
    burn-tracker token PHT --rpc https://bsc-dataseed.bnbchain.org

    # Check which endpoints are reachable
    burn-tracker endpoints check

ENVIRONMENT VARIABLES:
    PORT        Overrides the port of the server bind address
    RUST_LOG    Overrides the log filter

CONFIG FILE:
    Default: ~/.config/burn-tracker/config.toml
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve burn data over HTTP and run the scheduled job
    Serve(serve::ServeArgs),

    /// Run the burn job once over every configured token
    Run(run::RunArgs),

    /// Compute burns for a single token
    Token(token::TokenArgs),

    /// List tracked tokens
    Tokens,

    /// List the burn windows
    Windows,

    /// Manage RPC endpoints
    Endpoints {
        #[command(subcommand)]
        action: endpoints::EndpointCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: config::ConfigCommands,
    },
}
