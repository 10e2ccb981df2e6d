//! burn-tracker CLI - Rolling-window token burn tracker

mod cli;

use burn_tracker::Config;
use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = match (cli.quiet, cli.verbose, &cli.command) {
        (true, _, _) => "error",
        (false, 0, Commands::Serve(_)) => "info",
        (false, 0, _) => "warn",
        (false, 1, _) => "info",
        (false, 2, _) => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    // Commands that never touch the network or the token table
    match &cli.command {
        Commands::Config { action } => {
            return cli::config::handle(action, cli.config.as_deref());
        }
        Commands::Windows => {
            cli::info::list_windows();
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Serve(args) => cli::serve::handle(args, &config).await,
        Commands::Run(args) => cli::run::handle(args, &config, cli.quiet).await,
        Commands::Token(args) => cli::token::handle(args, &config, cli.quiet).await,
        Commands::Tokens => {
            cli::info::list_tokens(&config);
            Ok(())
        }
        Commands::Endpoints { action } => cli::endpoints::handle(action, &config).await,
        Commands::Config { .. } | Commands::Windows => Ok(()),
    }
}
