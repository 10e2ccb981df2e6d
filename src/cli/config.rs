//! Configuration management commands

use burn_tracker::ConfigFile;
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show config file path
    Path,

    /// Show current config
    Show,
}

pub fn handle(action: &ConfigCommands, explicit: Option<&Path>) -> anyhow::Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigFile::default_path);

    match action {
        ConfigCommands::Path => {
            println!("{}", path.display());
        }

        ConfigCommands::Show => {
            if path.exists() {
                let content = std::fs::read_to_string(&path)?;
                println!("# {}\n", path.display());
                println!("{}", content);
            } else {
                println!("No config file found at: {}", path.display());
                println!("\nBuilt-in defaults are in effect:");
                println!("  {} endpoints", burn_tracker::default_endpoints().len());
                println!(
                    "  {} tokens",
                    burn_tracker::rpc::defaults::DEFAULT_TOKENS.len()
                );
            }
        }
    }

    Ok(())
}
