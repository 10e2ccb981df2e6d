//! Offline listings of tokens and windows

use burn_tracker::{BurnWindow, Config};

pub fn list_tokens(config: &Config) {
    println!("TRACKED TOKENS ({})\n", config.tokens.len());
    for token in config.tokens.tokens() {
        println!("  {:<15} {}", token.symbol, token.address.to_checksum(None));
    }
}

pub fn list_windows() {
    println!("BURN WINDOWS\n");
    for window in BurnWindow::ALL {
        println!(
            "  {:<6} {:>6}s  ({})",
            window.label(),
            window.seconds(),
            window.record_key()
        );
    }
}
