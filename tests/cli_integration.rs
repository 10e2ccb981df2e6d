//! CLI integration tests
//!
//! Tests the burn-tracker binary end-to-end for offline commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn burn_tracker() -> Command {
    Command::cargo_bin("burn-tracker").unwrap()
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

const SMALL_CONFIG: &str = r#"
[tokens]
PHT = "0x885c99a787BE6b41cbf964174C771A9f7ec48e04"
WKC = "0x6Ec90334d89dBdc89E08A133271be3d104128Edb"

[[endpoints]]
url = "http://127.0.0.1:1"
"#;

// ==================== Basic CLI tests ====================

#[test]
fn test_version() {
    burn_tracker()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("burn-tracker"));
}

#[test]
fn test_help() {
    burn_tracker()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("burn tracker"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("endpoints"));
}

#[test]
fn test_serve_help() {
    burn_tracker()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"))
        .stdout(predicate::str::contains("--ephemeral"));
}

#[test]
fn test_unknown_subcommand() {
    burn_tracker().arg("frobnicate").assert().failure();
}

// ==================== Offline listings ====================

#[test]
fn test_windows() {
    burn_tracker()
        .arg("windows")
        .assert()
        .success()
        .stdout(predicate::str::contains("5min"))
        .stdout(predicate::str::contains("86400s"))
        .stdout(predicate::str::contains("burn24h"));
}

#[test]
fn test_tokens_from_config() {
    let file = config_file(SMALL_CONFIG);
    burn_tracker()
        .args(["--config", file.path().to_str().unwrap(), "tokens"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TRACKED TOKENS (2)"))
        .stdout(predicate::str::contains("pht"))
        .stdout(predicate::str::contains("0x885c99a787BE6b41cbf964174C771A9f7ec48e04"));
}

#[test]
fn test_endpoints_list_from_config() {
    let file = config_file(SMALL_CONFIG);
    burn_tracker()
        .args(["--config", file.path().to_str().unwrap(), "endpoints", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 configured"))
        .stdout(predicate::str::contains("http://127.0.0.1:1"));
}

#[test]
fn test_endpoints_list_hides_keys() {
    let file = config_file(
        r#"
[[endpoints]]
url = "https://bsc-mainnet.infura.io/v3/topsecretkey"
tier = "fallback"
"#,
    );
    burn_tracker()
        .args(["--config", file.path().to_str().unwrap(), "endpoints", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://bsc-mainnet.infura.io/"))
        .stdout(predicate::str::contains("topsecretkey").not());
}

#[test]
fn test_invalid_token_address_rejected() {
    let file = config_file(
        r#"
[tokens]
bad = "0x1234"
"#,
    );
    burn_tracker()
        .args(["--config", file.path().to_str().unwrap(), "tokens"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid address"));
}

#[test]
fn test_unknown_token_rejected_before_network() {
    let file = config_file(SMALL_CONFIG);
    burn_tracker()
        .args(["--config", file.path().to_str().unwrap(), "token", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown token"));
}

// ==================== Config commands ====================

#[test]
fn test_config_path() {
    burn_tracker()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_show_explicit() {
    let file = config_file(SMALL_CONFIG);
    burn_tracker()
        .args(["--config", file.path().to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[tokens]"));
}
