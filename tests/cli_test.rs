// ABOUTME: Tests for the steam-notion-sync binary
// ABOUTME: Configuration errors must fail the process before any write is attempted

use std::fs;
use std::process::{Command, Output};
use tempfile::tempdir;

const ENV_VARS: &[&str] = &[
    "STEAM_API_KEY",
    "STEAM_USER_ID",
    "NOTION_API_KEY",
    "NOTION_DATABASE_ID",
    "STEAM_NOTION_SYNC_CONFIG",
    "include_played_free_games",
    "enable_item_update",
    "enable_filter",
    "include_achievements",
    "include_store_info",
    "RUST_LOG",
];

fn run(args: &[&str], env: &[(&str, &str)]) -> Output {
    let bin_path = env!("CARGO_BIN_EXE_steam-notion-sync");
    let mut command = Command::new(bin_path);
    command.args(args);
    for var in ENV_VARS {
        command.env_remove(var);
    }
    for (key, value) in env {
        command.env(key, value);
    }
    command.output().expect("Failed to execute command")
}

#[test]
fn test_sync_without_credentials_fails() {
    let output = run(&["sync"], &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Steam API key is required"));
}

#[test]
fn test_sync_reports_missing_database_id() {
    let output = run(
        &["sync"],
        &[
            ("STEAM_API_KEY", "key"),
            ("STEAM_USER_ID", "76561197960287930"),
            ("NOTION_API_KEY", "secret_x"),
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Notion database id is required"));
}

#[test]
fn test_invalid_boolean_flag_is_rejected() {
    let output = run(&["sync"], &[("enable_filter", "maybe")]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_config_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sync.toml");
    fs::write(&config_path, "[properties]\nnot_a_property = \"x\"\n").unwrap();

    let output = run(&["--config", config_path.to_str().unwrap(), "validate"], &[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config file"));
}

#[test]
fn test_unreachable_notion_fails_before_sync() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("sync.toml");
    fs::write(
        &config_path,
        "notion_api_url = \"http://127.0.0.1:9\"\n\
         steam_api_url = \"http://127.0.0.1:9\"\n\
         [retry]\nmax_retries = 0\n",
    )
    .unwrap();

    let output = run(
        &["--config", config_path.to_str().unwrap(), "sync"],
        &[
            ("STEAM_API_KEY", "key"),
            ("STEAM_USER_ID", "76561197960287930"),
            ("NOTION_API_KEY", "secret_x"),
            ("NOTION_DATABASE_ID", "db"),
        ],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("transient error from notion"));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Sync finished"));
}
