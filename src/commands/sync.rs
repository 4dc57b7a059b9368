// ABOUTME: Sync command - validates configuration and the database, then runs one sync cycle
// ABOUTME: Prints the run summary and optionally fails when any record failed

use anyhow::{bail, Result};

use super::with_hint;
use crate::config::SyncConfig;
use crate::notion::{validate_database, NotionClient};
use crate::steam::SteamClient;
use crate::sync::SyncRunner;
use crate::utils::mask_secret;

/// Run one synchronization from Steam into Notion.
///
/// # Arguments
///
/// * `config` - Complete run configuration
/// * `strict` - Return an error when any record failed to write
pub async fn sync(config: SyncConfig, strict: bool) -> Result<()> {
    config.validate().map_err(with_hint)?;

    tracing::debug!("Configuration:");
    tracing::debug!("  STEAM_API_KEY: {}", mask_secret(&config.steam.api_key, 4));
    tracing::debug!("  STEAM_USER_ID: {}", config.steam.user_id);
    tracing::debug!("  NOTION_API_KEY: {}", mask_secret(&config.notion.api_key, 6));
    tracing::debug!("  NOTION_DATABASE_ID: {}", config.notion.database_id);
    tracing::debug!(
        "  include_played_free_games: {}",
        config.steam.include_played_free_games
    );
    tracing::debug!("  include_achievements: {}", config.steam.include_achievements);
    tracing::debug!("  include_store_info: {}", config.steam.include_store_info);
    tracing::debug!("  enable_item_update: {}", config.options.enable_item_update);
    tracing::debug!("  enable_filter: {}", config.options.enable_filter);

    let notion = NotionClient::new(config.notion.clone(), config.retry.clone()).map_err(with_hint)?;
    let steam = SteamClient::new(config.steam.clone(), config.retry.clone()).map_err(with_hint)?;

    tracing::info!("Validating Notion database structure...");
    validate_database(&notion)
        .await
        .and_then(|report| report.into_result())
        .map_err(with_hint)?;

    let report = SyncRunner::new(&steam, &notion, &config.options)
        .run()
        .await
        .map_err(with_hint)?;

    println!("{}", report);

    if strict && !report.is_success() {
        bail!("{} of the planned writes failed", report.failed());
    }
    if !report.is_success() {
        tracing::warn!(
            "{} records failed; they will be retried on the next run",
            report.failed()
        );
    }

    Ok(())
}
