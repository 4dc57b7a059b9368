// ABOUTME: Validate command - checks the Notion database against the property mapping
// ABOUTME: Reports missing properties and type mismatches without writing anything

use anyhow::{bail, Result};

use super::with_hint;
use crate::config::{NotionConfig, RetryPolicy};
use crate::error::SyncError;
use crate::notion::{validate_database, NotionClient};

pub async fn validate(notion: NotionConfig, retry: RetryPolicy) -> Result<()> {
    if notion.api_key.trim().is_empty() {
        return Err(with_hint(SyncError::Config(
            "Notion API key is required".to_string(),
        )));
    }
    if notion.database_id.trim().is_empty() {
        return Err(with_hint(SyncError::Config(
            "Notion database id is required".to_string(),
        )));
    }
    notion.properties.validate().map_err(with_hint)?;

    let client = NotionClient::new(notion, retry).map_err(with_hint)?;
    let report = validate_database(&client).await.map_err(with_hint)?;

    if !report.is_valid() {
        bail!(
            "Database '{}' does not match the property mapping: {}",
            report.database_title,
            report
        );
    }

    println!(
        "Database '{}' has every mapped property with the expected type.",
        report.database_title
    );
    Ok(())
}
