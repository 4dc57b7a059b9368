// ABOUTME: Command implementations for the CLI
// ABOUTME: Exports the sync and validate commands

pub mod sync;
pub mod validate;

pub use sync::sync;
pub use validate::validate;

use crate::error::SyncError;

/// Extra guidance for errors users commonly hit while setting up.
pub(crate) fn hint(err: &SyncError) -> Option<&'static str> {
    match err {
        SyncError::Auth { service: "notion", .. } => Some(
            "Check NOTION_API_KEY. Integration tokens are created at https://www.notion.so/my-integrations",
        ),
        SyncError::Auth { service: "steam", .. } => Some(
            "Check STEAM_API_KEY. Keys are issued at https://steamcommunity.com/dev/apikey",
        ),
        SyncError::Api {
            service: "notion",
            status: 404,
            ..
        } => Some("Database not found. Verify NOTION_DATABASE_ID and share the database with your integration"),
        SyncError::Format {
            service: "steam", ..
        } => Some("Set the Steam profile's game details to public, and verify STEAM_USER_ID is a 64-bit id"),
        _ => None,
    }
}

/// Wrap a domain error for the binary, attaching a hint when one applies.
pub(crate) fn with_hint(err: SyncError) -> anyhow::Error {
    match hint(&err) {
        Some(h) => anyhow::anyhow!("{}\n{}", err, h),
        None => anyhow::Error::new(err),
    }
}
