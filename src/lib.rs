// ABOUTME: Library root for steam-notion-sync
// ABOUTME: Exposes the Steam source, Notion sink, sync engine and CLI commands

pub mod commands;
pub mod config;
pub mod error;
pub mod model;
pub mod notion;
pub mod steam;
pub mod sync;
pub mod utils;

pub use config::{SyncConfig, SyncOptions};
pub use error::{Result, SyncError};
