// ABOUTME: Notion database sink for game pages
// ABOUTME: Exports the API client, property codec and schema validation

pub mod client;
pub mod models;
pub mod properties;
pub mod schema;

pub use client::NotionClient;
pub use schema::{check_schema, validate_database, SchemaReport};
