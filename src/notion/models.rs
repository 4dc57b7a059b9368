// ABOUTME: Wire types for the Notion API (version 2022-06-28)
// ABOUTME: Database query, page objects, database schema and error bodies

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /v1/databases/{id}/query`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest {
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<PageObject>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database row. Property values stay untyped; their shape depends on the
/// property type declared by the database schema.
#[derive(Debug, Clone, Deserialize)]
pub struct PageObject {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Response of `POST /v1/pages`; only the id is needed.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPage {
    pub id: String,
}

/// Response of `GET /v1/databases/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseObject {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    pub properties: Map<String, Value>,
}

impl DatabaseObject {
    pub fn title_text(&self) -> String {
        self.title.iter().map(|t| t.plain_text.as_str()).collect()
    }

    /// Declared type of a property, e.g. `"number"`.
    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

/// Error body returned with non-success statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Condense an error body to `code: message`, falling back to the raw text.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) if !err.message.is_empty() => format!("{}: {}", err.code, err.message),
        _ => body.to_string(),
    }
}
