// ABOUTME: HTTP client for the Notion API
// ABOUTME: Queries database pages with cursors, creates and patches pages, reads the schema

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;

use super::models::{error_message, CreatedPage, DatabaseObject, QueryRequest, QueryResponse};
use super::properties::{create_properties, parse_page, update_properties};
use crate::config::{NotionConfig, PropertyMapping, RetryPolicy, NOTION_API_VERSION};
use crate::error::{Result, SyncError};
use crate::model::{AppId, AttributePatch, PageArtwork, StoredAttributes};
use crate::sync::{PageBatch, PageSink};
use crate::utils::{parse_retry_after, retry_with_backoff};

const SERVICE: &str = "notion";

/// Notion API client bound to one database.
pub struct NotionClient {
    client: Client,
    api_base_url: String,
    api_key: String,
    database_id: String,
    properties: PropertyMapping,
    retry: RetryPolicy,
}

impl NotionClient {
    pub fn new(config: NotionConfig, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            database_id: config.database_id,
            properties: config.properties,
            retry,
        })
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn properties(&self) -> &PropertyMapping {
        &self.properties
    }

    /// Send one request and decode the JSON response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let mut request = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Notion-Version", NOTION_API_VERSION);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SyncError::from_transport(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after =
                parse_retry_after(response.headers().get(reqwest::header::RETRY_AFTER));
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::from_status(
                SERVICE,
                status,
                error_message(&body),
                retry_after,
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| SyncError::from_transport(SERVICE, e))?;

        serde_json::from_str(&text).map_err(|e| SyncError::Format {
            service: SERVICE,
            message: e.to_string(),
        })
    }

    /// `send_json` wrapped in the retry policy.
    async fn call<T: DeserializeOwned>(
        &self,
        label: &str,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let method = &method;
        retry_with_backoff(label, &self.retry, || async move {
            self.send_json(method.clone(), url, body).await
        })
        .await
    }

    /// Retrieve the database object, including its property schema.
    pub async fn retrieve_database(&self) -> Result<DatabaseObject> {
        let url = format!("{}/v1/databases/{}", self.api_base_url, self.database_id);
        self.call("Retrieving Notion database", Method::GET, &url, None)
            .await
    }

    /// Run one database query.
    pub async fn query_database(&self, request: &QueryRequest) -> Result<QueryResponse> {
        let url = format!(
            "{}/v1/databases/{}/query",
            self.api_base_url, self.database_id
        );
        let body = serde_json::to_value(request).map_err(|e| SyncError::Format {
            service: SERVICE,
            message: e.to_string(),
        })?;
        self.call("Querying Notion database", Method::POST, &url, Some(&body))
            .await
    }

    /// Id of a live page holding `external_id`, if one exists. Not retried.
    async fn find_page_id(&self, external_id: AppId) -> Result<Option<String>> {
        let url = format!(
            "{}/v1/databases/{}/query",
            self.api_base_url, self.database_id
        );
        let body = json!({
            "page_size": 1,
            "filter": { "property": self.properties.app_id, "number": { "equals": external_id } },
        });
        let response: QueryResponse = self.send_json(Method::POST, &url, Some(&body)).await?;
        Ok(response
            .results
            .into_iter()
            .find(|page| !page.archived)
            .map(|page| page.id))
    }
}

#[async_trait]
impl PageSink for NotionClient {
    async fn query_pages(&self, start_cursor: Option<&str>, page_size: usize) -> Result<PageBatch> {
        let request = QueryRequest {
            page_size,
            start_cursor: start_cursor.map(str::to_string),
            filter: None,
        };
        let response = self.query_database(&request).await?;

        let mut batch = PageBatch::default();
        for page in response.results.iter().filter(|p| !p.archived) {
            match parse_page(&self.properties, page) {
                Some(sink_page) => batch.pages.push(sink_page),
                None => {
                    tracing::debug!("Page {} has no {} value", page.id, self.properties.app_id);
                    batch.unkeyed += 1;
                }
            }
        }
        batch.next_cursor = if response.has_more {
            response.next_cursor
        } else {
            None
        };

        Ok(batch)
    }

    async fn create_page(
        &self,
        external_id: AppId,
        attributes: &StoredAttributes,
        artwork: &PageArtwork,
    ) -> Result<String> {
        let url = format!("{}/v1/pages", self.api_base_url);
        let properties = create_properties(&self.properties, external_id, attributes, Utc::now());

        let mut body = json!({
            "parent": { "type": "database_id", "database_id": self.database_id },
            "properties": properties,
            "cover": { "type": "external", "external": { "url": artwork.cover_url } },
        });
        if let Some(ref icon_url) = artwork.icon_url {
            body["icon"] = json!({ "type": "external", "external": { "url": icon_url } });
        }

        // A create that timed out may still have been stored, so every retry
        // first looks the page up by external id.
        let (url, body) = (&url, &body);
        let mut attempts = 0u32;
        retry_with_backoff("Creating Notion page", &self.retry, || {
            attempts += 1;
            let retrying = attempts > 1;
            async move {
                if retrying {
                    if let Some(page_id) = self.find_page_id(external_id).await? {
                        tracing::info!(
                            "Page for {} was stored by an earlier attempt ({})",
                            external_id,
                            page_id
                        );
                        return Ok(page_id);
                    }
                }
                let created: CreatedPage = self.send_json(Method::POST, url, Some(body)).await?;
                Ok::<_, SyncError>(created.id)
            }
        })
        .await
    }

    async fn update_page(&self, page_id: &str, changes: &AttributePatch) -> Result<()> {
        let url = format!("{}/v1/pages/{}", self.api_base_url, page_id);
        let body = json!({
            "properties": update_properties(&self.properties, changes, Utc::now()),
        });

        let _: Value = self
            .call("Updating Notion page", Method::PATCH, &url, Some(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_NOTION_API_URL;

    #[test]
    fn test_client_creation() {
        let config = NotionConfig::new("secret_test".to_string(), "db-id".to_string());
        let client = NotionClient::new(config, RetryPolicy::default()).unwrap();
        assert_eq!(client.api_base_url(), DEFAULT_NOTION_API_URL);
        assert_eq!(client.database_id(), "db-id");
        assert_eq!(client.properties().app_id, "App ID");
    }

    #[test]
    fn test_client_custom_url() {
        let mut config = NotionConfig::new("secret_test".to_string(), "db-id".to_string());
        config.api_base_url = "https://notion.internal.example/".to_string();
        let client = NotionClient::new(config, RetryPolicy::default()).unwrap();
        assert_eq!(client.api_base_url(), "https://notion.internal.example");
    }
}
