// ABOUTME: Error taxonomy shared by the Steam client, the Notion client and the sync engine
// ABOUTME: Classifies failures as fatal, retryable or per-record

use std::time::Duration;
use thiserror::Error;

/// Errors produced while fetching, reconciling or writing game records.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Credential rejected by the remote service. Aborts the run.
    #[error("authentication failed for {service}: {message}")]
    Auth {
        service: &'static str,
        message: String,
    },

    /// Network failure, timeout, rate limit or server-side error.
    #[error("transient error from {service}: {message}")]
    Transient {
        service: &'static str,
        message: String,
        retry_after: Option<Duration>,
    },

    /// Response body did not have the expected shape.
    #[error("unexpected response format from {service}: {message}")]
    Format {
        service: &'static str,
        message: String,
    },

    /// The sink rejected a single record.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Missing or inconsistent configuration, detected before any I/O.
    #[error("configuration error: {0}")]
    Config(String),

    /// Any other non-success status; not retried.
    #[error("{service} returned {status}: {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },
}

impl SyncError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transient { .. })
    }

    /// Server-provided delay hint (e.g. `Retry-After`), if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SyncError::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short label used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Auth { .. } => "auth",
            SyncError::Transient { .. } => "transient",
            SyncError::Format { .. } => "format",
            SyncError::Validation(_) => "validation",
            SyncError::Config(_) => "config",
            SyncError::Api { .. } => "api",
        }
    }

    /// Classify a transport-level reqwest failure (no HTTP status available).
    ///
    /// The request URL is dropped from the message: Steam takes the API key
    /// as a query parameter.
    pub fn from_transport(service: &'static str, err: reqwest::Error) -> Self {
        let is_decode = err.is_decode();
        let message = err.without_url().to_string();
        if is_decode {
            return SyncError::Format { service, message };
        }
        SyncError::Transient {
            service,
            message,
            retry_after: None,
        }
    }

    /// Classify a non-success HTTP status.
    ///
    /// 401/403 are credential problems, 409, 429 and 5xx are retryable, 400 is a
    /// per-record validation failure and everything else is reported as-is.
    pub fn from_status(
        service: &'static str,
        status: reqwest::StatusCode,
        body: String,
        retry_after: Option<Duration>,
    ) -> Self {
        match status.as_u16() {
            401 | 403 => SyncError::Auth {
                service,
                message: format!("{} {}", status, body),
            },
            409 | 429 | 500..=599 => SyncError::Transient {
                service,
                message: format!("{} {}", status, body),
                retry_after,
            },
            400 => SyncError::Validation(body),
            code => SyncError::Api {
                service,
                status: code,
                body,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
