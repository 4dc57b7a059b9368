// ABOUTME: Utility functions shared by the API clients and the CLI
// ABOUTME: Provides retry with bounded backoff and secret masking for logs

use crate::config::RetryPolicy;
use crate::error::Result;
use std::time::Duration;

/// Retry an operation with exponential backoff while it fails transiently
///
/// Only errors for which [`SyncError::is_retryable`](crate::error::SyncError::is_retryable)
/// returns true are retried; anything else is returned immediately. Each retry
/// doubles the delay, capped at `policy.max_delay`. A server-provided
/// `Retry-After` hint takes precedence when it is longer than the computed delay.
///
/// # Arguments
///
/// * `label` - Short description of the operation, used in log lines
/// * `policy` - Retry budget and delay bounds
/// * `operation` - Async function to retry (FnMut returning Future\<Output = Result\<T\>\>)
///
/// # Returns
///
/// Returns the successful result or the last error after all retries exhausted.
pub async fn retry_with_backoff<F, Fut, T>(
    label: &str,
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                attempt += 1;
                let wait = e
                    .retry_after()
                    .map_or(delay, |hint| hint.max(delay))
                    .min(policy.max_delay);
                tracing::warn!(
                    "{} failed (attempt {}/{}): {}, retrying in {:?}...",
                    label,
                    attempt,
                    policy.max_retries + 1,
                    e,
                    wait
                );
                tokio::time::sleep(wait).await;
                delay = (delay * 2).min(policy.max_delay);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Parse an HTTP `Retry-After` header given in seconds.
pub fn parse_retry_after(value: Option<&reqwest::header::HeaderValue>) -> Option<Duration> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Keep the first `visible` characters of a secret for log output.
pub fn mask_secret(secret: &str, visible: usize) -> String {
    let prefix: String = secret.chars().take(visible).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use reqwest::header::HeaderValue;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    fn transient() -> SyncError {
        SyncError::Transient {
            service: "test",
            message: "Temporary failure".to_string(),
            retry_after: None,
        }
    }

    #[tokio::test]
    async fn test_retry_with_backoff_success() {
        let mut attempts = 0;
        let result = retry_with_backoff("op", &fast_policy(5), || {
            attempts += 1;
            let current = attempts;
            async move {
                if current < 3 {
                    Err(transient())
                } else {
                    Ok("Success")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "Success");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_retry_with_backoff_exhausted() {
        let mut attempts = 0;
        let result: Result<&str> = retry_with_backoff("op", &fast_policy(2), || {
            attempts += 1;
            async move { Err(transient()) }
        })
        .await;

        assert!(result.unwrap_err().is_retryable());
        assert_eq!(attempts, 3); // Initial + 2 retries
    }

    #[tokio::test]
    async fn test_retry_skips_fatal_errors() {
        let mut attempts = 0;
        let result: Result<()> = retry_with_backoff("op", &fast_policy(5), || {
            attempts += 1;
            async move {
                Err(SyncError::Auth {
                    service: "test",
                    message: "bad key".to_string(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(SyncError::Auth { .. })));
        assert_eq!(attempts, 1);
    }

    #[test]
    fn test_parse_retry_after() {
        let header = HeaderValue::from_static("2");
        assert_eq!(
            parse_retry_after(Some(&header)),
            Some(Duration::from_secs(2))
        );
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);

        // Out of range or negative values are ignored instead of panicking
        let huge = HeaderValue::from_static("100000000000000000000000");
        assert_eq!(parse_retry_after(Some(&huge)), None);
        let negative = HeaderValue::from_static("-1");
        assert_eq!(parse_retry_after(Some(&negative)), None);
        let fractional = HeaderValue::from_static("0.5");
        assert_eq!(
            parse_retry_after(Some(&fractional)),
            Some(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("secret_abcdef", 6), "secret...");
        assert_eq!(mask_secret("ab", 4), "ab...");
    }
}
