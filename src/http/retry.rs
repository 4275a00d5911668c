//! Retry policy and HTTP status classification shared by the registry and
//! repository clients.

use reqwest::StatusCode;
use std::fmt;

/// Attempts per request, the first one included.
pub const MAX_RETRIES: usize = 3;

pub const RETRY_DELAY_MS: u64 = 1000;

/// A failed request that will fail the same way if repeated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonRetryableError {
    /// 401
    AuthenticationFailed(String),
    /// 403 mentioning a rate limit, or 429
    RateLimitExceeded(String),
    /// 403 otherwise
    Forbidden(String),
    /// 404
    NotFound(String),
    /// Any other 4xx
    ClientError(u16, String),
}

impl fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonRetryableError::AuthenticationFailed(url) => write!(
                f,
                "Authentication failed for {}. Check the configured credentials.",
                url
            ),
            NonRetryableError::RateLimitExceeded(url) => write!(
                f,
                "Rate limit exceeded for {}. Try again later or configure an access token.",
                url
            ),
            NonRetryableError::Forbidden(url) => write!(f, "Access forbidden: {}", url),
            NonRetryableError::NotFound(url) => write!(f, "Not found: {}", url),
            NonRetryableError::ClientError(status, url) => {
                write!(f, "Request to {} failed with HTTP {}", url, status)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// `Some` when a response with `status` is not worth repeating.
///
/// `message` is whatever text accompanied the failure; a 403 is only
/// treated as a rate limit when it says so.
pub fn classify_status(status: StatusCode, url: &str, message: &str) -> Option<NonRetryableError> {
    let url = url.to_string();
    match status {
        StatusCode::UNAUTHORIZED => Some(NonRetryableError::AuthenticationFailed(url)),
        StatusCode::FORBIDDEN if message.to_lowercase().contains("rate limit") => {
            Some(NonRetryableError::RateLimitExceeded(url))
        }
        StatusCode::FORBIDDEN => Some(NonRetryableError::Forbidden(url)),
        StatusCode::TOO_MANY_REQUESTS => Some(NonRetryableError::RateLimitExceeded(url)),
        StatusCode::NOT_FOUND => Some(NonRetryableError::NotFound(url)),
        s if s.is_client_error() => Some(NonRetryableError::ClientError(s.as_u16(), url)),
        _ => None,
    }
}

/// Map an `error_for_status()` failure into the error the retry loop sees.
/// Server errors and transport failures stay as `reqwest::Error`.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    let classified = error.status().and_then(|status| {
        let url = error.url().map(|u| u.as_str()).unwrap_or_default();
        classify_status(status, url, &error.to_string())
    });
    match classified {
        Some(non_retryable) => anyhow::Error::from(non_retryable),
        None => anyhow::Error::from(error),
    }
}
