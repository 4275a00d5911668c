//! JSON-over-HTTP with optional auth and retry of transient failures.

mod client;
mod retry;

pub use client::{Auth, HttpClient};
pub use retry::{MAX_RETRIES, NonRetryableError, RETRY_DELAY_MS, check_retryable, classify_status};
