pub mod retry;

pub use retry::{is_http_retryable, retry_with_backoff, retry_with_backoff_until, RetryConfig};
