//! Engine-wide tuning knobs.
//!
//! `EngineConfig` is shared read-only between the dispatcher and its
//! workers; nothing here is mutated once a batch starts.

use std::time::Duration;

use crate::retry::RetryPolicy;

/// Default ceiling on concurrently active workers.
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;
/// Default per-request timeout covering the whole round-trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default retry budget beyond the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default connection timeout applied when establishing HTTP connections.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default cap on materialised response bodies.
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024; // 10 MiB
/// Default base delay for exponential backoff retries.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
/// Default maximum delay for exponential backoff retries.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(1_000);

/// Configuration object describing how a batch is executed.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Upper bound on concurrently active workers.
    pub max_concurrency: usize,
    /// Request timeout applied when a descriptor carries no override.
    pub default_timeout: Duration,
    /// Retry budget applied when a descriptor carries no override.
    pub default_max_retries: u32,
    /// Timeout for establishing connections.
    pub connect_timeout: Duration,
    /// Maximum response body size a worker will materialise.
    pub max_body_bytes: usize,
    /// Whether 5xx and 429 responses are retried with backoff.
    pub retry_server_errors: bool,
    /// Base delay of the exponential backoff schedule.
    pub base_delay: Duration,
    /// Delay cap of the exponential backoff schedule.
    pub max_delay: Duration,
    /// Whether backoff delays carry random jitter.
    pub jitter: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            default_timeout: DEFAULT_TIMEOUT,
            default_max_retries: DEFAULT_MAX_RETRIES,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            retry_server_errors: true,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: false,
        }
    }
}

impl EngineConfig {
    /// Retry policy derived from the engine defaults.
    ///
    /// Per-request `max_retries` overrides replace the attempt budget, never
    /// the backoff shape.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.default_max_retries.saturating_add(1),
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            jitter: self.jitter,
        }
    }
}
