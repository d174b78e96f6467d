//! Client and query configuration.
//!
//! [`ClientConfig`] holds the connection-level settings (base URL, request
//! timeout, garbage-collection interval). [`QueryOptions`] controls per-query
//! cache behavior and is chosen by data volatility: inventory levels change by
//! the minute, branch configuration barely changes at all.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use pharma_client::config::{ClientConfig, QueryOptions};
//!
//! let config = ClientConfig::new("https://api.example-pharmacy.com")
//!     .with_request_timeout(Duration::from_secs(15));
//!
//! let options = QueryOptions::volatile(); // 1 minute staleness, aggressive retry
//! assert!(options.stale_time < QueryOptions::settled().stale_time);
//! ```

use std::time::Duration;

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "PHARMA_API_URL";

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(60);

/// Retry behavior for failed query fetches.
///
/// Backoff grows exponentially per attempt and is capped at `max_backoff`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the initial try.
    pub max_retries: u32,
    /// Backoff before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single backoff.
    pub max_backoff: Duration,
    /// Exponential growth factor between attempts.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl RetryPolicy {
    /// Three retries, 1s initial backoff doubling up to 30s.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// Five retries for fast-changing resources where a fresh read matters.
    #[must_use]
    pub const fn aggressive() -> Self {
        Self {
            max_retries: 5,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// No retries; the first failure is surfaced immediately.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_secs(0),
            max_backoff: Duration::from_secs(0),
            multiplier: 1.0,
        }
    }

    /// Backoff duration before retry number `attempt` (zero-based).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_backoff.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(base.min(self.max_backoff.as_secs_f64()))
    }
}

/// Per-query cache policy.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    /// How long fetched data is considered fresh.
    ///
    /// Within this window a read is served from cache without any network
    /// call. Once elapsed, the cached value is still emitted but a refetch is
    /// triggered in the background.
    pub stale_time: Duration,

    /// How long an entry is retained before garbage collection removes it.
    pub gc_time: Duration,

    /// Retry policy applied by the query layer on retryable errors.
    pub retry: RetryPolicy,

    /// Whether the query should run at all.
    ///
    /// A disabled query performs no fetch and reports a disabled state. Used
    /// to guard queries whose required parameters (e.g. a positive id) are
    /// not yet available.
    pub enabled: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(2 * 60),
            gc_time: Duration::from_secs(10 * 60),
            retry: RetryPolicy::standard(),
            enabled: true,
        }
    }
}

impl QueryOptions {
    /// Policy for fast-changing resources (inventory levels, low-stock).
    #[must_use]
    pub const fn volatile() -> Self {
        Self {
            stale_time: Duration::from_secs(60),
            gc_time: Duration::from_secs(5 * 60),
            retry: RetryPolicy::aggressive(),
            enabled: true,
        }
    }

    /// Policy for slow-changing resources (branch configs, supported types).
    #[must_use]
    pub const fn settled() -> Self {
        Self {
            stale_time: Duration::from_secs(10 * 60),
            gc_time: Duration::from_secs(30 * 60),
            retry: RetryPolicy::standard(),
            enabled: true,
        }
    }

    /// Sets whether the query is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Overrides the staleness window.
    #[must_use]
    pub const fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Overrides the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Connection-level configuration for [`QueryClient`](crate::client::QueryClient)
/// and [`Http`](crate::http::Http).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote API, without a trailing slash.
    pub base_url: String,
    /// Fixed timeout applied to every request at the transport layer.
    pub request_timeout: Duration,
    /// Options used when a query does not specify its own.
    pub default_options: QueryOptions,
    /// How often the background sweeper removes expired cache entries.
    pub gc_interval: Duration,
}

impl ClientConfig {
    /// Creates a configuration pointing at the given base URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_options: QueryOptions::default(),
            gc_interval: DEFAULT_GC_INTERVAL,
        }
    }

    /// Reads the base URL from `PHARMA_API_URL`, falling back to the local
    /// development server.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url)
    }

    /// Sets the transport-level request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the default query options.
    #[must_use]
    pub fn with_default_options(mut self, options: QueryOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Sets the garbage-collection sweep interval.
    #[must_use]
    pub const fn with_gc_interval(mut self, interval: Duration) -> Self {
        self.gc_interval = interval;
        self
    }
}
