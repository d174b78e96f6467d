//! Error types for API and cache operations.
//!
//! Every failure a service call can produce is folded into [`ApiError`].
//! Transport failures (no response at all) and timeouts are distinguished from
//! HTTP errors carrying a status code, because only the former and a small set
//! of server-side statuses are worth retrying. Errors are `Clone` so a single
//! in-flight result can be broadcast to every caller waiting on the same
//! query key.

use thiserror::Error;

/// Error type for all remote API operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received from the server.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the transport-level timeout.
    #[error("request timed out")]
    Timeout,

    /// The server responded with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code of the response.
        status: u16,
        /// Server-provided error message, or the raw body if none was found.
        message: String,
    },

    /// The request payload failed client-side checks before any network call.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The response body could not be decoded into the expected shape.
    #[error("malformed response: {0}")]
    Deserialize(String),
}

impl ApiError {
    /// Returns `true` if retrying the request may succeed.
    ///
    /// Network failures, timeouts, rate limiting (429) and gateway-class
    /// errors (502/503/504) are retryable; everything else is not.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout => true,
            Self::Http { status, .. } => matches!(status, 429 | 502 | 503 | 504),
            Self::Validation(_) | Self::Deserialize(_) => false,
        }
    }

    /// Returns `true` if the server rejected the request as unauthenticated.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// Returns the HTTP status code, if this error carries one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}
