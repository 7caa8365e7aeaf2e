//! HTTP error types.

use cobalt_model::Snowflake;
use thiserror::Error;

/// Errors that can occur during REST operations.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection-layer failure (DNS, TCP, TLS).
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid header value (bad token or audit-log reason).
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),

    /// The per-attempt deadline elapsed.
    #[error("request deadline exceeded")]
    Timeout,

    /// Rate limited past the transparent re-submit cap.
    #[error("rate limit retries exhausted for {route}")]
    RateLimitExhausted {
        /// Bucket key of the exhausted route.
        route: String,
    },

    /// Discord API returned a 4xx with an error body.
    #[error("API error {status} (code {code}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Discord error code.
        code: u32,
        /// Discord error message.
        message: String,
    },

    /// Unauthorized (invalid token). Fatal process-wide.
    #[error("unauthorized: invalid token")]
    Unauthorized,

    /// Forbidden (missing permissions).
    #[error("forbidden: missing permissions")]
    Forbidden,

    /// Resource not found.
    #[error("not found")]
    NotFound,

    /// Server error after exhausting retries.
    #[error("server error: {0}")]
    ServerError(u16),

    /// Bulk delete refused: the message is older than 14 days.
    #[error("message {id} is older than 14 days and cannot be bulk deleted")]
    MessageTooOld {
        /// The offending message ID.
        id: Snowflake,
    },

    /// Client internal error.
    #[error("client error: {0}")]
    Client(String),
}

impl HttpError {
    /// Whether this error indicates a broken credential rather than a bad
    /// request; callers should stop retrying entirely.
    pub fn is_authentication(&self) -> bool {
        matches!(self, HttpError::Unauthorized)
    }
}

/// Discord API error response body.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: u32,
    #[serde(default)]
    pub message: String,
}
