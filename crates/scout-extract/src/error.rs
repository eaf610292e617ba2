use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by extraction service (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("profile not found: {url}")]
    NotFound { url: String },

    #[error("profile is private or access was denied: {url}")]
    Private { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("normalization error for {profile}: {reason}")]
    Normalization { profile: String, reason: String },

    #[error("invalid extraction base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}

impl ExtractError {
    /// Whether retrying the same request later could plausibly succeed.
    ///
    /// Rate limiting, timeouts, connection failures, and 5xx / 408 responses
    /// are transient. Missing or private profiles, malformed payloads, and
    /// configuration problems are not.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::RateLimited { .. } => true,
            ExtractError::Http(e) => !(e.is_builder() || e.is_decode() || e.is_redirect()),
            ExtractError::UnexpectedStatus { status, .. } => *status >= 500 || *status == 408,
            ExtractError::Deserialize { .. }
            | ExtractError::NotFound { .. }
            | ExtractError::Private { .. }
            | ExtractError::Normalization { .. }
            | ExtractError::InvalidBaseUrl { .. } => false,
        }
    }
}
