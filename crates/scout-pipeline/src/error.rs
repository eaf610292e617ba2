use scout_core::ConfigError;
use scout_db::DbError;
use scout_extract::ExtractError;
use thiserror::Error;

/// Failure signal from a browse or fetch collaborator.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// Worth retrying after a backoff: network hiccups, 5xx, rate limiting.
    #[error("transient source error: {0}")]
    Transient(String),
    /// Retrying will not help: deleted or private profile, malformed payload.
    #[error("permanent source error: {0}")]
    Permanent(String),
}

impl SourceError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

impl From<ExtractError> for SourceError {
    fn from(err: ExtractError) -> Self {
        if err.is_transient() {
            SourceError::Transient(err.to_string())
        } else {
            SourceError::Permanent(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("store backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitError {
    #[error("rate budget '{key}' allows zero permits and can never be satisfied")]
    ZeroBudget { key: String },
    #[error("wait for rate budget '{key}' cancelled by shutdown")]
    Cancelled { key: String },
}

/// Errors that stop the controller before its first cycle.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl From<RateLimitError> for PipelineError {
    fn from(err: RateLimitError) -> Self {
        PipelineError::Configuration(ConfigError::Validation(err.to_string()))
    }
}
