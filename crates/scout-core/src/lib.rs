//! Shared domain types and configuration for the creator scout.

pub mod app_config;
pub mod config;
pub mod discovery;
pub mod niches;
pub mod profiles;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use discovery::{
    load_discovery_config, parse_discovery_config, validate_discovery, DefaultBudget,
    DiscoveryConfig, RateBudgetConfig,
};
pub use niches::Niche;
pub use profiles::{
    engagement_rate_for, post_engagement_rate, Candidate, Platform, Post, ProfileRecord,
    MAX_POSTS_PER_LIST,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read discovery file {path}: {source}")]
    DiscoveryFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse discovery file: {0}")]
    DiscoveryFileParse(#[from] serde_yaml::Error),

    #[error("invalid discovery config: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("unknown niche: {0}")]
    UnknownNiche(String),
}
