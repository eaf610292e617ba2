use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::niches::Niche;
use crate::profiles::Platform;
use crate::ConfigError;

/// A permit budget for one rate-limited resource (`{platform}_{operation}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudgetConfig {
    pub key: String,
    pub max_permits: u32,
    pub window_secs: u64,
}

impl RateBudgetConfig {
    #[must_use]
    pub fn new(key: impl Into<String>, max_permits: u32, window_secs: u64) -> Self {
        Self {
            key: key.into(),
            max_permits,
            window_secs,
        }
    }
}

/// Budget applied to resource keys that have no named entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultBudget {
    pub max_permits: u32,
    pub window_secs: u64,
}

/// Contents of `config/discovery.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_cycle: usize,
    #[serde(default = "default_time_budget")]
    pub browse_time_budget_secs: u64,
    #[serde(default = "default_browse_retries")]
    pub browse_max_retries: u32,
    #[serde(default = "default_min_followers")]
    pub min_followers: i64,
    #[serde(default = "default_max_followers")]
    pub max_followers: i64,
    /// Empty means every niche is accepted.
    #[serde(default)]
    pub niches: Vec<Niche>,
    #[serde(default = "default_rate_budgets")]
    pub rate_budgets: Vec<RateBudgetConfig>,
    #[serde(default = "default_budget")]
    pub default_budget: DefaultBudget,
}

fn default_platforms() -> Vec<Platform> {
    vec![Platform::Instagram]
}

fn default_max_candidates() -> usize {
    20
}

fn default_time_budget() -> u64 {
    120
}

fn default_browse_retries() -> u32 {
    2
}

fn default_min_followers() -> i64 {
    1_000
}

fn default_max_followers() -> i64 {
    100_000
}

fn default_rate_budgets() -> Vec<RateBudgetConfig> {
    vec![
        RateBudgetConfig::new("instagram_fetch", 200, 3_600),
        RateBudgetConfig::new("instagram_browse", 20, 3_600),
        RateBudgetConfig::new("linkedin_fetch", 500, 86_400),
        RateBudgetConfig::new("linkedin_browse", 10, 3_600),
    ]
}

fn default_budget() -> DefaultBudget {
    DefaultBudget {
        max_permits: 10,
        window_secs: 3_600,
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            platforms: default_platforms(),
            max_candidates_per_cycle: default_max_candidates(),
            browse_time_budget_secs: default_time_budget(),
            browse_max_retries: default_browse_retries(),
            min_followers: default_min_followers(),
            max_followers: default_max_followers(),
            niches: Vec::new(),
            rate_budgets: default_rate_budgets(),
            default_budget: default_budget(),
        }
    }
}

/// Load and validate the discovery configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_discovery_config(path: &Path) -> Result<DiscoveryConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::DiscoveryFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_discovery_config(&content)
}

/// Parse and validate discovery configuration from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_discovery_config(content: &str) -> Result<DiscoveryConfig, ConfigError> {
    let config: DiscoveryConfig = serde_yaml::from_str(content)?;
    validate_discovery(&config)?;
    Ok(config)
}

/// Check the invariants the pipeline relies on.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] describing the first violation found.
pub fn validate_discovery(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.platforms.is_empty() {
        return Err(ConfigError::Validation(
            "at least one platform must be configured".to_string(),
        ));
    }

    if config.max_candidates_per_cycle == 0 {
        return Err(ConfigError::Validation(
            "max_candidates_per_cycle must be greater than zero".to_string(),
        ));
    }

    if config.min_followers < 0 || config.min_followers > config.max_followers {
        return Err(ConfigError::Validation(format!(
            "follower bounds [{}, {}] are invalid",
            config.min_followers, config.max_followers
        )));
    }

    if config.default_budget.max_permits == 0 || config.default_budget.window_secs == 0 {
        return Err(ConfigError::Validation(
            "default_budget must allow at least one permit per non-empty window".to_string(),
        ));
    }

    let mut seen_keys = HashSet::new();
    for budget in &config.rate_budgets {
        if budget.key.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rate budget key must be non-empty".to_string(),
            ));
        }
        if budget.max_permits == 0 {
            return Err(ConfigError::Validation(format!(
                "rate budget '{}' has zero permits and can never be satisfied",
                budget.key
            )));
        }
        if budget.window_secs == 0 {
            return Err(ConfigError::Validation(format!(
                "rate budget '{}' has a zero-length window",
                budget.key
            )));
        }
        if !seen_keys.insert(budget.key.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate rate budget key: '{}'",
                budget.key
            )));
        }
    }

    Ok(())
}
