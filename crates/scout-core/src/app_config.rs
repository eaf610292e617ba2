use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub discovery_path: PathBuf,
    pub extract_base_url: String,
    pub extract_timeout_secs: u64,
    pub user_agent: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub cycle_interval_secs: u64,
    pub fetch_concurrency: usize,
    pub fetch_max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_ceiling_ms: u64,
    pub reconcile_concurrency: usize,
    pub store_raw: bool,
    /// Consecutive failed cycles after which a profile is no longer fetched.
    /// `None` disables blocking.
    pub block_after_failed_cycles: Option<u32>,
    pub history_limit: usize,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("discovery_path", &self.discovery_path)
            .field("database_url", &"[redacted]")
            .field("extract_base_url", &self.extract_base_url)
            .field("extract_timeout_secs", &self.extract_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("cycle_interval_secs", &self.cycle_interval_secs)
            .field("fetch_concurrency", &self.fetch_concurrency)
            .field("fetch_max_attempts", &self.fetch_max_attempts)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("retry_backoff_ceiling_ms", &self.retry_backoff_ceiling_ms)
            .field("reconcile_concurrency", &self.reconcile_concurrency)
            .field("store_raw", &self.store_raw)
            .field("block_after_failed_cycles", &self.block_after_failed_cycles)
            .field("history_limit", &self.history_limit)
            .finish()
    }
}
