use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

fn invalid(var: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason: reason.to_string(),
    }
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        match parse_usize(var, default)? {
            0 => Err(invalid(var, "must be greater than zero")),
            n => Ok(n),
        }
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("SCOUT_ENV", "development"))?;
    let log_level = or_default("SCOUT_LOG_LEVEL", "info");
    let discovery_path = PathBuf::from(or_default(
        "SCOUT_DISCOVERY_PATH",
        "./config/discovery.yaml",
    ));

    let extract_base_url = or_default("SCOUT_EXTRACT_BASE_URL", "http://127.0.0.1:8088");
    if !extract_base_url.starts_with("http://") && !extract_base_url.starts_with("https://") {
        return Err(invalid(
            "SCOUT_EXTRACT_BASE_URL",
            "must start with http:// or https://",
        ));
    }
    let extract_timeout_secs = parse_u64("SCOUT_EXTRACT_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("SCOUT_USER_AGENT", "creator-scout/0.1 (profile-discovery)");

    let db_max_connections = parse_u32("SCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("SCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("SCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let cycle_interval_secs = parse_u64("SCOUT_CYCLE_INTERVAL_SECS", "3600")?;
    let fetch_concurrency = parse_positive_usize("SCOUT_FETCH_CONCURRENCY", "4")?;
    let fetch_max_attempts = match parse_u32("SCOUT_FETCH_MAX_ATTEMPTS", "3")? {
        0 => {
            return Err(invalid(
                "SCOUT_FETCH_MAX_ATTEMPTS",
                "must be greater than zero",
            ))
        }
        n => n,
    };
    let retry_backoff_base_ms = parse_u64("SCOUT_RETRY_BACKOFF_BASE_MS", "1000")?;
    let retry_backoff_ceiling_ms = parse_u64("SCOUT_RETRY_BACKOFF_CEILING_MS", "60000")?;
    if retry_backoff_ceiling_ms < retry_backoff_base_ms {
        return Err(invalid(
            "SCOUT_RETRY_BACKOFF_CEILING_MS",
            "must not be lower than SCOUT_RETRY_BACKOFF_BASE_MS",
        ));
    }
    let reconcile_concurrency = parse_positive_usize("SCOUT_RECONCILE_CONCURRENCY", "4")?;
    let store_raw = parse_bool("SCOUT_STORE_RAW", &or_default("SCOUT_STORE_RAW", "false"))?;
    let block_after_failed_cycles = match lookup("SCOUT_BLOCK_AFTER_FAILED_CYCLES") {
        Ok(raw) if !raw.trim().is_empty() => Some(
            raw.trim()
                .parse::<u32>()
                .map_err(|e| invalid("SCOUT_BLOCK_AFTER_FAILED_CYCLES", e))?,
        ),
        _ => None,
    };
    let history_limit = parse_positive_usize("SCOUT_HISTORY_LIMIT", "100")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        discovery_path,
        extract_base_url,
        extract_timeout_secs,
        user_agent,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        cycle_interval_secs,
        fetch_concurrency,
        fetch_max_attempts,
        retry_backoff_base_ms,
        retry_backoff_ceiling_ms,
        reconcile_concurrency,
        store_raw,
        block_after_failed_cycles,
        history_limit,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(invalid(
            "SCOUT_ENV",
            format!("expected development, test, or production; got \"{other}\""),
        )),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(invalid(var, format!("expected a boolean, got \"{other}\""))),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
