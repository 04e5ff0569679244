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

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it from a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let in_range = |var: &str, value: i64, min: i64, max: i64| -> Result<(), ConfigError> {
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("{value} is outside {min}..={max}"),
            })
        }
    };

    let database_url = require("DATABASE_URL")?;
    let feed_url = require("STOCKSYNC_FEED_URL")?;
    if !(feed_url.starts_with("http://") || feed_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOCKSYNC_FEED_URL".to_string(),
            reason: "must be an http:// or https:// URL".to_string(),
        });
    }

    let env = parse_environment(&or_default("STOCKSYNC_ENV", "development"))?;

    let bind_addr = parse("STOCKSYNC_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("STOCKSYNC_LOG_LEVEL", "info");

    let feed_ttl_secs: u64 = parse_num(
        "STOCKSYNC_FEED_TTL_SECS",
        &or_default("STOCKSYNC_FEED_TTL_SECS", "900"),
    )?;
    let feed_timeout_secs: u64 = parse_num(
        "STOCKSYNC_FEED_TIMEOUT_SECS",
        &or_default("STOCKSYNC_FEED_TIMEOUT_SECS", "30"),
    )?;
    let feed_user_agent = or_default("STOCKSYNC_FEED_USER_AGENT", "stocksync/0.1 (supplier-feed)");
    let feed_max_retries: u32 = parse_num(
        "STOCKSYNC_FEED_MAX_RETRIES",
        &or_default("STOCKSYNC_FEED_MAX_RETRIES", "1"),
    )?;
    let feed_retry_backoff_base_secs: u64 = parse_num(
        "STOCKSYNC_FEED_RETRY_BACKOFF_BASE_SECS",
        &or_default("STOCKSYNC_FEED_RETRY_BACKOFF_BASE_SECS", "2"),
    )?;

    let default_threshold: i64 = parse_num(
        "STOCKSYNC_DEFAULT_THRESHOLD",
        &or_default("STOCKSYNC_DEFAULT_THRESHOLD", "1"),
    )?;
    in_range("STOCKSYNC_DEFAULT_THRESHOLD", default_threshold, 0, i64::MAX)?;

    let sync_interval_minutes: u32 = parse_num(
        "STOCKSYNC_SYNC_INTERVAL_MINUTES",
        &or_default("STOCKSYNC_SYNC_INTERVAL_MINUTES", "30"),
    )?;
    in_range(
        "STOCKSYNC_SYNC_INTERVAL_MINUTES",
        i64::from(sync_interval_minutes),
        1,
        30,
    )?;
    // Cron minute steps only repeat evenly when they divide the hour.
    if 60 % sync_interval_minutes != 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOCKSYNC_SYNC_INTERVAL_MINUTES".to_string(),
            reason: format!("{sync_interval_minutes} does not divide 60 evenly"),
        });
    }

    let sync_chunk_size: usize = parse_num(
        "STOCKSYNC_SYNC_CHUNK_SIZE",
        &or_default("STOCKSYNC_SYNC_CHUNK_SIZE", "100"),
    )?;
    if sync_chunk_size == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOCKSYNC_SYNC_CHUNK_SIZE".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let sync_max_concurrent_updates: usize = parse_num(
        "STOCKSYNC_SYNC_MAX_CONCURRENT_UPDATES",
        &or_default("STOCKSYNC_SYNC_MAX_CONCURRENT_UPDATES", "1"),
    )?;
    if sync_max_concurrent_updates == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "STOCKSYNC_SYNC_MAX_CONCURRENT_UPDATES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let db_max_connections: u32 = parse_num(
        "STOCKSYNC_DB_MAX_CONNECTIONS",
        &or_default("STOCKSYNC_DB_MAX_CONNECTIONS", "10"),
    )?;
    let db_min_connections: u32 = parse_num(
        "STOCKSYNC_DB_MIN_CONNECTIONS",
        &or_default("STOCKSYNC_DB_MIN_CONNECTIONS", "1"),
    )?;
    let db_acquire_timeout_secs: u64 = parse_num(
        "STOCKSYNC_DB_ACQUIRE_TIMEOUT_SECS",
        &or_default("STOCKSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10"),
    )?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        feed_url,
        feed_ttl_secs,
        feed_timeout_secs,
        feed_user_agent,
        feed_max_retries,
        feed_retry_backoff_base_secs,
        default_threshold,
        sync_interval_minutes,
        sync_chunk_size,
        sync_max_concurrent_updates,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a numeric env value, naming the variable in the error.
fn parse_num<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "STOCKSYNC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
