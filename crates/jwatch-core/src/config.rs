use std::path::PathBuf;

use crate::app_config::WatchConfig;
use crate::ConfigError;

pub(crate) const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

pub(crate) const DEFAULT_FALLBACK_USER_AGENT: &str = "jwatch/0.1 (feed-reader)";

/// Load configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_watch_config() -> Result<WatchConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_watch_config_from_env()
}

/// Load configuration from environment variables already in the process.
///
/// Unlike [`load_watch_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_watch_config_from_env() -> Result<WatchConfig, ConfigError> {
    build_watch_config(|key| std::env::var(key))
}

/// Build configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap`.
fn build_watch_config<F>(lookup: F) -> Result<WatchConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_at_least_one = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let log_level = or_default("JWATCH_LOG_LEVEL", "info");
    let user_agent = or_default("JWATCH_USER_AGENT", DEFAULT_USER_AGENT);
    let fallback_user_agent =
        or_default("JWATCH_FALLBACK_USER_AGENT", DEFAULT_FALLBACK_USER_AGENT);

    let max_workers = parse_at_least_one("JWATCH_MAX_WORKERS", "15")?;
    let batch_size = parse_at_least_one("JWATCH_BATCH_SIZE", "1000")?;
    let max_attempts = u32::try_from(parse_at_least_one("JWATCH_MAX_ATTEMPTS", "3")?)
        .map_err(|e| invalid("JWATCH_MAX_ATTEMPTS", e.to_string()))?;
    let backoff_base_ms = parse_u64("JWATCH_BACKOFF_BASE_MS", "1000")?;
    let discover_timeout_ms = parse_u64("JWATCH_DISCOVER_TIMEOUT_MS", "2000")?;
    let check_timeout_ms = parse_u64("JWATCH_CHECK_TIMEOUT_MS", "10000")?;
    let recency_days = parse_recency_days(&or_default("JWATCH_RECENCY_DAYS", "7.5"))?;

    let keywords_path = PathBuf::from(or_default("JWATCH_KEYWORDS_PATH", "Keywords.txt"));
    let feeds_path = PathBuf::from(or_default("JWATCH_FEEDS_PATH", "Feeds.txt"));
    let output_dir = PathBuf::from(or_default("JWATCH_OUTPUT_DIR", "."));

    Ok(WatchConfig {
        log_level,
        user_agent,
        fallback_user_agent,
        max_workers,
        batch_size,
        max_attempts,
        backoff_base_ms,
        discover_timeout_ms,
        check_timeout_ms,
        recency_days,
        keywords_path,
        feeds_path,
        output_dir,
    })
}

/// Parse the recency window in (possibly fractional) days.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for non-numeric, non-finite, or
/// non-positive values.
fn parse_recency_days(raw: &str) -> Result<f64, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEnvVar {
        var: "JWATCH_RECENCY_DAYS".to_string(),
        reason,
    };
    let days = raw.parse::<f64>().map_err(|e| invalid(e.to_string()))?;
    if !days.is_finite() || days <= 0.0 {
        return Err(invalid(format!("expected a positive number of days, got {raw}")));
    }
    Ok(days)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
