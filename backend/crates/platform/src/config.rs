//! Environment configuration helpers
//!
//! Thin typed accessors over process environment variables. Binaries load
//! `.env` first (dotenvy) and then read everything through these.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(String),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: String, reason: String },
}

/// Read a variable, treating an empty value as unset
pub fn env_opt(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a required variable
pub fn env_required(name: &str) -> Result<String, ConfigError> {
    env_opt(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

/// Read a variable with a default
pub fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

/// Parse a variable into `T`, falling back to `default` when unset
pub fn env_parse<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_opt(name) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Boolean flag: `1/true/yes/on` and `0/false/no/off`, case-insensitive
pub fn env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match env_opt(name) {
        None => Ok(default),
        Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
            name: name.to_string(),
            reason: format!("expected a boolean, got {raw:?}"),
        }),
    }
}

/// Duration given in whole seconds
pub fn env_secs(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    env_parse::<u64>(name, default.as_secs()).map(Duration::from_secs)
}

/// Comma-separated list, blanks dropped
pub fn env_list(name: &str, default: &str) -> Vec<String> {
    env_or(name, default)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Normalise a PEM private key pasted into an env var
///
/// Strips wrapping quotes and turns literal `\n` escapes into newlines.
pub fn normalize_pem(raw: &str) -> String {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.replace("\\n", "\n")
}
