//! Runtime configuration read from the environment.

use std::{env, path::PathBuf, time::Duration};

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_API_BASE_URL: &str = "https://withyou-backend.fly.dev";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_DATA_DIR: &str = ".withyou";

const API_BASE_URL_VAR: &str = "WITHYOU_API_BASE_URL";
const API_KEY_VAR: &str = "WITHYOU_API_KEY";
const DATA_DIR_VAR: &str = "WITHYOU_DATA_DIR";
const PUSH_ENABLED_VAR: &str = "WITHYOU_PUSH_ENABLED";
const REQUEST_TIMEOUT_VAR: &str = "WITHYOU_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub api_key: Option<String>,
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    /// Whether the user allowed notifications on this device.
    pub push_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_base_url = match lookup(API_BASE_URL_VAR) {
            Some(raw) => normalize_base_url(&raw)?
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            None => DEFAULT_API_BASE_URL.to_string(),
        };

        let api_key = lookup(API_KEY_VAR)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty());

        let data_dir = match lookup(DATA_DIR_VAR).filter(|dir| !dir.trim().is_empty()) {
            Some(dir) => PathBuf::from(dir.trim()),
            None => default_data_dir(&lookup),
        };

        let request_timeout = match lookup(REQUEST_TIMEOUT_VAR).filter(|v| !v.trim().is_empty()) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{REQUEST_TIMEOUT_VAR} must be a number of seconds"))?;
                if secs == 0 {
                    return Err(anyhow!("{REQUEST_TIMEOUT_VAR} must be greater than zero"));
                }
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let push_enabled = match lookup(PUSH_ENABLED_VAR) {
            Some(raw) => parse_flag(&raw)
                .with_context(|| format!("{PUSH_ENABLED_VAR} must be true or false"))?,
            None => true,
        };

        Ok(Self {
            api_base_url,
            api_key,
            data_dir,
            request_timeout,
            push_enabled,
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("withyou.sqlite3")
    }

    pub fn profiles_path(&self) -> PathBuf {
        self.data_dir.join("profiles.json")
    }
}

fn default_data_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    match lookup("HOME").filter(|home| !home.is_empty()) {
        Some(home) => PathBuf::from(home).join(DEFAULT_DATA_DIR),
        None => PathBuf::from(DEFAULT_DATA_DIR),
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("unrecognized flag value {other:?}")),
    }
}

/// Blank input means "unset". A missing scheme gets `https://`; a trailing
/// slash is dropped.
pub fn normalize_base_url(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let lower = trimmed.to_ascii_lowercase();
    let with_scheme = if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else if lower.starts_with("http:") || lower.starts_with("https:") {
        return Err(anyhow!("Malformed API base URL: {trimmed}"));
    } else {
        format!("https://{trimmed}")
    };

    let normalized = with_scheme.trim_end_matches('/');
    let host = normalized
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or_default();
    if host.is_empty() {
        return Err(anyhow!("API base URL has no host: {trimmed}"));
    }

    Ok(Some(normalized.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = AppConfig::from_lookup(lookup_from(&[("HOME", "/home/ana")])).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api_key, None);
        assert_eq!(config.data_dir, PathBuf::from("/home/ana/.withyou"));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(config.push_enabled);
        assert_eq!(
            config.database_path(),
            PathBuf::from("/home/ana/.withyou/withyou.sqlite3")
        );
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("WITHYOU_API_BASE_URL", "api.example.com/"),
            ("WITHYOU_API_KEY", "  secret "),
            ("WITHYOU_DATA_DIR", "/tmp/withyou"),
            ("WITHYOU_PUSH_ENABLED", "off"),
            ("WITHYOU_REQUEST_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.profiles_path(), PathBuf::from("/tmp/withyou/profiles.json"));
        assert!(!config.push_enabled);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("WITHYOU_API_BASE_URL", "   "),
            ("WITHYOU_API_KEY", ""),
        ]))
        .unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup_from(&[("WITHYOU_REQUEST_TIMEOUT_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("WITHYOU_PUSH_ENABLED", "maybe")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("WITHYOU_API_BASE_URL", "https:")])).is_err());
    }

    #[test]
    fn base_url_normalization() {
        assert_eq!(
            normalize_base_url("http://localhost:8080/").unwrap().as_deref(),
            Some("http://localhost:8080")
        );
        assert_eq!(
            normalize_base_url("HTTPS://Example.com").unwrap().as_deref(),
            Some("HTTPS://Example.com")
        );
        assert_eq!(normalize_base_url("").unwrap(), None);
        assert!(normalize_base_url("http:").is_err());
        assert!(normalize_base_url("https://").is_err());
        assert!(normalize_base_url("https:/example.com").is_err());
    }
}
