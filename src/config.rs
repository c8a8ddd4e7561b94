use anyhow::{Context, Result};
use chrono::Duration;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/api/ai-chat";
pub const MEMORY_DB: &str = ":memory:";

/// Longest snapshot lifetime accepted from configuration: one year.
pub const MAX_SNAPSHOT_TTL_HOURS: i64 = 24 * 365;

/// Retention rules for the in-memory log and the persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_retained: usize,
    pub snapshot_limit: usize,
    pub snapshot_ttl: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_retained: 50,
            snapshot_limit: 20,
            snapshot_ttl: Duration::hours(24),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StoreLocation {
    Memory,
    Sqlite(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub endpoint: String,
    pub store: StoreLocation,
    pub http_timeout: std::time::Duration,
    pub initial_page: String,
    pub limits: SessionLimits,
}

impl AssistantConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let endpoint = lookup("HACKHUB_CHAT_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.into());

        let store = match lookup("HACKHUB_ASSISTANT_DB") {
            Some(path) if path == MEMORY_DB => StoreLocation::Memory,
            Some(path) => StoreLocation::Sqlite(PathBuf::from(path)),
            None => {
                // We use ~/.hackhub/assistant.db
                let home_dir = lookup("HOME").unwrap_or_else(|| ".".into());
                StoreLocation::Sqlite(
                    PathBuf::from(home_dir)
                        .join(".hackhub")
                        .join("assistant.db"),
                )
            }
        };

        let timeout_secs: u64 = parse_or(&lookup, "HACKHUB_HTTP_TIMEOUT_SECS", 130)?;
        let initial_page = lookup("HACKHUB_PAGE").unwrap_or_else(|| "/".into());

        let defaults = SessionLimits::default();
        let max_retained = parse_or(&lookup, "HACKHUB_MAX_MESSAGES", defaults.max_retained)?;
        let snapshot_limit =
            parse_or(&lookup, "HACKHUB_SNAPSHOT_MESSAGES", defaults.snapshot_limit)?;
        let ttl_hours: i64 = parse_or(
            &lookup,
            "HACKHUB_SNAPSHOT_TTL_HOURS",
            defaults.snapshot_ttl.num_hours(),
        )?;

        if max_retained == 0 {
            anyhow::bail!("HACKHUB_MAX_MESSAGES must be at least 1");
        }
        if !(1..=MAX_SNAPSHOT_TTL_HOURS).contains(&ttl_hours) {
            anyhow::bail!(
                "HACKHUB_SNAPSHOT_TTL_HOURS must be between 1 and {}, got {}",
                MAX_SNAPSHOT_TTL_HOURS,
                ttl_hours
            );
        }

        Ok(Self {
            endpoint,
            store,
            http_timeout: std::time::Duration::from_secs(timeout_secs),
            initial_page,
            limits: SessionLimits {
                max_retained,
                snapshot_limit,
                snapshot_ttl: Duration::hours(ttl_hours),
            },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AssistantConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AssistantConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config_from(&[("HOME", "/home/hacker")]).unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.limits, SessionLimits::default());
        assert_eq!(config.http_timeout.as_secs(), 130);
        assert_eq!(config.initial_page, "/");
        match config.store {
            StoreLocation::Sqlite(path) => {
                assert_eq!(path, PathBuf::from("/home/hacker/.hackhub/assistant.db"))
            }
            StoreLocation::Memory => panic!("expected sqlite store"),
        }
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("HACKHUB_CHAT_ENDPOINT", "http://example.test/api/ai-chat"),
            ("HACKHUB_ASSISTANT_DB", ":memory:"),
            ("HACKHUB_MAX_MESSAGES", "10"),
            ("HACKHUB_SNAPSHOT_MESSAGES", "5"),
            ("HACKHUB_SNAPSHOT_TTL_HOURS", "2"),
        ])
        .unwrap();
        assert_eq!(config.endpoint, "http://example.test/api/ai-chat");
        assert!(matches!(config.store, StoreLocation::Memory));
        assert_eq!(config.limits.max_retained, 10);
        assert_eq!(config.limits.snapshot_limit, 5);
        assert_eq!(config.limits.snapshot_ttl, Duration::hours(2));
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = config_from(&[("HACKHUB_MAX_MESSAGES", "lots")]).unwrap_err();
        assert!(err.to_string().contains("HACKHUB_MAX_MESSAGES"));
        assert!(config_from(&[("HACKHUB_MAX_MESSAGES", "0")]).is_err());
    }

    #[test]
    fn rejects_out_of_range_snapshot_ttl() {
        for raw in ["100000000000", "0", "-5", "8761"] {
            let err = config_from(&[("HACKHUB_SNAPSHOT_TTL_HOURS", raw)]).unwrap_err();
            assert!(err.to_string().contains("HACKHUB_SNAPSHOT_TTL_HOURS"), "{raw}");
        }

        let config = config_from(&[("HACKHUB_SNAPSHOT_TTL_HOURS", "8760")]).unwrap();
        assert_eq!(config.limits.snapshot_ttl, Duration::hours(MAX_SNAPSHOT_TTL_HOURS));
    }
}
