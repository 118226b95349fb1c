use std::env;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, SyncError};

/// Notion database ids for the three record sets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseIds {
    pub contributions: String,
    pub keywords: String,
    pub companions: String,
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    // Notion
    pub notion_secret: String,
    pub databases: DatabaseIds,

    // Azure Blob
    pub storage_connection_string: String,
    pub storage_container: String,

    // Runtime
    pub http_timeout: Duration,
    pub image_concurrency: usize,
    pub interval_hours: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| SyncError::Config(format!("{key} environment variable is required")))
        };

        let interval_hours: u32 = parse_or(get("SYNC_INTERVAL_HOURS"), "SYNC_INTERVAL_HOURS", 4)?;
        if interval_hours == 0 || 24 % interval_hours != 0 {
            return Err(SyncError::Config(format!(
                "SYNC_INTERVAL_HOURS must divide 24, got {interval_hours}"
            )));
        }

        let timeout_secs: u64 = parse_or(get("HTTP_TIMEOUT_SECS"), "HTTP_TIMEOUT_SECS", 30)?;
        if timeout_secs == 0 {
            return Err(SyncError::Config(
                "HTTP_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            notion_secret: required("NOTION_SECRET")?,
            databases: DatabaseIds {
                contributions: required("NOTION_DATABASE_CONTRIBUTIONS")?,
                keywords: required("NOTION_DATABASE_KEYWORDS")?,
                companions: required("NOTION_DATABASE_COMPANIONS")?,
            },
            storage_connection_string: required("AZURE_STORAGE_CONNECTION_STRING")?,
            storage_container: get("AZURE_STORAGE_CONTAINER").unwrap_or_else(|| "$web".to_string()),
            http_timeout: Duration::from_secs(timeout_secs),
            image_concurrency: parse_or(get("IMAGE_CONCURRENCY"), "IMAGE_CONCURRENCY", 1usize)?.max(1),
            interval_hours,
        })
    }

    /// Log the effective configuration with secrets masked.
    pub fn log_redacted(&self) {
        info!(
            notion_secret = redact(&self.notion_secret),
            contributions_db = self.databases.contributions.as_str(),
            keywords_db = self.databases.keywords.as_str(),
            companions_db = self.databases.companions.as_str(),
            storage_connection_string = redact(&self.storage_connection_string),
            storage_container = self.storage_container.as_str(),
            http_timeout_secs = self.http_timeout.as_secs(),
            image_concurrency = self.image_concurrency,
            interval_hours = self.interval_hours,
            "Loaded config"
        );
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("notion_secret", &redact(&self.notion_secret))
            .field("databases", &self.databases)
            .field("storage_connection_string", &redact(&self.storage_connection_string))
            .field("storage_container", &self.storage_container)
            .field("http_timeout", &self.http_timeout)
            .field("image_concurrency", &self.image_concurrency)
            .field("interval_hours", &self.interval_hours)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> Result<T> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| SyncError::Config(format!("{key} must be a number, got '{value}'"))),
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("NOTION_SECRET", "secret_abc"),
        ("NOTION_DATABASE_CONTRIBUTIONS", "db-contrib"),
        ("NOTION_DATABASE_KEYWORDS", "db-keywords"),
        ("NOTION_DATABASE_COMPANIONS", "db-companions"),
        ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=a2V5"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();

        assert_eq!(config.storage_container, "$web");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.image_concurrency, 1);
        assert_eq!(config.interval_hours, 4);
        assert_eq!(config.databases.keywords, "db-keywords");
    }

    #[test]
    fn missing_required_var_names_it() {
        let pairs: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "NOTION_DATABASE_COMPANIONS")
            .collect();

        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("NOTION_DATABASE_COMPANIONS"));
    }

    #[test]
    fn overrides_parse() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("HTTP_TIMEOUT_SECS", "10"),
            ("IMAGE_CONCURRENCY", "4"),
            ("SYNC_INTERVAL_HOURS", "6"),
            ("AZURE_STORAGE_CONTAINER", "staging"),
        ]);

        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.image_concurrency, 4);
        assert_eq!(config.interval_hours, 6);
        assert_eq!(config.storage_container, "staging");
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HTTP_TIMEOUT_SECS", "0"));
        let err = Config::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, SyncError::Config(ref msg) if msg.contains("HTTP_TIMEOUT_SECS")));
    }

    #[test]
    fn bad_numbers_and_intervals_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("HTTP_TIMEOUT_SECS", "soon"));
        assert!(matches!(Config::from_lookup(lookup(&pairs)), Err(SyncError::Config(_))));

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("SYNC_INTERVAL_HOURS", "5"));
        assert!(matches!(Config::from_lookup(lookup(&pairs)), Err(SyncError::Config(_))));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let config = Config::from_lookup(lookup(REQUIRED)).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret_abc"));
        assert!(!rendered.contains("a2V5"));
    }
}
