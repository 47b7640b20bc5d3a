//! Process configuration
//!
//! Everything is read once from environment variables at startup.
//! The root folder and credentials may be absent; that only fails the
//! requests that need them.

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use tracing::debug;

/// Default upstream API base URL
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_TRAVERSAL_CONCURRENCY: usize = 8;

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not configured")]
    Missing(&'static str),

    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// Folder traversed by `GET /courses`
    pub root_folder_id: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub api_base: String,
    pub cache_ttl: Duration,
    /// Maximum in-flight listing calls per traversal
    pub traversal_concurrency: usize,
    /// Whether trees with failed branches are cached
    pub cache_degraded: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            root_folder_id: None,
            api_key: None,
            access_token: None,
            api_base: DEFAULT_API_BASE.to_string(),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            traversal_concurrency: DEFAULT_TRAVERSAL_CONCURRENCY,
            cache_degraded: true,
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let traversal_concurrency: usize = parse_or(
            "TRAVERSAL_CONCURRENCY",
            var("TRAVERSAL_CONCURRENCY"),
            defaults.traversal_concurrency,
        )?;
        if traversal_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "TRAVERSAL_CONCURRENCY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let ttl_secs: u64 = parse_or(
            "CACHE_TTL_SECS",
            var("CACHE_TTL_SECS"),
            defaults.cache_ttl.as_secs(),
        )?;

        let config = Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse_or("PORT", var("PORT"), defaults.port)?,
            root_folder_id: var("DRIVE_ROOT_FOLDER_ID"),
            api_key: var("DRIVE_API_KEY"),
            access_token: var("DRIVE_ACCESS_TOKEN"),
            api_base: var("DRIVE_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base),
            cache_ttl: Duration::from_secs(ttl_secs),
            traversal_concurrency,
            cache_degraded: parse_or(
                "CACHE_DEGRADED_TREES",
                var("CACHE_DEGRADED_TREES"),
                defaults.cache_degraded,
            )?,
        };

        debug!(
            port = config.port,
            root_configured = config.root_folder_id.is_some(),
            ttl_secs = ttl_secs,
            concurrency = config.traversal_concurrency,
            cache_degraded = config.cache_degraded,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Root folder for the course structure, required at call time
    pub fn root_folder_id(&self) -> Result<&str, ConfigError> {
        self.root_folder_id
            .as_deref()
            .ok_or(ConfigError::Missing("DRIVE_ROOT_FOLDER_ID"))
    }

    /// Address the HTTP server binds to
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.traversal_concurrency, 8);
        assert!(config.cache_degraded);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(
            config.root_folder_id(),
            Err(ConfigError::Missing("DRIVE_ROOT_FOLDER_ID"))
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("PORT", "9000"),
            ("DRIVE_ROOT_FOLDER_ID", "root-123"),
            ("DRIVE_API_KEY", "key"),
            ("DRIVE_API_BASE", "http://localhost:1234/"),
            ("CACHE_TTL_SECS", "60"),
            ("TRAVERSAL_CONCURRENCY", "2"),
            ("CACHE_DEGRADED_TREES", "false"),
        ])
        .unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:9000");
        assert_eq!(config.root_folder_id(), Ok("root-123"));
        assert_eq!(config.api_key.as_deref(), Some("key"));
        assert_eq!(config.api_base, "http://localhost:1234");
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.traversal_concurrency, 2);
        assert!(!config.cache_degraded);
    }

    #[test]
    fn test_empty_values_are_unset() {
        let config = load(&[("DRIVE_ROOT_FOLDER_ID", "  "), ("PORT", "")]).unwrap();
        assert!(config.root_folder_id.is_none());
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            load(&[("TRAVERSAL_CONCURRENCY", "0")]),
            Err(ConfigError::Invalid { key: "TRAVERSAL_CONCURRENCY", .. })
        ));
        assert!(matches!(
            load(&[("CACHE_DEGRADED_TREES", "maybe")]),
            Err(ConfigError::Invalid { key: "CACHE_DEGRADED_TREES", .. })
        ));
    }
}
