//! Configuration loading for the rentbook client.
//!
//! The file is TOML. `api_base_url`, `request_timeout_ms` and `[auth]` are
//! required; the cache settings fall back to the sync defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rentbook_core::{SyncConfig, DEFAULT_CACHE_TTL};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_preload_adjacent")]
    pub preload_adjacent: bool,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_preload_adjacent() -> bool {
    true
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or RENTBOOK_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Load from the path given by `--config` or `RENTBOOK_CONFIG`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.cache_ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_ttl_secs",
                reason: "must be > 0".to_string(),
            });
        }
        if self.auth.api_key.is_none() && self.auth.bearer_token.is_none() {
            return Err(ConfigError::InvalidValue {
                field: "auth",
                reason: "api_key or bearer_token must be provided".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Cache and preload settings for the sync session.
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new()
            .with_ttl(Duration::from_secs(self.cache_ttl_secs))
            .with_preload(self.preload_adjacent)
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("RENTBOOK_CONFIG").ok().map(PathBuf::from)
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
api_base_url = "http://localhost:3000"
request_timeout_ms = 5000

[auth]
api_key = "test-key"
"#;

    #[test]
    fn test_minimal_config_uses_sync_defaults() {
        let config = ClientConfig::from_toml(MINIMAL).expect("parse should succeed");
        config.validate().expect("validate should succeed");

        let sync = config.sync_config();
        assert_eq!(sync.cache_ttl, DEFAULT_CACHE_TTL);
        assert!(sync.preload_adjacent);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let contents = r#"
api_base_url = "http://localhost:3000"
request_timeout_ms = 5000
refresh_interval_ms = 10

[auth]
api_key = "test-key"
"#;
        assert!(matches!(
            ClientConfig::from_toml(contents),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_requires_credentials() {
        let mut config = ClientConfig::from_toml(MINIMAL).expect("parse should succeed");
        config.auth.api_key = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "auth", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_values_and_bad_scheme() {
        let mut config = ClientConfig::from_toml(MINIMAL).expect("parse should succeed");
        config.cache_ttl_secs = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::from_toml(MINIMAL).expect("parse should succeed");
        config.request_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = ClientConfig::from_toml(MINIMAL).expect("parse should succeed");
        config.api_base_url = "localhost:3000".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "api_base_url", .. })
        ));
    }

    #[test]
    fn test_from_path_reads_file() {
        let file = tempfile::NamedTempFile::new().expect("temp file should be created");
        let contents = r#"
api_base_url = "https://rent.example"
request_timeout_ms = 100
cache_ttl_secs = 60
preload_adjacent = false

[auth]
bearer_token = "token"
"#;
        std::fs::write(file.path(), contents).expect("write should succeed");

        let config = ClientConfig::from_path(file.path()).expect("load should succeed");
        config.validate().expect("validate should succeed");
        let sync = config.sync_config();
        assert!(!sync.preload_adjacent);
        assert_eq!(sync.cache_ttl, Duration::from_secs(60));
    }
}
