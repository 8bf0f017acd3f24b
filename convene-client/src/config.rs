//! Configuration loading for the Convene client.
//!
//! All fields are required unless explicitly marked optional. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Server origin, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Session token sent as a bearer credential. Optional: without it every
    /// procedure answers `UNAUTHORIZED`.
    pub session_token: Option<String>,
    pub request_timeout_ms: u64,
    /// How long a cached query result counts as fresh.
    pub stale_time_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or CONVENE_CLIENT_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path_from_args().or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        Self::from_path(&path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                field: "base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if matches!(&self.session_token, Some(token) if token.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "session_token",
                reason: "must not be blank when present".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn stale_time(&self) -> Duration {
        Duration::from_millis(self.stale_time_ms)
    }
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(value) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(value));
        }
    }
    None
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("CONVENE_CLIENT_CONFIG").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
base_url = "http://localhost:3000"
session_token = "abc.def.ghi"
request_timeout_ms = 5000
stale_time_ms = 30000
"#;

    #[test]
    fn test_parses_valid_config() {
        let config = ClientConfig::from_toml_str(VALID).unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.session_token.as_deref(), Some("abc.def.ghi"));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.stale_time(), Duration::from_secs(30));
    }

    #[test]
    fn test_session_token_is_optional() {
        let config = ClientConfig::from_toml_str(
            "base_url = \"https://convene.run\"\nrequest_timeout_ms = 1\nstale_time_ms = 0\n",
        )
        .unwrap();
        assert!(config.session_token.is_none());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let toml = format!("{}\nretries = 3\n", VALID);
        assert!(matches!(
            ClientConfig::from_toml_str(&toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_missing_required_field() {
        assert!(matches!(
            ClientConfig::from_toml_str("base_url = \"http://localhost\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_scheme = VALID.replace("http://localhost:3000", "localhost:3000");
        assert!(matches!(
            ClientConfig::from_toml_str(&bad_scheme),
            Err(ConfigError::InvalidValue { field: "base_url", .. })
        ));

        let zero_timeout = VALID.replace("5000", "0");
        assert!(matches!(
            ClientConfig::from_toml_str(&zero_timeout),
            Err(ConfigError::InvalidValue { field: "request_timeout_ms", .. })
        ));

        let blank_token = VALID.replace("abc.def.ghi", "  ");
        assert!(matches!(
            ClientConfig::from_toml_str(&blank_token),
            Err(ConfigError::InvalidValue { field: "session_token", .. })
        ));
    }
}
