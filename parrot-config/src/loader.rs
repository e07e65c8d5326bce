//! Configuration loading utilities

use crate::Config;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error when reading configuration file
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse YAML configuration: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    /// Environment variable parsing error
    #[error("Failed to parse environment variable '{var}': {source}")]
    EnvParseError {
        var: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl From<ConfigError> for parrot_common::ParrotError {
    fn from(err: ConfigError) -> Self {
        parrot_common::ParrotError::config(err.to_string())
    }
}

/// Configuration loader for the application
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a YAML file with environment variable overrides
    pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        debug!("Loading configuration from {}", path.as_ref().display());
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Config = serde_yaml::from_str(&content)?;

        Self::apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Config, ConfigError> {
        if let Ok(config_path) = env::var("PARROT_CONFIG_PATH") {
            Self::load_config(&config_path)
        } else if Path::new("config.yaml").exists() {
            Self::load_config("config.yaml")
        } else if Path::new("config.yml").exists() {
            Self::load_config("config.yml")
        } else {
            // No config file found, use defaults with env overrides
            let mut config = Config::default();
            Self::apply_env_overrides(&mut config)?;
            config.validate_all()?;
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
        if let Ok(token) = env::var("DISCORD_TOKEN") {
            config.discord.token = token;
        }

        if let Ok(prefix) = env::var("PARROT_PREFIX") {
            config.discord.prefix = prefix;
        }

        if let Ok(secret) = env::var("PARROT_IPC_SECRET") {
            config.ipc.secret = secret;
            config.ipc.enabled = true;
        }

        if let Ok(bind) = env::var("PARROT_IPC_BIND") {
            config.ipc.bind_address = bind;
        }

        if let Ok(path) = env::var("PARROT_DB_PATH") {
            config.database.path = path;
        }

        if let Ok(level) = env::var("PARROT_LOG_LEVEL") {
            config.logging.level = level;
        }

        if let Ok(cooldown) = env::var("PARROT_DIAL_COOLDOWN") {
            config.telephone.dial_cooldown_seconds =
                cooldown.parse().map_err(|e| ConfigError::EnvParseError {
                    var: "PARROT_DIAL_COOLDOWN".to_string(),
                    source: Box::new(e),
                })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
discord:
  token: "123456789.abcdef.ghijklmnop"
  prefix: "!"
telephone:
  ring_timeout_seconds: 30
  call_timeout_seconds: 120
  idle_timeout_seconds: 60
  rate_limit_messages: 5
  rate_limit_window_seconds: 5
  dial_cooldown_seconds: 180
  max_content_chars: 1000
ipc:
  enabled: false
  bind_address: "127.0.0.1:8765"
  secret: ""
database:
  path: "parrot.db"
logging:
  level: "info"
  file: null
  colored: true
"#
        )
        .unwrap();

        let config = ConfigLoader::load_config(file.path()).unwrap();
        assert_eq!(config.telephone.ring_timeout_seconds, 30);
        assert_eq!(config.discord.prefix, "!");
        assert!(!config.ipc.enabled);
    }

    #[test]
    fn test_load_config_rejects_bad_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
discord:
  token: "not-a-token"
  prefix: "!"
telephone:
  ring_timeout_seconds: 1
  call_timeout_seconds: 120
  idle_timeout_seconds: 60
  rate_limit_messages: 5
  rate_limit_window_seconds: 5
  dial_cooldown_seconds: 180
  max_content_chars: 1000
ipc:
  enabled: false
  bind_address: "127.0.0.1:8765"
  secret: ""
database:
  path: "parrot.db"
logging:
  level: "info"
  file: null
  colored: true
"#
        )
        .unwrap();

        assert!(ConfigLoader::load_config(file.path()).is_err());
    }
}
