//! Application configuration structures

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct Config {
    /// Discord-related configuration
    #[validate]
    pub discord: DiscordConfig,

    /// Telephone relay tuning
    #[validate]
    pub telephone: TelephoneConfig,

    /// IPC bridge configuration
    #[validate]
    pub ipc: IpcConfig,

    /// Database configuration
    #[validate]
    pub database: DatabaseConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Discord bot configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DiscordConfig {
    /// Discord bot token
    #[validate(custom(function = "crate::validation::validate_discord_token", message = "Invalid Discord token format"))]
    pub token: String,

    /// Command prefix for text commands
    #[validate(length(min = 1, max = 4, message = "Prefix must be 1 to 4 characters"))]
    pub prefix: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            prefix: "!".to_string(),
        }
    }
}

/// Telephone relay configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TelephoneConfig {
    /// How long an unanswered call rings before timing out, in seconds
    #[validate(range(min = 5, max = 600, message = "Ring timeout must be between 5 and 600 seconds"))]
    pub ring_timeout_seconds: u64,

    /// Maximum duration of a connected call, in seconds
    #[validate(range(min = 10, max = 3600, message = "Call timeout must be between 10 and 3600 seconds"))]
    pub call_timeout_seconds: u64,

    /// Idle timeout while connected (no qualifying message), in seconds
    #[validate(range(min = 5, max = 600, message = "Idle timeout must be between 5 and 600 seconds"))]
    pub idle_timeout_seconds: u64,

    /// Messages allowed per channel within the rate window
    #[validate(range(min = 1, max = 60, message = "Rate limit must be between 1 and 60 messages"))]
    pub rate_limit_messages: u32,

    /// Length of the per-channel rate window, in seconds
    #[validate(range(min = 1, max = 60, message = "Rate window must be between 1 and 60 seconds"))]
    pub rate_limit_window_seconds: u64,

    /// Per-guild cooldown between dial commands, in seconds
    #[validate(range(max = 3600, message = "Dial cooldown cannot exceed 3600 seconds"))]
    pub dial_cooldown_seconds: u64,

    /// Maximum characters forwarded per relayed message
    #[validate(range(min = 1, max = 2000, message = "Content cap must be between 1 and 2000 characters"))]
    pub max_content_chars: usize,
}

impl Default for TelephoneConfig {
    fn default() -> Self {
        Self {
            ring_timeout_seconds: 60,
            call_timeout_seconds: 120,
            idle_timeout_seconds: 60,
            rate_limit_messages: 5,
            rate_limit_window_seconds: 5,
            dial_cooldown_seconds: 180,
            max_content_chars: 1000,
        }
    }
}

/// IPC bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IpcConfig {
    /// Whether the IPC server should be started
    pub enabled: bool,

    /// Address the IPC websocket server binds to
    #[validate(length(min = 1, message = "IPC bind address cannot be empty"))]
    pub bind_address: String,

    /// Shared secret required on every IPC request
    #[validate(custom(function = "crate::validation::validate_ipc_secret", message = "IPC secret must be at least 16 characters"))]
    pub secret: String,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind_address: "127.0.0.1:8765".to_string(),
            secret: String::new(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    /// Path to the sled database directory
    #[validate(length(min = 1, message = "Database path cannot be empty"))]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "parrot.db".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Optional log file path
    pub file: Option<String>,

    /// Whether to use colored output
    pub colored: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            colored: true,
        }
    }
}

impl Config {
    /// Comprehensive validation of the entire configuration
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;

        // An enabled IPC server without a secret would accept nothing
        if self.ipc.enabled && self.ipc.secret.is_empty() {
            let mut errors = validator::ValidationErrors::new();
            errors.add("ipc", validator::ValidationError::new("missing_ipc_secret"));
            return Err(errors);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            discord: DiscordConfig {
                token: "123456789.abcdef.ghijklmnop".to_string(),
                prefix: "!".to_string(),
            },
            ipc: IpcConfig {
                enabled: true,
                bind_address: "127.0.0.1:8765".to_string(),
                secret: "a-long-enough-shared-secret".to_string(),
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let telephone = TelephoneConfig::default();
        assert_eq!(telephone.ring_timeout_seconds, 60);
        assert_eq!(telephone.call_timeout_seconds, 120);
        assert_eq!(telephone.rate_limit_messages, 5);
        assert_eq!(telephone.rate_limit_window_seconds, 5);
        assert_eq!(telephone.dial_cooldown_seconds, 180);
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate_all().is_ok());
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut config = valid_config();
        config.discord.token = "no-dots-here".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = valid_config();
        config.telephone.rate_limit_messages = 0;
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn test_short_ipc_secret_rejected() {
        let mut config = valid_config();
        config.ipc.secret = "short".to_string();
        assert!(config.validate_all().is_err());
    }
}
