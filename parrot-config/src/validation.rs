//! Validation utilities for configuration fields

use validator::ValidationError;

/// Validate Discord token format (basic check)
pub fn validate_discord_token(token: &str) -> Result<(), ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::new("empty_discord_token"));
    }

    // Discord bot tokens have a dot-separated structure: bot_id.timestamp.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() == 3 && parts.iter().all(|part| !part.is_empty()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_discord_token_format"))
    }
}

/// Validate the IPC shared secret. An empty secret is allowed only when the
/// IPC server is disabled; the cross-field check lives in `Config::validate_all`.
pub fn validate_ipc_secret(secret: &str) -> Result<(), ValidationError> {
    if secret.is_empty() || secret.len() >= 16 {
        Ok(())
    } else {
        Err(ValidationError::new("ipc_secret_too_short"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_discord_token() {
        // Valid token format (fake tokens for testing)
        assert!(validate_discord_token("792715454196088842.X-hvzA.Ovy4MCQywSkoMRRclStW4xAYK7I").is_ok());
        assert!(validate_discord_token("123456789.abcdef.ghijklmnop").is_ok());

        // Invalid token formats
        assert!(validate_discord_token("").is_err());
        assert!(validate_discord_token("invalid_token").is_err());
        assert!(validate_discord_token("123.456.").is_err());
        assert!(validate_discord_token("123..456").is_err());
        assert!(validate_discord_token("123.456.789.abc").is_err());
    }

    #[test]
    fn test_validate_ipc_secret() {
        assert!(validate_ipc_secret("").is_ok());
        assert!(validate_ipc_secret("a-long-enough-shared-secret").is_ok());
        assert!(validate_ipc_secret("short").is_err());
    }
}
