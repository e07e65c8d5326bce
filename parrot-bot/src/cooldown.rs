//! Cooldown system for rate limiting dial commands

use dashmap::DashMap;
use parrot_common::GuildId;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during cooldown checks
#[derive(Error, Debug)]
pub enum CooldownError {
    #[error("Guild {guild_id} is on cooldown for command '{command}' (remaining: {remaining_seconds}s)")]
    GuildOnCooldown {
        guild_id: u64,
        command: String,
        remaining_seconds: u64,
    },
}

impl CooldownError {
    /// Seconds until the command may be used again.
    pub fn remaining_seconds(&self) -> u64 {
        match self {
            CooldownError::GuildOnCooldown {
                remaining_seconds, ..
            } => *remaining_seconds,
        }
    }
}

/// Cooldown key: (command name, guild id)
type CooldownKey = (String, u64);

/// Manager for per-guild command cooldowns
#[derive(Debug, Default)]
pub struct CooldownManager {
    cooldowns: DashMap<CooldownKey, Instant>,
}

impl CooldownManager {
    /// Create a new cooldown manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a command is on cooldown for a guild
    pub fn check_cooldown(
        &self,
        command: &str,
        guild: GuildId,
        duration: Duration,
    ) -> Result<(), CooldownError> {
        let key = (command.to_string(), guild.0);
        if let Some(last_used) = self.cooldowns.get(&key) {
            let elapsed = Instant::now().duration_since(*last_used);
            if elapsed < duration {
                let remaining = duration - elapsed;
                return Err(CooldownError::GuildOnCooldown {
                    guild_id: guild.0,
                    command: command.to_string(),
                    remaining_seconds: remaining.as_secs().max(1),
                });
            }
        }
        Ok(())
    }

    /// Start the cooldown after a successful command execution
    pub fn apply_cooldown(&self, command: &str, guild: GuildId) {
        debug!("Applying cooldown for command '{}' (guild: {})", command, guild);
        self.cooldowns
            .insert((command.to_string(), guild.0), Instant::now());
    }

    /// Clean up cooldowns older than an hour (should be called periodically)
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.cooldowns
            .retain(|_, last_used| now.duration_since(*last_used) < Duration::from_secs(3600));
    }
}
