//! Per-guild telephone line records.

use parrot_common::{ChannelId, GuildId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The persisted telephone configuration of one guild.
///
/// Created lazily on first use and never deleted automatically. The `busy`
/// flag is true for the whole time the guild's channel participates in an
/// active call and is reset once when that call terminates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildLine {
    /// The guild this line belongs to
    pub guild_id: GuildId,
    /// The channel used for telephone calls; unset means no line configured
    pub channel_id: Option<ChannelId>,
    /// Whether the line currently participates in a call
    #[serde(default)]
    pub busy: bool,
    /// Role pinged when a call comes in
    #[serde(default)]
    pub ping_role_id: Option<RoleId>,
    /// Member pinged when a call comes in
    #[serde(default)]
    pub ping_member_id: Option<UserId>,
    /// Guilds this line refuses calls from (and to)
    #[serde(default)]
    pub blocked: BTreeSet<GuildId>,
}

impl GuildLine {
    /// Creates a blank, unconfigured line for a guild.
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            channel_id: None,
            busy: false,
            ping_role_id: None,
            ping_member_id: None,
            blocked: BTreeSet::new(),
        }
    }

    /// Whether this line blocks calls to or from `other`.
    pub fn blocks(&self, other: GuildId) -> bool {
        self.blocked.contains(&other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_line_is_unconfigured() {
        let line = GuildLine::new(GuildId(1));
        assert!(line.channel_id.is_none());
        assert!(!line.busy);
        assert!(line.blocked.is_empty());
    }

    #[test]
    fn test_blocks() {
        let mut line = GuildLine::new(GuildId(1));
        assert!(!line.blocks(GuildId(2)));
        line.blocked.insert(GuildId(2));
        assert!(line.blocks(GuildId(2)));
        assert!(!line.blocks(GuildId(3)));
    }

    #[test]
    fn test_serde_defaults_for_old_records() {
        // Records written before the ping/block fields existed must still load
        let json = r#"{"guild_id": 1, "channel_id": 2}"#;
        let line: GuildLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.guild_id, GuildId(1));
        assert_eq!(line.channel_id, Some(parrot_common::ChannelId(2)));
        assert!(!line.busy);
        assert!(line.blocked.is_empty());
    }
}
