//! Slash commands exposed by the bot.

pub mod line;
pub mod telephone;

pub use line::{block, unblock, wire};
pub use telephone::{dial, redial, reversedial};

use crate::{Context, Error};
use parrot_common::GuildId;

/// Parses a raw server ID argument.
pub(crate) fn parse_guild_id(raw: &str) -> Option<GuildId> {
    raw.trim().parse::<u64>().ok().filter(|id| *id > 0).map(GuildId)
}

/// The guild a command was invoked in. All telephone commands are
/// `guild_only`, so this only fails on misconfigured invocations.
pub(crate) fn invoking_guild(ctx: &Context<'_>) -> Result<GuildId, Error> {
    Ok(GuildId(
        ctx.guild_id()
            .ok_or("this command can only be used in a server")?
            .get(),
    ))
}
