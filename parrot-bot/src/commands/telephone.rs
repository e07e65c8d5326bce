//! The dial commands: `/dial`, `/redial` and `/reversedial`.
//!
//! A dial command runs the entire call to completion, so the handler stays
//! alive for the duration of the call. One dial per guild at a time; the
//! in-flight marker is dropped on every exit path.

use super::{invoking_guild, parse_guild_id};
use crate::gateway::DiscordLineGateway;
use crate::{Context, Error};
use dashmap::DashMap;
use parrot_common::GuildId;
use parrot_telephone::{DialError, RelayMode};
use std::time::Duration;
use tracing::{error, info};

/// Removes the in-flight marker when the dial ends by any path.
struct InFlightGuard<'a> {
    map: &'a DashMap<GuildId, ()>,
    guild: GuildId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.guild);
    }
}

/// Call another server's telephone line
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn dial(
    ctx: Context<'_>,
    #[description = "ID of the server to call"] server_id: String,
) -> Result<(), Error> {
    let Some(callee) = parse_guild_id(&server_id) else {
        ctx.say("That does not look like a server ID.").await?;
        return Ok(());
    };
    run_dial(ctx, callee, RelayMode::Plain).await
}

/// Call the last server this server dialed
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn redial(ctx: Context<'_>) -> Result<(), Error> {
    let caller = invoking_guild(&ctx)?;
    let Some(callee) = ctx.data().last_dialed.get(&caller).map(|e| *e.value()) else {
        ctx.say("This server has not dialed anyone yet.").await?;
        return Ok(());
    };
    run_dial(ctx, callee, RelayMode::Plain).await
}

/// Call another server with every message relayed backwards
#[poise::command(slash_command, prefix_command, guild_only)]
pub async fn reversedial(
    ctx: Context<'_>,
    #[description = "ID of the server to call"] server_id: String,
) -> Result<(), Error> {
    let Some(callee) = parse_guild_id(&server_id) else {
        ctx.say("That does not look like a server ID.").await?;
        return Ok(());
    };
    run_dial(ctx, callee, RelayMode::Reversed).await
}

async fn run_dial(ctx: Context<'_>, callee: GuildId, mode: RelayMode) -> Result<(), Error> {
    let caller = invoking_guild(&ctx)?;
    let data = ctx.data();

    let cooldown = Duration::from_secs(data.config.telephone.dial_cooldown_seconds);
    if let Err(e) = data.cooldowns.check_cooldown("dial", caller, cooldown) {
        ctx.say(format!(
            "The line needs a rest. Try again in {}s.",
            e.remaining_seconds()
        ))
        .await?;
        return Ok(());
    }

    // Re-inserting the marker is harmless; the dial that owns it removes it.
    if data.dials_in_flight.insert(caller, ()).is_some() {
        ctx.say("This server is already on a call.").await?;
        return Ok(());
    }
    let _guard = InFlightGuard {
        map: &data.dials_in_flight,
        guild: caller,
    };

    data.last_dialed.insert(caller, callee);
    ctx.say(format!("☎️ Dialing `{callee}`...")).await?;

    let gateway = DiscordLineGateway::new(ctx.serenity_context());
    match data.relay.dial(&gateway, caller, callee, mode).await {
        Ok(outcome) => {
            info!(%caller, %callee, ?outcome, "dial finished");
            data.cooldowns.apply_cooldown("dial", caller);
        }
        Err(DialError::SelfCall) => {
            ctx.say("You cannot call your own server.").await?;
        }
        Err(DialError::NoLineConfigured { guild }) if guild == caller => {
            ctx.say("This server has no telephone line yet. Set one up with `/wire`.")
                .await?;
        }
        Err(DialError::NoLineConfigured { .. }) => {
            ctx.say("That server has no telephone line.").await?;
        }
        Err(DialError::LineBusy { guild }) if guild == caller => {
            ctx.say("Your line is already in a call.").await?;
        }
        Err(DialError::LineBusy { .. }) => {
            ctx.say("The line is busy. Try again later.").await?;
        }
        Err(DialError::Blocked) => {
            ctx.say("This call cannot be connected.").await?;
        }
        Err(DialError::ChannelUnavailable { .. }) => {
            ctx.say("The other line is unreachable.").await?;
        }
        Err(DialError::Store(e)) => {
            error!(error = %e, "line store failure during dial");
            ctx.say("Something went wrong with the call. Try again later.")
                .await?;
        }
    }

    Ok(())
}
