//! Line management commands: `/wire`, `/block` and `/unblock`.

use super::{invoking_guild, parse_guild_id};
use crate::{Context, Error};
use parrot_common::{ChannelId, RoleId, UserId};
use poise::serenity_prelude as serenity;

/// Choose the channel this server's telephone line runs through
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn wire(
    ctx: Context<'_>,
    #[description = "Text channel to use as the telephone line"] channel: serenity::GuildChannel,
    #[description = "Role to ping on incoming calls"] ping_role: Option<serenity::Role>,
    #[description = "Member to ping on incoming calls"] ping_member: Option<serenity::User>,
) -> Result<(), Error> {
    let guild = invoking_guild(&ctx)?;
    if channel.kind != serenity::ChannelType::Text {
        ctx.say("The line must run through a text channel.").await?;
        return Ok(());
    }

    let data = ctx.data();
    let mut line = data.store.get_or_create(guild).await?;
    line.channel_id = Some(ChannelId(channel.id.get()));
    line.ping_role_id = ping_role.map(|role| RoleId(role.id.get()));
    line.ping_member_id = ping_member.map(|user| UserId(user.id.get()));
    data.store.put(&line).await?;

    ctx.say(format!(
        "📞 The telephone line now runs through <#{}>.",
        channel.id.get()
    ))
    .await?;
    Ok(())
}

/// Refuse calls from another server
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn block(
    ctx: Context<'_>,
    #[description = "ID of the server to block"] server_id: String,
) -> Result<(), Error> {
    let guild = invoking_guild(&ctx)?;
    let Some(target) = parse_guild_id(&server_id) else {
        ctx.say("That does not look like a server ID.").await?;
        return Ok(());
    };

    let data = ctx.data();
    let mut line = data.store.get_or_create(guild).await?;
    if line.blocked.insert(target) {
        data.store.put(&line).await?;
        ctx.say(format!("🚫 Calls to and from `{target}` are now blocked."))
            .await?;
    } else {
        ctx.say(format!("`{target}` is already blocked.")).await?;
    }
    Ok(())
}

/// Accept calls from a previously blocked server again
#[poise::command(
    slash_command,
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn unblock(
    ctx: Context<'_>,
    #[description = "ID of the server to unblock"] server_id: String,
) -> Result<(), Error> {
    let guild = invoking_guild(&ctx)?;
    let Some(target) = parse_guild_id(&server_id) else {
        ctx.say("That does not look like a server ID.").await?;
        return Ok(());
    };

    let data = ctx.data();
    let mut line = data.store.get_or_create(guild).await?;
    if line.blocked.remove(&target) {
        data.store.put(&line).await?;
        ctx.say(format!("`{target}` can call this server again."))
            .await?;
    } else {
        ctx.say(format!("`{target}` was not blocked.")).await?;
    }
    Ok(())
}
