//! Discord-backed implementation of the telephone line gateway.

use async_trait::async_trait;
use parrot_common::{ChannelId, ParrotError, Result};
use parrot_telephone::{LineGateway, LineMessage};
use serenity::all::{Context as SerenityContext, Http, ShardMessenger};
use serenity::collector::MessageCollector;
use std::sync::Arc;
use std::time::Duration;

/// Sends and collects line-channel messages through the Discord gateway.
///
/// Built per command invocation from the serenity context; holds only the
/// cheaply-clonable HTTP handle and shard messenger.
pub struct DiscordLineGateway {
    http: Arc<Http>,
    shard: ShardMessenger,
}

impl DiscordLineGateway {
    pub fn new(ctx: &SerenityContext) -> Self {
        Self {
            http: ctx.http.clone(),
            shard: ctx.shard.clone(),
        }
    }
}

#[async_trait]
impl LineGateway for DiscordLineGateway {
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<()> {
        serenity::all::ChannelId::new(channel.0)
            .say(&self.http, content)
            .await
            .map_err(|e| ParrotError::discord_with_source("failed to send line message", e))?;
        Ok(())
    }

    async fn next_message(
        &self,
        channels: (ChannelId, ChannelId),
        timeout: Duration,
    ) -> Option<LineMessage> {
        let (a, b) = (channels.0 .0, channels.1 .0);
        let message = MessageCollector::new(&self.shard)
            .filter(move |m| !m.author.bot && (m.channel_id.get() == a || m.channel_id.get() == b))
            .timeout(timeout)
            .await?;
        Some(LineMessage {
            channel_id: ChannelId(message.channel_id.get()),
            content: message.content.clone(),
        })
    }
}
