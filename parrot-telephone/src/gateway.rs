//! Chat gateway seam consumed by the relay.

use async_trait::async_trait;
use parrot_common::{ChannelId, Result};
use std::time::Duration;

/// A message observed on one of the two line channels.
#[derive(Debug, Clone)]
pub struct LineMessage {
    /// Channel the message was posted in
    pub channel_id: ChannelId,
    /// Raw message content
    pub content: String,
}

/// The platform capabilities the relay needs: "send a message" and
/// "wait for the next qualifying message with a timeout".
///
/// Implementations must only surface non-bot messages, otherwise the relay
/// would echo its own forwards back and forth.
#[async_trait]
pub trait LineGateway: Send + Sync {
    /// Sends a message to a line channel.
    async fn send_message(&self, channel: ChannelId, content: &str) -> Result<()>;

    /// Waits for the next non-bot message in either of the two channels.
    /// Returns `None` when the timeout elapses first.
    async fn next_message(
        &self,
        channels: (ChannelId, ChannelId),
        timeout: Duration,
    ) -> Option<LineMessage>;
}
