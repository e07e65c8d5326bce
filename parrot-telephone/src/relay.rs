//! The call relay state machine.
//!
//! A call moves through `Dialing → Ringing → Connected → Terminated`, with
//! `Rejected`, `TimedOut`, `Busy` and `Blocked` reachable before `Connected`.
//! The busy flags of both participating guilds are released in exactly one
//! place (`release`), reached on every exit path of `dial`.

use crate::gateway::LineGateway;
use crate::line::GuildLine;
use crate::rate_limit::MessageWindow;
use crate::store::LineStore;
use dashmap::DashMap;
use parrot_common::utils::{escape_mentions, reverse_content, truncate_content};
use parrot_common::{ChannelId, GuildId, ParrotError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// States of a call session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CallState {
    /// Validating participants and claiming both lines
    Dialing,
    /// Waiting for `pickup` or `hangup` in either channel
    Ringing,
    /// Messages are being relayed
    Connected,
    /// A connected call ended
    Terminated,
    /// The call was declined before pickup
    Rejected,
    /// Nobody answered within the ring timeout
    TimedOut,
}

/// How a call should transform content before forwarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Forward content verbatim
    Plain,
    /// Forward content with characters reversed
    Reversed,
}

/// Why a connected call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// One side sent `hangup`
    Hangup,
    /// No qualifying message arrived within the idle timeout
    Idle,
    /// The maximum session duration elapsed
    MaxDuration,
    /// A channel exceeded the message rate window
    RateLimited,
}

/// Final result of a dial that claimed both lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// Nobody answered within the ring timeout
    TimedOut,
    /// `hangup` arrived before pickup
    Rejected,
    /// The call connected and later ended
    Completed {
        /// Why the connected phase ended
        reason: EndReason,
        /// Messages forwarded while connected
        forwarded: u64,
    },
}

/// Errors that abort a dial before any ringing happens (except
/// `ChannelUnavailable`, which aborts after the lines were claimed and is
/// returned only once both flags were released again).
#[derive(Debug, Error)]
pub enum DialError {
    /// A guild tried to call itself
    #[error("a guild cannot call itself")]
    SelfCall,

    /// A participant has no line channel configured
    #[error("guild {guild} has no telephone line configured")]
    NoLineConfigured {
        /// The unconfigured guild
        guild: GuildId,
    },

    /// A participant's line is already in a call
    #[error("the line of guild {guild} is busy")]
    LineBusy {
        /// The busy guild
        guild: GuildId,
    },

    /// One participant blocks the other
    #[error("one of the guilds blocks the other")]
    Blocked,

    /// The callee's line channel could not be reached
    #[error("the line channel of guild {guild} is unavailable")]
    ChannelUnavailable {
        /// The unreachable guild
        guild: GuildId,
    },

    /// The line store failed
    #[error(transparent)]
    Store(#[from] ParrotError),
}

/// Tuning knobs for the relay loop.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// How long an unanswered call rings
    pub ring_timeout: Duration,
    /// Maximum duration of a connected call
    pub call_timeout: Duration,
    /// Maximum silence while connected
    pub idle_timeout: Duration,
    /// Messages allowed per channel within the rate window
    pub rate_limit_messages: u32,
    /// Length of the per-channel rate window
    pub rate_limit_window: Duration,
    /// Maximum characters forwarded per message
    pub max_content_chars: usize,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            ring_timeout: Duration::from_secs(60),
            call_timeout: Duration::from_secs(120),
            idle_timeout: Duration::from_secs(60),
            rate_limit_messages: 5,
            rate_limit_window: Duration::from_secs(5),
            max_content_chars: 1000,
        }
    }
}

/// A currently ringing or connected call, exposed over IPC.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveCall {
    /// Guild that initiated the call
    pub caller_guild: GuildId,
    /// Guild that was dialed
    pub callee_guild: GuildId,
}

/// In-memory session state; never persisted.
#[derive(Debug)]
struct CallSession {
    id: Uuid,
    caller_guild: GuildId,
    callee_guild: GuildId,
    caller_channel: ChannelId,
    callee_channel: ChannelId,
    state: CallState,
}

/// The literal control words accepted in line channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Pickup,
    Hangup,
}

fn keyword_of(content: &str) -> Option<Keyword> {
    match content.trim().to_ascii_lowercase().as_str() {
        "pickup" => Some(Keyword::Pickup),
        "hangup" => Some(Keyword::Hangup),
        _ => None,
    }
}

/// Drives telephone calls between guild pairs.
pub struct CallRelay {
    store: Arc<dyn LineStore>,
    settings: RelaySettings,
    active: DashMap<Uuid, ActiveCall>,
}

impl CallRelay {
    /// Creates a relay over the given line store.
    pub fn new(store: Arc<dyn LineStore>, settings: RelaySettings) -> Self {
        Self {
            store,
            settings,
            active: DashMap::new(),
        }
    }

    /// Snapshot of calls currently ringing or connected.
    pub fn active_calls(&self) -> Vec<ActiveCall> {
        self.active.iter().map(|e| e.value().clone()).collect()
    }

    /// Dials `callee` from `caller` and runs the whole call to completion.
    ///
    /// Returns once the call ended by any path. Whatever happens after the
    /// lines were claimed, both busy flags are released before this returns.
    pub async fn dial(
        &self,
        gateway: &dyn LineGateway,
        caller: GuildId,
        callee: GuildId,
        mode: RelayMode,
    ) -> Result<CallOutcome, DialError> {
        if caller == callee {
            return Err(DialError::SelfCall);
        }

        let caller_line = self.store.get_or_create(caller).await?;
        let callee_line = self.store.get_or_create(callee).await?;

        let caller_channel = caller_line
            .channel_id
            .ok_or(DialError::NoLineConfigured { guild: caller })?;
        let callee_channel = callee_line
            .channel_id
            .ok_or(DialError::NoLineConfigured { guild: callee })?;

        if callee_line.busy {
            return Err(DialError::LineBusy { guild: callee });
        }
        if caller_line.busy {
            return Err(DialError::LineBusy { guild: caller });
        }
        if caller_line.blocks(callee) || callee_line.blocks(caller) {
            return Err(DialError::Blocked);
        }

        // Claim both lines. The flag is best-effort, not a lock: two
        // near-simultaneous dials against the same callee can race here.
        self.store.set_busy(caller, true).await?;
        if let Err(e) = self.store.set_busy(callee, true).await {
            // Do not leave the caller stuck busy on a half-claimed call
            self.release(caller, callee).await;
            return Err(e.into());
        }

        let mut session = CallSession {
            id: Uuid::new_v4(),
            caller_guild: caller,
            callee_guild: callee,
            caller_channel,
            callee_channel,
            state: CallState::Dialing,
        };
        self.active.insert(
            session.id,
            ActiveCall {
                caller_guild: caller,
                callee_guild: callee,
            },
        );

        info!(%caller, %callee, session = %session.id, "dialing");
        let result = self.run_call(gateway, &mut session, &callee_line, mode).await;

        // The one and only teardown point: both flags reset on every path.
        self.release(caller, callee).await;
        self.active.remove(&session.id);

        match &result {
            Ok(outcome) => {
                info!(session = %session.id, ?outcome, "call ended");
                self.send_end_notices(gateway, &session, *outcome).await;
            }
            Err(e) => {
                warn!(session = %session.id, error = %e, "call aborted");
                let _ = gateway
                    .send_message(caller_channel, "The other line is unreachable. Call aborted.")
                    .await;
            }
        }

        result
    }

    /// Rings the callee and, on pickup, relays messages until the call ends.
    async fn run_call(
        &self,
        gateway: &dyn LineGateway,
        session: &mut CallSession,
        callee_line: &GuildLine,
        mode: RelayMode,
    ) -> Result<CallOutcome, DialError> {
        let channels = (session.caller_channel, session.callee_channel);

        let ring = ring_notice(callee_line, session.caller_guild);
        if let Err(e) = gateway.send_message(session.callee_channel, &ring).await {
            warn!(error = %e, "ring notice failed");
            return Err(DialError::ChannelUnavailable {
                guild: session.callee_guild,
            });
        }
        if let Err(e) = gateway
            .send_message(
                session.caller_channel,
                "Dialing... waiting for the other side to `pickup`.",
            )
            .await
        {
            warn!(error = %e, "dial notice failed");
        }

        session.state = CallState::Ringing;
        let ring_deadline = Instant::now() + self.settings.ring_timeout;
        loop {
            let remaining = ring_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                session.state = CallState::TimedOut;
                return Ok(CallOutcome::TimedOut);
            }
            match gateway.next_message(channels, remaining).await {
                None => {
                    session.state = CallState::TimedOut;
                    return Ok(CallOutcome::TimedOut);
                }
                Some(msg) => match keyword_of(&msg.content) {
                    Some(Keyword::Pickup) => break,
                    Some(Keyword::Hangup) => {
                        session.state = CallState::Rejected;
                        return Ok(CallOutcome::Rejected);
                    }
                    // Unrelated chatter keeps the phone ringing
                    None => continue,
                },
            }
        }

        session.state = CallState::Connected;
        debug!(session = %session.id, "connected");
        for channel in [session.caller_channel, session.callee_channel] {
            if let Err(e) = gateway
                .send_message(channel, "Connected! Type `hangup` to end the call.")
                .await
            {
                warn!(error = %e, "connect notice failed");
            }
        }

        let call_deadline = Instant::now() + self.settings.call_timeout;
        let mut caller_window = MessageWindow::new(
            self.settings.rate_limit_messages,
            self.settings.rate_limit_window,
        );
        let mut callee_window = MessageWindow::new(
            self.settings.rate_limit_messages,
            self.settings.rate_limit_window,
        );
        let mut forwarded: u64 = 0;

        let reason = loop {
            let now = Instant::now();
            if now >= call_deadline {
                break EndReason::MaxDuration;
            }
            let wait = self
                .settings
                .idle_timeout
                .min(call_deadline.duration_since(now));

            let msg = match gateway.next_message(channels, wait).await {
                None => {
                    if Instant::now() >= call_deadline {
                        break EndReason::MaxDuration;
                    }
                    break EndReason::Idle;
                }
                Some(msg) => msg,
            };

            if keyword_of(&msg.content) == Some(Keyword::Hangup) {
                break EndReason::Hangup;
            }

            let window = if msg.channel_id == session.caller_channel {
                &mut caller_window
            } else {
                &mut callee_window
            };
            if !window.allow(Instant::now()) {
                break EndReason::RateLimited;
            }

            let destination = if msg.channel_id == session.caller_channel {
                session.callee_channel
            } else {
                session.caller_channel
            };
            let content = prepare_content(&msg.content, mode, self.settings.max_content_chars);
            // Send failures are non-fatal to the relay loop
            match gateway.send_message(destination, &content).await {
                Ok(()) => forwarded += 1,
                Err(e) => warn!(error = %e, "forward failed"),
            }
        };

        session.state = CallState::Terminated;
        Ok(CallOutcome::Completed { reason, forwarded })
    }

    /// Releases both busy flags. Errors are logged and swallowed so that a
    /// failure on one line never skips the reset of the other.
    async fn release(&self, a: GuildId, b: GuildId) {
        for guild in [a, b] {
            if let Err(e) = self.store.set_busy(guild, false).await {
                warn!(%guild, error = %e, "failed to release busy flag");
            }
        }
    }

    async fn send_end_notices(
        &self,
        gateway: &dyn LineGateway,
        session: &CallSession,
        outcome: CallOutcome,
    ) {
        let notice = match outcome {
            CallOutcome::TimedOut => "No answer. The line is free again.",
            CallOutcome::Rejected => "The call was declined. The line is free again.",
            CallOutcome::Completed { reason, .. } => match reason {
                EndReason::Hangup => "Call ended. The line is free again.",
                EndReason::Idle => "Call ended after too much silence. The line is free again.",
                EndReason::MaxDuration => "Time is up! Call ended. The line is free again.",
                EndReason::RateLimited => {
                    "The line got too noisy and was disconnected. The line is free again."
                }
            },
        };
        for channel in [session.caller_channel, session.callee_channel] {
            if let Err(e) = gateway.send_message(channel, notice).await {
                warn!(error = %e, "end notice failed");
            }
        }
    }
}

/// Builds the incoming-call notice, including the configured pings.
fn ring_notice(callee_line: &GuildLine, caller_guild: GuildId) -> String {
    let mut notice = String::new();
    if let Some(role) = callee_line.ping_role_id {
        notice.push_str(&format!("<@&{role}> "));
    }
    if let Some(member) = callee_line.ping_member_id {
        notice.push_str(&format!("<@{member}> "));
    }
    notice.push_str(&format!(
        "Incoming call from guild `{caller_guild}`! Type `pickup` to answer or `hangup` to decline."
    ));
    notice
}

/// Applies the per-message transforms: reverse (if enabled), mention
/// escaping, then the length cap.
fn prepare_content(content: &str, mode: RelayMode, max_chars: usize) -> String {
    let content = match mode {
        RelayMode::Plain => content.to_string(),
        RelayMode::Reversed => reverse_content(content),
    };
    truncate_content(&escape_mentions(&content), max_chars)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_parsing() {
        assert_eq!(keyword_of("pickup"), Some(Keyword::Pickup));
        assert_eq!(keyword_of("  PICKUP "), Some(Keyword::Pickup));
        assert_eq!(keyword_of("Hangup"), Some(Keyword::Hangup));
        assert_eq!(keyword_of("pick up"), None);
        assert_eq!(keyword_of("hello"), None);
    }

    #[test]
    fn test_prepare_content_plain() {
        let content = prepare_content("hi @everyone", RelayMode::Plain, 100);
        assert_eq!(content, "hi @\u{200B}everyone");
    }

    #[test]
    fn test_prepare_content_reversed() {
        assert_eq!(prepare_content("hello", RelayMode::Reversed, 100), "olleh");
    }

    #[test]
    fn test_prepare_content_reverses_before_escaping() {
        // Reversal happens first, then the '@' gets defused
        let content = prepare_content("a@", RelayMode::Reversed, 100);
        assert_eq!(content, "@\u{200B}a");
    }

    #[test]
    fn test_prepare_content_caps_length() {
        let long = "x".repeat(50);
        let content = prepare_content(&long, RelayMode::Plain, 10);
        assert_eq!(content.chars().count(), 10);
    }

    #[test]
    fn test_ring_notice_includes_pings() {
        let mut line = GuildLine::new(GuildId(2));
        line.ping_role_id = Some(parrot_common::RoleId(77));
        line.ping_member_id = Some(parrot_common::UserId(88));
        let notice = ring_notice(&line, GuildId(1));
        assert!(notice.starts_with("<@&77> <@88> "));
        assert!(notice.contains("Incoming call from guild `1`"));
    }
}
