//! Inbound chat messages and the freshness gate.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Chat identifier as used by the transport.
pub type ChatId = i64;

/// Message identifier within a chat.
pub type MessageId = i32;

/// Where a message was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    /// Group, supergroup, or broadcast channel.
    #[serde(alias = "supergroup", alias = "channel")]
    Group,

    /// One-to-one chat with the bot.
    Private,
}

/// A text message handed over by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Identifier of this message, used as the reply target.
    pub message_id: MessageId,

    /// Chat the message was posted in.
    pub chat_id: ChatId,

    /// Group or private context.
    pub chat_kind: ChatKind,

    /// Message text.
    pub text: String,

    /// When the message was sent, as unix seconds on the wire.
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,

    /// Sender's username, for logging only.
    #[serde(default)]
    pub username: Option<String>,
}

impl InboundMessage {
    /// Whether the message is young enough to answer at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        is_fresh(self.timestamp, now, timeout)
    }
}

/// `true` iff `now - timestamp <= timeout`. Timestamps ahead of `now`
/// (clock skew) count as fresh.
pub fn is_fresh(timestamp: DateTime<Utc>, now: DateTime<Utc>, timeout: Duration) -> bool {
    let age = now.signed_duration_since(timestamp);
    TimeDelta::from_std(timeout).map_or(true, |limit| age <= limit)
}
