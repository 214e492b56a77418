//! Per-message decision and delivery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use qamatch_matcher::QaService;

use crate::config::LifecycleConfig;
use crate::error::Result;
use crate::message::{ChatId, ChatKind, InboundMessage, MessageId};
use crate::reply::format_answer;
use crate::scheduler::{DeletionScheduler, PendingDeletion};

/// Why a message got no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoReplyReason {
    /// Older than the freshness window; never matched.
    Stale,
    /// Nothing to match against.
    EmptyText,
    /// No question was similar enough (group chats stay silent).
    NoMatch,
}

/// What the transport should do with an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Send nothing.
    NoReply { reason: NoReplyReason },

    /// Send `text` as a reply and leave it.
    Reply { text: String },

    /// Send `text` as a reply and delete it after `delete_after`.
    ReplyAndDelete { text: String, delete_after: Duration },
}

impl Decision {
    /// The reply body, if any.
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            Self::NoReply { .. } => None,
            Self::Reply { text } | Self::ReplyAndDelete { text, .. } => Some(text),
        }
    }
}

/// Sends replies through the chat transport.
#[async_trait]
pub trait ReplySender: Send + Sync {
    /// Reply to `reply_to` in `chat_id` with HTML `text`, returning the id of
    /// the sent message.
    async fn send_reply(&self, chat_id: ChatId, reply_to: MessageId, text: &str)
    -> Result<MessageId>;
}

/// What [`MessageHandler::handle`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HandleOutcome {
    /// No reply was sent.
    Ignored { reason: NoReplyReason },

    /// A reply was sent, with its deletion scheduled when applicable.
    Replied {
        message_id: MessageId,
        deletion: Option<PendingDeletion>,
    },

    /// The transport failed to send the reply.
    SendFailed,
}

/// Applies the reply policy to each inbound message.
pub struct MessageHandler {
    service: Arc<QaService>,
    config: LifecycleConfig,
    scheduler: Arc<dyn DeletionScheduler>,
}

impl MessageHandler {
    pub fn new(
        service: Arc<QaService>,
        config: LifecycleConfig,
        scheduler: Arc<dyn DeletionScheduler>,
    ) -> Self {
        Self {
            service,
            config,
            scheduler,
        }
    }

    /// Decide how to answer `message` at time `now`.
    ///
    /// | context | match | decision |
    /// |---|---|---|
    /// | group | yes | reply, then delete after the configured delay |
    /// | group | no | no reply |
    /// | private | yes | reply |
    /// | private | no | fallback reply |
    ///
    /// Stale messages get no reply and are never matched.
    pub async fn decide(&self, message: &InboundMessage, now: DateTime<Utc>) -> Decision {
        let user = message.username.as_deref().unwrap_or("<unknown>");

        if !message.is_fresh(now, self.config.message_timeout()) {
            info!(
                "Ignoring stale message {} in chat {} from {user}",
                message.message_id, message.chat_id
            );
            return Decision::NoReply {
                reason: NoReplyReason::Stale,
            };
        }

        if message.text.trim().is_empty() {
            debug!("Ignoring empty message {}", message.message_id);
            return Decision::NoReply {
                reason: NoReplyReason::EmptyText,
            };
        }

        info!(
            "Received {:?} message in chat {} from {user}: {:?}",
            message.chat_kind, message.chat_id, message.text
        );

        let matched = self.service.find_match(&message.text).await;

        match (message.chat_kind, matched) {
            (ChatKind::Group, Some(entry)) => Decision::ReplyAndDelete {
                text: format_answer(&entry.answer),
                delete_after: self.config.delete_delay(),
            },
            (ChatKind::Group, None) => Decision::NoReply {
                reason: NoReplyReason::NoMatch,
            },
            (ChatKind::Private, Some(entry)) => Decision::Reply {
                text: format_answer(&entry.answer),
            },
            (ChatKind::Private, None) => Decision::Reply {
                text: self.config.fallback_reply.clone(),
            },
        }
    }

    /// Decide, deliver through `sender`, and schedule deletion of the reply
    /// when the decision asks for it.
    pub async fn handle(
        &self,
        message: &InboundMessage,
        now: DateTime<Utc>,
        sender: &dyn ReplySender,
    ) -> HandleOutcome {
        let (text, delete_after) = match self.decide(message, now).await {
            Decision::NoReply { reason } => return HandleOutcome::Ignored { reason },
            Decision::Reply { text } => (text, None),
            Decision::ReplyAndDelete { text, delete_after } => (text, Some(delete_after)),
        };

        let sent_id = match sender
            .send_reply(message.chat_id, message.message_id, &text)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "Failed to reply to message {} in chat {}: {e}",
                    message.message_id, message.chat_id
                );
                return HandleOutcome::SendFailed;
            }
        };

        let deletion = delete_after.map(|delay| PendingDeletion {
            chat_id: message.chat_id,
            message_id: sent_id,
            delay,
        });

        if let Some(deletion) = &deletion {
            debug!(
                "Scheduling deletion of message {} in {}s",
                deletion.message_id,
                deletion.delay.as_secs()
            );
            self.scheduler.schedule(deletion.clone());
        }

        HandleOutcome::Replied {
            message_id: sent_id,
            deletion,
        }
    }
}
