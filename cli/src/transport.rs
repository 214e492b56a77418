//! JSON-lines chat transport over stdio.
//!
//! Inbound messages arrive one JSON object per line. Outbound actions are
//! written as tagged events:
//!
//! ```text
//! {"event":"reply","chat_id":-100,"message_id":1,"reply_to":7,"text":"..."}
//! {"event":"delete","chat_id":-100,"message_id":1}
//! ```

use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use qamatch_lifecycle::{ChatId, DeliveryError, MessageDeleter, MessageId, ReplySender};

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum OutboundEvent<'a> {
    Reply {
        chat_id: ChatId,
        message_id: MessageId,
        reply_to: MessageId,
        text: &'a str,
    },
    Delete {
        chat_id: ChatId,
        message_id: MessageId,
    },
}

/// Writes reply and delete events to `W`, assigning outbound message ids
/// from an increasing counter.
pub struct JsonLinesTransport<W> {
    writer: Mutex<W>,
    next_id: AtomicI32,
}

impl<W> JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            next_id: AtomicI32::new(1),
        }
    }

    async fn emit(&self, event: &OutboundEvent<'_>) -> Result<(), DeliveryError> {
        let mut line =
            serde_json::to_vec(event).map_err(|e| DeliveryError::Transport(e.to_string()))?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> ReplySender for JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send_reply(
        &self,
        chat_id: ChatId,
        reply_to: MessageId,
        text: &str,
    ) -> qamatch_lifecycle::Result<MessageId> {
        let message_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.emit(&OutboundEvent::Reply {
            chat_id,
            message_id,
            reply_to,
            text,
        })
        .await?;
        Ok(message_id)
    }
}

#[async_trait]
impl<W> MessageDeleter for JsonLinesTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn delete_message(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> qamatch_lifecycle::Result<()> {
        self.emit(&OutboundEvent::Delete {
            chat_id,
            message_id,
        })
        .await
    }
}
