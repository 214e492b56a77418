//! Scheduled deletion of bot replies.
//!
//! Every pending deletion is an independent unit of work: it waits out its
//! delay, issues one delete call, and logs the outcome. Nothing is persisted,
//! awaited, retried, or cancellable, and a restart drops whatever is still
//! pending.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::message::{ChatId, MessageId};

/// A reply waiting to be deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingDeletion {
    /// Chat holding the reply.
    pub chat_id: ChatId,

    /// The reply to delete.
    pub message_id: MessageId,

    /// How long to wait before deleting.
    pub delay: Duration,
}

/// Deletes messages through the chat transport.
#[async_trait]
pub trait MessageDeleter: Send + Sync {
    /// Delete `message_id` in `chat_id`.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;
}

/// Accepts deletions to run later.
///
/// Fire-and-forget: `schedule` returns immediately and hands back nothing.
pub trait DeletionScheduler: Send + Sync {
    fn schedule(&self, deletion: PendingDeletion);
}

/// Runs each deletion on its own detached tokio task.
///
/// Must be used from within a tokio runtime.
pub struct TokioDeletionScheduler {
    deleter: Arc<dyn MessageDeleter>,
}

impl TokioDeletionScheduler {
    pub fn new(deleter: Arc<dyn MessageDeleter>) -> Self {
        Self { deleter }
    }
}

impl DeletionScheduler for TokioDeletionScheduler {
    fn schedule(&self, deletion: PendingDeletion) {
        let deleter = Arc::clone(&self.deleter);
        tokio::spawn(async move {
            tokio::time::sleep(deletion.delay).await;
            execute_deletion(deleter.as_ref(), &deletion).await;
        });
    }
}

/// Perform one deletion now. Failures are logged and dropped.
pub async fn execute_deletion(deleter: &dyn MessageDeleter, deletion: &PendingDeletion) {
    match deleter
        .delete_message(deletion.chat_id, deletion.message_id)
        .await
    {
        Ok(()) => info!(
            "Deleted message {} in chat {}",
            deletion.message_id, deletion.chat_id
        ),
        Err(e) => warn!(
            "Failed to delete message {} in chat {}: {e}",
            deletion.message_id, deletion.chat_id
        ),
    }
}
