//! # Message Lifecycle
//!
//! Wraps the Q&A matcher with the chat-facing reply policy:
//!
//! - **Freshness**: messages older than the configured window are dropped
//!   before any matching
//! - **Decisions**: group chats get an answer or silence, private chats get
//!   an answer or a fallback
//! - **Auto-delete**: answers posted in group chats are deleted after a delay
//!
//! The transport owns the wire. It hands over an [`InboundMessage`] and
//! implements [`ReplySender`] and [`MessageDeleter`].

pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod reply;
pub mod scheduler;

pub use config::LifecycleConfig;
pub use error::{DeliveryError, Result};
pub use handler::{Decision, HandleOutcome, MessageHandler, NoReplyReason, ReplySender};
pub use message::{ChatId, ChatKind, InboundMessage, MessageId, is_fresh};
pub use reply::format_answer;
pub use scheduler::{
    DeletionScheduler, MessageDeleter, PendingDeletion, TokioDeletionScheduler, execute_deletion,
};
