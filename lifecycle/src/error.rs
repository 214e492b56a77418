//! Error types for message delivery.

use thiserror::Error;

/// Result type alias for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Errors reported by the chat transport when sending or deleting.
///
/// None of these reach the end user: the handler logs them and moves on.
#[derive(Error, Debug)]
pub enum DeliveryError {
    /// The target message no longer exists.
    #[error("message not found")]
    MessageNotFound,

    /// The bot lacks the right to act in the chat.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Any other transport failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
