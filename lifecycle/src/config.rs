//! Configuration for the message lifecycle.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reply sent in private chats when nothing matches.
pub const DEFAULT_FALLBACK_REPLY: &str = "Sorry, I couldn't find a related question and answer.";

/// Timing and wording of bot replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds after which a reply in a group chat is deleted.
    pub delete_delay_secs: u64,

    /// Messages older than this many seconds are ignored.
    pub message_timeout_secs: u64,

    /// Reply for private chats when no question matches.
    pub fallback_reply: String,
}

impl LifecycleConfig {
    /// Set the auto-delete delay.
    pub fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay_secs = delay.as_secs();
        self
    }

    /// Set the freshness window.
    pub fn with_message_timeout(mut self, timeout: Duration) -> Self {
        self.message_timeout_secs = timeout.as_secs();
        self
    }

    pub fn delete_delay(&self) -> Duration {
        Duration::from_secs(self.delete_delay_secs)
    }

    pub fn message_timeout(&self) -> Duration {
        Duration::from_secs(self.message_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            delete_delay_secs: 600, // 10 minutes
            message_timeout_secs: 300, // 5 minutes
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}
