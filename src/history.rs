use crate::chat::{ChatMessage, MessageLog};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Key the snapshot lives under in the key-value store.
pub const SNAPSHOT_KEY: &str = "hackhub_chat_history";

/// The persisted tail of a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages: Vec<ChatMessage>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from the newest `limit` messages of the log.
    pub fn capture(log: &MessageLog, limit: usize, now: DateTime<Utc>) -> Self {
        Self {
            messages: log.recent(limit),
            timestamp: now,
        }
    }

    /// A snapshot is fresh while it is strictly younger than `ttl`. A `ttl`
    /// reaching past the earliest representable date keeps everything.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.checked_sub_signed(ttl)
            .map_or(true, |cutoff| self.timestamp > cutoff)
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize chat snapshot")
    }

    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("Failed to parse chat snapshot")
    }
}
