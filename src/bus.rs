use crate::chat::ChatMessage;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// State changes a view binds to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SessionEvent {
    /// A message was added to the log
    MessageAppended(ChatMessage),

    /// A request to the chat endpoint started or finished
    AwaitingChanged(bool),

    /// The chat panel was opened or closed
    VisibilityChanged(bool),

    /// A persisted conversation was loaded into the log
    HistoryRestored { count: usize },

    /// The log and its snapshot were wiped
    HistoryCleared,
}

/// Capacity before a slow view starts missing events.
const EVENT_BUFFER: usize = 64;

pub struct EventBus {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Broadcast to every subscribed view. Having no view attached is fine.
    pub fn publish(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
