use crate::bus::{EventBus, SessionEvent};
use crate::chat::{ChatMessage, MessageLog, Role};
use crate::config::SessionLimits;
use crate::context::{derive_context, ChatContext, PageView};
use crate::endpoint::{ChatBackend, ChatRequest};
use crate::history::{Snapshot, SNAPSHOT_KEY};
use crate::store::KeyValueStore;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// Shown when the endpoint could not be reached or gave an unusable answer.
pub const CONNECTION_FALLBACK: &str =
    "I'm having trouble connecting right now. Please try again in a moment.";

/// Shown when the endpoint answered with `success: false`.
pub const ERROR_FALLBACK: &str = "Sorry, I encountered an error. Please try again.";

/// What happened to a submitted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Empty text, or a reply was still pending. Nothing changed.
    Dropped,
    /// The assistant's reply was appended.
    Answered,
    /// A fallback message was appended in place of a reply.
    Failed,
}

struct SessionState {
    log: MessageLog,
    is_open: bool,
    awaiting_reply: bool,
    page: PageView,
}

/// One conversation with the hackathon assistant.
///
/// The session owns the message log, mirrors its tail into a key-value store
/// and allows a single request to the chat endpoint at a time. Every change is
/// announced on the [`EventBus`] so a view can render it.
pub struct ChatSession {
    state: Mutex<SessionState>,
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn KeyValueStore>,
    bus: Arc<EventBus>,
    limits: SessionLimits,
    // Serializes snapshot writes so the last writer always stores the latest log.
    persist_lock: tokio::sync::Mutex<()>,
}

impl ChatSession {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<EventBus>,
        limits: SessionLimits,
        page: PageView,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                log: MessageLog::new(limits.max_retained),
                is_open: false,
                awaiting_reply: false,
                page,
            }),
            backend,
            store,
            bus,
            limits,
            persist_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create a session seeded from the persisted snapshot, if it is recent enough.
    pub async fn load(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn KeyValueStore>,
        bus: Arc<EventBus>,
        limits: SessionLimits,
        page: PageView,
    ) -> Self {
        let session = Self::new(backend, store, bus, limits, page);
        session.restore_snapshot().await;
        session
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().unwrap().log.to_vec()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().log.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().is_open
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.state.lock().unwrap().awaiting_reply
    }

    pub fn open(&self) {
        self.set_open(true);
    }

    pub fn close(&self) {
        self.set_open(false);
    }

    pub fn toggle(&self) {
        let open = self.is_open();
        self.set_open(!open);
    }

    fn set_open(&self, open: bool) {
        let changed = {
            let mut state = self.state.lock().unwrap();
            let changed = state.is_open != open;
            state.is_open = open;
            changed
        };
        if changed {
            self.bus.publish(SessionEvent::VisibilityChanged(open));
        }
    }

    /// Point the session at a different page. The context is re-derived on the next request.
    pub fn navigate(&self, page: PageView) {
        self.state.lock().unwrap().page = page;
    }

    pub fn page(&self) -> PageView {
        self.state.lock().unwrap().page.clone()
    }

    pub fn derive_context(&self) -> ChatContext {
        let state = self.state.lock().unwrap();
        derive_context(&state.page)
    }

    pub fn suggested_prompts(&self) -> &'static [&'static str; 5] {
        self.derive_context().suggested_prompts()
    }

    /// Send `text` to the assistant with context derived from the current page.
    pub async fn submit(&self, text: &str) -> Submission {
        self.submit_with_context(text, None).await
    }

    /// Send `text` to the assistant.
    ///
    /// Blank text is dropped, and so is anything submitted while a previous
    /// request is still outstanding. Endpoint failures are turned into a
    /// fallback assistant message and never returned to the caller.
    pub async fn submit_with_context(&self, text: &str, context: Option<Value>) -> Submission {
        let text = text.trim();
        if text.is_empty() {
            return Submission::Dropped;
        }

        // Check-and-set under one lock so two submissions cannot both get through.
        let (user_msg, page) = {
            let mut state = self.state.lock().unwrap();
            if state.awaiting_reply {
                debug!("Dropping message while a reply is pending");
                return Submission::Dropped;
            }
            let msg = ChatMessage::user(text);
            state.log.push(msg.clone());
            state.awaiting_reply = true;
            (msg, state.page.clone())
        };

        self.bus.publish(SessionEvent::MessageAppended(user_msg));
        self.bus.publish(SessionEvent::AwaitingChanged(true));
        self.persist_snapshot().await;

        let context = context
            .unwrap_or_else(|| serde_json::to_value(derive_context(&page)).unwrap_or_default());
        let request = ChatRequest {
            message: text.to_string(),
            context,
        };

        let outcome = match self.backend.send(&request).await {
            Ok(reply) => {
                self.append_message(Role::Assistant, reply).await;
                Submission::Answered
            }
            Err(e) => {
                error!("AI chat error: {}", e);
                let fallback = if e.is_rejection() {
                    ERROR_FALLBACK
                } else {
                    CONNECTION_FALLBACK
                };
                self.append_message(Role::Assistant, fallback).await;
                Submission::Failed
            }
        };

        self.state.lock().unwrap().awaiting_reply = false;
        self.bus.publish(SessionEvent::AwaitingChanged(false));

        outcome
    }

    /// Open the chat if needed, then submit with an explicit context.
    /// Used by other parts of the app that want to ask on the user's behalf.
    pub async fn ask(&self, text: &str, context: Option<Value>) -> Submission {
        self.open();
        self.submit_with_context(text, context).await
    }

    /// Append a message, evicting the oldest ones past the retention limit,
    /// and persist the new tail.
    pub async fn append_message(&self, role: Role, content: impl Into<String>) {
        let content = content.into();
        if content.trim().is_empty() {
            warn!("Ignoring empty {} message", role);
            return;
        }

        let msg = ChatMessage::new(role, content);
        let evicted = self.state.lock().unwrap().log.push(msg.clone());
        if evicted > 0 {
            debug!("Evicted {} old message(s) from the chat log", evicted);
        }

        self.bus.publish(SessionEvent::MessageAppended(msg));
        self.persist_snapshot().await;
    }

    /// Write the newest messages to the store. Failures are logged and swallowed.
    pub async fn persist_snapshot(&self) {
        let _guard = self.persist_lock.lock().await;

        let snapshot = {
            let state = self.state.lock().unwrap();
            Snapshot::capture(&state.log, self.limits.snapshot_limit, Utc::now())
        };

        let encoded = match snapshot.encode() {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("Failed to save chat history: {:#}", e);
                return;
            }
        };

        if let Err(e) = self.store.set(SNAPSHOT_KEY, &encoded).await {
            error!("Failed to save chat history: {:#}", e);
        }
    }

    /// Load the persisted conversation unless it is missing, unreadable or stale.
    /// Returns the number of messages restored.
    pub async fn restore_snapshot(&self) -> usize {
        self.restore_snapshot_at(Utc::now()).await
    }

    pub async fn restore_snapshot_at(&self, now: DateTime<Utc>) -> usize {
        let raw = match self.store.get(SNAPSHOT_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return 0,
            Err(e) => {
                error!("Failed to load chat history: {:#}", e);
                return 0;
            }
        };

        let snapshot = match Snapshot::decode(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Discarding unreadable chat history: {:#}", e);
                return 0;
            }
        };

        if !snapshot.is_fresh(now, self.limits.snapshot_ttl) {
            info!(
                "Discarding chat history saved at {}, older than {}h",
                snapshot.timestamp,
                self.limits.snapshot_ttl.num_hours()
            );
            return 0;
        }

        let count = {
            let mut state = self.state.lock().unwrap();
            state.log.replace(snapshot.messages);
            state.log.len()
        };

        info!("Restored {} chat message(s)", count);
        self.bus.publish(SessionEvent::HistoryRestored { count });
        count
    }

    /// Forget the conversation, in memory and in the store.
    pub async fn clear_history(&self) {
        let _guard = self.persist_lock.lock().await;

        self.state.lock().unwrap().log.clear();

        if let Err(e) = self.store.remove(SNAPSHOT_KEY).await {
            error!("Failed to clear chat history: {:#}", e);
        }

        self.bus.publish(SessionEvent::HistoryCleared);
    }
}
