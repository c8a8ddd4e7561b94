//! Chat session core for the HackHub assistant: a bounded conversation log,
//! a persisted snapshot of its tail, page-aware suggested prompts and a
//! single-slot client for the application's chat endpoint.

pub mod bus;
pub mod chat;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod history;
pub mod session;
pub mod store;

pub use bus::{EventBus, SessionEvent};
pub use chat::{ChatMessage, MessageLog, Role};
pub use config::{AssistantConfig, SessionLimits, StoreLocation};
pub use context::{derive_context, Category, ChatContext, PageView};
pub use endpoint::{ChatBackend, ChatReply, ChatRequest, HttpChatBackend};
pub use error::ChatError;
pub use history::{Snapshot, SNAPSHOT_KEY};
pub use session::{ChatSession, Submission, CONNECTION_FALLBACK, ERROR_FALLBACK};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
