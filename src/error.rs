use thiserror::Error;

/// Ways a single chat request can fail. None of these reach the caller of
/// `ChatSession::submit`; each becomes one fallback message.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat endpoint returned HTTP {0}")]
    Status(u16),
    #[error("chat endpoint rejected the message: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),
    #[error("malformed chat reply: {0}")]
    Malformed(String),
}

impl ChatError {
    /// Whether the endpoint answered and declined, as opposed to never
    /// producing a usable answer.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ChatError::Rejected(_))
    }
}
