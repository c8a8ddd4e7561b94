use crate::error::ChatError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub context: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ChatReply {
    /// Extract the assistant text from a reply.
    pub fn into_text(self) -> Result<String, ChatError> {
        if !self.success {
            return Err(ChatError::Rejected(self.message));
        }
        match self.response {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(ChatError::Malformed(
                "success reply without response text".to_string(),
            )),
        }
    }
}

/// Something that answers one chat message at a time.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

/// Talks JSON over HTTP POST to the application's chat endpoint.
pub struct HttpChatBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpChatBackend {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> Result<String, ChatError> {
        debug!("-> Sending to {}: {}", self.endpoint, request.message);

        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("<- Received from {} ({}): {}", self.endpoint, status, body);

        parse_reply(status.as_u16(), &body)
    }
}

/// Decide what an HTTP answer means. An explicit `success: false` body is a
/// rejection whatever the status; otherwise a non-2xx status is a failure.
fn parse_reply(status: u16, body: &str) -> Result<String, ChatError> {
    let ok = (200..300).contains(&status);
    match serde_json::from_str::<ChatReply>(body) {
        Ok(reply) if !reply.success => Err(ChatError::Rejected(reply.message)),
        _ if !ok => Err(ChatError::Status(status)),
        Ok(reply) => reply.into_text(),
        Err(e) => Err(ChatError::Malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_reply_yields_text() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"success":true,"response":"Focus on..."}"#).unwrap();
        assert_eq!(reply.into_text().unwrap(), "Focus on...");
    }

    #[test]
    fn failed_reply_is_a_rejection() {
        let reply: ChatReply =
            serde_json::from_str(r#"{"success":false,"message":"quota"}"#).unwrap();
        let err = reply.into_text().unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "chat endpoint rejected the message: quota"
        );
    }

    #[test]
    fn success_without_text_is_malformed() {
        let reply: ChatReply = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(reply.into_text(), Err(ChatError::Malformed(_))));
    }

    #[test]
    fn error_status_with_failure_body_is_a_rejection() {
        let err = parse_reply(500, r#"{"success":false,"response":"Sorry"}"#).unwrap_err();
        assert!(err.is_rejection());
    }

    #[test]
    fn error_status_without_reply_body() {
        assert!(matches!(
            parse_reply(502, "<html>bad gateway</html>"),
            Err(ChatError::Status(502))
        ));
        assert!(matches!(
            parse_reply(500, r#"{"success":true,"response":"hi"}"#),
            Err(ChatError::Status(500))
        ));
        assert_eq!(parse_reply(200, r#"{"success":true,"response":"hi"}"#).unwrap(), "hi");
    }

    #[test]
    fn request_shape() {
        let req = ChatRequest {
            message: "hi".into(),
            context: serde_json::json!({"page": "/", "type": "dashboard"}),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["message"], "hi");
        assert_eq!(json["context"]["type"], "dashboard");
    }
}
