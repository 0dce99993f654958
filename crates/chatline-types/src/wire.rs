//! JSON payloads exchanged with the chat endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for both the streaming and the synchronous endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub message: String,
    /// Free-form context forwarded to the backend (e.g., current topic).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ChatRequest {
    pub fn new(user_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            message: message.into(),
            context: None,
        }
    }

    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Response body of the synchronous endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_omits_missing_context() {
        let body = serde_json::to_value(ChatRequest::new("u1", "hi")).unwrap();
        assert_eq!(body, json!({"user_id": "u1", "message": "hi"}));
    }

    #[test]
    fn test_request_with_context() {
        let req = ChatRequest::new("u1", "hi").with_context(json!({"topic": "kafka"}));
        let body = serde_json::to_value(req).unwrap();
        assert_eq!(body["context"]["topic"], "kafka");
    }

    #[test]
    fn test_reply_tolerates_minimal_body() {
        let reply: ChatReply = serde_json::from_str(r#"{"response":"Hello"}"#).unwrap();
        assert_eq!(reply.response, "Hello");
        assert_eq!(reply.conversation_id, None);
    }
}
