//! Events exchanged with a browser session.
//!
//! Each event travels as `{"event": <name>, "data": <payload>}`.

use agent_relay_core::CustomHeaders;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Session identifier, stable for the life of one transport connection.
pub type SessionId = Uuid;

/// Payload of `join`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub option: Option<String>,
}

/// Payload of `initialize_client`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeClientRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, rename = "customHeaders")]
    pub custom_headers: CustomHeaders,
}

/// Payload of `chat message`. Older clients send `message` instead of `query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub option: Option<String>,
}

impl ChatMessageRequest {
    /// The user's text: `query` if non-empty, otherwise `message`.
    #[must_use]
    pub fn text(&self) -> &str {
        self.query
            .as_deref()
            .filter(|q| !q.is_empty())
            .or(self.message.as_deref())
            .unwrap_or_default()
    }
}

/// Events a browser sends over an established connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "join")]
    Join(JoinRequest),
    #[serde(rename = "initialize_client")]
    InitializeClient(InitializeClientRequest),
    #[serde(rename = "chat message")]
    ChatMessage(ChatMessageRequest),
}

/// Payload of `chat response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub id: String,
}

/// What a debug mirror carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugKind {
    Request,
    Response,
    Error,
}

/// Payload of `debug_log`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugLog {
    #[serde(rename = "type")]
    pub kind: DebugKind,
    pub data: Value,
    pub id: String,
}

/// Outcome reported by `client_initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitStatus {
    Success,
    Error,
}

/// Payload of `client_initialized`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInitialized {
    pub status: InitStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClientInitialized {
    #[must_use]
    pub const fn success() -> Self {
        Self {
            status: InitStatus::Success,
            message: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: InitStatus::Error,
            message: Some(message.into()),
        }
    }
}

/// Payload of `connected`, telling the browser its session id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connected {
    pub sid: SessionId,
}

/// Empty payload, serialized as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Events the relay sends to a browser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundEvent {
    #[serde(rename = "connected")]
    Connected(Connected),
    #[serde(rename = "chat response")]
    ChatResponse(ChatResponse),
    #[serde(rename = "debug_log")]
    DebugLog(DebugLog),
    #[serde(rename = "user typing")]
    UserTyping(Empty),
    #[serde(rename = "user stop typing")]
    UserStopTyping(Empty),
    #[serde(rename = "client_initialized")]
    ClientInitialized(ClientInitialized),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_chat_message_prefers_query() {
        let request = ChatMessageRequest {
            query: Some("from query".into()),
            message: Some("from message".into()),
            option: None,
        };
        assert_eq!(request.text(), "from query");

        let legacy = ChatMessageRequest {
            query: Some(String::new()),
            message: Some("from message".into()),
            option: None,
        };
        assert_eq!(legacy.text(), "from message");
        assert_eq!(ChatMessageRequest::default().text(), "");
    }

    #[test]
    fn test_inbound_wire_names() {
        let event: InboundEvent = serde_json::from_value(json!({
            "event": "initialize_client",
            "data": {"url": "http://localhost:10002/", "customHeaders": {"x-api-key": "k"}}
        }))
        .unwrap();

        let InboundEvent::InitializeClient(request) = event else {
            panic!("wrong event");
        };
        assert_eq!(request.custom_headers["x-api-key"], "k");
    }

    #[test]
    fn test_outbound_wire_shapes() {
        let typing = serde_json::to_value(OutboundEvent::UserTyping(Empty {})).unwrap();
        assert_eq!(typing, json!({"event": "user typing", "data": {}}));

        let init = serde_json::to_value(OutboundEvent::ClientInitialized(
            ClientInitialized::success(),
        ))
        .unwrap();
        assert_eq!(
            init,
            json!({"event": "client_initialized", "data": {"status": "success"}})
        );

        let debug = serde_json::to_value(OutboundEvent::DebugLog(DebugLog {
            kind: DebugKind::Response,
            data: json!({"kind": "task"}),
            id: "r1".into(),
        }))
        .unwrap();
        assert_eq!(debug["data"]["type"], "response");
    }
}
