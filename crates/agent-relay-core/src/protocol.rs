//! Agent protocol wire types.
//!
//! Covers the capability descriptor an agent publishes, the message shapes
//! sent over JSON-RPC, and the result variants an agent can answer with.

use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;
use uuid::Uuid;

/// Descriptor path used when the discovery URL carries no path of its own.
pub const DEFAULT_DESCRIPTOR_PATH: &str = ".well-known/agent-card.json";

/// Output mode the relay asks agents to answer in.
pub const TEXT_PLAIN: &str = "text/plain";

const JSONRPC_VERSION: &str = "2.0";

const TASK_KIND: &str = "task";
const STATUS_UPDATE_KIND: &str = "status-update";
const ARTIFACT_UPDATE_KIND: &str = "artifact-update";
const MESSAGE_KIND: &str = "message";

fn task_kind() -> String {
    TASK_KIND.to_owned()
}

fn status_update_kind() -> String {
    STATUS_UPDATE_KIND.to_owned()
}

fn artifact_update_kind() -> String {
    ARTIFACT_UPDATE_KIND.to_owned()
}

fn message_kind() -> String {
    MESSAGE_KIND.to_owned()
}

/// Optional protocol features an agent declares.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_transition_history: Option<bool>,
}

/// A single skill advertised by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_modes: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_modes: Option<Vec<String>>,
}

/// Capability descriptor ("agent card") published by an agent.
///
/// Immutable once resolved; the connection that resolved it owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityDescriptor {
    pub name: String,
    pub description: String,
    /// RPC endpoint of the agent.
    pub url: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    pub capabilities: AgentCapabilities,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub skills: Vec<AgentSkill>,
}

impl CapabilityDescriptor {
    /// Whether the agent accepts `message/stream`.
    #[must_use]
    pub fn supports_streaming(&self) -> bool {
        self.capabilities.streaming == Some(true)
    }
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One content part of a message or artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    File { file: Value },
    Data { data: Value },
    #[serde(other)]
    Unsupported,
}

impl Part {
    /// Create a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Concatenate the text parts, skipping everything else.
#[must_use]
pub fn extract_text(parts: &[Part]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// A protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default = "message_kind")]
    pub kind: String,
}

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    InputRequired,
    Completed,
    Canceled,
    Failed,
    Rejected,
    AuthRequired,
    #[serde(other)]
    Unknown,
}

/// Current status of a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Output produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parts: Vec<Part>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// A task snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default = "task_kind")]
    pub kind: String,
}

/// Streamed notice that a task changed status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatusUpdateEvent {
    pub task_id: String,
    #[serde(default)]
    pub context_id: String,
    pub status: TaskStatus,
    #[serde(rename = "final", default)]
    pub is_final: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default = "status_update_kind")]
    pub kind: String,
}

/// Streamed notice that a task produced (part of) an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskArtifactUpdateEvent {
    pub task_id: String,
    #[serde(default)]
    pub context_id: String,
    pub artifact: Artifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_chunk: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default = "artifact_update_kind")]
    pub kind: String,
}

/// A successful agent result, discriminated by its `kind` field.
///
/// Serializes back to the wire shape it was read from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseEvent {
    Task(Task),
    StatusUpdate(TaskStatusUpdateEvent),
    ArtifactUpdate(TaskArtifactUpdateEvent),
    Message(Message),
    /// Unrecognized kind, or a known kind that failed to parse.
    Unknown(Value),
}

impl ResponseEvent {
    /// Classify a raw `result` value.
    ///
    /// Never fails: anything that does not parse as a known variant is kept
    /// verbatim as [`ResponseEvent::Unknown`].
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        let parsed = match value.get("kind").and_then(Value::as_str) {
            Some(TASK_KIND) => serde_json::from_value(value.clone()).map(Self::Task),
            Some(STATUS_UPDATE_KIND) => {
                serde_json::from_value(value.clone()).map(Self::StatusUpdate)
            }
            Some(ARTIFACT_UPDATE_KIND) => {
                serde_json::from_value(value.clone()).map(Self::ArtifactUpdate)
            }
            Some(MESSAGE_KIND) => serde_json::from_value(value.clone()).map(Self::Message),
            _ => return Self::Unknown(value),
        };

        parsed.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Malformed agent result, treating as unknown");
            Self::Unknown(value)
        })
    }

    /// Wire tag of this event.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Task(_) => TASK_KIND,
            Self::StatusUpdate(_) => STATUS_UPDATE_KIND,
            Self::ArtifactUpdate(_) => ARTIFACT_UPDATE_KIND,
            Self::Message(_) => MESSAGE_KIND,
            Self::Unknown(value) => value
                .get("kind")
                .and_then(Value::as_str)
                .unwrap_or("unknown"),
        }
    }

    /// Protocol type name, used when the event cannot be mirrored in full.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Task(_) => "Task",
            Self::StatusUpdate(_) => "TaskStatusUpdateEvent",
            Self::ArtifactUpdate(_) => "TaskArtifactUpdateEvent",
            Self::Message(_) => "Message",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Identifier carried by the event itself, if it has one.
    #[must_use]
    pub fn response_id(&self) -> Option<&str> {
        match self {
            Self::Task(task) => Some(task.id.as_str()),
            _ => None,
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// One JSON-RPC response: either an error envelope or a result.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Result(ResponseEvent),
    Error(RpcError),
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

impl RpcResponse {
    /// Parse a JSON-RPC response body.
    ///
    /// # Errors
    /// Returns error if the body is not a response envelope.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let envelope: RawEnvelope = serde_json::from_value(value)?;
        match (envelope.error, envelope.result) {
            (Some(error), _) => Ok(Self::Error(error)),
            (None, Some(result)) => Ok(Self::Result(ResponseEvent::from_value(result))),
            (None, None) => Err(serde_json::Error::custom(
                "response carries neither result nor error",
            )),
        }
    }

    /// Parse a JSON-RPC response from text.
    ///
    /// # Errors
    /// Returns error if the text is not a response envelope.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        Self::from_value(serde_json::from_str(text)?)
    }
}

/// Output-mode negotiation for a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    pub accepted_output_modes: Vec<String>,
}

/// Parameters of `message/send` and `message/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,
}

/// A request the relay sends to an agent.
///
/// Fields are private: once built, a request is never changed.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    params: MessageSendParams,
}

impl OutboundRequest {
    /// Build a user message with a single text part and a fresh id.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), text)
    }

    /// Build a user message with a caller-chosen id.
    #[must_use]
    pub fn with_id(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            params: MessageSendParams {
                message: Message {
                    role: Role::User,
                    parts: vec![Part::text(text)],
                    message_id: id.into(),
                    context_id: None,
                    task_id: None,
                    metadata: None,
                    kind: message_kind(),
                },
                configuration: Some(MessageSendConfiguration {
                    accepted_output_modes: vec![TEXT_PLAIN.to_owned()],
                }),
            },
        }
    }

    /// Request identifier; also used as the JSON-RPC id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.params.message.message_id
    }

    /// The text sent to the agent.
    #[must_use]
    pub fn text(&self) -> String {
        extract_text(&self.params.message.parts)
    }

    /// Wrap into a JSON-RPC call.
    #[must_use]
    pub fn to_rpc(&self, method: RpcMethod) -> RpcRequest<'_> {
        RpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: self.id(),
            method,
            params: &self.params,
        }
    }
}

/// Agent RPC methods used by the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcMethod {
    #[serde(rename = "message/send")]
    Send,
    #[serde(rename = "message/stream")]
    Stream,
}

/// JSON-RPC request body.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: &'a str,
    pub method: RpcMethod,
    pub params: &'a MessageSendParams,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_descriptor_streaming_flag() {
        let card: CapabilityDescriptor = serde_json::from_value(json!({
            "name": "web_agent",
            "description": "A Web Agent that can automate tasks given to it",
            "url": "http://localhost:10002/",
            "version": "1.0.0",
            "defaultInputModes": ["text"],
            "defaultOutputModes": ["text"],
            "capabilities": {"streaming": true},
            "skills": [{
                "id": "web_agent_skill",
                "name": "web_agent_skill",
                "description": "A web agent to automate tasks",
                "tags": ["playwright", "webagent"],
                "examples": ["go to google.com and search for iphone"]
            }]
        }))
        .unwrap();

        assert!(card.supports_streaming());
        assert_eq!(card.skills[0].tags, ["playwright", "webagent"]);
    }

    #[test]
    fn test_descriptor_without_streaming() {
        let card: CapabilityDescriptor = serde_json::from_value(json!({
            "name": "a", "description": "b", "url": "http://x/", "version": "1",
            "defaultInputModes": [], "defaultOutputModes": [],
            "capabilities": {}, "skills": []
        }))
        .unwrap();
        assert!(!card.supports_streaming());
    }

    #[test]
    fn test_descriptor_missing_required_field() {
        let result = serde_json::from_value::<CapabilityDescriptor>(json!({"name": "a"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_outbound_request_wire_shape() {
        let request = OutboundRequest::with_id("req-1", "Amazon hello");
        let body = serde_json::to_value(request.to_rpc(RpcMethod::Stream)).unwrap();

        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "id": "req-1",
                "method": "message/stream",
                "params": {
                    "message": {
                        "role": "user",
                        "parts": [{"kind": "text", "text": "Amazon hello"}],
                        "messageId": "req-1",
                        "kind": "message"
                    },
                    "configuration": {"acceptedOutputModes": ["text/plain"]}
                }
            })
        );
    }

    #[test]
    fn test_fresh_ids_differ() {
        let a = OutboundRequest::user_text("x");
        let b = OutboundRequest::user_text("x");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_classify_status_update() {
        let event = ResponseEvent::from_value(json!({
            "kind": "status-update",
            "taskId": "t1",
            "contextId": "c1",
            "final": false,
            "status": {
                "state": "working",
                "message": {
                    "role": "agent",
                    "messageId": "m1",
                    "parts": [{"kind": "text", "text": "Searching"}, {"kind": "data", "data": {}}]
                }
            }
        }));

        let ResponseEvent::StatusUpdate(update) = &event else {
            panic!("expected status update, got {event:?}");
        };
        assert_eq!(update.status.state, TaskState::Working);
        let message = update.status.message.as_ref().unwrap();
        assert_eq!(extract_text(&message.parts), "Searching");
        assert_eq!(event.response_id(), None);
    }

    #[test]
    fn test_classify_task_carries_id() {
        let event = ResponseEvent::from_value(json!({
            "kind": "task",
            "id": "task-9",
            "contextId": "c",
            "status": {"state": "submitted"}
        }));
        assert_eq!(event.kind(), "task");
        assert_eq!(event.response_id(), Some("task-9"));
    }

    #[test]
    fn test_unknown_kind_is_kept_verbatim() {
        let raw = json!({"kind": "push-notification", "x": 1});
        let event = ResponseEvent::from_value(raw.clone());
        assert_eq!(event, ResponseEvent::Unknown(raw));
        assert_eq!(event.kind(), "push-notification");
        assert_eq!(event.type_name(), "Unknown");
    }

    #[test]
    fn test_malformed_known_kind_degrades() {
        let event = ResponseEvent::from_value(json!({"kind": "artifact-update"}));
        assert!(matches!(event, ResponseEvent::Unknown(_)));
    }

    #[test]
    fn test_unknown_part_kind_does_not_fail() {
        let parts: Vec<Part> =
            serde_json::from_value(json!([{"kind": "video"}, {"kind": "text", "text": "ok"}]))
                .unwrap();
        assert_eq!(parts[0], Part::Unsupported);
        assert_eq!(extract_text(&parts), "ok");
    }

    #[test]
    fn test_error_envelope() {
        let response = RpcResponse::parse(
            r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32000,"message":"boom"}}"#,
        )
        .unwrap();
        assert_eq!(
            response,
            RpcResponse::Error(RpcError {
                code: -32000,
                message: Some("boom".into()),
                data: None,
            })
        );
    }

    #[test]
    fn test_empty_envelope_is_rejected() {
        assert!(RpcResponse::parse(r#"{"jsonrpc":"2.0","id":"1"}"#).is_err());
    }

    #[test]
    fn test_event_serializes_back_to_wire_shape() {
        let raw = json!({
            "kind": "artifact-update",
            "taskId": "t",
            "contextId": "c",
            "artifact": {"artifactId": "a", "parts": [{"kind": "text", "text": "done"}]}
        });
        let event = ResponseEvent::from_value(raw.clone());
        assert_eq!(serde_json::to_value(&event).unwrap(), raw);
    }
}
