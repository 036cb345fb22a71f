//! Turns agent results into chat responses and debug mirrors.

use agent_relay_core::{
    DisplayContext, ResponseEvent, RpcResponse,
    protocol::extract_text,
};
use serde::Serialize;
use serde_json::{Value, json};

use crate::events::{ChatResponse, DebugKind, DebugLog};

/// Shown for an error envelope without a message.
pub const UNKNOWN_ERROR: &str = "Unknown error";
/// Shown for a task snapshot, which carries no text of its own.
pub const TASK_PLACEHOLDER: &str = "Agent Progress";
/// Shown for result kinds the relay does not recognize.
pub const FALLBACK_TEXT: &str = "random Text";

/// Display text for a successful result, before the context prefix.
#[must_use]
pub fn display_text(event: &ResponseEvent) -> String {
    match event {
        ResponseEvent::Task(_) => TASK_PLACEHOLDER.to_owned(),
        ResponseEvent::StatusUpdate(update) => update
            .status
            .message
            .as_ref()
            .map(|message| extract_text(&message.parts))
            .unwrap_or_default(),
        ResponseEvent::ArtifactUpdate(update) => extract_text(&update.artifact.parts),
        ResponseEvent::Message(message) => extract_text(&message.parts),
        ResponseEvent::Unknown(_) => FALLBACK_TEXT.to_owned(),
    }
}

/// A chat response and the debug mirror that accompanies it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub display: ChatResponse,
    pub debug: DebugLog,
}

/// Normalize one RPC response for a session.
///
/// Error envelopes short-circuit to `"Error: <message>"` with no context
/// prefix. Results are prefixed with the context label and a newline.
#[must_use]
pub fn normalize(
    response: &RpcResponse,
    request_id: &str,
    context: &DisplayContext,
) -> NormalizedEvent {
    match response {
        RpcResponse::Error(error) => {
            let message = error.message.as_deref().unwrap_or(UNKNOWN_ERROR);
            NormalizedEvent {
                display: ChatResponse {
                    response: format!("Error: {message}"),
                    id: request_id.to_owned(),
                },
                debug: DebugLog {
                    kind: DebugKind::Error,
                    data: debug_payload(error, "RpcError"),
                    id: request_id.to_owned(),
                },
            }
        }
        RpcResponse::Result(event) => {
            let id = event.response_id().unwrap_or(request_id).to_owned();

            let mut data = debug_payload(event, event.type_name());
            if let Value::Object(fields) = &mut data {
                fields.insert("id".to_owned(), Value::String(id.clone()));
            }

            NormalizedEvent {
                display: ChatResponse {
                    response: context.reply(&display_text(event)),
                    id: id.clone(),
                },
                debug: DebugLog {
                    kind: DebugKind::Response,
                    data,
                    id,
                },
            }
        }
    }
}

/// Serialize a value for a debug mirror.
///
/// Never fails: a value that cannot be serialized is replaced by a note
/// naming its type, so the chat response is still delivered.
pub fn debug_payload<T: Serialize + ?Sized>(value: &T, type_name: &str) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!(error = %e, r#type = type_name, "Failed to serialize response for debug log");
        json!({
            "error": "Failed to serialize complete response",
            "type": type_name,
        })
    })
}
