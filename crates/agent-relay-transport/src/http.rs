//! HTTP endpoints next to the WebSocket.

use agent_relay_client::{fetch_descriptor, forwardable_headers, validate_descriptor};
use agent_relay_session::{
    SessionId,
    events::{DebugKind, DebugLog},
    normalizer::debug_payload,
};
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;

/// Debug mirror id for `/agent-card` traffic.
pub const AGENT_CARD_LOG_ID: &str = "http-agent-card";

#[derive(Debug, Deserialize)]
struct AgentCardRequest {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    sid: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// `POST /agent-card`: fetch and check an agent's capability descriptor.
///
/// Non-standard request headers are forwarded to the agent. Request and
/// response are mirrored to the browser session named by `sid`.
pub async fn agent_card(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!("Failed to parse /agent-card request: {e}");
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body.");
        }
    };
    let request = match AgentCardRequest::deserialize(&payload) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Failed to parse /agent-card request: {e}");
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body.");
        }
    };
    let (Some(url), Some(sid)) = (
        request.url.filter(|url| !url.is_empty()),
        request.sid.filter(|sid| !sid.is_empty()),
    ) else {
        return error_response(StatusCode::BAD_REQUEST, "Agent URL and SID are required.");
    };

    let custom_headers = forwardable_headers(&headers);
    let session = sid.parse::<SessionId>().ok();
    let mirror = |kind: DebugKind, data: Value| {
        let Some(session) = session else {
            return;
        };
        state.dispatcher.registry().outbox(session).debug_log(DebugLog {
            kind,
            data,
            id: AGENT_CARD_LOG_ID.to_owned(),
        });
    };

    mirror(
        DebugKind::Request,
        json!({
            "endpoint": "/agent-card",
            "payload": payload,
            "custom_headers": custom_headers,
        }),
    );

    let (status, body) = match fetch_descriptor(&url, &custom_headers, state.card_timeout).await {
        Ok(card) => {
            let validation_errors = validate_descriptor(&card);
            (
                StatusCode::OK,
                json!({
                    "card": debug_payload(&card, "CapabilityDescriptor"),
                    "validation_errors": validation_errors,
                }),
            )
        }
        Err(e) if e.is_gateway() => {
            tracing::error!(%url, error = %e, "Failed to connect to agent");
            (
                StatusCode::BAD_GATEWAY,
                json!({ "error": format!("Failed to connect to agent: {e}") }),
            )
        }
        Err(e) => {
            tracing::error!(%url, error = %e, "An internal server error occurred");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": format!("An internal server error occurred: {e}") }),
            )
        }
    };

    mirror(
        DebugKind::Response,
        json!({ "status": status.as_u16(), "payload": body }),
    );
    (status, Json(body)).into_response()
}

/// `GET /health`.
pub async fn health() -> &'static str {
    "ok"
}
