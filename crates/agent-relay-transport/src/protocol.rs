//! Wire framing for browser events.
//!
//! One WebSocket text frame carries one `{"event": ..., "data": ...}` object.

use agent_relay_session::{InboundEvent, OutboundEvent};
use thiserror::Error;

/// A frame that could not be read or written.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Invalid event frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Binary frame is not UTF-8")]
    NotUtf8,
}

/// Parse a text frame into an inbound event.
///
/// # Errors
/// Returns error if the frame is not a known event with a valid payload.
pub fn decode(text: &str) -> Result<InboundEvent, FrameError> {
    Ok(serde_json::from_str(text)?)
}

/// Parse a binary frame holding UTF-8 JSON.
///
/// # Errors
/// Returns error if the bytes are not UTF-8 or [`decode`] fails.
pub fn decode_binary(bytes: &[u8]) -> Result<InboundEvent, FrameError> {
    let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotUtf8)?;
    decode(text)
}

/// Render an outbound event as a text frame.
///
/// # Errors
/// Returns error if the payload cannot be serialized.
pub fn encode(event: &OutboundEvent) -> Result<String, FrameError> {
    Ok(serde_json::to_string(event)?)
}
