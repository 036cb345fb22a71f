//! Emission handle for one session.

use crate::{
    events::{ChatResponse, ClientInitialized, DebugLog, Empty, OutboundEvent, SessionId},
    registry::SessionRegistry,
};

/// Sends events to one session, dropping them once it has disconnected.
#[derive(Clone)]
pub struct Outbox {
    sid: SessionId,
    registry: SessionRegistry,
}

impl Outbox {
    #[must_use]
    pub const fn new(sid: SessionId, registry: SessionRegistry) -> Self {
        Self { sid, registry }
    }

    #[must_use]
    pub const fn sid(&self) -> SessionId {
        self.sid
    }

    /// Send an event; `false` if the session is gone.
    pub fn emit(&self, event: OutboundEvent) -> bool {
        self.registry.emit(self.sid, event)
    }

    pub fn chat_response(&self, response: impl Into<String>, id: impl Into<String>) -> bool {
        self.emit(OutboundEvent::ChatResponse(ChatResponse {
            response: response.into(),
            id: id.into(),
        }))
    }

    pub fn debug_log(&self, log: DebugLog) -> bool {
        self.emit(OutboundEvent::DebugLog(log))
    }

    pub fn typing(&self) -> bool {
        self.emit(OutboundEvent::UserTyping(Empty {}))
    }

    pub fn stop_typing(&self) -> bool {
        self.emit(OutboundEvent::UserStopTyping(Empty {}))
    }

    pub fn client_initialized(&self, outcome: ClientInitialized) -> bool {
        self.emit(OutboundEvent::ClientInitialized(outcome))
    }
}
