//! Session and dispatch errors.

use agent_relay_core::{DiscoveryError, TransportError};
use thiserror::Error;

use crate::events::SessionId;

/// Registry error.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),
}

/// Failure of one stage of a chat-message flow.
///
/// Every variant is scoped to the session that sent the event; none of them
/// stops the relay.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Empty or whitespace-only input.
    #[error("Please enter a message.")]
    Validation,
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}
