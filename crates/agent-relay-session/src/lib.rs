//! Session orchestration for the agent relay.
//!
//! Provides:
//! - `SessionRegistry` - Per-session agent connection and display state
//! - `normalize` - Agent results to chat responses and debug mirrors
//! - `RelayDispatcher` - Handles inbound browser events

pub mod dispatcher;
pub mod error;
pub mod events;
pub mod normalizer;
pub mod outbox;
pub mod registry;

#[cfg(any(test, feature = "test-util"))]
pub mod test_support;

pub use dispatcher::{RelayConfig, RelayDispatcher};
pub use error::{DispatchError, RegistryError};
pub use events::{InboundEvent, OutboundEvent, SessionId};
pub use normalizer::{NormalizedEvent, normalize};
pub use outbox::Outbox;
pub use registry::SessionRegistry;
