//! Core abstractions for the agent relay.
//!
//! This crate provides the fundamental building blocks:
//! - Agent protocol wire types (descriptor, messages, result variants)
//! - `DisplayContext` - the per-session label prefixed to queries and replies
//! - `AgentConnection` and `Connector` traits

pub mod context;
pub mod protocol;
pub mod traits;

pub use context::{DEFAULT_CONTEXT, DisplayContext};
pub use protocol::{
    CapabilityDescriptor, OutboundRequest, ResponseEvent, RpcError, RpcMethod, RpcResponse,
};
pub use traits::{
    AgentConnection, Connector, CustomHeaders, DiscoveryError, ResponseStream, TransportError,
};
