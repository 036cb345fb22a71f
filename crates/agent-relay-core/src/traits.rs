//! Connection traits and their errors.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::protocol::{CapabilityDescriptor, OutboundRequest, RpcResponse};

/// Custom headers attached to every request of a connection.
pub type CustomHeaders = HashMap<String, String>;

/// Lazily produced responses of a streamed call, in arrival order.
pub type ResponseStream = BoxStream<'static, Result<RpcResponse, TransportError>>;

/// Capability discovery error.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Invalid agent URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid header: {0}")]
    InvalidHeader(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status} fetching capability descriptor from {url}")]
    Status { status: u16, url: String },
    #[error("Invalid capability descriptor: {0}")]
    InvalidDescriptor(String),
}

impl DiscoveryError {
    /// Whether the failure came from reaching the agent at all.
    ///
    /// Gateway failures are reported as 502, everything else as 500.
    #[must_use]
    pub const fn is_gateway(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// RPC transport error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection closed")]
    Closed,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Agent does not support streaming")]
    StreamingUnsupported,
}

/// An open RPC client bound to one capability descriptor.
///
/// Immutable once opened, except for closure.
#[async_trait]
pub trait AgentConnection: Send + Sync {
    /// Descriptor resolved when the connection was opened.
    fn descriptor(&self) -> &CapabilityDescriptor;

    /// Whether `stream` may be called.
    fn supports_streaming(&self) -> bool {
        self.descriptor().supports_streaming()
    }

    /// Unary `message/send`.
    async fn send(&self, request: &OutboundRequest) -> Result<RpcResponse, TransportError>;

    /// Streamed `message/stream`.
    ///
    /// Only legal when [`AgentConnection::supports_streaming`] is true.
    async fn stream(&self, request: &OutboundRequest) -> Result<ResponseStream, TransportError>;

    /// Release the underlying client.
    ///
    /// Returns `true` if this call released it, `false` if already closed.
    fn close(&self) -> bool;

    /// Whether `close` has been called.
    fn is_closed(&self) -> bool;
}

/// Opens agent connections by discovering their capabilities.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Resolve the descriptor at `url` and open a connection to the agent.
    async fn open(
        &self,
        url: &str,
        headers: &CustomHeaders,
    ) -> Result<Arc<dyn AgentConnection>, DiscoveryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_classification() {
        assert!(DiscoveryError::Network("refused".into()).is_gateway());
        assert!(!DiscoveryError::InvalidDescriptor("missing name".into()).is_gateway());
        assert!(
            !DiscoveryError::Status {
                status: 404,
                url: "http://x/".into()
            }
            .is_gateway()
        );
    }
}
