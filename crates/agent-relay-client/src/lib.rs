//! HTTP client side of the agent relay.
//!
//! Provides:
//! - Capability descriptor discovery and validation
//! - Custom header handling
//! - `HttpAgentConnection` - JSON-RPC unary and SSE streaming calls
//! - `HttpConnector` - the production `Connector`

pub mod connection;
pub mod discovery;
pub mod headers;
pub mod validation;

pub use connection::{DEFAULT_TIMEOUT, HttpAgentConnection, HttpConnector};
pub use discovery::{DescriptorLocation, discovery_client, fetch_descriptor, resolve_descriptor};
pub use headers::{STANDARD_HEADERS, forwardable_headers, header_map};
pub use validation::validate_descriptor;
