//! HTTP agent connection.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use agent_relay_core::{
    AgentConnection, CapabilityDescriptor, Connector, CustomHeaders, DiscoveryError,
    OutboundRequest, ResponseStream, RpcMethod, RpcResponse, TransportError,
};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, Response, header::ACCEPT};

use crate::discovery::{DescriptorLocation, discovery_client, resolve_descriptor};

/// Timeout for discovery and RPC calls unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

fn transport_error(e: &reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status {
        status: status.as_u16(),
        body,
    })
}

/// JSON-RPC connection to one agent over HTTP.
///
/// The client is dropped on [`AgentConnection::close`]; later calls fail with
/// [`TransportError::Closed`].
pub struct HttpAgentConnection {
    client: Mutex<Option<Client>>,
    descriptor: CapabilityDescriptor,
    endpoint: String,
}

impl HttpAgentConnection {
    /// Discover the agent behind `url` and open a connection to it.
    ///
    /// # Errors
    /// Returns error if the headers are invalid or discovery fails.
    pub async fn open(
        url: &str,
        headers: &CustomHeaders,
        timeout: Duration,
    ) -> Result<Self, DiscoveryError> {
        let location = DescriptorLocation::parse(url)?;
        let client = discovery_client(headers, timeout)?;

        let descriptor = resolve_descriptor(&client, &location).await?;
        let endpoint = if descriptor.url.trim().is_empty() {
            format!("{}/", location.base)
        } else {
            descriptor.url.clone()
        };

        tracing::info!(
            agent = %descriptor.name,
            endpoint = %endpoint,
            streaming = descriptor.supports_streaming(),
            "Agent connection opened"
        );

        Ok(Self::new(client, descriptor, endpoint))
    }

    /// Wrap an already resolved descriptor.
    #[must_use]
    pub fn new(client: Client, descriptor: CapabilityDescriptor, endpoint: String) -> Self {
        Self {
            client: Mutex::new(Some(client)),
            descriptor,
            endpoint,
        }
    }

    /// URL the JSON-RPC calls are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> Result<Client, TransportError> {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(TransportError::Closed)
    }
}

#[async_trait]
impl AgentConnection for HttpAgentConnection {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn send(&self, request: &OutboundRequest) -> Result<RpcResponse, TransportError> {
        let client = self.client()?;
        let response = client
            .post(&self.endpoint)
            .json(&request.to_rpc(RpcMethod::Send))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let body = check_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(&e))?;

        let value: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| TransportError::Decode(e.to_string()))?;
        RpcResponse::from_value(value).map_err(|e| TransportError::Decode(e.to_string()))
    }

    async fn stream(&self, request: &OutboundRequest) -> Result<ResponseStream, TransportError> {
        if !self.supports_streaming() {
            return Err(TransportError::StreamingUnsupported);
        }

        let client = self.client()?;
        let response = client
            .post(&self.endpoint)
            .header(ACCEPT, "text/event-stream")
            .json(&request.to_rpc(RpcMethod::Stream))
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let response = check_status(response).await?;

        let events = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| async move {
                match event {
                    Ok(event) if event.data.trim().is_empty() => None,
                    Ok(event) => Some(
                        RpcResponse::parse(&event.data)
                            .map_err(|e| TransportError::Decode(e.to_string())),
                    ),
                    Err(e) => Some(Err(TransportError::Stream(e.to_string()))),
                }
            });

        Ok(events.boxed())
    }

    fn close(&self) -> bool {
        let released = self
            .client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if released {
            tracing::debug!(agent = %self.descriptor.name, "Agent connection closed");
        }
        released
    }

    fn is_closed(&self) -> bool {
        self.client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

/// Opens [`HttpAgentConnection`]s with a fixed timeout.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn open(
        &self,
        url: &str,
        headers: &CustomHeaders,
    ) -> Result<Arc<dyn AgentConnection>, DiscoveryError> {
        let connection = HttpAgentConnection::open(url, headers, self.timeout).await?;
        Ok(Arc::new(connection))
    }
}
