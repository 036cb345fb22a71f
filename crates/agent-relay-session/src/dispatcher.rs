//! Relay dispatcher: routes browser events to agents and back.

use std::{future::Future, sync::Arc, time::Duration};

use agent_relay_core::{
    AgentConnection, Connector, CustomHeaders, DisplayContext, OutboundRequest, RpcResponse,
};
use futures::StreamExt;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::DispatchError,
    events::{
        ChatMessageRequest, ClientInitialized, InboundEvent, InitializeClientRequest,
        JoinRequest, OutboundEvent, SessionId,
    },
    normalizer::normalize,
    outbox::Outbox,
    registry::SessionRegistry,
};

/// Agent tried when a session has no connection of its own.
pub const DEFAULT_AGENT_URL: &str = "http://localhost:10001/";
/// Pause between the typing indicator and the welcome message.
pub const DEFAULT_WELCOME_DELAY: Duration = Duration::from_millis(500);

/// Relay behavior settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub default_agent_url: String,
    pub welcome_delay: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            default_agent_url: DEFAULT_AGENT_URL.to_owned(),
            welcome_delay: DEFAULT_WELCOME_DELAY,
        }
    }
}

/// Handles inbound events for all sessions.
///
/// Cheap to clone. Callers must feed one session's events to
/// [`RelayDispatcher::handle`] sequentially; different sessions may be
/// handled concurrently.
#[derive(Clone)]
pub struct RelayDispatcher {
    registry: SessionRegistry,
    connector: Arc<dyn Connector>,
    config: Arc<RelayConfig>,
}

impl RelayDispatcher {
    #[must_use]
    pub fn new(
        registry: SessionRegistry,
        connector: Arc<dyn Connector>,
        config: RelayConfig,
    ) -> Self {
        Self {
            registry,
            connector,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub const fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Register a new transport connection.
    ///
    /// The session exists once this returns. The returned future makes the
    /// best-effort default agent connection.
    pub fn connect(
        &self,
        sid: SessionId,
        sender: mpsc::UnboundedSender<OutboundEvent>,
    ) -> impl Future<Output = ()> + Send + 'static {
        self.registry.insert(sid, sender);
        let dispatcher = self.clone();
        async move {
            dispatcher
                .registry
                .connect_default(
                    sid,
                    dispatcher.connector.as_ref(),
                    &dispatcher.config.default_agent_url,
                )
                .await;
        }
    }

    /// Tear down a transport connection.
    pub fn disconnect(&self, sid: SessionId) -> bool {
        self.registry.disconnect(sid)
    }

    /// Process one inbound event to completion.
    pub async fn handle(&self, sid: SessionId, event: InboundEvent) {
        match event {
            InboundEvent::Join(request) => self.join(sid, request).await,
            InboundEvent::InitializeClient(request) => {
                self.initialize_client(sid, request).await;
            }
            InboundEvent::ChatMessage(request) => self.chat_message(sid, request).await,
        }
    }

    /// Set the display context and greet the session the first time.
    pub async fn join(&self, sid: SessionId, request: JoinRequest) {
        let Some(option) = request.option.filter(|option| !option.is_empty()) else {
            tracing::debug!(%sid, "Join without option");
            return;
        };

        let context = DisplayContext::new(option);
        let first = self
            .registry
            .set_context(sid, context.clone())
            .and_then(|()| self.registry.mark_greeted(sid));
        match first {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%sid, %context, "Welcome already sent");
                return;
            }
            Err(e) => {
                tracing::warn!(%sid, error = %e, "Join for unknown session");
                return;
            }
        }
        tracing::info!(%sid, %context, "Session joined");

        let outbox = self.registry.outbox(sid);
        outbox.typing();
        tokio::time::sleep(self.config.welcome_delay).await;
        outbox.chat_response(context.welcome(), Uuid::new_v4().to_string());
        outbox.stop_typing();
    }

    /// Connect the session to an explicitly chosen agent.
    ///
    /// On failure the session keeps whatever connection it had.
    pub async fn initialize_client(&self, sid: SessionId, request: InitializeClientRequest) {
        let outbox = self.registry.outbox(sid);
        let Some(url) = request.url.filter(|url| !url.is_empty()) else {
            outbox.client_initialized(ClientInitialized::error("Agent URL is required."));
            return;
        };
        tracing::info!(%sid, %url, "Initialize client request");

        let connection = match self.connector.open(&url, &request.custom_headers).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(%sid, %url, error = %e, "Failed to initialize client");
                outbox.client_initialized(ClientInitialized::error(e.to_string()));
                return;
            }
        };

        match self.registry.install_connection(sid, connection) {
            Ok(()) => {
                tracing::info!(%sid, %url, "Client initialized");
                outbox.client_initialized(ClientInitialized::success());
            }
            Err(e) => tracing::debug!(%sid, error = %e, "Session closed during initialization"),
        }
    }

    /// Relay one chat message to the session's agent.
    pub async fn chat_message(&self, sid: SessionId, request: ChatMessageRequest) {
        if !self.registry.contains(sid) {
            tracing::debug!(%sid, "Chat message for unknown session");
            return;
        }

        let request_id = Uuid::new_v4().to_string();
        let outbox = self.registry.outbox(sid);

        let context = request
            .option
            .as_deref()
            .filter(|option| !option.is_empty())
            .map_or_else(|| self.registry.context(sid), DisplayContext::new);
        if let Err(e) = self.registry.set_context(sid, context.clone()) {
            tracing::debug!(%sid, error = %e, "Session closed before dispatch");
            return;
        }

        let text = match validate(request.text()) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(%sid, "Empty message received");
                outbox.chat_response(format!("\n{e}"), &request_id);
                return;
            }
        };
        tracing::info!(%sid, %context, "Processing chat message");

        let connection = match self.ensure_connection(sid).await {
            Ok(connection) => connection,
            Err(e) => {
                tracing::error!(%sid, error = %e, "Failed to connect to agent");
                outbox.chat_response(format!("\nFailed to connect to agent: {e}"), &request_id);
                return;
            }
        };

        let outbound = OutboundRequest::with_id(request_id.clone(), context.query(&text));

        outbox.typing();
        let result = relay(connection.as_ref(), &outbound, &outbox, &context).await;
        if let Err(e) = result {
            tracing::error!(%sid, error = %e, "Failed to send message");
            outbox.chat_response(format!("\nError: {e}"), &request_id);
        }
        outbox.stop_typing();
    }

    /// The session's connection, opening one to the default agent if needed.
    async fn ensure_connection(
        &self,
        sid: SessionId,
    ) -> Result<Arc<dyn AgentConnection>, DispatchError> {
        if let Some(connection) = self.registry.connection(sid) {
            return Ok(connection);
        }

        let url = &self.config.default_agent_url;
        tracing::info!(%sid, %url, "Auto-initializing agent connection");
        let connection = self.connector.open(url, &CustomHeaders::new()).await?;
        self.registry.install_connection(sid, connection.clone())?;
        Ok(connection)
    }
}

/// Sanitize user text, rejecting empty input.
fn validate(raw: &str) -> Result<String, DispatchError> {
    let text = html_escape::encode_text(raw);
    if text.trim().is_empty() {
        return Err(DispatchError::Validation);
    }
    Ok(text.into_owned())
}

/// Send the request and emit every result as it arrives.
async fn relay(
    connection: &dyn AgentConnection,
    request: &OutboundRequest,
    outbox: &Outbox,
    context: &DisplayContext,
) -> Result<(), DispatchError> {
    let emit = |response: RpcResponse| {
        let event = normalize(&response, request.id(), context);
        outbox.chat_response(event.display.response, event.display.id);
        outbox.debug_log(event.debug);
    };

    if connection.supports_streaming() {
        tracing::debug!(sid = %outbox.sid(), "Using streaming mode");
        let mut events = connection.stream(request).await?;
        while let Some(response) = events.next().await {
            emit(response?);
        }
    } else {
        tracing::debug!(sid = %outbox.sid(), "Using non-streaming mode");
        emit(connection.send(request).await?);
    }
    Ok(())
}
