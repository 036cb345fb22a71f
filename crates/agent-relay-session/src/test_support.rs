//! Scripted agent connections for tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use agent_relay_core::{
    AgentConnection, CapabilityDescriptor, Connector, CustomHeaders, DiscoveryError,
    OutboundRequest, ResponseEvent, ResponseStream, RpcResponse, TransportError,
    protocol::{AgentCapabilities, Message, Part, Role},
};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{Notify, mpsc};

use crate::events::OutboundEvent;

/// Descriptor for a fake agent.
#[must_use]
pub fn descriptor(streaming: bool) -> CapabilityDescriptor {
    CapabilityDescriptor {
        name: "fake_agent".into(),
        description: "Scripted agent".into(),
        url: "http://fake.agent/".into(),
        version: "0.0.0".into(),
        protocol_version: None,
        capabilities: AgentCapabilities {
            streaming: Some(streaming),
            ..AgentCapabilities::default()
        },
        default_input_modes: vec!["text".into()],
        default_output_modes: vec!["text".into()],
        skills: Vec::new(),
    }
}

/// An agent message result with one text part.
#[must_use]
pub fn agent_text(text: &str) -> RpcResponse {
    RpcResponse::Result(ResponseEvent::Message(Message {
        role: Role::Agent,
        parts: vec![Part::text(text)],
        message_id: uuid::Uuid::new_v4().to_string(),
        context_id: None,
        task_id: None,
        metadata: None,
        kind: "message".into(),
    }))
}

/// One scripted reply, consumed by the next `send` or `stream` call.
pub enum Reply {
    Unary(Result<RpcResponse, TransportError>),
    Stream(Vec<Result<RpcResponse, TransportError>>),
    /// `stream` itself fails before yielding anything.
    StreamOpenFails(TransportError),
    /// Hold the call until the gate is notified, then answer.
    Gated(Arc<Notify>, RpcResponse),
}

/// In-memory [`AgentConnection`] that records what it was asked.
pub struct FakeConnection {
    descriptor: CapabilityDescriptor,
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<OutboundRequest>>,
    sends: AtomicUsize,
    streams: AtomicUsize,
    releases: AtomicUsize,
    closed: AtomicBool,
}

impl FakeConnection {
    fn new(streaming: bool) -> Arc<Self> {
        Arc::new(Self {
            descriptor: descriptor(streaming),
            replies: Mutex::default(),
            requests: Mutex::default(),
            sends: AtomicUsize::new(0),
            streams: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn unary() -> Arc<Self> {
        Self::new(false)
    }

    #[must_use]
    pub fn streaming() -> Arc<Self> {
        Self::new(true)
    }

    /// Queue a reply.
    pub fn push(&self, reply: Reply) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    fn next_reply(&self) -> Option<Reply> {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn record(&self, request: &OutboundRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
    }

    /// Number of RPC calls of either kind.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.sends() + self.streams()
    }

    #[must_use]
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn streams(&self) -> usize {
        self.streams.load(Ordering::SeqCst)
    }

    /// Number of `close` calls that actually released the client.
    #[must_use]
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl AgentConnection for FakeConnection {
    fn descriptor(&self) -> &CapabilityDescriptor {
        &self.descriptor
    }

    async fn send(&self, request: &OutboundRequest) -> Result<RpcResponse, TransportError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.record(request);
        match self.next_reply() {
            Some(Reply::Unary(reply)) => reply,
            Some(Reply::Gated(gate, response)) => {
                gate.notified().await;
                Ok(response)
            }
            Some(_) => Err(TransportError::Decode("scripted stream on unary call".into())),
            None => Ok(agent_text("ok")),
        }
    }

    async fn stream(&self, request: &OutboundRequest) -> Result<ResponseStream, TransportError> {
        self.streams.fetch_add(1, Ordering::SeqCst);
        self.record(request);
        match self.next_reply() {
            Some(Reply::Stream(items)) => Ok(futures::stream::iter(items).boxed()),
            Some(Reply::StreamOpenFails(e)) => Err(e),
            Some(Reply::Gated(gate, response)) => {
                gate.notified().await;
                Ok(futures::stream::iter([Ok(response)]).boxed())
            }
            Some(Reply::Unary(_)) => Err(TransportError::Decode("scripted unary on stream call".into())),
            None => Ok(futures::stream::empty().boxed()),
        }
    }

    fn close(&self) -> bool {
        let released = !self.closed.swap(true, Ordering::SeqCst);
        if released {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
        released
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// [`Connector`] that hands out one connection or always fails.
pub struct FakeConnector {
    connection: Option<Arc<FakeConnection>>,
    failure: String,
    opened: Mutex<Vec<(String, CustomHeaders)>>,
}

impl FakeConnector {
    #[must_use]
    pub fn with(connection: Arc<FakeConnection>) -> Self {
        Self {
            connection: Some(connection),
            failure: String::new(),
            opened: Mutex::default(),
        }
    }

    /// Every `open` fails with a network-level discovery error.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            connection: None,
            failure: message.to_owned(),
            opened: Mutex::default(),
        }
    }

    /// URLs passed to `open`, in call order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// Headers passed to the most recent `open`.
    #[must_use]
    pub fn last_headers(&self) -> Option<CustomHeaders> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .map(|(_, headers)| headers.clone())
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(
        &self,
        url: &str,
        headers: &CustomHeaders,
    ) -> Result<Arc<dyn AgentConnection>, DiscoveryError> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((url.to_owned(), headers.clone()));

        match &self.connection {
            Some(connection) => Ok(Arc::clone(connection) as Arc<dyn AgentConnection>),
            None => Err(DiscoveryError::Network(self.failure.clone())),
        }
    }
}

/// Everything currently queued for a session.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
