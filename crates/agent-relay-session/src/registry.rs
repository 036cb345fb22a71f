//! Process-wide session registry.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use agent_relay_core::{AgentConnection, Connector, CustomHeaders, DisplayContext};
use tokio::sync::mpsc;

use crate::{
    error::RegistryError,
    events::{OutboundEvent, SessionId},
    outbox::Outbox,
};

/// State kept for one live browser session.
struct SessionEntry {
    connection: Option<Arc<dyn AgentConnection>>,
    context: DisplayContext,
    greeting_sent: bool,
    sender: mpsc::UnboundedSender<OutboundEvent>,
}

impl SessionEntry {
    fn new(sender: mpsc::UnboundedSender<OutboundEvent>) -> Self {
        Self {
            connection: None,
            context: DisplayContext::default(),
            greeting_sent: false,
            sender,
        }
    }

    fn release(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close();
        }
    }
}

/// Mapping from session id to its agent connection and display state.
///
/// All state sits behind one mutex. Critical sections only touch the map and
/// never span an await.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<SessionId, SessionEntry>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, SessionEntry>> {
        // Each critical section is a single map operation, so the map is
        // consistent even if a holder panicked.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give a registered session a connection to the default agent.
    ///
    /// Best effort: failure is logged and the session stays without a
    /// connection until its first message. The lock is not held during
    /// discovery; if the session disconnects meanwhile, the new connection
    /// is closed instead of installed.
    pub async fn connect_default(&self, sid: SessionId, connector: &dyn Connector, url: &str) {
        match connector.open(url, &CustomHeaders::new()).await {
            Ok(connection) => match self.install_connection(sid, connection) {
                Ok(()) => tracing::info!(%sid, %url, "Auto-initialized agent connection"),
                Err(e) => tracing::debug!(%sid, error = %e, "Default connection outlived its session"),
            },
            Err(e) => {
                tracing::warn!(%sid, %url, error = %e, "Failed to auto-initialize agent connection");
            }
        }
    }

    /// Register a session with no agent connection.
    ///
    /// Re-registering an id releases the previous entry's connection.
    pub fn insert(&self, sid: SessionId, sender: mpsc::UnboundedSender<OutboundEvent>) {
        let mut sessions = self.lock();
        if let Some(mut previous) = sessions.insert(sid, SessionEntry::new(sender)) {
            previous.release();
        }
        drop(sessions);
        tracing::info!(%sid, "Session connected");
    }

    /// Close the session's connection, then drop the session.
    ///
    /// Returns `false` if the session was already gone.
    pub fn disconnect(&self, sid: SessionId) -> bool {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(&sid) else {
            return false;
        };
        entry.release();
        sessions.remove(&sid);
        drop(sessions);

        tracing::info!(%sid, "Session disconnected, cleaned up agent connection");
        true
    }

    /// Attach a connection, closing any connection it replaces.
    ///
    /// # Errors
    /// Returns error if the session is gone; the new connection is closed.
    pub fn install_connection(
        &self,
        sid: SessionId,
        connection: Arc<dyn AgentConnection>,
    ) -> Result<(), RegistryError> {
        let mut sessions = self.lock();
        let Some(entry) = sessions.get_mut(&sid) else {
            drop(sessions);
            connection.close();
            return Err(RegistryError::NotFound(sid));
        };
        entry.release();
        entry.connection = Some(connection);
        Ok(())
    }

    /// The session's agent connection, if it has one.
    #[must_use]
    pub fn connection(&self, sid: SessionId) -> Option<Arc<dyn AgentConnection>> {
        self.lock()
            .get(&sid)
            .and_then(|entry| entry.connection.clone())
    }

    #[must_use]
    pub fn has_connection(&self, sid: SessionId) -> bool {
        self.lock()
            .get(&sid)
            .is_some_and(|entry| entry.connection.is_some())
    }

    /// Set the session's display context.
    ///
    /// # Errors
    /// Returns error if the session does not exist.
    pub fn set_context(&self, sid: SessionId, context: DisplayContext) -> Result<(), RegistryError> {
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&sid).ok_or(RegistryError::NotFound(sid))?;
        entry.context = context;
        Ok(())
    }

    /// The session's display context, or the default one.
    #[must_use]
    pub fn context(&self, sid: SessionId) -> DisplayContext {
        self.lock()
            .get(&sid)
            .map(|entry| entry.context.clone())
            .unwrap_or_default()
    }

    /// Mark the greeting as sent.
    ///
    /// Returns `true` only for the first call per session.
    ///
    /// # Errors
    /// Returns error if the session does not exist.
    pub fn mark_greeted(&self, sid: SessionId) -> Result<bool, RegistryError> {
        let mut sessions = self.lock();
        let entry = sessions.get_mut(&sid).ok_or(RegistryError::NotFound(sid))?;
        Ok(!std::mem::replace(&mut entry.greeting_sent, true))
    }

    #[must_use]
    pub fn contains(&self, sid: SessionId) -> bool {
        self.lock().contains_key(&sid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Deliver an event to a live session.
    ///
    /// Liveness is checked here, at emission time: events for a session that
    /// has disconnected are dropped.
    pub fn emit(&self, sid: SessionId, event: OutboundEvent) -> bool {
        let Some(sender) = self.lock().get(&sid).map(|entry| entry.sender.clone()) else {
            tracing::debug!(%sid, "Discarding event for closed session");
            return false;
        };
        sender.send(event).is_ok()
    }

    /// Emission handle bound to one session.
    #[must_use]
    pub fn outbox(&self, sid: SessionId) -> Outbox {
        Outbox::new(sid, self.clone())
    }
}
