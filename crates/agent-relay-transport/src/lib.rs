//! Browser-facing surface of the agent relay.
//!
//! Provides:
//! - Event framing over WebSocket text frames
//! - `/ws` - one relay session per socket
//! - `/agent-card` and `/health` HTTP endpoints

use std::time::Duration;

use agent_relay_session::RelayDispatcher;
use axum::{
    Router,
    routing::{get, post},
};

pub mod http;
pub mod protocol;
pub mod websocket;

pub use protocol::FrameError;

/// Timeout for `/agent-card` discovery unless configured otherwise.
pub const DEFAULT_CARD_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: RelayDispatcher,
    /// Timeout for `/agent-card` discovery.
    pub card_timeout: Duration,
}

impl AppState {
    #[must_use]
    pub const fn new(dispatcher: RelayDispatcher, card_timeout: Duration) -> Self {
        Self {
            dispatcher,
            card_timeout,
        }
    }
}

/// Build the relay router.
///
/// # Example
/// ```ignore
/// let app = create_router(AppState::new(dispatcher, DEFAULT_CARD_TIMEOUT))
///     .layer(TraceLayer::new_for_http());
/// ```
#[must_use]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket::ws_handler))
        .route("/agent-card", post(http::agent_card))
        .route("/health", get(http::health))
        .with_state(state)
}
