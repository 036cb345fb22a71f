//! Agent relay server.
//!
//! Run with: cargo run -p agent-relay-server
//!
//! Browsers connect to ws://localhost:5001/ws.

mod config;

use std::sync::Arc;

use agent_relay_client::HttpConnector;
use agent_relay_session::{RelayDispatcher, SessionRegistry};
use agent_relay_transport::{AppState, create_router};
use anyhow::Context;
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Args;

const DEFAULT_LOG_FILTER: &str = "agent_relay=info,tower_http=info";

fn init_tracing(log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(env_filter);
    if log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_json);

    let dispatcher = RelayDispatcher::new(
        SessionRegistry::new(),
        Arc::new(HttpConnector::new(args.request_timeout())),
        args.relay_config(),
    );
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        default_agent = %dispatcher.config().default_agent_url,
        "Starting agent relay"
    );

    let app = create_router(AppState::new(dispatcher, args.card_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    tracing::info!("Server listening on http://{}", args.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
