//! WebSocket transport for browser sessions.

use agent_relay_session::{
    InboundEvent, OutboundEvent, RelayDispatcher, SessionId,
    events::{Connected, DebugKind, DebugLog},
};
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{AppState, protocol};

/// Debug mirror id for frames the relay could not read.
pub const FRAME_ERROR_ID: &str = "ws-frame";

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.dispatcher))
}

/// Run one browser session for the life of its socket.
///
/// Inbound events go to a per-session task that handles them one at a time,
/// in arrival order. Outbound events from any task are funneled through one
/// channel to the socket.
async fn handle_socket(socket: WebSocket, dispatcher: RelayDispatcher) {
    let (mut sender, mut receiver) = socket.split();
    let sid: SessionId = Uuid::new_v4();

    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundEvent>();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let frame = match protocol::encode(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(%sid, "Failed to serialize event: {e}");
                    continue;
                }
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(OutboundEvent::Connected(Connected { sid }));
    let auto_connect = dispatcher.connect(sid, tx.clone());

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<InboundEvent>();
    let session_task = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            auto_connect.await;
            while let Some(event) = inbound_rx.recv().await {
                dispatcher.handle(sid, event).await;
            }
        })
    };

    while let Some(msg) = receiver.next().await {
        let decoded = match msg {
            Ok(Message::Text(text)) => protocol::decode(text.as_str()),
            Ok(Message::Binary(data)) => protocol::decode_binary(&data),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!(%sid, "WebSocket error: {e}");
                break;
            }
        };

        match decoded {
            Ok(event) => {
                if inbound_tx.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(%sid, "Invalid client frame: {e}");
                let _ = tx.send(OutboundEvent::DebugLog(DebugLog {
                    kind: DebugKind::Error,
                    data: json!({"error": e.to_string()}),
                    id: FRAME_ERROR_ID.to_owned(),
                }));
            }
        }
    }

    // In-flight work is left to finish; anything it emits from here on is
    // discarded by the registry.
    dispatcher.disconnect(sid);
    drop(inbound_tx);
    drop(tx);
    drop(session_task);
    send_task.abort();
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use agent_relay_session::{
        RelayConfig, SessionRegistry,
        test_support::{FakeConnection, FakeConnector, Reply, agent_text},
    };
    use futures::{SinkExt, StreamExt};
    use serde_json::{Value, json};
    use tokio::{net::TcpListener, sync::Notify};
    use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

    use crate::{AppState, create_router};

    async fn serve(connector: FakeConnector) -> (String, SessionRegistry) {
        let registry = SessionRegistry::new();
        let dispatcher = agent_relay_session::RelayDispatcher::new(
            registry.clone(),
            Arc::new(connector),
            RelayConfig {
                welcome_delay: Duration::ZERO,
                ..RelayConfig::default()
            },
        );
        let app = create_router(AppState::new(dispatcher, Duration::from_secs(5)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("ws://{addr}/ws"), registry)
    }

    async fn next_event<S>(socket: &mut S) -> Value
    where
        S: futures::Stream<Item = Result<WsMessage, tokio_tungstenite::tungstenite::Error>>
            + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
                .await
                .expect("timed out waiting for event")
                .expect("socket closed")
                .expect("socket error");
            if msg.is_text() {
                return serde_json::from_str(msg.to_text().unwrap()).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn test_session_chat_round_trip() {
        let connection = FakeConnection::unary();
        connection.push(Reply::Unary(Ok(agent_text("pong"))));
        let (url, registry) = serve(FakeConnector::with(connection.clone())).await;

        let (mut socket, _) = connect_async(&url).await.unwrap();

        let connected = next_event(&mut socket).await;
        assert_eq!(connected["event"], "connected");

        let frame = json!({"event": "chat message", "data": {"query": "ping"}});
        socket
            .send(WsMessage::text(frame.to_string()))
            .await
            .unwrap();

        let events = [
            next_event(&mut socket).await,
            next_event(&mut socket).await,
            next_event(&mut socket).await,
            next_event(&mut socket).await,
        ];
        let names: Vec<&str> = events
            .iter()
            .map(|event| event["event"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            ["user typing", "chat response", "debug_log", "user stop typing"]
        );
        assert_eq!(events[1]["data"]["response"], "GENERAL\npong");
        assert_eq!(registry.len(), 1);

        socket.close(None).await.unwrap();
        for _ in 0..100 {
            if registry.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(registry.is_empty());
        assert_eq!(connection.releases(), 1);
    }

    #[tokio::test]
    async fn test_session_messages_are_handled_one_at_a_time() {
        let gate = Arc::new(Notify::new());
        let connection = FakeConnection::unary();
        connection.push(Reply::Gated(gate.clone(), agent_text("first")));
        let (url, _registry) = serve(FakeConnector::with(connection.clone())).await;

        let (mut socket, _) = connect_async(&url).await.unwrap();
        next_event(&mut socket).await;

        for query in ["one", "two"] {
            let frame = json!({"event": "chat message", "data": {"query": query}});
            socket
                .send(WsMessage::text(frame.to_string()))
                .await
                .unwrap();
        }

        assert_eq!(next_event(&mut socket).await["event"], "user typing");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(connection.sends(), 1);
        gate.notify_one();

        let mut names = Vec::new();
        let mut replies = Vec::new();
        while names.len() < 7 {
            let event = next_event(&mut socket).await;
            if event["event"] == "chat response" {
                replies.push(event["data"]["response"].as_str().unwrap().to_owned());
            }
            names.push(event["event"].as_str().unwrap().to_owned());
        }
        assert_eq!(
            names,
            [
                "chat response",
                "debug_log",
                "user stop typing",
                "user typing",
                "chat response",
                "debug_log",
                "user stop typing",
            ]
        );
        assert_eq!(replies, ["GENERAL\nfirst", "GENERAL\nok"]);
        assert_eq!(connection.sends(), 2);
    }

    #[tokio::test]
    async fn test_invalid_frame_is_reported_not_fatal() {
        let (url, _registry) = serve(FakeConnector::failing("no agent")).await;
        let (mut socket, _) = connect_async(&url).await.unwrap();
        next_event(&mut socket).await;

        socket
            .send(WsMessage::text("not json".to_owned()))
            .await
            .unwrap();
        let error = next_event(&mut socket).await;
        assert_eq!(error["event"], "debug_log");
        assert_eq!(error["data"]["type"], "error");
        assert_eq!(error["data"]["id"], "ws-frame");

        let frame = json!({"event": "chat message", "data": {"query": "  "}});
        socket
            .send(WsMessage::text(frame.to_string()))
            .await
            .unwrap();
        let reply = next_event(&mut socket).await;
        assert_eq!(reply["data"]["response"], "\nPlease enter a message.");
    }
}
