//! WebSocket handler for the chat relay.
//!
//! The `/ws` endpoint upgrades an HTTP connection to a WebSocket. Each
//! accepted socket gets a fresh connection identifier (and therefore a
//! fresh session), is registered in the [`ConnectionRegistry`], and is
//! split into:
//!
//! - a **writer task** draining the connection's bounded outbound queue
//!   onto the socket, and
//! - a **read loop** that hands every inbound text frame to the relay
//!   service in its own task. Turn ordering per connection comes from the
//!   relay's turn gate, not from this loop, so the processing
//!   acknowledgment for a queued second turn still goes out immediately.
//!
//! Protocol ping/pong frames are answered by the WebSocket layer itself.
//! On disconnect the registry entry and turn-gate lock are dropped;
//! in-flight turns then observe the endpoint as gone and abandon quietly.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use chatrelay_core::connection::ConnectionRecord;
use chatrelay_core::delivery::DeliveryChannel;
use chatrelay_observe::genai_attrs::OP_GENERATE_STREAM;
use chatrelay_types::wire::ServerEnvelope;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use crate::registry::OUTBOUND_BUFFER;
use crate::state::AppState;

const CONNECTED_NOTICE: &str = "Connected. Send a message to start chatting.";

/// Upgrade an HTTP request to a relay WebSocket connection.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Core WebSocket connection handler.
async fn handle_ws_connection(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::now_v7().to_string();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<Message>(OUTBOUND_BUFFER);
    state.registry.register(
        ConnectionRecord {
            connection_id: connection_id.clone(),
            user_id: None,
            display_name: None,
        },
        tx,
    );
    tracing::info!(connection_id, "client connected");

    // Writer task: the only place that touches the socket's send half.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if ws_sender.send(message).await.is_err() {
                break;
            }
        }
    });

    if let Err(err) = state
        .registry
        .send(&connection_id, &ServerEnvelope::system(CONNECTED_NOTICE))
        .await
    {
        tracing::debug!(connection_id, %err, "failed to send connected notice");
    }

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let relay = state.relay.clone();
                let cid = connection_id.clone();
                let span = tracing::info_span!(
                    "relay_turn",
                    connection_id = %cid,
                    gen_ai.operation.name = OP_GENERATE_STREAM,
                );
                tokio::spawn(async move { relay.handle_raw(&cid, &text).await }.instrument(span));
            }
            Ok(Message::Close(_)) => break,
            Err(err) => {
                tracing::debug!(connection_id, %err, "websocket receive error");
                break;
            }
            // Binary, ping, and pong frames are handled by the protocol layer.
            Ok(_) => {}
        }
    }

    state.registry.unregister(&connection_id);
    state.gate.release_connection(&connection_id);
    writer.abort();
    tracing::info!(connection_id, "client disconnected");
}
