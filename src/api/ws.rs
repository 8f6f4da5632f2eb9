use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::providers::Directory;
use crate::tracking::{
    ingest, BroadcastBus, ClientMessage, ConnectionRegistry, LocationStore, RawLocation,
    ServerMessage,
};

#[derive(Clone)]
pub struct WsState {
    pub registry: ConnectionRegistry,
    pub store: LocationStore,
    pub bus: BroadcastBus,
    pub directory: Directory,
    pub outbound_queue_capacity: usize,
}

/// WebSocket endpoint for streaming position reports
pub async fn ws_locations(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: WsState) {
    let (mut sender, mut receiver) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::channel(state.outbound_queue_capacity);
    let client_id = state.registry.register(None, outbound_tx).await;
    tracing::info!(client_id = %client_id, "WebSocket client connected");

    // Writer task: drain this connection's outbound queue into the socket.
    // The queue closes once the registry entry is gone (normal disconnect or
    // dropped by the bus), which ends the task and thereby the connection.
    let mut writer_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize server message");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    // The acknowledgment goes through the outbound queue like everything else
    state
        .bus
        .send_to(&client_id, ServerMessage::connected(&client_id, Utc::now()))
        .await;

    // Handle incoming messages from the client
    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        state.registry.touch(&client_id).await;
                        handle_text(&state, &client_id, &text).await;
                    }
                    Some(Ok(Message::Ping(_))) => {
                        // Axum handles pong automatically
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Writer gone: the socket failed or the bus dropped this connection
            _ = &mut writer_task => break,
        }
    }

    // Cleanup
    writer_task.abort();
    state.registry.unregister(&client_id).await;
    state.bus.announce_disconnect(&client_id).await;
    tracing::info!(client_id = %client_id, "WebSocket client disconnected");
}

async fn handle_text(state: &WsState, client_id: &str, text: &str) {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Location(raw)) => handle_location(state, client_id, raw).await,
        Ok(ClientMessage::Ping) => {
            state
                .bus
                .send_to(
                    client_id,
                    ServerMessage::Pong {
                        timestamp: Utc::now(),
                    },
                )
                .await;
        }
        Err(e) => {
            // One bad frame is not fatal; keep the connection open
            tracing::warn!(client_id = %client_id, error = %e, "Unparseable message");
        }
    }
}

async fn handle_location(state: &WsState, client_id: &str, raw: RawLocation) {
    let vehicle_id = raw.vehicle_id.clone();

    match ingest::ingest(&state.registry, &state.store, client_id, raw).await {
        Ok(record) => {
            let update = ServerMessage::LocationUpdate {
                client_id: client_id.to_string(),
                data: record.clone(),
                timestamp: record.timestamp,
            };
            state.bus.publish(&update).await;

            if let Some(vehicle_id) = vehicle_id {
                if let Err(e) = state
                    .directory
                    .record_vehicle_position(&vehicle_id, &record)
                    .await
                {
                    tracing::warn!(vehicle_id = %vehicle_id, error = %e, "Failed to persist vehicle position");
                }
            }
        }
        Err(e) => {
            // Reported to the offending source only; never fans out
            state
                .bus
                .send_to(
                    client_id,
                    ServerMessage::Error {
                        message: e.to_string(),
                        timestamp: Utc::now(),
                    },
                )
                .await;
        }
    }
}
