//! Real-time WebSocket API for live updates.
//!
//! - `/ws?token=<grant token>` - WebSocket endpoint
//! - `/api/realtime/stats` - Statistics about real-time connections
//!
//! A token comes from `POST /api/realtime/auth`. The connection is refused
//! with `401` when the token is unknown or expired.
//!
//! ## WebSocket Protocol
//!
//! ```json
//! // Subscribe to a conversation
//! {"type": "subscribe", "channel": "conversation:c-123"}
//!
//! // Unsubscribe from a channel
//! {"type": "unsubscribe", "channel": "conversation:c-123"}
//!
//! // Publish a typing indicator
//! {"type": "publish", "channel": "conversation:c-123", "event": "typing", "data": {}}
//!
//! // Ping for keepalive
//! {"type": "ping"}
//! ```
//!
//! Events arrive as
//! `{"type": "event", "channel", "event", "data", "timestamp", "event_id"}`.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use parley_realtime::{Client, ClientCommand, EventHub, ServerMessage};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::{ApiError, AppState};
use crate::observability::MetricsState;

/// Create the real-time API routes.
pub fn realtime_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/api/realtime/stats", get(get_stats))
}

/// Query of the WebSocket endpoint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WsQuery {
    pub token: String,
}

/// WebSocket upgrade handler.
///
/// The grant is checked before the upgrade so a bad token gets a plain
/// HTTP error rather than an immediately closed socket. The client is only
/// registered with the hub once the socket exists.
async fn ws_handler(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    if query.token.is_empty() {
        return Err(ApiError::Unauthorized("token is required".into()));
    }

    state.realtime.verify(&query.token)?;

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let hub = state.realtime.clone();
    let metrics = state.metrics.clone();
    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, hub, metrics, query.token))
        .into_response())
}

fn reply(client: &Client, message: &ServerMessage) {
    if let Ok(json) = serde_json::to_string(message) {
        let _ = client.send(json);
    }
}

/// Handle a WebSocket connection.
async fn handle_socket(
    mut socket: WebSocket,
    hub: Arc<EventHub>,
    metrics: Arc<MetricsState>,
    token: String,
) {
    // The grant may have expired or the hub filled up since the upgrade.
    let (client, mut receiver) = match hub.connect(&token) {
        Ok(pair) => pair,
        Err(e) => {
            warn!(error = %e, "Failed to connect client after upgrade");
            let message = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Ok(json) = serde_json::to_string(&message) {
                let _ = socket.send(Message::Text(json.into())).await;
            }
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let client_id = client.id.clone();
    metrics.websocket_connections.inc();
    info!(client_id = %client_id, user_id = %client.metadata.user_id, "WebSocket client connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Forward hub frames to the socket.
    let client_id_clone = client_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = receiver.recv().await {
            if ws_sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        debug!(client_id = %client_id_clone, "Send task ended");
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let text_str: &str = &text;
                match serde_json::from_str::<ClientCommand>(text_str) {
                    Ok(cmd) => match hub.handle_command(&client, cmd) {
                        Ok(response) => reply(&client, &response),
                        Err(e) => {
                            debug!(client_id = %client_id, error = %e, "Command rejected");
                            reply(
                                &client,
                                &ServerMessage::Error {
                                    message: e.to_string(),
                                },
                            );
                        }
                    },
                    Err(e) => {
                        debug!(client_id = %client_id, error = %e, "Invalid message format");
                        reply(
                            &client,
                            &ServerMessage::Error {
                                message: format!("Invalid message format: {}", e),
                            },
                        );
                    }
                }
            }
            Ok(Message::Close(_)) => {
                debug!(client_id = %client_id, "WebSocket close received");
                break;
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Binary(_)) => {
                debug!(client_id = %client_id, "Binary message ignored");
            }
            Err(e) => {
                error!(client_id = %client_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    send_task.abort();
    hub.disconnect(&client_id);
    metrics.websocket_connections.dec();
    info!(client_id = %client_id, "WebSocket client disconnected");
}

/// Statistics response.
#[derive(Serialize)]
pub struct StatsResponse {
    /// Current number of WebSocket connections.
    pub current_connections: usize,
    /// Total connections since server start.
    pub total_connections: u64,
    /// Total subscriptions since server start.
    pub total_subscriptions: u64,
    /// Total events broadcast since server start.
    pub total_events: u64,
    /// Publishes that failed after the message was persisted.
    pub publish_failures: u64,
    /// Grants issued since server start.
    pub grants_issued: u64,
    /// Grants currently held.
    pub active_grants: usize,
}

/// Get real-time statistics.
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.realtime.stats();
    Json(StatsResponse {
        current_connections: stats.current_connections,
        total_connections: stats.total_connections,
        total_subscriptions: stats.total_subscriptions,
        total_events: stats.total_events,
        publish_failures: stats.publish_failures,
        grants_issued: stats.grants_issued,
        active_grants: stats.active_grants,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_serialization() {
        let stats = StatsResponse {
            current_connections: 2,
            total_connections: 5,
            total_subscriptions: 9,
            total_events: 12,
            publish_failures: 1,
            grants_issued: 4,
            active_grants: 3,
        };

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["current_connections"], 2);
        assert_eq!(json["publish_failures"], 1);
        assert_eq!(json["active_grants"], 3);
    }
}
