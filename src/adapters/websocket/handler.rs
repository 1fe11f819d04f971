//! HTTP entry points: the WebSocket join endpoint and a health check.
//!
//! Join handshake:
//! 1. Validate the `name` query parameter
//! 2. Upgrade to WebSocket
//! 3. Place the player in the lobby's waiting room
//! 4. Send the roster and announce the new player
//! 5. Run the connection pump until disconnect

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::SinkExt;
use serde::Deserialize;
use serde_json::json;

use crate::domain::lobby::{ConnectionState, Username};

use super::connection::{ConnectionContext, ConnectionPump, Lifecycle, PumpSettings};
use super::dispatcher::Dispatcher;
use super::handlers::announce_arrival;
use super::lobby::Lobby;
use super::messages::{self, Envelope};
use super::transport::{split_websocket, Frame};

/// State shared by every request.
#[derive(Clone)]
pub struct WebSocketState {
    pub lobby: Arc<Lobby>,
    pub dispatcher: Arc<Dispatcher>,
    pub settings: PumpSettings,
}

impl WebSocketState {
    pub fn new(lobby: Arc<Lobby>, dispatcher: Arc<Dispatcher>, settings: PumpSettings) -> Self {
        Self {
            lobby,
            dispatcher,
            settings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinParams {
    pub name: Option<String>,
}

/// Route: `GET /joinGame?name=<username>`
pub async fn join_game(
    State(state): State<WebSocketState>,
    Query(params): Query<JoinParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let username = match params.name.map(Username::new) {
        Some(Ok(username)) => username,
        Some(Err(err)) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        None => {
            return (StatusCode::BAD_REQUEST, "name query parameter is required").into_response()
        }
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let lifecycle = Lifecycle::new();
    lifecycle.advance(ConnectionState::Upgrading);
    ws.max_message_size(state.settings.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, username, state, lifecycle))
}

/// Run an upgraded connection from handshake to close.
async fn handle_socket(
    socket: WebSocket,
    username: Username,
    state: WebSocketState,
    lifecycle: Lifecycle,
) {
    let (mut sink, stream) = split_websocket(socket);
    lifecycle.advance(ConnectionState::Registering);

    let membership = match state.lobby.join(username.clone()).await {
        Ok(membership) => membership,
        Err(err) => {
            tracing::info!(username = %username, error = %err, "join refused");
            if let Ok(text) = Envelope::error(messages::USERS_IN_ROOM, err.to_string()).encode() {
                let _ = sink.send(Frame::Text(text.to_string())).await;
            }
            let _ = sink.send(Frame::Close).await;
            lifecycle.advance(ConnectionState::Closed);
            return;
        }
    };

    let ctx = ConnectionContext::new(membership.client, state.lobby.hub().clone());
    tracing::info!(client = %ctx.client(), "player joined");

    if let Err(err) = announce_arrival(&ctx).await {
        tracing::warn!(client = %ctx.client(), error = %err, "could not announce arrival");
    }

    let pump = ConnectionPump::new(ctx, state.dispatcher.clone(), state.settings, lifecycle);
    pump.spawn(membership.outbound, sink, stream).join().await;
    tracing::info!(username = %username, "player disconnected");
}

/// Route: `GET /health`
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "message": "Backend is up and running!"
    }))
}

/// Create axum router for the lobby endpoints.
///
/// # Example
///
/// ```ignore
/// let app = websocket_router().with_state(state);
/// ```
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new()
        .route("/joinGame", get(join_game))
        .route("/health", get(health_check))
}
