//! Game start and in-game relay.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::websocket::connection::ConnectionContext;
use crate::adapters::websocket::dispatcher::{EffectHandler, HandlerError, ReplyHandler};
use crate::adapters::websocket::lobby::Lobby;
use crate::adapters::websocket::messages::{self, Envelope};
use crate::domain::lobby::PlayerAction;

/// Broadcasts a player's action to the whole room, tagged with their name.
pub struct RelayPlayerAction;

#[async_trait]
impl EffectHandler for RelayPlayerAction {
    async fn handle(&self, ctx: &ConnectionContext, payload: Value) -> Result<(), HandlerError> {
        let action = PlayerAction {
            user_name: ctx.client().username().to_string(),
            action: payload,
        };
        let data = serde_json::to_value(action).map_err(|e| HandlerError::Fatal(e.to_string()))?;
        ctx.broadcast_to_room(&Envelope::success(messages::PLAYER_ACTION, data))
            .await?;
        Ok(())
    }
}

/// Starts the game: no one else joins the room, and the sender gets the map.
pub struct StartGame {
    lobby: Arc<Lobby>,
}

impl StartGame {
    pub fn new(lobby: Arc<Lobby>) -> Self {
        Self { lobby }
    }
}

#[async_trait]
impl ReplyHandler for StartGame {
    async fn handle(&self, ctx: &ConnectionContext, _payload: Value) -> Result<Value, HandlerError> {
        self.lobby.close_waiting_room(ctx.room_id()).await;
        let room = ctx
            .client()
            .room()
            .ok_or_else(|| HandlerError::warning("room no longer exists"))?;
        Ok(Value::String(room.game_map().to_string()))
    }
}

/// Closes the sender's room to new players.
pub struct ReadyToStart {
    lobby: Arc<Lobby>,
}

impl ReadyToStart {
    pub fn new(lobby: Arc<Lobby>) -> Self {
        Self { lobby }
    }
}

#[async_trait]
impl EffectHandler for ReadyToStart {
    async fn handle(&self, ctx: &ConnectionContext, _payload: Value) -> Result<(), HandlerError> {
        self.lobby.close_waiting_room(ctx.room_id()).await;
        Ok(())
    }
}
