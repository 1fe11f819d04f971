//! Arrival and departure notices.

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::websocket::connection::ConnectionContext;
use crate::adapters::websocket::dispatcher::{EffectHandler, HandlerError};
use crate::adapters::websocket::messages::{self, Envelope};

/// Greet a newly joined client: it gets the roster, the room gets its info.
pub async fn announce_arrival(ctx: &ConnectionContext) -> Result<(), HandlerError> {
    let users = match ctx.client().room() {
        Some(room) => room.users().await,
        None => Vec::new(),
    };
    let roster = serde_json::to_value(users).map_err(|e| HandlerError::Fatal(e.to_string()))?;
    ctx.send_envelope(&Envelope::success(messages::USERS_IN_ROOM, roster))
        .await?;

    let player = serde_json::to_value(ctx.client().player_info())
        .map_err(|e| HandlerError::Fatal(e.to_string()))?;
    ctx.broadcast_to_room(&Envelope::success(messages::REGISTER_NEW_PLAYER, player))
        .await?;
    Ok(())
}

/// Tells the room a player left.
pub struct AnnounceDeparture;

#[async_trait]
impl EffectHandler for AnnounceDeparture {
    async fn handle(&self, ctx: &ConnectionContext, _payload: Value) -> Result<(), HandlerError> {
        let player = serde_json::to_value(ctx.client().player_info())
            .map_err(|e| HandlerError::Fatal(e.to_string()))?;
        let report = ctx
            .broadcast_to_room(&Envelope::success(messages::USER_QUIT_CHAT, player))
            .await?;
        tracing::debug!(client = %ctx.client(), notified = report.len(), "departure announced");
        Ok(())
    }
}
