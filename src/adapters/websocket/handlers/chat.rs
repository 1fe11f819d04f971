//! Chat relay.

use async_trait::async_trait;
use serde_json::Value;

use crate::adapters::websocket::connection::ConnectionContext;
use crate::adapters::websocket::dispatcher::{HandlerError, ReplyHandler};
use crate::adapters::websocket::messages::{self, Envelope};
use crate::domain::lobby::ChatMessage;

/// Relays a chat line to the sender's room under the sender's name.
///
/// Payloads are checked by the chat validator before this runs.
pub struct SendMessageToChat;

#[async_trait]
impl ReplyHandler for SendMessageToChat {
    async fn handle(&self, ctx: &ConnectionContext, payload: Value) -> Result<Value, HandlerError> {
        let mut message: ChatMessage = serde_json::from_value(payload)
            .map_err(|e| HandlerError::warning(format!("Invalid payload for a chat message: {e}")))?;
        message.user_name = ctx.client().username().to_string();

        let data = serde_json::to_value(&message).map_err(|e| HandlerError::Fatal(e.to_string()))?;
        ctx.broadcast_to_room(&Envelope::success(messages::INPUT_CHAT_MESSAGE, data))
            .await?;

        Ok(Value::String("sent".to_string()))
    }
}
