//! Wire envelopes exchanged with connected players.
//!
//! Every frame in either direction is one JSON envelope:
//!
//! ```json
//! { "type": "sendMessageToChat", "payload": { ... } }
//! ```
//!
//! Replies and server pushes wrap their data in a result:
//!
//! ```json
//! { "type": "usersInRoom", "payload": { "result": "success", "data": [ ... ] } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::room::OutboundMessage;

// ============================================
// Message Types
// ============================================

/// Server error notice sent before an abnormal close.
pub const ERROR: &str = "ERROR";
/// Current room roster, sent to a player right after joining.
pub const USERS_IN_ROOM: &str = "usersInRoom";
/// A player joined the room.
pub const REGISTER_NEW_PLAYER: &str = "registerNewPlayer";
pub const SEND_MESSAGE_TO_CHAT: &str = "sendMessageToChat";
/// Chat line fanned out to the room.
pub const INPUT_CHAT_MESSAGE: &str = "inputChatMessage";
pub const USER_QUIT_CHAT: &str = "userQuitChat";
pub const READY_TO_START: &str = "readyToStart";
pub const START_GAME: &str = "startGame";
pub const PLAYER_ACTION: &str = "playerAction";

/// Errors encoding or decoding an envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("payload is not a reply")]
    NotAReply,
}

/// Outcome discriminator carried by reply payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Success,
    Error,
}

/// Payload of a reply or push envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyPayload {
    pub result: ResultKind,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

/// A type tag plus an opaque payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            message_type: message_type.into(),
            payload,
        }
    }

    /// Build a reply envelope around `data`.
    pub fn reply(message_type: impl Into<String>, result: ResultKind, data: Value) -> Self {
        let payload = ReplyPayload { result, data };
        Self::new(
            message_type,
            serde_json::to_value(payload).unwrap_or(Value::Null),
        )
    }

    pub fn success(message_type: impl Into<String>, data: Value) -> Self {
        Self::reply(message_type, ResultKind::Success, data)
    }

    pub fn error(message_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::reply(message_type, ResultKind::Error, Value::String(message.into()))
    }

    /// Reply to this envelope, echoing its type.
    pub fn reply_to(&self, result: ResultKind, data: Value) -> Self {
        Self::reply(self.message_type.clone(), result, data)
    }

    pub fn decode(text: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize once into a message that can be queued for many clients.
    pub fn encode(&self) -> Result<OutboundMessage, EnvelopeError> {
        Ok(serde_json::to_string(self)?.into())
    }

    /// Interpret the payload as a reply.
    pub fn reply_payload(&self) -> Result<ReplyPayload, EnvelopeError> {
        ReplyPayload::deserialize(&self.payload).map_err(|_| EnvelopeError::NotAReply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_decodes_type_and_payload() {
        let envelope =
            Envelope::decode(r#"{"type":"playerAction","payload":{"move":"left"}}"#).unwrap();

        assert_eq!(envelope.message_type, PLAYER_ACTION);
        assert_eq!(envelope.payload, json!({"move": "left"}));
    }

    #[test]
    fn missing_payload_decodes_as_null() {
        let envelope = Envelope::decode(r#"{"type":"readyToStart"}"#).unwrap();
        assert!(envelope.payload.is_null());
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = Envelope::decode(r#"{"payload":{}}"#).unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }

    #[test]
    fn reply_serializes_result_and_data() {
        let reply = Envelope::success(START_GAME, json!("MAP"));
        let text = reply.encode().unwrap();

        assert!(text.contains(r#""type":"startGame""#));
        assert!(text.contains(r#""result":"success""#));
        assert!(text.contains(r#""data":"MAP""#));
    }

    #[test]
    fn null_data_is_omitted() {
        let reply = Envelope::reply(READY_TO_START, ResultKind::Success, Value::Null);
        let text = reply.encode().unwrap();
        assert!(!text.contains("data"));
    }

    #[test]
    fn reply_survives_encode_decode() {
        let data = json!([{"playerName": "alice", "playerNumber": 1}]);
        let sent = Envelope::success(USERS_IN_ROOM, data.clone());

        let received = Envelope::decode(&sent.encode().unwrap()).unwrap();
        let payload = received.reply_payload().unwrap();

        assert_eq!(received.message_type, USERS_IN_ROOM);
        assert_eq!(payload.result, ResultKind::Success);
        assert_eq!(payload.data, data);
    }

    #[test]
    fn error_reply_echoes_request_type() {
        let request = Envelope::new(SEND_MESSAGE_TO_CHAT, json!({}));
        let reply = request.reply_to(ResultKind::Error, json!("Date is too old"));

        assert_eq!(reply.message_type, SEND_MESSAGE_TO_CHAT);
        assert_eq!(reply.reply_payload().unwrap().result, ResultKind::Error);
    }

    #[test]
    fn plain_payload_is_not_a_reply() {
        let envelope = Envelope::new(PLAYER_ACTION, json!({"move": "left"}));
        assert!(matches!(
            envelope.reply_payload(),
            Err(EnvelopeError::NotAReply)
        ));
    }
}
