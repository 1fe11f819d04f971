//! Chat and gameplay payloads relayed between room members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;

/// Messages dated before 2024-01-01T00:00:00Z are rejected as stale.
pub const CHAT_EPOCH: i64 = 1_704_067_200;

/// A chat line sent by a player to the rest of the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Stamped by the server from the sender's session; clients may omit it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_name: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_create: Option<DateTime<Utc>>,
}

impl ChatMessage {
    /// Checks the message is worth relaying.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.date_create {
            Some(date) if date.timestamp() >= CHAT_EPOCH => {}
            _ => {
                return Err(ValidationError::invalid_format(
                    "dateCreate",
                    "Date is too old",
                ))
            }
        }

        if self.content.trim().is_empty() || self.content == "undefined" {
            return Err(ValidationError::invalid_format("content", "text is missing"));
        }

        Ok(())
    }
}

/// A gameplay action relayed verbatim to the room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerAction {
    #[serde(rename = "playerName")]
    pub user_name: String,
    pub action: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(content: &str, date: &str) -> ChatMessage {
        serde_json::from_value(json!({"content": content, "dateCreate": date})).unwrap()
    }

    #[test]
    fn fresh_message_with_text_is_valid() {
        assert!(message("hello", "2025-03-01T10:00:00Z").validate().is_ok());
    }

    #[test]
    fn message_before_epoch_is_rejected() {
        let err = message("hello", "2023-12-31T23:59:59Z").validate().unwrap_err();
        assert!(err.to_string().contains("Date is too old"));
    }

    #[test]
    fn message_at_epoch_is_accepted() {
        assert!(message("hello", "2024-01-01T00:00:00Z").validate().is_ok());
    }

    #[test]
    fn message_without_date_is_rejected() {
        let msg: ChatMessage = serde_json::from_value(json!({"content": "hi"})).unwrap();
        assert!(msg.validate().is_err());
    }

    #[test]
    fn blank_or_undefined_content_is_rejected() {
        let err = message("   ", "2025-03-01T10:00:00Z").validate().unwrap_err();
        assert!(err.to_string().contains("text is missing"));
        assert!(message("undefined", "2025-03-01T10:00:00Z").validate().is_err());
    }

    #[test]
    fn empty_user_name_is_not_serialized() {
        let msg = message("hello", "2025-03-01T10:00:00Z");
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("userName").is_none());
    }

    #[test]
    fn player_action_uses_player_name_field() {
        let action = PlayerAction {
            user_name: "bob".to_string(),
            action: json!({"move": "left"}),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, json!({"playerName": "bob", "action": {"move": "left"}}));
    }
}
