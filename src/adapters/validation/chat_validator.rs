//! Chat payload validation.

use serde_json::Value;

use crate::domain::lobby::ChatMessage;
use crate::ports::{ContentRejected, ContentValidator};

/// Rejects chat payloads that do not decode as a [`ChatMessage`] or fail
/// its rules (stale date, blank text).
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatMessageValidator;

impl ContentValidator for ChatMessageValidator {
    fn validate(&self, payload: &Value) -> Result<(), ContentRejected> {
        let message: ChatMessage = serde_json::from_value(payload.clone()).map_err(|e| {
            ContentRejected::new(format!("Invalid payload for a chat message: {}", e))
        })?;

        message
            .validate()
            .map_err(|e| ContentRejected::new(e.to_string()))
    }
}
