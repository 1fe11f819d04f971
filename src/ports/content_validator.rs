//! Content Validator Port - per-message-type payload checks.
//!
//! The dispatcher consults a validator registered for a message type
//! before the handler for that type runs. A rejection is reported to the
//! sender only, as a warning; the connection stays open.

use serde_json::Value;
use thiserror::Error;

/// Port for validating decoded envelope payloads.
///
/// # Usage
///
/// ```rust,ignore
/// let validator: Arc<dyn ContentValidator> = Arc::new(ChatMessageValidator);
/// validator.validate(&payload)?;
/// ```
pub trait ContentValidator: Send + Sync {
    /// Validate a payload. `Ok(())` lets the handler run.
    fn validate(&self, payload: &Value) -> Result<(), ContentRejected>;
}

/// A payload that must not reach its handler.
///
/// The message is sent back to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ContentRejected {
    pub message: String,
}

impl ContentRejected {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectAll;

    impl ContentValidator for RejectAll {
        fn validate(&self, _payload: &Value) -> Result<(), ContentRejected> {
            Err(ContentRejected::new("nope"))
        }
    }

    #[test]
    fn validator_is_object_safe() {
        let validator: Box<dyn ContentValidator> = Box::new(RejectAll);
        let err = validator.validate(&Value::Null).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
