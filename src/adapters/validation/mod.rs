//! Validation Adapters - payload checks run before message handlers.

mod chat_validator;

pub use chat_validator::ChatMessageValidator;
