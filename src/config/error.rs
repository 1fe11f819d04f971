//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddress(String),

    #[error("Room capacity must be at least 1")]
    InvalidRoomCapacity,

    #[error("Outbound queue capacity must be at least 1")]
    InvalidQueueCapacity,

    #[error("Pong wait must be at least 1 second")]
    InvalidPongWait,

    #[error("Write wait must be at least 1 second")]
    InvalidWriteWait,

    #[error("Max message size must be at least 1 byte")]
    InvalidMessageSize,
}
