//! Reasons a join handshake can be refused.

use serde::Serialize;
use thiserror::Error;

/// Capacity-class failure reported synchronously at join time.
///
/// A connection that receives one of these never becomes active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "kebab-case")]
pub enum JoinRejection {
    #[error("duplicate user name")]
    DuplicateUsername,

    #[error("room is full")]
    RoomFull,

    #[error("room does not exist")]
    RoomMissing,
}

impl JoinRejection {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            JoinRejection::DuplicateUsername => "duplicate-username",
            JoinRejection::RoomFull => "room-full",
            JoinRejection::RoomMissing => "room-missing",
        }
    }
}
