//! Player identity as seen by other members of a room.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// A player's chosen name. Unique within a room, never changed after join.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Validates and wraps a username.
    ///
    /// Blank names and the literal `"undefined"` (what browsers send for an
    /// unset field) are rejected.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.trim().is_empty() || name == "undefined" {
            return Err(ValidationError::empty_field("name"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public view of a room member.
///
/// Assembled from the server-side client on read; it is a snapshot and
/// does not follow later renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub player_name: String,
    pub player_number: usize,
}

impl PlayerInfo {
    pub fn new(player_name: impl Into<String>, player_number: usize) -> Self {
        Self {
            player_name: player_name.into(),
            player_number,
        }
    }
}
