//! Lifecycle of a single player connection.
//!
//! ```text
//! Connecting → Upgrading → Registering → Active → Draining → Closed
//!                              │                                ▲
//!                              └──────── join refused ──────────┘
//! ```
//!
//! `Draining` is entered when either pump loop stops; it is where the
//! client is unregistered and its outbound queue closed, once.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::StateMachine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// HTTP request received, nothing validated yet.
    Connecting,
    /// Switching protocols to WebSocket.
    Upgrading,
    /// Join handshake against the hub in progress.
    Registering,
    /// Both pump loops running.
    Active,
    /// One loop stopped; cleanup in progress.
    Draining,
    /// Transport released.
    Closed,
}

impl ConnectionState {
    /// Returns true while the pump loops should keep running.
    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionState::Active)
    }
}

impl StateMachine for ConnectionState {
    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Connecting => vec![Upgrading, Closed],
            Upgrading => vec![Registering, Closed],
            Registering => vec![Active, Closed],
            Active => vec![Draining],
            Draining => vec![Closed],
            Closed => vec![],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Upgrading => "upgrading",
            ConnectionState::Registering => "registering",
            ConnectionState::Active => "active",
            ConnectionState::Draining => "draining",
            ConnectionState::Closed => "closed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionState::*;

    #[test]
    fn happy_path_is_allowed() {
        let mut state = Connecting;
        for next in [Upgrading, Registering, Active, Draining, Closed] {
            state = state.transition_to(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn refused_join_skips_active_and_draining() {
        assert!(Registering.can_transition_to(&Closed));
        assert!(!Registering.can_transition_to(&Draining));
    }

    #[test]
    fn active_connection_must_drain_before_closing() {
        assert!(!Active.can_transition_to(&Closed));
        assert!(Active.can_transition_to(&Draining));
    }

    #[test]
    fn draining_cannot_be_reentered() {
        assert!(!Draining.can_transition_to(&Draining));
        assert!(!Closed.can_transition_to(&Draining));
    }
}
