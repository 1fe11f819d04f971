//! Lobby domain - who is playing, what they say, and how their
//! connection moves through its lifecycle.

mod chat;
mod connection_state;
mod player;
mod rejection;

pub use chat::{ChatMessage, PlayerAction, CHAT_EPOCH};
pub use connection_state::ConnectionState;
pub use player::{PlayerInfo, Username};
pub use rejection::JoinRejection;
