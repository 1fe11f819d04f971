//! Message handlers for the lobby protocol.
//!
//! | type                | route  | behaviour                                         |
//! |---------------------|--------|---------------------------------------------------|
//! | `sendMessageToChat` | reply  | relay as `inputChatMessage`, reply `"sent"`       |
//! | `playerAction`      | effect | relay `{playerName, action}` to the room          |
//! | `startGame`         | reply  | close the waiting room, reply with the game map   |
//! | `readyToStart`      | effect | close the waiting room                            |
//! | `userQuitChat`      | effect | relay the sender's player info; also sent on exit |

mod chat;
mod game;
mod room;

use std::sync::Arc;

pub use chat::SendMessageToChat;
pub use game::{ReadyToStart, RelayPlayerAction, StartGame};
pub use room::{announce_arrival, AnnounceDeparture};

use crate::adapters::validation::ChatMessageValidator;

use super::dispatcher::Dispatcher;
use super::lobby::Lobby;
use super::messages;

/// The dispatch table served to every lobby connection.
pub fn lobby_dispatcher(lobby: Arc<Lobby>) -> Dispatcher {
    Dispatcher::new()
        .reply(messages::SEND_MESSAGE_TO_CHAT, SendMessageToChat)
        .validate_with(messages::SEND_MESSAGE_TO_CHAT, ChatMessageValidator)
        .effect(messages::PLAYER_ACTION, RelayPlayerAction)
        .reply(messages::START_GAME, StartGame::new(lobby.clone()))
        .effect(messages::READY_TO_START, ReadyToStart::new(lobby))
        .effect(messages::USER_QUIT_CHAT, AnnounceDeparture)
        .announce_departure_as(messages::USER_QUIT_CHAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::hub::Hub;
    use crate::config::HubConfig;
    use crate::ports::FixedMapGenerator;

    #[tokio::test]
    async fn lobby_dispatcher_routes_every_client_message() {
        let lobby = Arc::new(Lobby::new(
            Hub::spawn(),
            Arc::new(FixedMapGenerator::new("MAP")),
            &HubConfig::default(),
        ));
        let dispatcher = lobby_dispatcher(lobby);

        for message_type in [
            messages::SEND_MESSAGE_TO_CHAT,
            messages::PLAYER_ACTION,
            messages::START_GAME,
            messages::READY_TO_START,
            messages::USER_QUIT_CHAT,
        ] {
            assert!(dispatcher.handles(message_type), "{message_type}");
        }
        assert!(!dispatcher.handles(messages::INPUT_CHAT_MESSAGE));
    }
}
