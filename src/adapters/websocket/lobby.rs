//! Waiting-room matchmaking for the join handshake.
//!
//! Players are placed in the current waiting room until it fills up or its
//! game starts; the next player then opens a fresh room.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::config::HubConfig;
use crate::domain::foundation::RoomId;
use crate::domain::lobby::{JoinRejection, Username};
use crate::ports::MapGenerator;

use super::hub::HubHandle;
use super::room::{Client, OutboundMessage, Room};

/// Attempts at registering a freshly generated room id.
const OPEN_ROOM_ATTEMPTS: usize = 3;

/// Why a join failed.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error(transparent)]
    Rejected(#[from] JoinRejection),

    #[error("no room could be opened")]
    RoomUnavailable,
}

/// A registered client and the receiving end of its outbound queue.
#[derive(Debug)]
pub struct Membership {
    pub client: Arc<Client>,
    pub outbound: mpsc::Receiver<OutboundMessage>,
}

pub struct Lobby {
    hub: HubHandle,
    maps: Arc<dyn MapGenerator>,
    room_capacity: usize,
    queue_capacity: usize,
    waiting_room: Mutex<Option<Arc<Room>>>,
}

impl Lobby {
    pub fn new(hub: HubHandle, maps: Arc<dyn MapGenerator>, config: &HubConfig) -> Self {
        Self {
            hub,
            maps,
            room_capacity: config.room_capacity,
            queue_capacity: config.outbound_queue_capacity,
            waiting_room: Mutex::new(None),
        }
    }

    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Place `username` in the waiting room, opening one if needed.
    ///
    /// A full or vanished waiting room is replaced and the join retried
    /// once. A duplicate name is returned as is.
    pub async fn join(&self, username: Username) -> Result<Membership, JoinError> {
        let mut waiting = self.waiting_room.lock().await;
        let mut last_rejection = JoinRejection::RoomMissing;

        for _ in 0..2 {
            let room = match waiting.as_ref() {
                Some(room) => room.clone(),
                None => {
                    let room = self.open_room().await?;
                    *waiting = Some(room.clone());
                    room
                }
            };

            let (client, outbound) = Client::new(username.clone(), &room, self.queue_capacity);
            match self.hub.register_client(&client).await {
                Ok(number) => {
                    if number >= room.capacity() {
                        tracing::debug!(room_id = %room.id(), "waiting room is full");
                        *waiting = None;
                    }
                    return Ok(Membership { client, outbound });
                }
                Err(JoinRejection::DuplicateUsername) => {
                    return Err(JoinRejection::DuplicateUsername.into());
                }
                Err(rejection) => {
                    tracing::warn!(
                        room_id = %room.id(),
                        username = %username,
                        reason = rejection.code(),
                        "join refused, opening a new room"
                    );
                    *waiting = None;
                    last_rejection = rejection;
                }
            }
        }

        Err(last_rejection.into())
    }

    /// Stop placing players in `room_id`. Returns false if it was not the
    /// waiting room.
    pub async fn close_waiting_room(&self, room_id: &RoomId) -> bool {
        let mut waiting = self.waiting_room.lock().await;
        if waiting.as_ref().is_some_and(|room| room.id() == room_id) {
            *waiting = None;
            tracing::debug!(room_id = %room_id, "waiting room closed");
            true
        } else {
            false
        }
    }

    pub async fn waiting_room(&self) -> Option<Arc<Room>> {
        self.waiting_room.lock().await.clone()
    }

    async fn open_room(&self) -> Result<Arc<Room>, JoinError> {
        for _ in 0..OPEN_ROOM_ATTEMPTS {
            let room = Arc::new(Room::new(
                RoomId::generate(),
                self.room_capacity,
                self.maps.generate(),
            ));
            if self.hub.register_room(room.clone()).await {
                tracing::info!(room_id = %room.id(), "opened room");
                return Ok(room);
            }
        }
        Err(JoinError::RoomUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::hub::Hub;
    use crate::ports::FixedMapGenerator;

    fn lobby(capacity: usize) -> Lobby {
        let config = HubConfig {
            room_capacity: capacity,
            ..Default::default()
        };
        Lobby::new(
            Hub::spawn(),
            Arc::new(FixedMapGenerator::new("MAP")),
            &config,
        )
    }

    fn name(s: &str) -> Username {
        Username::new(s).unwrap()
    }

    #[tokio::test]
    async fn first_join_opens_a_room() {
        let lobby = lobby(4);

        let member = lobby.join(name("alice")).await.unwrap();

        assert_eq!(member.client.player_number(), 1);
        let room = lobby.waiting_room().await.unwrap();
        assert_eq!(room.id(), member.client.room_id());
        assert_eq!(room.game_map(), "MAP");
        assert_eq!(lobby.hub().room_count().await, 1);
    }

    #[tokio::test]
    async fn players_share_the_waiting_room_until_full() {
        let lobby = lobby(2);

        let alice = lobby.join(name("alice")).await.unwrap();
        let bob = lobby.join(name("bob")).await.unwrap();
        assert_eq!(alice.client.room_id(), bob.client.room_id());
        assert!(lobby.waiting_room().await.is_none());

        let carol = lobby.join(name("carol")).await.unwrap();
        assert_ne!(carol.client.room_id(), alice.client.room_id());
        assert_eq!(carol.client.player_number(), 1);
        assert_eq!(lobby.hub().room_count().await, 2);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let lobby = lobby(4);
        let _alice = lobby.join(name("alice")).await.unwrap();

        let err = lobby.join(name("alice")).await.unwrap_err();

        assert!(matches!(
            err,
            JoinError::Rejected(JoinRejection::DuplicateUsername)
        ));
        assert_eq!(lobby.hub().room_count().await, 1);
    }

    #[tokio::test]
    async fn vanished_waiting_room_is_replaced() {
        let lobby = lobby(4);
        let alice = lobby.join(name("alice")).await.unwrap();
        lobby.hub().unregister_room(alice.client.room_id()).await;

        let bob = lobby.join(name("bob")).await.unwrap();

        assert_ne!(bob.client.room_id(), alice.client.room_id());
        assert_eq!(bob.client.player_number(), 1);
    }

    #[tokio::test]
    async fn closing_the_waiting_room_starts_a_new_one() {
        let lobby = lobby(4);
        let alice = lobby.join(name("alice")).await.unwrap();

        assert!(!lobby.close_waiting_room(&RoomId::new("other").unwrap()).await);
        assert!(lobby.close_waiting_room(alice.client.room_id()).await);

        let bob = lobby.join(name("bob")).await.unwrap();
        assert_ne!(bob.client.room_id(), alice.client.room_id());
    }
}
