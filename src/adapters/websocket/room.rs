//! Rooms and the clients connected to them.
//!
//! # Architecture
//!
//! ```text
//! RoomRegistry (hub)
//! ├── Room r1  [capacity 4, game map]
//! │   ├── alice  #1  ──► outbound queue ──► pump
//! │   ├── carol  #2
//! │   └── dave   #3
//! └── Room r2
//!     └── erin   #1
//! ```
//!
//! Rooms own their members; a client only keeps a weak pointer back to its
//! room. Membership and player numbers change only inside the hub actor.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::foundation::RoomId;
use crate::domain::lobby::{PlayerInfo, Username};

use super::registry::Registry;

/// A pre-encoded envelope, shared by every recipient of a broadcast.
pub type OutboundMessage = Arc<str>;

/// Members of one room, keyed by username.
pub type MemberRegistry = Registry<String, Arc<Client>>;

/// All registered rooms, keyed by id.
pub type RoomRegistry = Registry<RoomId, Arc<Room>>;

/// A bounded group of clients sharing a session and a game map.
pub struct Room {
    id: RoomId,
    capacity: usize,
    game_map: String,
    members: MemberRegistry,
}

impl Room {
    /// Create an unregistered room.
    ///
    /// `game_map` is stored verbatim and never inspected.
    pub fn new(id: RoomId, capacity: usize, game_map: impl Into<String>) -> Self {
        Self {
            id,
            capacity,
            game_map: game_map.into(),
            members: Registry::new(),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn game_map(&self) -> &str {
        &self.game_map
    }

    /// Backing member map. Writes go through the hub only.
    pub(super) fn members(&self) -> &MemberRegistry {
        &self.members
    }

    pub async fn size(&self) -> usize {
        self.members.len().await
    }

    pub async fn is_full(&self) -> bool {
        self.size().await >= self.capacity
    }

    pub async fn contains_user(&self, username: &str) -> bool {
        self.members.contains(username).await
    }

    pub async fn member(&self, username: &str) -> Option<Arc<Client>> {
        self.members.get(username).await
    }

    /// Public view of every member, ordered by player number.
    pub async fn users(&self) -> Vec<PlayerInfo> {
        let mut users = Vec::new();
        self.members
            .for_each(|_, client| users.push(client.player_info()))
            .await;
        users.sort_by_key(|user| user.player_number);
        users
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Why a message could not be queued for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    /// The client is not keeping up; callers evict it.
    #[error("outbound queue is full")]
    Full,

    #[error("outbound queue is closed")]
    Closed,
}

/// Bounded, closable, multi-producer queue feeding one connection's
/// outbound loop.
///
/// Closing drops the only sender, so the consumer sees the end of the
/// queue after it has drained what was already buffered.
struct OutboundQueue {
    sender: Mutex<Option<mpsc::Sender<OutboundMessage>>>,
}

impl OutboundQueue {
    fn bounded(capacity: usize) -> (Self, mpsc::Receiver<OutboundMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let queue = Self {
            sender: Mutex::new(Some(tx)),
        };
        (queue, rx)
    }

    fn try_push(&self, message: OutboundMessage) -> Result<(), EnqueueError> {
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            None => Err(EnqueueError::Closed),
            Some(tx) => tx.try_send(message).map_err(|e| match e {
                TrySendError::Full(_) => EnqueueError::Full,
                TrySendError::Closed(_) => EnqueueError::Closed,
            }),
        }
    }

    fn close(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(true, |tx| tx.is_closed())
    }
}

/// A connected player's server-side session.
pub struct Client {
    username: Username,
    player_number: AtomicUsize,
    room_id: RoomId,
    room: Weak<Room>,
    outbound: OutboundQueue,
}

impl Client {
    /// Bind a new client to `room` with an outbound queue of
    /// `queue_capacity` messages.
    ///
    /// The client is not a member until the hub registers it. The returned
    /// receiver belongs to the connection's outbound loop.
    pub fn new(
        username: Username,
        room: &Arc<Room>,
        queue_capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundMessage>) {
        let (outbound, rx) = OutboundQueue::bounded(queue_capacity);
        let client = Arc::new(Self {
            username,
            player_number: AtomicUsize::new(0),
            room_id: room.id().clone(),
            room: Arc::downgrade(room),
            outbound,
        });
        (client, rx)
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// The client's room, if it still exists.
    pub fn room(&self) -> Option<Arc<Room>> {
        self.room.upgrade()
    }

    /// True if `room` is the exact room this client was created for.
    pub fn belongs_to(&self, room: &Arc<Room>) -> bool {
        std::ptr::eq(self.room.as_ptr(), Arc::as_ptr(room))
    }

    /// Current player number; 0 until registered.
    pub fn player_number(&self) -> usize {
        self.player_number.load(Ordering::Acquire)
    }

    pub(super) fn set_player_number(&self, number: usize) {
        self.player_number.store(number, Ordering::Release);
    }

    pub fn player_info(&self) -> PlayerInfo {
        PlayerInfo::new(self.username.as_str(), self.player_number())
    }

    /// Queue a message without waiting.
    pub fn try_enqueue(&self, message: OutboundMessage) -> Result<(), EnqueueError> {
        self.outbound.try_push(message)
    }

    /// Close the outbound queue. Returns false if it was already closed.
    pub fn close_queue(&self) -> bool {
        self.outbound.close()
    }

    pub fn is_queue_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}#{}", self.username, self.room_id, self.player_number())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("username", &self.username)
            .field("room_id", &self.room_id)
            .field("player_number", &self.player_number())
            .finish_non_exhaustive()
    }
}
