//! The hub: single-writer actor owning room and client membership.
//!
//! # Architecture
//!
//! ```text
//!  handshake ─┐                      ┌──────────────── Hub task ───────────────┐
//!  pumps ─────┼── HubCommand (mpsc) ─►  one command at a time, arrival order   │
//!  handlers ──┘        ▲             │  writes RoomRegistry / MemberRegistry   │
//!                      │             └──────────────────┬──────────────────────┘
//!                      └──── reply (oneshot) ◄──────────┘
//!
//!  snapshot readers ── HubHandle::room / room_count ──► RoomRegistry (read lock)
//! ```
//!
//! Every structural change (register/unregister room or client, broadcast
//! with eviction) is a command handled by the one hub task, so membership
//! and player numbering need no extra locking. Read-only lookups go straight
//! to the registries and may observe state a command later changes.
//!
//! If the hub task has stopped, every [`HubHandle`] call resolves to a
//! failure or empty result instead of waiting forever.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::domain::foundation::RoomId;
use crate::domain::lobby::JoinRejection;

use super::room::{Client, EnqueueError, OutboundMessage, Room, RoomRegistry};

/// Pending commands the hub accepts before senders wait.
pub const HUB_COMMAND_BUFFER: usize = 64;

/// Delivery report of a broadcast: username → message queued.
pub type DeliveryReport = HashMap<String, bool>;

/// Requests served by the hub task.
enum HubCommand {
    RegisterRoom {
        room: Arc<Room>,
        respond_to: oneshot::Sender<bool>,
    },
    UnregisterRoom {
        room_id: RoomId,
        respond_to: oneshot::Sender<()>,
    },
    RegisterClient {
        client: Arc<Client>,
        respond_to: oneshot::Sender<Result<usize, JoinRejection>>,
    },
    UnregisterClient {
        client: Arc<Client>,
        respond_to: oneshot::Sender<bool>,
    },
    EvictClient {
        client: Arc<Client>,
        respond_to: oneshot::Sender<bool>,
    },
    Broadcast {
        room_id: RoomId,
        payload: OutboundMessage,
        respond_to: oneshot::Sender<DeliveryReport>,
    },
}

/// The actor. Owned by its task; reachable only through [`HubHandle`].
pub struct Hub {
    commands: mpsc::Receiver<HubCommand>,
    rooms: Arc<RoomRegistry>,
}

impl Hub {
    /// Create the actor and its handle without starting it.
    pub fn new() -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(HUB_COMMAND_BUFFER);
        let rooms = Arc::new(RoomRegistry::new());
        let hub = Self {
            commands: rx,
            rooms: rooms.clone(),
        };
        let handle = HubHandle {
            commands: tx,
            rooms,
        };
        (hub, handle)
    }

    /// Start the actor on the current runtime.
    pub fn spawn() -> HubHandle {
        let (hub, handle) = Self::new();
        tokio::spawn(hub.run());
        handle
    }

    /// Serve commands until every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!("hub is running");
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
        tracing::info!("hub stopped: all handles dropped");
    }

    async fn handle(&self, command: HubCommand) {
        match command {
            HubCommand::RegisterRoom { room, respond_to } => {
                let _ = respond_to.send(self.register_room(room).await);
            }
            HubCommand::UnregisterRoom {
                room_id,
                respond_to,
            } => {
                if self.rooms.delete(&room_id).await.is_some() {
                    tracing::debug!(room_id = %room_id, "room unregistered");
                }
                let _ = respond_to.send(());
            }
            HubCommand::RegisterClient { client, respond_to } => {
                let _ = respond_to.send(self.register_client(client).await);
            }
            HubCommand::UnregisterClient { client, respond_to } => {
                let removed = match self.rooms.get(client.room_id()).await {
                    Some(room) => remove_member(&room, &client).await,
                    None => false,
                };
                let _ = respond_to.send(removed);
            }
            HubCommand::EvictClient { client, respond_to } => {
                client.close_queue();
                let removed = match self.rooms.get(client.room_id()).await {
                    Some(room) => remove_member(&room, &client).await,
                    None => false,
                };
                tracing::warn!(client = %client, "client evicted: outbound queue full");
                let _ = respond_to.send(removed);
            }
            HubCommand::Broadcast {
                room_id,
                payload,
                respond_to,
            } => {
                let _ = respond_to.send(self.broadcast(&room_id, payload).await);
            }
        }
    }

    async fn register_room(&self, room: Arc<Room>) -> bool {
        if self.rooms.contains(room.id()).await {
            tracing::warn!(room_id = %room.id(), "room id is already registered");
            return false;
        }
        tracing::debug!(room_id = %room.id(), "room registered");
        self.rooms.set(room.id().clone(), room).await;
        true
    }

    async fn register_client(&self, client: Arc<Client>) -> Result<usize, JoinRejection> {
        let room = match self.rooms.get(client.room_id()).await {
            Some(room) if client.belongs_to(&room) => room,
            _ => return Err(JoinRejection::RoomMissing),
        };

        let members = room.members();
        if members.contains(client.username().as_str()).await {
            return Err(JoinRejection::DuplicateUsername);
        }
        if members.len().await >= room.capacity() {
            return Err(JoinRejection::RoomFull);
        }

        members
            .set(client.username().to_string(), client.clone())
            .await;
        let number = members.len().await;
        client.set_player_number(number);

        tracing::debug!(client = %client, "client registered");
        Ok(number)
    }

    async fn broadcast(&self, room_id: &RoomId, payload: OutboundMessage) -> DeliveryReport {
        let Some(room) = self.rooms.get(room_id).await else {
            tracing::debug!(room_id = %room_id, "broadcast to unregistered room dropped");
            return DeliveryReport::new();
        };

        let recipients = room.members().values().await;
        let mut report = DeliveryReport::with_capacity(recipients.len());

        for client in recipients {
            let delivered = match client.try_enqueue(payload.clone()) {
                Ok(()) => true,
                Err(EnqueueError::Full) => {
                    tracing::warn!(client = %client, "client unresponsive, evicting");
                    client.close_queue();
                    remove_member(&room, &client).await;
                    false
                }
                Err(EnqueueError::Closed) => {
                    tracing::debug!(client = %client, "client queue closed, removing");
                    remove_member(&room, &client).await;
                    false
                }
            };
            report.insert(client.username().to_string(), delivered);
        }

        report
    }
}

/// Remove `client` from `room` and close the gap in player numbers.
///
/// Only the exact client object is removed; a newer client that reused the
/// username is left alone.
async fn remove_member(room: &Room, client: &Arc<Client>) -> bool {
    let removed = room
        .members()
        .delete_if(client.username().as_str(), |member| Arc::ptr_eq(member, client))
        .await;
    if removed.is_none() {
        return false;
    }

    let departed = client.player_number();
    room.members()
        .for_each(|_, member| {
            let number = member.player_number();
            if number > departed {
                member.set_player_number(number - 1);
            }
        })
        .await;

    tracing::debug!(client = %client, room_id = %room.id(), "client left room");
    true
}

/// Cloneable entry point to the hub.
#[derive(Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    rooms: Arc<RoomRegistry>,
}

impl HubHandle {
    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> HubCommand) -> Option<T> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(command(tx)).await.is_err() {
            tracing::error!("hub is not running");
            return None;
        }
        rx.await.ok()
    }

    /// Register a room. False if its id is taken.
    pub async fn register_room(&self, room: Arc<Room>) -> bool {
        self.request(|respond_to| HubCommand::RegisterRoom { room, respond_to })
            .await
            .unwrap_or(false)
    }

    /// Remove a room; no-op if absent.
    pub async fn unregister_room(&self, room_id: &RoomId) {
        let room_id = room_id.clone();
        self.request(|respond_to| HubCommand::UnregisterRoom {
            room_id,
            respond_to,
        })
        .await;
    }

    /// Add a client to its room and assign it the next player number.
    pub async fn register_client(&self, client: &Arc<Client>) -> Result<usize, JoinRejection> {
        let client = client.clone();
        self.request(|respond_to| HubCommand::RegisterClient { client, respond_to })
            .await
            .unwrap_or(Err(JoinRejection::RoomMissing))
    }

    /// Remove a client from its room, renumbering the rest. Returns whether
    /// the client was a member.
    pub async fn unregister_client(&self, client: &Arc<Client>) -> bool {
        let client = client.clone();
        self.request(|respond_to| HubCommand::UnregisterClient { client, respond_to })
            .await
            .unwrap_or(false)
    }

    /// Close a client's queue and remove it from its room.
    pub async fn evict_client(&self, client: &Arc<Client>) -> bool {
        let target = client.clone();
        self.request(|respond_to| HubCommand::EvictClient {
            client: target,
            respond_to,
        })
        .await
        .unwrap_or_else(|| {
            client.close_queue();
            false
        })
    }

    /// Queue `payload` for every member of the room.
    ///
    /// Members whose queue is full are evicted and reported `false`. An
    /// unknown room yields an empty report.
    pub async fn broadcast(&self, room_id: &RoomId, payload: OutboundMessage) -> DeliveryReport {
        let room_id = room_id.clone();
        self.request(|respond_to| HubCommand::Broadcast {
            room_id,
            payload,
            respond_to,
        })
        .await
        .unwrap_or_default()
    }

    /// Snapshot lookup of a registered room.
    pub async fn room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).await
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.len().await
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.keys().await
    }
}
