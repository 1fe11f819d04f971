//! WebSocket adapters for the multiplayer lobby.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  GET /joinGame?name=...   (handler)                                  │
//! │   validate name → upgrade → Lobby::join → announce arrival           │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ one pump per connection
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      ConnectionPump                                  │
//! │   read loop ── Envelope ──► Dispatcher ──► handlers                  │
//! │   write loop ◄── outbound queue ◄── replies / broadcasts             │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ commands (mpsc + oneshot)
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            Hub                                       │
//! │   Room: 6f1c…             Room: 9a02…                               │
//! │   ├── alice #1            └── erin #1                               │
//! │   ├── bob   #2                                                       │
//! │   └── carol #3                                                       │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`hub`] - Actor owning room and member registries
//! - [`room`] - Rooms, clients and their outbound queues
//! - [`registry`] - Lock-guarded maps backing the hub
//! - [`connection`] - Read/write loops and connection lifecycle
//! - [`transport`] - Frame sink/stream abstraction over axum sockets
//! - [`dispatcher`] - Message type → handler routing
//! - [`handlers`] - Lobby protocol handlers
//! - [`lobby`] - Waiting-room matchmaking
//! - [`messages`] - Wire envelopes
//! - [`handler`] - Axum routes

pub mod connection;
pub mod dispatcher;
pub mod handler;
pub mod handlers;
pub mod hub;
pub mod lobby;
pub mod messages;
pub mod registry;
pub mod room;
pub mod transport;

pub use connection::{ConnectionContext, ConnectionPump, Lifecycle, PumpHandle, PumpSettings};
pub use dispatcher::{Dispatcher, EffectHandler, HandlerError, ReplyHandler, Route};
pub use handler::{health_check, join_game, websocket_router, WebSocketState};
pub use handlers::lobby_dispatcher;
pub use hub::{DeliveryReport, Hub, HubHandle};
pub use lobby::{JoinError, Lobby, Membership};
pub use messages::{Envelope, EnvelopeError, ReplyPayload, ResultKind};
pub use registry::Registry;
pub use room::{Client, EnqueueError, OutboundMessage, Room};
pub use transport::{memory_transport, split_websocket, Frame, MemoryPeer, TransportError};
