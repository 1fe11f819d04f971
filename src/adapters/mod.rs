//! Adapters - Implementations of port interfaces and the network edge.
//!
//! - `mapgen` - Template-based game map generator
//! - `validation` - Payload validators run before message handlers
//! - `websocket` - Hub actor, connection pumps and the HTTP routes

pub mod mapgen;
pub mod validation;
pub mod websocket;
