//! Lobby Hub - real-time room coordination for a multiplayer lobby and chat.
//!
//! Players connect over WebSocket, are grouped into bounded rooms and
//! exchange chat lines and game actions with the rest of their room. A
//! single hub actor owns all room membership; every connection runs one
//! read loop and one write loop.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
