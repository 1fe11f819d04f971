//! Domain layer containing lobby types and rules.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, state machine, errors)
//! - `lobby` - Players, chat messages, join rejections and the connection lifecycle

pub mod foundation;
pub mod lobby;
