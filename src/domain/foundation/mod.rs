//! Foundation module - Shared domain primitives.
//!
//! Identifiers, the state machine trait and validation errors used by the
//! lobby domain.

mod errors;
mod ids;
mod state_machine;

pub use errors::ValidationError;
pub use ids::RoomId;
pub use state_machine::StateMachine;
