//! Ports - Interfaces for external collaborators.
//!
//! The hub core consumes two collaborators it does not implement itself:
//!
//! - `MapGenerator` - produces the opaque game map stored on a new room
//! - `ContentValidator` - rejects bad payloads before a handler runs
//!
//! Adapters under `crate::adapters` provide the default implementations.

mod content_validator;
mod map_generator;

pub use content_validator::{ContentRejected, ContentValidator};
pub use map_generator::{FixedMapGenerator, MapGenerator};
