//! Map Generator Port - source of the game map attached to a new room.
//!
//! The hub never interprets the map. It is stored on the room when the
//! room is created and handed to clients verbatim.

/// Port for producing a fresh game map.
pub trait MapGenerator: Send + Sync {
    /// Generate the map blob for a new room.
    fn generate(&self) -> String;
}

/// Generator that always returns the same map. Useful in tests.
#[derive(Debug, Clone, Default)]
pub struct FixedMapGenerator {
    map: String,
}

impl FixedMapGenerator {
    pub fn new(map: impl Into<String>) -> Self {
        Self { map: map.into() }
    }
}

impl MapGenerator for FixedMapGenerator {
    fn generate(&self) -> String {
        self.map.clone()
    }
}
