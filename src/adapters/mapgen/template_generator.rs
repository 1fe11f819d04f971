//! Randomised map generation from a fixed tile template.
//!
//! Tiles:
//! - `B` solid block, kept as is
//! - `S` spawn cell, always becomes grass `G`
//! - `G` grass, replaced by a random pick from the tile set
//!
//! Tile set letters: `G` grass, `D` destroyable block, `O`/`F`/`M` blocks
//! dropping a bomb, flame or speed power-up. Repeating a letter raises its
//! odds.

use rand::seq::SliceRandom;

use crate::ports::MapGenerator;

/// Map width in tiles.
pub const MAP_COLUMNS: usize = 17;

/// Map height in tiles.
pub const MAP_ROWS: usize = 11;

const BASE_MAP: &str = concat!(
    "BBBBBBBBBBBBBBBBB",
    "BSSGGGGGGGGGGGSSB",
    "BSBGBGBGBGBGBGBSB",
    "BGGGGGSGGGGGGGGGB",
    "BGBGBGBGBGBGBGBGB",
    "BGGGGGGGGSGGGGGGB",
    "BGBGBGBGBGBGBGBGB",
    "BGGGSSGGGGSGGGGGB",
    "BSBGBGBGBGBGBGBSB",
    "BSSGGGGGGGGGGGSSB",
    "BBBBBBBBBBBBBBBBB",
);

const TILE_SET: &str = "GGGDDDDDOFM";

/// Fills a template's grass cells with random tiles.
#[derive(Debug, Clone)]
pub struct TemplateMapGenerator {
    template: String,
    tile_set: Vec<char>,
}

impl TemplateMapGenerator {
    /// Custom template and tile set. An empty tile set leaves grass as grass.
    pub fn new(template: impl Into<String>, tile_set: &str) -> Self {
        Self {
            template: template.into(),
            tile_set: tile_set.chars().collect(),
        }
    }
}

impl Default for TemplateMapGenerator {
    fn default() -> Self {
        Self::new(BASE_MAP, TILE_SET)
    }
}

impl MapGenerator for TemplateMapGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        self.template
            .chars()
            .map(|tile| match tile {
                'G' => self.tile_set.choose(&mut rng).copied().unwrap_or('G'),
                'S' => 'G',
                other => other,
            })
            .collect()
    }
}
