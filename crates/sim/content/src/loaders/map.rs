//! Tile map loader.
//!
//! Loads collision tiles from map RON files. Tiles not listed are open floor.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sim_core::{CollisionFlags, TileMap};

use crate::loaders::{LoadResult, read_file};

fn unit_tile() -> f32 {
    1.0
}

/// Map data structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MapDataRon {
    dimensions: (u32, u32),
    #[serde(default = "unit_tile")]
    tile_size: f32,
    #[serde(default)]
    tiles: Vec<(u32, u32, CollisionFlags)>, // (x, y, flags)
}

/// Loader for tile maps from RON files.
pub struct MapLoader;

impl MapLoader {
    /// Load a tile map from a RON file.
    pub fn load(path: &Path) -> LoadResult<TileMap> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> LoadResult<TileMap> {
        let data: MapDataRon = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse map RON: {}", e))?;

        let (width, height) = data.dimensions;
        if width == 0 || height == 0 {
            anyhow::bail!("Map dimensions must be positive, got {}x{}", width, height);
        }
        if data.tile_size <= 0.0 {
            anyhow::bail!("Tile size must be positive, got {}", data.tile_size);
        }

        let mut map = TileMap::new(width, height, data.tile_size, Vec::new());
        for (x, y, flags) in data.tiles {
            if x >= width || y >= height {
                anyhow::bail!("Tile ({}, {}) lies outside the {}x{} map", x, y, width, height);
            }
            map.set_tile(x, y, flags);
        }

        Ok(map)
    }
}
