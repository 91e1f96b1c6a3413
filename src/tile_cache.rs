/// On-disk cache for downloaded map tiles.
///
/// Tiles live in the platform cache directory (`~/Library/Caches/model-ruler/tiles`
/// on macOS, `~/.cache/model-ruler/tiles` on Linux) as `{z}_{x}_{y}.tile.png`.
/// Cached tiles are reused without touching the network.

use bevy::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geo::TileId;
use crate::paths;

const TILE_SUFFIX: &str = ".tile.png";

#[derive(Debug, Clone)]
pub struct TileCache {
    dir: PathBuf,
}

impl Default for TileCache {
    fn default() -> Self {
        Self::new(paths::tile_cache_dir())
    }
}

impl TileCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, tile: TileId) -> PathBuf {
        self.dir.join(tile.cache_file_name())
    }

    /// Encoded tile bytes, if the tile was downloaded before.
    pub fn read(&self, tile: TileId) -> Option<Vec<u8>> {
        let path = self.path_for(tile);
        if !path.is_file() {
            return None;
        }
        match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read cached tile {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn store(&self, tile: TileId, bytes: &[u8]) -> Result<(), String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| format!("Failed to create tile cache directory {:?}: {}", self.dir, e))?;
        let path = self.path_for(tile);
        fs::write(&path, bytes).map_err(|e| format!("Failed to write tile {:?}: {}", path, e))
    }

    /// Delete every cached tile. Returns how many files were removed.
    pub fn clear(&self) -> usize {
        if !self.dir.exists() {
            warn!("Tile cache directory not found at {:?}", self.dir);
            return 0;
        }

        let mut deleted_count = 0;
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let is_tile = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(TILE_SUFFIX));
                if !path.is_file() || !is_tile {
                    continue;
                }
                if let Err(e) = fs::remove_file(&path) {
                    warn!("Failed to delete tile {:?}: {}", path, e);
                } else {
                    deleted_count += 1;
                }
            }
        }

        info!("Cleared {} tile(s) from cache at {:?}", deleted_count, self.dir);
        deleted_count
    }
}
