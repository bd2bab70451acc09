//! World configuration.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::warn;

/// Geometry and pacing parameters for a voxel world.
///
/// All fields have sensible defaults and can be overridden from a TOML file;
/// unknown or missing fields fall back to the default value.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Chunk edge length in voxels.
    pub chunk_size: usize,
    /// Halo width in voxels mirrored from each neighbor.
    pub padding: usize,
    /// Voxel edge length in world units.
    pub dimension: f32,
    /// Highest torch/sun light level a voxel can hold.
    pub max_light_level: u8,
    /// Chunk radius kept populated and visible around the observer.
    pub render_radius: i32,
    /// Upper bound on chunks populated per tick.
    pub max_chunks_per_tick: usize,
    /// Times a failing generator is retried before the chunk is handed to
    /// external generation.
    pub max_generation_attempts: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            padding: 2,
            dimension: 1.0,
            max_light_level: 15,
            render_radius: 8,
            max_chunks_per_tick: 8,
            max_generation_attempts: 3,
        }
    }
}

impl WorldConfig {
    /// Load configuration from an explicit path, falling back to defaults on
    /// errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<WorldConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    WorldConfig::default()
                }
            },
            Err(err) => {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
                WorldConfig::default()
            }
        }
    }

    /// Check internal consistency.
    ///
    /// The halo must be narrower than half a chunk so a voxel can never sit
    /// within `padding` of two opposing faces at once, and light levels must
    /// fit a nibble because the grid packs two channels per byte.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.chunk_size > 0, "chunk_size must be positive");
        ensure!(
            self.padding * 2 < self.chunk_size,
            "padding {} must be less than half of chunk_size {}",
            self.padding,
            self.chunk_size
        );
        ensure!(
            self.dimension > 0.0,
            "dimension must be a positive world-unit length"
        );
        ensure!(
            self.max_light_level <= 15,
            "max_light_level {} does not fit a packed nibble",
            self.max_light_level
        );
        ensure!(self.render_radius >= 0, "render_radius must be non-negative");
        Ok(())
    }
}
