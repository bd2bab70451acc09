#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod config;
pub mod coords;

// Re-export commonly used types
pub use config::WorldConfig;
pub use coords::{
    chunk_name, parse_chunk_name, voxel_to_chunk, voxel_to_chunk_local, world_to_voxel,
    ChunkNameError, ChunkPos, VoxelPos,
};
