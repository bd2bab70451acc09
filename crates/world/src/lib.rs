mod chunk;
mod events;
mod generator;
mod lighting;
mod neighbors;
mod scheduler;
mod storage;
mod visibility;
mod world;

pub use chunk::*;
pub use events::*;
pub use generator::*;
pub use lighting::{BlockCatalog, DefaultCatalog, LightKind, LightNode};
pub use neighbors::*;
pub use scheduler::*;
pub use storage::*;
pub use visibility::*;
pub use world::*;

pub use voxelfield_core::{
    chunk_name, parse_chunk_name, voxel_to_chunk, voxel_to_chunk_local, world_to_voxel,
    ChunkNameError, ChunkPos, VoxelPos, WorldConfig,
};
