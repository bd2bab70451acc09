use std::collections::BTreeMap;

use voxelfield_core::{voxel_to_chunk, ChunkPos, VoxelPos};

use crate::chunk::Chunk;

/// In-memory chunk arena.
/// Uses BTreeMap for deterministic iteration order. Chunks are created lazily
/// on first access and never destroyed; far chunks are merely detached from
/// the visible set by the visibility tracker.
pub struct ChunkStore {
    chunks: BTreeMap<ChunkPos, Chunk>,
    chunk_size: usize,
    padding: usize,
}

impl ChunkStore {
    /// Create an empty store producing chunks of the given geometry.
    pub fn new(chunk_size: usize, padding: usize) -> Self {
        Self {
            chunks: BTreeMap::new(),
            chunk_size,
            padding,
        }
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when no chunks are currently stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk edge length in voxels.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Obtain mutable access to a chunk, creating it if necessary.
    ///
    /// Construction registers an all-air chunk; terrain population happens
    /// asynchronously through the scheduler, never here.
    pub fn get_or_create(&mut self, pos: ChunkPos) -> &mut Chunk {
        self.chunks
            .entry(pos)
            .or_insert_with(|| Chunk::new(pos, self.chunk_size, self.padding))
    }

    /// Attempt to fetch a chunk immutably.
    pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    /// Fetch a chunk mutably (without creating it).
    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    /// Fetch the chunk owning a voxel coordinate.
    pub fn chunk_at_voxel(&self, voxel: VoxelPos) -> Option<&Chunk> {
        self.get(voxel_to_chunk(voxel, self.chunk_size as i32))
    }

    /// Fetch the chunk owning a voxel coordinate, mutably.
    pub fn chunk_at_voxel_mut(&mut self, voxel: VoxelPos) -> Option<&mut Chunk> {
        self.get_mut(voxel_to_chunk(voxel, self.chunk_size as i32))
    }

    /// Iterate over currently resident chunk positions.
    pub fn iter_positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }

    /// Iterate over resident chunks mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.values_mut()
    }
}
