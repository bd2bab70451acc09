//! Padded chunk grids and lifecycle flags.
//!
//! A chunk owns a dense voxel grid and a dense light grid sized
//! `(size + 2 * padding)` per axis. The inner region is authoritative; the
//! halo mirrors the touching region of each neighbor so meshing and lighting
//! can read across chunk boundaries without extra lookups.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use voxelfield_core::{chunk_name, ChunkPos, VoxelPos};

/// Block identifier stored per voxel.
pub type BlockId = u8;

/// Reserved ID for air.
pub const BLOCK_AIR: BlockId = 0;

/// Column height recorded when a column holds no solid voxel.
pub const NO_COLUMN_TOP: i32 = -1;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Lifecycle flags tracked per chunk.
    pub struct ChunkFlags: u8 {
        /// Voxel or light data changed since the last mesh build.
        const DIRTY = 0b0000_0001;
        /// Member of the active/visible scene set.
        const ADDED = 0b0000_0010;
        /// A mesh build is in flight; re-entrant requests are dropped.
        const MESHING = 0b0000_0100;
        /// Terrain population has completed.
        const INITIALIZED = 0b0000_1000;
        /// Awaiting population through an external channel.
        const PENDING = 0b0001_0000;
        /// The initial lighting pass has not run yet.
        const NEEDS_PROPAGATION = 0b0010_0000;
        /// Data diverged from its persisted form.
        const NEEDS_SAVING = 0b0100_0000;
    }
}

/// Serializable carrier for the persistence contract.
///
/// Holds the raw bytes of both grids; compression and I/O belong to the
/// external persistence layer, keyed by the chunk's stable name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkSnapshot {
    /// Chunk identity the grids belong to.
    pub position: ChunkPos,
    /// Raw voxel grid, padded extent.
    pub voxels: Vec<u8>,
    /// Raw packed light grid, padded extent.
    pub lights: Vec<u8>,
    /// Inner column tops.
    pub heights: Vec<i32>,
}

/// Fixed-size cuboid partition of the voxel world.
pub struct Chunk {
    position: ChunkPos,
    name: String,
    size: usize,
    padding: usize,
    min_inner: VoxelPos,
    max_inner: VoxelPos,
    min_outer: VoxelPos,
    max_outer: VoxelPos,
    voxels: Vec<BlockId>,
    /// Packed light grid: sunlight in the high nibble, torchlight in the low.
    lights: Vec<u8>,
    /// Top solid local y per inner (x, z) column, `NO_COLUMN_TOP` when empty.
    heights: Vec<i32>,
    top_y: i32,
    is_empty: bool,
    flags: ChunkFlags,
}

impl Chunk {
    /// Allocate a fresh all-air chunk.
    pub fn new(position: ChunkPos, size: usize, padding: usize) -> Self {
        let outer = size + 2 * padding;
        let min_inner = VoxelPos::new(
            position.x * size as i32,
            position.y * size as i32,
            position.z * size as i32,
        );
        let max_inner = min_inner.offset(size as i32, size as i32, size as i32);
        let p = padding as i32;
        Self {
            position,
            name: chunk_name(position),
            size,
            padding,
            min_inner,
            max_inner,
            min_outer: min_inner.offset(-p, -p, -p),
            max_outer: max_inner.offset(p, p, p),
            voxels: vec![BLOCK_AIR; outer * outer * outer],
            lights: vec![0; outer * outer * outer],
            heights: vec![NO_COLUMN_TOP; size * size],
            top_y: NO_COLUMN_TOP,
            is_empty: true,
            flags: ChunkFlags::DIRTY | ChunkFlags::NEEDS_PROPAGATION,
        }
    }

    /// Chunk identity in chunk space.
    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Stable reversible name, the persistence/network key.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Chunk edge length in voxels.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Halo width in voxels.
    #[inline]
    pub fn padding(&self) -> usize {
        self.padding
    }

    /// Lowest voxel of the authoritative region (inclusive).
    #[inline]
    pub fn min_inner(&self) -> VoxelPos {
        self.min_inner
    }

    /// One past the highest voxel of the authoritative region.
    #[inline]
    pub fn max_inner(&self) -> VoxelPos {
        self.max_inner
    }

    /// Lowest voxel of the padded extent (inclusive).
    #[inline]
    pub fn min_outer(&self) -> VoxelPos {
        self.min_outer
    }

    /// One past the highest voxel of the padded extent.
    #[inline]
    pub fn max_outer(&self) -> VoxelPos {
        self.max_outer
    }

    /// True while no non-air voxel has ever been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.is_empty
    }

    /// Current lifecycle flags.
    #[inline]
    pub fn flags(&self) -> ChunkFlags {
        self.flags
    }

    /// Set the given lifecycle flags.
    pub fn insert_flags(&mut self, flags: ChunkFlags) {
        self.flags.insert(flags);
    }

    /// Clear the given lifecycle flags.
    pub fn remove_flags(&mut self, flags: ChunkFlags) {
        self.flags.remove(flags);
    }

    /// Linear index into the padded grids for a local coordinate in
    /// `[-padding, size + padding)` per axis.
    #[inline]
    fn index(&self, lx: i32, ly: i32, lz: i32) -> usize {
        let outer = (self.size + 2 * self.padding) as i32;
        let p = self.padding as i32;
        (((ly + p) * outer + (lz + p)) * outer + (lx + p)) as usize
    }

    /// True iff the voxel lies within the padded extent.
    pub fn contains(&self, vx: i32, vy: i32, vz: i32) -> bool {
        let p = self.padding as i32;
        let s = self.size as i32;
        let lx = vx - self.min_inner.x;
        let ly = vy - self.min_inner.y;
        let lz = vz - self.min_inner.z;
        lx >= -p && lx < s + p && ly >= -p && ly < s + p && lz >= -p && lz < s + p
    }

    /// Read a voxel by local coordinate. Bounds are the caller's problem.
    #[inline]
    pub fn get_local(&self, lx: i32, ly: i32, lz: i32) -> BlockId {
        self.voxels[self.index(lx, ly, lz)]
    }

    /// Write a voxel by local coordinate. Bounds are the caller's problem.
    #[inline]
    pub fn set_local(&mut self, lx: i32, ly: i32, lz: i32, id: BlockId) {
        let idx = self.index(lx, ly, lz);
        self.voxels[idx] = id;
        if id != BLOCK_AIR {
            self.is_empty = false;
        }
    }

    /// Read a voxel by global coordinate; 0 outside the padded extent.
    pub fn get_voxel(&self, vx: i32, vy: i32, vz: i32) -> BlockId {
        if !self.contains(vx, vy, vz) {
            return BLOCK_AIR;
        }
        self.get_local(
            vx - self.min_inner.x,
            vy - self.min_inner.y,
            vz - self.min_inner.z,
        )
    }

    /// Write a voxel by global coordinate.
    ///
    /// No-ops outside the padded extent and when the id is unchanged; any
    /// real change marks the chunk dirty and in need of saving.
    pub fn set_voxel(&mut self, vx: i32, vy: i32, vz: i32, id: BlockId) {
        if !self.contains(vx, vy, vz) {
            return;
        }
        let lx = vx - self.min_inner.x;
        let ly = vy - self.min_inner.y;
        let lz = vz - self.min_inner.z;
        if self.get_local(lx, ly, lz) == id {
            return;
        }
        self.set_local(lx, ly, lz, id);
        self.flags.insert(ChunkFlags::DIRTY | ChunkFlags::NEEDS_SAVING);
    }

    /// Torchlight level at a global coordinate; 0 outside the padded extent.
    pub fn get_torch_light(&self, vx: i32, vy: i32, vz: i32) -> u8 {
        if !self.contains(vx, vy, vz) {
            return 0;
        }
        self.lights[self.index(
            vx - self.min_inner.x,
            vy - self.min_inner.y,
            vz - self.min_inner.z,
        )] & 0x0F
    }

    /// Write the torchlight nibble at a global coordinate.
    pub fn set_torch_light(&mut self, vx: i32, vy: i32, vz: i32, level: u8) {
        if !self.contains(vx, vy, vz) {
            return;
        }
        let idx = self.index(
            vx - self.min_inner.x,
            vy - self.min_inner.y,
            vz - self.min_inner.z,
        );
        let packed = (self.lights[idx] & 0xF0) | (level & 0x0F);
        if self.lights[idx] != packed {
            self.lights[idx] = packed;
            self.flags.insert(ChunkFlags::DIRTY | ChunkFlags::NEEDS_SAVING);
        }
    }

    /// Sunlight level at a global coordinate; 0 outside the padded extent.
    pub fn get_sunlight(&self, vx: i32, vy: i32, vz: i32) -> u8 {
        if !self.contains(vx, vy, vz) {
            return 0;
        }
        self.lights[self.index(
            vx - self.min_inner.x,
            vy - self.min_inner.y,
            vz - self.min_inner.z,
        )] >> 4
    }

    /// Write the sunlight nibble at a global coordinate.
    pub fn set_sunlight(&mut self, vx: i32, vy: i32, vz: i32, level: u8) {
        if !self.contains(vx, vy, vz) {
            return;
        }
        let idx = self.index(
            vx - self.min_inner.x,
            vy - self.min_inner.y,
            vz - self.min_inner.z,
        );
        let packed = (self.lights[idx] & 0x0F) | ((level & 0x0F) << 4);
        if self.lights[idx] != packed {
            self.lights[idx] = packed;
            self.flags.insert(ChunkFlags::DIRTY | ChunkFlags::NEEDS_SAVING);
        }
    }

    /// Top solid local y of an inner column, `NO_COLUMN_TOP` when all air.
    /// Column coordinates are global voxel x/z; out-of-chunk columns read as
    /// empty.
    pub fn column_top(&self, vx: i32, vz: i32) -> i32 {
        let lx = vx - self.min_inner.x;
        let lz = vz - self.min_inner.z;
        if lx < 0 || lx >= self.size as i32 || lz < 0 || lz >= self.size as i32 {
            return NO_COLUMN_TOP;
        }
        self.heights[lz as usize * self.size + lx as usize]
    }

    /// Record the top solid local y of an inner column.
    pub fn set_column_top(&mut self, vx: i32, vz: i32, local_y: i32) {
        let lx = vx - self.min_inner.x;
        let lz = vz - self.min_inner.z;
        if lx < 0 || lx >= self.size as i32 || lz < 0 || lz >= self.size as i32 {
            return;
        }
        self.heights[lz as usize * self.size + lx as usize] = local_y;
        if local_y > self.top_y {
            self.top_y = local_y;
        }
    }

    /// Highest recorded column top, the meshing/sunlight upper bound.
    #[inline]
    pub fn top_y(&self) -> i32 {
        self.top_y
    }

    /// Rebuild the column tops by scanning the inner voxel grid.
    ///
    /// Run after bulk population; incremental edits maintain columns through
    /// the world update path instead.
    pub fn rebuild_height_map(&mut self) {
        self.top_y = NO_COLUMN_TOP;
        for lz in 0..self.size as i32 {
            for lx in 0..self.size as i32 {
                let mut top = NO_COLUMN_TOP;
                for ly in (0..self.size as i32).rev() {
                    if self.get_local(lx, ly, lz) != BLOCK_AIR {
                        top = ly;
                        break;
                    }
                }
                self.heights[lz as usize * self.size + lx as usize] = top;
                if top > self.top_y {
                    self.top_y = top;
                }
            }
        }
    }

    /// Capture the raw grids for the external persistence layer.
    pub fn snapshot(&self) -> ChunkSnapshot {
        ChunkSnapshot {
            position: self.position,
            voxels: self.voxels.clone(),
            lights: self.lights.clone(),
            heights: self.heights.clone(),
        }
    }

    /// Restore grids byte-for-byte from a snapshot.
    ///
    /// The restored chunk is initialized, carries valid light, and no longer
    /// needs saving; it still needs a mesh build.
    pub fn restore(&mut self, snapshot: &ChunkSnapshot) -> Result<()> {
        ensure!(
            snapshot.position == self.position,
            "snapshot for chunk {} applied to chunk {}",
            snapshot.position,
            self.position
        );
        ensure!(
            snapshot.voxels.len() == self.voxels.len()
                && snapshot.lights.len() == self.lights.len()
                && snapshot.heights.len() == self.heights.len(),
            "snapshot grid shape does not match chunk {}",
            self.position
        );
        self.voxels.copy_from_slice(&snapshot.voxels);
        self.lights.copy_from_slice(&snapshot.lights);
        self.heights.copy_from_slice(&snapshot.heights);
        self.top_y = self.heights.iter().copied().max().unwrap_or(NO_COLUMN_TOP);
        self.is_empty = self.voxels.iter().all(|&id| id == BLOCK_AIR);
        self.flags
            .remove(ChunkFlags::NEEDS_SAVING | ChunkFlags::NEEDS_PROPAGATION);
        self.flags.insert(ChunkFlags::INITIALIZED | ChunkFlags::DIRTY);
        Ok(())
    }
}
