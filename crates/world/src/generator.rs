//! Terrain population strategy seam.
//!
//! The world never generates terrain itself; a generator is picked once at
//! construction and driven by the scheduler. Richer strategies (noise
//! terrain, decoration passes) live outside this crate behind the same trait.

use anyhow::Result;

use crate::chunk::{BlockId, Chunk};

/// Fills a chunk's voxel grid, halo included.
///
/// Implementations must produce values consistent with what they would
/// produce for the neighboring chunks at the shared boundary, so a halo cell
/// always equals the neighbor's authoritative cell.
pub trait ChunkGenerator {
    /// Populate the chunk's full padded extent.
    fn generate(&mut self, chunk: &mut Chunk) -> Result<()>;
}

/// Reference strategy: a flat slab of terrain up to a fixed world height.
///
/// Deterministic and boundary-consistent by construction, which makes it the
/// default for tests and demos.
pub struct FlatGenerator {
    /// Highest world y (inclusive) filled with ground.
    pub ground_top: i32,
    /// Block id used for the surface layer.
    pub surface: BlockId,
    /// Block id used below the surface layer.
    pub filler: BlockId,
}

impl FlatGenerator {
    /// Ground surface at `ground_top`, with the given surface/filler blocks.
    pub fn new(ground_top: i32, surface: BlockId, filler: BlockId) -> Self {
        Self {
            ground_top,
            surface,
            filler,
        }
    }
}

impl ChunkGenerator for FlatGenerator {
    fn generate(&mut self, chunk: &mut Chunk) -> Result<()> {
        let min = chunk.min_outer();
        let max = chunk.max_outer();
        for vx in min.x..max.x {
            for vz in min.z..max.z {
                for vy in min.y..max.y {
                    if vy > self.ground_top {
                        break;
                    }
                    let id = if vy == self.ground_top {
                        self.surface
                    } else {
                        self.filler
                    };
                    chunk.set_voxel(vx, vy, vz, id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxelfield_core::ChunkPos;

    #[test]
    fn flat_generator_fills_halo_consistently() {
        let mut gen = FlatGenerator::new(3, 2, 1);
        let mut a = Chunk::new(ChunkPos::new(0, 0, 0), 16, 2);
        let mut b = Chunk::new(ChunkPos::new(1, 0, 0), 16, 2);
        gen.generate(&mut a).unwrap();
        gen.generate(&mut b).unwrap();

        // A's halo at x=16..18 mirrors B's authoritative cells exactly.
        for vx in 16..18 {
            for vz in 0..16 {
                for vy in -2..18 {
                    assert_eq!(a.get_voxel(vx, vy, vz), b.get_voxel(vx, vy, vz));
                }
            }
        }
        assert_eq!(a.get_voxel(5, 3, 5), 2);
        assert_eq!(a.get_voxel(5, 2, 5), 1);
        assert_eq!(a.get_voxel(5, 4, 5), 0);
    }

    #[test]
    fn chunk_above_ground_stays_empty() {
        let mut gen = FlatGenerator::new(3, 2, 1);
        let mut sky = Chunk::new(ChunkPos::new(0, 2, 0), 16, 2);
        gen.generate(&mut sky).unwrap();
        assert!(sky.is_empty());
    }
}
