//! Property-based tests for the lighting engine
//!
//! Validates lighting invariants over randomized voxel layouts:
//! - Light levels never exceed the flooded level or the nibble range
//! - Adjacent transparent cells never differ by more than one level
//! - Flood followed by removal of an isolated source restores darkness
//!
//! These properties must hold for all obstacle configurations.

use proptest::prelude::*;
use voxelfield_world::{
    BlockCatalog, BlockId, ChunkFlags, ChunkPos, VoxelPos, World, WorldConfig,
};

const STONE: BlockId = 1;

struct Catalog;

impl BlockCatalog for Catalog {
    fn is_transparent(&self, id: BlockId) -> bool {
        id != STONE
    }

    fn light_emission(&self, _id: BlockId) -> u8 {
        0
    }
}

fn world_with_obstacles(seed: u64) -> World {
    let mut world = World::new(WorldConfig::default(), Box::new(Catalog), None).unwrap();
    for dx in -1..=1 {
        for dy in -1..=1 {
            for dz in -1..=1 {
                let chunk = world.get_or_create_chunk(ChunkPos::new(dx, dy, dz));
                chunk.remove_flags(ChunkFlags::NEEDS_PROPAGATION);
            }
        }
    }
    // Scatter solid blocks pseudo-deterministically from the seed.
    for x in 0..16 {
        for y in 0..16 {
            for z in 0..16 {
                let h = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add((x * 256 + y * 16 + z) as u64);
                if h % 4 == 0 {
                    world.set_voxel(VoxelPos::new(x as i32, y as i32, z as i32), STONE);
                }
            }
        }
    }
    world
}

proptest! {
    /// Property: flooding at `level` never produces a value above `level`
    /// and the source holds exactly `level`.
    #[test]
    fn flood_respects_level_ceiling(
        seed in any::<u64>(),
        sx in 0i32..16,
        sy in 0i32..16,
        sz in 0i32..16,
        level in 1u8..=15,
    ) {
        let mut world = world_with_obstacles(seed);
        let source = VoxelPos::new(sx, sy, sz);
        world.flood_torch_light(source, level);

        prop_assert_eq!(world.get_torch_light(source), level);
        for x in -2..18 {
            for y in -2..18 {
                for z in -2..18 {
                    let l = world.get_torch_light(VoxelPos::new(x, y, z));
                    prop_assert!(l <= level, "({x},{y},{z}) holds {l} > {level}");
                }
            }
        }
    }

    /// Property: light is 1-Lipschitz across adjacent transparent cells; a
    /// lit cell's transparent neighbors are at most one level darker.
    #[test]
    fn adjacent_transparent_cells_differ_by_at_most_one(
        seed in any::<u64>(),
        sx in 2i32..14,
        sy in 2i32..14,
        sz in 2i32..14,
    ) {
        let mut world = world_with_obstacles(seed);
        let source = VoxelPos::new(sx, sy, sz);
        world.flood_torch_light(source, 15);

        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    let here = VoxelPos::new(x, y, z);
                    if world.get_voxel(here) == STONE {
                        continue;
                    }
                    let l = world.get_torch_light(here);
                    if l <= 1 || here == source {
                        continue;
                    }
                    for (dx, dy, dz) in
                        [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)]
                    {
                        let n = here.offset(dx, dy, dz);
                        if world.get_voxel(n) == STONE || n == source {
                            continue;
                        }
                        let nl = world.get_torch_light(n);
                        prop_assert!(
                            nl + 1 >= l,
                            "({},{},{})={} but neighbor {} holds {}", x, y, z, l, n, nl
                        );
                    }
                }
            }
        }
    }

    /// Property: removing an isolated source after flooding restores every
    /// cell to darkness regardless of obstacles.
    #[test]
    fn flood_remove_round_trip_restores_darkness(
        seed in any::<u64>(),
        sx in 0i32..16,
        sy in 0i32..16,
        sz in 0i32..16,
        level in 1u8..=15,
    ) {
        let mut world = world_with_obstacles(seed);
        let source = VoxelPos::new(sx, sy, sz);
        world.flood_torch_light(source, level);
        world.remove_torch_light(source);

        for x in -2..18 {
            for y in -2..18 {
                for z in -2..18 {
                    let l = world.get_torch_light(VoxelPos::new(x, y, z));
                    prop_assert_eq!(l, 0, "({}, {}, {}) still lit", x, y, z);
                }
            }
        }
    }
}
