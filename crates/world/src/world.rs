//! The world facade.
//!
//! Owns the chunk store, block catalog, scheduler, visibility tracker and
//! outbound event queue, and wires voxel edits to halo mirroring, height
//! maintenance and light propagation. There is no global world state;
//! collaborators receive this value explicitly.

use std::collections::VecDeque;

use anyhow::Result;
use voxelfield_core::{voxel_to_chunk_local, world_to_voxel, ChunkPos, VoxelPos, WorldConfig};

use crate::chunk::{BlockId, Chunk, ChunkFlags, ChunkSnapshot, BLOCK_AIR, NO_COLUMN_TOP};
use crate::events::{EventQueue, WorldEvent};
use crate::generator::ChunkGenerator;
use crate::lighting::{
    self, flood, remove, set_light, BlockCatalog, LightKind, LightNode,
};
use crate::neighbors::{neighbor_chunks, VOXEL_NEIGHBORS};
use crate::scheduler::DirtyChunkScheduler;
use crate::storage::ChunkStore;
use crate::visibility::{ChunkMesher, VisibilityTracker};

/// A chunked voxel world.
pub struct World {
    config: WorldConfig,
    store: ChunkStore,
    catalog: Box<dyn BlockCatalog>,
    scheduler: DirtyChunkScheduler,
    visibility: VisibilityTracker,
    events: EventQueue,
}

impl World {
    /// Construct a world from a validated configuration.
    ///
    /// The generator strategy is fixed here; `None` routes all population
    /// through the external `DataNeeded` channel.
    pub fn new(
        config: WorldConfig,
        catalog: Box<dyn BlockCatalog>,
        generator: Option<Box<dyn ChunkGenerator>>,
    ) -> Result<Self> {
        config.validate()?;
        let store = ChunkStore::new(config.chunk_size, config.padding);
        let scheduler = DirtyChunkScheduler::new(
            generator,
            config.max_chunks_per_tick,
            config.max_generation_attempts,
        );
        let visibility = VisibilityTracker::new(config.render_radius);
        Ok(Self {
            config,
            store,
            catalog,
            scheduler,
            visibility,
            events: EventQueue::new(),
        })
    }

    /// The configuration the world was built with.
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Borrow a chunk.
    pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.store.get(pos)
    }

    /// Borrow a chunk mutably (for external population).
    pub fn chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.store.get_mut(pos)
    }

    /// Create a chunk eagerly without scheduling population.
    pub fn get_or_create_chunk(&mut self, pos: ChunkPos) -> &mut Chunk {
        self.store.get_or_create(pos)
    }

    /// Number of resident chunks.
    pub fn chunk_count(&self) -> usize {
        self.store.len()
    }

    /// True once the initial render sphere is fully populated.
    pub fn is_ready(&self) -> bool {
        self.visibility.is_ready()
    }

    /// Take all pending outbound events.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        self.events.drain(..).collect()
    }

    /// Advance one tick: refresh visibility around the observer, then drain
    /// the population budget.
    pub fn tick(&mut self, observer: (f32, f32, f32), mesher: Option<&mut dyn ChunkMesher>) {
        self.visibility.tick(
            observer,
            &self.config,
            &mut self.store,
            &*self.catalog,
            &mut self.scheduler,
            &mut self.events,
            mesher,
        );
        self.scheduler.tick(&mut self.store, &mut self.events);
    }

    /// Block id at a voxel; air in unloaded regions.
    pub fn get_voxel(&self, voxel: VoxelPos) -> BlockId {
        self.store
            .chunk_at_voxel(voxel)
            .map(|chunk| chunk.get_voxel(voxel.x, voxel.y, voxel.z))
            .unwrap_or(BLOCK_AIR)
    }

    /// Block id at a world-space position.
    pub fn get_voxel_by_world(&self, wx: f32, wy: f32, wz: f32) -> BlockId {
        self.get_voxel(world_to_voxel(wx, wy, wz, self.config.dimension))
    }

    /// Raw voxel write, mirrored into every loaded neighbor halo covering
    /// the cell. No lighting or height maintenance; see [`World::update_voxel`]
    /// for the full edit path. No-ops when the owning chunk is unloaded.
    pub fn set_voxel(&mut self, voxel: VoxelPos, id: BlockId) {
        let size = self.config.chunk_size as i32;
        let Some(owner) = self.store.chunk_at_voxel_mut(voxel) else {
            return;
        };
        let owner_pos = owner.position();
        let padding = owner.padding() as i32;
        owner.set_voxel(voxel.x, voxel.y, voxel.z, id);

        let local = voxel_to_chunk_local(voxel, size);
        for pos in neighbor_chunks(owner_pos, local, size, padding) {
            if let Some(neighbor) = self.store.get_mut(pos) {
                neighbor.set_voxel(voxel.x, voxel.y, voxel.z, id);
            }
        }
    }

    /// Torchlight level at a voxel; 0 in unloaded regions.
    pub fn get_torch_light(&self, voxel: VoxelPos) -> u8 {
        lighting::get_light(&self.store, voxel, LightKind::Torch)
    }

    /// Sunlight level at a voxel; 0 in unloaded regions.
    pub fn get_sunlight(&self, voxel: VoxelPos) -> u8 {
        lighting::get_light(&self.store, voxel, LightKind::Sun)
    }

    /// Flood torchlight outward from a source voxel set to `level`.
    ///
    /// No-op when the source voxel has no owning chunk.
    pub fn flood_torch_light(&mut self, voxel: VoxelPos, level: u8) {
        self.flood_light(voxel, level, LightKind::Torch);
    }

    /// Remove the torchlight source at a voxel, re-flooding regions lit by
    /// independent sources. No-op when the source has no owning chunk.
    pub fn remove_torch_light(&mut self, voxel: VoxelPos) {
        remove(
            &mut self.store,
            &*self.catalog,
            self.config.max_light_level,
            voxel,
            LightKind::Torch,
        );
    }

    /// Flood sunlight outward from a source voxel set to `level`.
    pub fn flood_sunlight(&mut self, voxel: VoxelPos, level: u8) {
        self.flood_light(voxel, level, LightKind::Sun);
    }

    /// Remove the sunlight source at a voxel.
    pub fn remove_sunlight(&mut self, voxel: VoxelPos) {
        remove(
            &mut self.store,
            &*self.catalog,
            self.config.max_light_level,
            voxel,
            LightKind::Sun,
        );
    }

    fn flood_light(&mut self, voxel: VoxelPos, level: u8, kind: LightKind) {
        if self.store.chunk_at_voxel(voxel).is_none() {
            return;
        }
        let level = level.min(self.config.max_light_level);
        set_light(&mut self.store, voxel, level, kind);
        let mut queue = VecDeque::new();
        queue.push_back(LightNode { voxel, level });
        flood(
            &mut self.store,
            &*self.catalog,
            self.config.max_light_level,
            queue,
            kind,
        );
    }

    /// Full voxel edit: write the id (mirrored), maintain the column tops,
    /// and keep both light channels consistent with the change.
    ///
    /// No-ops for unloaded regions and for writes of the current id.
    pub fn update_voxel(&mut self, voxel: VoxelPos, id: BlockId) {
        let Some(owner) = self.store.chunk_at_voxel(voxel) else {
            return;
        };
        let current = owner.get_voxel(voxel.x, voxel.y, voxel.z);
        if current == id {
            return;
        }
        let needs_propagation = owner.flags().contains(ChunkFlags::NEEDS_PROPAGATION);
        let min_y = owner.min_inner().y;
        let column_height = owner.column_top(voxel.x, voxel.z);
        let local_y = voxel.y - min_y;

        let max_light = self.config.max_light_level;
        let current_transparent = self.catalog.is_transparent(current);
        let current_emission = self.catalog.light_emission(current);
        let new_transparent = self.catalog.is_transparent(id);
        let new_emission = self.catalog.light_emission(id);

        self.set_voxel(voxel, id);

        // Column tops only track the owner's inner columns.
        let inner_column = (0..self.config.chunk_size as i32).contains(&local_y);
        if inner_column {
            if id == BLOCK_AIR && local_y == column_height {
                // Top of the column removed: scan down for the next solid.
                let mut top = NO_COLUMN_TOP;
                for ly in (0..local_y).rev() {
                    let below = VoxelPos::new(voxel.x, min_y + ly, voxel.z);
                    if self.get_voxel(below) != BLOCK_AIR {
                        top = ly;
                        break;
                    }
                }
                if let Some(chunk) = self.store.chunk_at_voxel_mut(voxel) {
                    chunk.set_column_top(voxel.x, voxel.z, top);
                }
            } else if id != BLOCK_AIR && local_y > column_height {
                if let Some(chunk) = self.store.chunk_at_voxel_mut(voxel) {
                    chunk.set_column_top(voxel.x, voxel.z, local_y);
                }
            }
        }

        if needs_propagation {
            // The initial lighting pass will pick the new state up wholesale.
            return;
        }

        if current_emission > 0 {
            // Remove leftover light of the replaced emitter.
            remove(
                &mut self.store,
                &*self.catalog,
                max_light,
                voxel,
                LightKind::Torch,
            );
        } else if current_transparent && !new_transparent {
            // A solid block landed in a possibly lit cell.
            for kind in [LightKind::Torch, LightKind::Sun] {
                if lighting::get_light(&self.store, voxel, kind) != 0 {
                    remove(&mut self.store, &*self.catalog, max_light, voxel, kind);
                }
            }
        }

        if new_emission > 0 {
            self.flood_light(voxel, new_emission, LightKind::Torch);
        } else if new_transparent && !current_transparent {
            // A solid block was carved out: re-flood from lit neighbors.
            for kind in [LightKind::Torch, LightKind::Sun] {
                let mut queue = VecDeque::new();
                for (dx, dy, dz) in VOXEL_NEIGHBORS {
                    let neighbor = voxel.offset(dx, dy, dz);
                    if lighting::voxel_id(&self.store, neighbor).is_none() {
                        continue;
                    }
                    let level = lighting::get_light(&self.store, neighbor, kind);
                    let neighbor_id = self.get_voxel(neighbor);
                    let passes = self.catalog.is_transparent(neighbor_id)
                        || (kind == LightKind::Torch
                            && self.catalog.light_emission(neighbor_id) > 0);
                    if level != 0 && passes {
                        queue.push_back(LightNode {
                            voxel: neighbor,
                            level,
                        });
                    }
                }
                flood(&mut self.store, &*self.catalog, max_light, queue, kind);
            }
        }
    }

    /// Apply externally produced chunk data, completing a pending request.
    ///
    /// Restores the grids byte-for-byte and clears the pending guard; the
    /// chunk becomes initialized and eligible for meshing.
    pub fn submit_generated(&mut self, snapshot: &ChunkSnapshot) -> Result<()> {
        let chunk = self.store.get_or_create(snapshot.position);
        chunk.restore(snapshot)?;
        chunk.remove_flags(ChunkFlags::PENDING);
        Ok(())
    }

    /// Mark an externally populated chunk finished.
    ///
    /// For embedders that fill the grids in place through
    /// [`World::chunk_mut`] instead of submitting a snapshot.
    pub fn finish_generation(&mut self, pos: ChunkPos) {
        if let Some(chunk) = self.store.get_mut(pos) {
            chunk.rebuild_height_map();
            chunk.remove_flags(ChunkFlags::PENDING);
            chunk.insert_flags(ChunkFlags::INITIALIZED | ChunkFlags::DIRTY);
        }
    }

    /// Clear the meshing guard for a chunk whose asynchronous mesh build
    /// completed outside the tick loop.
    pub fn complete_mesh(&mut self, pos: ChunkPos) {
        if let Some(chunk) = self.store.get_mut(pos) {
            chunk.remove_flags(ChunkFlags::MESHING | ChunkFlags::DIRTY);
            chunk.insert_flags(ChunkFlags::ADDED);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lighting::DefaultCatalog;

    const TORCH: BlockId = 9;
    const STONE: BlockId = 1;

    struct TestCatalog;

    impl BlockCatalog for TestCatalog {
        fn is_transparent(&self, id: BlockId) -> bool {
            id != STONE
        }

        fn light_emission(&self, id: BlockId) -> u8 {
            if id == TORCH {
                15
            } else {
                0
            }
        }
    }

    fn world() -> World {
        World::new(WorldConfig::default(), Box::new(TestCatalog), None).unwrap()
    }

    /// Create the chunk owning a voxel plus every chunk around it, cleared
    /// of the initial-propagation flag so edits light incrementally.
    fn prepare_region(world: &mut World, center: ChunkPos) {
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let chunk = world.get_or_create_chunk(center.offset(dx, dy, dz));
                    chunk.remove_flags(ChunkFlags::NEEDS_PROPAGATION);
                    chunk.insert_flags(ChunkFlags::INITIALIZED);
                }
            }
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = WorldConfig {
            padding: 9,
            ..WorldConfig::default()
        };
        assert!(World::new(config, Box::new(DefaultCatalog), None).is_err());
    }

    #[test]
    fn set_voxel_mirrors_into_neighbor_halos() {
        let mut world = world();
        prepare_region(&mut world, ChunkPos::new(0, 0, 0));

        // One voxel inside the -x face of chunk (0,0,0).
        world.set_voxel(VoxelPos::new(1, 8, 8), STONE);

        let neighbor = world.chunk(ChunkPos::new(-1, 0, 0)).unwrap();
        assert_eq!(neighbor.get_voxel(1, 8, 8), STONE);
        assert!(neighbor.flags().contains(ChunkFlags::DIRTY));
        // Chunks not covering the voxel are untouched.
        let far = world.chunk(ChunkPos::new(1, 0, 0)).unwrap();
        assert_eq!(far.get_voxel(1, 8, 8), BLOCK_AIR);
    }

    #[test]
    fn edits_in_unloaded_regions_are_noops() {
        let mut world = world();
        world.set_voxel(VoxelPos::new(1000, 0, 0), STONE);
        world.update_voxel(VoxelPos::new(1000, 0, 0), STONE);
        world.flood_torch_light(VoxelPos::new(1000, 0, 0), 15);
        world.remove_torch_light(VoxelPos::new(1000, 0, 0));
        assert_eq!(world.chunk_count(), 0);
    }

    #[test]
    fn placing_torch_lights_and_removal_darkens() {
        let mut world = world();
        prepare_region(&mut world, ChunkPos::new(0, 0, 0));
        let at = VoxelPos::new(8, 8, 8);

        world.update_voxel(at, TORCH);
        assert_eq!(world.get_torch_light(at), 15);
        assert_eq!(world.get_torch_light(at.offset(0, 1, 0)), 14);

        world.update_voxel(at, BLOCK_AIR);
        assert_eq!(world.get_torch_light(at), 0);
        assert_eq!(world.get_torch_light(at.offset(0, 1, 0)), 0);
    }

    #[test]
    fn solid_placement_dims_and_carving_relights() {
        let mut world = world();
        prepare_region(&mut world, ChunkPos::new(0, 0, 0));
        let torch = VoxelPos::new(8, 8, 8);
        let probe = VoxelPos::new(8, 8, 10);
        world.update_voxel(torch, TORCH);
        assert_eq!(world.get_torch_light(probe), 13);

        // Wall the probe off on one cell; that cell loses its light.
        let wall = VoxelPos::new(8, 8, 9);
        world.update_voxel(wall, STONE);
        assert_eq!(world.get_torch_light(wall), 0);
        // Light bends around the wall, two extra steps.
        assert_eq!(world.get_torch_light(probe), 11);

        // Carving the wall restores the direct path.
        world.update_voxel(wall, BLOCK_AIR);
        assert_eq!(world.get_torch_light(wall), 14);
        assert_eq!(world.get_torch_light(probe), 13);
    }

    #[test]
    fn update_voxel_maintains_column_tops() {
        let mut world = world();
        prepare_region(&mut world, ChunkPos::new(0, 0, 0));

        world.update_voxel(VoxelPos::new(4, 3, 4), STONE);
        world.update_voxel(VoxelPos::new(4, 7, 4), STONE);
        let chunk = world.chunk(ChunkPos::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.column_top(4, 4), 7);

        world.update_voxel(VoxelPos::new(4, 7, 4), BLOCK_AIR);
        let chunk = world.chunk(ChunkPos::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.column_top(4, 4), 3);

        world.update_voxel(VoxelPos::new(4, 3, 4), BLOCK_AIR);
        let chunk = world.chunk(ChunkPos::new(0, 0, 0)).unwrap();
        assert_eq!(chunk.column_top(4, 4), NO_COLUMN_TOP);
    }

    #[test]
    fn submit_generated_completes_pending_chunk() {
        let mut world = world();
        let pos = ChunkPos::new(0, 0, 0);
        // Build the payload the way an external generator would.
        let mut template = Chunk::new(pos, 16, 2);
        template.set_voxel(5, 5, 5, STONE);
        template.rebuild_height_map();
        let snapshot = template.snapshot();

        world.get_or_create_chunk(pos).insert_flags(ChunkFlags::PENDING);
        world.submit_generated(&snapshot).unwrap();

        let chunk = world.chunk(pos).unwrap();
        assert!(!chunk.flags().contains(ChunkFlags::PENDING));
        assert!(chunk.flags().contains(ChunkFlags::INITIALIZED));
        assert_eq!(chunk.get_voxel(5, 5, 5), STONE);
        assert_eq!(chunk.column_top(5, 5), 5);
    }

    #[test]
    fn in_place_external_population_finishes() {
        let mut world = world();
        let pos = ChunkPos::new(0, 0, 0);
        {
            let chunk = world.get_or_create_chunk(pos);
            chunk.insert_flags(ChunkFlags::PENDING);
            chunk.set_voxel(2, 2, 2, STONE);
        }
        world.finish_generation(pos);
        let chunk = world.chunk(pos).unwrap();
        assert!(chunk.flags().contains(ChunkFlags::INITIALIZED));
        assert!(!chunk.flags().contains(ChunkFlags::PENDING));
        assert_eq!(chunk.column_top(2, 2), 2);

        // An asynchronous mesh build completing out of band clears the guard.
        world.chunk_mut(pos).unwrap().insert_flags(ChunkFlags::MESHING);
        world.complete_mesh(pos);
        let chunk = world.chunk(pos).unwrap();
        assert!(!chunk.flags().contains(ChunkFlags::MESHING));
        assert!(!chunk.flags().contains(ChunkFlags::DIRTY));
        assert!(chunk.flags().contains(ChunkFlags::ADDED));
    }

    #[test]
    fn get_voxel_by_world_scales_by_dimension() {
        let mut world = World::new(
            WorldConfig {
                dimension: 2.0,
                ..WorldConfig::default()
            },
            Box::new(TestCatalog),
            None,
        )
        .unwrap();
        prepare_region(&mut world, ChunkPos::new(0, 0, 0));
        world.set_voxel(VoxelPos::new(3, 0, 0), STONE);
        // World x in [6, 8) maps to voxel x = 3.
        assert_eq!(world.get_voxel_by_world(7.5, 1.0, 0.5), STONE);
        assert_eq!(world.get_voxel_by_world(5.9, 1.0, 0.5), BLOCK_AIR);
    }
}
