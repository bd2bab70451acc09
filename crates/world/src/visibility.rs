//! Observer-driven chunk visibility.
//!
//! Tracks which chunk the observer occupies, keeps a sphere of chunks around
//! it populated, triggers mesh rebuilds for dirty chunks, detaches chunks
//! that fell out of range, and reports world readiness once the initial
//! sphere is fully populated. Chunks are only ever detached here, never
//! destroyed; storage is not a visibility concern.

use tracing::debug;
use voxelfield_core::{voxel_to_chunk, world_to_voxel, ChunkPos, WorldConfig};

use crate::chunk::{Chunk, ChunkFlags};
use crate::events::{EventQueue, WorldEvent};
use crate::lighting::{propagate_chunk, BlockCatalog};
use crate::scheduler::DirtyChunkScheduler;
use crate::storage::ChunkStore;

/// Consumes dirty chunks and turns them into renderable geometry.
///
/// Implemented outside this crate; invoked only for chunks that are dirty
/// and not already meshing, with the chunk's lighting pass completed.
pub trait ChunkMesher {
    /// Rebuild the mesh for a chunk, reading voxels and light through the
    /// padded halo.
    fn remesh(&mut self, chunk: &Chunk);
}

/// Tracks the observer and the sphere of chunks around it.
pub struct VisibilityTracker {
    render_radius: i32,
    current_chunk: Option<ChunkPos>,
    sphere: Vec<ChunkPos>,
    ready_emitted: bool,
}

impl VisibilityTracker {
    /// Create a tracker for the given chunk radius.
    pub fn new(render_radius: i32) -> Self {
        Self {
            render_radius,
            current_chunk: None,
            sphere: Vec::new(),
            ready_emitted: false,
        }
    }

    /// Chunk the observer currently occupies, if a tick has run.
    pub fn current_chunk(&self) -> Option<ChunkPos> {
        self.current_chunk
    }

    /// Chunk coordinates of the current render sphere.
    pub fn sphere(&self) -> &[ChunkPos] {
        &self.sphere
    }

    /// True once `WorldReady` has been emitted.
    pub fn is_ready(&self) -> bool {
        self.ready_emitted
    }

    /// Run the per-tick visibility pass for an observer at a world-space
    /// position.
    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        observer: (f32, f32, f32),
        config: &WorldConfig,
        store: &mut ChunkStore,
        catalog: &dyn BlockCatalog,
        scheduler: &mut DirtyChunkScheduler,
        events: &mut EventQueue,
        mesher: Option<&mut dyn ChunkMesher>,
    ) {
        let voxel = world_to_voxel(observer.0, observer.1, observer.2, config.dimension);
        let observer_chunk = voxel_to_chunk(voxel, config.chunk_size as i32);

        if self.current_chunk != Some(observer_chunk) {
            let from = self.current_chunk;
            self.current_chunk = Some(observer_chunk);
            self.rebuild_sphere(observer_chunk);
            debug!(
                chunk = %observer_chunk,
                chunks = self.sphere.len(),
                "observer moved"
            );
            for &pos in &self.sphere {
                let chunk = store.get_or_create(pos);
                if !chunk
                    .flags()
                    .intersects(ChunkFlags::INITIALIZED | ChunkFlags::PENDING)
                {
                    scheduler.enqueue(pos);
                }
            }
            events.push_back(WorldEvent::ChunkChanged {
                from,
                to: observer_chunk,
            });
        }

        self.refresh_visible_set(config, store, catalog, mesher, observer);

        if !self.ready_emitted
            && !self.sphere.is_empty()
            && self.sphere.iter().all(|&pos| {
                store
                    .get(pos)
                    .is_some_and(|chunk| chunk.flags().contains(ChunkFlags::INITIALIZED))
            })
        {
            self.ready_emitted = true;
            events.push_back(WorldEvent::WorldReady);
        }
    }

    fn rebuild_sphere(&mut self, center: ChunkPos) {
        let r = self.render_radius;
        self.sphere.clear();
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    let pos = center.offset(dx, dy, dz);
                    if center.distance_sq(pos) <= (r as i64) * (r as i64) {
                        self.sphere.push(pos);
                    }
                }
            }
        }
    }

    /// Add eligible chunks to the visible set, trigger mesh rebuilds, and
    /// detach chunks out of range.
    fn refresh_visible_set(
        &mut self,
        config: &WorldConfig,
        store: &mut ChunkStore,
        catalog: &dyn BlockCatalog,
        mut mesher: Option<&mut dyn ChunkMesher>,
        observer: (f32, f32, f32),
    ) {
        for i in 0..self.sphere.len() {
            let pos = self.sphere[i];
            let Some(chunk) = store.get(pos) else {
                continue;
            };
            let flags = chunk.flags();
            if !flags.contains(ChunkFlags::INITIALIZED) {
                continue;
            }

            if !flags.contains(ChunkFlags::DIRTY) {
                store.get_mut(pos).expect("chunk present").insert_flags(ChunkFlags::ADDED);
                continue;
            }
            if flags.contains(ChunkFlags::MESHING) {
                // A build is in flight; drop the request.
                continue;
            }

            // The chunk and its loaded neighbors must carry valid light
            // before the mesher reads through the halo.
            propagate_chunk(store, catalog, config.max_light_level, pos);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        if (dx, dy, dz) != (0, 0, 0) {
                            propagate_chunk(
                                store,
                                catalog,
                                config.max_light_level,
                                pos.offset(dx, dy, dz),
                            );
                        }
                    }
                }
            }

            let chunk = store.get_mut(pos).expect("chunk present");
            chunk.insert_flags(ChunkFlags::MESHING);
            if let Some(mesher) = mesher.as_deref_mut() {
                mesher.remesh(chunk);
            }
            chunk.remove_flags(ChunkFlags::MESHING | ChunkFlags::DIRTY);
            chunk.insert_flags(ChunkFlags::ADDED);
        }

        // Detach chunks beyond the world-space render range.
        let range = self.render_radius as f32 * config.chunk_size as f32 * config.dimension;
        let range_sq = range * range;
        let world_edge = config.chunk_size as f32 * config.dimension;
        for chunk in store.iter_mut() {
            if !chunk.flags().contains(ChunkFlags::ADDED) {
                continue;
            }
            let min = chunk.min_inner();
            let center = (
                (min.x as f32 + config.chunk_size as f32 / 2.0) * config.dimension,
                (min.y as f32 + config.chunk_size as f32 / 2.0) * config.dimension,
                (min.z as f32 + config.chunk_size as f32 / 2.0) * config.dimension,
            );
            let dx = center.0 - observer.0;
            let dy = center.1 - observer.1;
            let dz = center.2 - observer.2;
            // Allow the chunk's own extent before detaching its center.
            if dx * dx + dy * dy + dz * dz > range_sq + world_edge * world_edge {
                chunk.remove_flags(ChunkFlags::ADDED);
            }
        }
    }
}
