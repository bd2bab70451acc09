//! Dual-channel BFS lighting propagation.
//!
//! Implements torchlight and sunlight flood fill using breadth-first search
//! queues that follow light across chunk boundaries. Every light write is
//! mirrored into the halo of each neighbor chunk covering the cell, so the
//! halo invariant holds after any pass. Removal runs in two phases: clear
//! everything the removed source lit, then re-flood from cells that turned
//! out to have an independent source.

use std::collections::VecDeque;

use tracing::instrument;
use voxelfield_core::{voxel_to_chunk_local, ChunkPos, VoxelPos};

use crate::chunk::{BlockId, ChunkFlags, BLOCK_AIR};
use crate::neighbors::{neighbor_chunks, VOXEL_NEIGHBORS};
use crate::storage::ChunkStore;

/// Which light channel a pass operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    /// Block-emitted light, attenuating by 1 per voxel in every direction.
    Torch,
    /// Sky-fed light, propagating straight down without attenuation while at
    /// full strength.
    Sun,
}

/// Light propagation queue entry.
#[derive(Debug, Clone, Copy)]
pub struct LightNode {
    /// Voxel the level applies to.
    pub voxel: VoxelPos,
    /// Light level already written at that voxel.
    pub level: u8,
}

/// Trait for querying block metadata the light engine needs.
pub trait BlockCatalog {
    /// Whether light passes through the block.
    fn is_transparent(&self, id: BlockId) -> bool;
    /// Torchlight level the block emits, 0 for non-emitters.
    fn light_emission(&self, id: BlockId) -> u8;
}

/// Catalog with no emitters where only air transmits light.
pub struct DefaultCatalog;

impl BlockCatalog for DefaultCatalog {
    fn is_transparent(&self, id: BlockId) -> bool {
        id == BLOCK_AIR
    }

    fn light_emission(&self, _id: BlockId) -> u8 {
        0
    }
}

/// Read a light level through the owning chunk; 0 in unloaded regions.
pub(crate) fn get_light(store: &ChunkStore, voxel: VoxelPos, kind: LightKind) -> u8 {
    match store.chunk_at_voxel(voxel) {
        Some(chunk) => match kind {
            LightKind::Torch => chunk.get_torch_light(voxel.x, voxel.y, voxel.z),
            LightKind::Sun => chunk.get_sunlight(voxel.x, voxel.y, voxel.z),
        },
        None => 0,
    }
}

/// Write a light level into the owning chunk and mirror it into every loaded
/// neighbor chunk whose halo covers the voxel. Returns false when the owning
/// chunk does not exist.
pub(crate) fn set_light(
    store: &mut ChunkStore,
    voxel: VoxelPos,
    level: u8,
    kind: LightKind,
) -> bool {
    let size = store.chunk_size() as i32;
    let Some(owner) = store.chunk_at_voxel_mut(voxel) else {
        return false;
    };
    let owner_pos = owner.position();
    let padding = owner.padding() as i32;
    write_light(owner, voxel, level, kind);

    let local = voxel_to_chunk_local(voxel, size);
    for pos in neighbor_chunks(owner_pos, local, size, padding) {
        if let Some(neighbor) = store.get_mut(pos) {
            write_light(neighbor, voxel, level, kind);
        }
    }
    true
}

fn write_light(chunk: &mut crate::chunk::Chunk, voxel: VoxelPos, level: u8, kind: LightKind) {
    match kind {
        LightKind::Torch => chunk.set_torch_light(voxel.x, voxel.y, voxel.z, level),
        LightKind::Sun => chunk.set_sunlight(voxel.x, voxel.y, voxel.z, level),
    }
}

/// Block id at a voxel, or None when its owning chunk is not loaded.
pub(crate) fn voxel_id(store: &ChunkStore, voxel: VoxelPos) -> Option<BlockId> {
    store
        .chunk_at_voxel(voxel)
        .map(|chunk| chunk.get_voxel(voxel.x, voxel.y, voxel.z))
}

/// Flood fill light from a queue of already-lit seed nodes.
///
/// A neighbor receives `level - 1` only when it is transparent and its
/// current level is at least 2 below the source; the margin keeps
/// propagation monotonically decreasing so equal fronts never re-queue each
/// other. Unloaded neighbors are skipped; propagation resumes when the chunk
/// is created and its halo back-filled.
pub(crate) fn flood(
    store: &mut ChunkStore,
    catalog: &dyn BlockCatalog,
    max_light_level: u8,
    mut queue: VecDeque<LightNode>,
    kind: LightKind,
) {
    while let Some(LightNode { voxel, level }) = queue.pop_front() {
        if level == 0 {
            continue;
        }
        for (dx, dy, dz) in VOXEL_NEIGHBORS {
            let neighbor = voxel.offset(dx, dy, dz);
            let Some(id) = voxel_id(store, neighbor) else {
                continue;
            };

            // Sunlight at full strength falls straight down undimmed.
            let sunlight_down = kind == LightKind::Sun && dy == -1 && level == max_light_level;
            let next = if sunlight_down { level } else { level - 1 };

            if !catalog.is_transparent(id) || get_light(store, neighbor, kind) >= next {
                continue;
            }

            set_light(store, neighbor, next, kind);
            queue.push_back(LightNode {
                voxel: neighbor,
                level: next,
            });
        }
    }
}

/// Remove the light source at a voxel. Steps:
///
/// 1. Clear, in flood-fill order, every cell whose light can only have come
///    from this source (strictly weaker than the front reaching it).
/// 2. Cells at least as bright as the front have an independent source; they
///    are kept and re-flooded afterwards to patch the cleared region.
pub(crate) fn remove(
    store: &mut ChunkStore,
    catalog: &dyn BlockCatalog,
    max_light_level: u8,
    source: VoxelPos,
    kind: LightKind,
) {
    if store.chunk_at_voxel(source).is_none() {
        // Not yet loaded; nothing was lit from here.
        return;
    }
    let level = get_light(store, source, kind);
    if level == 0 {
        return;
    }

    let mut removal = VecDeque::new();
    let mut fill = VecDeque::new();
    removal.push_back(LightNode {
        voxel: source,
        level,
    });
    set_light(store, source, 0, kind);

    while let Some(LightNode { voxel, level }) = removal.pop_front() {
        for (dx, dy, dz) in VOXEL_NEIGHBORS {
            let neighbor = voxel.offset(dx, dy, dz);
            if voxel_id(store, neighbor).is_none() {
                continue;
            }
            let neighbor_level = get_light(store, neighbor, kind);
            if neighbor_level == 0 {
                continue;
            }

            // Undimmed sunlight columns collapse downward with the source.
            let sunlight_down = kind == LightKind::Sun
                && dy == -1
                && level == max_light_level
                && neighbor_level == max_light_level;

            if neighbor_level < level || sunlight_down {
                set_light(store, neighbor, 0, kind);
                removal.push_back(LightNode {
                    voxel: neighbor,
                    level: neighbor_level,
                });
            } else if kind == LightKind::Torch || dy != -1 || neighbor_level > level {
                fill.push_back(LightNode {
                    voxel: neighbor,
                    level: neighbor_level,
                });
            }
        }
    }

    flood(store, catalog, max_light_level, fill, kind);
}

/// Initial lighting pass for a freshly populated chunk.
///
/// Seeds sunlight into every above-column-top transparent cell and queues
/// horizontal spill where a taller column shadows a shorter one, then seeds
/// torchlight from catalog-emissive voxels, and floods both channels. Sky
/// openness is judged against the chunk's own column tops; vertical stacks
/// receive sunlight from above through normal flood propagation.
#[instrument(skip(store, catalog), fields(chunk = %pos))]
pub(crate) fn propagate_chunk(
    store: &mut ChunkStore,
    catalog: &dyn BlockCatalog,
    max_light_level: u8,
    pos: ChunkPos,
) {
    let Some(chunk) = store.get(pos) else {
        return;
    };
    if !chunk.flags().contains(ChunkFlags::NEEDS_PROPAGATION) {
        return;
    }

    let min = chunk.min_inner();
    let max = chunk.max_inner();

    let mut sky_cells: Vec<VoxelPos> = Vec::new();
    let mut sun_queue = VecDeque::new();
    let mut torch_seeds: Vec<(VoxelPos, u8)> = Vec::new();

    for vz in min.z..max.z {
        for vx in min.x..max.x {
            let top = chunk.column_top(vx, vz);
            for vy in (min.y..max.y).rev() {
                let id = chunk.get_voxel(vx, vy, vz);
                let ly = vy - min.y;

                if ly > top && catalog.is_transparent(id) {
                    let voxel = VoxelPos::new(vx, vy, vz);
                    sky_cells.push(voxel);
                    // Spill sideways where a neighboring column rises above
                    // this cell and shadows the air beside it.
                    let spills = [(1, 0), (-1, 0), (0, 1), (0, -1)]
                        .iter()
                        .any(|(ox, oz)| chunk.column_top(vx + ox, vz + oz) > ly);
                    if spills {
                        sun_queue.push_back(LightNode {
                            voxel,
                            level: max_light_level,
                        });
                    }
                }

                let emission = catalog.light_emission(id);
                if emission > 0 {
                    torch_seeds.push((VoxelPos::new(vx, vy, vz), emission));
                }
            }
        }
    }

    let chunk = store.get_mut(pos).expect("chunk present");
    chunk.remove_flags(ChunkFlags::NEEDS_PROPAGATION);
    chunk.insert_flags(ChunkFlags::NEEDS_SAVING);

    for voxel in sky_cells {
        set_light(store, voxel, max_light_level, LightKind::Sun);
    }
    let mut torch_queue = VecDeque::new();
    for (voxel, emission) in torch_seeds {
        set_light(store, voxel, emission, LightKind::Torch);
        torch_queue.push_back(LightNode {
            voxel,
            level: emission,
        });
    }

    flood(store, catalog, max_light_level, torch_queue, LightKind::Torch);
    flood(store, catalog, max_light_level, sun_queue, LightKind::Sun);
}
