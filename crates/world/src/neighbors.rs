//! Neighbor-chunk resolution for voxels near chunk boundaries.
//!
//! A voxel within `padding` of a chunk face is mirrored into every neighbor
//! chunk whose halo covers it: up to three face neighbors, three edge
//! neighbors, and one corner neighbor depending on how many faces it is near.

use voxelfield_core::ChunkPos;

/// The six axis-aligned directions used by BFS propagation.
pub const VOXEL_NEIGHBORS: [(i32, i32, i32); 6] = [
    (1, 0, 0),
    (-1, 0, 0),
    (0, 1, 0),
    (0, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Chunk offsets whose halo covers a voxel at the given chunk-local
/// coordinate, deduplicated and excluding the owning chunk itself.
///
/// Proximity booleans per face: a/b/c for -x/-y/-z, d/e/f for +x/+y/+z. A
/// voxel can be near at most one face per axis because `padding` is narrower
/// than half the chunk, so opposing pairs never hold together; the resolver
/// enumerates single faces, two-axis edges, and three-axis corners.
pub fn neighbor_offsets(
    local: (i32, i32, i32),
    size: i32,
    padding: i32,
) -> Vec<(i32, i32, i32)> {
    let (lx, ly, lz) = local;
    // -1, 0 or +1 per axis, depending on which face (if any) is near.
    let step = |l: i32| {
        if l < padding {
            -1
        } else if l >= size - padding {
            1
        } else {
            0
        }
    };
    let (sx, sy, sz) = (step(lx), step(ly), step(lz));

    let mut offsets = Vec::with_capacity(7);
    // Faces.
    if sx != 0 {
        offsets.push((sx, 0, 0));
    }
    if sy != 0 {
        offsets.push((0, sy, 0));
    }
    if sz != 0 {
        offsets.push((0, 0, sz));
    }
    // Edges.
    if sx != 0 && sy != 0 {
        offsets.push((sx, sy, 0));
    }
    if sx != 0 && sz != 0 {
        offsets.push((sx, 0, sz));
    }
    if sy != 0 && sz != 0 {
        offsets.push((0, sy, sz));
    }
    // Corner.
    if sx != 0 && sy != 0 && sz != 0 {
        offsets.push((sx, sy, sz));
    }
    offsets
}

/// Chunk coordinates whose halo covers the given voxel of `owner`.
///
/// Callers must tolerate any of these chunks not existing yet; an absent
/// neighbor simply has no halo to keep in sync.
pub fn neighbor_chunks(
    owner: ChunkPos,
    local: (i32, i32, i32),
    size: i32,
    padding: i32,
) -> Vec<ChunkPos> {
    neighbor_offsets(local, size, padding)
        .into_iter()
        .map(|(dx, dy, dz)| owner.offset(dx, dy, dz))
        .collect()
}
