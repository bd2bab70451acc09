//! Coordinate frames and conversions.
//!
//! Four frames are in play: world space (continuous, voxel edge length
//! `dimension` world units), voxel space (integer cube coordinates), chunk
//! space (integer chunk coordinates), and chunk-local space (offsets within a
//! chunk). All conversions floor toward negative infinity so negative
//! coordinates map correctly.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Delimiter used by the reversible chunk-name encoding. A signed integer's
/// text form never contains it, so parsing is unambiguous.
pub const CHUNK_NAME_DELIMITER: char = '_';

/// Voxel-space position (integer cube coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoxelPos {
    /// Voxel X coordinate.
    pub x: i32,
    /// Voxel Y coordinate.
    pub y: i32,
    /// Voxel Z coordinate.
    pub z: i32,
}

impl VoxelPos {
    /// Construct from components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset by a delta on each axis.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for VoxelPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Chunk coordinate (X, Y, Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ChunkPos {
    /// Chunk X coordinate.
    pub x: i32,
    /// Chunk Y coordinate.
    pub y: i32,
    /// Chunk Z coordinate.
    pub z: i32,
}

impl ChunkPos {
    /// Construct from components.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Offset by a delta on each axis.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Squared Euclidean distance to another chunk coordinate.
    pub fn distance_sq(self, other: ChunkPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dy * dy + dz * dz
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Error produced when decoding a chunk name fails.
///
/// Malformed names must never silently produce coordinates, so every decode
/// path reports the offending input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkNameError {
    /// The name did not split into exactly three fields.
    #[error("chunk name `{0}` must have exactly three `_`-separated fields")]
    FieldCount(String),
    /// One of the fields was not a valid signed integer.
    #[error("chunk name `{0}` has a non-integer field `{1}`")]
    BadField(String, String),
}

/// Map a world-space position to the voxel containing it.
///
/// `dimension` is the voxel edge length in world units. Uses `floor`, not
/// truncation, so negative world coordinates land in the correct voxel.
pub fn world_to_voxel(wx: f32, wy: f32, wz: f32, dimension: f32) -> VoxelPos {
    VoxelPos::new(
        (wx / dimension).floor() as i32,
        (wy / dimension).floor() as i32,
        (wz / dimension).floor() as i32,
    )
}

/// Map a voxel position to the chunk owning it.
pub fn voxel_to_chunk(voxel: VoxelPos, chunk_size: i32) -> ChunkPos {
    ChunkPos::new(
        voxel.x.div_euclid(chunk_size),
        voxel.y.div_euclid(chunk_size),
        voxel.z.div_euclid(chunk_size),
    )
}

/// Map a voxel position to its chunk-local offset, each axis in
/// `[0, chunk_size)`.
pub fn voxel_to_chunk_local(voxel: VoxelPos, chunk_size: i32) -> (i32, i32, i32) {
    (
        voxel.x.rem_euclid(chunk_size),
        voxel.y.rem_euclid(chunk_size),
        voxel.z.rem_euclid(chunk_size),
    )
}

/// Encode a chunk coordinate as a stable, reversible name.
///
/// The format (`"x_y_z"` with signed decimal fields) keys persistence records
/// and network payloads, so it must round-trip exactly.
pub fn chunk_name(pos: ChunkPos) -> String {
    format!(
        "{}{d}{}{d}{}",
        pos.x,
        pos.y,
        pos.z,
        d = CHUNK_NAME_DELIMITER
    )
}

/// Decode a chunk name produced by [`chunk_name`].
pub fn parse_chunk_name(name: &str) -> Result<ChunkPos, ChunkNameError> {
    let fields: Vec<&str> = name.split(CHUNK_NAME_DELIMITER).collect();
    if fields.len() != 3 {
        return Err(ChunkNameError::FieldCount(name.to_owned()));
    }
    let parse = |field: &str| {
        field
            .parse::<i32>()
            .map_err(|_| ChunkNameError::BadField(name.to_owned(), field.to_owned()))
    };
    Ok(ChunkPos::new(
        parse(fields[0])?,
        parse(fields[1])?,
        parse(fields[2])?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_name_round_trips() {
        let cases = [
            ChunkPos::new(0, 0, 0),
            ChunkPos::new(1, 2, 3),
            ChunkPos::new(-1, -2, -3),
            ChunkPos::new(i32::MAX, i32::MIN, 7),
        ];
        for pos in cases {
            assert_eq!(parse_chunk_name(&chunk_name(pos)), Ok(pos));
        }
    }

    #[test]
    fn parse_rejects_malformed_names() {
        assert!(matches!(
            parse_chunk_name("1_2"),
            Err(ChunkNameError::FieldCount(_))
        ));
        assert!(matches!(
            parse_chunk_name("1_2_3_4"),
            Err(ChunkNameError::FieldCount(_))
        ));
        assert!(matches!(
            parse_chunk_name("1_two_3"),
            Err(ChunkNameError::BadField(_, _))
        ));
        assert!(matches!(
            parse_chunk_name(""),
            Err(ChunkNameError::FieldCount(_))
        ));
    }

    #[test]
    fn world_to_voxel_floors_negatives() {
        assert_eq!(world_to_voxel(0.5, 0.5, 0.5, 1.0), VoxelPos::new(0, 0, 0));
        assert_eq!(
            world_to_voxel(-0.5, -1.0, -1.5, 1.0),
            VoxelPos::new(-1, -1, -2)
        );
        // Non-unit voxel edge.
        assert_eq!(world_to_voxel(-0.5, 3.9, 4.0, 2.0), VoxelPos::new(-1, 1, 2));
    }

    #[test]
    fn voxel_to_chunk_floors_negatives() {
        assert_eq!(
            voxel_to_chunk(VoxelPos::new(15, 0, 16), 16),
            ChunkPos::new(0, 0, 1)
        );
        assert_eq!(
            voxel_to_chunk(VoxelPos::new(-1, -16, -17), 16),
            ChunkPos::new(-1, -1, -2)
        );
    }

    #[test]
    fn chunk_local_stays_in_range() {
        assert_eq!(voxel_to_chunk_local(VoxelPos::new(-1, -16, 17), 16), (15, 0, 1));
        assert_eq!(voxel_to_chunk_local(VoxelPos::new(31, -17, 0), 16), (15, 15, 0));
    }

    #[test]
    fn chunk_plus_local_reconstructs_voxel() {
        let size = 16;
        for voxel in [
            VoxelPos::new(5, -3, 100),
            VoxelPos::new(-40, 0, -1),
            VoxelPos::new(16, 16, -16),
        ] {
            let chunk = voxel_to_chunk(voxel, size);
            let (lx, ly, lz) = voxel_to_chunk_local(voxel, size);
            assert_eq!(
                VoxelPos::new(
                    chunk.x * size + lx,
                    chunk.y * size + ly,
                    chunk.z * size + lz
                ),
                voxel
            );
        }
    }

    #[test]
    fn chunk_pos_serde_round_trip() {
        let pos = ChunkPos::new(-5, 2, 10);
        let json = serde_json::to_string(&pos).unwrap();
        let back: ChunkPos = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pos);
    }
}
