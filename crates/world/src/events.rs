//! Outbound event surface.
//!
//! The core never consumes its own events; it queues them after the
//! triggering state change commits, and the embedding layer drains them
//! once per tick. Emission order beyond that is not part of the contract.

use std::collections::VecDeque;

use voxelfield_core::ChunkPos;

/// Notifications emitted toward the rendering/orchestration layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    /// The observer crossed into a different chunk.
    ChunkChanged {
        /// Chunk the observer left, None on the first placement.
        from: Option<ChunkPos>,
        /// Chunk the observer now occupies.
        to: ChunkPos,
    },
    /// A chunk awaits population through an external channel.
    DataNeeded {
        /// The pending chunk.
        pos: ChunkPos,
    },
    /// Every chunk of the initial render sphere is initialized.
    WorldReady,
}

/// FIFO queue of pending outbound events.
pub type EventQueue = VecDeque<WorldEvent>;
