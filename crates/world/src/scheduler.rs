//! Budgeted population of dirty chunks.
//!
//! Chunks needing terrain enter a FIFO queue and at most
//! `max_chunks_per_tick` of them are processed per tick, keeping worst-case
//! tick latency bounded no matter how many chunks the observer's movement
//! uncovered.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::{debug, warn};
use voxelfield_core::ChunkPos;

use crate::chunk::ChunkFlags;
use crate::events::{EventQueue, WorldEvent};
use crate::generator::ChunkGenerator;
use crate::storage::ChunkStore;

/// FIFO scheduler for chunk population work.
pub struct DirtyChunkScheduler {
    queue: VecDeque<ChunkPos>,
    queued: BTreeSet<ChunkPos>,
    attempts: BTreeMap<ChunkPos, u32>,
    generator: Option<Box<dyn ChunkGenerator>>,
    max_chunks_per_tick: usize,
    max_generation_attempts: u32,
}

impl DirtyChunkScheduler {
    /// Create a scheduler, optionally owning an internal generator.
    ///
    /// Without a generator every dequeued chunk is marked pending and
    /// signalled for external population.
    pub fn new(
        generator: Option<Box<dyn ChunkGenerator>>,
        max_chunks_per_tick: usize,
        max_generation_attempts: u32,
    ) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: BTreeSet::new(),
            attempts: BTreeMap::new(),
            generator,
            max_chunks_per_tick,
            max_generation_attempts,
        }
    }

    /// Number of chunks currently waiting.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns true when no work is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue a chunk for population. Duplicates are suppressed.
    pub fn enqueue(&mut self, pos: ChunkPos) {
        if self.queued.insert(pos) {
            self.queue.push_back(pos);
        }
    }

    /// Drain up to the per-tick budget of queued chunks.
    ///
    /// Returns the number of chunks dequeued this tick.
    pub fn tick(&mut self, store: &mut ChunkStore, events: &mut EventQueue) -> usize {
        let mut processed = 0;
        while processed < self.max_chunks_per_tick {
            let Some(pos) = self.queue.pop_front() else {
                break;
            };
            processed += 1;
            self.queued.remove(&pos);

            let Some(chunk) = store.get_mut(pos) else {
                continue;
            };
            if chunk
                .flags()
                .intersects(ChunkFlags::INITIALIZED | ChunkFlags::PENDING)
            {
                // Populated meanwhile, or already handed to an external
                // channel; either way the guard drops the request.
                continue;
            }

            let Some(generator) = self.generator.as_mut() else {
                chunk.insert_flags(ChunkFlags::PENDING);
                events.push_back(WorldEvent::DataNeeded { pos });
                continue;
            };
            match generator.generate(chunk) {
                Ok(()) => {
                    chunk.rebuild_height_map();
                    chunk.insert_flags(ChunkFlags::INITIALIZED | ChunkFlags::DIRTY);
                    self.attempts.remove(&pos);
                    debug!(chunk = %pos, "chunk populated");
                }
                Err(err) => {
                    let attempts = {
                        let counter = self.attempts.entry(pos).or_insert(0);
                        *counter += 1;
                        *counter
                    };
                    if attempts < self.max_generation_attempts {
                        warn!(
                            chunk = %pos,
                            attempt = attempts,
                            "generation failed: {err:#}; retrying"
                        );
                        self.enqueue(pos);
                    } else {
                        // Surface the failure through the pending state and
                        // let an external channel take over.
                        warn!(
                            chunk = %pos,
                            "generation failed {attempts} times: {err:#}; deferring to external population"
                        );
                        self.attempts.remove(&pos);
                        chunk.insert_flags(ChunkFlags::PENDING);
                        events.push_back(WorldEvent::DataNeeded { pos });
                    }
                }
            }
        }
        processed
    }
}
