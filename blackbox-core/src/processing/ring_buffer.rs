use std::collections::VecDeque;

use crate::models::audio_models::AudioChunk;

/// Fixed-capacity FIFO of audio chunks holding the most recent window.
///
/// Overflow behavior: a push into a full buffer evicts exactly one oldest
/// chunk. Insertion order is arrival order is temporal order.
///
/// Not synchronized. The capture thread is the only caller of `push` and
/// `drain_all`; a save must be initiated from that thread, never from a
/// trigger callback.
#[derive(Debug)]
pub struct RingBuffer {
    chunks: VecDeque<AudioChunk>,
    capacity: usize,
}

impl RingBuffer {
    /// A capacity of zero is raised to one so the latest chunk is always kept.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            chunks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Capacity for `seconds` of audio at `sample_rate` in `chunk_frames` reads:
    /// `ceil(sample_rate / chunk_frames * seconds)`.
    pub fn capacity_for(sample_rate: u32, chunk_frames: u32, seconds: u32) -> usize {
        if chunk_frames == 0 {
            return 1;
        }
        (sample_rate as u64 * seconds as u64).div_ceil(chunk_frames as u64) as usize
    }

    /// Append a chunk, evicting the oldest one first if the buffer is full.
    pub fn push(&mut self, chunk: AudioChunk) {
        if self.chunks.len() == self.capacity {
            self.chunks.pop_front();
        }
        self.chunks.push_back(chunk);
    }

    /// Remove and return every held chunk, oldest first.
    pub fn drain_all(&mut self) -> Vec<AudioChunk> {
        self.chunks.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.chunks.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total buffered PCM bytes.
    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(AudioChunk::len).sum()
    }
}
