//! Sample conversion to 16-bit signed PCM and fixed-size chunk assembly.

use crate::models::audio_models::AudioChunk;

/// Convert a float sample in [-1.0, 1.0] to i16, clamping out-of-range input.
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

/// Convert an unsigned sample centred on 32768 to i16.
pub fn u16_to_i16(sample: u16) -> i16 {
    (sample as i32 - 32768) as i16
}

/// Append `samples` to `out` as little-endian i16 bytes.
pub fn extend_i16_le(out: &mut Vec<u8>, samples: impl IntoIterator<Item = i16>) {
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
}

/// Collects PCM bytes from device callbacks of arbitrary length and cuts
/// them into chunks of exactly `chunk_bytes`.
#[derive(Debug)]
pub struct ChunkAssembler {
    pending: Vec<u8>,
    chunk_bytes: usize,
}

impl ChunkAssembler {
    pub fn new(chunk_bytes: usize) -> Self {
        let chunk_bytes = chunk_bytes.max(1);
        Self {
            pending: Vec::with_capacity(chunk_bytes * 2),
            chunk_bytes,
        }
    }

    /// Buffer `bytes` and hand every completed chunk to `emit`.
    pub fn push(&mut self, bytes: &[u8], mut emit: impl FnMut(AudioChunk)) {
        self.pending.extend_from_slice(bytes);
        while self.pending.len() >= self.chunk_bytes {
            let rest = self.pending.split_off(self.chunk_bytes);
            let full = std::mem::replace(&mut self.pending, rest);
            emit(AudioChunk::new(full));
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
