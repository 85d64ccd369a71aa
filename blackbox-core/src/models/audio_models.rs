use serde::{Deserialize, Serialize};

/// Bit depth of every chunk handed to the pipeline (signed 16-bit PCM).
pub const BITS_PER_SAMPLE: u16 = 16;

/// Negotiated format of an open capture stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub channels: u16,
    pub sample_rate: u32,
    pub chunk_frames: u32,
    pub bits_per_sample: u16,
}

impl AudioFormat {
    pub fn new(channels: u16, sample_rate: u32, chunk_frames: u32) -> Self {
        Self {
            channels,
            sample_rate,
            chunk_frames,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Size in bytes of one full chunk.
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_frames as usize * self.bytes_per_frame()
    }

    pub fn chunk_duration_secs(&self) -> f64 {
        self.chunk_frames as f64 / self.sample_rate as f64
    }

    /// Number of chunks needed to cover `seconds`, rounded up.
    pub fn chunks_for(&self, seconds: u32) -> usize {
        if self.chunk_frames == 0 {
            return 0;
        }
        (self.sample_rate as u64 * seconds as u64).div_ceil(self.chunk_frames as u64) as usize
    }

    /// Duration of `bytes` of PCM in this format.
    pub fn duration_of(&self, bytes: usize) -> f64 {
        let frames = bytes / self.bytes_per_frame().max(1);
        frames as f64 / self.sample_rate as f64
    }
}

/// What the capture loop asks the backend to open.
///
/// `device_index` of `None` means "use the system default input".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub device_index: Option<usize>,
    pub channels: u16,
    pub sample_rate: u32,
    pub chunk_frames: u32,
}

/// An enumerated capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub name: String,
    pub max_input_channels: u16,
    pub default_sample_rate: u32,
    pub priority: i32,
}

impl DeviceDescriptor {
    pub fn new(index: usize, name: impl Into<String>, max_input_channels: u16, default_sample_rate: u32) -> Self {
        Self {
            index,
            name: name.into(),
            max_input_channels,
            default_sample_rate,
            priority: 0,
        }
    }

    pub fn is_input(&self) -> bool {
        self.max_input_channels > 0
    }
}

/// Outcome of microphone selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    pub device_index: Option<usize>,
    pub device_name: Option<String>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DeviceSelection {
    pub fn system_default(channels: u16, sample_rate: u32) -> Self {
        Self {
            device_index: None,
            device_name: None,
            channels,
            sample_rate,
        }
    }

    pub fn stream_request(&self, chunk_frames: u32) -> StreamRequest {
        StreamRequest {
            device_index: self.device_index,
            channels: self.channels,
            sample_rate: self.sample_rate,
            chunk_frames,
        }
    }
}

/// One device read worth of interleaved 16-bit little-endian PCM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioChunk {
    bytes: Box<[u8]>,
}

impl AudioChunk {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Result of a single blocking read.
///
/// `overflowed` reports that the device dropped audio before this chunk; the
/// chunk itself is still usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRead {
    pub chunk: AudioChunk,
    pub overflowed: bool,
}
