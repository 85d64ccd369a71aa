use std::path::PathBuf;
use std::time::Duration;

use crate::models::audio_models::AudioFormat;
use crate::processing::wav_format::MAX_WAV_DATA_BYTES;

/// Configuration for the rolling recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderConfig {
    /// Length of the rolling window kept in memory, in seconds (default: 30).
    pub buffer_seconds: u32,

    /// Live audio appended after a trigger, in seconds (default: 10).
    pub extension_seconds: u32,

    /// Frames per device read (default: 512).
    pub chunk_frames: u32,

    /// Requested sample rate in Hz when no device rate is known (default: 16000).
    pub sample_rate: u32,

    /// Maximum channel count to request from any device (default: 1).
    pub channels: u16,

    /// Directory where recordings are written (default: `audios`).
    pub output_directory: PathBuf,

    /// Write a JSON sidecar next to every recording (default: false).
    pub write_metadata: bool,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.buffer_seconds == 0 {
            return Err("buffer duration must be positive".into());
        }
        if self.extension_seconds == 0 {
            return Err("extension duration must be positive".into());
        }
        if self.chunk_frames == 0 {
            return Err("chunk size must be positive".into());
        }
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if !(1..=8).contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.recording_bytes() > MAX_WAV_DATA_BYTES {
            return Err(format!(
                "{}s window plus {}s extension exceeds the WAV size limit",
                self.buffer_seconds, self.extension_seconds
            ));
        }
        Ok(())
    }

    /// PCM bytes of a full window plus extension at the configured rate.
    pub fn recording_bytes(&self) -> u64 {
        let format = AudioFormat::new(self.channels, self.sample_rate, self.chunk_frames);
        let chunks = format.chunks_for(self.buffer_seconds) as u64 + format.chunks_for(self.extension_seconds) as u64;
        chunks * format.chunk_bytes() as u64
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: 30,
            extension_seconds: 10,
            chunk_frames: 512,
            sample_rate: 16_000,
            channels: 1,
            output_directory: PathBuf::from("audios"),
            write_metadata: false,
        }
    }
}

/// Configuration shared by the trigger sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerConfig {
    /// BCM pin number of the push button (default: 2).
    pub button_pin: u8,

    /// Window after an accepted press during which further edges are ignored.
    pub debounce: Duration,

    /// Pause between keyboard polls.
    pub poll_interval: Duration,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            button_pin: 2,
            debounce: Duration::from_millis(300),
            poll_interval: Duration::from_millis(100),
        }
    }
}
