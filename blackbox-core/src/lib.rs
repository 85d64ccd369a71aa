//! # blackbox-core
//!
//! Platform-agnostic core of the black-box recorder.
//!
//! Keeps a rolling window of recent audio in memory and, when a trigger
//! fires, writes that window plus a short live extension to a WAV file.
//! Platform backends implement [`CaptureBackend`] and [`TriggerSource`] and
//! plug into the generic [`CaptureLoop`].
//!
//! ## Architecture
//!
//! ```text
//! blackbox-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureStream, TriggerSource, KeyInput, RecorderDelegate
//! ├── models/       ← CaptureError, RecorderState, RecorderConfig, AudioFormat, etc.
//! ├── processing/   ← RingBuffer, PCM conversion, WAV header generation
//! ├── selection/    ← MicrophoneSelector
//! ├── trigger/      ← TriggerState, Debouncer, KeyboardTrigger
//! ├── session/      ← CaptureLoop, SaveOnTrigger
//! └── storage/      ← RecordingWriter, metadata
//! ```

pub mod models;
pub mod processing;
pub mod selection;
pub mod session;
pub mod storage;
pub mod traits;
pub mod trigger;

#[cfg(test)]
mod test_support;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioChunk, AudioFormat, ChunkRead, DeviceDescriptor, DeviceSelection, StreamRequest};
pub use models::config::{RecorderConfig, TriggerConfig};
pub use models::error::{CaptureError, TriggerError};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::RecorderState;
pub use processing::ring_buffer::RingBuffer;
pub use selection::microphone::MicrophoneSelector;
pub use session::capture_loop::{open_with_fallback, CaptureLoop, CaptureStats, RecorderSession};
pub use session::save::SaveOnTrigger;
pub use storage::recording_writer::RecordingWriter;
pub use traits::capture_backend::{CaptureBackend, CaptureStream};
pub use traits::key_input::{Key, KeyInput};
pub use traits::recorder_delegate::RecorderDelegate;
pub use traits::trigger_source::TriggerSource;
pub use trigger::debounce::Debouncer;
pub use trigger::keyboard::KeyboardTrigger;
pub use trigger::state::TriggerState;
