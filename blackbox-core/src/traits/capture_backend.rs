use crate::models::audio_models::{AudioFormat, ChunkRead, DeviceDescriptor, StreamRequest};
use crate::models::error::CaptureError;

/// Interface to a platform audio subsystem.
///
/// Implemented by:
/// - `CpalBackend` (Linux, via cpal/ALSA)
/// - `ScriptedBackend` (tests)
///
/// Dropping the backend releases the subsystem handle.
pub trait CaptureBackend {
    type Stream: CaptureStream;

    /// Every device the subsystem reports, including ones without inputs.
    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError>;

    /// The platform's default input device.
    fn default_input_device(&self) -> Result<DeviceDescriptor, CaptureError>;

    /// Open a capture stream delivering chunks of `request.chunk_frames` frames.
    fn open(&self, request: &StreamRequest) -> Result<Self::Stream, CaptureError>;
}

/// An open capture stream.
///
/// Owned by exactly one thread, the capture loop.
pub trait CaptureStream {
    /// Format negotiated when the stream was opened.
    fn format(&self) -> AudioFormat;

    /// Block until one full chunk is available.
    ///
    /// A device overflow is reported through [`ChunkRead::overflowed`], not as
    /// an error. Errors mean the stream is unusable.
    fn read_chunk(&mut self) -> Result<ChunkRead, CaptureError>;

    /// Stop and close the stream. Calling it twice is a no-op.
    fn close(&mut self) -> Result<(), CaptureError>;
}
