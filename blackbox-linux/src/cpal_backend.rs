//! cpal capture backend.
//!
//! cpal delivers audio through a callback on its own thread. The callback
//! converts samples to 16-bit PCM, cuts them into chunks of the requested
//! size and hands them over a bounded channel; [`CpalCaptureStream::read_chunk`]
//! blocks on the receiving end. When the capture thread falls behind and the
//! channel is full, the chunk is dropped and the next read reports an
//! overflow.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;

use blackbox_core::models::audio_models::{AudioChunk, AudioFormat, ChunkRead, DeviceDescriptor, StreamRequest};
use blackbox_core::models::error::CaptureError;
use blackbox_core::processing::pcm::{extend_i16_le, f32_to_i16, u16_to_i16, ChunkAssembler};
use blackbox_core::traits::capture_backend::{CaptureBackend, CaptureStream};

use crate::device_enumerator::DeviceEnumerator;

/// Seconds of audio the callback may queue ahead of the capture thread.
const QUEUE_SECONDS: u32 = 2;

/// How long a read waits past one chunk duration before the stream is
/// considered dead.
const READ_GRACE: Duration = Duration::from_secs(2);

/// Sample formats we can convert, most preferred first.
const SUPPORTED_FORMATS: [SampleFormat; 3] = [SampleFormat::I16, SampleFormat::F32, SampleFormat::U16];

/// [`CaptureBackend`] over the default cpal host.
pub struct CpalBackend {
    enumerator: DeviceEnumerator,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self {
            enumerator: DeviceEnumerator::new(),
        }
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for CpalBackend {
    type Stream = CpalCaptureStream;

    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        self.enumerator.list_devices()
    }

    fn default_input_device(&self) -> Result<DeviceDescriptor, CaptureError> {
        self.enumerator.default_input_device()
    }

    fn open(&self, request: &StreamRequest) -> Result<CpalCaptureStream, CaptureError> {
        let device = match request.device_index {
            Some(index) => self.enumerator.device_at(index)?,
            None => self.enumerator.system_default_input()?,
        };
        let device_name = device.name().unwrap_or_else(|_| "unknown".into());
        let sample_format = negotiate_sample_format(&device, request.channels, request.sample_rate)?;

        let format = AudioFormat::new(request.channels, request.sample_rate, request.chunk_frames);
        let config = StreamConfig {
            channels: request.channels,
            sample_rate: cpal::SampleRate(request.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let (sender, receiver) = crossbeam_channel::bounded(queue_capacity(&format));
        let shared = Arc::new(SharedState::default());
        let chunk_bytes = format.chunk_bytes();

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16, _>(&device, &config, chunk_bytes, sender, &shared, |s| s),
            SampleFormat::F32 => build_stream::<f32, _>(&device, &config, chunk_bytes, sender, &shared, f32_to_i16),
            SampleFormat::U16 => build_stream::<u16, _>(&device, &config, chunk_bytes, sender, &shared, u16_to_i16),
            other => {
                return Err(CaptureError::ConfigurationFailed(format!(
                    "unsupported sample format: {:?}",
                    other
                )))
            }
        }?;
        stream
            .play()
            .map_err(|e| CaptureError::StreamOpenFailed(format!("failed to start input stream: {}", e)))?;

        log::info!(
            "Opened {} ({} channel(s), {} Hz, {:?} samples, {} frames per chunk)",
            device_name,
            format.channels,
            format.sample_rate,
            sample_format,
            format.chunk_frames
        );

        Ok(CpalCaptureStream {
            stream: Some(stream),
            receiver,
            shared,
            format,
            read_timeout: Duration::from_secs_f64(format.chunk_duration_secs()) + READ_GRACE,
        })
    }
}

/// Written by the cpal callback thread, read by the capture thread.
#[derive(Default)]
struct SharedState {
    overflowed: AtomicBool,
    last_error: Mutex<Option<String>>,
}

/// An open cpal input stream delivering fixed-size chunks.
pub struct CpalCaptureStream {
    stream: Option<cpal::Stream>,
    receiver: Receiver<AudioChunk>,
    shared: Arc<SharedState>,
    format: AudioFormat,
    read_timeout: Duration,
}

impl CaptureStream for CpalCaptureStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_chunk(&mut self) -> Result<ChunkRead, CaptureError> {
        if self.stream.is_none() {
            return Err(CaptureError::ReadFailed("stream closed".into()));
        }
        match self.receiver.recv_timeout(self.read_timeout) {
            Ok(chunk) => Ok(ChunkRead {
                chunk,
                overflowed: self.shared.overflowed.swap(false, Ordering::SeqCst),
            }),
            Err(RecvTimeoutError::Timeout) => {
                let reason = self
                    .shared
                    .last_error
                    .lock()
                    .clone()
                    .unwrap_or_else(|| format!("no audio received for {:.1}s", self.read_timeout.as_secs_f64()));
                Err(CaptureError::ReadFailed(reason))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(CaptureError::ReadFailed("audio callback disconnected".into()))
            }
        }
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        let paused = stream.pause();
        drop(stream);
        log::info!("Audio stream closed");
        paused.map_err(|e| CaptureError::Unknown(format!("failed to stop input stream: {}", e)))
    }
}

impl Drop for CpalCaptureStream {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("{}", e);
        }
    }
}

/// Pick a sample format the device offers for `channels` at `sample_rate`.
fn negotiate_sample_format(
    device: &cpal::Device,
    channels: u16,
    sample_rate: u32,
) -> Result<SampleFormat, CaptureError> {
    let available: Vec<SampleFormat> = device
        .supported_input_configs()
        .map_err(|e| CaptureError::StreamOpenFailed(format!("failed to query input configs: {}", e)))?
        .filter(|range| {
            range.channels() == channels
                && range.min_sample_rate().0 <= sample_rate
                && sample_rate <= range.max_sample_rate().0
        })
        .map(|range| range.sample_format())
        .collect();

    preferred_format(&available).ok_or_else(|| {
        CaptureError::StreamOpenFailed(format!(
            "device does not support {} channel(s) at {} Hz",
            channels, sample_rate
        ))
    })
}

fn preferred_format(available: &[SampleFormat]) -> Option<SampleFormat> {
    SUPPORTED_FORMATS
        .iter()
        .copied()
        .find(|format| available.contains(format))
}

fn queue_capacity(format: &AudioFormat) -> usize {
    format.chunks_for(QUEUE_SECONDS).max(2)
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    chunk_bytes: usize,
    sender: Sender<AudioChunk>,
    shared: &Arc<SharedState>,
    convert: F,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    F: Fn(T) -> i16 + Send + 'static,
{
    let mut assembler = ChunkAssembler::new(chunk_bytes);
    let mut pcm = Vec::with_capacity(chunk_bytes);
    let data_shared = Arc::clone(shared);
    let error_shared = Arc::clone(shared);

    device
        .build_input_stream(
            config,
            move |data: &[T], _info: &cpal::InputCallbackInfo| {
                pcm.clear();
                extend_i16_le(&mut pcm, data.iter().map(|&s| convert(s)));
                assembler.push(&pcm, |chunk| {
                    if let Err(TrySendError::Full(_)) = sender.try_send(chunk) {
                        data_shared.overflowed.store(true, Ordering::SeqCst);
                    }
                });
            },
            move |err| {
                log::error!("Audio input stream error: {}", err);
                *error_shared.last_error.lock() = Some(err.to_string());
            },
            None,
        )
        .map_err(|e| CaptureError::StreamOpenFailed(format!("failed to build input stream: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_native_16_bit() {
        let available = [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];
        assert_eq!(preferred_format(&available), Some(SampleFormat::I16));
    }

    #[test]
    fn float_when_16_bit_missing() {
        let available = [SampleFormat::U16, SampleFormat::F32];
        assert_eq!(preferred_format(&available), Some(SampleFormat::F32));
    }

    #[test]
    fn unconvertible_formats_rejected() {
        assert_eq!(preferred_format(&[SampleFormat::I32, SampleFormat::F64]), None);
        assert_eq!(preferred_format(&[]), None);
    }

    #[test]
    fn queue_holds_two_seconds() {
        assert_eq!(queue_capacity(&AudioFormat::new(1, 16_000, 512)), 63);
        assert_eq!(queue_capacity(&AudioFormat::new(1, 8_000, 16_000)), 2);
    }
}
