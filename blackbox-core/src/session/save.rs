use std::fs;
use std::path::{Path, PathBuf};

use crate::models::audio_models::{AudioChunk, AudioFormat};
use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::RecorderState;
use crate::processing::ring_buffer::RingBuffer;
use crate::session::capture_loop::{read_logged, CaptureStats};
use crate::storage::metadata;
use crate::storage::recording_writer::{prepare_recording_path, RecordingWriter};
use crate::traits::capture_backend::CaptureStream;
use crate::traits::recorder_delegate::RecorderDelegate;

/// Persists the rolling window plus a live extension to a WAV file.
///
/// Runs on the capture thread only. While the extension is being read the
/// rolling buffer is not fed: the stream is dedicated to the save, and the
/// buffer starts refilling from empty afterwards.
#[derive(Debug, Clone)]
pub struct SaveOnTrigger {
    output_directory: PathBuf,
    extension_seconds: u32,
    write_metadata: bool,
}

impl SaveOnTrigger {
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            output_directory: config.output_directory.clone(),
            extension_seconds: config.extension_seconds,
            write_metadata: config.write_metadata,
        }
    }

    /// Drain `buffer`, read the extension from `stream`, and write the file.
    ///
    /// Errors:
    /// - [`CaptureError::ReadFailed`] from the extension reads; the stream is
    ///   unusable and the caller should stop.
    /// - [`CaptureError::StorageError`] if the file cannot be written; the
    ///   captured audio is discarded.
    ///
    /// In both cases the buffer is left empty.
    pub fn save<S: CaptureStream>(
        &self,
        buffer: &mut RingBuffer,
        stream: &mut S,
        stats: &mut CaptureStats,
        delegate: Option<&dyn RecorderDelegate>,
    ) -> Result<RecordingResult, CaptureError> {
        let format = stream.format();
        let mut frames = buffer.drain_all();
        let buffered_chunks = frames.len();
        let extension_chunks = format.chunks_for(self.extension_seconds);

        let buffered_secs = buffered_chunks as f64 * format.chunk_duration_secs();
        log::info!(
            "Saving {:.1}s of buffered audio; recording additional {} seconds...",
            buffered_secs,
            self.extension_seconds
        );
        notify(
            delegate,
            RecorderState::Extending {
                buffered_secs,
                extension_secs: self.extension_seconds as f64,
            },
        );

        frames.reserve(extension_chunks);
        for _ in 0..extension_chunks {
            frames.push(read_logged(stream, stats)?);
        }

        notify(delegate, RecorderState::Saving);
        let timestamp = chrono::Local::now().naive_local();
        let file_path = prepare_recording_path(&self.output_directory, timestamp)?;
        let (checksum, data_bytes) = write_frames(&file_path, &format, &frames)?;

        let duration_secs = format.duration_of(data_bytes as usize);
        let metadata = RecordingMetadata::new(
            duration_secs,
            &file_path.to_string_lossy(),
            &checksum,
            format,
            buffered_chunks,
            extension_chunks,
        );

        if self.write_metadata {
            if let Err(e) = metadata::write_metadata(&metadata, &file_path) {
                log::warn!("Recording saved but sidecar failed: {}", e);
            }
        }

        log::info!("Recording saved as {} ({:.1}s)", file_path.display(), duration_secs);
        Ok(RecordingResult {
            file_path,
            duration_secs,
            metadata,
            checksum,
        })
    }
}

/// Write `frames` as one WAV file. A partially written file is removed.
fn write_frames(path: &Path, format: &AudioFormat, frames: &[AudioChunk]) -> Result<(String, u64), CaptureError> {
    let mut writer = RecordingWriter::new(path.to_path_buf());
    writer.open(format)?;

    let written = frames
        .iter()
        .try_for_each(|chunk| writer.write(chunk.as_bytes()))
        .and_then(|_| writer.close());

    match written {
        Ok(checksum) => Ok((checksum, writer.data_bytes())),
        Err(e) => {
            let _ = fs::remove_file(path);
            Err(e)
        }
    }
}

fn notify(delegate: Option<&dyn RecorderDelegate>, state: RecorderState) {
    if let Some(d) = delegate {
        d.on_state_changed(&state);
    }
}
