use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};

use crate::models::audio_models::AudioFormat;
use crate::models::error::CaptureError;
use crate::processing::wav_format;

/// Streaming WAV writer for one triggered recording.
///
/// ## File Format
/// ```text
/// [44-byte WAV header]
/// [raw 16-bit PCM data...]
/// ```
///
/// The file is created with create-new semantics and finalized exactly once;
/// after `close` nothing more can be written.
pub struct RecordingWriter {
    file_path: PathBuf,
    file: Option<File>,
    total_bytes_written: u64,
    is_open: bool,
}

impl RecordingWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            total_bytes_written: 0,
            is_open: false,
        }
    }

    /// Create the file and write the initial 44-byte WAV header.
    pub fn open(&mut self, format: &AudioFormat) -> Result<(), CaptureError> {
        if self.is_open {
            return Ok(());
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.file_path)
            .map_err(|e| CaptureError::StorageError(format!("failed to create {}: {}", self.file_path.display(), e)))?;

        self.file = Some(file);

        let header = wav_format::generate_wav_header(
            format.sample_rate,
            format.bits_per_sample,
            format.channels,
            0, // patched on close
        );

        self.write_raw(&header)?;
        self.is_open = true;
        Ok(())
    }

    /// Append raw PCM bytes.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if !self.is_open {
            return Err(CaptureError::StorageError("file is not open for writing".into()));
        }
        if !fits_wav(self.data_bytes(), data.len()) {
            return Err(CaptureError::StorageError("recording exceeds the WAV size limit".into()));
        }
        self.write_raw(data)
    }

    /// Finalize the file: patch the WAV header sizes and compute the SHA-256
    /// checksum of the completed file.
    pub fn close(&mut self) -> Result<String, CaptureError> {
        if !self.is_open {
            return Err(CaptureError::StorageError("file is not open".into()));
        }
        self.is_open = false;

        let mut file = self
            .file
            .take()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        let data_size = self.total_bytes_written - wav_format::WAV_HEADER_SIZE as u64;
        let riff_size = self.total_bytes_written - 8;

        patch_u32(&mut file, 4, riff_size as u32).map_err(|e| CaptureError::StorageError(e.to_string()))?;
        patch_u32(&mut file, 40, data_size as u32).map_err(|e| CaptureError::StorageError(e.to_string()))?;

        file.flush().map_err(|e| CaptureError::StorageError(e.to_string()))?;
        file.sync_all()
            .map_err(|e| CaptureError::StorageError(format!("failed to sync recording: {}", e)))?;
        drop(file);

        sha256_file(&self.file_path)
    }

    /// PCM bytes written so far (excluding WAV header).
    pub fn data_bytes(&self) -> u64 {
        self.total_bytes_written.saturating_sub(wav_format::WAV_HEADER_SIZE as u64)
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::StorageError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::StorageError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}

fn fits_wav(data_bytes: u64, extra: usize) -> bool {
    data_bytes.saturating_add(extra as u64) <= wav_format::MAX_WAV_DATA_BYTES
}

fn patch_u32(file: &mut File, offset: u64, value: u32) -> io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.write_all(&value.to_le_bytes())
}

/// `recording_YYYYMMDD_HHMMSS.wav`
pub fn recording_file_name(timestamp: NaiveDateTime) -> String {
    format!("recording_{}.wav", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Ensure `directory` exists and pick a path for a recording made at
/// `timestamp` that does not collide with an existing file.
pub fn prepare_recording_path(directory: &Path, timestamp: NaiveDateTime) -> Result<PathBuf, CaptureError> {
    if !directory.is_dir() {
        fs::create_dir_all(directory)
            .map_err(|e| CaptureError::StorageError(format!("failed to create directory {}: {}", directory.display(), e)))?;
        log::info!("Created directory: {}", directory.display());
    }

    let base = recording_file_name(timestamp);
    let mut candidate = directory.join(&base);
    let stem = base.trim_end_matches(".wav");
    let mut suffix = 1;
    while candidate.exists() {
        candidate = directory.join(format!("{}_{}.wav", stem, suffix));
        suffix += 1;
    }
    Ok(candidate)
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, CaptureError> {
    let data =
        fs::read(path).map_err(|e| CaptureError::StorageError(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
