use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingMetadata;

/// Path of the JSON sidecar for `recording_path`.
pub fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}

/// Write recording metadata as a JSON sidecar file.
///
/// Creates `{recording}.metadata.json` alongside the recording.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), CaptureError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read recording metadata from a JSON sidecar file.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, CaptureError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    let metadata: RecordingMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::AudioFormat;

    #[test]
    fn sidecar_sits_next_to_recording() {
        let path = Path::new("audios/recording_20240309_140507.wav");
        assert_eq!(
            metadata_path(path),
            PathBuf::from("audios/recording_20240309_140507.metadata.json")
        );
    }

    #[test]
    fn written_metadata_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("recording_x.wav");
        let metadata = RecordingMetadata::new(
            40.0,
            &recording.to_string_lossy(),
            "abc123",
            AudioFormat::new(1, 16_000, 512),
            938,
            313,
        );

        write_metadata(&metadata, &recording).unwrap();
        let restored = read_metadata(&recording).unwrap();
        assert_eq!(restored, metadata);
        assert_eq!(restored.format.sample_rate, 16_000);
    }

    #[test]
    fn missing_sidecar_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_metadata(&dir.path().join("nothing.wav")).unwrap_err();
        assert!(matches!(err, CaptureError::StorageError(_)));
    }
}
