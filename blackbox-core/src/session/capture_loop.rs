use std::sync::Arc;

use crate::models::audio_models::{AudioChunk, AudioFormat, DeviceSelection, StreamRequest};
use crate::models::config::RecorderConfig;
use crate::models::error::CaptureError;
use crate::models::state::RecorderState;
use crate::processing::ring_buffer::RingBuffer;
use crate::session::save::SaveOnTrigger;
use crate::traits::capture_backend::{CaptureBackend, CaptureStream};
use crate::traits::recorder_delegate::RecorderDelegate;
use crate::trigger::state::TriggerState;

/// Conservative format tried once if the selected one cannot be opened.
pub const FALLBACK_CHANNELS: u16 = 1;
pub const FALLBACK_SAMPLE_RATE: u32 = 16_000;

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub chunks_read: u64,
    pub overflows: u64,
    pub recordings_saved: u64,
    pub save_failures: u64,
}

/// State owned by the orchestrator and lent to the capture loop.
///
/// Trigger sources hold clones of `triggers`; only the capture thread touches
/// `buffer`.
pub struct RecorderSession {
    pub buffer: RingBuffer,
    pub triggers: Arc<TriggerState>,
}

impl RecorderSession {
    /// Size the rolling buffer for `config.buffer_seconds` in the negotiated format.
    pub fn new(format: &AudioFormat, config: &RecorderConfig, triggers: Arc<TriggerState>) -> Self {
        let capacity = RingBuffer::capacity_for(format.sample_rate, format.chunk_frames, config.buffer_seconds);
        Self {
            buffer: RingBuffer::new(capacity),
            triggers,
        }
    }
}

/// Open the selected device, retrying once with
/// [`FALLBACK_CHANNELS`]/[`FALLBACK_SAMPLE_RATE`] on the system default.
///
/// Returns the stream and whether the fallback was used. A second failure is
/// [`CaptureError::StartupFailed`]; there are no further retries.
pub fn open_with_fallback<B: CaptureBackend>(
    backend: &B,
    selection: &DeviceSelection,
    chunk_frames: u32,
) -> Result<(B::Stream, bool), CaptureError> {
    let request = selection.stream_request(chunk_frames);
    log::info!(
        "Using device index: {:?}, channels: {}, sample rate: {}",
        request.device_index,
        request.channels,
        request.sample_rate
    );

    let primary = match backend.open(&request) {
        Ok(stream) => {
            log::info!("Recording started successfully");
            return Ok((stream, false));
        }
        Err(e) => e,
    };

    log::warn!("Stream error: {}; trying fallback default settings", primary);
    let fallback = StreamRequest {
        device_index: None,
        channels: FALLBACK_CHANNELS,
        sample_rate: FALLBACK_SAMPLE_RATE,
        chunk_frames,
    };
    match backend.open(&fallback) {
        Ok(stream) => {
            log::info!("Recording started with fallback settings");
            Ok((stream, true))
        }
        Err(e) => {
            log::error!("Fallback also failed: {}", e);
            Err(CaptureError::StartupFailed {
                primary: primary.to_string(),
                fallback: e.to_string(),
            })
        }
    }
}

/// Read one chunk, logging and counting device overflows.
pub(crate) fn read_logged<S: CaptureStream>(stream: &mut S, stats: &mut CaptureStats) -> Result<AudioChunk, CaptureError> {
    let read = stream.read_chunk()?;
    stats.chunks_read += 1;
    if read.overflowed {
        stats.overflows += 1;
        log::warn!("Input overflow; audio was dropped (total overflows: {})", stats.overflows);
    }
    Ok(read.chunk)
}

/// The single thread that touches the capture stream and the rolling buffer.
///
/// Each iteration reads one chunk, pushes it into the buffer and, if a save
/// was requested, runs the save synchronously before clearing the request.
/// The stream is closed when `run` returns, whatever the exit path, and again
/// on drop if `run` never ran.
pub struct CaptureLoop<S: CaptureStream> {
    stream: S,
    saver: SaveOnTrigger,
    delegate: Option<Arc<dyn RecorderDelegate>>,
    stats: CaptureStats,
    closed: bool,
}

impl<S: CaptureStream> CaptureLoop<S> {
    pub fn new(stream: S, config: &RecorderConfig) -> Self {
        Self {
            stream,
            saver: SaveOnTrigger::new(config),
            delegate: None,
            stats: CaptureStats::default(),
            closed: false,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecorderDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn format(&self) -> AudioFormat {
        self.stream.format()
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    /// Capture until quit is requested or a read fails.
    ///
    /// Save failures are reported through the delegate and do not stop the
    /// loop. A read failure (including during a save extension) ends it and
    /// is returned.
    pub fn run(&mut self, session: &mut RecorderSession) -> Result<CaptureStats, CaptureError> {
        self.set_state(RecorderState::Listening);
        log::info!(
            "Device is listening, keeping the last {:.0}s (press button or 'r' to save, 'q' to quit)",
            session.buffer.capacity() as f64 * self.stream.format().chunk_duration_secs()
        );

        let outcome = self.capture(session);
        if let Err(ref e) = outcome {
            log::error!("Recording loop error: {}", e);
            self.report_error(e);
        }

        self.close();
        self.set_state(RecorderState::Stopped);
        outcome.map(|_| self.stats.clone())
    }

    fn capture(&mut self, session: &mut RecorderSession) -> Result<(), CaptureError> {
        while !session.triggers.quit_requested() {
            let chunk = read_logged(&mut self.stream, &mut self.stats)?;
            session.buffer.push(chunk);

            if session.triggers.record_requested() {
                let saved = self.saver.save(
                    &mut session.buffer,
                    &mut self.stream,
                    &mut self.stats,
                    self.delegate.as_deref(),
                );
                session.triggers.clear_record_request();

                match saved {
                    Ok(result) => {
                        self.stats.recordings_saved += 1;
                        if let Some(ref d) = self.delegate {
                            d.on_recording_saved(&result);
                        }
                    }
                    Err(e @ CaptureError::ReadFailed(_)) => return Err(e),
                    Err(e) => {
                        self.stats.save_failures += 1;
                        log::error!("Failed to save recording: {}", e);
                        self.report_error(&e);
                    }
                }
                self.set_state(RecorderState::Listening);
            }
        }
        Ok(())
    }

    /// Stop and close the stream. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.stream.close() {
            log::warn!("Failed to close capture stream: {}", e);
        }
    }

    fn set_state(&self, state: RecorderState) {
        if let Some(ref d) = self.delegate {
            d.on_state_changed(&state);
        }
    }

    fn report_error(&self, error: &CaptureError) {
        if let Some(ref d) = self.delegate {
            d.on_error(error);
        }
    }
}

impl<S: CaptureStream> Drop for CaptureLoop<S> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::audio_models::DeviceDescriptor;
    use crate::models::recording_result::RecordingResult;
    use crate::processing::wav_format;
    use crate::test_support::{chunk_tag, ScriptedBackend, StreamScript};
    use parking_lot::Mutex;
    use std::fs;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingDelegate {
        states: Mutex<Vec<&'static str>>,
        errors: Mutex<Vec<CaptureError>>,
        saved: Mutex<Vec<RecordingResult>>,
    }

    impl RecorderDelegate for RecordingDelegate {
        fn on_state_changed(&self, state: &RecorderState) {
            self.states.lock().push(state.name());
        }

        fn on_error(&self, error: &CaptureError) {
            self.errors.lock().push(error.clone());
        }

        fn on_recording_saved(&self, result: &RecordingResult) {
            self.saved.lock().push(result.clone());
        }
    }

    fn config(dir: &Path) -> RecorderConfig {
        RecorderConfig {
            buffer_seconds: 1,
            extension_seconds: 1,
            chunk_frames: 100,
            sample_rate: 1_000,
            channels: 1,
            output_directory: dir.to_path_buf(),
            write_metadata: false,
        }
    }

    /// Script that records at `record_at` and quits at `quit_at`.
    fn script(triggers: &Arc<TriggerState>, record_at: Option<u64>, quit_at: u64) -> StreamScript {
        let triggers = Arc::clone(triggers);
        StreamScript {
            on_read: Some(Arc::new(move |index| {
                if Some(index) == record_at {
                    triggers.trigger_recording();
                }
                if index == quit_at {
                    triggers.request_stop();
                }
            })),
            ..Default::default()
        }
    }

    fn start(backend: &ScriptedBackend, config: &RecorderConfig, triggers: &Arc<TriggerState>) -> (CaptureLoop<crate::test_support::ScriptedStream>, RecorderSession) {
        let selection = DeviceSelection::system_default(config.channels, config.sample_rate);
        let (stream, _) = open_with_fallback(backend, &selection, config.chunk_frames).unwrap();
        let session = RecorderSession::new(&stream.format(), config, Arc::clone(triggers));
        (CaptureLoop::new(stream, config), session)
    }

    #[test]
    fn quit_stops_loop_and_closes_stream() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let triggers = Arc::new(TriggerState::new());
        let backend = ScriptedBackend::new(script(&triggers, None, 25));

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        let stats = capture.run(&mut session).unwrap();

        assert_eq!(stats.chunks_read, 26);
        assert_eq!(backend.closed_count(), 1);
        // 1s at 1000 Hz / 100 frames = 10 chunks of history.
        assert_eq!(session.buffer.len(), 10);
        let tags: Vec<u64> = session.buffer.drain_all().iter().map(chunk_tag).collect();
        assert_eq!(tags, (16..26).collect::<Vec<_>>());

        drop(capture);
        assert_eq!(backend.closed_count(), 1);
    }

    #[test]
    fn trigger_saves_window_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let triggers = Arc::new(TriggerState::new());
        let backend = ScriptedBackend::new(script(&triggers, Some(14), 40));
        let delegate = Arc::new(RecordingDelegate::default());

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        capture.set_delegate(delegate.clone());
        let stats = capture.run(&mut session).unwrap();

        assert_eq!(stats.recordings_saved, 1);
        assert!(!triggers.record_requested());

        let saved = delegate.saved.lock();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].metadata.buffered_chunks, 10);
        assert_eq!(saved[0].metadata.extension_chunks, 10);

        let data = fs::read(&saved[0].file_path).unwrap();
        let info = wav_format::parse_wav_header(&data).unwrap();
        assert_eq!(info.data_size as usize, 20 * 200);

        // Window is reads 5..=14, extension is 15..=24, in order.
        let pcm = &data[wav_format::WAV_HEADER_SIZE..];
        let tags: Vec<u64> = pcm
            .chunks(200)
            .map(|c| u64::from_le_bytes(c[..8].try_into().unwrap()))
            .collect();
        assert_eq!(tags, (5..25).collect::<Vec<_>>());

        let states = delegate.states.lock().clone();
        assert_eq!(states, vec!["listening", "extending", "saving", "listening", "stopped"]);

        // Rolling capture resumed from empty after the save.
        let resumed: Vec<u64> = session.buffer.drain_all().iter().map(chunk_tag).collect();
        assert_eq!(resumed, (31..41).collect::<Vec<_>>());
    }

    #[test]
    fn save_failure_is_contained() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("audios");
        fs::write(&blocker, b"file in the way").unwrap();
        let config = RecorderConfig {
            output_directory: blocker,
            ..config(dir.path())
        };
        let triggers = Arc::new(TriggerState::new());
        let backend = ScriptedBackend::new(script(&triggers, Some(12), 30));
        let delegate = Arc::new(RecordingDelegate::default());

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        capture.set_delegate(delegate.clone());
        let stats = capture.run(&mut session).unwrap();

        assert_eq!(stats.save_failures, 1);
        assert_eq!(stats.recordings_saved, 0);
        assert!(!triggers.record_requested());
        assert!(matches!(delegate.errors.lock()[0], CaptureError::StorageError(_)));
        // Capture kept going after the failed save: reads 0..=30.
        assert_eq!(stats.chunks_read, 31);
    }

    #[test]
    fn save_failure_leaves_buffer_empty() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("audios");
        fs::write(&blocker, b"file in the way").unwrap();
        let config = RecorderConfig {
            output_directory: blocker,
            ..config(dir.path())
        };
        let triggers = Arc::new(TriggerState::new());
        // Quit on the read that follows the save.
        let backend = ScriptedBackend::new(script(&triggers, Some(12), 23));

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        capture.run(&mut session).unwrap();

        // Only the chunk read after the failed save remains.
        let remaining: Vec<u64> = session.buffer.drain_all().iter().map(chunk_tag).collect();
        assert_eq!(remaining, vec![23]);
    }

    #[test]
    fn read_error_ends_loop_after_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let triggers = Arc::new(TriggerState::new());
        let backend = ScriptedBackend::new(StreamScript {
            fail_after: Some(7),
            ..Default::default()
        });
        let delegate = Arc::new(RecordingDelegate::default());

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        capture.set_delegate(delegate.clone());
        let err = capture.run(&mut session).unwrap_err();

        assert!(matches!(err, CaptureError::ReadFailed(_)));
        assert_eq!(backend.closed_count(), 1);
        assert_eq!(delegate.states.lock().last(), Some(&"stopped"));
        assert_eq!(capture.stats().chunks_read, 7);
    }

    #[test]
    fn read_error_during_extension_ends_loop() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let triggers = Arc::new(TriggerState::new());
        let mut script = script(&triggers, Some(3), 1_000);
        script.fail_after = Some(8);
        let backend = ScriptedBackend::new(script);

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        let err = capture.run(&mut session).unwrap_err();

        assert!(matches!(err, CaptureError::ReadFailed(_)));
        assert!(!triggers.record_requested());
        assert!(session.buffer.is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn overflow_is_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let triggers = Arc::new(TriggerState::new());
        let mut script = script(&triggers, None, 19);
        script.overflow_every = Some(5);
        let backend = ScriptedBackend::new(script);

        let (mut capture, mut session) = start(&backend, &config, &triggers);
        let stats = capture.run(&mut session).unwrap();

        assert_eq!(stats.chunks_read, 20);
        assert_eq!(stats.overflows, 4);
    }

    #[test]
    fn fallback_used_after_primary_failure() {
        let mut backend = ScriptedBackend::new(StreamScript::default());
        backend.failing_opens = 1;
        let selection = DeviceSelection {
            device_index: Some(3),
            device_name: Some("USB Mic".into()),
            channels: 2,
            sample_rate: 48_000,
        };

        let (stream, used_fallback) = open_with_fallback(&backend, &selection, 512).unwrap();
        assert!(used_fallback);
        assert_eq!(stream.format(), AudioFormat::new(1, 16_000, 512));

        let requests = backend.open_requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].device_index, Some(3));
        assert_eq!(requests[1].device_index, None);
    }

    #[test]
    fn startup_fails_after_single_retry() {
        let mut backend = ScriptedBackend::new(StreamScript::default());
        backend.failing_opens = 5;
        backend.devices = vec![DeviceDescriptor::new(0, "USB Mic", 1, 44_100)];
        let selection = DeviceSelection::system_default(1, 16_000);

        let err = open_with_fallback(&backend, &selection, 512).err().unwrap();
        assert!(matches!(err, CaptureError::StartupFailed { .. }));
        assert_eq!(backend.open_requests.lock().len(), 2);
    }

    #[test]
    fn buffer_sized_from_negotiated_rate() {
        let triggers = Arc::new(TriggerState::new());
        let session = RecorderSession::new(&AudioFormat::new(1, 16_000, 512), &RecorderConfig::default(), triggers);
        assert_eq!(session.buffer.capacity(), 938);
    }
}
