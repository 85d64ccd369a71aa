//! In-memory capture backend and key input used by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioChunk, AudioFormat, ChunkRead, DeviceDescriptor, StreamRequest};
use crate::models::error::{CaptureError, TriggerError};
use crate::traits::capture_backend::{CaptureBackend, CaptureStream};
use crate::traits::key_input::{Key, KeyInput};

/// Called with the zero-based read index before each read.
pub type ReadHook = Arc<dyn Fn(u64) + Send + Sync>;

/// Behaviour of every stream a [`ScriptedBackend`] opens.
#[derive(Clone, Default)]
pub struct StreamScript {
    /// Reads at or beyond this index fail.
    pub fail_after: Option<u64>,
    /// Every n-th read reports an overflow.
    pub overflow_every: Option<u64>,
    pub on_read: Option<ReadHook>,
}

pub struct ScriptedBackend {
    pub devices: Vec<DeviceDescriptor>,
    pub default_device: Option<DeviceDescriptor>,
    /// How many open attempts fail before one succeeds.
    pub failing_opens: usize,
    pub script: StreamScript,
    pub open_requests: Mutex<Vec<StreamRequest>>,
    pub closed_streams: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn new(script: StreamScript) -> Self {
        Self {
            devices: Vec::new(),
            default_device: None,
            failing_opens: 0,
            script,
            open_requests: Mutex::new(Vec::new()),
            closed_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn closed_count(&self) -> usize {
        self.closed_streams.load(Ordering::SeqCst)
    }
}

impl CaptureBackend for ScriptedBackend {
    type Stream = ScriptedStream;

    fn devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        Ok(self.devices.clone())
    }

    fn default_input_device(&self) -> Result<DeviceDescriptor, CaptureError> {
        self.default_device.clone().ok_or(CaptureError::DeviceNotAvailable)
    }

    fn open(&self, request: &StreamRequest) -> Result<ScriptedStream, CaptureError> {
        let attempt = {
            let mut requests = self.open_requests.lock();
            requests.push(request.clone());
            requests.len()
        };
        if attempt <= self.failing_opens {
            return Err(CaptureError::StreamOpenFailed(format!("scripted failure {}", attempt)));
        }
        Ok(ScriptedStream {
            format: AudioFormat::new(request.channels, request.sample_rate, request.chunk_frames),
            script: self.script.clone(),
            reads: 0,
            closed: false,
            closed_streams: Arc::clone(&self.closed_streams),
        })
    }
}

/// Produces chunks tagged with their read index (first 8 bytes, LE).
pub struct ScriptedStream {
    format: AudioFormat,
    script: StreamScript,
    reads: u64,
    closed: bool,
    closed_streams: Arc<AtomicUsize>,
}

impl CaptureStream for ScriptedStream {
    fn format(&self) -> AudioFormat {
        self.format
    }

    fn read_chunk(&mut self) -> Result<ChunkRead, CaptureError> {
        if self.closed {
            return Err(CaptureError::ReadFailed("stream closed".into()));
        }
        let index = self.reads;
        if let Some(hook) = &self.script.on_read {
            hook(index);
        }
        if self.script.fail_after.is_some_and(|limit| index >= limit) {
            return Err(CaptureError::ReadFailed(format!("scripted failure at read {}", index)));
        }
        self.reads += 1;

        let mut bytes = vec![0u8; self.format.chunk_bytes()];
        let tag = index.to_le_bytes();
        let n = tag.len().min(bytes.len());
        bytes[..n].copy_from_slice(&tag[..n]);

        Ok(ChunkRead {
            chunk: AudioChunk::new(bytes),
            overflowed: self.script.overflow_every.is_some_and(|n| n > 0 && (index + 1) % n == 0),
        })
    }

    fn close(&mut self) -> Result<(), CaptureError> {
        if !self.closed {
            self.closed = true;
            self.closed_streams.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Read index stored in a chunk produced by [`ScriptedStream`].
pub fn chunk_tag(chunk: &AudioChunk) -> u64 {
    let mut tag = [0u8; 8];
    let bytes = chunk.as_bytes();
    let n = bytes.len().min(8);
    tag[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    EnterRaw,
    Restore,
}

/// Key input replaying a fixed sequence of poll results, then idling.
pub struct ScriptedKeys {
    keys: VecDeque<Option<Key>>,
    log: Arc<Mutex<Vec<KeyEvent>>>,
    fail_after: Option<usize>,
    polls: usize,
    raw_mode_supported: bool,
}

impl ScriptedKeys {
    pub fn new(keys: Vec<Option<Key>>) -> Self {
        Self {
            keys: keys.into(),
            log: Arc::new(Mutex::new(Vec::new())),
            fail_after: None,
            polls: 0,
            raw_mode_supported: true,
        }
    }

    pub fn idle() -> Self {
        Self::new(Vec::new())
    }

    pub fn failing_after(polls: usize) -> Self {
        Self {
            fail_after: Some(polls),
            ..Self::idle()
        }
    }

    pub fn not_a_terminal() -> Self {
        Self {
            raw_mode_supported: false,
            ..Self::idle()
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<KeyEvent>>> {
        Arc::clone(&self.log)
    }
}

impl KeyInput for ScriptedKeys {
    fn enter_raw_mode(&mut self) -> Result<(), TriggerError> {
        if !self.raw_mode_supported {
            return Err(TriggerError::Terminal("stdin is not a terminal".into()));
        }
        self.log.lock().push(KeyEvent::EnterRaw);
        Ok(())
    }

    fn poll_key(&mut self, _timeout: Duration) -> Result<Option<Key>, TriggerError> {
        self.polls += 1;
        if self.fail_after.is_some_and(|limit| self.polls > limit) {
            return Err(TriggerError::Terminal("scripted poll failure".into()));
        }
        Ok(self.keys.pop_front().flatten())
    }

    fn restore_mode(&mut self) -> Result<(), TriggerError> {
        self.log.lock().push(KeyEvent::Restore);
        Ok(())
    }
}
