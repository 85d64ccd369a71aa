use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Flags shared between trigger sources and the capture loop.
///
/// Writer discipline:
/// - `record_requested` is set to `true` by any source (button, keyboard)
///   and cleared only by the capture thread after a save. Concurrent sets are
///   idempotent, so no coordination between sources is needed.
/// - `quit_requested` is set by sources and never cleared.
#[derive(Debug, Default)]
pub struct TriggerState {
    record_requested: AtomicBool,
    quit_requested: AtomicBool,
    trigger_count: AtomicU64,
}

impl TriggerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the capture loop to save the rolling window.
    pub fn trigger_recording(&self) {
        self.trigger_count.fetch_add(1, Ordering::Relaxed);
        self.record_requested.store(true, Ordering::SeqCst);
    }

    /// Ask every loop to wind down. Irreversible.
    pub fn request_stop(&self) {
        self.quit_requested.store(true, Ordering::SeqCst);
    }

    pub fn record_requested(&self) -> bool {
        self.record_requested.load(Ordering::SeqCst)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested.load(Ordering::SeqCst)
    }

    /// Capture thread only: clear the record flag once a save finished.
    pub fn clear_record_request(&self) {
        self.record_requested.store(false, Ordering::SeqCst);
    }

    /// Total trigger signals received, including ones folded into a pending save.
    pub fn trigger_count(&self) -> u64 {
        self.trigger_count.load(Ordering::Relaxed)
    }
}
