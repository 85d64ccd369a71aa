use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::TriggerConfig;
use crate::models::error::TriggerError;
use crate::traits::key_input::{Key, KeyInput};
use crate::traits::trigger_source::TriggerSource;
use crate::trigger::state::TriggerState;

/// Keyboard trigger: `r` requests a save, `q` (or Ctrl-C) quits.
///
/// The terminal enters raw mode in `setup` so a failure is reported to the
/// caller. `start` moves the input onto a polling thread which restores the
/// terminal when it exits, whatever the exit path.
pub struct KeyboardTrigger<K: KeyInput + 'static> {
    input: Option<K>,
    raw_mode: bool,
    poll_interval: Duration,
    state: Option<Arc<TriggerState>>,
    running: Arc<AtomicBool>,
    poll_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl<K: KeyInput + 'static> KeyboardTrigger<K> {
    pub fn new(input: K, config: &TriggerConfig) -> Self {
        Self {
            input: Some(input),
            raw_mode: false,
            poll_interval: config.poll_interval,
            state: None,
            running: Arc::new(AtomicBool::new(false)),
            poll_handle: Mutex::new(None),
        }
    }

    /// Whether the polling thread has exited (or never started).
    pub fn is_finished(&self) -> bool {
        self.poll_handle
            .lock()
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Start polling on a thread created by `spawn`.
    ///
    /// The terminal mode moves into a guard before `spawn` runs, so a failed
    /// spawn drops the guard and restores the terminal.
    fn start_with<F>(&mut self, spawn: F) -> Result<(), TriggerError>
    where
        F: FnOnce(Box<dyn FnOnce() + Send>) -> io::Result<thread::JoinHandle<()>>,
    {
        let state = self
            .state
            .clone()
            .ok_or_else(|| TriggerError::Setup("keyboard trigger not set up".into()))?;
        let input = self
            .input
            .take()
            .ok_or_else(|| TriggerError::Setup("keyboard trigger already started".into()))?;

        let mut guard = RawModeGuard { input };
        self.raw_mode = false;
        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let poll_interval = self.poll_interval;

        let handle = spawn(Box::new(move || {
            if let Err(e) = poll_keys(&mut guard.input, &state, &running, poll_interval) {
                log::error!("Keyboard listener error: {}", e);
            }
            running.store(false, Ordering::SeqCst);
        }))
        .map_err(|e| {
            self.running.store(false, Ordering::SeqCst);
            TriggerError::Setup(format!("failed to spawn keyboard thread: {}", e))
        })?;

        *self.poll_handle.lock() = Some(handle);
        log::info!("Keyboard controls enabled: 'r' saves the last window, 'q' quits");
        Ok(())
    }
}

impl<K: KeyInput + 'static> TriggerSource for KeyboardTrigger<K> {
    fn name(&self) -> &str {
        "keyboard"
    }

    fn setup(&mut self, state: Arc<TriggerState>) -> Result<(), TriggerError> {
        let input = self
            .input
            .as_mut()
            .ok_or_else(|| TriggerError::Setup("keyboard trigger already started".into()))?;
        input.enter_raw_mode()?;
        self.raw_mode = true;
        self.state = Some(state);
        Ok(())
    }

    fn start(&mut self) -> Result<(), TriggerError> {
        self.start_with(|job| thread::Builder::new().name("keyboard-trigger".into()).spawn(job))
    }

    fn cleanup(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.poll_handle.lock().take() {
            let _ = handle.join();
        }
        if self.raw_mode {
            if let Some(input) = self.input.as_mut() {
                if let Err(e) = input.restore_mode() {
                    log::warn!("Failed to restore terminal mode: {}", e);
                }
            }
            self.raw_mode = false;
        }
    }
}

impl<K: KeyInput + 'static> Drop for KeyboardTrigger<K> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Restores the terminal mode when dropped, including during unwinding.
struct RawModeGuard<K: KeyInput> {
    input: K,
}

impl<K: KeyInput> Drop for RawModeGuard<K> {
    fn drop(&mut self) {
        if let Err(e) = self.input.restore_mode() {
            log::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}

/// Poll for keys until `q`, an external quit, or `running` going false.
///
/// Each iteration does a zero-timeout availability check followed by a sleep
/// of `poll_interval`, so an external quit is observed within one interval.
pub fn poll_keys<K: KeyInput>(
    input: &mut K,
    state: &TriggerState,
    running: &AtomicBool,
    poll_interval: Duration,
) -> Result<(), TriggerError> {
    while running.load(Ordering::SeqCst) && !state.quit_requested() {
        if let Some(key) = input.poll_key(Duration::ZERO)? {
            match key {
                Key::Char('r') => {
                    log::info!("Keyboard command: start recording");
                    state.trigger_recording();
                }
                Key::Char('q') | Key::Interrupt => {
                    log::info!("Keyboard command: quit program");
                    state.request_stop();
                    break;
                }
                Key::Char(other) => log::debug!("Ignoring key {:?}", other),
            }
        }
        thread::sleep(poll_interval);
    }
    Ok(())
}
