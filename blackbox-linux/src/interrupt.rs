//! SIGINT/SIGTERM as a quit trigger.
//!
//! The signal handler only flips a static flag; a watcher thread turns the
//! flag into a quit request so the capture loop shuts down normally and every
//! trigger source gets cleaned up. After the first signal the default
//! dispositions are back in place, so a second Ctrl-C terminates a shutdown
//! that hangs. Ctrl-C in a raw-mode terminal arrives as a key instead and is
//! handled by the keyboard trigger.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use blackbox_core::models::config::TriggerConfig;
use blackbox_core::models::error::TriggerError;
use blackbox_core::traits::trigger_source::TriggerSource;
use blackbox_core::trigger::state::TriggerState;

const HANDLED_SIGNALS: [libc::c_int; 2] = [libc::SIGINT, libc::SIGTERM];

/// Set by the signal handler, consumed by the watcher thread.
static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_: libc::c_int) {
    SIGNAL_RECEIVED.store(true, Ordering::SeqCst);
}

pub struct InterruptTrigger {
    poll_interval: Duration,
    installed: bool,
    state: Option<Arc<TriggerState>>,
    running: Arc<AtomicBool>,
    watch_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl InterruptTrigger {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            poll_interval: config.poll_interval,
            installed: false,
            state: None,
            running: Arc::new(AtomicBool::new(false)),
            watch_handle: Mutex::new(None),
        }
    }
}

impl TriggerSource for InterruptTrigger {
    fn name(&self) -> &str {
        "signal"
    }

    fn setup(&mut self, state: Arc<TriggerState>) -> Result<(), TriggerError> {
        SIGNAL_RECEIVED.store(false, Ordering::SeqCst);
        for signal in HANDLED_SIGNALS {
            // SAFETY: handle_signal only stores to an atomic, which is
            // async-signal-safe.
            let handler = handle_signal as *const () as libc::sighandler_t;
            if unsafe { libc::signal(signal, handler) } == libc::SIG_ERR {
                restore_default_handlers();
                return Err(TriggerError::Setup(format!("failed to install handler for signal {}", signal)));
            }
        }
        self.installed = true;
        self.state = Some(state);
        Ok(())
    }

    fn start(&mut self) -> Result<(), TriggerError> {
        let state = self
            .state
            .clone()
            .ok_or_else(|| TriggerError::Setup("signal trigger not set up".into()))?;

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let poll_interval = self.poll_interval;

        let handle = thread::Builder::new()
            .name("signal-watcher".into())
            .spawn(move || {
                // Runs until cleanup, even after a quit from another source.
                while running.load(Ordering::SeqCst) {
                    if SIGNAL_RECEIVED.swap(false, Ordering::SeqCst) {
                        log::info!("Interrupt received; stopping (press Ctrl-C again to force exit)");
                        restore_default_handlers();
                        state.request_stop();
                    }
                    thread::sleep(poll_interval);
                }
            })
            .map_err(|e| TriggerError::Setup(format!("failed to spawn signal watcher: {}", e)))?;

        *self.watch_handle.lock() = Some(handle);
        Ok(())
    }

    fn cleanup(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.watch_handle.lock().take() {
            let _ = handle.join();
        }
        if self.installed {
            restore_default_handlers();
            self.installed = false;
        }
    }
}

impl Drop for InterruptTrigger {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn restore_default_handlers() {
    for signal in HANDLED_SIGNALS {
        // SAFETY: resetting to the default disposition has no preconditions.
        unsafe {
            libc::signal(signal, libc::SIG_DFL);
        }
    }
}
