//! Terminal key input via crossterm.

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;

use blackbox_core::models::error::TriggerError;
use blackbox_core::traits::key_input::{Key, KeyInput};

/// [`KeyInput`] over the process's controlling terminal.
///
/// `raw_mode` is shared with the logger so log lines can switch to `\r\n`
/// endings while the terminal is raw.
pub struct CrosstermKeys {
    raw_mode: Arc<AtomicBool>,
}

impl CrosstermKeys {
    pub fn new(raw_mode: Arc<AtomicBool>) -> Self {
        Self { raw_mode }
    }
}

impl KeyInput for CrosstermKeys {
    fn enter_raw_mode(&mut self) -> Result<(), TriggerError> {
        if !io::stdin().is_terminal() {
            return Err(TriggerError::Terminal("stdin is not a terminal".into()));
        }
        terminal::enable_raw_mode()
            .map_err(|e| TriggerError::Terminal(format!("failed to enable raw mode: {}", e)))?;
        self.raw_mode.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>, TriggerError> {
        let ready = event::poll(timeout).map_err(|e| TriggerError::Terminal(format!("poll failed: {}", e)))?;
        if !ready {
            return Ok(None);
        }
        match event::read().map_err(|e| TriggerError::Terminal(format!("read failed: {}", e)))? {
            Event::Key(key) => Ok(map_key(&key)),
            _ => Ok(None),
        }
    }

    fn restore_mode(&mut self) -> Result<(), TriggerError> {
        if !self.raw_mode.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        terminal::disable_raw_mode()
            .map_err(|e| TriggerError::Terminal(format!("failed to restore terminal: {}", e)))
    }
}

/// Translate a crossterm key event. Releases and non-character keys are dropped.
pub fn map_key(key: &KeyEvent) -> Option<Key> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    match key.code {
        KeyCode::Char('c') | KeyCode::Char('C') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(Key::Interrupt)
        }
        KeyCode::Char(c) => Some(Key::Char(c)),
        _ => None,
    }
}
