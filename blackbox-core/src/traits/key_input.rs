use std::time::Duration;

use crate::models::error::TriggerError;

/// A key press as seen by the keyboard trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    /// Ctrl-C while the terminal is in raw mode.
    Interrupt,
}

/// Terminal boundary used by the keyboard trigger.
pub trait KeyInput: Send {
    /// Switch the terminal to raw, unbuffered, non-echoing mode.
    fn enter_raw_mode(&mut self) -> Result<(), TriggerError>;

    /// Return a pending key if one arrives within `timeout`. A zero timeout
    /// only checks availability.
    fn poll_key(&mut self, timeout: Duration) -> Result<Option<Key>, TriggerError>;

    /// Put the terminal back into the mode it had before `enter_raw_mode`.
    fn restore_mode(&mut self) -> Result<(), TriggerError>;
}
