use std::sync::Arc;

use crate::models::error::TriggerError;
use crate::trigger::state::TriggerState;

/// A source of "save now" and "quit" signals.
///
/// Implemented by:
/// - `ButtonTrigger` (GPIO falling-edge interrupt, Linux)
/// - `KeyboardTrigger` (raw-mode terminal polling)
/// - `InterruptTrigger` (SIGINT/SIGTERM, Unix)
///
/// Sources only ever write to the shared [`TriggerState`]; the capture loop
/// reads it. Adding a source never touches the loop.
pub trait TriggerSource {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Acquire the underlying resource and bind it to `state`.
    ///
    /// [`TriggerError::Unavailable`] means the hardware is absent and the
    /// caller should fall back to another source.
    fn setup(&mut self, state: Arc<TriggerState>) -> Result<(), TriggerError>;

    /// Begin delivering signals. Interrupt-driven sources do nothing here.
    fn start(&mut self) -> Result<(), TriggerError>;

    /// Release everything acquired in `setup`. Safe to call more than once.
    fn cleanup(&mut self);
}
