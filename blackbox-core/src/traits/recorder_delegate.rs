use crate::models::error::CaptureError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;

/// Event delegate for recorder notifications.
///
/// All methods are called from the capture thread. Keep them short; the
/// device keeps producing audio while they run.
pub trait RecorderDelegate: Send + Sync {
    /// Called when the recorder state changes.
    fn on_state_changed(&self, state: &RecorderState);

    /// Called for contained errors (overflow is not an error).
    fn on_error(&self, error: &CaptureError);

    /// Called after a recording file has been written.
    fn on_recording_saved(&self, result: &RecordingResult);
}
