/// Recorder state machine.
///
/// State transitions:
/// ```text
/// listening → extending → saving → listening
///     ↓                                ↓
///  stopped  ←──────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderState {
    Listening,
    Extending { buffered_secs: f64, extension_secs: f64 },
    Saving,
    Stopped,
}

impl RecorderState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Extending { .. } => "extending",
            Self::Saving => "saving",
            Self::Stopped => "stopped",
        }
    }
}
