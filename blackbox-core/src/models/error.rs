use thiserror::Error;

/// Errors raised by the capture pipeline.
///
/// Only [`CaptureError::StartupFailed`] is meant to end the process; the rest
/// are contained where they occur and surfaced as diagnostics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("device not available")]
    DeviceNotAvailable,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("stream open failed: {0}")]
    StreamOpenFailed(String),

    #[error("capture startup failed: {primary}; fallback format also failed: {fallback}")]
    StartupFailed { primary: String, fallback: String },

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

/// Errors raised by trigger sources.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// The backing hardware or subsystem is absent. Callers degrade to other
    /// sources instead of failing.
    #[error("trigger source unavailable: {0}")]
    Unavailable(String),

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("trigger setup failed: {0}")]
    Setup(String),
}
