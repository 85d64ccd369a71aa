pub mod capture_backend;
pub mod key_input;
pub mod recorder_delegate;
pub mod trigger_source;
