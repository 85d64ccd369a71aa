//! # blackbox-linux
//!
//! Linux backend for the black-box recorder.
//!
//! Provides:
//! - `CpalBackend` — Microphone capture via cpal (ALSA)
//! - `DeviceEnumerator` — Audio device enumeration
//! - `ButtonTrigger` — Push button on a GPIO pin via rppal (`gpio` feature)
//! - `CrosstermKeys` — Raw-mode terminal keys for the keyboard trigger
//! - `InterruptTrigger` — SIGINT/SIGTERM as a quit request
//!
//! ## Platform Requirements
//! - ALSA development headers (`libasound2-dev`) for linking
//! - Read/write access to `/dev/gpiomem` for the button (Raspberry Pi)
//!
//! ## Usage
//! ```ignore
//! use blackbox_core::{open_with_fallback, CaptureBackend, MicrophoneSelector};
//! use blackbox_linux::CpalBackend;
//!
//! let backend = CpalBackend::new();
//! let devices = backend.devices().unwrap();
//! let selection = MicrophoneSelector::new(1, 16_000).select(&devices, || backend.default_input_device());
//! let (stream, _) = open_with_fallback(&backend, &selection, 512).unwrap();
//! ```

pub mod cpal_backend;
pub mod device_enumerator;
pub mod gpio_button;
#[cfg(unix)]
pub mod interrupt;
pub mod terminal;

pub use cpal_backend::{CpalBackend, CpalCaptureStream};
pub use device_enumerator::DeviceEnumerator;
pub use gpio_button::ButtonTrigger;
#[cfg(unix)]
pub use interrupt::InterruptTrigger;
pub use terminal::CrosstermKeys;
