//! Audio device enumeration via cpal.
//!
//! Device indices are positions in the host's enumeration order. They are
//! stable for the lifetime of the process as long as no device is hot-plugged.

use cpal::traits::{DeviceTrait, HostTrait};

use blackbox_core::models::audio_models::DeviceDescriptor;
use blackbox_core::models::error::CaptureError;

/// Audio device enumerator over the default cpal host (ALSA on Linux).
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Every device the host reports, input-capable or not.
    pub fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, CaptureError> {
        let devices = self
            .host
            .devices()
            .map_err(|e| CaptureError::Unknown(format!("failed to enumerate devices: {}", e)))?;
        Ok(devices.enumerate().map(|(index, device)| describe(index, &device)).collect())
    }

    /// The host's default input device, resolved to its enumeration index.
    pub fn default_input_device(&self) -> Result<DeviceDescriptor, CaptureError> {
        let device = self
            .host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotAvailable)?;
        let name = device.name().map_err(|_| CaptureError::DeviceNotAvailable)?;

        let listed = self.list_devices()?;
        listed
            .into_iter()
            .find(|d| d.name == name)
            .ok_or(CaptureError::DeviceNotAvailable)
    }

    /// Device at `index` in enumeration order.
    pub fn device_at(&self, index: usize) -> Result<cpal::Device, CaptureError> {
        let mut devices = self
            .host
            .devices()
            .map_err(|e| CaptureError::Unknown(format!("failed to enumerate devices: {}", e)))?;
        devices.nth(index).ok_or_else(|| {
            CaptureError::ConfigurationFailed(format!("no device at index {}", index))
        })
    }

    /// The system default input device itself.
    pub fn system_default_input(&self) -> Result<cpal::Device, CaptureError> {
        self.host
            .default_input_device()
            .ok_or(CaptureError::DeviceNotAvailable)
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor for one device. Query failures read as zero capability so
/// the selector skips the device instead of aborting enumeration.
fn describe(index: usize, device: &cpal::Device) -> DeviceDescriptor {
    let name = device.name().unwrap_or_else(|_| "unknown".into());
    let max_input_channels = device
        .supported_input_configs()
        .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
        .unwrap_or(0);
    let default_sample_rate = device
        .default_input_config()
        .map(|c| c.sample_rate().0)
        .unwrap_or(0);

    DeviceDescriptor::new(index, name, max_input_channels, default_sample_rate)
}
