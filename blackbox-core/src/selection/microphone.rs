//! Best-effort input device selection.
//!
//! Devices are ranked by keyword matches on their names. This is a guess at
//! which device is a dedicated microphone, not a measure of audio quality.

use crate::models::audio_models::{DeviceDescriptor, DeviceSelection};
use crate::models::error::CaptureError;

/// Keyword groups and their weights. A group scores once if any of its
/// keywords appears in the lower-cased device name.
const KEYWORD_WEIGHTS: &[(&[&str], i32)] = &[
    (&["mic", "microphone"], 3),
    (&["array"], 2),
    (&["usb"], 1),
    // Known-good hardware.
    (&["respeaker"], 3),
];

/// Priority score for a device name.
pub fn score_device_name(name: &str) -> i32 {
    let lower = name.to_lowercase();
    KEYWORD_WEIGHTS
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, weight)| weight)
        .sum()
}

/// Input-capable devices with scores filled in, best first.
///
/// Sorted by (priority, channel count) descending. The sort is stable, so the
/// enumeration order breaks remaining ties.
pub fn rank_devices(devices: &[DeviceDescriptor]) -> Vec<DeviceDescriptor> {
    let mut candidates: Vec<DeviceDescriptor> = devices
        .iter()
        .filter(|d| d.is_input())
        .map(|d| DeviceDescriptor {
            priority: score_device_name(&d.name),
            ..d.clone()
        })
        .collect();
    candidates.sort_by(|a, b| {
        (b.priority, b.max_input_channels).cmp(&(a.priority, a.max_input_channels))
    });
    candidates
}

/// Picks the input device and format to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicrophoneSelector {
    /// Upper bound on the channel count; devices offering more are opened
    /// with this many.
    pub max_channels: u16,
    /// Rate used when falling back to the system default.
    pub sample_rate: u32,
}

impl MicrophoneSelector {
    pub fn new(max_channels: u16, sample_rate: u32) -> Self {
        Self {
            max_channels,
            sample_rate,
        }
    }

    /// Choose from `devices`, falling back to `default_device`, then to the
    /// system default (no index) with the configured channels and rate.
    pub fn select<F>(&self, devices: &[DeviceDescriptor], default_device: F) -> DeviceSelection
    where
        F: FnOnce() -> Result<DeviceDescriptor, CaptureError>,
    {
        let ranked = rank_devices(devices);
        for device in &ranked {
            log::debug!(
                "Candidate {}: {} (channels: {}, rate: {}, priority: {})",
                device.index,
                device.name,
                device.max_input_channels,
                device.default_sample_rate,
                device.priority
            );
        }

        if let Some(best) = ranked.first() {
            log::info!("Selected microphone: {} (device index: {})", best.name, best.index);
            return self.selection_for(best);
        }

        match default_device() {
            Ok(device) if device.is_input() => {
                log::info!("Using default input device: {}", device.name);
                self.selection_for(&device)
            }
            Ok(device) => {
                log::warn!("Default device {} has no input channels; using system default", device.name);
                DeviceSelection::system_default(self.max_channels, self.sample_rate)
            }
            Err(e) => {
                log::warn!("No specific microphone found ({}); using system default", e);
                DeviceSelection::system_default(self.max_channels, self.sample_rate)
            }
        }
    }

    /// Selection for an explicitly chosen device, clamped like any other.
    pub fn selection_for(&self, device: &DeviceDescriptor) -> DeviceSelection {
        DeviceSelection {
            device_index: Some(device.index),
            device_name: Some(device.name.clone()),
            channels: device.max_input_channels.min(self.max_channels).max(1),
            sample_rate: if device.default_sample_rate > 0 {
                device.default_sample_rate
            } else {
                self.sample_rate
            },
        }
    }
}
