use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use blackbox_core::models::config::{RecorderConfig, TriggerConfig};

/// Keeps the last moments of audio in memory and saves them on demand.
///
/// Press the button (or 'r' in keyboard mode) to write the buffered window
/// plus a short live extension to a WAV file. 'q' or Ctrl-C quits.
#[derive(Debug, Parser)]
#[command(name = "blackbox", version)]
pub struct Cli {
    /// Seconds of audio kept in the rolling buffer.
    #[arg(long, env = "BLACKBOX_BUFFER_SECONDS", default_value_t = 30)]
    pub buffer_seconds: u32,

    /// Seconds of live audio recorded after a trigger.
    #[arg(long, env = "BLACKBOX_EXTENSION_SECONDS", default_value_t = 10)]
    pub extension_seconds: u32,

    /// Frames per device read.
    #[arg(long, env = "BLACKBOX_CHUNK_FRAMES", default_value_t = 512)]
    pub chunk_frames: u32,

    /// Sample rate used when the device does not report one.
    #[arg(long, env = "BLACKBOX_SAMPLE_RATE", default_value_t = 16_000)]
    pub sample_rate: u32,

    /// Maximum number of channels to record.
    #[arg(long, env = "BLACKBOX_CHANNELS", default_value_t = 1)]
    pub channels: u16,

    /// Directory recordings are written to.
    #[arg(long, env = "BLACKBOX_OUTPUT_DIR", default_value = "audios")]
    pub output_dir: PathBuf,

    /// BCM pin number of the push button.
    #[arg(long, env = "BLACKBOX_BUTTON_PIN", default_value_t = 2)]
    pub button_pin: u8,

    /// Button debounce window in milliseconds.
    #[arg(long, env = "BLACKBOX_DEBOUNCE_MS", default_value_t = 300)]
    pub debounce_ms: u64,

    /// Do not try the GPIO button.
    #[arg(long)]
    pub no_button: bool,

    /// Enable keyboard controls even when the button works.
    #[arg(long)]
    pub keyboard: bool,

    /// Record from this device index instead of picking one.
    #[arg(long, env = "BLACKBOX_DEVICE")]
    pub device: Option<usize>,

    /// Print the audio devices with their scores and exit.
    #[arg(long)]
    pub list_devices: bool,

    /// Write a JSON metadata sidecar next to every recording.
    #[arg(long)]
    pub metadata: bool,
}

impl Cli {
    pub fn recorder_config(&self) -> RecorderConfig {
        RecorderConfig {
            buffer_seconds: self.buffer_seconds,
            extension_seconds: self.extension_seconds,
            chunk_frames: self.chunk_frames,
            sample_rate: self.sample_rate,
            channels: self.channels,
            output_directory: self.output_dir.clone(),
            write_metadata: self.metadata,
        }
    }

    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            button_pin: self.button_pin,
            debounce: Duration::from_millis(self.debounce_ms),
            ..TriggerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["blackbox"]).unwrap();
        assert_eq!(cli.recorder_config(), RecorderConfig::default());
        assert_eq!(cli.trigger_config(), TriggerConfig::default());
        assert!(!cli.no_button);
        assert!(cli.device.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "blackbox",
            "--buffer-seconds",
            "60",
            "--extension-seconds",
            "5",
            "--channels",
            "2",
            "--output-dir",
            "/tmp/rec",
            "--button-pin",
            "17",
            "--debounce-ms",
            "50",
            "--device",
            "3",
            "--metadata",
            "--keyboard",
        ])
        .unwrap();

        let config = cli.recorder_config();
        assert_eq!(config.buffer_seconds, 60);
        assert_eq!(config.extension_seconds, 5);
        assert_eq!(config.channels, 2);
        assert_eq!(config.output_directory, PathBuf::from("/tmp/rec"));
        assert!(config.write_metadata);

        let triggers = cli.trigger_config();
        assert_eq!(triggers.button_pin, 17);
        assert_eq!(triggers.debounce, Duration::from_millis(50));
        assert_eq!(cli.device, Some(3));
        assert!(cli.keyboard);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let cli = Cli::try_parse_from(["blackbox", "--chunk-frames", "0"]).unwrap();
        assert!(cli.recorder_config().validate().is_err());
    }
}
