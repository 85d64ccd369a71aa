//! `blackbox`: rolling audio recorder for a Raspberry Pi style setup.

mod cli;

use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use blackbox_core::models::config::RecorderConfig;
use blackbox_core::models::error::{CaptureError, TriggerError};
use blackbox_core::selection::microphone::{score_device_name, MicrophoneSelector};
use blackbox_core::{
    open_with_fallback, CaptureBackend, CaptureLoop, CaptureStats, CaptureStream, KeyboardTrigger, RecorderDelegate,
    RecorderSession, RecorderState, RecordingResult, TriggerSource, TriggerState,
};
use blackbox_linux::{ButtonTrigger, CpalBackend, CrosstermKeys};

use crate::cli::Cli;

#[derive(Debug, Error)]
enum AppError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let raw_mode = Arc::new(AtomicBool::new(false));
    init_logger(Arc::clone(&raw_mode));

    if cli.list_devices {
        return match list_devices(&CpalBackend::new()) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let code = match run(&cli, raw_mode) {
        Ok(stats) => {
            log::info!(
                "Session summary: {} chunks read, {} overflows, {} recordings saved, {} failed",
                stats.chunks_read,
                stats.overflows,
                stats.recordings_saved,
                stats.save_failures
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    };
    println!("Program terminated.");
    code
}

/// `RUST_LOG` overrides the default `info` level. Lines end in `\r\n` while
/// the terminal is raw.
fn init_logger(raw_mode: Arc<AtomicBool>) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(move |buf, record| {
            let ending = if raw_mode.load(Ordering::Relaxed) { "\r\n" } else { "\n" };
            write!(
                buf,
                "[{} {:<5} {}] {}{}",
                buf.timestamp_seconds(),
                record.level(),
                record.target(),
                record.args(),
                ending
            )
        })
        .init();
}

fn run(cli: &Cli, raw_mode: Arc<AtomicBool>) -> Result<CaptureStats, AppError> {
    let config = cli.recorder_config();
    config.validate().map_err(AppError::Config)?;
    let trigger_config = cli.trigger_config();

    let triggers = Arc::new(TriggerState::new());
    let mut sources = TriggerSet::default();
    #[cfg(unix)]
    {
        let interrupt = blackbox_linux::InterruptTrigger::new(&trigger_config);
        if let Err(e) = sources.try_add(Box::new(interrupt), &triggers) {
            log::warn!("Interrupt handling unavailable: {}", e);
        }
    }
    install_controls(
        &mut sources,
        &triggers,
        !cli.no_button,
        cli.keyboard,
        || Box::new(ButtonTrigger::new(&trigger_config)),
        || Box::new(KeyboardTrigger::new(CrosstermKeys::new(raw_mode), &trigger_config)),
    );
    sources.start_all();

    let backend = CpalBackend::new();
    record(&backend, cli.device, &config, triggers)
    // `sources` drops here, releasing the pin and the terminal.
}

/// Trigger sources in setup order, cleaned up in reverse on drop.
#[derive(Default)]
struct TriggerSet {
    sources: Vec<Box<dyn TriggerSource>>,
}

impl TriggerSet {
    /// Set up `source`; on success it is kept and cleaned up later.
    fn try_add(&mut self, mut source: Box<dyn TriggerSource>, state: &Arc<TriggerState>) -> Result<(), TriggerError> {
        source.setup(Arc::clone(state))?;
        self.sources.push(source);
        Ok(())
    }

    fn start_all(&mut self) {
        for source in &mut self.sources {
            if let Err(e) = source.start() {
                log::warn!("Failed to start {} trigger: {}", source.name(), e);
            }
        }
    }
}

impl Drop for TriggerSet {
    fn drop(&mut self) {
        for source in self.sources.iter_mut().rev() {
            source.cleanup();
        }
    }
}

/// Add the save controls: the button when `use_button`, and the keyboard when
/// `force_keyboard` is set or the button could not be set up.
fn install_controls<B, K>(
    set: &mut TriggerSet,
    state: &Arc<TriggerState>,
    use_button: bool,
    force_keyboard: bool,
    button: B,
    keyboard: K,
) where
    B: FnOnce() -> Box<dyn TriggerSource>,
    K: FnOnce() -> Box<dyn TriggerSource>,
{
    let mut button_ready = false;
    if use_button {
        match set.try_add(button(), state) {
            Ok(()) => button_ready = true,
            Err(e) => log::warn!("Button unavailable ({}); falling back to keyboard control", e),
        }
    }

    if force_keyboard || !button_ready {
        if let Err(e) = set.try_add(keyboard(), state) {
            log::warn!("Keyboard control unavailable: {}", e);
            if !button_ready {
                log::warn!("No save trigger available; the recorder can only be stopped");
            }
        }
    }
}

fn record(
    backend: &CpalBackend,
    device: Option<usize>,
    config: &RecorderConfig,
    triggers: Arc<TriggerState>,
) -> Result<CaptureStats, AppError> {
    let selector = MicrophoneSelector::new(config.channels, config.sample_rate);
    let selection = match device {
        Some(index) => {
            let devices = backend.devices()?;
            let chosen = devices
                .iter()
                .find(|d| d.index == index)
                .ok_or_else(|| AppError::Config(format!("no audio device with index {}", index)))?;
            log::info!("Using requested device {}: {}", chosen.index, chosen.name);
            selector.selection_for(chosen)
        }
        None => {
            log::info!("Searching for microphone...");
            let devices = backend.devices().unwrap_or_else(|e| {
                log::warn!("Device enumeration failed: {}", e);
                Vec::new()
            });
            selector.select(&devices, || backend.default_input_device())
        }
    };

    let (stream, used_fallback) = open_with_fallback(backend, &selection, config.chunk_frames)?;
    if used_fallback {
        log::warn!("Recording with fallback settings on the system default device");
    }

    let format = stream.format();
    let mut session = RecorderSession::new(&format, config, triggers);
    log::info!(
        "Buffering the last {} seconds ({} chunks); saves go to {}",
        config.buffer_seconds,
        session.buffer.capacity(),
        config.output_directory.display()
    );

    let mut capture = CaptureLoop::new(stream, config);
    capture.set_delegate(Arc::new(LogDelegate));
    Ok(capture.run(&mut session)?)
}

fn list_devices(backend: &CpalBackend) -> Result<(), AppError> {
    let devices = backend.devices()?;
    if devices.is_empty() {
        println!("No audio devices found.");
        return Ok(());
    }
    for device in &devices {
        println!(
            "{:>3}: {} (input channels: {}, default rate: {} Hz, score: {})",
            device.index,
            device.name,
            device.max_input_channels,
            device.default_sample_rate,
            score_device_name(&device.name)
        );
    }
    Ok(())
}

/// Reports recorder events through the log.
struct LogDelegate;

impl RecorderDelegate for LogDelegate {
    fn on_state_changed(&self, state: &RecorderState) {
        match state {
            RecorderState::Listening => log::info!("Listening. Waiting for trigger..."),
            RecorderState::Extending {
                buffered_secs,
                extension_secs,
            } => log::debug!("Extending {:.1}s window by {:.0}s", buffered_secs, extension_secs),
            other => log::debug!("Recorder state: {}", other.name()),
        }
    }

    fn on_error(&self, error: &CaptureError) {
        log::error!("Recorder error: {}", error);
    }

    fn on_recording_saved(&self, result: &RecordingResult) {
        log::info!(
            "Saved {} ({:.1}s, sha256 {})",
            result.file_path.display(),
            result.duration_secs,
            result.checksum
        );
    }
}
