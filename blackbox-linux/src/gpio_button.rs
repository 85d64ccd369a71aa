//! Push-button trigger on a GPIO pin.
//!
//! The pin is configured as an input with the internal pull-up, so a button
//! wired to ground produces a falling edge when pressed. The interrupt
//! callback runs on rppal's interrupt thread and only ever sets the record
//! flag.

use std::sync::Arc;
#[cfg(all(target_os = "linux", feature = "gpio"))]
use std::time::Duration;

use blackbox_core::models::config::TriggerConfig;
use blackbox_core::models::error::TriggerError;
use blackbox_core::traits::trigger_source::TriggerSource;
use blackbox_core::trigger::state::TriggerState;

#[cfg(all(target_os = "linux", feature = "gpio"))]
use rppal::gpio::{Gpio, InputPin, Level, Trigger};

pub struct ButtonTrigger {
    pin_number: u8,
    #[cfg(all(target_os = "linux", feature = "gpio"))]
    debounce: Duration,
    #[cfg(all(target_os = "linux", feature = "gpio"))]
    pin: Option<InputPin>,
}

impl ButtonTrigger {
    pub fn new(config: &TriggerConfig) -> Self {
        Self {
            pin_number: config.button_pin,
            #[cfg(all(target_os = "linux", feature = "gpio"))]
            debounce: config.debounce,
            #[cfg(all(target_os = "linux", feature = "gpio"))]
            pin: None,
        }
    }

    pub fn pin_number(&self) -> u8 {
        self.pin_number
    }
}

#[cfg(all(target_os = "linux", feature = "gpio"))]
impl TriggerSource for ButtonTrigger {
    fn name(&self) -> &str {
        "button"
    }

    fn setup(&mut self, state: Arc<TriggerState>) -> Result<(), TriggerError> {
        use blackbox_core::trigger::debounce::Debouncer;
        use std::time::Instant;

        let gpio = Gpio::new().map_err(|e| TriggerError::Unavailable(format!("GPIO not accessible: {}", e)))?;
        let mut pin = gpio
            .get(self.pin_number)
            .map_err(|e| TriggerError::Unavailable(format!("pin {} not available: {}", self.pin_number, e)))?
            .into_input_pullup();

        let mut debouncer = Debouncer::new(self.debounce);
        pin.set_async_interrupt(Trigger::FallingEdge, move |_level: Level| {
            if debouncer.accept(Instant::now()) {
                log::info!("Button pressed: start recording");
                state.trigger_recording();
            }
        })
        .map_err(|e| TriggerError::Setup(format!("failed to register interrupt: {}", e)))?;

        log::info!(
            "Button trigger on GPIO {} ({} ms debounce)",
            self.pin_number,
            self.debounce.as_millis()
        );
        self.pin = Some(pin);
        Ok(())
    }

    fn start(&mut self) -> Result<(), TriggerError> {
        // Interrupt-driven; nothing to start.
        Ok(())
    }

    fn cleanup(&mut self) {
        if let Some(mut pin) = self.pin.take() {
            if let Err(e) = pin.clear_async_interrupt() {
                log::warn!("Failed to clear button interrupt: {}", e);
            }
            // Dropping the pin resets it to its original mode.
            drop(pin);
            log::info!("GPIO {} released", self.pin_number);
        }
    }
}

#[cfg(not(all(target_os = "linux", feature = "gpio")))]
impl TriggerSource for ButtonTrigger {
    fn name(&self) -> &str {
        "button"
    }

    fn setup(&mut self, _state: Arc<TriggerState>) -> Result<(), TriggerError> {
        Err(TriggerError::Unavailable(format!(
            "GPIO support not built; pin {} ignored",
            self.pin_number
        )))
    }

    fn start(&mut self) -> Result<(), TriggerError> {
        Ok(())
    }

    fn cleanup(&mut self) {}
}

impl Drop for ButtonTrigger {
    fn drop(&mut self) {
        self.cleanup();
    }
}
