//! LED state machine.
//!
//! Maps commands onto the GPIO/I2C sequence that puts the flash controller
//! into the requested mode, and owns the enable line for as long as the LED
//! is lit. A lit state always means the line is held and the matching code
//! was the last one written; any failure on the way there drops back to a
//! fully released `Off`.

use std::fmt;

use tracing::{debug, info};

use torchd_config::I2cConfig;

use crate::hardware::{BrightnessWriter, GpioLineManager, HardwareError, I2cBus, LineProvider};
use crate::protocol::Command;

/// Mode the flash controller is currently configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedState {
    #[default]
    Off,
    Red,
    Torch,
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedState::Off => write!(f, "off"),
            LedState::Red => write!(f, "red"),
            LedState::Torch => write!(f, "torch"),
        }
    }
}

impl From<Command> for LedState {
    fn from(command: Command) -> Self {
        match command {
            Command::Off => LedState::Off,
            Command::Red => LedState::Red,
            Command::Torch => LedState::Torch,
        }
    }
}

/// Drives the flash controller through its enable line and brightness
/// register.
pub struct LedController<P: LineProvider, B: I2cBus> {
    gpio: GpioLineManager<P>,
    brightness: BrightnessWriter<B>,
    red_code: u8,
    torch_code: u8,
    state: LedState,
}

impl<P: LineProvider, B: I2cBus> LedController<P, B> {
    pub fn new(provider: P, bus: B, config: &I2cConfig) -> Self {
        Self {
            gpio: GpioLineManager::new(provider),
            brightness: BrightnessWriter::from_config(bus, config),
            red_code: config.red_value,
            torch_code: config.torch_value,
            state: LedState::Off,
        }
    }

    pub fn state(&self) -> LedState {
        self.state
    }

    /// Whether the enable line is currently requested.
    pub fn line_held(&self) -> bool {
        self.gpio.is_held()
    }

    /// Check that the enable line can be requested, then release it.
    pub fn probe(&self) -> Result<(), HardwareError> {
        self.gpio.probe()
    }

    /// Apply a command.
    ///
    /// Repeating the current state replays the full hardware sequence. On
    /// error the line has already been released and the state is `Off`.
    pub fn apply(&mut self, command: Command) -> Result<LedState, HardwareError> {
        let target = LedState::from(command);
        let code = match target {
            LedState::Off => {
                self.switch_off();
                return Ok(LedState::Off);
            }
            LedState::Red => self.red_code,
            LedState::Torch => self.torch_code,
        };

        if let Err(e) = self.light(code) {
            self.switch_off();
            return Err(e);
        }

        self.state = target;
        info!(state = %target, "LED state changed");
        Ok(target)
    }

    /// Release everything. Safe to call any number of times.
    pub fn shutdown(&mut self) {
        self.switch_off();
    }

    fn light(&mut self, code: u8) -> Result<(), HardwareError> {
        self.gpio.acquire()?;
        self.gpio.set_active(true)?;
        self.brightness.write_brightness(code)
    }

    fn switch_off(&mut self) {
        if self.gpio.release() {
            info!(line = %self.gpio.describe(), "LED switched off");
        } else {
            debug!("LED already off, nothing to release");
        }
        self.state = LedState::Off;
    }
}
