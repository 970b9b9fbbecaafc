//! Flash-controller hardware access.
//!
//! The ADP1653 is driven through two kernel interfaces: a GPIO character
//! device line wired to its enable pin, and an I2C adapter used to write the
//! brightness register. Each interface sits behind a small trait so the LED
//! state machine can run against the real devices or an in-memory mock.
//!
//! Releasing hardware is tied to `Drop`: a requested GPIO line is given back
//! to the kernel when its handle goes out of scope, and an I2C session never
//! outlives the single write it was opened for.

use std::fmt;

pub mod gpio;
pub mod i2c;

pub use gpio::{CdevLineProvider, GpioLineManager, LineProvider, OutputLine};
pub use i2c::{BrightnessWriter, I2cBus, LinuxI2cBus};

/// Errors raised by the GPIO and I2C layers.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// A device could not be opened or configured (missing, busy, or
    /// rejected the request).
    #[error("{device} unavailable: {reason}")]
    Unavailable { device: String, reason: String },

    /// An open device rejected a write.
    #[error("write to {device} failed: {reason}")]
    Write { device: String, reason: String },
}

impl HardwareError {
    pub fn unavailable(device: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Unavailable {
            device: device.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write(device: impl fmt::Display, reason: impl fmt::Display) -> Self {
        Self::Write {
            device: device.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HardwareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_display() {
        let err = HardwareError::unavailable("/dev/gpiochip2", "No such file or directory");
        assert_eq!(
            err.to_string(),
            "/dev/gpiochip2 unavailable: No such file or directory"
        );
    }

    #[test]
    fn test_write_display() {
        let err = HardwareError::write("/dev/i2c-2 @ 0x30", "Remote I/O error");
        assert_eq!(
            err.to_string(),
            "write to /dev/i2c-2 @ 0x30 failed: Remote I/O error"
        );
    }
}
