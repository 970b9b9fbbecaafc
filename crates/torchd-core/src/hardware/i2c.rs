//! I2C brightness register writer.
//!
//! Every write opens the adapter, addresses the flash controller, performs a
//! single SMBus byte-data write and closes the adapter again. No session is
//! kept between writes.

use std::path::PathBuf;

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use tracing::debug;

use torchd_config::I2cConfig;

use super::{HardwareError, Result};

/// An I2C adapter able to perform one SMBus byte-data write.
pub trait I2cBus {
    /// Open a session to `address`, write `value` to `register`, and close
    /// the session whatever the outcome.
    fn write_byte_data(&self, address: u16, register: u8, value: u8) -> Result<()>;

    /// Human-readable description of the adapter, for logs.
    fn describe(&self) -> String;
}

/// Linux `i2c-dev` adapter (`/dev/i2c-N`).
#[derive(Debug, Clone)]
pub struct LinuxI2cBus {
    path: PathBuf,
}

impl LinuxI2cBus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl I2cBus for LinuxI2cBus {
    fn write_byte_data(&self, address: u16, register: u8, value: u8) -> Result<()> {
        let target = format!("{} @ {address:#04x}", self.path.display());

        // Opens the adapter and sets the slave address; the descriptor is
        // closed when `device` drops, on the error path as well.
        let mut device = LinuxI2CDevice::new(&self.path, address)
            .map_err(|e| HardwareError::unavailable(&target, e))?;
        device
            .smbus_write_byte_data(register, value)
            .map_err(|e| HardwareError::write(&target, e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Writes brightness codes to the flash controller's register.
pub struct BrightnessWriter<B: I2cBus> {
    bus: B,
    address: u16,
    register: u8,
}

impl<B: I2cBus> BrightnessWriter<B> {
    pub fn new(bus: B, address: u16, register: u8) -> Self {
        Self {
            bus,
            address,
            register,
        }
    }

    pub fn from_config(bus: B, config: &I2cConfig) -> Self {
        Self::new(bus, config.address, config.register)
    }

    /// Write one brightness code.
    pub fn write_brightness(&self, value: u8) -> Result<()> {
        self.bus
            .write_byte_data(self.address, self.register, value)?;
        debug!(
            bus = %self.bus.describe(),
            address = self.address,
            register = self.register,
            value,
            "Brightness register written"
        );
        Ok(())
    }
}
