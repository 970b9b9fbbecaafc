//! In-memory flash-controller hardware for tests.
//!
//! [`MockHardware`] hands out a [`MockLineProvider`] and a [`MockI2cBus`]
//! that share one [`MockState`]. The state records every hardware call,
//! counts lines that are requested but not yet released (the leak counter),
//! and lets a test make any step fail on demand.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::hardware::{HardwareError, I2cBus, LineProvider, OutputLine, Result};

/// One SMBus byte-data write observed by the mock bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cWrite {
    pub address: u16,
    pub register: u8,
    pub value: u8,
}

/// Everything the mock hardware has seen so far.
#[derive(Debug, Clone, Default)]
pub struct MockState {
    /// Line requests attempted, successful or not.
    pub acquire_attempts: usize,
    /// Line requests granted.
    pub acquisitions: usize,
    /// Lines dropped after being granted.
    pub releases: usize,
    /// Lines currently held. Anything above zero after shutdown is a leak.
    pub open_lines: usize,
    /// Values passed to `set_active`, in call order.
    pub set_values: Vec<bool>,
    /// Bus sessions opened.
    pub bus_sessions: usize,
    /// Bus sessions currently open.
    pub open_buses: usize,
    /// Successful register writes, in call order.
    pub i2c_writes: Vec<I2cWrite>,

    fail_acquire: bool,
    fail_set: bool,
    fail_bus_open: bool,
    fail_write: bool,
}

impl MockState {
    /// Number of calls that reached the hardware layer.
    pub fn hardware_calls(&self) -> usize {
        self.acquire_attempts + self.set_values.len() + self.bus_sessions
    }
}

/// Shared handle to the mock hardware.
#[derive(Debug, Clone, Default)]
pub struct MockHardware {
    state: Arc<Mutex<MockState>>,
}

impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_provider(&self) -> MockLineProvider {
        MockLineProvider {
            state: Arc::clone(&self.state),
        }
    }

    pub fn bus(&self) -> MockI2cBus {
        MockI2cBus {
            state: Arc::clone(&self.state),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> MockState {
        lock(&self.state).clone()
    }

    pub fn open_lines(&self) -> usize {
        lock(&self.state).open_lines
    }

    /// Make line requests fail, as when another process holds the line.
    pub fn fail_acquire(&self, fail: bool) {
        lock(&self.state).fail_acquire = fail;
    }

    /// Make `set_active` fail on held lines.
    pub fn fail_set(&self, fail: bool) {
        lock(&self.state).fail_set = fail;
    }

    /// Make opening the I2C adapter fail.
    pub fn fail_bus_open(&self, fail: bool) {
        lock(&self.state).fail_bus_open = fail;
    }

    /// Make the register write itself fail.
    pub fn fail_write(&self, fail: bool) {
        lock(&self.state).fail_write = fail;
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock GPIO chip.
#[derive(Debug, Clone)]
pub struct MockLineProvider {
    state: Arc<Mutex<MockState>>,
}

impl LineProvider for MockLineProvider {
    type Line = MockLine;

    fn request(&self) -> Result<MockLine> {
        let mut state = lock(&self.state);
        state.acquire_attempts += 1;
        if state.fail_acquire {
            return Err(HardwareError::unavailable(
                self.describe(),
                "Device or resource busy",
            ));
        }
        state.acquisitions += 1;
        state.open_lines += 1;
        Ok(MockLine {
            state: Arc::clone(&self.state),
        })
    }

    fn describe(&self) -> String {
        "mock gpiochip line 0".to_string()
    }
}

/// A granted mock line; dropping it counts as a release.
#[derive(Debug)]
pub struct MockLine {
    state: Arc<Mutex<MockState>>,
}

impl OutputLine for MockLine {
    fn set_active(&mut self, active: bool) -> Result<()> {
        let mut state = lock(&self.state);
        state.set_values.push(active);
        if state.fail_set {
            return Err(HardwareError::write("mock gpiochip line 0", "I/O error"));
        }
        Ok(())
    }
}

impl Drop for MockLine {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        state.open_lines = state.open_lines.saturating_sub(1);
        state.releases += 1;
    }
}

/// Mock I2C adapter.
#[derive(Debug, Clone)]
pub struct MockI2cBus {
    state: Arc<Mutex<MockState>>,
}

impl I2cBus for MockI2cBus {
    fn write_byte_data(&self, address: u16, register: u8, value: u8) -> Result<()> {
        let mut state = lock(&self.state);
        state.bus_sessions += 1;
        if state.fail_bus_open {
            return Err(HardwareError::unavailable(
                self.describe(),
                "No such device",
            ));
        }
        state.open_buses += 1;
        let result = if state.fail_write {
            Err(HardwareError::write(self.describe(), "Remote I/O error"))
        } else {
            state.i2c_writes.push(I2cWrite {
                address,
                register,
                value,
            });
            Ok(())
        };
        state.open_buses -= 1;
        result
    }

    fn describe(&self) -> String {
        "mock i2c".to_string()
    }
}
