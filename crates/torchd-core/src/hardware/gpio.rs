//! GPIO line manager for the flash controller's enable pin.
//!
//! A [`LineProvider`] knows how to request the line from the kernel; the
//! [`GpioLineManager`] decides *when*. It requests the line lazily, keeps the
//! handle across consecutive non-off states, and releases it exactly once.

use std::fmt;
use std::path::PathBuf;

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::debug;

use torchd_config::GpioConfig;

use super::{HardwareError, Result};

/// An exclusively requested output line. Dropping it releases the request.
pub trait OutputLine {
    /// Drive the line active (`true`) or inactive (`false`).
    fn set_active(&mut self, active: bool) -> Result<()>;
}

/// Source of output-line requests.
pub trait LineProvider {
    type Line: OutputLine;

    /// Open the chip and request the line for output.
    ///
    /// Anything opened along the way is released if a later step fails.
    fn request(&self) -> Result<Self::Line>;

    /// Human-readable description of the line, for logs.
    fn describe(&self) -> String;
}

// ── Kernel character-device backend ─────────────────────────────────────

/// Requests lines through the GPIO character device (`/dev/gpiochipN`).
#[derive(Debug, Clone)]
pub struct CdevLineProvider {
    chip: PathBuf,
    offset: u32,
    consumer: String,
}

impl CdevLineProvider {
    pub fn new(chip: impl Into<PathBuf>, offset: u32, consumer: impl Into<String>) -> Self {
        Self {
            chip: chip.into(),
            offset,
            consumer: consumer.into(),
        }
    }

    pub fn from_config(config: &GpioConfig) -> Self {
        Self::new(&config.chip, config.line, &config.consumer)
    }
}

impl LineProvider for CdevLineProvider {
    type Line = CdevLine;

    fn request(&self) -> Result<CdevLine> {
        // Each step returns an owned value; an early `?` drops whatever was
        // opened before it, closing the chip descriptor.
        let mut chip = Chip::new(&self.chip)
            .map_err(|e| HardwareError::unavailable(self.chip.display(), e))?;
        let line = chip
            .get_line(self.offset)
            .map_err(|e| HardwareError::unavailable(self.describe(), e))?;
        let handle = line
            .request(LineRequestFlags::OUTPUT, 0, &self.consumer)
            .map_err(|e| HardwareError::unavailable(self.describe(), e))?;

        Ok(CdevLine {
            handle,
            label: self.describe(),
        })
    }

    fn describe(&self) -> String {
        format!("{} line {}", self.chip.display(), self.offset)
    }
}

/// A line requested through the character device.
///
/// The handle owns the line request and keeps the chip open; both are
/// closed when it is dropped.
pub struct CdevLine {
    handle: LineHandle,
    label: String,
}

impl fmt::Debug for CdevLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdevLine")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl OutputLine for CdevLine {
    fn set_active(&mut self, active: bool) -> Result<()> {
        self.handle
            .set_value(u8::from(active))
            .map_err(|e| HardwareError::write(&self.label, e))
    }
}

// ── Manager ─────────────────────────────────────────────────────────────

/// Owns at most one requested line at a time.
///
/// `None` in the slot is the "absent" sentinel: release and set operations
/// check it before touching the kernel, so releasing twice is harmless.
pub struct GpioLineManager<P: LineProvider> {
    provider: P,
    line: Option<P::Line>,
}

impl<P: LineProvider> GpioLineManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            line: None,
        }
    }

    /// Whether a line request is currently held.
    pub fn is_held(&self) -> bool {
        self.line.is_some()
    }

    /// Request the line unless one is already held, in which case the
    /// existing handle is reused.
    pub fn acquire(&mut self) -> Result<&mut P::Line> {
        let line = match self.line.take() {
            Some(line) => line,
            None => {
                let line = self.provider.request()?;
                debug!(line = %self.provider.describe(), "GPIO line acquired");
                line
            }
        };
        Ok(self.line.insert(line))
    }

    /// Drive the held line. Fails without side effects when no line is held.
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        match self.line.as_mut() {
            Some(line) => line.set_active(active),
            None => Err(HardwareError::write(
                self.provider.describe(),
                "line not held",
            )),
        }
    }

    /// Release the held line, if any. Returns whether anything was released.
    pub fn release(&mut self) -> bool {
        match self.line.take() {
            Some(line) => {
                drop(line);
                debug!(line = %self.provider.describe(), "GPIO line released");
                true
            }
            None => false,
        }
    }

    /// Request the line and give it straight back, to check that the
    /// hardware is present and not claimed by another process.
    pub fn probe(&self) -> Result<()> {
        let line = self.provider.request()?;
        drop(line);
        debug!(line = %self.provider.describe(), "GPIO probe succeeded");
        Ok(())
    }

    pub fn describe(&self) -> String {
        self.provider.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHardware;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_acquire_is_lazy_and_reused() {
        let hw = MockHardware::new();
        let mut manager = GpioLineManager::new(hw.line_provider());
        assert!(!manager.is_held());
        assert_eq!(hw.snapshot().acquisitions, 0);

        manager.acquire().unwrap();
        manager.acquire().unwrap();

        assert!(manager.is_held());
        assert_eq!(hw.snapshot().acquisitions, 1);
        assert_eq!(hw.open_lines(), 1);
    }

    #[test]
    fn test_release_is_idempotent() {
        let hw = MockHardware::new();
        let mut manager = GpioLineManager::new(hw.line_provider());
        manager.acquire().unwrap();

        assert!(manager.release());
        assert!(!manager.release());
        assert!(!manager.is_held());
        assert_eq!(hw.open_lines(), 0);
        assert_eq!(hw.snapshot().releases, 1);
    }

    #[test]
    fn test_failed_acquire_holds_nothing() {
        let hw = MockHardware::new();
        hw.fail_acquire(true);
        let mut manager = GpioLineManager::new(hw.line_provider());

        let err = manager.acquire().unwrap_err();
        assert!(matches!(err, HardwareError::Unavailable { .. }));
        assert!(!manager.is_held());
        assert_eq!(hw.open_lines(), 0);
    }

    #[test]
    fn test_set_active_without_line_fails() {
        let hw = MockHardware::new();
        let mut manager = GpioLineManager::new(hw.line_provider());

        let err = manager.set_active(true).unwrap_err();
        assert!(matches!(err, HardwareError::Write { .. }));
        assert!(hw.snapshot().set_values.is_empty());
    }

    #[test]
    fn test_set_active_failure_keeps_handle() {
        let hw = MockHardware::new();
        hw.fail_set(true);
        let mut manager = GpioLineManager::new(hw.line_provider());
        manager.acquire().unwrap();

        assert!(manager.set_active(true).is_err());
        assert!(manager.is_held());
        assert_eq!(hw.open_lines(), 1);
    }

    #[test]
    fn test_probe_releases_immediately() {
        let hw = MockHardware::new();
        let manager = GpioLineManager::new(hw.line_provider());

        manager.probe().unwrap();

        let state = hw.snapshot();
        assert_eq!(state.acquisitions, 1);
        assert_eq!(state.releases, 1);
        assert_eq!(state.open_lines, 0);
        assert!(!manager.is_held());
    }

    #[test]
    fn test_probe_reports_busy_line() {
        let hw = MockHardware::new();
        hw.fail_acquire(true);
        let manager = GpioLineManager::new(hw.line_provider());
        assert!(manager.probe().is_err());
    }

    #[test]
    fn test_dropping_manager_releases_line() {
        let hw = MockHardware::new();
        {
            let mut manager = GpioLineManager::new(hw.line_provider());
            manager.acquire().unwrap();
            assert_eq!(hw.open_lines(), 1);
        }
        assert_eq!(hw.open_lines(), 0);
    }

    #[test]
    fn test_cdev_describe() {
        let provider = CdevLineProvider::new("/dev/gpiochip2", 24, "torchd");
        assert_eq!(provider.describe(), "/dev/gpiochip2 line 24");
    }

    #[test]
    fn test_cdev_missing_chip_is_unavailable() {
        let provider = CdevLineProvider::new("/nonexistent/gpiochip9", 24, "torchd");
        let err = provider.request().unwrap_err();
        assert!(matches!(err, HardwareError::Unavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/gpiochip9"));
    }
}
