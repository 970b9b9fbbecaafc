#![deny(unsafe_code)]

//! Configuration loading and validation for torchd.
//!
//! Loads a TOML file describing where the flash controller lives (GPIO chip,
//! enable line, I2C bus and address), the register codes it accepts, and
//! where the daemon's command socket is bound. Every field has a default
//! matching the Nokia N900 wiring, so an empty file (or no file) is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon socket configuration.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// GPIO enable line of the flash controller.
    #[serde(default)]
    pub gpio: GpioConfig,

    /// I2C bus and register codes of the flash controller.
    #[serde(default)]
    pub i2c: I2cConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default Unix socket path clients write commands to.
pub const DEFAULT_SOCKET_PATH: &str = "/run/torchd.sock";

/// Configuration for the command socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Filesystem path of the listening Unix socket.
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Permission bits applied to the socket file after binding.
    #[serde(default = "default_socket_mode")]
    pub socket_mode: u32,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            socket_mode: default_socket_mode(),
        }
    }
}

fn default_socket_path() -> PathBuf {
    PathBuf::from(DEFAULT_SOCKET_PATH)
}

fn default_socket_mode() -> u32 {
    // rw for user, group and others: unprivileged clients must be able to connect
    0o666
}

/// GPIO line driving the flash controller's EN pin.
///
/// On the N900 the ADP1653 enable pin is CPU GPIO 88, which the character
/// device interface exposes as `gpiochip2` line 24.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpioConfig {
    /// GPIO chip character device.
    #[serde(default = "default_gpio_chip")]
    pub chip: PathBuf,

    /// Line offset on the chip.
    #[serde(default = "default_gpio_line")]
    pub line: u32,

    /// Consumer label shown by the kernel for the requested line.
    #[serde(default = "default_gpio_consumer")]
    pub consumer: String,
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: default_gpio_chip(),
            line: default_gpio_line(),
            consumer: default_gpio_consumer(),
        }
    }
}

fn default_gpio_chip() -> PathBuf {
    PathBuf::from("/dev/gpiochip2")
}

fn default_gpio_line() -> u32 {
    24
}

fn default_gpio_consumer() -> String {
    "torchd".to_string()
}

/// I2C addressing and register codes of the flash controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct I2cConfig {
    /// I2C adapter character device.
    #[serde(default = "default_i2c_bus")]
    pub bus: PathBuf,

    /// 7-bit device address of the flash controller.
    #[serde(default = "default_i2c_address")]
    pub address: u16,

    /// Register receiving the brightness code.
    #[serde(default = "default_i2c_register")]
    pub register: u8,

    /// Register value for the low-current red indicator.
    #[serde(default = "default_red_value")]
    pub red_value: u8,

    /// Register value for full-current torch illumination.
    #[serde(default = "default_torch_value")]
    pub torch_value: u8,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            bus: default_i2c_bus(),
            address: default_i2c_address(),
            register: default_i2c_register(),
            red_value: default_red_value(),
            torch_value: default_torch_value(),
        }
    }
}

fn default_i2c_bus() -> PathBuf {
    PathBuf::from("/dev/i2c-2")
}

fn default_i2c_address() -> u16 {
    0x30
}

fn default_i2c_register() -> u8 {
    0x00
}

fn default_red_value() -> u8 {
    0x07
}

fn default_torch_value() -> u8 {
    0x08
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "debug", "trace").
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file at the given path using async I/O.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.daemon.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "daemon.socket_path must not be empty".to_string(),
            ));
        }
        if self.daemon.socket_mode > 0o777 {
            return Err(ConfigError::Validation(format!(
                "daemon.socket_mode must be at most 0o777, got {:#o}",
                self.daemon.socket_mode
            )));
        }

        if self.gpio.chip.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "gpio.chip must not be empty".to_string(),
            ));
        }
        if self.gpio.consumer.is_empty() {
            return Err(ConfigError::Validation(
                "gpio.consumer must not be empty".to_string(),
            ));
        }

        if self.i2c.bus.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "i2c.bus must not be empty".to_string(),
            ));
        }
        if self.i2c.address > 0x7f {
            return Err(ConfigError::Validation(format!(
                "i2c.address must be a 7-bit address, got {:#x}",
                self.i2c.address
            )));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "logging.level must be one of {:?}, got {:?}",
                valid_levels, self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.daemon.socket_path, PathBuf::from("/run/torchd.sock"));
        assert_eq!(config.daemon.socket_mode, 0o666);
        assert_eq!(config.gpio.chip, PathBuf::from("/dev/gpiochip2"));
        assert_eq!(config.gpio.line, 24);
        assert_eq!(config.gpio.consumer, "torchd");
        assert_eq!(config.i2c.bus, PathBuf::from("/dev/i2c-2"));
        assert_eq!(config.i2c.address, 0x30);
        assert_eq!(config.i2c.register, 0x00);
        assert_eq!(config.i2c.red_value, 0x07);
        assert_eq!(config.i2c.torch_value, 0x08);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config.gpio.line, 24);
        assert_eq!(config.i2c.address, 0x30);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            [daemon]
            socket_path = "/tmp/torchd-test.sock"
            socket_mode = 0o660

            [gpio]
            chip = "/dev/gpiochip0"
            line = 7
            consumer = "flash"

            [i2c]
            bus = "/dev/i2c-1"
            address = 0x31
            register = 0x02
            red_value = 0x01
            torch_value = 0x0f

            [logging]
            level = "debug"
        "#;
        let config = AppConfig::parse(toml).unwrap();
        assert_eq!(
            config.daemon.socket_path,
            PathBuf::from("/tmp/torchd-test.sock")
        );
        assert_eq!(config.daemon.socket_mode, 0o660);
        assert_eq!(config.gpio.chip, PathBuf::from("/dev/gpiochip0"));
        assert_eq!(config.gpio.line, 7);
        assert_eq!(config.gpio.consumer, "flash");
        assert_eq!(config.i2c.bus, PathBuf::from("/dev/i2c-1"));
        assert_eq!(config.i2c.address, 0x31);
        assert_eq!(config.i2c.register, 0x02);
        assert_eq!(config.i2c.red_value, 0x01);
        assert_eq!(config.i2c.torch_value, 0x0f);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation_rejects_empty_socket_path() {
        let toml = r#"
            [daemon]
            socket_path = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_wide_socket_mode() {
        let toml = r#"
            [daemon]
            socket_mode = 0o4777
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_consumer() {
        let toml = r#"
            [gpio]
            consumer = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_gpio_chip() {
        let toml = r#"
            [gpio]
            chip = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_empty_i2c_bus() {
        let toml = r#"
            [i2c]
            bus = ""
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_validation_rejects_ten_bit_address() {
        let toml = r#"
            [i2c]
            address = 0x130
        "#;
        let err = AppConfig::parse(toml).unwrap_err();
        assert!(err.to_string().contains("7-bit"));
    }

    #[test]
    fn test_validation_rejects_unknown_log_level() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;
        assert!(AppConfig::parse(toml).is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_register_value() {
        let toml = r#"
            [i2c]
            torch_value = 300
        "#;
        assert!(matches!(
            AppConfig::parse(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = AppConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("socket_path"));
        let reparsed = AppConfig::parse(&rendered).unwrap();
        assert_eq!(reparsed.gpio.line, config.gpio.line);
        assert_eq!(reparsed.i2c.torch_value, config.i2c.torch_value);
    }

    // ── Async file-based loading ──────────────────────────────────────

    #[test_log::test(tokio::test)]
    async fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("torchd.toml");
        tokio::fs::write(&path, b"[gpio]\nline = 12\n[i2c]\naddress = 0x40\n")
            .await
            .unwrap();

        let config = AppConfig::load(&path).await.unwrap();
        assert_eq!(config.gpio.line, 12);
        assert_eq!(config.i2c.address, 0x40);
    }

    #[tokio::test]
    async fn test_load_nonexistent_file() {
        let result = AppConfig::load(Path::new("/nonexistent/torchd.toml")).await;
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[tokio::test]
    async fn test_load_invalid_toml_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        tokio::fs::write(&path, b"not valid toml [[[").await.unwrap();

        let result = AppConfig::load(&path).await;
        assert!(result.is_err());
    }

    // ── Error display ─────────────────────────────────────────────────

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("bad value".to_string());
        assert_eq!(err.to_string(), "validation error: bad value");
    }
}
