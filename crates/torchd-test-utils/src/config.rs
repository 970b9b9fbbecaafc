//! Configuration builders for tests.
//!
//! Use [`TestConfigBuilder`] to create customised [`AppConfig`] values without
//! repeating boilerplate across crate boundaries.

use std::path::Path;

use torchd_config::AppConfig;

/// Fluent builder for [`AppConfig`] in tests.
///
/// # Example
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .socket_path(dir.path().join("torchd.sock"))
///     .register_codes(0x01, 0x0f)
///     .build();
/// ```
pub struct TestConfigBuilder {
    config: AppConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn socket_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config.daemon.socket_path = path.as_ref().to_path_buf();
        self
    }

    pub fn socket_mode(mut self, mode: u32) -> Self {
        self.config.daemon.socket_mode = mode;
        self
    }

    pub fn gpio_line(mut self, line: u32) -> Self {
        self.config.gpio.line = line;
        self
    }

    pub fn i2c_address(mut self, address: u16) -> Self {
        self.config.i2c.address = address;
        self
    }

    pub fn register_codes(mut self, red: u8, torch: u8) -> Self {
        self.config.i2c.red_value = red;
        self.config.i2c.torch_value = torch;
        self
    }

    pub fn log_level(mut self, level: &str) -> Self {
        self.config.logging.level = level.to_string();
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
