//! Mapping configuration
//!
//! Where the GPIO block lives and how much of it to map. The defaults are
//! the BCM2837 values (Pi 2 v1.2 through Pi 3+). Other values only move the
//! window; the register layout inside it is fixed.
//!
//! ```toml
//! device_path = "/dev/mem"
//! peripheral_base = 0x3F000000
//! gpio_offset = 0x200000
//! block_len = 4096
//! pin_count = 54
//! ```

use crate::error::{GpioError, Result};
use crate::registers::{MAX_PINS, MIN_BLOCK_LEN};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Physical-memory device
pub const DEVMEM_PATH: &str = "/dev/mem";

/// BCM2837 peripheral base (ARM physical address)
pub const BCM2837_PERI_BASE: u64 = 0x3F00_0000;

/// Offset of the GPIO block from the peripheral base
pub const GPIO_OFFSET: u64 = 0x20_0000;

/// One page
pub const BLOCK_SIZE: usize = 4 * 1024;

/// GPIO 0-53
pub const PIN_COUNT: u8 = 54;

/// Parameters for [`open_mapping`](crate::open_mapping)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Device to map from (normally `/dev/mem`)
    pub device_path: PathBuf,
    /// Peripheral base physical address
    pub peripheral_base: u64,
    /// GPIO block offset from `peripheral_base`
    pub gpio_offset: u64,
    /// Length of the mapping in bytes
    pub block_len: usize,
    /// Number of addressable pins
    pub pin_count: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            device_path: PathBuf::from(DEVMEM_PATH),
            peripheral_base: BCM2837_PERI_BASE,
            gpio_offset: GPIO_OFFSET,
            block_len: BLOCK_SIZE,
            pin_count: PIN_COUNT,
        }
    }
}

impl MapConfig {
    /// Default BCM2837 layout read from another device or file
    pub fn with_device(path: impl Into<PathBuf>) -> Self {
        Self {
            device_path: path.into(),
            ..Default::default()
        }
    }

    /// Physical address of the GPIO block
    pub fn gpio_base(&self) -> u64 {
        self.peripheral_base.saturating_add(self.gpio_offset)
    }

    /// Check that a mapping built from this config can serve every register
    /// the pin interface touches.
    pub fn validate(&self) -> Result<()> {
        if self.block_len < MIN_BLOCK_LEN {
            return Err(GpioError::InvalidConfig(format!(
                "block_len {} does not cover the level registers (need at least {} bytes)",
                self.block_len, MIN_BLOCK_LEN
            )));
        }

        if self.pin_count == 0 || self.pin_count > MAX_PINS {
            return Err(GpioError::InvalidConfig(format!(
                "pin_count {} outside 1-{}",
                self.pin_count, MAX_PINS
            )));
        }

        let base = self
            .peripheral_base
            .checked_add(self.gpio_offset)
            .ok_or_else(|| GpioError::InvalidConfig("GPIO base address overflows".to_string()))?;
        if libc::off_t::try_from(base).is_err() {
            return Err(GpioError::InvalidConfig(format!(
                "GPIO base {:#X} does not fit in a file offset",
                base
            )));
        }

        Ok(())
    }

    /// Parse a TOML document. Missing keys take the BCM2837 defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| GpioError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_bcm2837() {
        let config = MapConfig::default();
        assert_eq!(config.gpio_base(), 0x3F20_0000);
        assert_eq!(config.block_len, 4096);
        assert_eq!(config.device_path, PathBuf::from("/dev/mem"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = MapConfig::from_toml_str("device_path = \"/tmp/gpio.bin\"\ngpio_offset = 0\n").unwrap();
        assert_eq!(config.device_path, PathBuf::from("/tmp/gpio.bin"));
        assert_eq!(config.gpio_offset, 0);
        assert_eq!(config.peripheral_base, BCM2837_PERI_BASE);
        assert_eq!(config.pin_count, 54);
    }

    #[test]
    fn test_hex_addresses() {
        let config = MapConfig::from_toml_str("peripheral_base = 0x20000000\n").unwrap();
        assert_eq!(config.gpio_base(), 0x2020_0000);
    }

    #[test]
    fn test_block_too_small() {
        let err = MapConfig::from_toml_str("block_len = 52\n").unwrap_err();
        assert!(matches!(err, GpioError::InvalidConfig(_)));
    }

    #[test]
    fn test_pin_count_bounds() {
        assert!(MapConfig::from_toml_str("pin_count = 0\n").is_err());
        assert!(MapConfig::from_toml_str("pin_count = 61\n").is_err());
        assert!(MapConfig::from_toml_str("pin_count = 60\n").is_ok());
    }

    #[test]
    fn test_malformed_toml() {
        let err = MapConfig::from_toml_str("block_len = \"big\"\n").unwrap_err();
        assert!(matches!(err, GpioError::ConfigParse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MapConfig::load(Path::new("/nonexistent/gpio.toml")).unwrap_err();
        assert!(matches!(err, GpioError::ConfigRead { .. }));
    }
}
