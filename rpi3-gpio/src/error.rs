//! Error types for mapping and pin operations

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the register mapper and the pin interface.
///
/// Nothing here is retried internally. Mapping failures are not transient,
/// so the caller has to fix the cause (usually privilege) and open again.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("failed to open {}: {source}", .path.display())]
    DeviceOpenFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to map GPIO block, error code: {code} ({})", os_error(.code))]
    MappingFailed { code: i32 },

    #[error("failed to unmap GPIO block, error code: {code} ({})", os_error(.code))]
    UnmapFailed { code: i32 },

    #[error("invalid GPIO pin {pin} (valid range 0-{})", .count.saturating_sub(1))]
    InvalidPin { pin: u8, count: u8 },

    #[error("invalid alternate function {0} (valid range 0-5)")]
    InvalidAltFunction(u8),

    #[error("invalid mapping configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to read config {}: {source}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, GpioError>;

fn os_error(code: &i32) -> io::Error {
    io::Error::from_raw_os_error(*code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pin_message() {
        let err = GpioError::InvalidPin { pin: 60, count: 54 };
        assert_eq!(err.to_string(), "invalid GPIO pin 60 (valid range 0-53)");
    }

    #[test]
    fn test_mapping_failed_carries_code() {
        let err = GpioError::MappingFailed { code: libc::EINVAL };
        assert!(err.to_string().contains(&format!("error code: {}", libc::EINVAL)));
    }
}
