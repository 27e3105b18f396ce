//! BCM2837 GPIO through `/dev/mem`
//!
//! Direct register access to the GPIO block of the BCM2837 (Raspberry Pi 2
//! v1.2, Pi 3, Pi 3+), without going through a kernel GPIO driver.
//!
//! ## Layers
//!
//! - **Register mapper** ([`open_mapping`], [`close_mapping`]): maps the
//!   4 KiB GPIO block at physical `0x3F200000` into the process.
//! - **Pin interface** ([`Gpio`]): function select, set, clear and level
//!   over any [`RegisterBlock`], either the mapped block or
//!   [`SimulatedRegisters`] for tests.
//!
//! ## Example
//!
//! ```no_run
//! use rpi3_gpio::{Gpio, MapConfig};
//!
//! # fn main() -> rpi3_gpio::Result<()> {
//! let mut gpio = Gpio::open(&MapConfig::default())?;
//! gpio.set_function_input(18)?;
//! gpio.set_function_output(18)?;
//! gpio.set_high(18)?;
//! gpio.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Mapping `/dev/mem` needs root (or `CAP_SYS_RAWIO`). Handles are
//! independent values with no global state, but nothing prevents two of them
//! from mapping the same block; see [`Mapping`] for the locking caveat.

pub mod config;
pub mod error;
pub mod function;
pub mod gpio;
pub mod mapper;
pub mod registers;

pub use config::MapConfig;
pub use error::{GpioError, Result};
pub use function::Function;
pub use gpio::Gpio;
pub use mapper::{close_mapping, open_mapping, Mapping};
pub use registers::{RegisterBlock, SimulatedRegisters, WordOffset};
