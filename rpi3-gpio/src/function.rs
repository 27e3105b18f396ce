//! Pin function select codes
//!
//! The alternate functions do not encode linearly. ALT0-ALT3 are
//! `0b100`-`0b111`, ALT4 is `0b011` and ALT5 is `0b010` (BCM2837 ARM
//! Peripherals, section 6.2).

use crate::error::{GpioError, Result};
use std::fmt;
use std::str::FromStr;

/// GPIO pin function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Function {
    Input = 0b000,
    Output = 0b001,
    Alt0 = 0b100,
    Alt1 = 0b101,
    Alt2 = 0b110,
    Alt3 = 0b111,
    Alt4 = 0b011,
    Alt5 = 0b010,
}

impl Function {
    pub const ALL: [Function; 8] = [
        Function::Input,
        Function::Output,
        Function::Alt0,
        Function::Alt1,
        Function::Alt2,
        Function::Alt3,
        Function::Alt4,
        Function::Alt5,
    ];

    /// Alternate function by index (0-5)
    pub fn alt(index: u8) -> Result<Self> {
        match index {
            0 => Ok(Function::Alt0),
            1 => Ok(Function::Alt1),
            2 => Ok(Function::Alt2),
            3 => Ok(Function::Alt3),
            4 => Ok(Function::Alt4),
            5 => Ok(Function::Alt5),
            _ => Err(GpioError::InvalidAltFunction(index)),
        }
    }

    /// 3-bit function select code
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Decode a function select field. Only the low three bits are used.
    pub const fn from_code(code: u32) -> Self {
        match code & 0b111 {
            0b000 => Function::Input,
            0b001 => Function::Output,
            0b100 => Function::Alt0,
            0b101 => Function::Alt1,
            0b110 => Function::Alt2,
            0b111 => Function::Alt3,
            0b011 => Function::Alt4,
            _ => Function::Alt5,
        }
    }

    /// Alternate function index, if this is one
    pub const fn alt_index(self) -> Option<u8> {
        match self {
            Function::Alt0 => Some(0),
            Function::Alt1 => Some(1),
            Function::Alt2 => Some(2),
            Function::Alt3 => Some(3),
            Function::Alt4 => Some(4),
            Function::Alt5 => Some(5),
            Function::Input | Function::Output => None,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.alt_index() {
            Some(index) => write!(f, "alt{}", index),
            None if *self == Function::Input => write!(f, "input"),
            None => write!(f, "output"),
        }
    }
}

impl FromStr for Function {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" | "input" => Ok(Function::Input),
            "out" | "output" => Ok(Function::Output),
            other => other
                .strip_prefix("alt")
                .and_then(|index| index.parse::<u8>().ok())
                .and_then(|index| Function::alt(index).ok())
                .ok_or_else(|| format!("unknown pin function: {} (expected input, output or alt0-alt5)", s)),
        }
    }
}
