//! Pin register interface
//!
//! Encodes pin operations into GPIO register writes. Every operation checks
//! the pin (and alt index) before touching a register, so a bad index is an
//! error instead of a write into a neighbouring pin's field.
//!
//! Function select changes are two-phase: [`Gpio::set_function_input`]
//! clears the field to `000`, then [`Gpio::set_function_output`] or
//! [`Gpio::set_function_alt`] ORs the new code in. The second phase only
//! ORs, so skipping the first leaves a mixed code in the field. This is the
//! caller's obligation and is not tracked; [`Gpio::set_function`] runs both
//! phases.

use crate::config::{MapConfig, PIN_COUNT};
use crate::error::{GpioError, Result};
use crate::function::Function;
use crate::mapper::{self, Mapping};
use crate::registers::{bank_bit, fsel_field, regs, RegisterBlock, FSEL_MASK, MAX_PINS};
use log::debug;

/// GPIO controller over a register block
#[derive(Debug)]
pub struct Gpio<R: RegisterBlock> {
    regs: R,
    pin_count: u8,
}

impl Gpio<Mapping> {
    /// Map the GPIO block and wrap it
    pub fn open(config: &MapConfig) -> Result<Self> {
        let mapping = mapper::open_mapping(config)?;
        Ok(Self {
            regs: mapping,
            pin_count: config.pin_count,
        })
    }

    /// Release the mapping
    pub fn close(self) -> Result<()> {
        mapper::close_mapping(self.regs)
    }
}

impl<R: RegisterBlock> Gpio<R> {
    /// Wrap a register block exposing GPIO 0-53
    pub fn new(regs: R) -> Self {
        Self::with_pin_count(regs, PIN_COUNT)
    }

    /// Wrap a register block exposing GPIO `0..pin_count`, capped at the
    /// 60 pins the function-select words can hold
    pub fn with_pin_count(regs: R, pin_count: u8) -> Self {
        Self {
            regs,
            pin_count: pin_count.min(MAX_PINS),
        }
    }

    pub fn pin_count(&self) -> u8 {
        self.pin_count
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn into_registers(self) -> R {
        self.regs
    }

    fn check_pin(&self, pin: u8) -> Result<()> {
        if pin < self.pin_count {
            Ok(())
        } else {
            Err(GpioError::InvalidPin {
                pin,
                count: self.pin_count,
            })
        }
    }

    /// Reset `pin` to input (`000`), leaving the other nine fields in its
    /// GPFSEL word untouched.
    pub fn set_function_input(&mut self, pin: u8) -> Result<()> {
        self.check_pin(pin)?;
        let (word, shift) = fsel_field(pin);
        self.regs.modify(word, |v| v & !(FSEL_MASK << shift));
        Ok(())
    }

    /// Switch `pin` to output. The field must already be `000`.
    pub fn set_function_output(&mut self, pin: u8) -> Result<()> {
        self.check_pin(pin)?;
        self.or_function(pin, Function::Output);
        Ok(())
    }

    /// Switch `pin` to alternate function `alt` (0-5). The field must
    /// already be `000`.
    pub fn set_function_alt(&mut self, pin: u8, alt: u8) -> Result<()> {
        self.check_pin(pin)?;
        let function = Function::alt(alt)?;
        self.or_function(pin, function);
        Ok(())
    }

    /// Reset to input, then apply `function`
    pub fn set_function(&mut self, pin: u8, function: Function) -> Result<()> {
        self.set_function_input(pin)?;
        if function != Function::Input {
            self.or_function(pin, function);
        }
        Ok(())
    }

    /// Current function of `pin`
    pub fn function(&self, pin: u8) -> Result<Function> {
        self.check_pin(pin)?;
        let (word, shift) = fsel_field(pin);
        Ok(Function::from_code(self.regs.read(word) >> shift))
    }

    fn or_function(&mut self, pin: u8, function: Function) {
        let (word, shift) = fsel_field(pin);
        self.regs.modify(word, |v| {
            if (v >> shift) & FSEL_MASK != 0 {
                debug!(
                    "GPIO{}: setting {} over non-input field {:03b}",
                    pin,
                    function,
                    (v >> shift) & FSEL_MASK
                );
            }
            v | (function.code() << shift)
        });
    }

    /// Drive `pin` high. GPSET is write-1-to-set, so only this pin's bit is
    /// written and no read is needed.
    pub fn set_high(&mut self, pin: u8) -> Result<()> {
        self.check_pin(pin)?;
        let (word, mask) = bank_bit(regs::GPSET0, pin);
        self.regs.write(word, mask);
        Ok(())
    }

    /// Drive `pin` low through GPCLR (write-1-to-clear)
    pub fn set_low(&mut self, pin: u8) -> Result<()> {
        self.check_pin(pin)?;
        let (word, mask) = bank_bit(regs::GPCLR0, pin);
        self.regs.write(word, mask);
        Ok(())
    }

    /// Drive `pin` to `high`
    pub fn write_level(&mut self, pin: u8, high: bool) -> Result<()> {
        if high {
            self.set_high(pin)
        } else {
            self.set_low(pin)
        }
    }

    /// Whether `pin` currently reads high
    pub fn read_level(&self, pin: u8) -> Result<bool> {
        self.check_pin(pin)?;
        let (word, mask) = bank_bit(regs::GPLEV0, pin);
        Ok(self.regs.read(word) & mask != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::SimulatedRegisters;

    fn sim() -> Gpio<SimulatedRegisters> {
        Gpio::new(SimulatedRegisters::new())
    }

    fn field(gpio: &Gpio<SimulatedRegisters>, pin: u8) -> u32 {
        let (word, shift) = fsel_field(pin);
        (gpio.registers().read(word) >> shift) & FSEL_MASK
    }

    #[test]
    fn test_input_clears_only_its_field() {
        let mut gpio = sim();
        gpio.registers_mut().write(regs::GPFSEL0, 0x3FFF_FFFF);

        gpio.set_function_input(4).unwrap();

        assert_eq!(gpio.registers().read(regs::GPFSEL0), 0x3FFF_FFFF & !(0b111 << 12));
    }

    #[test]
    fn test_output_after_input() {
        let mut gpio = sim();
        for pin in 0..54u8 {
            gpio.set_function_input(pin).unwrap();
            gpio.set_function_output(pin).unwrap();
            assert_eq!(field(&gpio, pin), 0b001, "pin {}", pin);
        }
    }

    #[test]
    fn test_alt_codes() {
        let mut gpio = sim();
        let expected = [4, 5, 6, 7, 3, 2];
        for (alt, code) in expected.iter().enumerate() {
            gpio.set_function_input(14).unwrap();
            gpio.set_function_alt(14, alt as u8).unwrap();
            assert_eq!(field(&gpio, 14), *code);
        }
    }

    #[test]
    fn test_output_without_reset_ors_into_field() {
        let mut gpio = sim();
        gpio.set_function_alt(3, 5).unwrap();
        gpio.set_function_output(3).unwrap();
        assert_eq!(field(&gpio, 3), 0b011);
    }

    #[test]
    fn test_invalid_pin_leaves_registers_untouched() {
        let mut gpio = sim();
        let before = gpio.registers().clone();

        assert!(matches!(gpio.set_function_input(54), Err(GpioError::InvalidPin { pin: 54, count: 54 })));
        assert!(gpio.set_function_output(60).is_err());
        assert!(gpio.set_function_alt(255, 0).is_err());
        assert!(gpio.set_high(54).is_err());
        assert!(gpio.set_low(100).is_err());
        assert!(gpio.read_level(54).is_err());
        assert!(gpio.function(54).is_err());

        assert_eq!(gpio.registers(), &before);
    }

    #[test]
    fn test_invalid_alt_leaves_registers_untouched() {
        let mut gpio = sim();
        let before = gpio.registers().clone();
        assert!(matches!(gpio.set_function_alt(4, 6), Err(GpioError::InvalidAltFunction(6))));
        assert_eq!(gpio.registers(), &before);
    }

    #[test]
    fn test_set_function_round_trips() {
        let mut gpio = sim();
        for function in Function::ALL {
            gpio.set_function(27, function).unwrap();
            assert_eq!(gpio.function(27).unwrap(), function);
        }
    }

    #[test]
    fn test_high_bank_pins() {
        let mut gpio = sim();
        gpio.set_high(40).unwrap();
        assert_eq!(gpio.registers().read(regs::GPLEV1), 1 << 8);
        assert_eq!(gpio.registers().read(regs::GPLEV0), 0);
        assert!(gpio.read_level(40).unwrap());
        assert!(!gpio.read_level(8).unwrap());

        gpio.set_low(40).unwrap();
        assert!(!gpio.read_level(40).unwrap());
    }

    #[test]
    fn test_reduced_pin_count() {
        let mut gpio = Gpio::with_pin_count(SimulatedRegisters::new(), 28);
        assert!(gpio.set_high(27).is_ok());
        assert!(matches!(gpio.set_high(28), Err(GpioError::InvalidPin { pin: 28, count: 28 })));
    }
}
