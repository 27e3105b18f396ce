//! BCM2837 GPIO register layout
//!
//! All offset arithmetic for the pin interface lives here. Registers are
//! addressed in 32-bit words from the start of the GPIO block:
//!
//! | Word  | Byte  | Register         | Layout                      |
//! |-------|-------|------------------|-----------------------------|
//! | 0-5   | 0x00  | GPFSEL0-5        | 10 pins/word, 3 bits/pin    |
//! | 7-8   | 0x1C  | GPSET0-1         | 1 bit/pin, write-1-to-set   |
//! | 10-11 | 0x28  | GPCLR0-1         | 1 bit/pin, write-1-to-clear |
//! | 13-14 | 0x34  | GPLEV0-1         | 1 bit/pin, read-only        |

use std::fmt;

/// Word index into the GPIO register block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WordOffset(usize);

impl WordOffset {
    pub const fn new(word: usize) -> Self {
        Self(word)
    }

    pub const fn index(self) -> usize {
        self.0
    }

    pub const fn byte_offset(self) -> usize {
        self.0 * 4
    }

    const fn offset_by(self, words: usize) -> Self {
        Self(self.0 + words)
    }
}

impl fmt::Display for WordOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "word {} (+{:#04X})", self.0, self.byte_offset())
    }
}

/// GPIO register offsets
pub mod regs {
    use super::WordOffset;

    pub const GPFSEL0: WordOffset = WordOffset::new(0); // Function Select 0 (pins 0-9)
    pub const GPFSEL5: WordOffset = WordOffset::new(5); // Function Select 5 (pins 50-53)
    pub const GPSET0: WordOffset = WordOffset::new(7); // Pin Output Set 0
    pub const GPSET1: WordOffset = WordOffset::new(8); // Pin Output Set 1
    pub const GPCLR0: WordOffset = WordOffset::new(10); // Pin Output Clear 0
    pub const GPCLR1: WordOffset = WordOffset::new(11); // Pin Output Clear 1
    pub const GPLEV0: WordOffset = WordOffset::new(13); // Pin Level 0
    pub const GPLEV1: WordOffset = WordOffset::new(14); // Pin Level 1
}

/// Smallest block that still reaches GPLEV1
pub const MIN_BLOCK_LEN: usize = (regs::GPLEV1.index() + 1) * 4;

/// Width of one function-select field
pub const FSEL_BITS: u32 = 3;

/// Unshifted function-select field mask
pub const FSEL_MASK: u32 = 0b111;

/// Pins per function-select word (bits 30-31 reserved)
pub const PINS_PER_FSEL: u8 = 10;

/// Pins the six function-select words can describe
pub const MAX_PINS: u8 = 6 * PINS_PER_FSEL;

/// Pins per set/clear/level word
pub const PINS_PER_BANK: u8 = 32;

/// Locate the function-select field of `pin`: the word holding it and the
/// shift of its lowest bit.
///
/// Pin 12 lives in GPFSEL1 at bits 6-8.
pub const fn fsel_field(pin: u8) -> (WordOffset, u32) {
    let word = regs::GPFSEL0.offset_by((pin / PINS_PER_FSEL) as usize);
    let shift = (pin % PINS_PER_FSEL) as u32 * FSEL_BITS;
    (word, shift)
}

/// Locate `pin` in a banked one-bit-per-pin register starting at `bank0`.
/// Returns the word and the single-bit mask to write or test.
pub const fn bank_bit(bank0: WordOffset, pin: u8) -> (WordOffset, u32) {
    let word = bank0.offset_by((pin / PINS_PER_BANK) as usize);
    let mask = 1 << (pin % PINS_PER_BANK);
    (word, mask)
}

/// 32-bit word access to a GPIO register block.
///
/// Implementations decide what a word is backed by: the mapped peripheral
/// ([`Mapping`](crate::Mapping)) or plain memory ([`SimulatedRegisters`]).
pub trait RegisterBlock {
    /// Read one register
    fn read(&self, offset: WordOffset) -> u32;

    /// Write one register
    fn write(&mut self, offset: WordOffset, value: u32);

    /// Read-modify-write one register. Not atomic with respect to other
    /// writers of the same word.
    fn modify<F>(&mut self, offset: WordOffset, f: F)
    where
        F: FnOnce(u32) -> u32,
        Self: Sized,
    {
        let value = self.read(offset);
        self.write(offset, f(value));
    }
}

impl<R: RegisterBlock + ?Sized> RegisterBlock for Box<R> {
    fn read(&self, offset: WordOffset) -> u32 {
        (**self).read(offset)
    }

    fn write(&mut self, offset: WordOffset, value: u32) {
        (**self).write(offset, value)
    }
}

const SIM_WORDS: usize = MIN_BLOCK_LEN / 4;

/// In-memory register block with output loopback.
///
/// Writes to GPSET/GPCLR drive the matching GPLEV bits the way an output
/// pin wired back to itself would. GPSET and GPCLR read back as zero, and
/// writes to GPLEV are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedRegisters {
    words: [u32; SIM_WORDS],
}

impl SimulatedRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive a pin's level from outside, as an input signal would
    pub fn drive_level(&mut self, pin: u8, high: bool) {
        let (word, mask) = bank_bit(regs::GPLEV0, pin);
        if let Some(level) = self.words.get_mut(word.index()) {
            if high {
                *level |= mask;
            } else {
                *level &= !mask;
            }
        }
    }

    /// Raw word, including write-only registers
    pub fn word(&self, offset: WordOffset) -> u32 {
        self.words.get(offset.index()).copied().unwrap_or(0)
    }

    fn level_word(offset: WordOffset, bank0: WordOffset) -> WordOffset {
        regs::GPLEV0.offset_by(offset.index() - bank0.index())
    }
}

impl RegisterBlock for SimulatedRegisters {
    fn read(&self, offset: WordOffset) -> u32 {
        match offset {
            regs::GPSET0 | regs::GPSET1 | regs::GPCLR0 | regs::GPCLR1 => 0,
            _ => self.word(offset),
        }
    }

    fn write(&mut self, offset: WordOffset, value: u32) {
        match offset {
            regs::GPSET0 | regs::GPSET1 => {
                let level = Self::level_word(offset, regs::GPSET0);
                self.words[level.index()] |= value;
            }
            regs::GPCLR0 | regs::GPCLR1 => {
                let level = Self::level_word(offset, regs::GPCLR0);
                self.words[level.index()] &= !value;
            }
            regs::GPLEV0 | regs::GPLEV1 => {}
            _ => {
                if let Some(word) = self.words.get_mut(offset.index()) {
                    *word = value;
                }
            }
        }
    }
}
