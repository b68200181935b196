use std::fmt::Debug;

use serde::{Deserialize, Serialize};

const CARRY: u8 = 0x01;
const ZERO: u8 = 0x02;
const IRQ_DISABLE: u8 = 0x04;
const DECIMAL: u8 = 0x08;
const BREAK: u8 = 0x10;
const UNUSED: u8 = 0x20;
const OVERFLOW: u8 = 0x40;
const NEGATIVE: u8 = 0x80;

/// The status register of the 6502.
///
/// The B flag is not stored here; it only exists on the copy of the register pushed to the stack,
/// see [StatusRegister::to_stack_byte].
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRegister {
    /// The carry flag, also known as the unsigned overflow flag
    pub c: bool,
    /// The zero flag
    pub z: bool,
    /// The interrupt disable flag, masks IRQs but never NMIs
    pub i: bool,
    /// The decimal mode flag (stored but ignored by the NES's 2A03)
    pub d: bool,
    /// The (signed) overflow flag
    pub v: bool,
    /// The negative flag
    pub n: bool,
}

impl Default for StatusRegister {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusRegister {
    /// Create a new StatusRegister in its power-up state, with only `I` set.
    pub fn new() -> StatusRegister {
        StatusRegister {
            c: false,
            z: false,
            i: true,
            d: false,
            v: false,
            n: false,
        }
    }
    /// Get the status register as a single byte.
    ///
    /// The unused bit 5 is always set and the B bit (bit 4) is always clear.
    /// ```
    /// let mut s = famicore::StatusRegister::new();
    /// s.z = true;
    /// s.d = true;
    /// s.i = false;
    /// assert_eq!(s.to_byte(), 0b00101010);
    /// s.n = true;
    /// s.v = true;
    /// assert_eq!(s.to_byte(), 0b11101010);
    /// ```
    pub fn to_byte(&self) -> u8 {
        [
            (self.c, CARRY),
            (self.z, ZERO),
            (self.i, IRQ_DISABLE),
            (self.d, DECIMAL),
            (self.v, OVERFLOW),
            (self.n, NEGATIVE),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(UNUSED, |b, (_, mask)| b | mask)
    }
    /// Get the byte pushed to the stack.
    ///
    /// `brk` is `true` for BRK and PHP, which set the B bit, and `false` for IRQ and NMI.
    /// ```
    /// let s = famicore::StatusRegister::new();
    /// assert_eq!(s.to_stack_byte(true), 0x34);
    /// assert_eq!(s.to_stack_byte(false), 0x24);
    /// ```
    pub fn to_stack_byte(&self, brk: bool) -> u8 {
        self.to_byte() | if brk { BREAK } else { 0 }
    }
    /// Set the status register from a given byte that contains one bit per flag.
    ///
    /// Bits 4 and 5 are ignored.
    /// ```
    /// let mut s = famicore::StatusRegister::new();
    /// s.from_byte(0b11001010);
    /// assert_eq!(s.n, true);
    /// assert_eq!(s.v, true);
    /// assert_eq!(s.d, true);
    /// assert_eq!(s.z, true);
    /// assert_eq!(s.i, false);
    /// ```
    pub fn from_byte(&mut self, byte: u8) {
        let flag = |mask: u8| byte & mask != 0;
        self.c = flag(CARRY);
        self.z = flag(ZERO);
        self.i = flag(IRQ_DISABLE);
        self.d = flag(DECIMAL);
        self.v = flag(OVERFLOW);
        self.n = flag(NEGATIVE);
    }
}

impl Debug for StatusRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        macro_rules! format_flag {
            ($flag: ident, $name: literal) => {
                if self.$flag {
                    $name
                } else {
                    "-"
                }
            };
        }
        write!(
            f,
            "{}{}--{}{}{}{}",
            format_flag!(n, "N"),
            format_flag!(v, "V"),
            format_flag!(d, "D"),
            format_flag!(i, "I"),
            format_flag!(z, "Z"),
            format_flag!(c, "C")
        )
    }
}
