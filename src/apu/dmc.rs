use serde::{Deserialize, Serialize};
use std::fmt::Debug;

// Rates in CPU cycles
pub const DMC_RATES: [u16; 16] = [
    428, 380, 340, 320, 286, 254, 226, 214, 190, 160, 142, 128, 106, 84, 72, 54,
];

#[derive(Clone, Serialize, Deserialize)]
/// The DMC register of the NES.
///
/// A delta-modulation sound register in the NES.
/// Takes 1-bit delta encoded samples as input and outputs a value
/// between 0 and 127 to the APU's mixer.
/// Sample bytes are fetched from CPU memory by DMA, see [DmcRegister::dma_request].
pub struct DmcRegister {
    /// Whether the IRQ is enabled
    pub irq_enabled: bool,
    /// The IRQ flag
    pub irq_flag: bool,
    /// Whether to restart the sample after playing it
    pub looping: bool,
    /// Timer period, in CPU cycles
    pub rate: u16,
    pub timer: u16,
    /// Address of the sample, in CPU memory space
    pub sample_addr: u16,
    /// Length of the sample in bytes
    pub sample_len: u16,
    /// Address of the next byte to fetch
    pub current_addr: u16,
    /// Number of bytes remaining in the sample
    pub bytes_remaining: u16,
    /// Byte fetched by DMA, waiting to be moved into the shift register
    pub buffer: Option<u8>,
    /// Bits currently being played
    pub shift: u8,
    /// Number of bits left in the current output cycle
    pub bits_remaining: u8,
    /// The DMC silent flag, set when the buffer was empty at the start of an output cycle
    pub silent: bool,
    /// The current output of the DMC
    pub output: u8,
}

impl Debug for DmcRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bytes_remaining={:X} silent={} rate={:3X} loop={} sample_addr={:X} sample_len={:X} IRQ={}, output={}",
            self.bytes_remaining,
            self.silent,
            self.rate,
            self.looping,
            self.sample_addr,
            self.sample_len,
            self.irq_enabled,
            self.output
        )
    }
}

impl Default for DmcRegister {
    fn default() -> Self {
        DmcRegister {
            irq_enabled: false,
            irq_flag: false,
            looping: false,
            rate: DMC_RATES[0],
            timer: DMC_RATES[0] - 1,
            sample_addr: 0xC000,
            sample_len: 1,
            current_addr: 0xC000,
            bytes_remaining: 0,
            buffer: None,
            shift: 0,
            bits_remaining: 8,
            silent: true,
            output: 0,
        }
    }
}

impl DmcRegister {
    pub fn write(&mut self, register: usize, value: u8) {
        match register {
            0 => {
                self.irq_enabled = (value & 0x80) != 0;
                if !self.irq_enabled {
                    self.irq_flag = false;
                }
                self.looping = (value & 0x40) != 0;
                self.rate = DMC_RATES[(value & 0x0F) as usize];
            }
            1 => self.output = value & 0x7F,
            2 => self.sample_addr = 0xC000 + value as u16 * 64,
            _ => self.sample_len = value as u16 * 16 + 1,
        }
    }
    /// Enable or disable the DMC through `$4015`
    pub fn set_enabled(&mut self, enabled: bool) {
        self.irq_flag = false;
        if !enabled {
            self.bytes_remaining = 0;
        } else if self.bytes_remaining == 0 {
            self.restart();
        }
    }
    fn restart(&mut self) {
        self.current_addr = self.sample_addr;
        self.bytes_remaining = self.sample_len;
    }
    /// The address the DMC wants to fetch, if its buffer is empty and the sample isn't over
    pub fn dma_request(&self) -> Option<u16> {
        if self.buffer.is_none() && self.bytes_remaining > 0 {
            Some(self.current_addr)
        } else {
            None
        }
    }
    /// Hand the DMC the byte fetched for its last [DmcRegister::dma_request]
    pub fn fill_buffer(&mut self, value: u8) {
        self.buffer = Some(value);
        self.current_addr = if self.current_addr == 0xFFFF {
            0x8000
        } else {
            self.current_addr + 1
        };
        self.bytes_remaining = self.bytes_remaining.saturating_sub(1);
        if self.bytes_remaining == 0 {
            if self.looping {
                self.restart();
            } else if self.irq_enabled {
                self.irq_flag = true;
            }
        }
    }
    /// Clock the timer, every CPU cycle
    pub fn clock_timer(&mut self) {
        if self.timer > 0 {
            self.timer -= 1;
            return;
        }
        self.timer = self.rate - 1;
        if !self.silent {
            if (self.shift & 0x01) != 0 {
                if self.output <= 125 {
                    self.output += 2;
                }
            } else if self.output >= 2 {
                self.output -= 2;
            }
        }
        self.shift >>= 1;
        self.bits_remaining -= 1;
        if self.bits_remaining == 0 {
            self.bits_remaining = 8;
            match self.buffer.take() {
                Some(b) => {
                    self.shift = b;
                    self.silent = false;
                }
                None => self.silent = true,
            }
        }
    }
    pub fn value(&self) -> u8 {
        self.output
    }
}
