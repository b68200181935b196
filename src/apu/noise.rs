use serde::{Deserialize, Serialize};

use super::{envelope::Envelope, length_counter::LengthCounter};
use std::fmt::Debug;

// Timer periods in CPU cycles
const NOISE_TIMER_PERIODS: [u16; 16] = [
    4, 8, 16, 32, 64, 96, 128, 160, 202, 254, 380, 508, 762, 1016, 2034, 4068,
];

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct NoiseRegister {
    pub length_counter: LengthCounter,
    pub enabled: bool,
    pub timer: u16,
    pub timer_reload: u16,
    pub envelope: Envelope,
    // Short mode, taps bit 6 instead of bit 1
    pub mode: bool,
    // This is actually 15 bits wide
    pub shift: u16,
}

impl Debug for NoiseRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "on={} timer={:3X} mode={} shift={:04X} length=[{:?}]",
            self.enabled, self.timer_reload, self.mode as u8, self.shift, self.length_counter
        )
    }
}

impl Default for NoiseRegister {
    fn default() -> Self {
        NoiseRegister {
            length_counter: LengthCounter::default(),
            enabled: false,
            timer: 0,
            timer_reload: NOISE_TIMER_PERIODS[0],
            envelope: Envelope::default(),
            mode: false,
            shift: 1,
        }
    }
}

impl NoiseRegister {
    pub fn write(&mut self, register: usize, value: u8) {
        match register {
            0 => {
                self.length_counter.halt = (value & 0x20) != 0;
                self.envelope.write(value);
            }
            2 => {
                self.mode = (value & 0x80) != 0;
                self.timer_reload = NOISE_TIMER_PERIODS[(value & 0x0F) as usize];
            }
            3 => {
                if self.enabled {
                    self.length_counter.reload(value);
                }
                self.envelope.start = true;
            }
            _ => {}
        }
    }
    /// Clock the timer, every CPU cycle
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_reload - 1;
            self.clock_shift();
        } else {
            self.timer -= 1;
        }
    }
    fn clock_shift(&mut self) {
        // XOR bit 0 with bit 6 in short mode and with bit 1 otherwise
        let feedback = (self.shift ^ (self.shift >> if self.mode { 6 } else { 1 })) & 0x01;
        self.shift = (self.shift >> 1) | (feedback << 14);
    }
    pub fn muted(&self) -> bool {
        !self.enabled || self.length_counter.muted() || self.shift & 0x01 == 1
    }
    pub fn value(&self) -> u8 {
        if self.muted() {
            0
        } else {
            self.envelope.value()
        }
    }
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !self.enabled {
            self.length_counter.silence();
        }
    }
}
