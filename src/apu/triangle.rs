use serde::{Deserialize, Serialize};

use super::length_counter::LengthCounter;
use std::fmt::Debug;

#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct TriangleRegister {
    pub length_counter: LengthCounter,
    pub linear_counter: u8,
    // Linear counter reload value
    pub linear_counter_reload: u8,
    pub reload_flag: bool,
    pub timer_reload: u16,
    pub timer: u16,
    pub enabled: bool,
    // Position in the 32 step waveform
    pub sequencer: u8,
}

impl Debug for TriangleRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "on={} timer={:3X} length=[{:?}] linear={:X}",
            self.enabled, self.timer_reload, self.length_counter, self.linear_counter
        )
    }
}

impl TriangleRegister {
    pub fn write(&mut self, register: usize, value: u8) {
        match register {
            0 => {
                // Also the linear counter's control flag
                self.length_counter.halt = (value & 0x80) != 0;
                self.linear_counter_reload = value & 0x7F;
            }
            2 => self.timer_reload = (self.timer_reload & 0x700) | value as u16,
            3 => {
                self.timer_reload = (self.timer_reload & 0x0FF) | ((value as u16 & 0x07) << 8);
                if self.enabled {
                    self.length_counter.reload(value);
                }
                self.reload_flag = true;
            }
            _ => {}
        }
    }
    /// Clock the timer, every CPU cycle.
    /// The waveform only advances while both counters are non zero.
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_reload;
            if self.linear_counter > 0 && !self.length_counter.muted() {
                self.sequencer = (self.sequencer + 1) % 32;
            }
        } else {
            self.timer -= 1;
        }
    }
    pub fn clock_linear_counter(&mut self) {
        if self.reload_flag {
            self.linear_counter = self.linear_counter_reload;
        } else if self.linear_counter > 0 {
            self.linear_counter -= 1;
        }
        if !self.length_counter.halt {
            self.reload_flag = false;
        }
    }
    /// Output level. Holds its last level when silenced instead of dropping to 0.
    pub fn value(&self) -> u8 {
        if self.sequencer < 16 {
            15 - self.sequencer
        } else {
            self.sequencer - 16
        }
    }
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !self.enabled {
            self.length_counter.silence();
        }
    }
}
