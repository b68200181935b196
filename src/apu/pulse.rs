use serde::{Deserialize, Serialize};

use super::{envelope::Envelope, length_counter::LengthCounter};
use std::fmt::Debug;

const DUTY_CYCLES: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Which of the two pulse channels, they differ in how the sweep negates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PulseChannel {
    /// Negates using one's complement
    One,
    /// Negates using two's complement
    Two,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
/// The APU's pulse registers.
/// Outputs a pulse (rectangle) wave.
pub struct PulseRegister {
    pub channel: PulseChannel,
    /// The index of the duty to use
    pub duty: usize,
    /// Current value of the timer, counting down in APU cycles
    pub timer: u16,
    /// The amount to reload the timer with when it hits 0, i.e. the period
    pub timer_reload: u16,
    pub envelope: Envelope,
    pub length_counter: LengthCounter,
    pub sweep_enabled: bool,
    /// Sweep divider period
    pub sweep_period: u8,
    pub sweep_divider: u8,
    pub sweep_reload: bool,
    pub sweep_negate: bool,
    pub sweep_shift: u8,
    pub enabled: bool,
    // Index of the duty step currently being sent to the mixer
    pub sequencer: usize,
}

impl PulseRegister {
    pub fn new(channel: PulseChannel) -> PulseRegister {
        PulseRegister {
            channel,
            duty: 0,
            timer: 0,
            timer_reload: 0,
            envelope: Envelope::default(),
            length_counter: LengthCounter::default(),
            sweep_enabled: false,
            sweep_period: 0,
            sweep_divider: 0,
            sweep_reload: false,
            sweep_negate: false,
            sweep_shift: 0,
            enabled: false,
            sequencer: 0,
        }
    }
    /// Write one of the channel's 4 registers
    pub fn write(&mut self, register: usize, value: u8) {
        match register {
            0 => {
                self.duty = ((value & 0xC0) >> 6) as usize;
                self.length_counter.halt = (value & 0x20) != 0;
                self.envelope.write(value);
            }
            1 => {
                self.sweep_enabled = (value & 0x80) != 0;
                self.sweep_period = (value & 0x70) >> 4;
                self.sweep_negate = (value & 0x08) != 0;
                self.sweep_shift = value & 0x07;
                self.sweep_reload = true;
            }
            2 => {
                self.timer_reload = (self.timer_reload & 0x0700) | value as u16;
            }
            _ => {
                self.timer_reload = (self.timer_reload & 0x00FF) | ((value as u16 & 0x07) << 8);
                if self.enabled {
                    self.length_counter.reload(value);
                }
                self.envelope.start = true;
                self.sequencer = 0;
            }
        }
    }
    /// The period the sweep unit is moving towards
    pub fn target_period(&self) -> u16 {
        let change = self.timer_reload >> self.sweep_shift;
        if self.sweep_negate {
            match self.channel {
                PulseChannel::One => self.timer_reload.saturating_sub(change + 1),
                PulseChannel::Two => self.timer_reload.saturating_sub(change),
            }
        } else {
            self.timer_reload + change
        }
    }
    pub fn muted(&self) -> bool {
        !self.enabled
            || self.length_counter.muted()
            || self.timer_reload < 8
            || self.target_period() > 0x7FF
    }
    /// Clock the timer, every other CPU cycle
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_reload;
            self.sequencer = (self.sequencer + 1) % 8;
        } else {
            self.timer -= 1;
        }
    }
    /// Clock the sweep unit and length counter, on every half frame
    pub fn clock_half_frame(&mut self) {
        self.length_counter.clock();
        if self.sweep_divider == 0 && self.sweep_enabled && self.sweep_shift > 0 && !self.muted() {
            self.timer_reload = self.target_period();
        }
        if self.sweep_divider == 0 || self.sweep_reload {
            self.sweep_divider = self.sweep_period;
            self.sweep_reload = false;
        } else {
            self.sweep_divider -= 1;
        }
    }
    pub fn value(&self) -> u8 {
        if self.muted() || DUTY_CYCLES[self.duty][self.sequencer] == 0 {
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

impl Debug for PulseRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "on={} timer={:3X} target_period={:X} divider={:X} duty={:X} length=[{:?}] sweep=[on={} shift={:X}]",
            self.enabled,
            self.timer_reload,
            self.target_period(),
            self.sweep_divider,
            self.duty,
            self.length_counter,
            self.sweep_enabled,
            self.sweep_shift
        )
    }
}
