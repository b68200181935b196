use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Default, Debug, Serialize, Deserialize)]
/// An envelope generator unit.
/// Controls the volume of the APU's pulse and noise units.
/// See [the NESDEV wiki](https://www.nesdev.org/wiki/APU_Envelope)
pub struct Envelope {
    /// Constant volume flag
    pub constant: bool,
    /// Volume value (either the volume or the divider reload value)
    pub volume: u8,
    /// Set by writing the channel's length register, restarts the decay on the next clock
    pub start: bool,
    /// Current value of the volume divider
    pub divider: u8,
    /// Current value of the volume decay
    pub decay: u8,
}

impl Envelope {
    /// Set from the low 5 bits of a channel's first register
    pub fn write(&mut self, value: u8) {
        self.constant = (value & 0x10) != 0;
        self.volume = value & 0x0F;
    }
    /// Clock the envelope unit, on every quarter frame
    pub fn clock(&mut self, looping: bool) {
        if self.start {
            self.start = false;
            self.decay = 0x0F;
            self.divider = self.volume;
            return;
        }
        if self.divider == 0 {
            self.divider = self.volume;
            if self.decay > 0 {
                self.decay -= 1;
            } else if looping {
                self.decay = 0x0F;
            }
        } else {
            self.divider -= 1;
        }
    }
    /// Get the current output of the unit
    pub fn value(&self) -> u8 {
        if self.constant {
            self.volume
        } else {
            self.decay
        }
    }
}
