use std::fmt::Debug;

use serde::{Deserialize, Serialize};

// Indexed by the top 5 bits of $4003/$4007/$400B/$400F
const LENGTHS: [u8; 0x20] = [
    10, 254, 20, 2, 40, 4, 80, 6, 160, 8, 60, 10, 14, 12, 26, 14, 12, 16, 24, 18, 48, 20, 96, 22,
    192, 24, 72, 26, 16, 28, 32, 30,
];

/// Counts down on half frames and silences its channel once it reaches 0.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub struct LengthCounter {
    /// Freezes the count while set (shared with the envelope loop/linear control bit)
    pub halt: bool,
    pub value: u8,
}

impl LengthCounter {
    pub fn muted(&self) -> bool {
        self.value == 0
    }
    pub fn is_active(&self) -> bool {
        self.value > 0
    }
    /// Load from a channel's length register write
    pub fn reload(&mut self, register: u8) {
        self.value = LENGTHS[usize::from(register >> 3)];
    }
    /// Clear the count, when the channel is disabled through $4015
    pub fn silence(&mut self) {
        self.value = 0;
    }
    /// Half frame clock
    pub fn clock(&mut self) {
        if !self.halt {
            self.value = self.value.saturating_sub(1);
        }
    }
}

impl Debug for LengthCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LengthCounter({}{})", self.value, if self.halt { ", halted" } else { "" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_and_count_down() {
        let mut l = LengthCounter::default();
        assert!(l.muted());
        l.reload(0x18);
        assert_eq!(l.value, 2);
        l.clock();
        assert!(l.is_active());
        l.clock();
        assert!(l.muted());
        l.clock();
        assert_eq!(l.value, 0);
    }
    #[test]
    fn test_halt() {
        let mut l = LengthCounter::default();
        l.reload(0xF8);
        l.halt = true;
        (0..10).for_each(|_| l.clock());
        assert_eq!(l.value, 30);
        l.silence();
        assert!(l.muted());
    }
}
