use serde::{Deserialize, Serialize};

/// A button on a standard controller.
///
/// The discriminant is the button's position in the controller's shift register,
/// i.e. the order the buttons are reported in when reading `$4016`/`$4017`.
/// This is also the index taken by [Nes::press_button][crate::Nes::press_button]:
///
/// | Index | 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 |
/// | --- | --- | --- | --- | --- | --- | --- | --- | --- |
/// | Button | A | B | Select | Start | Up | Down | Left | Right |
///
/// Frontends with their own numbering (e.g. Select and Start first) need to map onto this.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Button {
    A = 0,
    B = 1,
    Select = 2,
    Start = 3,
    Up = 4,
    Down = 5,
    Left = 6,
    Right = 7,
}

impl Button {
    /// Every button, in shift register order
    pub const ALL: [Button; 8] = [
        Button::A,
        Button::B,
        Button::Select,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
    ];
    /// Get a button from its shift register index.
    /// ```
    /// use famicore::Button;
    /// assert_eq!(Button::from_index(3), Some(Button::Start));
    /// assert_eq!(Button::from_index(8), None);
    /// ```
    pub fn from_index(index: usize) -> Option<Button> {
        Button::ALL.get(index).copied()
    }
}

/// An NES controller
///
/// Holds the state of the buttons as well as the shift register the CPU reads them through.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct Controller {
    pub up: bool,
    pub left: bool,
    pub right: bool,
    pub down: bool,
    pub start: bool,
    pub select: bool,
    pub a: bool,
    pub b: bool,
    // Buttons latched at the last strobe, shifted out one bit per read
    shift: u8,
    strobe: bool,
}

impl Controller {
    pub fn new() -> Controller {
        Controller::default()
    }
    pub fn set(&mut self, button: Button, pressed: bool) {
        match button {
            Button::A => self.a = pressed,
            Button::B => self.b = pressed,
            Button::Select => self.select = pressed,
            Button::Start => self.start = pressed,
            Button::Up => self.up = pressed,
            Button::Down => self.down = pressed,
            Button::Left => self.left = pressed,
            Button::Right => self.right = pressed,
        }
    }
    pub fn is_pressed(&self, button: Button) -> bool {
        match button {
            Button::A => self.a,
            Button::B => self.b,
            Button::Select => self.select,
            Button::Start => self.start,
            Button::Up => self.up,
            Button::Down => self.down,
            Button::Left => self.left,
            Button::Right => self.right,
        }
    }
    /// The buttons as a byte, with bit `n` set if the button with index `n` is pressed
    pub fn to_byte(&self) -> u8 {
        Button::ALL
            .iter()
            .filter(|b| self.is_pressed(**b))
            .fold(0, |acc, b| acc | (1 << *b as u8))
    }
    /// Handle a write to `$4016`. While bit 0 is set the shift register keeps reloading.
    pub fn write_strobe(&mut self, value: u8) {
        self.strobe = (value & 0x01) != 0;
        if self.strobe {
            self.shift = self.to_byte();
        }
    }
    /// Read the next button, as bit 0.
    ///
    /// After all 8 buttons have been read, official controllers report 1.
    pub fn read_bit(&mut self) -> u8 {
        if self.strobe {
            return self.a as u8;
        }
        let bit = self.shift & 0x01;
        self.shift = (self.shift >> 1) | 0x80;
        bit
    }
    /// The bit the next read will return, without shifting
    pub fn peek_bit(&self) -> u8 {
        if self.strobe {
            self.a as u8
        } else {
            self.shift & 0x01
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_order() {
        let mut c = Controller::new();
        c.set(Button::A, true);
        c.set(Button::Start, true);
        c.set(Button::Right, true);
        c.write_strobe(1);
        c.write_strobe(0);
        let bits: Vec<u8> = (0..10).map(|_| c.read_bit()).collect();
        assert_eq!(bits, vec![1, 0, 0, 1, 0, 0, 0, 1, 1, 1]);
    }
    #[test]
    fn test_strobe_high_returns_a() {
        let mut c = Controller::new();
        c.write_strobe(1);
        c.set(Button::A, true);
        assert_eq!(c.read_bit(), 1);
        assert_eq!(c.read_bit(), 1);
        c.set(Button::A, false);
        assert_eq!(c.read_bit(), 0);
    }
    #[test]
    fn test_not_latched_until_strobe() {
        let mut c = Controller::new();
        c.write_strobe(1);
        c.write_strobe(0);
        c.set(Button::A, true);
        assert_eq!(c.peek_bit(), 0);
        assert_eq!(c.read_bit(), 0);
    }
}
