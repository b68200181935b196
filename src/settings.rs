use serde::{Deserialize, Serialize};

/// Settings for how to run the emulator.
///
/// Contain fields that change the visual and audio output.
/// None of them change what the emulated game sees, so two consoles with the same ROM, seed and
/// input stay in lockstep regardless of the other fields.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Rate of the audio stream returned by [Nes::take_audio_samples][crate::Nes::take_audio_samples], in hertz.
    pub sample_rate: u32,
    /// Seed for the pattern CPU RAM holds at power up.
    pub power_up_seed: u64,
    /// Debugging palette override, assigns each palette a unique colour to quickly show which tiles are using which palettes.
    pub use_debug_palette: bool,
    /// Whether to always draw sprites on top of the background
    pub always_sprites_on_top: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sample_rate: 44_100,
            power_up_seed: 0x6502_2C02_2A03,
            use_debug_palette: false,
            always_sprites_on_top: false,
        }
    }
}
