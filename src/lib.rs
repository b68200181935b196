//! A cycle-accurate emulation core for the Nintendo Entertainment System.
//!
//! Contains the entire state of the machine and advances it one CPU cycle at a time,
//! clocking the PPU three dots and the APU once for every cycle the CPU spends on the bus.
//! The picture is exposed as a 256x240 RGB framebuffer and the audio as a queue of
//! resampled `f32` samples.
//! ```
//! use famicore::{Button, Nes};
//! // A console with no cartridge inserted does nothing when stepped
//! let mut nes = Nes::new();
//! assert_eq!(nes.step_frame(), 0);
//! // Loading garbage is rejected and leaves the console empty
//! assert!(nes.load_rom(&[0x00; 16]).is_err());
//! assert!(!nes.is_loaded());
//! // Buttons can be pressed regardless
//! nes.set_button(0, Button::Start, true);
//! assert_eq!(nes.framebuffer().len(), 256 * 240 * 3);
//! ```
mod apu;
pub use apu::Apu;
mod cartridge;
pub use cartridge::*;
mod controller;
pub use controller::{Button, Controller};
mod cpu;
pub use cpu::Cpu;
pub mod debug;
mod error;
pub use error::LoadError;
mod nes;
pub use nes::{InstructionRecord, Nes};
pub mod opcodes;
mod palette;
pub use palette::{DEBUG_PALETTE, HV_TO_RGB};
mod ppu;
pub use ppu::Ppu;
mod settings;
pub use settings::Settings;
mod status_register;
pub use status_register::StatusRegister;

/// The clock speed of an NTSC NES's CPU, in hertz.
pub const CPU_CLOCK_SPEED: u32 = 1_789_773;
/// The location of the IRQ/BRK interrupt vector.
pub const IRQ_VECTOR_ADDR: usize = 0xFFFE;
/// The location of the reset interrupt vector.
pub const RESET_VECTOR_ADDR: usize = 0xFFFC;
/// The location of the non-maskable interrupt's vector.
pub const NMI_VECTOR_ADDR: usize = 0xFFFA;
/// Width of the picture, in pixels.
pub const SCREEN_WIDTH: usize = 256;
/// Height of the picture, in pixels.
pub const SCREEN_HEIGHT: usize = 240;
