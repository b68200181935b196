mod bus;
mod execute;

use std::{collections::VecDeque, fmt::Display};

use log::*;
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::{
    debug::{CpuSnapshot, DebugSnapshot, PpuSnapshot},
    opcodes::format_opcode,
    Apu, Button, Cartridge, Controller, Cpu, LoadError, Mapper, Ppu, Settings,
};

const NUMBER_STORED_INSTRUCTIONS: usize = 64;

/// An instruction the CPU executed, kept for post-mortem debugging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstructionRecord {
    /// Address of the opcode
    pub pc: u16,
    /// The opcode followed by its operands, unused trailing bytes are 0
    pub bytes: [u8; 3],
    /// Number of bytes the instruction occupies
    pub len: usize,
}

impl InstructionRecord {
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }
    pub fn operands(&self) -> &[u8] {
        &self.bytes[1..self.len.clamp(1, 3)]
    }
}

impl Display for InstructionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex = self.bytes[..self.len.clamp(1, 3)]
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<String>>()
            .join(" ");
        write!(
            f,
            "{:04X}  {:<8}  {}",
            self.pc,
            hex,
            format_opcode(self.opcode(), self.operands())
        )
    }
}

/// The NES.
///
/// The entire NES console.
/// Contains a [Cpu], [Ppu], and [Apu], and keeps them all synchronized by advancing them
/// together on every CPU bus cycle.
/// Also contains all of the memory on the console and the [Cartridge] currently inserted in the console.
/// ```
/// use famicore::Nes;
/// let mut nes = Nes::new();
/// nes.write_byte(0x0012, 0x34);
/// // RAM is mirrored every 0x800 bytes
/// assert_eq!(nes.peek_byte(0x0812), 0x34);
/// ```
pub struct Nes {
    /// CPU of the NES
    pub cpu: Cpu,
    /// PPU of the NES
    pub ppu: Ppu,
    /// APU of the NES
    pub apu: Apu,
    /// Memory of the NES
    pub mem: [u8; 0x800],
    /// Cartridge inserted in the NES
    pub cartridge: Cartridge,
    /// Player 1 and 2 controller states
    pub controllers: [Controller; 2],
    settings: Settings,
    // Whether a ROM has been loaded successfully
    loaded: bool,
    // Page written to $4014, copied into OAM once the current instruction finishes
    oam_dma_page: Option<u8>,
    in_oam_dma: bool,
    // Last value seen on the CPU's data bus
    open_bus: u8,
    recent_instructions: VecDeque<InstructionRecord>,
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

impl Nes {
    /// Create a console with no cartridge inserted.
    ///
    /// Stepping it does nothing until a ROM is loaded with [Nes::load_rom].
    pub fn new() -> Nes {
        Nes::with_settings(Settings::default())
    }
    pub fn with_settings(settings: Settings) -> Nes {
        Nes {
            cpu: Cpu::new(),
            ppu: Ppu::new(),
            apu: Apu::new(settings.sample_rate),
            mem: [0x00; 0x800],
            cartridge: Cartridge::blank(),
            controllers: [Controller::new(); 2],
            settings,
            loaded: false,
            oam_dma_page: None,
            in_oam_dma: false,
            open_bus: 0,
            recent_instructions: VecDeque::with_capacity(NUMBER_STORED_INSTRUCTIONS),
        }
    }
    /// Create a console and load a ROM into it.
    /// ```rust,ignore
    /// use famicore::Nes;
    /// let game = include_bytes!("my_game.nes");
    /// let nes = Nes::from_rom(game)?;
    /// ```
    pub fn from_rom(bytes: &[u8]) -> Result<Nes, LoadError> {
        let mut nes = Nes::new();
        nes.load_rom(bytes)?;
        Ok(nes)
    }
    /// Load an iNES image, replacing the current cartridge, and power the console on.
    ///
    /// CPU RAM is filled with a pattern derived from [Settings::power_up_seed].
    /// On failure the console is left with no cartridge inserted.
    pub fn load_rom(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        match Cartridge::from_ines(bytes) {
            Ok(cartridge) => {
                info!("Loaded cartridge: {}", cartridge);
                self.cartridge = cartridge;
                self.loaded = true;
                let mut rng = StdRng::seed_from_u64(self.settings.power_up_seed);
                rng.fill_bytes(&mut self.mem);
                self.restart();
                Ok(())
            }
            Err(e) => {
                warn!("Unable to load ROM: {}", e);
                self.cartridge = Cartridge::blank();
                self.loaded = false;
                Err(e)
            }
        }
    }
    /// Whether a ROM is loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
    /// Reset the NES.
    ///
    /// The CPU, PPU and APU go back to their power-up state and the CPU runs its reset sequence.
    /// CPU RAM, the cartridge's RAM and the mapper's registers are kept.
    pub fn reset(&mut self) {
        if !self.loaded {
            debug!("Ignoring reset, no cartridge loaded");
            return;
        }
        info!("Resetting");
        self.restart();
    }
    fn restart(&mut self) {
        self.cpu = Cpu::new();
        self.ppu = Ppu::new();
        self.apu = Apu::new(self.settings.sample_rate);
        self.oam_dma_page = None;
        self.in_oam_dma = false;
        self.open_bus = 0;
        self.recent_instructions.clear();
        self.reset_sequence();
        info!("Initialized PC to {:#06X}", self.cpu.p_c);
    }

    /// Run whole instructions until at least `cycles` CPU cycles have elapsed.
    ///
    /// Returns the number of cycles actually elapsed.
    pub fn step_cycles(&mut self, cycles: u32) -> u32 {
        if !self.loaded {
            debug!("Ignoring step, no cartridge loaded");
            return 0;
        }
        let mut elapsed = 0;
        while elapsed < cycles {
            elapsed += self.step();
        }
        elapsed
    }
    /// Advance the NES until the PPU enters the vertical blank of the next frame.
    ///
    /// Returns the number of CPU cycles elapsed, about 29780.
    pub fn step_frame(&mut self) -> u32 {
        if !self.loaded {
            debug!("Ignoring step, no cartridge loaded");
            return 0;
        }
        let frame = self.ppu.frame_count;
        let mut cycles = 0;
        while self.ppu.frame_count == frame {
            cycles += self.step();
        }
        cycles
    }
    /// Number of frames that have started since power on or the last reset
    pub fn frame_count(&self) -> u64 {
        self.ppu.frame_count
    }

    /// Press one of player 1's buttons given its index, see [Button].
    ///
    /// Indices are in shift register order, 0 to 7 for A, B, Select, Start, Up, Down, Left
    /// and Right. Indices above 7 are ignored.
    /// ```
    /// let mut nes = famicore::Nes::new();
    /// nes.press_button(3);
    /// assert!(nes.controllers[0].start);
    /// assert!(!nes.controllers[0].a);
    /// ```
    pub fn press_button(&mut self, button: usize) {
        if let Some(b) = Button::from_index(button) {
            self.controllers[0].set(b, true);
        }
    }
    /// Release one of player 1's buttons given its index, see [Button].
    pub fn release_button(&mut self, button: usize) {
        if let Some(b) = Button::from_index(button) {
            self.controllers[0].set(b, false);
        }
    }
    /// Set a button on either controller.
    ///
    /// * `player` 0 for player 1, 1 for player 2. Anything else is ignored.
    pub fn set_button(&mut self, player: usize, button: Button, pressed: bool) {
        match self.controllers.get_mut(player) {
            Some(c) => c.set(button, pressed),
            None => warn!("Ignoring input for controller {}", player),
        }
    }

    /// The current picture, as 256x240 RGB triplets in row major order.
    pub fn framebuffer(&self) -> &[u8] {
        self.ppu.framebuffer()
    }
    /// Drain the audio generated since the last call, as mono samples between 0 and 1
    /// at [Settings::sample_rate].
    pub fn take_audio_samples(&mut self) -> Vec<f32> {
        self.apu.take_samples()
    }

    pub fn has_battery_backed_ram(&self) -> bool {
        self.cartridge.has_battery_backed_ram()
    }
    /// Get the savedata of the game in the NES, if there is any.
    ///
    /// "Savedata" on the NES is just the cartridge's battery backed RAM.
    pub fn sram(&self) -> Option<&[u8]> {
        self.cartridge.sram()
    }
    /// Restore savedata, usually right after loading the ROM it belongs to.
    pub fn set_sram(&mut self, data: &[u8]) {
        self.cartridge.set_sram(data);
    }
    /// Whether the savedata has been written to since it was last marked as saved
    pub fn is_sram_dirty(&self) -> bool {
        self.cartridge.is_sram_dirty()
    }
    pub fn mark_sram_saved(&mut self) {
        self.cartridge.mark_sram_saved();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn set_settings(&mut self, settings: Settings) {
        self.apu.set_sample_rate(settings.sample_rate);
        self.settings = settings;
    }

    /// A copy of the CPU's registers.
    pub fn cpu_snapshot(&self) -> CpuSnapshot {
        CpuSnapshot::from(&self.cpu)
    }
    /// The mapper of the inserted cartridge, to inspect its bank registers.
    pub fn mapper(&self) -> &dyn Mapper {
        self.cartridge.mapper()
    }
    /// Encode the CPU registers, the PPU's registers and OAM, and the mapper's state
    /// as a postcard blob. See [DebugSnapshot].
    pub fn debug_snapshot(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(&DebugSnapshot {
            cpu: self.cpu_snapshot(),
            ppu: PpuSnapshot::from(&self.ppu),
            mapper: self.cartridge.mapper(),
        })
    }
    /// The last instructions executed, oldest first.
    pub fn recent_instructions(&self) -> &VecDeque<InstructionRecord> {
        &self.recent_instructions
    }
}
