#![allow(dead_code)]
use famicore::Nes;

pub const RESET_ADDR: u16 = 0xC000;
pub const NMI_ADDR: u16 = 0xC100;
pub const IRQ_ADDR: u16 = 0xC200;

/// Builds iNES images in memory.
///
/// PRG is laid out so the last 32KB is visible at `$8000-$FFFF` on every supported mapper at
/// power on. By default the reset handler is an infinite loop and both interrupt handlers
/// are a single `RTI`.
pub struct RomBuilder {
    mapper: u8,
    battery: bool,
    vertical: bool,
    prg: Vec<u8>,
    chr: Vec<u8>,
}

impl Default for RomBuilder {
    fn default() -> Self {
        RomBuilder::new()
    }
}

impl RomBuilder {
    pub fn new() -> RomBuilder {
        RomBuilder {
            mapper: 0,
            battery: false,
            vertical: false,
            prg: vec![0xEA; 2 * 0x4000],
            chr: vec![0; 0x2000],
        }
        // JMP $C000
        .code(RESET_ADDR, &[0x4C, 0x00, 0xC0])
        .code(NMI_ADDR, &[0x40])
        .code(IRQ_ADDR, &[0x40])
    }
    pub fn mapper(mut self, mapper: u8) -> Self {
        self.mapper = mapper;
        self
    }
    pub fn battery(mut self) -> Self {
        self.battery = true;
        self
    }
    pub fn vertical_mirroring(mut self) -> Self {
        self.vertical = true;
        self
    }
    /// Set the number of 16KB PRG banks, keeping the code in the last 32KB
    pub fn prg_banks(mut self, banks: usize) -> Self {
        let last = self.prg.split_off(self.prg.len() - 0x8000);
        self.prg = [vec![0xEA; banks * 0x4000 - 0x8000], last].concat();
        self
    }
    /// Set the number of 8KB CHR banks, 0 for CHR RAM
    pub fn chr_banks(mut self, banks: usize) -> Self {
        self.chr.resize(banks * 0x2000, 0);
        self
    }
    /// Place bytes at an address in `$8000-$FFFF`
    pub fn code(mut self, addr: u16, bytes: &[u8]) -> Self {
        let offset = self.prg.len() - 0x8000 + (addr as usize - 0x8000);
        self.prg[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }
    /// Place bytes in CHR ROM
    pub fn chr(mut self, addr: usize, bytes: &[u8]) -> Self {
        self.chr[addr..addr + bytes.len()].copy_from_slice(bytes);
        self
    }
    pub fn build(self) -> Vec<u8> {
        let vectors = [NMI_ADDR, RESET_ADDR, IRQ_ADDR]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect::<Vec<u8>>();
        let rom = self.code(0xFFFA, &vectors);
        let header = [
            b'N',
            b'E',
            b'S',
            0x1A,
            (rom.prg.len() / 0x4000) as u8,
            (rom.chr.len() / 0x2000) as u8,
            ((rom.mapper & 0x0F) << 4) | ((rom.battery as u8) << 1) | (rom.vertical as u8),
            rom.mapper & 0xF0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
            0,
        ];
        [&header[..], &rom.prg, &rom.chr].concat()
    }
}

/// A console running the code given at the reset vector
pub fn nes_with_code(code: &[u8]) -> Nes {
    let rom = RomBuilder::new().code(RESET_ADDR, code).build();
    match Nes::from_rom(&rom) {
        Ok(nes) => nes,
        Err(e) => panic!("Test ROM rejected: {}", e),
    }
}

/// Execute a single instruction from RAM at `$0300`, returning the cycles it took
pub fn run_in_ram(nes: &mut Nes, instruction: &[u8]) -> u32 {
    nes.mem[0x300..0x300 + instruction.len()].copy_from_slice(instruction);
    nes.cpu.p_c = 0x0300;
    nes.step()
}

/// Write bytes into PPU memory through `$2006`/`$2007`, outside of rendering
pub fn write_vram(nes: &mut Nes, addr: u16, bytes: &[u8]) {
    nes.write_byte(0x2006, (addr >> 8) as u8);
    nes.write_byte(0x2006, addr as u8);
    bytes.iter().for_each(|b| nes.write_byte(0x2007, *b));
}

/// Point the PPU at the top left of the first nametable
pub fn reset_scroll(nes: &mut Nes) {
    nes.write_byte(0x2000, nes.ppu.ctrl & 0xFC);
    nes.write_byte(0x2005, 0);
    nes.write_byte(0x2005, 0);
}

// Advance the NES a certain number of frames
#[macro_export]
macro_rules! advance_nes_frames {
    ($nes: ident, $frames: expr) => {{
        (0..($frames)).for_each(|_| {
            $nes.step_frame();
        });
    }};
}

#[macro_export]
macro_rules! press_button {
    ($nes: ident, $player_number: literal, $button: ident) => {
        $nes.set_button($player_number, famicore::Button::$button, true);
    };
}
#[macro_export]
macro_rules! release_button {
    ($nes: ident, $player_number: literal, $button: ident) => {
        $nes.set_button($player_number, famicore::Button::$button, false);
    };
}

/// Hash of the current framebuffer
#[macro_export]
macro_rules! frame_hash {
    ($nes: ident) => {{
        use std::hash::{DefaultHasher, Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        $nes.framebuffer().hash(&mut hasher);
        hasher.finish()
    }};
}
