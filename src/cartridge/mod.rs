mod mapper;
pub use mapper::{bank_addr, get_mapper, num_banks, Mapper};
pub mod mappers;

use crate::LoadError;
use log::*;
use serde::{Deserialize, Serialize};
use std::{
    cmp::max,
    fmt::{Debug, Display},
};

/// How the four logical nametables at `$2000-$2FFF` map onto physical nametable RAM.
///
/// Follows the usual naming: [Mirroring::Vertical] means `$2000` and `$2800` show the same
/// screen (horizontal scrolling games), [Mirroring::Horizontal] means `$2000` and `$2400` do.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    /// All four nametables show the first kilobyte
    SingleScreenLower,
    /// All four nametables show the second kilobyte
    SingleScreenUpper,
    /// Four distinct nametables, using the extra RAM on the cartridge
    FourScreen,
}

impl Mirroring {
    /// Transform a nametable address (`$2000-$3EFF`) into an index into the PPU's nametable RAM.
    ///
    /// ```
    /// use famicore::Mirroring;
    /// assert_eq!(Mirroring::Vertical.nametable_index(0x2801), 0x001);
    /// assert_eq!(Mirroring::Horizontal.nametable_index(0x2801), 0x401);
    /// assert_eq!(Mirroring::SingleScreenUpper.nametable_index(0x2000), 0x400);
    /// assert_eq!(Mirroring::FourScreen.nametable_index(0x2C00), 0xC00);
    /// ```
    pub fn nametable_index(&self, addr: usize) -> usize {
        let table = (addr >> 10) & 0x03;
        let offset = addr & 0x3FF;
        let physical = match self {
            Mirroring::Horizontal => table / 2,
            Mirroring::Vertical => table % 2,
            Mirroring::SingleScreenLower => 0,
            Mirroring::SingleScreenUpper => 1,
            Mirroring::FourScreen => table,
        };
        physical * 0x400 + offset
    }
}

/// The ROM and RAM on a cartridge board.
///
/// Bank registers and IRQ counters live in the [Mapper], which indexes into these.
#[derive(Clone, Serialize, Deserialize)]
pub struct CartridgeMemory {
    /// Program RAM (PRG RAM) of the cartridge, battery backed if the header says so
    pub prg_ram: Vec<u8>,
    pub prg_rom: Vec<u8>,
    /// Empty when the board has CHR ROM
    pub chr_ram: Vec<u8>,
    pub chr_rom: Vec<u8>,
    /// Mirroring read from the header.
    /// May be overridden by the mapper, use [Mapper::mirroring] to get the mirroring currently in use
    pub mirroring: Mirroring,
}

impl CartridgeMemory {
    pub fn read_prg_rom(&self, addr: usize) -> u8 {
        self.prg_rom[addr % self.prg_rom.len()]
    }
    pub fn read_prg_ram(&self, addr: usize) -> Option<u8> {
        if self.prg_ram.is_empty() {
            return None;
        }
        Some(self.prg_ram[addr % self.prg_ram.len()])
    }
    pub fn write_prg_ram(&mut self, addr: usize, value: u8) {
        if !self.prg_ram.is_empty() {
            let i = addr % self.prg_ram.len();
            self.prg_ram[i] = value;
        }
    }
    /// Read pattern data, from CHR RAM on boards without CHR ROM
    pub fn read_chr(&self, addr: usize) -> u8 {
        if self.chr_rom.is_empty() {
            self.chr_ram[addr % self.chr_ram.len()]
        } else {
            self.chr_rom[addr % self.chr_rom.len()]
        }
    }
    /// Writes to CHR ROM are dropped
    pub fn write_chr(&mut self, addr: usize, value: u8) {
        if !self.chr_ram.is_empty() {
            let i = addr % self.chr_ram.len();
            self.chr_ram[i] = value;
        }
    }
}

/// A loaded game: its memory plus the mapper hardware.
///
/// Both buses go through [Mapper] to reach [CartridgeMemory].
pub struct Cartridge {
    pub memory: CartridgeMemory,
    mapper: Box<dyn Mapper>,
    has_battery_ram: bool,
    // Set on every write to $6000-$7FFF of a battery backed cartridge
    sram_dirty: bool,
}

const HEADER_SIZE: usize = 16;
const TRAINER_SIZE: usize = 512;
const PRG_ROM_BANK: usize = 0x4000;
const CHR_ROM_BANK: usize = 0x2000;

impl Cartridge {
    /// Create a new cartridge from the contents of an iNES or NES 2.0 (.nes) file.
    ///
    /// Fails if the magic bytes are missing, the mapper is not supported or the file is shorter than
    /// its header declares.
    pub fn from_ines(bytes: &[u8]) -> Result<Cartridge, LoadError> {
        if bytes.len() < HEADER_SIZE {
            return Err(LoadError::Truncated {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        if bytes[0..4] != [b'N', b'E', b'S', 0x1A] {
            return Err(LoadError::InvalidMagic);
        }
        debug!("Cartridge header: {:X?}", &bytes[0..HEADER_SIZE]);
        let flags_6 = bytes[6];
        let flags_7 = bytes[7];
        let is_nes_2 = flags_7 & 0x0C == 0x08;
        // DiskDude! and friends wrote garbage into the end of the header
        let is_archaic =
            flags_7 & 0x0C == 0x04 || (flags_7 & 0x0C == 0x00 && bytes[12..16].iter().any(|b| *b != 0));
        debug!(
            "Detected header format: {}",
            if is_nes_2 {
                "NES 2.0"
            } else if is_archaic {
                "archaic iNES"
            } else {
                "iNES"
            }
        );

        let prg_rom_size = if is_nes_2 {
            rom_size(bytes[4], bytes[9] & 0x0F, PRG_ROM_BANK)
        } else {
            bytes[4] as usize * PRG_ROM_BANK
        };
        let chr_rom_size = if is_nes_2 {
            rom_size(bytes[5], bytes[9] >> 4, CHR_ROM_BANK)
        } else {
            bytes[5] as usize * CHR_ROM_BANK
        };
        if prg_rom_size == 0 {
            return Err(LoadError::MissingPrgRom);
        }

        let mut mapper_num = (flags_6 >> 4) as u16;
        if !is_archaic {
            mapper_num |= (flags_7 & 0xF0) as u16;
        }
        if is_nes_2 {
            mapper_num |= ((bytes[8] & 0x0F) as u16) << 8;
        }

        let has_battery_ram = (flags_6 & 0x02) != 0;
        let has_trainer = (flags_6 & 0x04) != 0;
        let mirroring = if (flags_6 & 0x08) != 0 {
            Mirroring::FourScreen
        } else if (flags_6 & 0x01) != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        let prg_start = HEADER_SIZE + if has_trainer { TRAINER_SIZE } else { 0 };
        let chr_start = prg_start.saturating_add(prg_rom_size);
        let total_size = chr_start.saturating_add(chr_rom_size);
        if bytes.len() < total_size {
            return Err(LoadError::Truncated {
                expected: total_size,
                actual: bytes.len(),
            });
        }
        let mapper = get_mapper(mapper_num)?;

        let (prg_ram_size, chr_ram_size) = if is_nes_2 {
            // Shift counts, 0 means none
            let shifted = |n: u8| if n == 0 { 0 } else { 64 << n };
            (
                max(
                    0x2000,
                    shifted(bytes[10] & 0x0F).max(shifted(bytes[10] >> 4)),
                ),
                if chr_rom_size == 0 {
                    max(0x2000, shifted(bytes[11] & 0x0F).max(shifted(bytes[11] >> 4)))
                } else {
                    0
                },
            )
        } else {
            (0x2000, if chr_rom_size == 0 { 0x2000 } else { 0 })
        };

        let mut prg_ram = vec![0; prg_ram_size];
        if has_trainer {
            // Trainer is mapped to $7000-$71FF
            prg_ram[0x1000..0x1000 + TRAINER_SIZE]
                .copy_from_slice(&bytes[HEADER_SIZE..HEADER_SIZE + TRAINER_SIZE]);
        }
        if bytes.len() > total_size {
            debug!("Ignoring {} trailing bytes", bytes.len() - total_size);
        }
        info!(
            "Loaded {} cartridge (mapper {}): {:#X} bytes PRG ROM, {:#X} bytes CHR ROM, {:#X} bytes CHR RAM, {:?} mirroring{}",
            mapper,
            mapper_num,
            prg_rom_size,
            chr_rom_size,
            chr_ram_size,
            mirroring,
            if has_battery_ram { ", battery backed" } else { "" }
        );

        Ok(Cartridge {
            memory: CartridgeMemory {
                prg_rom: bytes[prg_start..chr_start].to_vec(),
                chr_rom: bytes[chr_start..total_size].to_vec(),
                prg_ram,
                chr_ram: vec![0; chr_ram_size],
                mirroring,
            },
            mapper,
            has_battery_ram,
            sram_dirty: false,
        })
    }
    /// An empty NROM cartridge, standing in while no game is loaded.
    pub fn blank() -> Cartridge {
        Cartridge {
            memory: CartridgeMemory {
                prg_rom: vec![0; PRG_ROM_BANK],
                chr_rom: Vec::new(),
                prg_ram: vec![0; 0x2000],
                chr_ram: vec![0; CHR_ROM_BANK],
                mirroring: Mirroring::Horizontal,
            },
            mapper: Box::new(mappers::NRom::default()),
            has_battery_ram: false,
            sram_dirty: false,
        }
    }
    /// Read a byte given an address in CPU memory space, or [None] if nothing drives the bus
    pub fn read_cpu(&self, addr: usize) -> Option<u8> {
        self.mapper.read_cpu(addr, &self.memory)
    }
    /// Write a byte given an address in CPU memory space
    pub fn write_cpu(&mut self, addr: usize, value: u8) {
        if self.has_battery_ram && (0x6000..0x8000).contains(&addr) {
            self.sram_dirty = true;
        }
        self.mapper.write_cpu(addr, &mut self.memory, value);
    }
    /// Read a byte in PPU memory space without side effects on the mapper
    pub fn peek_ppu(&self, addr: usize) -> u8 {
        self.mapper.peek_ppu(addr, &self.memory)
    }
    /// Read a byte in PPU memory space, as the PPU does when rendering
    pub fn read_ppu(&mut self, addr: usize) -> u8 {
        self.mapper.read_ppu(addr, &self.memory)
    }
    pub fn write_ppu(&mut self, addr: usize, value: u8) {
        self.mapper.write_ppu(addr, &mut self.memory, value);
    }
    /// Tell the mapper the PPU has put an address on its bus.
    ///
    /// `ppu_cycle` is a monotonic dot counter so mappers can measure how long lines were held.
    pub fn notify_ppu_address(&mut self, addr: u16, ppu_cycle: u64) {
        self.mapper.on_ppu_address(addr, ppu_cycle);
    }
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring(&self.memory)
    }
    /// Whether the mapper is asserting the IRQ line
    pub fn irq(&self) -> bool {
        self.mapper.irq()
    }
    /// Clock the mapper once per CPU cycle
    pub fn advance_cpu_cycles(&mut self, cycles: u32) {
        self.mapper.advance_cpu_cycles(cycles);
    }
    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }
    /// Header flag 6 bit 1, PRG RAM should be persisted by the frontend
    pub fn has_battery_backed_ram(&self) -> bool {
        self.has_battery_ram
    }
    /// The battery backed RAM, if the cartridge has any
    pub fn sram(&self) -> Option<&[u8]> {
        if self.has_battery_ram {
            Some(&self.memory.prg_ram)
        } else {
            None
        }
    }
    /// Overwrite the battery backed RAM with a saved image.
    ///
    /// Images of the wrong size have their overlapping prefix copied.
    /// Does not mark the RAM dirty.
    pub fn set_sram(&mut self, data: &[u8]) {
        if !self.has_battery_ram {
            warn!("Ignoring save data for a cartridge without battery backed RAM");
            return;
        }
        if data.len() != self.memory.prg_ram.len() {
            warn!(
                "Save data is {:#X} bytes but the cartridge has {:#X} bytes of PRG RAM, copying what fits",
                data.len(),
                self.memory.prg_ram.len()
            );
        }
        let n = data.len().min(self.memory.prg_ram.len());
        self.memory.prg_ram[..n].copy_from_slice(&data[..n]);
    }
    pub fn is_sram_dirty(&self) -> bool {
        self.sram_dirty
    }
    pub fn mark_sram_saved(&mut self) {
        self.sram_dirty = false;
    }
}

// NES 2.0 sizes, either a 12 bit bank count or an exponent-multiplier pair.
// Sizes that don't fit in a usize saturate, so the length check rejects them.
fn rom_size(lsb: u8, msb: u8, bank_size: usize) -> usize {
    if msb == 0x0F {
        let exponent = (lsb >> 2) as u32;
        let multiplier = (lsb & 0x03) as usize * 2 + 1;
        1usize
            .checked_shl(exponent)
            .and_then(|size| size.checked_mul(multiplier))
            .unwrap_or(usize::MAX)
    } else {
        (((msb as usize) << 8) | lsb as usize) * bank_size
    }
}

impl Display for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.mapper, f)
    }
}
impl Debug for Cartridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.mapper, f)
    }
}
