use std::fmt::{Debug, Display};

use crate::{
    cartridge::mapper::{bank_addr, num_banks},
    CartridgeMemory, Mapper, Mirroring,
};
use log::*;
use serde::{Deserialize, Serialize};

/// Which of the two CHR banks a pattern table half is currently showing
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum Latch {
    FD,
    FE,
}

/// PxROM cartridge mapper, the MMC2 (mapper 9)
///
/// The PPU switches CHR banks itself: fetching tile `$FD` or `$FE` from a pattern table flips
/// that table's latch, which selects between two 4KB banks.
#[derive(Serialize, Deserialize)]
pub struct PxRom {
    prg_bank: usize,
    // Indexed by pattern table, then by latch
    chr_banks: [[usize; 2]; 2],
    latches: [Latch; 2],
    mirroring: Mirroring,
}

impl Default for PxRom {
    fn default() -> Self {
        PxRom {
            prg_bank: 0,
            chr_banks: [[0; 2]; 2],
            latches: [Latch::FD; 2],
            mirroring: Mirroring::Vertical,
        }
    }
}

impl PxRom {
    fn chr_bank(&self, ppu_addr: usize) -> usize {
        let table = (ppu_addr >> 12) & 0x01;
        let latch = match self.latches[table] {
            Latch::FD => 0,
            Latch::FE => 1,
        };
        self.chr_banks[table][latch]
    }
}

#[typetag::serde]
impl Mapper for PxRom {
    fn mapper_num(&self) -> u16 {
        9
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        if cpu_addr < 0x6000 {
            None
        } else if cpu_addr < 0x8000 {
            mem.read_prg_ram(cpu_addr - 0x6000)
        } else if cpu_addr < 0xA000 {
            Some(mem.read_prg_rom(bank_addr(0x2000, self.prg_bank, cpu_addr)))
        } else {
            // Last three banks are fixed
            let n = num_banks(0x2000, &mem.prg_rom);
            let from_end = 3 - (cpu_addr - 0xA000) / 0x2000;
            let bank = n.saturating_sub(from_end);
            Some(mem.read_prg_rom(bank_addr(0x2000, bank, cpu_addr)))
        }
    }
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        let bank = (value & 0x1F) as usize;
        match cpu_addr {
            0x6000..=0x7FFF => mem.write_prg_ram(cpu_addr - 0x6000, value),
            0xA000..=0xAFFF => self.prg_bank = bank & 0x0F,
            0xB000..=0xBFFF => self.chr_banks[0][0] = bank,
            0xC000..=0xCFFF => self.chr_banks[0][1] = bank,
            0xD000..=0xDFFF => self.chr_banks[1][0] = bank,
            0xE000..=0xEFFF => self.chr_banks[1][1] = bank,
            0xF000..=0xFFFF => {
                self.mirroring = if (value & 0x01) == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                }
            }
            _ => {}
        }
        trace!("MMC2 {:?}", self);
    }
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(bank_addr(0x1000, self.chr_bank(ppu_addr), ppu_addr))
    }
    fn read_ppu(&mut self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        // The byte is read with the old bank, the switch happens afterwards
        let v = self.peek_ppu(ppu_addr, mem);
        match ppu_addr {
            0x0FD8 => self.latches[0] = Latch::FD,
            0x0FE8 => self.latches[0] = Latch::FE,
            0x1FD8..=0x1FDF => self.latches[1] = Latch::FD,
            0x1FE8..=0x1FEF => self.latches[1] = Latch::FE,
            _ => {}
        }
        v
    }
    fn write_ppu(&mut self, _ppu_addr: usize, _mem: &mut CartridgeMemory, _value: u8) {}
    fn mirroring(&self, _mem: &CartridgeMemory) -> Mirroring {
        self.mirroring
    }
}

impl Display for PxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PxROM")
    }
}
impl Debug for PxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PxROM prg_bank={} chr_banks={:?} latches={:?} mirroring={:?}",
            self.prg_bank, self.chr_banks, self.latches, self.mirroring
        )
    }
}
