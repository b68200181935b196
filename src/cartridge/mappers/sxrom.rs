use std::fmt::{Debug, Display};

use crate::{
    cartridge::mapper::{bank_addr, num_banks},
    CartridgeMemory, Mapper, Mirroring,
};
use log::*;
use serde::{Deserialize, Serialize};

/// SxROM cartridge mapper, the MMC1 (mapper 1)
///
/// Registers are written one bit at a time through a 5 bit shift register.
/// The fifth write commits the value to the register selected by the address of that write.
#[derive(Serialize, Deserialize)]
pub struct SxRom {
    shift: u8,
    shift_count: u8,
    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
    // CPU cycle counter, used to ignore writes on consecutive cycles
    cycle: u64,
    last_write_cycle: Option<u64>,
}

impl Default for SxRom {
    fn default() -> SxRom {
        SxRom {
            shift: 0,
            shift_count: 0,
            // Powers up with the last bank fixed at $C000
            control: 0x0C,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
            cycle: 0,
            last_write_cycle: None,
        }
    }
}

const PRG_BANK: usize = 0x4000;

impl SxRom {
    /// Value currently held in the shift register and the number of bits written to it
    pub fn shift_register(&self) -> (u8, u8) {
        (self.shift, self.shift_count)
    }
    pub fn control(&self) -> u8 {
        self.control
    }
    pub fn prg_bank(&self) -> u8 {
        self.prg_bank
    }
    pub fn chr_banks(&self) -> [u8; 2] {
        [self.chr_bank_0, self.chr_bank_1]
    }
    fn prg_ram_enabled(&self) -> bool {
        (self.prg_bank & 0x10) == 0
    }
    // Index of the 16KB PRG bank mapped at a CPU address
    fn prg_bank_at(&self, cpu_addr: usize, mem: &CartridgeMemory) -> usize {
        // SUROM and SXROM use a CHR line to select a 256KB half
        let outer = if mem.prg_rom.len() > 0x40000 {
            (self.chr_bank_0 & 0x10) as usize
        } else {
            0
        };
        let bank = (self.prg_bank & 0x0F) as usize;
        let bank = match (self.control & 0x0C) >> 2 {
            // 32KB mode
            0 | 1 => (bank & 0x0E) | usize::from(cpu_addr >= 0xC000),
            // First bank fixed at $8000
            2 => {
                if cpu_addr < 0xC000 {
                    0
                } else {
                    bank
                }
            }
            // Last bank fixed at $C000
            _ => {
                if cpu_addr < 0xC000 {
                    bank
                } else {
                    0x0F
                }
            }
        };
        (outer | bank) % num_banks(PRG_BANK, &mem.prg_rom)
    }
    fn chr_addr(&self, ppu_addr: usize) -> usize {
        if (self.control & 0x10) == 0 {
            // 8KB mode, low bit ignored
            bank_addr(0x2000, (self.chr_bank_0 >> 1) as usize, ppu_addr)
        } else if ppu_addr < 0x1000 {
            bank_addr(0x1000, self.chr_bank_0 as usize, ppu_addr)
        } else {
            bank_addr(0x1000, self.chr_bank_1 as usize, ppu_addr)
        }
    }
    fn write_register(&mut self, cpu_addr: usize, value: u8) {
        match cpu_addr {
            0x8000..=0x9FFF => self.control = value,
            0xA000..=0xBFFF => self.chr_bank_0 = value,
            0xC000..=0xDFFF => self.chr_bank_1 = value,
            _ => self.prg_bank = value,
        }
        debug!("MMC1 register {:04X} = {:02X}", cpu_addr & 0xE000, value);
    }
}

#[typetag::serde]
impl Mapper for SxRom {
    fn mapper_num(&self) -> u16 {
        1
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        if cpu_addr < 0x6000 {
            None
        } else if cpu_addr < 0x8000 {
            if self.prg_ram_enabled() {
                mem.read_prg_ram(cpu_addr - 0x6000)
            } else {
                None
            }
        } else {
            Some(mem.read_prg_rom(bank_addr(
                PRG_BANK,
                self.prg_bank_at(cpu_addr, mem),
                cpu_addr,
            )))
        }
    }
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        if cpu_addr < 0x6000 {
            return;
        }
        if cpu_addr < 0x8000 {
            if self.prg_ram_enabled() {
                mem.write_prg_ram(cpu_addr - 0x6000, value);
            }
            return;
        }
        let consecutive = self
            .last_write_cycle
            .is_some_and(|c| c + 1 == self.cycle);
        self.last_write_cycle = Some(self.cycle);
        if consecutive {
            trace!("MMC1 ignoring write on consecutive cycle");
            return;
        }
        if (value & 0x80) != 0 {
            self.shift = 0;
            self.shift_count = 0;
            self.control |= 0x0C;
            return;
        }
        self.shift |= (value & 0x01) << self.shift_count;
        self.shift_count += 1;
        if self.shift_count == 5 {
            self.write_register(cpu_addr, self.shift);
            self.shift = 0;
            self.shift_count = 0;
        }
    }
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(self.chr_addr(ppu_addr))
    }
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        mem.write_chr(self.chr_addr(ppu_addr), value);
    }
    fn mirroring(&self, _mem: &CartridgeMemory) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
    fn advance_cpu_cycles(&mut self, cycles: u32) {
        self.cycle += cycles as u64;
    }
}

impl Display for SxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SxROM")
    }
}
impl Debug for SxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SxROM control={:02X} chr=[{:02X}, {:02X}] prg={:02X} shift={:05b}/{}",
            self.control, self.chr_bank_0, self.chr_bank_1, self.prg_bank, self.shift, self.shift_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mappers::test_utils::numbered_memory;

    fn serial_write(m: &mut SxRom, mem: &mut CartridgeMemory, addr: usize, value: u8) {
        for i in 0..5 {
            m.advance_cpu_cycles(2);
            m.write_cpu(addr, mem, (value >> i) & 0x01);
        }
    }

    #[test]
    fn test_commits_on_fifth_write() {
        let mem = &mut numbered_memory(16, 8);
        let mut m = SxRom::default();
        for (i, bit) in [1, 0, 1, 1].into_iter().enumerate() {
            m.advance_cpu_cycles(2);
            m.write_cpu(0x8000, mem, bit);
            assert_eq!(m.shift_register().1, i as u8 + 1);
            assert_eq!(m.control(), 0x0C, "Committed early on write {}", i + 1);
        }
        m.advance_cpu_cycles(2);
        m.write_cpu(0x8000, mem, 0x01);
        assert_eq!(m.control(), 0b11101);
        assert_eq!(m.shift_register(), (0, 0));
        assert_eq!(m.mirroring(mem), Mirroring::SingleScreenUpper);
    }
    #[test]
    fn test_reset_bit() {
        let mem = &mut numbered_memory(16, 8);
        let mut m = SxRom::default();
        serial_write(&mut m, mem, 0x8000, 0x02);
        m.advance_cpu_cycles(2);
        m.write_cpu(0xA000, mem, 0x01);
        m.advance_cpu_cycles(2);
        m.write_cpu(0xA000, mem, 0x80);
        assert_eq!(m.shift_register(), (0, 0));
        assert_eq!(m.control(), 0x0E);
    }
    #[test]
    fn test_consecutive_writes_ignored() {
        let mem = &mut numbered_memory(16, 8);
        let mut m = SxRom::default();
        m.advance_cpu_cycles(1);
        m.write_cpu(0x8000, mem, 0x01);
        m.advance_cpu_cycles(1);
        m.write_cpu(0x8000, mem, 0x01);
        assert_eq!(m.shift_register(), (1, 1));
    }
    #[test]
    fn test_prg_modes() {
        // 8 16KB banks
        let mem = &mut numbered_memory(16, 8);
        let mut m = SxRom::default();
        serial_write(&mut m, mem, 0xE000, 0x03);
        // Mode 3, last bank fixed at $C000
        assert_eq!(m.read_cpu(0x8000, mem), Some(6));
        assert_eq!(m.read_cpu(0xC000, mem), Some(14));
        serial_write(&mut m, mem, 0x8000, 0x08);
        // Mode 2, first bank fixed at $8000
        assert_eq!(m.read_cpu(0x8000, mem), Some(0));
        assert_eq!(m.read_cpu(0xC000, mem), Some(6));
        serial_write(&mut m, mem, 0x8000, 0x00);
        // 32KB mode ignores the low bit
        assert_eq!(m.read_cpu(0x8000, mem), Some(4));
        assert_eq!(m.read_cpu(0xC000, mem), Some(6));
    }
    #[test]
    fn test_surom_outer_bank() {
        // 512KB, 32 16KB banks
        let mem = &mut numbered_memory(64, 8);
        let mut m = SxRom::default();
        assert_eq!(m.read_cpu(0xC000, mem), Some(30));
        serial_write(&mut m, mem, 0xA000, 0x10);
        assert_eq!(m.read_cpu(0x8000, mem), Some(32));
        assert_eq!(m.read_cpu(0xC000, mem), Some(62));
    }
    #[test]
    fn test_prg_ram_disable() {
        let mem = &mut numbered_memory(16, 8);
        let mut m = SxRom::default();
        m.write_cpu(0x6000, mem, 0x12);
        assert_eq!(m.read_cpu(0x6000, mem), Some(0x12));
        serial_write(&mut m, mem, 0xE000, 0x10);
        assert_eq!(m.read_cpu(0x6000, mem), None);
    }
}
