use std::fmt::{Debug, Display};

use crate::{
    cartridge::mapper::{bank_addr, num_banks},
    CartridgeMemory, Mapper,
};
use log::*;
use serde::{Deserialize, Serialize};

/// UxROM cartridge mapper (mapper 2)
///
/// Switchable 16KB bank at `$8000`, last bank fixed at `$C000`, 8KB of unbanked CHR.
#[derive(Default, Serialize, Deserialize)]
pub struct UxRom {
    bank: usize,
}

const BANK_SIZE: usize = 0x4000;

#[typetag::serde]
impl Mapper for UxRom {
    fn mapper_num(&self) -> u16 {
        2
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        if cpu_addr < 0x8000 {
            return None;
        }
        let bank = if cpu_addr >= 0xC000 {
            // Fixed to last bank
            num_banks(BANK_SIZE, &mem.prg_rom) - 1
        } else {
            self.bank
        };
        Some(mem.read_prg_rom(bank_addr(BANK_SIZE, bank, cpu_addr)))
    }
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        if cpu_addr < 0x8000 {
            return;
        }
        // Bus conflict, the ROM drives the bus at the same time as the CPU
        let value = self.read_cpu(cpu_addr, mem).map_or(value, |rom| rom & value);
        self.bank = value as usize % num_banks(BANK_SIZE, &mem.prg_rom);
        debug!("UxROM bank {}", self.bank);
    }
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(ppu_addr)
    }
}

impl Display for UxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UxROM")
    }
}
impl Debug for UxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UxROM (bank {})", self.bank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mappers::test_utils::numbered_memory;

    #[test]
    fn test_switching() {
        // 4 16KB banks, where bank n starts with 2n
        let mem = &mut numbered_memory(8, 8);
        let mut m = UxRom::default();
        // 0xFF in the fixed bank so the write isn't masked
        mem.prg_rom[0xFFF0] = 0xFF;
        m.write_cpu(0xFFF0, mem, 0x02);
        assert_eq!(m.read_cpu(0x8000, mem), Some(4));
        assert_eq!(m.read_cpu(0xC000, mem), Some(6));
    }
    #[test]
    fn test_bus_conflict() {
        let mem = &mut numbered_memory(8, 8);
        let mut m = UxRom::default();
        // Fixed bank at $E000 holds 7, so 0x0A & 0x07 = 2
        m.write_cpu(0xE000, mem, 0x0A);
        assert_eq!(m.read_cpu(0x8000, mem), Some(4));
    }
}
