use std::fmt::{Debug, Display};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    cartridge::mapper::{bank_addr, num_banks},
    CartridgeMemory, Mapper, Mirroring,
};

/// AxROM cartridge mapper (mapper 7)
#[derive(Default, Serialize, Deserialize)]
pub struct AxRom {
    prg_bank: usize,
    // 0 = lower nametable, 1 = upper nametable
    vram_select: usize,
}

impl Display for AxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AxROM")
    }
}

impl Debug for AxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AxROM prg_bank={} vram_select={}",
            self.prg_bank, self.vram_select
        )
    }
}

#[typetag::serde]
impl Mapper for AxRom {
    fn mapper_num(&self) -> u16 {
        7
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        if cpu_addr < 0x8000 {
            return None;
        }
        Some(mem.read_prg_rom(bank_addr(0x8000, self.prg_bank, cpu_addr)))
    }
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        if cpu_addr < 0x8000 {
            return;
        }
        self.prg_bank = (value & 0x07) as usize % num_banks(0x8000, &mem.prg_rom);
        self.vram_select = ((value & 0x10) >> 4) as usize;
        debug!(
            "AxROM PRG bank {}, nametable {}",
            self.prg_bank, self.vram_select
        );
    }
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(ppu_addr)
    }
    fn mirroring(&self, _mem: &CartridgeMemory) -> Mirroring {
        if self.vram_select == 0 {
            Mirroring::SingleScreenLower
        } else {
            Mirroring::SingleScreenUpper
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mappers::test_utils::numbered_memory;

    #[test]
    fn test_bank_and_nametable() {
        let mem = &mut numbered_memory(16, 8);
        let mut m = AxRom::default();
        assert_eq!(m.mirroring(mem), Mirroring::SingleScreenLower);
        m.write_cpu(0x8000, mem, 0x13);
        assert_eq!(m.read_cpu(0x8000, mem), Some(12));
        assert_eq!(m.read_cpu(0xE000, mem), Some(15));
        assert_eq!(m.mirroring(mem), Mirroring::SingleScreenUpper);
    }
}
