use std::fmt::{Debug, Display};

use crate::{
    cartridge::mapper::{bank_addr, num_banks},
    CartridgeMemory, Mapper,
};
use log::*;
use serde::{Deserialize, Serialize};

#[derive(Default, Serialize, Deserialize)]
/// CNROM cartridge mapper (mapper 3)
pub struct CnRom {
    chr_bank_select: usize,
}

#[typetag::serde]
impl Mapper for CnRom {
    fn mapper_num(&self) -> u16 {
        3
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        if cpu_addr < 0x8000 {
            None
        } else {
            Some(mem.read_prg_rom(cpu_addr - 0x8000))
        }
    }
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        if cpu_addr >= 0x8000 {
            let value = value & mem.read_prg_rom(cpu_addr - 0x8000);
            let banks = if mem.chr_rom.is_empty() {
                num_banks(0x2000, &mem.chr_ram)
            } else {
                num_banks(0x2000, &mem.chr_rom)
            };
            self.chr_bank_select = value as usize % banks;
            debug!("CNROM CHR bank {}", self.chr_bank_select);
        }
    }
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(bank_addr(0x2000, self.chr_bank_select, ppu_addr))
    }
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        mem.write_chr(bank_addr(0x2000, self.chr_bank_select, ppu_addr), value);
    }
}

impl Display for CnRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CNROM")
    }
}
impl Debug for CnRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} chr_bank_select={}", self, self.chr_bank_select)
    }
}
