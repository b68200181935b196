use std::fmt::{Debug, Display};

use crate::{
    cartridge::mapper::{bank_addr, num_banks},
    CartridgeMemory, Mapper, Mirroring,
};
use log::*;
use serde::{Deserialize, Serialize};

// Number of dots A12 has to stay low before a rise clocks the counter
const A12_LOW_DOTS: u64 = 10;

/// TxROM cartridge mapper, the MMC3 (mapper 4)
///
/// Four 8KB PRG windows and eight 1KB CHR windows, plus a scanline counter clocked by rising
/// edges on PPU address line 12.
#[derive(Serialize, Deserialize)]
pub struct TxRom {
    // R0-R7
    registers: [u8; 8],
    // Which of R0-R7 the next $8001 write sets
    bank_select: usize,
    prg_mode: bool,
    chr_inversion: bool,
    mirroring: Mirroring,
    prg_ram_enabled: bool,
    prg_ram_write_protect: bool,
    irq_latch: u8,
    irq_counter: u8,
    irq_reload: bool,
    irq_enabled: bool,
    irq_pending: bool,
    a12_high: bool,
    // PPU dot at which A12 last went low
    a12_low_since: u64,
}

impl Default for TxRom {
    fn default() -> Self {
        TxRom {
            registers: [0, 2, 4, 5, 6, 7, 0, 1],
            bank_select: 0,
            prg_mode: false,
            chr_inversion: false,
            mirroring: Mirroring::Vertical,
            prg_ram_enabled: true,
            prg_ram_write_protect: false,
            irq_latch: 0,
            irq_counter: 0,
            irq_reload: false,
            irq_enabled: false,
            irq_pending: false,
            a12_high: false,
            a12_low_since: 0,
        }
    }
}

impl TxRom {
    /// Current value of the scanline counter
    pub fn irq_counter(&self) -> u8 {
        self.irq_counter
    }
    fn prg_bank_at(&self, cpu_addr: usize, mem: &CartridgeMemory) -> usize {
        let n = num_banks(0x2000, &mem.prg_rom);
        let second_last = n.saturating_sub(2);
        let r6 = (self.registers[6] & 0x3F) as usize;
        let r7 = (self.registers[7] & 0x3F) as usize;
        let bank = match (cpu_addr - 0x8000) / 0x2000 {
            0 => {
                if self.prg_mode {
                    second_last
                } else {
                    r6
                }
            }
            1 => r7,
            2 => {
                if self.prg_mode {
                    r6
                } else {
                    second_last
                }
            }
            _ => n - 1,
        };
        bank % n
    }
    fn chr_addr(&self, ppu_addr: usize) -> usize {
        let inverted = ppu_addr ^ if self.chr_inversion { 0x1000 } else { 0 };
        let r = &self.registers;
        let bank = match (inverted & 0x1FFF) / 0x400 {
            0 => r[0] & 0xFE,
            1 => r[0] | 0x01,
            2 => r[1] & 0xFE,
            3 => r[1] | 0x01,
            slot => r[slot - 2],
        };
        bank_addr(0x400, bank as usize, ppu_addr)
    }
    fn clock_counter(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }
        if self.irq_counter == 0 && self.irq_enabled {
            self.irq_pending = true;
        }
    }
}

#[typetag::serde]
impl Mapper for TxRom {
    fn mapper_num(&self) -> u16 {
        4
    }
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8> {
        if cpu_addr < 0x6000 {
            None
        } else if cpu_addr < 0x8000 {
            if self.prg_ram_enabled {
                mem.read_prg_ram(cpu_addr - 0x6000)
            } else {
                None
            }
        } else {
            Some(mem.read_prg_rom(bank_addr(
                0x2000,
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
            if self.prg_ram_enabled && !self.prg_ram_write_protect {
                mem.write_prg_ram(cpu_addr - 0x6000, value);
            }
            return;
        }
        let even = cpu_addr % 2 == 0;
        match (cpu_addr & 0xE000, even) {
            (0x8000, true) => {
                self.bank_select = (value & 0x07) as usize;
                self.prg_mode = (value & 0x40) != 0;
                self.chr_inversion = (value & 0x80) != 0;
            }
            (0x8000, false) => {
                self.registers[self.bank_select] = value;
                debug!("MMC3 R{} = {:02X}", self.bank_select, value);
            }
            (0xA000, true) => {
                // Hardwired four screen boards ignore this
                if mem.mirroring != Mirroring::FourScreen {
                    self.mirroring = if (value & 0x01) == 0 {
                        Mirroring::Vertical
                    } else {
                        Mirroring::Horizontal
                    };
                }
            }
            (0xA000, false) => {
                self.prg_ram_enabled = (value & 0x80) != 0;
                self.prg_ram_write_protect = (value & 0x40) != 0;
            }
            (0xC000, true) => self.irq_latch = value,
            (0xC000, false) => {
                self.irq_counter = 0;
                self.irq_reload = true;
            }
            (_, true) => {
                self.irq_enabled = false;
                self.irq_pending = false;
            }
            (_, false) => self.irq_enabled = true,
        }
    }
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        mem.read_chr(self.chr_addr(ppu_addr))
    }
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        mem.write_chr(self.chr_addr(ppu_addr), value);
    }
    fn mirroring(&self, mem: &CartridgeMemory) -> Mirroring {
        if mem.mirroring == Mirroring::FourScreen {
            Mirroring::FourScreen
        } else {
            self.mirroring
        }
    }
    fn on_ppu_address(&mut self, addr: u16, ppu_cycle: u64) {
        let a12 = (addr & 0x1000) != 0;
        if a12 && !self.a12_high {
            if ppu_cycle.saturating_sub(self.a12_low_since) >= A12_LOW_DOTS {
                self.clock_counter();
            }
            self.a12_high = true;
        } else if !a12 && self.a12_high {
            self.a12_high = false;
            self.a12_low_since = ppu_cycle;
        }
    }
    fn irq(&self) -> bool {
        self.irq_pending
    }
}

impl Display for TxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TxROM")
    }
}
impl Debug for TxRom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TxROM R={:02X?} prg_mode={} chr_inv={} irq latch={} counter={} enabled={} pending={}",
            self.registers,
            self.prg_mode as u8,
            self.chr_inversion as u8,
            self.irq_latch,
            self.irq_counter,
            self.irq_enabled,
            self.irq_pending
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::mappers::test_utils::numbered_memory;

    // Fake a scanline where the background uses $0000 and sprites use $1000
    fn scanline(m: &mut TxRom, dot: &mut u64) {
        for i in 0..341 {
            let addr = if (261..320).contains(&i) { 0x1000 } else { 0x0000 };
            m.on_ppu_address(addr, *dot);
            *dot += 1;
        }
    }

    #[test]
    fn test_prg_banking() {
        let mem = &mut numbered_memory(16, 64);
        let mut m = TxRom::default();
        m.write_cpu(0x8000, mem, 0x06);
        m.write_cpu(0x8001, mem, 0x03);
        m.write_cpu(0x8000, mem, 0x07);
        m.write_cpu(0x8001, mem, 0x05);
        assert_eq!(m.read_cpu(0x8000, mem), Some(3));
        assert_eq!(m.read_cpu(0xA000, mem), Some(5));
        assert_eq!(m.read_cpu(0xC000, mem), Some(14));
        assert_eq!(m.read_cpu(0xE000, mem), Some(15));
        m.write_cpu(0x8000, mem, 0x46);
        assert_eq!(m.read_cpu(0x8000, mem), Some(14));
        assert_eq!(m.read_cpu(0xC000, mem), Some(3));
    }
    #[test]
    fn test_chr_banking() {
        let mem = &mut numbered_memory(4, 64);
        let mut m = TxRom::default();
        for (r, v) in [(0, 8), (1, 11), (2, 20), (5, 33)] {
            m.write_cpu(0x8000, mem, r);
            m.write_cpu(0x8001, mem, v);
        }
        assert_eq!(m.peek_ppu(0x0000, mem), 8);
        assert_eq!(m.peek_ppu(0x0400, mem), 9);
        assert_eq!(m.peek_ppu(0x0800, mem), 10);
        assert_eq!(m.peek_ppu(0x0C00, mem), 11);
        assert_eq!(m.peek_ppu(0x1000, mem), 20);
        assert_eq!(m.peek_ppu(0x1C00, mem), 33);
        // Inverted, the 1KB banks move to $0000
        m.write_cpu(0x8000, mem, 0x80);
        assert_eq!(m.peek_ppu(0x0000, mem), 20);
        assert_eq!(m.peek_ppu(0x1400, mem), 9);
    }
    #[test]
    fn test_scanline_irq() {
        let mem = &mut numbered_memory(4, 64);
        let mut m = TxRom::default();
        let mut dot = 100;
        m.write_cpu(0xC000, mem, 3);
        m.write_cpu(0xC001, mem, 0);
        m.write_cpu(0xE001, mem, 0);
        // Reload, then 2, 1, 0
        for _ in 0..3 {
            scanline(&mut m, &mut dot);
            assert!(!m.irq());
        }
        scanline(&mut m, &mut dot);
        assert!(m.irq());
        assert_eq!(m.irq_counter(), 0);
        // Acknowledge
        m.write_cpu(0xE000, mem, 0);
        assert!(!m.irq());
        scanline(&mut m, &mut dot);
        assert_eq!(m.irq_counter(), 3);
    }
    #[test]
    fn test_a12_filter() {
        let mem = &mut numbered_memory(4, 64);
        let mut m = TxRom::default();
        m.write_cpu(0xC000, mem, 5);
        m.write_cpu(0xC001, mem, 0);
        m.on_ppu_address(0x1000, 20);
        assert_eq!(m.irq_counter(), 5);
        // Rises after a short low period are ignored
        for dot in (21..80).step_by(4) {
            m.on_ppu_address(0x0000, dot);
            m.on_ppu_address(0x1000, dot + 2);
        }
        assert_eq!(m.irq_counter(), 5);
        m.on_ppu_address(0x0000, 100);
        m.on_ppu_address(0x1000, 110);
        assert_eq!(m.irq_counter(), 4);
    }
}
