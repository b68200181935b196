use std::fmt::{Debug, Display};

use super::{
    mappers::{AxRom, CnRom, NRom, PxRom, SxRom, TxRom, UxRom},
    CartridgeMemory, Mirroring,
};
use crate::LoadError;

/// The address translation and banking logic of a cartridge.
///
/// One implementation per mapper family. Mappers own their bank registers and IRQ counters,
/// while the ROM and RAM they switch between lives in [CartridgeMemory].
/// Every mapper is serialisable through `typetag`, which is how its bank state is dumped for debugging.
#[typetag::serde]
pub trait Mapper: Debug + Display + Send {
    /// The iNES mapper number
    fn mapper_num(&self) -> u16;
    /// Read a byte in CPU memory space (`$4020-$FFFF`), returning [None] for open bus
    fn read_cpu(&self, cpu_addr: usize, mem: &CartridgeMemory) -> Option<u8>;
    /// Write a byte in CPU memory space, either to PRG RAM or to one of the mapper's registers
    fn write_cpu(&mut self, cpu_addr: usize, mem: &mut CartridgeMemory, value: u8);
    /// Read a byte of CHR without changing any mapper state
    fn peek_ppu(&self, ppu_addr: usize, mem: &CartridgeMemory) -> u8;
    /// Read a byte of CHR during rendering. Mappers that watch the data the PPU reads override this.
    fn read_ppu(&mut self, ppu_addr: usize, mem: &CartridgeMemory) -> u8 {
        self.peek_ppu(ppu_addr, mem)
    }
    fn write_ppu(&mut self, ppu_addr: usize, mem: &mut CartridgeMemory, value: u8) {
        mem.write_chr(ppu_addr, value)
    }
    /// The nametable mirroring currently in use
    fn mirroring(&self, mem: &CartridgeMemory) -> Mirroring {
        mem.mirroring
    }
    /// Called whenever the PPU puts an address on its bus.
    ///
    /// `ppu_cycle` is a monotonic count of PPU dots.
    fn on_ppu_address(&mut self, _addr: u16, _ppu_cycle: u64) {}
    /// Whether the mapper is asserting the CPU's IRQ line
    fn irq(&self) -> bool {
        false
    }
    fn advance_cpu_cycles(&mut self, _cycles: u32) {}
}

/// Create the mapper for an iNES mapper number.
pub fn get_mapper(mapper_num: u16) -> Result<Box<dyn Mapper>, LoadError> {
    Ok(match mapper_num {
        0 => Box::new(NRom::default()),
        1 => Box::new(SxRom::default()),
        2 => Box::new(UxRom::default()),
        3 => Box::new(CnRom::default()),
        4 => Box::new(TxRom::default()),
        7 => Box::new(AxRom::default()),
        9 => Box::new(PxRom::default()),
        _ => return Err(LoadError::UnsupportedMapper(mapper_num)),
    })
}

/// Address of `offset` inside bank `bank_num` when memory is split into banks of `bank_size` bytes
pub fn bank_addr(bank_size: usize, bank_num: usize, offset: usize) -> usize {
    bank_size * bank_num + (offset % bank_size)
}

/// Number of whole banks of `bank_size` bytes in `data`, at least one
pub fn num_banks(bank_size: usize, data: &[u8]) -> usize {
    (data.len() / bank_size).max(1)
}
