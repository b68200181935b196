//! Read-only views of the console's state for debugging overlays.
//!
//! Everything here is built from shared references, so taking a snapshot never changes what
//! the emulated game sees.
use serde::Serialize;
use serde_big_array::BigArray;

use crate::{Cpu, Mapper, Ppu};

/// The CPU's registers at a point in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CpuSnapshot {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub p_c: u16,
    pub s_p: u8,
    /// Status register as it would be pushed by `PHP`
    pub status: u8,
    pub cycles: u64,
    pub jammed: bool,
}

impl From<&Cpu> for CpuSnapshot {
    fn from(cpu: &Cpu) -> Self {
        CpuSnapshot {
            a: cpu.a,
            x: cpu.x,
            y: cpu.y,
            p_c: cpu.p_c,
            s_p: cpu.s_p,
            status: cpu.s_r.to_byte(),
            cycles: cpu.cycles,
            jammed: cpu.jammed,
        }
    }
}

/// The PPU's position, registers and sprite memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PpuSnapshot {
    pub scanline: u16,
    pub dot: u16,
    pub frame_count: u64,
    pub ctrl: u8,
    pub mask: u8,
    pub status: u8,
    pub oam_addr: u8,
    /// Loopy `v`
    pub vram_addr: u16,
    /// Loopy `t`
    pub temp_vram_addr: u16,
    pub fine_x: u8,
    #[serde(with = "BigArray")]
    pub oam: [u8; 0x100],
    pub palette_ram: [u8; 0x20],
}

impl From<&Ppu> for PpuSnapshot {
    fn from(ppu: &Ppu) -> Self {
        PpuSnapshot {
            scanline: ppu.scanline,
            dot: ppu.dot,
            frame_count: ppu.frame_count,
            ctrl: ppu.ctrl,
            mask: ppu.mask,
            status: ppu.status,
            oam_addr: ppu.oam_addr,
            vram_addr: ppu.vram_addr(),
            temp_vram_addr: ppu.temp_vram_addr(),
            fine_x: ppu.fine_x(),
            oam: ppu.oam,
            palette_ram: ppu.palette_ram,
        }
    }
}

/// Everything [Nes::debug_snapshot][crate::Nes::debug_snapshot] encodes.
///
/// The mapper is serialised through `typetag`, tagged with the mapper's type name.
#[derive(Serialize)]
pub struct DebugSnapshot<'a> {
    pub cpu: CpuSnapshot,
    pub ppu: PpuSnapshot,
    pub mapper: &'a dyn Mapper,
}
