mod common;
use common::*;

use famicore::{Mapper, Nes};

// Start in VBlank with sprites fetched from $1000 and the background from $0000
fn mmc3_nes(irq_handler: &[u8]) -> Nes {
    let rom = RomBuilder::new()
        .mapper(4)
        .code(IRQ_ADDR, irq_handler)
        .build();
    let mut nes = Nes::from_rom(&rom).unwrap();
    assert_eq!(nes.mapper().mapper_num(), 4);
    // No frame IRQs from the APU
    nes.write_byte(0x4017, 0x40);
    advance_nes_frames!(nes, 1);
    nes.write_byte(0x2000, 0x08);
    nes.write_byte(0x2001, 0x18);
    nes
}
fn set_irq_latch(nes: &mut Nes, latch: u8) {
    nes.write_byte(0xC000, latch);
    nes.write_byte(0xC001, 0);
    nes.write_byte(0xE001, 0);
}

#[test]
fn test_irq_scanline() {
    let mut nes = mmc3_nes(&[0x40]);
    set_irq_latch(&mut nes, 10);
    while !nes.mapper().irq() {
        nes.step();
        assert!(nes.ppu.scanline != 240, "IRQ never raised");
    }
    // Reloaded on the pre-render line, then counts down once per visible line
    assert_eq!(nes.ppu.scanline, 9);
    assert!(nes.ppu.dot > 256);
}
#[test]
fn test_irq_acknowledge() {
    let mut nes = mmc3_nes(&[0x40]);
    set_irq_latch(&mut nes, 10);
    while !nes.mapper().irq() {
        nes.step();
    }
    nes.write_byte(0xE000, 0);
    assert!(!nes.mapper().irq());
    // Disabled, so the counter reaching 0 again does nothing
    advance_nes_frames!(nes, 2);
    assert!(!nes.mapper().irq());
}
#[test]
fn test_no_irq_without_rendering() {
    let mut nes = mmc3_nes(&[0x40]);
    nes.write_byte(0x2001, 0x00);
    set_irq_latch(&mut nes, 10);
    advance_nes_frames!(nes, 2);
    assert!(!nes.mapper().irq());
}
#[test]
fn test_irq_handler() {
    // INC $10, STA $E000, RTI
    let mut nes = mmc3_nes(&[0xE6, 0x10, 0x8D, 0x00, 0xE0, 0x40]);
    nes.mem[0x10] = 0;
    set_irq_latch(&mut nes, 100);
    nes.cpu.s_r.i = false;
    while nes.cpu.p_c != IRQ_ADDR {
        nes.step();
    }
    assert_eq!(nes.ppu.scanline, 99);
    // The handler disables further IRQs
    advance_nes_frames!(nes, 3);
    assert_eq!(nes.mem[0x10], 1);
    assert!(!nes.mapper().irq());
    assert!(!nes.cpu.s_r.i);
}
