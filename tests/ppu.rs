mod common;
use common::*;

use famicore::{Nes, HV_TO_RGB};
use test_case::test_case;

// BIT $2002, LDA #$80, STA $2000, loop
const ENABLE_NMI: [u8; 11] = [
    0x2C, 0x02, 0x20, 0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x08, 0xC0,
];
// INC $00, RTI
const COUNT_NMI: [u8; 3] = [0xE6, 0x00, 0x40];

fn nmi_counter() -> Nes {
    let rom = RomBuilder::new()
        .code(RESET_ADDR, &ENABLE_NMI)
        .code(NMI_ADDR, &COUNT_NMI)
        .build();
    let mut nes = Nes::from_rom(&rom).unwrap();
    nes.mem[0] = 0;
    nes
}
fn step_to_scanline(nes: &mut Nes, scanline: u16) {
    while nes.ppu.scanline != scanline {
        nes.step();
    }
}

#[test]
fn test_nmi_once_per_frame() {
    let mut nes = nmi_counter();
    advance_nes_frames!(nes, 10);
    nes.step_cycles(100);
    assert_eq!(nes.mem[0], 10);
}
#[test]
fn test_nmi_timing() {
    let mut nes = nmi_counter();
    while nes.cpu.p_c != NMI_ADDR {
        nes.step();
    }
    // At most two JMPs and the 7 cycle interrupt sequence after VBlank starts
    assert_eq!(nes.ppu.scanline, 241);
    assert!(nes.ppu.dot > 1 && nes.ppu.dot <= 1 + 3 * (3 + 3 + 7));
}
#[test]
fn test_nmi_suppressed_when_disabled() {
    let mut nes = nmi_counter();
    advance_nes_frames!(nes, 2);
    step_to_scanline(&mut nes, 200);
    assert_eq!(nes.mem[0], 2);
    nes.write_byte(0x2000, 0x00);
    advance_nes_frames!(nes, 1);
    nes.step_cycles(100);
    assert_eq!(nes.mem[0], 2);
    // Enabling again before VBlank brings it back
    step_to_scanline(&mut nes, 200);
    nes.write_byte(0x2000, 0x80);
    advance_nes_frames!(nes, 1);
    nes.step_cycles(100);
    assert_eq!(nes.mem[0], 3);
}

#[rustfmt::skip]
const BACKGROUND_PALETTES: [u8; 16] = [
    0x0F, 0x30, 0x21, 0x00,
    0x0F, 0x16, 0x00, 0x00,
    0x0F, 0x2A, 0x00, 0x00,
    0x0F, 0x12, 0x00, 0x00,
];

// Tile 0 is transparent, 1 is opaque in colour 1, 2 is opaque in colour 2 and 3 has its left
// half opaque in colour 1
fn rendering_rom() -> Nes {
    let rom = RomBuilder::new()
        .chr(0x0010, &[0xFF; 8])
        .chr(0x0028, &[0xFF; 8])
        .chr(0x0030, &[0xF0; 8])
        .build();
    let mut nes = Nes::from_rom(&rom).unwrap();
    // Start in VBlank
    advance_nes_frames!(nes, 1);
    write_vram(&mut nes, 0x3F00, &BACKGROUND_PALETTES);
    write_vram(&mut nes, 0x3F10, &[0x0F, 0x16, 0x00, 0x00]);
    nes
}
fn fill_background(nes: &mut Nes, tile: u8) {
    write_nametable(nes, |_, _| tile);
}
// Fill the first nametable given the tile at each column and row, with every attribute 0
fn write_nametable(nes: &mut Nes, tile: impl Fn(usize, usize) -> u8) {
    let tiles = (0..960).map(|i| tile(i % 32, i / 32)).collect::<Vec<u8>>();
    write_vram(nes, 0x2000, &tiles);
    write_vram(nes, 0x23C0, &[0x00; 64]);
    reset_scroll(nes);
}
fn set_scroll(nes: &mut Nes, x: u8, y: u8) {
    reset_scroll(nes);
    nes.write_byte(0x2005, x);
    nes.write_byte(0x2005, y);
}
fn pixel(nes: &Nes, x: usize, y: usize) -> [u8; 3] {
    let i = 3 * (y * 256 + x);
    [nes.framebuffer()[i], nes.framebuffer()[i + 1], nes.framebuffer()[i + 2]]
}

#[test]
fn test_background_colour() {
    let mut nes = rendering_rom();
    fill_background(&mut nes, 1);
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 1);
    assert_eq!(pixel(&nes, 100, 100), HV_TO_RGB[0x30]);
    assert_eq!(pixel(&nes, 0, 0), HV_TO_RGB[0x30]);
    assert_eq!(pixel(&nes, 255, 239), HV_TO_RGB[0x30]);
}
#[test]
fn test_first_tile_column() {
    let mut nes = rendering_rom();
    write_nametable(&mut nes, |column, _| if column == 0 { 1 } else { 0 });
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 2);
    for y in [0, 1, 100, 239] {
        assert_eq!(pixel(&nes, 0, y), HV_TO_RGB[0x30], "line {}", y);
        assert_eq!(pixel(&nes, 7, y), HV_TO_RGB[0x30], "line {}", y);
        assert_eq!(pixel(&nes, 8, y), HV_TO_RGB[0x0F], "line {}", y);
        assert_eq!(pixel(&nes, 255, y), HV_TO_RGB[0x0F], "line {}", y);
    }
}
#[test]
fn test_tile_columns_in_order() {
    let mut nes = rendering_rom();
    // Every third column is transparent, the rest alternate between colours 1 and 2
    write_nametable(&mut nes, |column, _| [1, 2, 0][column % 3]);
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 1);
    let colours = [0x30, 0x21, 0x0F];
    for column in 0..32 {
        let expected = HV_TO_RGB[colours[column % 3]];
        for y in [0, 57, 239] {
            assert_eq!(pixel(&nes, 8 * column, y), expected, "column {} line {}", column, y);
            assert_eq!(pixel(&nes, 8 * column + 7, y), expected, "column {} line {}", column, y);
        }
    }
}
#[test]
fn test_tile_rows_in_order() {
    let mut nes = rendering_rom();
    write_nametable(&mut nes, |_, row| [1, 2, 0][row % 3]);
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 1);
    let colours = [0x30, 0x21, 0x0F];
    for y in 0..240 {
        assert_eq!(pixel(&nes, 130, y), HV_TO_RGB[colours[(y / 8) % 3]], "line {}", y);
    }
}
#[test]
fn test_attribute_quadrants() {
    let mut nes = rendering_rom();
    fill_background(&mut nes, 1);
    // Palettes 0, 1, 2 and 3 for the top left, top right, bottom left and bottom right
    // 16x16 areas of the first 32x32 block
    write_vram(&mut nes, 0x23C0, &[0b11_10_01_00]);
    reset_scroll(&mut nes);
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 1);
    assert_eq!(pixel(&nes, 0, 0), HV_TO_RGB[0x30]);
    assert_eq!(pixel(&nes, 15, 15), HV_TO_RGB[0x30]);
    assert_eq!(pixel(&nes, 16, 0), HV_TO_RGB[0x16]);
    assert_eq!(pixel(&nes, 31, 15), HV_TO_RGB[0x16]);
    assert_eq!(pixel(&nes, 0, 16), HV_TO_RGB[0x2A]);
    assert_eq!(pixel(&nes, 15, 31), HV_TO_RGB[0x2A]);
    assert_eq!(pixel(&nes, 16, 16), HV_TO_RGB[0x12]);
    assert_eq!(pixel(&nes, 31, 31), HV_TO_RGB[0x12]);
    // The next blocks use attribute bytes of 0
    assert_eq!(pixel(&nes, 32, 0), HV_TO_RGB[0x30]);
    assert_eq!(pixel(&nes, 0, 32), HV_TO_RGB[0x30]);
}

#[test_case(0 ; "no scroll")]
#[test_case(3 ; "fine x 3")]
#[test_case(7 ; "fine x 7")]
#[test_case(13 ; "coarse and fine x")]
#[test_case(250 ; "into the next nametable")]
fn test_horizontal_scroll(scroll_x: u8) {
    let mut nes = rendering_rom();
    // Left halves of the even columns are opaque
    write_nametable(&mut nes, |column, _| if column % 2 == 0 { 3 } else { 0 });
    set_scroll(&mut nes, scroll_x, 0);
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 1);
    for x in 0..256 {
        // Horizontal mirroring, the nametable to the right is the same one
        let world_x = (x + scroll_x as usize) % 256;
        let opaque = (world_x / 8) % 2 == 0 && world_x % 8 < 4;
        let expected = HV_TO_RGB[if opaque { 0x30 } else { 0x0F }];
        assert_eq!(pixel(&nes, x, 120), expected, "x {}", x);
    }
}
#[test_case(8 ; "one row")]
#[test_case(21 ; "coarse and fine y")]
#[test_case(200 ; "into the next nametable")]
fn test_vertical_scroll(scroll_y: u8) {
    let mut nes = rendering_rom();
    write_nametable(&mut nes, |_, row| [1, 2, 0][row % 3]);
    set_scroll(&mut nes, 0, scroll_y);
    nes.write_byte(0x2001, 0x0A);
    advance_nes_frames!(nes, 1);
    let colours = [0x30, 0x21, 0x0F];
    for y in 0..240 {
        let world_y = y + scroll_y as usize;
        // Past row 29 the picture continues in the empty nametable below
        let expected = if world_y < 240 {
            colours[(world_y / 8) % 3]
        } else {
            0x0F
        };
        assert_eq!(pixel(&nes, 64, y), HV_TO_RGB[expected], "line {}", y);
    }
}
#[test]
fn test_scroll_registers_set_temp_address() {
    let mut nes = rendering_rom();
    nes.write_byte(0x2000, 0x02);
    nes.write_byte(0x2005, 0x7D);
    nes.write_byte(0x2005, 0x5E);
    // Fine Y 6, nametable 2, coarse Y 11, coarse X 15
    assert_eq!(nes.ppu.temp_vram_addr(), 0x696F);
    assert_eq!(nes.ppu.fine_x(), 5);
    // $2006 overwrites the address but keeps fine X
    nes.read_byte(0x2002);
    nes.write_byte(0x2006, 0x24);
    assert_eq!(nes.ppu.temp_vram_addr() & 0x00FF, 0x6F);
    nes.write_byte(0x2006, 0x40);
    assert_eq!(nes.ppu.vram_addr(), 0x2440);
    assert_eq!(nes.ppu.temp_vram_addr(), 0x2440);
    assert_eq!(nes.ppu.fine_x(), 5);
}
#[test]
fn test_left_column_clipping() {
    let mut nes = rendering_rom();
    fill_background(&mut nes, 1);
    nes.write_byte(0x2001, 0x08);
    advance_nes_frames!(nes, 1);
    let fb = nes.framebuffer();
    // Backdrop on the left 8 pixels
    assert_eq!(fb[3 * (50 * 256 + 7)..3 * (50 * 256 + 8)], HV_TO_RGB[0x0F]);
    assert_eq!(fb[3 * (50 * 256 + 8)..3 * (50 * 256 + 9)], HV_TO_RGB[0x30]);
}
#[test]
fn test_sprite_drawn_over_backdrop() {
    let mut nes = rendering_rom();
    fill_background(&mut nes, 0);
    nes.ppu.oam[0..4].copy_from_slice(&[49, 1, 0x00, 100]);
    (4..0x100).for_each(|i| nes.ppu.oam[i] = 0xFF);
    nes.write_byte(0x2001, 0x1E);
    advance_nes_frames!(nes, 1);
    let fb = nes.framebuffer();
    // Sprites are drawn a line below their Y
    assert_eq!(fb[3 * (50 * 256 + 100)..3 * (50 * 256 + 101)], HV_TO_RGB[0x16]);
    assert_eq!(fb[3 * (49 * 256 + 100)..3 * (49 * 256 + 101)], HV_TO_RGB[0x0F]);
    assert_eq!(fb[3 * (50 * 256 + 108)..3 * (50 * 256 + 109)], HV_TO_RGB[0x0F]);
}

// Sprite 0 against the background, at an X position, with a value for PPUMASK
#[test_case(1, 0, 0x1E, true ; "left edge without clipping")]
#[test_case(1, 0, 0x18, false ; "left edge clipped")]
#[test_case(1, 4, 0x18, true ; "partially clipped")]
#[test_case(1, 128, 0x18, true ; "middle")]
#[test_case(1, 254, 0x1E, true ; "second to last column")]
#[test_case(1, 255, 0x1E, false ; "last column never hits")]
#[test_case(0, 128, 0x1E, false ; "transparent background")]
#[test_case(1, 128, 0x10, false ; "background disabled")]
fn test_sprite_zero_hit(background_tile: u8, x: u8, mask: u8, hit: bool) {
    let mut nes = rendering_rom();
    fill_background(&mut nes, background_tile);
    nes.ppu.oam[0..4].copy_from_slice(&[100, 1, 0x00, x]);
    (4..0x100).for_each(|i| nes.ppu.oam[i] = 0xFF);
    nes.write_byte(0x2001, mask);
    step_to_scanline(&mut nes, 0);
    assert!(!nes.ppu.sprite_zero_hit());
    advance_nes_frames!(nes, 1);
    assert_eq!(nes.ppu.sprite_zero_hit(), hit);
}
#[test]
fn test_sprite_zero_hit_cleared_on_prerender() {
    let mut nes = rendering_rom();
    fill_background(&mut nes, 1);
    nes.ppu.oam[0..4].copy_from_slice(&[100, 1, 0x00, 50]);
    nes.write_byte(0x2001, 0x1E);
    advance_nes_frames!(nes, 1);
    assert!(nes.ppu.sprite_zero_hit());
    step_to_scanline(&mut nes, 0);
    assert!(!nes.ppu.sprite_zero_hit());
}
#[test]
fn test_sprite_overflow() {
    let mut nes = rendering_rom();
    fill_background(&mut nes, 0);
    (0..0x100).for_each(|i| nes.ppu.oam[i] = 0xFF);
    // Nine sprites on the same line
    (0..9).for_each(|i| nes.ppu.oam[4 * i] = 120);
    nes.write_byte(0x2001, 0x18);
    advance_nes_frames!(nes, 1);
    assert!(nes.ppu.sprite_overflow());
}
