use crate::{palette::to_rgb, Cartridge, Settings, DEBUG_PALETTE, SCREEN_HEIGHT, SCREEN_WIDTH};
use log::*;

/// Number of dots per scanline
const DOTS_PER_SCANLINE: u16 = 341;
/// Index of the first vertical blank scanline
const VBLANK_SCANLINE: u16 = 241;
/// Index of the prerender scanline
const PRERENDER_SCANLINE: u16 = 261;
/// Number of render scanlines (scanlines during rendering)
const RENDER_SCANLINES: u16 = 240;

/// The picture processing unit of the NES.
///
/// Advanced one dot at a time by [Nes][crate::Nes], three dots per CPU cycle.
/// Background tiles go through the same shift registers as on hardware and sprites are
/// evaluated and fetched at the same dots, so everything a mapper can observe on the PPU's
/// address bus happens when it would on a real console.
/// The picture is written into an RGB framebuffer, see [Ppu::framebuffer].
pub struct Ppu {
    /// The Object Attribute Memory, or OAM
    pub oam: [u8; 0x100],
    /// The PPUCTRL register
    pub ctrl: u8,
    /// The PPUMASK register
    pub mask: u8,
    /// The PPUSTATUS register
    pub status: u8,
    /// The OAMADDR register
    pub oam_addr: u8,
    pub palette_ram: [u8; 0x20],
    /// Nametable RAM, big enough for four screen cartridges
    pub nametable_ram: [u8; 0x1000],
    /// Scanline currently being processed, between 0 and 261
    pub scanline: u16,
    /// Dot currently being processed, between 0 and 340
    pub dot: u16,
    /// Number of frames that have started vertical blank
    pub frame_count: u64,
    // Dots since power on, handed to the mapper with every address
    dots: u64,
    odd_frame: bool,
    // Loopy registers
    v: u16,
    t: u16,
    x: u8,
    w: bool,
    // PPUDATA read buffer
    read_buffer: u8,
    // Last value written to or read from a register
    open_bus: u8,
    // Background latches, filled by the fetches and loaded into the shifters every 8 dots
    next_tile: u8,
    next_attribute: u8,
    next_pattern_lo: u8,
    next_pattern_hi: u8,
    pattern_shift_lo: u16,
    pattern_shift_hi: u16,
    attribute_shift_lo: u16,
    attribute_shift_hi: u16,
    // Sprites found during evaluation, as copies of their OAM entries
    secondary_oam: [[u8; 4]; 8],
    secondary_count: usize,
    secondary_has_zero: bool,
    // Sprites being drawn on the current scanline
    sprite_count: usize,
    sprite_patterns: [(u8, u8); 8],
    sprite_x: [u8; 8],
    sprite_attributes: [u8; 8],
    sprite_zero_on_line: bool,
    framebuffer: Vec<u8>,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    /// Initialise a new PPU in its power-up state, positioned at the top left of the screen.
    pub fn new() -> Ppu {
        Ppu {
            oam: [0; 0x100],
            ctrl: 0,
            mask: 0,
            status: 0xA0,
            oam_addr: 0,
            palette_ram: [0; 0x20],
            nametable_ram: [0; 0x1000],
            scanline: 0,
            dot: 0,
            frame_count: 0,
            dots: 0,
            odd_frame: false,
            v: 0,
            t: 0,
            x: 0,
            w: false,
            read_buffer: 0,
            open_bus: 0,
            next_tile: 0,
            next_attribute: 0,
            next_pattern_lo: 0,
            next_pattern_hi: 0,
            pattern_shift_lo: 0,
            pattern_shift_hi: 0,
            attribute_shift_lo: 0,
            attribute_shift_hi: 0,
            secondary_oam: [[0xFF; 4]; 8],
            secondary_count: 0,
            secondary_has_zero: false,
            sprite_count: 0,
            sprite_patterns: [(0, 0); 8],
            sprite_x: [0; 8],
            sprite_attributes: [0; 8],
            sprite_zero_on_line: false,
            framebuffer: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT * 3],
        }
    }

    /// Read one of the PPU's registers given an address in CPU space.
    pub fn read_register(&mut self, addr: usize, cartridge: &mut Cartridge) -> u8 {
        match addr % 8 {
            2 => {
                let v = (self.status & 0xE0) | (self.open_bus & 0x1F);
                // VBlank is cleared on read
                self.status &= 0x7F;
                self.w = false;
                self.open_bus = v;
                v
            }
            4 => {
                let v = self.read_oam();
                self.open_bus = v;
                v
            }
            7 => {
                let addr = self.v & 0x3FFF;
                let v = if addr < 0x3F00 {
                    let buffered = self.read_buffer;
                    self.read_buffer = self.read_vram(addr, cartridge);
                    buffered
                } else {
                    // Palette reads are not buffered, the buffer gets the nametable byte underneath
                    self.read_buffer = self.read_vram(addr - 0x1000, cartridge);
                    (self.palette_ram[palette_index(addr)] & 0x3F) | (self.open_bus & 0xC0)
                };
                self.increment_v(cartridge);
                self.open_bus = v;
                v
            }
            _ => self.open_bus,
        }
    }
    /// Read one of the PPU's registers without side effects, for debugging
    pub fn peek_register(&self, addr: usize) -> u8 {
        match addr % 8 {
            2 => (self.status & 0xE0) | (self.open_bus & 0x1F),
            4 => self.read_oam(),
            7 => {
                let addr = self.v & 0x3FFF;
                if addr < 0x3F00 {
                    self.read_buffer
                } else {
                    (self.palette_ram[palette_index(addr)] & 0x3F) | (self.open_bus & 0xC0)
                }
            }
            _ => self.open_bus,
        }
    }
    /// Write to one of the PPU's registers given an address in CPU space.
    pub fn write_register(&mut self, addr: usize, value: u8, cartridge: &mut Cartridge) {
        self.open_bus = value;
        match addr % 8 {
            // PPUCTRL
            0 => {
                self.ctrl = value;
                self.t = (self.t & !0x0C00) | (((value & 0x03) as u16) << 10);
            }
            // PPUMASK
            1 => self.mask = value,
            // PPUSTATUS is read only
            2 => {}
            // OAMADDR
            3 => self.oam_addr = value,
            // OAMDATA
            4 => self.write_oam(value),
            // PPUSCROLL
            5 => {
                if self.w {
                    // Second write (Y)
                    self.t = (self.t & !0x73E0)
                        | (((value & 0x07) as u16) << 12)
                        | (((value & 0xF8) as u16) << 2);
                } else {
                    // First write (X)
                    self.t = (self.t & !0x001F) | (value >> 3) as u16;
                    self.x = value & 0x07;
                }
                self.w = !self.w;
            }
            // PPUADDR
            6 => {
                if self.w {
                    // Second write (LSB)
                    self.t = (self.t & 0xFF00) | value as u16;
                    self.v = self.t;
                    cartridge.notify_ppu_address(self.v, self.dots);
                } else {
                    // First write (MSB), bit 14 is cleared
                    self.t = (self.t & 0x00FF) | (((value & 0x3F) as u16) << 8);
                }
                self.w = !self.w;
            }
            // PPUDATA
            _ => {
                let addr = self.v & 0x3FFF;
                cartridge.notify_ppu_address(addr, self.dots);
                if addr < 0x2000 {
                    cartridge.write_ppu(addr as usize, value);
                } else if addr < 0x3F00 {
                    self.nametable_ram[cartridge.mirroring().nametable_index(addr as usize)] = value;
                } else {
                    self.palette_ram[palette_index(addr)] = value;
                }
                self.increment_v(cartridge);
            }
        }
    }
    /// Write a single byte to OAM at OAMADDR, then increment OAMADDR.
    ///
    /// Used by both `$2004` writes and OAM DMA.
    pub fn write_oam(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }
    fn read_oam(&self) -> u8 {
        let v = self.oam[self.oam_addr as usize];
        // The unimplemented bits of the attribute byte read back as 0
        if self.oam_addr % 4 == 2 {
            v & 0xE3
        } else {
            v
        }
    }
    // After a PPUDATA access
    fn increment_v(&mut self, cartridge: &mut Cartridge) {
        if self.rendering_enabled()
            && (self.scanline < RENDER_SCANLINES || self.scanline == PRERENDER_SCANLINE)
        {
            // Glitchy increment of both X and Y during rendering
            self.coarse_x_inc();
            self.fine_y_inc();
        } else {
            self.v = (self.v + if self.ctrl & 0x04 == 0 { 1 } else { 32 }) & 0x3FFF;
            cartridge.notify_ppu_address(self.v, self.dots);
        }
    }
    // Read a byte in PPU memory space, telling the mapper about the address
    fn read_vram(&mut self, addr: u16, cartridge: &mut Cartridge) -> u8 {
        let addr = addr & 0x3FFF;
        cartridge.notify_ppu_address(addr, self.dots);
        if addr < 0x2000 {
            cartridge.read_ppu(addr as usize)
        } else if addr < 0x3F00 {
            self.nametable_ram[cartridge.mirroring().nametable_index(addr as usize)]
        } else {
            self.palette_ram[palette_index(addr)]
        }
    }

    /// Whether the PPU is pulling the NMI line, i.e. VBlank has started and NMIs are enabled
    pub fn nmi_line(&self) -> bool {
        self.get_nmi_enabled() && (self.status & 0x80) != 0
    }

    /// Advance the PPU by a single dot.
    pub fn tick(&mut self, cartridge: &mut Cartridge, settings: &Settings) {
        let rendering = self.rendering_enabled();
        let render_line = self.scanline < RENDER_SCANLINES;
        let prerender = self.scanline == PRERENDER_SCANLINE;

        if rendering && (render_line || prerender) {
            self.background_step(cartridge);
            self.sprite_step(cartridge);
            if prerender && (280..=304).contains(&self.dot) {
                // Copy vertical bits from T to V
                self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
            }
        }
        if render_line && (1..=256).contains(&self.dot) {
            self.output_pixel(settings);
        }

        if self.scanline == VBLANK_SCANLINE && self.dot == 1 {
            self.status |= 0x80;
            self.frame_count += 1;
            trace!("VBlank, frame {}", self.frame_count);
        } else if prerender && self.dot == 1 {
            // Clear VBlank, sprite 0 hit and sprite overflow
            self.status &= 0x1F;
        }

        self.dots += 1;
        // The prerender scanline is one dot shorter on odd frames while rendering
        if prerender && self.dot == 339 && self.odd_frame && rendering {
            self.dot = 340;
        }
        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline > PRERENDER_SCANLINE {
                self.scanline = 0;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    fn background_step(&mut self, cartridge: &mut Cartridge) {
        let dot = self.dot;
        if (2..=257).contains(&dot) || (321..=337).contains(&dot) {
            self.shift_background();
            match (dot - 1) % 8 {
                0 => {
                    self.load_background_shifters();
                    self.next_tile = self.read_vram(0x2000 | (self.v & 0x0FFF), cartridge);
                }
                2 => {
                    let v = self.v;
                    let addr = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
                    let byte = self.read_vram(addr, cartridge);
                    let shift = ((v >> 4) & 0x04) | (v & 0x02);
                    self.next_attribute = (byte >> shift) & 0x03;
                }
                4 => {
                    let addr = self.background_tile_addr();
                    self.next_pattern_lo = self.read_vram(addr, cartridge);
                }
                6 => {
                    let addr = self.background_tile_addr() + 8;
                    self.next_pattern_hi = self.read_vram(addr, cartridge);
                }
                7 => self.coarse_x_inc(),
                _ => {}
            }
        }
        if dot == 256 {
            self.fine_y_inc();
        }
        if dot == 257 {
            self.load_background_shifters();
            // Copy horizontal bits from T to V
            self.v = (self.v & !0x041F) | (self.t & 0x041F);
        }
        if dot == 338 || dot == 340 {
            // Unused nametable fetches
            self.next_tile = self.read_vram(0x2000 | (self.v & 0x0FFF), cartridge);
        }
    }
    fn background_tile_addr(&self) -> u16 {
        self.nametable_tile_addr() + 16 * self.next_tile as u16 + ((self.v >> 12) & 0x07)
    }
    fn shift_background(&mut self) {
        self.pattern_shift_lo <<= 1;
        self.pattern_shift_hi <<= 1;
        self.attribute_shift_lo <<= 1;
        self.attribute_shift_hi <<= 1;
    }
    fn load_background_shifters(&mut self) {
        self.pattern_shift_lo = (self.pattern_shift_lo & 0xFF00) | self.next_pattern_lo as u16;
        self.pattern_shift_hi = (self.pattern_shift_hi & 0xFF00) | self.next_pattern_hi as u16;
        let fill = |bit: bool| if bit { 0xFF } else { 0x00 };
        self.attribute_shift_lo =
            (self.attribute_shift_lo & 0xFF00) | fill(self.next_attribute & 0x01 != 0);
        self.attribute_shift_hi =
            (self.attribute_shift_hi & 0xFF00) | fill(self.next_attribute & 0x02 != 0);
    }

    fn sprite_step(&mut self, cartridge: &mut Cartridge) {
        let dot = self.dot;
        if dot == 257 {
            if self.scanline < RENDER_SCANLINES {
                self.evaluate_sprites();
            } else {
                // No evaluation on the prerender line, line 0 never has sprites
                self.secondary_count = 0;
                self.secondary_has_zero = false;
            }
            self.sprite_count = self.secondary_count;
            self.sprite_zero_on_line = self.secondary_has_zero;
        }
        if (257..=320).contains(&dot) {
            let slot = ((dot - 257) / 8) as usize;
            match (dot - 257) % 8 {
                0 => {
                    self.read_vram(0x2000 | (self.v & 0x0FFF), cartridge);
                }
                2 => {
                    self.read_vram(0x23C0 | (self.v & 0x0C00), cartridge);
                }
                4 => {
                    let addr = self.sprite_tile_addr(slot);
                    let lo = self.read_vram(addr, cartridge);
                    self.sprite_patterns[slot].0 = self.flip_sprite_byte(slot, lo);
                }
                6 => {
                    let addr = self.sprite_tile_addr(slot) + 8;
                    let hi = self.read_vram(addr, cartridge);
                    self.sprite_patterns[slot].1 = self.flip_sprite_byte(slot, hi);
                    if slot < self.sprite_count {
                        self.sprite_x[slot] = self.secondary_oam[slot][3];
                        self.sprite_attributes[slot] = self.secondary_oam[slot][2];
                    } else {
                        self.sprite_patterns[slot] = (0, 0);
                    }
                }
                _ => {}
            }
        }
    }
    // Find the sprites on the next scanline, setting the overflow flag with the hardware's bug
    fn evaluate_sprites(&mut self) {
        let height = self.sprite_height();
        let line = self.scanline;
        let in_range = |y: u8| line >= y as u16 && line < y as u16 + height;
        self.secondary_count = 0;
        self.secondary_has_zero = false;
        self.secondary_oam = [[0xFF; 4]; 8];
        let mut n = 0;
        while n < 64 && self.secondary_count < 8 {
            let entry = &self.oam[4 * n..4 * n + 4];
            if in_range(entry[0]) {
                self.secondary_oam[self.secondary_count].copy_from_slice(entry);
                self.secondary_count += 1;
                if n == 0 {
                    self.secondary_has_zero = true;
                }
            }
            n += 1;
        }
        // With 8 sprites found, the PPU keeps looking but increments the byte index
        // along with the sprite index, reading X, tile or attribute bytes as Y
        let mut m = 0;
        while n < 64 {
            if in_range(self.oam[4 * n + m]) {
                self.status |= 0x20;
                break;
            }
            n += 1;
            m = (m + 1) & 0x03;
        }
    }
    fn sprite_tile_addr(&self, slot: usize) -> u16 {
        if slot >= self.secondary_count {
            // Empty slots fetch tile $FF
            return if self.is_8x16_sprites() {
                0x1FF0
            } else {
                self.spr_pattern_table_addr() + 0xFF0
            };
        }
        let [y, tile, attributes, _] = self.secondary_oam[slot];
        let height = self.sprite_height();
        let mut row = self.scanline.wrapping_sub(y as u16) % height;
        if attributes & 0x80 != 0 {
            row = height - 1 - row;
        }
        if self.is_8x16_sprites() {
            let table = (tile as u16 & 0x01) * 0x1000;
            let tile = (tile & 0xFE) as u16 + if row >= 8 { 1 } else { 0 };
            table + 16 * tile + (row % 8)
        } else {
            self.spr_pattern_table_addr() + 16 * tile as u16 + row
        }
    }
    fn flip_sprite_byte(&self, slot: usize, value: u8) -> u8 {
        if slot < self.secondary_count && self.secondary_oam[slot][2] & 0x40 != 0 {
            value.reverse_bits()
        } else {
            value
        }
    }

    // Compute the pixel at the current dot and write it to the framebuffer
    fn output_pixel(&mut self, settings: &Settings) {
        let x = (self.dot - 1) as usize;
        let y = self.scanline as usize;

        let (bg_pixel, bg_palette) =
            if self.is_background_rendering_enabled() && !(x < 8 && self.background_left_clipping()) {
                let bit = 0x8000 >> self.x;
                let p0 = (self.pattern_shift_lo & bit != 0) as u8;
                let p1 = (self.pattern_shift_hi & bit != 0) as u8;
                let a0 = (self.attribute_shift_lo & bit != 0) as u8;
                let a1 = (self.attribute_shift_hi & bit != 0) as u8;
                ((p1 << 1) | p0, (a1 << 1) | a0)
            } else {
                (0, 0)
            };

        let mut sprite = None;
        if self.is_sprite_rendering_enabled() && !(x < 8 && self.sprite_left_clipping()) {
            sprite = (0..self.sprite_count).find_map(|i| {
                let offset = x.wrapping_sub(self.sprite_x[i] as usize);
                if offset >= 8 {
                    return None;
                }
                let (lo, hi) = self.sprite_patterns[i];
                let shift = 7 - offset;
                let pixel = (((hi >> shift) & 0x01) << 1) | ((lo >> shift) & 0x01);
                if pixel == 0 {
                    None
                } else {
                    Some((i, pixel, self.sprite_attributes[i]))
                }
            });
        }

        let palette_entry = match sprite {
            Some((i, sprite_pixel, attributes)) => {
                if bg_pixel != 0 && i == 0 && self.sprite_zero_on_line && x != 255 {
                    self.status |= 0x40;
                }
                let sprite_entry = 0x10 | ((attributes & 0x03) << 2) | sprite_pixel;
                if bg_pixel == 0 || attributes & 0x20 == 0 || settings.always_sprites_on_top {
                    sprite_entry
                } else {
                    (bg_palette << 2) | bg_pixel
                }
            }
            None if bg_pixel != 0 => (bg_palette << 2) | bg_pixel,
            None => 0,
        };

        let mut hv = if settings.use_debug_palette {
            DEBUG_PALETTE[palette_index(palette_entry as u16)]
        } else {
            self.palette_ram[palette_index(palette_entry as u16)]
        };
        if self.is_greyscale_mode_on() {
            hv &= 0x30;
        }
        let rgb = to_rgb(hv, self.mask >> 5);
        let i = 3 * (y * SCREEN_WIDTH + x);
        self.framebuffer[i..i + 3].copy_from_slice(&rgb);
    }

    // Coarse X increment on V
    fn coarse_x_inc(&mut self) {
        // Go to next tile or horizontal nametable
        self.v = if self.v & 0x1F == 0x1F {
            self.v ^ 0x41F
        } else {
            self.v + 1
        };
    }
    // Fine Y increment on V
    fn fine_y_inc(&mut self) {
        self.v = if self.v & 0x7000 == 0x7000 {
            // Coarse Y wraps at 30, not 32
            if self.v & 0x3E0 == 0x3A0 {
                // Switch vertical nametable and reset both coarse and fine Y
                self.v ^ (0x800 | 0x3A0 | 0x7000)
            } else if self.v & 0x3E0 == 0x3E0 {
                self.v ^ (0x7000 | 0x3E0)
            } else {
                // Reset fine Y and increment coarse Y
                self.v - 0x7000 + 0x20
            }
        } else {
            self.v + 0x1000
        };
    }

    /// The picture, as 256x240 RGB triplets in row major order
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }
    /// The current VRAM address (loopy `v`)
    pub fn vram_addr(&self) -> u16 {
        self.v
    }
    /// The temporary VRAM address (loopy `t`)
    pub fn temp_vram_addr(&self) -> u16 {
        self.t
    }
    pub fn fine_x(&self) -> u8 {
        self.x
    }
    pub fn rendering_enabled(&self) -> bool {
        self.is_background_rendering_enabled() || self.is_sprite_rendering_enabled()
    }
    fn sprite_height(&self) -> u16 {
        if self.is_8x16_sprites() {
            16
        } else {
            8
        }
    }
    /// PPUCTRL bit 5, sprites are two tiles tall
    pub fn is_8x16_sprites(&self) -> bool {
        (self.ctrl & 0x20) != 0
    }
    /// PPUMASK bit 4
    pub fn is_sprite_rendering_enabled(&self) -> bool {
        (self.mask & 0x10) != 0
    }
    /// PPUMASK bit 3
    pub fn is_background_rendering_enabled(&self) -> bool {
        (self.mask & 0x08) != 0
    }
    /// PPUMASK bit 2 clear, sprites are hidden in the leftmost 8 columns
    pub fn sprite_left_clipping(&self) -> bool {
        (self.mask & 0x04) == 0
    }
    /// PPUMASK bit 1 clear, the background is hidden in the leftmost 8 columns
    pub fn background_left_clipping(&self) -> bool {
        (self.mask & 0x02) == 0
    }
    pub fn is_greyscale_mode_on(&self) -> bool {
        (self.mask & 0x01) != 0
    }
    /// Pattern table for 8x8 sprites
    pub fn spr_pattern_table_addr(&self) -> u16 {
        if self.ctrl & 0x08 != 0 {
            0x1000
        } else {
            0x0000
        }
    }
    /// Pattern table for the background
    pub fn nametable_tile_addr(&self) -> u16 {
        if self.ctrl & 0x10 != 0 {
            0x1000
        } else {
            0x0000
        }
    }
    /// PPUCTRL bit 7, raise NMI at the start of VBlank
    pub fn get_nmi_enabled(&self) -> bool {
        self.ctrl & 0x80 != 0
    }
    /// PPUSTATUS bit 6
    pub fn sprite_zero_hit(&self) -> bool {
        (self.status & 0x40) != 0
    }
    /// PPUSTATUS bit 5
    pub fn sprite_overflow(&self) -> bool {
        (self.status & 0x20) != 0
    }
}

/// Index into palette RAM for an address in `$3F00-$3FFF`.
///
/// The backdrop entries of the sprite palettes mirror those of the background palettes.
fn palette_index(addr: u16) -> usize {
    let a = (addr & 0x1F) as usize;
    if a & 0x13 == 0x10 {
        a & !0x10
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_hex::assert_eq_hex;

    fn setup() -> (Ppu, Cartridge) {
        (Ppu::new(), Cartridge::blank())
    }
    fn set_addr(ppu: &mut Ppu, cart: &mut Cartridge, addr: u16) {
        ppu.write_register(0x2006, (addr >> 8) as u8, cart);
        ppu.write_register(0x2006, addr as u8, cart);
    }

    #[test]
    fn test_palette_mirrors() {
        assert_eq!(palette_index(0x3F10), 0x00);
        assert_eq!(palette_index(0x3F14), 0x04);
        assert_eq!(palette_index(0x3F11), 0x11);
        assert_eq!(palette_index(0x3F3C), 0x0C);
        assert_eq!(palette_index(0x3FFF), 0x1F);
    }
    #[test]
    fn test_buffered_reads() {
        let (mut ppu, mut cart) = setup();
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.write_register(0x2007, 0x11, &mut cart);
        ppu.write_register(0x2007, 0x22, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.read_register(0x2007, &mut cart);
        assert_eq_hex!(ppu.read_register(0x2007, &mut cart), 0x11);
        assert_eq_hex!(ppu.read_register(0x2007, &mut cart), 0x22);
    }
    #[test]
    fn test_palette_reads_are_immediate() {
        let (mut ppu, mut cart) = setup();
        set_addr(&mut ppu, &mut cart, 0x3F10);
        ppu.write_register(0x2007, 0x2A, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x3F00);
        assert_eq_hex!(ppu.read_register(0x2007, &mut cart) & 0x3F, 0x2A);
    }
    #[test]
    fn test_peek_register() {
        let (mut ppu, mut cart) = setup();
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.write_register(0x2007, 0x11, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.read_register(0x2007, &mut cart);
        // The buffer is seen without moving the address
        assert_eq_hex!(ppu.peek_register(0x2007), 0x11);
        assert_eq_hex!(ppu.peek_register(0x2007), 0x11);
        assert_eq_hex!(ppu.vram_addr(), 0x2001);
        // VBlank stays set
        assert_eq_hex!(ppu.peek_register(0x2002) & 0x80, 0x80);
        assert_eq_hex!(ppu.peek_register(0x3FFA) & 0x80, 0x80);
        // Palette entries are read directly
        set_addr(&mut ppu, &mut cart, 0x3F01);
        ppu.write_register(0x2007, 0x2C, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x3F01);
        assert_eq_hex!(ppu.peek_register(0x2007) & 0x3F, 0x2C);
    }
    #[test]
    fn test_increment_32() {
        let (mut ppu, mut cart) = setup();
        ppu.write_register(0x2000, 0x04, &mut cart);
        set_addr(&mut ppu, &mut cart, 0x2000);
        ppu.write_register(0x2007, 0x00, &mut cart);
        assert_eq_hex!(ppu.vram_addr(), 0x2020);
    }
    #[test]
    fn test_scroll_registers() {
        let (mut ppu, mut cart) = setup();
        ppu.write_register(0x2000, 0x03, &mut cart);
        ppu.write_register(0x2005, 0x7D, &mut cart);
        ppu.write_register(0x2005, 0x5E, &mut cart);
        // fine Y 110, nametable 11, coarse Y 01011, coarse X 01111
        assert_eq_hex!(ppu.temp_vram_addr(), 0b110_11_01011_01111);
        assert_eq!(ppu.fine_x(), 0x05);
        // Reading status resets the write toggle
        ppu.write_register(0x2006, 0x3D, &mut cart);
        ppu.read_register(0x2002, &mut cart);
        ppu.write_register(0x2006, 0x21, &mut cart);
        ppu.write_register(0x2006, 0x08, &mut cart);
        assert_eq_hex!(ppu.vram_addr(), 0x2108);
    }
    #[test]
    fn test_prerender_copies_scroll_into_v() {
        let (mut ppu, mut cart) = setup();
        let settings = Settings::default();
        ppu.write_register(0x2000, 0x01, &mut cart);
        ppu.write_register(0x2005, 0x7D, &mut cart);
        ppu.write_register(0x2005, 0x5E, &mut cart);
        assert_eq_hex!(ppu.temp_vram_addr(), 0x656F);
        ppu.mask = 0x08;
        ppu.scanline = PRERENDER_SCANLINE;
        ppu.dot = 0;
        let mut tick_to = |ppu: &mut Ppu, scanline: u16, dot: u16| {
            while (ppu.scanline, ppu.dot) != (scanline, dot) {
                ppu.tick(&mut cart, &settings);
            }
        };
        // Horizontal bits at dot 257
        tick_to(&mut ppu, PRERENDER_SCANLINE, 258);
        assert_eq_hex!(ppu.vram_addr() & 0x041F, 0x040F);
        // Vertical bits over dots 280 to 304
        tick_to(&mut ppu, PRERENDER_SCANLINE, 305);
        assert_eq_hex!(ppu.vram_addr(), 0x656F);
        // The first two tiles of line 0 are fetched ahead of time
        tick_to(&mut ppu, 0, 0);
        assert_eq_hex!(ppu.vram_addr(), 0x6571);
        assert_eq!(ppu.fine_x(), 5);
    }
    #[test]
    fn test_vblank_timing() {
        let (mut ppu, mut cart) = setup();
        let settings = Settings::default();
        ppu.status = 0;
        ppu.ctrl = 0x80;
        while !(ppu.scanline == VBLANK_SCANLINE && ppu.dot == 1) {
            ppu.tick(&mut cart, &settings);
        }
        assert!(!ppu.nmi_line());
        ppu.tick(&mut cart, &settings);
        assert!(ppu.nmi_line());
        assert_eq!(ppu.frame_count, 1);
        // Reading status clears VBlank and with it the NMI line
        assert_eq!(ppu.read_register(0x2002, &mut cart) & 0x80, 0x80);
        assert!(!ppu.nmi_line());
    }
    #[test]
    fn test_frame_length() {
        let (mut ppu, mut cart) = setup();
        let settings = Settings::default();
        // Rendering disabled, every frame is 341 * 262 dots
        for _ in 0..(341 * 262 * 2) {
            ppu.tick(&mut cart, &settings);
        }
        assert_eq!((ppu.scanline, ppu.dot), (0, 0));
        // Rendering enabled, odd frames skip a dot
        ppu.mask = 0x08;
        for _ in 0..(341 * 262 * 2 - 1) {
            ppu.tick(&mut cart, &settings);
        }
        assert_eq!((ppu.scanline, ppu.dot), (0, 0));
    }
    #[test]
    fn test_sprite_overflow_bug() {
        let (mut ppu, _) = setup();
        ppu.oam = [0xF0; 0x100];
        // 8 sprites on line 10
        (0..8).for_each(|i| ppu.oam[4 * i] = 10);
        ppu.scanline = 10;
        ppu.evaluate_sprites();
        assert!(!ppu.sprite_overflow());
        // The 9th sprite is checked properly
        ppu.oam[4 * 8] = 5;
        ppu.evaluate_sprites();
        assert!(ppu.sprite_overflow());
        // But the 10th sprite's X is read as its Y
        ppu.status = 0;
        ppu.oam[4 * 8] = 0xF0;
        ppu.oam[4 * 9] = 10;
        ppu.evaluate_sprites();
        assert!(!ppu.sprite_overflow());
        ppu.oam[4 * 9 + 1] = 10;
        ppu.evaluate_sprites();
        assert!(ppu.sprite_overflow());
    }
}
