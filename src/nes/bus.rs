use log::*;

use super::Nes;

impl Nes {
    /// Read a byte of memory given an address in CPU space.
    ///
    /// This takes no time, but has the same side effects as the CPU reading the address
    /// (i.e. clearing the PPU's VBlank flag or shifting a controller).
    /// Use [Nes::peek_byte] to look at memory without changing anything.
    /// ```
    /// let mut nes = famicore::Nes::new();
    /// // Read a byte of WRAM
    /// let byte = nes.read_byte(0x0123);
    /// // Read the PPU's status register
    /// let ppu_status = nes.read_byte(0x2002);
    /// ```
    pub fn read_byte(&mut self, addr: usize) -> u8 {
        let value = match addr {
            0x0000..=0x1FFF => self.mem[addr % 0x0800],
            0x2000..=0x3FFF => self.ppu.read_register(addr, &mut self.cartridge),
            // Reading $4015 does not drive bit 5
            0x4015 => {
                return (self.apu.read_status() & !0x20) | (self.open_bus & 0x20);
            }
            0x4016 | 0x4017 => {
                self.controllers[addr - 0x4016].read_bit() | (self.open_bus & 0xE0)
            }
            0x4000..=0x401F => self.open_bus,
            _ => self
                .cartridge
                .read_cpu(addr)
                .unwrap_or(self.open_bus),
        };
        self.open_bus = value;
        value
    }
    /// Read a byte of memory given an address in CPU space, without any side effects.
    pub fn peek_byte(&self, addr: usize) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.mem[addr % 0x0800],
            0x2000..=0x3FFF => self.ppu.peek_register(addr),
            0x4015 => (self.apu.peek_status() & !0x20) | (self.open_bus & 0x20),
            0x4016 | 0x4017 => {
                self.controllers[addr - 0x4016].peek_bit() | (self.open_bus & 0xE0)
            }
            0x4000..=0x401F => self.open_bus,
            _ => self.cartridge.read_cpu(addr).unwrap_or(self.open_bus),
        }
    }
    /// Write a byte using CPU memory.
    ///
    /// Like [Nes::read_byte], this takes no time.
    /// ```
    /// let mut nes = famicore::Nes::new();
    /// // Set a byte's value in ram
    /// nes.write_byte(0x00, 0x12);
    /// // Enable the NES's NMI by writing to the PPUCTRL register
    /// nes.write_byte(0x2000, 0x80);
    /// assert_eq!(nes.ppu.ctrl, 0x80);
    /// ```
    pub fn write_byte(&mut self, addr: usize, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..=0x1FFF => self.mem[addr % 0x0800] = value,
            0x2000..=0x3FFF => self.ppu.write_register(addr, value, &mut self.cartridge),
            0x4014 => self.oam_dma_page = Some(value),
            // Strobes both controllers
            0x4016 => self
                .controllers
                .iter_mut()
                .for_each(|c| c.write_strobe(value)),
            0x4000..=0x4017 => self.apu.write_register(addr, value),
            0x4018..=0x401F => debug!("Ignoring write to test register {:#06X}", addr),
            _ => self.cartridge.write_cpu(addr, value),
        }
    }

    // Clock everything else on the console for one CPU cycle
    fn tick_components(&mut self) {
        (0..3).for_each(|_| self.ppu.tick(&mut self.cartridge, &self.settings));
        self.apu.clock();
        self.cartridge.advance_cpu_cycles(1);
        self.cpu.cycles += 1;
    }
    // Sample the interrupt lines at the end of a cycle
    fn end_cycle(&mut self) {
        self.cpu.poll_interrupts(
            self.ppu.nmi_line(),
            self.apu.irq() || self.cartridge.irq(),
        );
    }
    // Let the DMC take the bus if it wants a sample byte.
    // The CPU is held for 4 cycles on a read, 3 on a write and 2 during OAM DMA.
    fn service_dmc_dma(&mut self, is_read: bool) {
        let Some(addr) = self.apu.dmc_dma_request() else {
            return;
        };
        let stall = if self.in_oam_dma {
            2
        } else if is_read {
            4
        } else {
            3
        };
        self.cpu.stall(stall);
        while self.cpu.take_stall_cycle() {
            self.tick_components();
            self.end_cycle();
        }
        let value = self.read_byte(addr as usize);
        trace!("DMC fetched {:02X} from {:#06X}", value, addr);
        self.apu.dmc_fill_buffer(value);
    }
    fn start_cycle(&mut self, is_read: bool) {
        self.service_dmc_dma(is_read);
        self.tick_components();
    }
    /// A single CPU read cycle
    pub(super) fn read_cycle(&mut self, addr: u16) -> u8 {
        self.start_cycle(true);
        let value = self.read_byte(addr as usize);
        self.end_cycle();
        value
    }
    /// A single CPU write cycle
    pub(super) fn write_cycle(&mut self, addr: u16, value: u8) {
        self.start_cycle(false);
        self.write_byte(addr as usize, value);
        self.end_cycle();
    }

    /// Copy a page of CPU memory into OAM, as triggered by a write to `$4014`.
    ///
    /// Takes 513 cycles, or 514 if it starts on an odd cycle.
    pub(super) fn run_oam_dma(&mut self, page: u8) {
        debug!("OAM DMA from page {:02X}", page);
        self.in_oam_dma = true;
        let halt_cycles = if self.cpu.cycles % 2 == 1 { 2 } else { 1 };
        (0..halt_cycles).for_each(|_| {
            self.start_cycle(true);
            self.end_cycle();
        });
        let base = (page as u16) << 8;
        (0..0x100).for_each(|i| {
            let value = self.read_cycle(base | i);
            self.write_cycle(0x2004, value);
        });
        self.in_oam_dma = false;
    }
}
