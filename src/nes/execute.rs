use log::*;

use super::{InstructionRecord, Nes, NUMBER_STORED_INSTRUCTIONS};
use crate::{
    opcodes::{Access, AddressingMode, Opcode, Operation, OPCODES},
    IRQ_VECTOR_ADDR, NMI_VECTOR_ADDR, RESET_VECTOR_ADDR,
};

// Where an instruction's operand lives once its addressing mode has been resolved
enum Operand {
    Implied,
    Accumulator,
    Immediate(u8),
    Address(u16),
}

impl Nes {
    /// Execute the next instruction.
    ///
    /// Also runs the OAM DMA the instruction triggers and the interrupt sequence for any
    /// interrupt that was pending before its last cycle.
    /// Returns the number of CPU cycles elapsed, or 0 if no ROM is loaded.
    pub fn step(&mut self) -> u32 {
        if !self.loaded {
            debug!("Ignoring step, no cartridge loaded");
            return 0;
        }
        let start = self.cpu.cycles;
        if self.cpu.jammed {
            // The address bus is left at $FFFF while the rest of the console keeps running
            self.read_cycle(0xFFFF);
            return (self.cpu.cycles - start) as u32;
        }
        self.record_instruction();
        self.execute_instruction();
        if let Some(page) = self.oam_dma_page.take() {
            self.run_oam_dma(page);
        }
        if self.cpu.interrupt_requested() && !self.cpu.jammed {
            self.interrupt_sequence(false);
        }
        (self.cpu.cycles - start) as u32
    }

    fn record_instruction(&mut self) {
        let pc = self.cpu.p_c;
        let opcode = self.peek_byte(pc as usize);
        let len = OPCODES[opcode as usize].bytes();
        let record = InstructionRecord {
            pc,
            bytes: [
                opcode,
                self.peek_byte(pc.wrapping_add(1) as usize),
                self.peek_byte(pc.wrapping_add(2) as usize),
            ],
            len,
        };
        if log_enabled!(Level::Trace) {
            trace!("{:<32} {:?}", record.to_string(), self.cpu);
        }
        if self.recent_instructions.len() == NUMBER_STORED_INSTRUCTIONS {
            self.recent_instructions.pop_front();
        }
        self.recent_instructions.push_back(record);
    }

    // Read the byte at PC and advance PC
    fn fetch_byte(&mut self) -> u8 {
        let v = self.read_cycle(self.cpu.p_c);
        self.cpu.p_c = self.cpu.p_c.wrapping_add(1);
        v
    }
    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }
    fn push(&mut self, value: u8) {
        self.write_cycle(0x100 | self.cpu.s_p as u16, value);
        self.cpu.s_p = self.cpu.s_p.wrapping_sub(1);
    }
    fn pull(&mut self) -> u8 {
        self.cpu.s_p = self.cpu.s_p.wrapping_add(1);
        self.read_cycle(0x100 | self.cpu.s_p as u16)
    }
    // Read from the top of the stack without moving the stack pointer
    fn dummy_stack_read(&mut self) {
        self.read_cycle(0x100 | self.cpu.s_p as u16);
    }
    fn dummy_pc_read(&mut self) {
        self.read_cycle(self.cpu.p_c);
    }

    fn execute_instruction(&mut self) {
        let opcode = OPCODES[self.fetch_byte() as usize];
        match opcode.operation.access() {
            Access::Read => {
                let value = match self.resolve_operand(opcode, Access::Read) {
                    Operand::Immediate(v) => v,
                    Operand::Address(addr) => self.read_cycle(addr),
                    Operand::Accumulator => self.cpu.a,
                    Operand::Implied => 0,
                };
                self.cpu.execute_read(opcode.operation, value);
            }
            Access::Write => {
                if let Operand::Address(addr) = self.resolve_operand(opcode, Access::Write) {
                    self.store(opcode, addr);
                }
            }
            Access::ReadModifyWrite => match self.resolve_operand(opcode, Access::ReadModifyWrite) {
                Operand::Address(addr) => {
                    let value = self.read_cycle(addr);
                    // The unmodified value is written back first
                    self.write_cycle(addr, value);
                    let result = self.cpu.execute_modify(opcode.operation, value);
                    self.write_cycle(addr, result);
                }
                _ => self.cpu.a = self.cpu.execute_modify(opcode.operation, self.cpu.a),
            },
            Access::Control => self.execute_control(opcode),
        }
    }

    // Work out the operand's location, performing all the cycles (including dummy reads)
    // the addressing mode takes before the final access
    fn resolve_operand(&mut self, opcode: Opcode, access: Access) -> Operand {
        use AddressingMode::*;
        match opcode.mode {
            Implied => {
                self.dummy_pc_read();
                Operand::Implied
            }
            Accumulator => {
                self.dummy_pc_read();
                Operand::Accumulator
            }
            Immediate => Operand::Immediate(self.fetch_byte()),
            ZeroPage => Operand::Address(self.fetch_byte() as u16),
            ZeroPageX | ZeroPageY => {
                let base = self.fetch_byte();
                self.read_cycle(base as u16);
                let index = if opcode.mode == ZeroPageX {
                    self.cpu.x
                } else {
                    self.cpu.y
                };
                Operand::Address(base.wrapping_add(index) as u16)
            }
            Absolute => Operand::Address(self.fetch_word()),
            AbsoluteX => {
                let base = self.fetch_word();
                self.indexed(base, self.cpu.x, access)
            }
            AbsoluteY => {
                let base = self.fetch_word();
                self.indexed(base, self.cpu.y, access)
            }
            IndexedIndirect => {
                let ptr = self.fetch_byte();
                self.read_cycle(ptr as u16);
                let ptr = ptr.wrapping_add(self.cpu.x);
                let lo = self.read_cycle(ptr as u16) as u16;
                let hi = self.read_cycle(ptr.wrapping_add(1) as u16) as u16;
                Operand::Address((hi << 8) | lo)
            }
            IndirectIndexed => {
                let ptr = self.fetch_byte();
                let lo = self.read_cycle(ptr as u16) as u16;
                let hi = self.read_cycle(ptr.wrapping_add(1) as u16) as u16;
                self.indexed((hi << 8) | lo, self.cpu.y, access)
            }
            // Only used by control operations
            Indirect | Relative => Operand::Implied,
        }
    }
    // Add an index to an absolute address.
    // The CPU reads from the address before the high byte is fixed up, which for reads
    // only happens when a page is crossed.
    fn indexed(&mut self, base: u16, index: u8, access: Access) -> Operand {
        let addr = base.wrapping_add(index as u16);
        if (base & 0xFF00) != (addr & 0xFF00) || access != Access::Read {
            self.read_cycle((base & 0xFF00) | (addr & 0x00FF));
        }
        Operand::Address(addr)
    }

    fn store(&mut self, opcode: Opcode, addr: u16) {
        use Operation::*;
        let cpu = &mut self.cpu;
        // The unstable stores AND with the high byte of the base address plus one
        let index = if opcode.operation == SHY {
            cpu.x
        } else {
            cpu.y
        };
        let base = addr.wrapping_sub(index as u16);
        let h = ((base >> 8) as u8).wrapping_add(1);
        let value = match opcode.operation {
            STA => cpu.a,
            STX => cpu.x,
            STY => cpu.y,
            SAX => cpu.a & cpu.x,
            SHA => cpu.a & cpu.x & h,
            SHX => cpu.x & h,
            SHY => cpu.y & h,
            TAS => {
                cpu.s_p = cpu.a & cpu.x;
                cpu.s_p & h
            }
            _ => 0,
        };
        let addr = match opcode.operation {
            SHA | SHX | SHY | TAS if (base & 0xFF00) != (addr & 0xFF00) => {
                ((value as u16) << 8) | (addr & 0x00FF)
            }
            _ => addr,
        };
        self.write_cycle(addr, value);
    }

    fn execute_control(&mut self, opcode: Opcode) {
        use Operation::*;
        match opcode.operation {
            BCC | BCS | BEQ | BMI | BNE | BPL | BVC | BVS => {
                let offset = self.fetch_byte();
                if self.cpu.branch_taken(opcode.operation) {
                    self.dummy_pc_read();
                    let pc = self.cpu.p_c;
                    let target = pc.wrapping_add(offset as i8 as u16);
                    if (pc & 0xFF00) != (target & 0xFF00) {
                        self.read_cycle((pc & 0xFF00) | (target & 0x00FF));
                    }
                    self.cpu.p_c = target;
                }
            }
            JMP if opcode.mode == AddressingMode::Absolute => {
                self.cpu.p_c = self.fetch_word();
            }
            JMP => {
                let ptr = self.fetch_word();
                let lo = self.read_cycle(ptr) as u16;
                // The high byte is read without carrying into the pointer's high byte
                let hi = self.read_cycle((ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;
                self.cpu.p_c = (hi << 8) | lo;
            }
            JSR => {
                let lo = self.fetch_byte() as u16;
                self.dummy_stack_read();
                self.push((self.cpu.p_c >> 8) as u8);
                self.push(self.cpu.p_c as u8);
                let hi = self.read_cycle(self.cpu.p_c) as u16;
                self.cpu.p_c = (hi << 8) | lo;
            }
            RTS => {
                self.dummy_pc_read();
                self.dummy_stack_read();
                let lo = self.pull() as u16;
                let hi = self.pull() as u16;
                self.cpu.p_c = (hi << 8) | lo;
                self.fetch_byte();
            }
            RTI => {
                self.dummy_pc_read();
                self.dummy_stack_read();
                let p = self.pull();
                self.cpu.s_r.from_byte(p);
                let lo = self.pull() as u16;
                let hi = self.pull() as u16;
                self.cpu.p_c = (hi << 8) | lo;
            }
            PHA => {
                self.dummy_pc_read();
                self.push(self.cpu.a);
            }
            PHP => {
                self.dummy_pc_read();
                self.push(self.cpu.s_r.to_stack_byte(true));
            }
            PLA => {
                self.dummy_pc_read();
                self.dummy_stack_read();
                let v = self.pull();
                self.cpu.lda(v);
            }
            PLP => {
                self.dummy_pc_read();
                self.dummy_stack_read();
                let v = self.pull();
                self.cpu.s_r.from_byte(v);
            }
            BRK => {
                // The byte after BRK is skipped
                self.fetch_byte();
                self.interrupt_sequence(true);
            }
            JAM => {
                self.dummy_pc_read();
                self.cpu.p_c = self.cpu.p_c.wrapping_sub(1);
                self.cpu.jammed = true;
                warn!("CPU jammed by opcode at {:#06X}", self.cpu.p_c);
            }
            _ => {
                self.dummy_pc_read();
                self.cpu.execute_implied(opcode.operation);
            }
        }
    }

    /// Push PC and the status register and jump through the NMI or IRQ vector.
    ///
    /// The vector is picked when the status register is pushed, so an NMI arriving during
    /// a BRK or IRQ sequence takes it over.
    fn interrupt_sequence(&mut self, brk: bool) {
        if !brk {
            self.dummy_pc_read();
            self.dummy_pc_read();
        }
        self.push((self.cpu.p_c >> 8) as u8);
        self.push(self.cpu.p_c as u8);
        let vector = if self.cpu.take_nmi() {
            NMI_VECTOR_ADDR
        } else {
            IRQ_VECTOR_ADDR
        } as u16;
        self.push(self.cpu.s_r.to_stack_byte(brk));
        self.cpu.s_r.i = true;
        let lo = self.read_cycle(vector) as u16;
        let hi = self.read_cycle(vector + 1) as u16;
        self.cpu.p_c = (hi << 8) | lo;
    }
    /// Run the reset sequence.
    ///
    /// Looks like an interrupt whose pushes are turned into reads, so the stack pointer
    /// still drops by 3.
    pub(super) fn reset_sequence(&mut self) {
        self.dummy_pc_read();
        self.dummy_pc_read();
        (0..3).for_each(|_| {
            self.dummy_stack_read();
            self.cpu.s_p = self.cpu.s_p.wrapping_sub(1);
        });
        self.cpu.s_r.i = true;
        let lo = self.read_cycle(RESET_VECTOR_ADDR as u16) as u16;
        let hi = self.read_cycle(RESET_VECTOR_ADDR as u16 + 1) as u16;
        self.cpu.p_c = (hi << 8) | lo;
    }
}
