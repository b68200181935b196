use std::fmt::Debug;

use crate::{opcodes::Operation, StatusRegister};

/// The CPU of the NES.
///
/// Holds the registers, the arithmetic of every operation and the interrupt latches.
/// Memory access and timing are driven by [Nes][crate::Nes], which owns the bus.
#[derive(Clone)]
pub struct Cpu {
    /// Accumulator
    pub a: u8,
    /// X index register
    pub x: u8,
    /// Y index register
    pub y: u8,
    /// Program counter
    pub p_c: u16,
    /// Stack pointer
    pub s_p: u8,
    /// Status register
    pub s_r: StatusRegister,
    /// Total number of cycles elapsed since power on
    pub cycles: u64,
    /// Set once a JAM opcode has been executed, cleared on reset
    pub jammed: bool,
    // Cycles the CPU still has to sit out (DMC DMA)
    stall_cycles: u32,
    // Last level seen on the NMI line
    nmi_line: bool,
    // NMI edge latched this cycle and last cycle
    nmi_pending: bool,
    prev_nmi_pending: bool,
    // IRQ line (masked by I) this cycle and last cycle
    irq_pending: bool,
    prev_irq_pending: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// Create a CPU in its power-up state.
    ///
    /// The stack pointer starts at 0 and is moved to 0xFD by the reset sequence.
    pub fn new() -> Cpu {
        Cpu {
            a: 0,
            x: 0,
            y: 0,
            p_c: 0,
            s_p: 0,
            s_r: StatusRegister::new(),
            cycles: 0,
            jammed: false,
            stall_cycles: 0,
            nmi_line: false,
            nmi_pending: false,
            prev_nmi_pending: false,
            irq_pending: false,
            prev_irq_pending: false,
        }
    }
    /// Stall the CPU for a number of cycles.
    ///
    /// Used by the DMC's sample fetch, which takes the bus away from the CPU.
    /// The stalled cycles still clock the rest of the console.
    pub fn stall(&mut self, cycles: u32) {
        self.stall_cycles += cycles;
    }
    /// Take one stalled cycle, returning `false` if there are none left
    pub(crate) fn take_stall_cycle(&mut self) -> bool {
        if self.stall_cycles == 0 {
            return false;
        }
        self.stall_cycles -= 1;
        true
    }
    /// Sample the interrupt lines at the end of a cycle.
    ///
    /// NMI is edge triggered, IRQ is level triggered and masked by `I`.
    pub(crate) fn poll_interrupts(&mut self, nmi_line: bool, irq_line: bool) {
        self.prev_nmi_pending = self.nmi_pending;
        if nmi_line && !self.nmi_line {
            self.nmi_pending = true;
        }
        self.nmi_line = nmi_line;
        self.prev_irq_pending = self.irq_pending;
        self.irq_pending = irq_line && !self.s_r.i;
    }
    /// Whether an interrupt was pending before the last cycle of the instruction just executed
    pub(crate) fn interrupt_requested(&self) -> bool {
        self.prev_nmi_pending || self.prev_irq_pending
    }
    /// Consume a pending NMI, returning `true` if there was one.
    ///
    /// Called when an interrupt sequence picks its vector, so an NMI can hijack a BRK or IRQ.
    pub(crate) fn take_nmi(&mut self) -> bool {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.prev_nmi_pending = false;
            true
        } else {
            false
        }
    }

    fn set_zn(&mut self, value: u8) {
        self.s_r.z = value == 0;
        self.s_r.n = (value & 0x80) != 0;
    }
    pub fn lda(&mut self, value: u8) {
        self.a = value;
        self.set_zn(value);
    }
    pub fn ldx(&mut self, value: u8) {
        self.x = value;
        self.set_zn(value);
    }
    pub fn ldy(&mut self, value: u8) {
        self.y = value;
        self.set_zn(value);
    }
    pub fn lax(&mut self, value: u8) {
        self.lda(value);
        self.x = value;
    }
    /// Add with carry. Decimal mode is ignored, as on the 2A03.
    pub fn adc(&mut self, value: u8) {
        let sum = self.a as u16 + value as u16 + self.s_r.c as u16;
        let result = sum as u8;
        self.s_r.c = sum > 0xFF;
        // Both inputs share a sign that the result does not
        self.s_r.v = ((self.a ^ result) & (value ^ result) & 0x80) != 0;
        self.a = result;
        self.set_zn(result);
    }
    pub fn sbc(&mut self, value: u8) {
        self.adc(!value);
    }
    pub fn and(&mut self, value: u8) {
        self.a &= value;
        self.set_zn(self.a);
    }
    pub fn ora(&mut self, value: u8) {
        self.a |= value;
        self.set_zn(self.a);
    }
    pub fn eor(&mut self, value: u8) {
        self.a ^= value;
        self.set_zn(self.a);
    }
    pub fn bit(&mut self, value: u8) {
        self.s_r.z = (self.a & value) == 0;
        self.s_r.v = (value & 0x40) != 0;
        self.s_r.n = (value & 0x80) != 0;
    }
    fn compare(&mut self, register: u8, value: u8) {
        self.s_r.c = register >= value;
        self.set_zn(register.wrapping_sub(value));
    }
    pub fn cmp(&mut self, value: u8) {
        self.compare(self.a, value);
    }
    pub fn cpx(&mut self, value: u8) {
        self.compare(self.x, value);
    }
    pub fn cpy(&mut self, value: u8) {
        self.compare(self.y, value);
    }
    pub fn asl(&mut self, value: u8) -> u8 {
        self.s_r.c = (value & 0x80) != 0;
        let v = value << 1;
        self.set_zn(v);
        v
    }
    pub fn lsr(&mut self, value: u8) -> u8 {
        self.s_r.c = (value & 0x01) != 0;
        let v = value >> 1;
        self.set_zn(v);
        v
    }
    pub fn rol(&mut self, value: u8) -> u8 {
        let v = (value << 1) | self.s_r.c as u8;
        self.s_r.c = (value & 0x80) != 0;
        self.set_zn(v);
        v
    }
    pub fn ror(&mut self, value: u8) -> u8 {
        let v = (value >> 1) | ((self.s_r.c as u8) << 7);
        self.s_r.c = (value & 0x01) != 0;
        self.set_zn(v);
        v
    }
    pub fn inc(&mut self, value: u8) -> u8 {
        let v = value.wrapping_add(1);
        self.set_zn(v);
        v
    }
    pub fn dec(&mut self, value: u8) -> u8 {
        let v = value.wrapping_sub(1);
        self.set_zn(v);
        v
    }

    /// Apply an operation that only reads its operand.
    ///
    /// Operations that do not read (stores, jumps, etc) are ignored.
    pub fn execute_read(&mut self, operation: Operation, value: u8) {
        use Operation::*;
        match operation {
            ADC => self.adc(value),
            AND => self.and(value),
            BIT => self.bit(value),
            CMP => self.cmp(value),
            CPX => self.cpx(value),
            CPY => self.cpy(value),
            EOR => self.eor(value),
            LDA => self.lda(value),
            LDX => self.ldx(value),
            LDY => self.ldy(value),
            ORA => self.ora(value),
            SBC => self.sbc(value),
            LAX => self.lax(value),
            ALR => {
                self.and(value);
                self.a = self.lsr(self.a);
            }
            ANC => {
                self.and(value);
                self.s_r.c = self.s_r.n;
            }
            ARR => {
                self.a &= value;
                self.a = (self.a >> 1) | ((self.s_r.c as u8) << 7);
                self.set_zn(self.a);
                self.s_r.c = (self.a & 0x40) != 0;
                self.s_r.v = ((self.a >> 6) ^ (self.a >> 5)) & 0x01 != 0;
            }
            AXS => {
                let t = self.a & self.x;
                self.s_r.c = t >= value;
                self.x = t.wrapping_sub(value);
                self.set_zn(self.x);
            }
            ANE => {
                self.a = (self.a | 0xEE) & self.x & value;
                self.set_zn(self.a);
            }
            LXA => {
                let v = (self.a | 0xEE) & value;
                self.a = v;
                self.x = v;
                self.set_zn(v);
            }
            LAS => {
                let v = self.s_p & value;
                self.a = v;
                self.x = v;
                self.s_p = v;
                self.set_zn(v);
            }
            _ => {}
        }
    }
    /// Apply a read-modify-write operation, returning the value to write back.
    pub fn execute_modify(&mut self, operation: Operation, value: u8) -> u8 {
        use Operation::*;
        match operation {
            ASL => self.asl(value),
            LSR => self.lsr(value),
            ROL => self.rol(value),
            ROR => self.ror(value),
            INC => self.inc(value),
            DEC => self.dec(value),
            SLO => {
                let v = self.asl(value);
                self.ora(v);
                v
            }
            RLA => {
                let v = self.rol(value);
                self.and(v);
                v
            }
            SRE => {
                let v = self.lsr(value);
                self.eor(v);
                v
            }
            RRA => {
                let v = self.ror(value);
                self.adc(v);
                v
            }
            DCP => {
                let v = value.wrapping_sub(1);
                self.cmp(v);
                v
            }
            ISC => {
                let v = value.wrapping_add(1);
                self.sbc(v);
                v
            }
            _ => value,
        }
    }
    /// Apply a register-only operation (transfers, flags, increments).
    pub fn execute_implied(&mut self, operation: Operation) {
        use Operation::*;
        match operation {
            CLC => self.s_r.c = false,
            CLD => self.s_r.d = false,
            CLI => self.s_r.i = false,
            CLV => self.s_r.v = false,
            SEC => self.s_r.c = true,
            SED => self.s_r.d = true,
            SEI => self.s_r.i = true,
            DEX => self.x = self.dec(self.x),
            DEY => self.y = self.dec(self.y),
            INX => self.x = self.inc(self.x),
            INY => self.y = self.inc(self.y),
            TAX => self.ldx(self.a),
            TAY => self.ldy(self.a),
            TSX => self.ldx(self.s_p),
            TXA => self.lda(self.x),
            TYA => self.lda(self.y),
            // This one does not affect flags
            TXS => self.s_p = self.x,
            _ => {}
        }
    }
    /// Whether a branch operation's condition holds
    pub fn branch_taken(&self, operation: Operation) -> bool {
        use Operation::*;
        match operation {
            BCC => !self.s_r.c,
            BCS => self.s_r.c,
            BNE => !self.s_r.z,
            BEQ => self.s_r.z,
            BPL => !self.s_r.n,
            BMI => self.s_r.n,
            BVC => !self.s_r.v,
            BVS => self.s_r.v,
            _ => false,
        }
    }
}

impl Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} [{:?}] CYC:{}",
            self.a,
            self.x,
            self.y,
            self.s_r.to_byte(),
            self.s_p,
            self.s_r,
            self.cycles
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Cpu;
    use crate::opcodes::Operation;
    use assert_hex::assert_eq_hex;

    #[derive(PartialEq)]
    enum Flag {
        Carry,
        Zero,
        Overflow,
        Negative,
    }

    fn check_flags(cpu: &Cpu, flags: Vec<Flag>) {
        macro_rules! check_flag {
            ($flag:ident, $flag_enum:ident, $flag_str:literal) => {
                assert_eq!(
                    cpu.s_r.$flag,
                    flags.contains(&Flag::$flag_enum),
                    "Expected {} flag to be {}",
                    $flag_str,
                    flags.contains(&Flag::$flag_enum)
                );
            };
        }
        check_flag!(c, Carry, "carry");
        check_flag!(z, Zero, "zero");
        check_flag!(v, Overflow, "overflow");
        check_flag!(n, Negative, "negative");
    }

    macro_rules! ld_test {
        ($ld:ident) => {
            let mut cpu = Cpu::new();
            cpu.$ld(0x18);
            check_flags(&cpu, Vec::new());
            cpu.$ld(0x00);
            check_flags(&cpu, vec![Flag::Zero]);
            // Loading clears the zero flag again
            cpu.$ld(0x80);
            check_flags(&cpu, vec![Flag::Negative]);
        };
    }

    #[test]
    fn test_lda() {
        ld_test!(lda);
    }
    #[test]
    fn test_ldx() {
        ld_test!(ldx);
    }
    #[test]
    fn test_ldy() {
        ld_test!(ldy);
    }
    #[test]
    fn test_adc_signed_overflow() {
        let mut cpu = Cpu::new();
        cpu.adc(0x40);
        cpu.adc(0x41);
        assert_eq_hex!(cpu.a, 0x81);
        check_flags(&cpu, vec![Flag::Overflow, Flag::Negative]);
        cpu.adc(0x81);
        assert_eq_hex!(cpu.a, 0x02);
        check_flags(&cpu, vec![Flag::Overflow, Flag::Carry]);
    }
    #[test]
    fn test_adc_carry_in_and_out() {
        let mut cpu = Cpu::new();
        cpu.a = 0x65;
        cpu.s_r.c = true;
        cpu.adc(0xFF - 0x65);
        assert_eq_hex!(cpu.a, 0x00);
        check_flags(&cpu, vec![Flag::Carry, Flag::Zero]);
    }
    #[test]
    fn test_sbc_borrow() {
        let mut cpu = Cpu::new();
        cpu.a = 0x10;
        cpu.s_r.c = true;
        cpu.sbc(0x20);
        assert_eq_hex!(cpu.a, 0xF0);
        check_flags(&cpu, vec![Flag::Negative]);
        cpu.s_r.c = true;
        cpu.sbc(0x70);
        assert_eq_hex!(cpu.a, 0x80);
        check_flags(&cpu, vec![Flag::Carry, Flag::Negative]);
    }
    #[test]
    fn test_compare() {
        let mut cpu = Cpu::new();
        cpu.a = 0x40;
        cpu.cmp(0x40);
        check_flags(&cpu, vec![Flag::Carry, Flag::Zero]);
        cpu.cmp(0x41);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_rotates_through_carry() {
        let mut cpu = Cpu::new();
        cpu.s_r.c = true;
        assert_eq_hex!(cpu.rol(0x80), 0x01);
        check_flags(&cpu, vec![Flag::Carry]);
        assert_eq_hex!(cpu.ror(0x00), 0x80);
        check_flags(&cpu, vec![Flag::Negative]);
    }
    #[test]
    fn test_undocumented_combinations() {
        let mut cpu = Cpu::new();
        cpu.a = 0xFF;
        cpu.x = 0x0F;
        cpu.execute_read(Operation::AXS, 0x01);
        assert_eq_hex!(cpu.x, 0x0E);
        check_flags(&cpu, vec![Flag::Carry]);

        cpu.a = 0x10;
        cpu.s_r.c = true;
        let written = cpu.execute_modify(Operation::ISC, 0x0F);
        assert_eq_hex!(written, 0x10);
        assert_eq_hex!(cpu.a, 0x00);

        cpu.a = 0x03;
        let written = cpu.execute_modify(Operation::DCP, 0x04);
        assert_eq_hex!(written, 0x03);
        check_flags(&cpu, vec![Flag::Carry, Flag::Zero]);
    }
    #[test]
    fn test_nmi_is_edge_triggered() {
        let mut cpu = Cpu::new();
        cpu.poll_interrupts(true, false);
        cpu.poll_interrupts(true, false);
        assert!(cpu.interrupt_requested());
        assert!(cpu.take_nmi());
        // Line held high does not retrigger
        cpu.poll_interrupts(true, false);
        cpu.poll_interrupts(true, false);
        assert!(!cpu.interrupt_requested());
    }
    #[test]
    fn test_irq_masked_by_i() {
        let mut cpu = Cpu::new();
        cpu.poll_interrupts(false, true);
        cpu.poll_interrupts(false, true);
        assert!(!cpu.interrupt_requested());
        cpu.s_r.i = false;
        cpu.poll_interrupts(false, true);
        cpu.poll_interrupts(false, true);
        assert!(cpu.interrupt_requested());
    }
}
