//! The 6502 opcode matrix used by the NES's CPU.
//!
//! Every one of the 256 opcode bytes maps to an [Opcode] in [OPCODES], documented or not,
//! so instruction dispatch is total.
//! ```
//! use famicore::opcodes::{AddressingMode, Operation, OPCODES};
//! let lda = OPCODES[0xBD];
//! assert_eq!(lda.operation, Operation::LDA);
//! assert_eq!(lda.mode, AddressingMode::AbsoluteX);
//! assert_eq!(lda.cycles, 4);
//! assert!(lda.page_penalty);
//! ```
use serde::Serialize;

/// How an instruction finds its operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// Only used by `JMP ($xxxx)`
    Indirect,
    /// `($xx, X)`
    IndexedIndirect,
    /// `($xx), Y`
    IndirectIndexed,
    /// Signed 8 bit branch offset
    Relative,
}

impl AddressingMode {
    /// Number of operand bytes following the opcode
    pub fn operand_bytes(&self) -> usize {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndexedIndirect | IndirectIndexed
            | Relative => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 2,
        }
    }
}

/// The operation an opcode performs.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Operation {
    ADC,
    AND,
    ASL,
    BCC,
    BCS,
    BEQ,
    BIT,
    BMI,
    BNE,
    BPL,
    BRK,
    BVC,
    BVS,
    CLC,
    CLD,
    CLI,
    CLV,
    CMP,
    CPX,
    CPY,
    DEC,
    DEX,
    DEY,
    EOR,
    INC,
    INX,
    INY,
    JMP,
    JSR,
    LDA,
    LDX,
    LDY,
    LSR,
    NOP,
    ORA,
    PHA,
    PHP,
    PLA,
    PLP,
    ROL,
    ROR,
    RTI,
    RTS,
    SBC,
    SEC,
    SED,
    SEI,
    STA,
    STX,
    STY,
    TAX,
    TAY,
    TSX,
    TXA,
    TXS,
    TYA,
    // Undocumented
    /// AND then LSR A
    ALR,
    /// AND then copy N into C
    ANC,
    /// Unstable, A = (A | 0xEE) & X & operand
    ANE,
    /// AND then ROR A with odd flags
    ARR,
    /// X = (A & X) - operand
    AXS,
    /// DEC then CMP
    DCP,
    /// INC then SBC
    ISC,
    /// Halts the CPU until reset
    JAM,
    /// A = X = S = S & operand
    LAS,
    /// LDA and LDX at once
    LAX,
    /// Unstable, A = X = (A | 0xEE) & operand
    LXA,
    /// ROL then AND
    RLA,
    /// ROR then ADC
    RRA,
    /// Store A & X
    SAX,
    /// Store A & X & (H + 1)
    SHA,
    /// Store X & (H + 1)
    SHX,
    /// Store Y & (H + 1)
    SHY,
    /// ASL then ORA
    SLO,
    /// LSR then EOR
    SRE,
    /// S = A & X, then store S & (H + 1)
    TAS,
}

/// How an operation uses the bus, which decides its cycle pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Reads its operand
    Read,
    /// Writes to its operand's address without reading it
    Write,
    /// Reads, writes back the unmodified value, then writes the result
    ReadModifyWrite,
    /// Branches, jumps, stack and register operations with their own cycle patterns
    Control,
}

impl Operation {
    /// How this operation accesses memory.
    pub fn access(&self) -> Access {
        use Operation::*;
        match self {
            ADC | AND | BIT | CMP | CPX | CPY | EOR | LDA | LDX | LDY | NOP | ORA | SBC | ALR
            | ANC | ANE | ARR | AXS | LAS | LAX | LXA => Access::Read,
            STA | STX | STY | SAX | SHA | SHX | SHY | TAS => Access::Write,
            ASL | LSR | ROL | ROR | INC | DEC | DCP | ISC | RLA | RRA | SLO | SRE => {
                Access::ReadModifyWrite
            }
            _ => Access::Control,
        }
    }
}

/// A single entry in the opcode matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Opcode {
    pub operation: Operation,
    pub mode: AddressingMode,
    /// Number of cycles taken, not counting page-cross and branch penalties
    pub cycles: u8,
    /// Whether an extra cycle is taken when indexing crosses a page
    pub page_penalty: bool,
    /// Whether the opcode is documented
    pub official: bool,
}

impl Opcode {
    /// Total length of the instruction in bytes, including the opcode
    pub fn bytes(&self) -> usize {
        1 + self.mode.operand_bytes()
    }
    /// Whether this opcode halts the CPU
    pub fn is_jam(&self) -> bool {
        self.operation == Operation::JAM
    }
}

const fn op(operation: Operation, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode {
        operation,
        mode,
        cycles,
        page_penalty: false,
        official: true,
    }
}
const fn op_page(operation: Operation, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode {
        page_penalty: true,
        ..op(operation, mode, cycles)
    }
}
const fn undoc(operation: Operation, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode {
        official: false,
        ..op(operation, mode, cycles)
    }
}
const fn undoc_page(operation: Operation, mode: AddressingMode, cycles: u8) -> Opcode {
    Opcode {
        official: false,
        ..op_page(operation, mode, cycles)
    }
}

const IMP: AddressingMode = AddressingMode::Implied;
const ACC: AddressingMode = AddressingMode::Accumulator;
const IMM: AddressingMode = AddressingMode::Immediate;
const ZP: AddressingMode = AddressingMode::ZeroPage;
const ZPX: AddressingMode = AddressingMode::ZeroPageX;
const ZPY: AddressingMode = AddressingMode::ZeroPageY;
const ABS: AddressingMode = AddressingMode::Absolute;
const ABX: AddressingMode = AddressingMode::AbsoluteX;
const ABY: AddressingMode = AddressingMode::AbsoluteY;
const IND: AddressingMode = AddressingMode::Indirect;
const IZX: AddressingMode = AddressingMode::IndexedIndirect;
const IZY: AddressingMode = AddressingMode::IndirectIndexed;
const REL: AddressingMode = AddressingMode::Relative;

/// The opcode matrix, indexed by opcode byte.
pub static OPCODES: [Opcode; 256] = {
    use Operation::*;
    [
        op(BRK, IMP, 7), // 00
        op(ORA, IZX, 6), // 01
        undoc(JAM, IMP, 2), // 02
        undoc(SLO, IZX, 8), // 03
        undoc(NOP, ZP, 3), // 04
        op(ORA, ZP, 3), // 05
        op(ASL, ZP, 5), // 06
        undoc(SLO, ZP, 5), // 07
        op(PHP, IMP, 3), // 08
        op(ORA, IMM, 2), // 09
        op(ASL, ACC, 2), // 0A
        undoc(ANC, IMM, 2), // 0B
        undoc(NOP, ABS, 4), // 0C
        op(ORA, ABS, 4), // 0D
        op(ASL, ABS, 6), // 0E
        undoc(SLO, ABS, 6), // 0F
        op(BPL, REL, 2), // 10
        op_page(ORA, IZY, 5), // 11
        undoc(JAM, IMP, 2), // 12
        undoc(SLO, IZY, 8), // 13
        undoc(NOP, ZPX, 4), // 14
        op(ORA, ZPX, 4), // 15
        op(ASL, ZPX, 6), // 16
        undoc(SLO, ZPX, 6), // 17
        op(CLC, IMP, 2), // 18
        op_page(ORA, ABY, 4), // 19
        undoc(NOP, IMP, 2), // 1A
        undoc(SLO, ABY, 7), // 1B
        undoc_page(NOP, ABX, 4), // 1C
        op_page(ORA, ABX, 4), // 1D
        op(ASL, ABX, 7), // 1E
        undoc(SLO, ABX, 7), // 1F
        op(JSR, ABS, 6), // 20
        op(AND, IZX, 6), // 21
        undoc(JAM, IMP, 2), // 22
        undoc(RLA, IZX, 8), // 23
        op(BIT, ZP, 3), // 24
        op(AND, ZP, 3), // 25
        op(ROL, ZP, 5), // 26
        undoc(RLA, ZP, 5), // 27
        op(PLP, IMP, 4), // 28
        op(AND, IMM, 2), // 29
        op(ROL, ACC, 2), // 2A
        undoc(ANC, IMM, 2), // 2B
        op(BIT, ABS, 4), // 2C
        op(AND, ABS, 4), // 2D
        op(ROL, ABS, 6), // 2E
        undoc(RLA, ABS, 6), // 2F
        op(BMI, REL, 2), // 30
        op_page(AND, IZY, 5), // 31
        undoc(JAM, IMP, 2), // 32
        undoc(RLA, IZY, 8), // 33
        undoc(NOP, ZPX, 4), // 34
        op(AND, ZPX, 4), // 35
        op(ROL, ZPX, 6), // 36
        undoc(RLA, ZPX, 6), // 37
        op(SEC, IMP, 2), // 38
        op_page(AND, ABY, 4), // 39
        undoc(NOP, IMP, 2), // 3A
        undoc(RLA, ABY, 7), // 3B
        undoc_page(NOP, ABX, 4), // 3C
        op_page(AND, ABX, 4), // 3D
        op(ROL, ABX, 7), // 3E
        undoc(RLA, ABX, 7), // 3F
        op(RTI, IMP, 6), // 40
        op(EOR, IZX, 6), // 41
        undoc(JAM, IMP, 2), // 42
        undoc(SRE, IZX, 8), // 43
        undoc(NOP, ZP, 3), // 44
        op(EOR, ZP, 3), // 45
        op(LSR, ZP, 5), // 46
        undoc(SRE, ZP, 5), // 47
        op(PHA, IMP, 3), // 48
        op(EOR, IMM, 2), // 49
        op(LSR, ACC, 2), // 4A
        undoc(ALR, IMM, 2), // 4B
        op(JMP, ABS, 3), // 4C
        op(EOR, ABS, 4), // 4D
        op(LSR, ABS, 6), // 4E
        undoc(SRE, ABS, 6), // 4F
        op(BVC, REL, 2), // 50
        op_page(EOR, IZY, 5), // 51
        undoc(JAM, IMP, 2), // 52
        undoc(SRE, IZY, 8), // 53
        undoc(NOP, ZPX, 4), // 54
        op(EOR, ZPX, 4), // 55
        op(LSR, ZPX, 6), // 56
        undoc(SRE, ZPX, 6), // 57
        op(CLI, IMP, 2), // 58
        op_page(EOR, ABY, 4), // 59
        undoc(NOP, IMP, 2), // 5A
        undoc(SRE, ABY, 7), // 5B
        undoc_page(NOP, ABX, 4), // 5C
        op_page(EOR, ABX, 4), // 5D
        op(LSR, ABX, 7), // 5E
        undoc(SRE, ABX, 7), // 5F
        op(RTS, IMP, 6), // 60
        op(ADC, IZX, 6), // 61
        undoc(JAM, IMP, 2), // 62
        undoc(RRA, IZX, 8), // 63
        undoc(NOP, ZP, 3), // 64
        op(ADC, ZP, 3), // 65
        op(ROR, ZP, 5), // 66
        undoc(RRA, ZP, 5), // 67
        op(PLA, IMP, 4), // 68
        op(ADC, IMM, 2), // 69
        op(ROR, ACC, 2), // 6A
        undoc(ARR, IMM, 2), // 6B
        op(JMP, IND, 5), // 6C
        op(ADC, ABS, 4), // 6D
        op(ROR, ABS, 6), // 6E
        undoc(RRA, ABS, 6), // 6F
        op(BVS, REL, 2), // 70
        op_page(ADC, IZY, 5), // 71
        undoc(JAM, IMP, 2), // 72
        undoc(RRA, IZY, 8), // 73
        undoc(NOP, ZPX, 4), // 74
        op(ADC, ZPX, 4), // 75
        op(ROR, ZPX, 6), // 76
        undoc(RRA, ZPX, 6), // 77
        op(SEI, IMP, 2), // 78
        op_page(ADC, ABY, 4), // 79
        undoc(NOP, IMP, 2), // 7A
        undoc(RRA, ABY, 7), // 7B
        undoc_page(NOP, ABX, 4), // 7C
        op_page(ADC, ABX, 4), // 7D
        op(ROR, ABX, 7), // 7E
        undoc(RRA, ABX, 7), // 7F
        undoc(NOP, IMM, 2), // 80
        op(STA, IZX, 6), // 81
        undoc(NOP, IMM, 2), // 82
        undoc(SAX, IZX, 6), // 83
        op(STY, ZP, 3), // 84
        op(STA, ZP, 3), // 85
        op(STX, ZP, 3), // 86
        undoc(SAX, ZP, 3), // 87
        op(DEY, IMP, 2), // 88
        undoc(NOP, IMM, 2), // 89
        op(TXA, IMP, 2), // 8A
        undoc(ANE, IMM, 2), // 8B
        op(STY, ABS, 4), // 8C
        op(STA, ABS, 4), // 8D
        op(STX, ABS, 4), // 8E
        undoc(SAX, ABS, 4), // 8F
        op(BCC, REL, 2), // 90
        op(STA, IZY, 6), // 91
        undoc(JAM, IMP, 2), // 92
        undoc(SHA, IZY, 6), // 93
        op(STY, ZPX, 4), // 94
        op(STA, ZPX, 4), // 95
        op(STX, ZPY, 4), // 96
        undoc(SAX, ZPY, 4), // 97
        op(TYA, IMP, 2), // 98
        op(STA, ABY, 5), // 99
        op(TXS, IMP, 2), // 9A
        undoc(TAS, ABY, 5), // 9B
        undoc(SHY, ABX, 5), // 9C
        op(STA, ABX, 5), // 9D
        undoc(SHX, ABY, 5), // 9E
        undoc(SHA, ABY, 5), // 9F
        op(LDY, IMM, 2), // A0
        op(LDA, IZX, 6), // A1
        op(LDX, IMM, 2), // A2
        undoc(LAX, IZX, 6), // A3
        op(LDY, ZP, 3), // A4
        op(LDA, ZP, 3), // A5
        op(LDX, ZP, 3), // A6
        undoc(LAX, ZP, 3), // A7
        op(TAY, IMP, 2), // A8
        op(LDA, IMM, 2), // A9
        op(TAX, IMP, 2), // AA
        undoc(LXA, IMM, 2), // AB
        op(LDY, ABS, 4), // AC
        op(LDA, ABS, 4), // AD
        op(LDX, ABS, 4), // AE
        undoc(LAX, ABS, 4), // AF
        op(BCS, REL, 2), // B0
        op_page(LDA, IZY, 5), // B1
        undoc(JAM, IMP, 2), // B2
        undoc_page(LAX, IZY, 5), // B3
        op(LDY, ZPX, 4), // B4
        op(LDA, ZPX, 4), // B5
        op(LDX, ZPY, 4), // B6
        undoc(LAX, ZPY, 4), // B7
        op(CLV, IMP, 2), // B8
        op_page(LDA, ABY, 4), // B9
        op(TSX, IMP, 2), // BA
        undoc_page(LAS, ABY, 4), // BB
        op_page(LDY, ABX, 4), // BC
        op_page(LDA, ABX, 4), // BD
        op_page(LDX, ABY, 4), // BE
        undoc_page(LAX, ABY, 4), // BF
        op(CPY, IMM, 2), // C0
        op(CMP, IZX, 6), // C1
        undoc(NOP, IMM, 2), // C2
        undoc(DCP, IZX, 8), // C3
        op(CPY, ZP, 3), // C4
        op(CMP, ZP, 3), // C5
        op(DEC, ZP, 5), // C6
        undoc(DCP, ZP, 5), // C7
        op(INY, IMP, 2), // C8
        op(CMP, IMM, 2), // C9
        op(DEX, IMP, 2), // CA
        undoc(AXS, IMM, 2), // CB
        op(CPY, ABS, 4), // CC
        op(CMP, ABS, 4), // CD
        op(DEC, ABS, 6), // CE
        undoc(DCP, ABS, 6), // CF
        op(BNE, REL, 2), // D0
        op_page(CMP, IZY, 5), // D1
        undoc(JAM, IMP, 2), // D2
        undoc(DCP, IZY, 8), // D3
        undoc(NOP, ZPX, 4), // D4
        op(CMP, ZPX, 4), // D5
        op(DEC, ZPX, 6), // D6
        undoc(DCP, ZPX, 6), // D7
        op(CLD, IMP, 2), // D8
        op_page(CMP, ABY, 4), // D9
        undoc(NOP, IMP, 2), // DA
        undoc(DCP, ABY, 7), // DB
        undoc_page(NOP, ABX, 4), // DC
        op_page(CMP, ABX, 4), // DD
        op(DEC, ABX, 7), // DE
        undoc(DCP, ABX, 7), // DF
        op(CPX, IMM, 2), // E0
        op(SBC, IZX, 6), // E1
        undoc(NOP, IMM, 2), // E2
        undoc(ISC, IZX, 8), // E3
        op(CPX, ZP, 3), // E4
        op(SBC, ZP, 3), // E5
        op(INC, ZP, 5), // E6
        undoc(ISC, ZP, 5), // E7
        op(INX, IMP, 2), // E8
        op(SBC, IMM, 2), // E9
        op(NOP, IMP, 2), // EA
        undoc(SBC, IMM, 2), // EB
        op(CPX, ABS, 4), // EC
        op(SBC, ABS, 4), // ED
        op(INC, ABS, 6), // EE
        undoc(ISC, ABS, 6), // EF
        op(BEQ, REL, 2), // F0
        op_page(SBC, IZY, 5), // F1
        undoc(JAM, IMP, 2), // F2
        undoc(ISC, IZY, 8), // F3
        undoc(NOP, ZPX, 4), // F4
        op(SBC, ZPX, 4), // F5
        op(INC, ZPX, 6), // F6
        undoc(ISC, ZPX, 6), // F7
        op(SED, IMP, 2), // F8
        op_page(SBC, ABY, 4), // F9
        undoc(NOP, IMP, 2), // FA
        undoc(ISC, ABY, 7), // FB
        undoc_page(NOP, ABX, 4), // FC
        op_page(SBC, ABX, 4), // FD
        op(INC, ABX, 7), // FE
        undoc(ISC, ABX, 7), // FF
    ]
};

fn operand_u8(operands: &[u8]) -> u8 {
    operands.first().copied().unwrap_or(0)
}
fn operand_u16(operands: &[u8]) -> u16 {
    operand_u8(operands) as u16 | ((operands.get(1).copied().unwrap_or(0) as u16) << 8)
}

/// Disassemble a single instruction.
///
/// Undocumented opcodes are prefixed with `*`.
/// Missing operand bytes are treated as zero.
/// ```
/// use famicore::opcodes::format_opcode;
/// assert_eq!(format_opcode(0xA9, &[0x12]), "LDA #$12");
/// assert_eq!(format_opcode(0x91, &[0x20]), "STA ($20),Y");
/// assert_eq!(format_opcode(0xA7, &[0x03]), "*LAX $03");
/// ```
pub fn format_opcode(opcode: u8, operands: &[u8]) -> String {
    use AddressingMode::*;
    let entry = &OPCODES[opcode as usize];
    let name = if entry.official {
        format!("{:?}", entry.operation)
    } else {
        format!("*{:?}", entry.operation)
    };
    match entry.mode {
        Implied => name,
        Accumulator => format!("{} A", name),
        Immediate => format!("{} #${:02X}", name, operand_u8(operands)),
        ZeroPage => format!("{} ${:02X}", name, operand_u8(operands)),
        ZeroPageX => format!("{} ${:02X},X", name, operand_u8(operands)),
        ZeroPageY => format!("{} ${:02X},Y", name, operand_u8(operands)),
        Absolute => format!("{} ${:04X}", name, operand_u16(operands)),
        AbsoluteX => format!("{} ${:04X},X", name, operand_u16(operands)),
        AbsoluteY => format!("{} ${:04X},Y", name, operand_u16(operands)),
        Indirect => format!("{} (${:04X})", name, operand_u16(operands)),
        IndexedIndirect => format!("{} (${:02X},X)", name, operand_u8(operands)),
        IndirectIndexed => format!("{} (${:02X}),Y", name, operand_u8(operands)),
        Relative => format!("{} *{:+}", name, operand_u8(operands) as i8),
    }
}
