//! 6502 opcode descriptor table.
//!
//! Every possible opcode byte maps to `{instruction, addressing mode, base
//! cycle count, instruction size}`. The table is built from a base array of
//! 256 entries and then cross-validated against a hand-written reference
//! list of the official opcodes; each entry the reference confirms is marked
//! defined. A mismatch between the two is reported and leaves the entry
//! undefined, so table corruption is detected while code that sticks to
//! known opcodes keeps running.

use crate::diag;

/// 6502 instructions. Accumulator-operand shifts are distinct from their
/// memory-operand forms (`AslA` vs `Asl`), as the two execute differently.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Instruction {
    Adc, And, Asl, AslA, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs,
    Clc, Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny,
    Jmp, Jsr, Lda, Ldx, Ldy, Lsr, LsrA, Nop, Ora, Pha, Php, Pla, Plp,
    Rol, RolA, Ror, RorA, Rti, Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty,
    Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Instruction {
    /// Assembler mnemonic, for traces and the halt dump.
    pub fn mnemonic(self) -> &'static str {
        use Instruction::*;
        match self {
            Adc => "ADC", And => "AND", Asl | AslA => "ASL",
            Bcc => "BCC", Bcs => "BCS", Beq => "BEQ", Bit => "BIT",
            Bmi => "BMI", Bne => "BNE", Bpl => "BPL", Brk => "BRK",
            Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX",
            Cpy => "CPY", Dec => "DEC", Dex => "DEX", Dey => "DEY",
            Eor => "EOR", Inc => "INC", Inx => "INX", Iny => "INY",
            Jmp => "JMP", Jsr => "JSR", Lda => "LDA", Ldx => "LDX",
            Ldy => "LDY", Lsr | LsrA => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP",
            Rol | RolA => "ROL", Ror | RorA => "ROR", Rti => "RTI",
            Rts => "RTS", Sbc => "SBC", Sec => "SEC", Sed => "SED",
            Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA",
            Txs => "TXS", Tya => "TYA",
        }
    }
}

/// 6502 addressing modes. Accumulator operands use `Implied` (the
/// instruction itself carries the distinction).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AddrMode {
    Absolute,
    AbsoluteX,
    AbsoluteY,
    Immediate,
    Implied,
    Indirect, // JMP ($xxxx), with the page-wrap fetch bug
    IndirectX,
    IndirectY,
    Relative,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
}

/// One decoded opcode: instruction, addressing mode, base cycle count,
/// total instruction length in bytes (1-3).
#[derive(Clone, Copy, Debug)]
pub struct Opcode {
    pub inst: Instruction,
    pub mode: AddrMode,
    pub cycles: u8,
    pub size: u8,
}

const fn op(inst: Instruction, mode: AddrMode, cycles: u8) -> Opcode {
    // size is filled in by the verification pass; undefined entries keep 1
    Opcode { inst, mode, cycles, size: 1 }
}

use AddrMode::*;
use Instruction::*;

/// Base table: instruction, mode and cycles for all 256 opcode bytes.
/// Slots with no official instruction hold a single-byte NOP placeholder;
/// they stay undefined unless the reference list below confirms them.
#[rustfmt::skip]
const BASE: [Opcode; 256] = [
    /* 00 */ op(Brk, Implied, 7),   op(Ora, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 04 */ op(Nop, Implied, 2),   op(Ora, ZeroPage, 3),  op(Asl, ZeroPage, 5),  op(Nop, Implied, 2),
    /* 08 */ op(Php, Implied, 3),   op(Ora, Immediate, 2), op(AslA, Implied, 2),  op(Nop, Implied, 2),
    /* 0C */ op(Nop, Implied, 2),   op(Ora, Absolute, 4),  op(Asl, Absolute, 6),  op(Nop, Implied, 2),
    /* 10 */ op(Bpl, Relative, 2),  op(Ora, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 14 */ op(Nop, Implied, 2),   op(Ora, ZeroPageX, 4), op(Asl, ZeroPageX, 6), op(Nop, Implied, 2),
    /* 18 */ op(Clc, Implied, 2),   op(Ora, AbsoluteY, 4), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 1C */ op(Nop, Implied, 2),   op(Ora, AbsoluteX, 4), op(Asl, AbsoluteX, 7), op(Nop, Implied, 2),
    /* 20 */ op(Jsr, Absolute, 6),  op(And, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 24 */ op(Bit, ZeroPage, 3),  op(And, ZeroPage, 3),  op(Rol, ZeroPage, 5),  op(Nop, Implied, 2),
    /* 28 */ op(Plp, Implied, 4),   op(And, Immediate, 2), op(RolA, Implied, 2),  op(Nop, Implied, 2),
    /* 2C */ op(Bit, Absolute, 4),  op(And, Absolute, 4),  op(Rol, Absolute, 6),  op(Nop, Implied, 2),
    /* 30 */ op(Bmi, Relative, 2),  op(And, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 34 */ op(Nop, Implied, 2),   op(And, ZeroPageX, 4), op(Rol, ZeroPageX, 6), op(Nop, Implied, 2),
    /* 38 */ op(Sec, Implied, 2),   op(And, AbsoluteY, 4), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 3C */ op(Nop, Implied, 2),   op(And, AbsoluteX, 4), op(Rol, AbsoluteX, 7), op(Nop, Implied, 2),
    /* 40 */ op(Rti, Implied, 6),   op(Eor, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 44 */ op(Nop, Implied, 2),   op(Eor, ZeroPage, 3),  op(Lsr, ZeroPage, 5),  op(Nop, Implied, 2),
    /* 48 */ op(Pha, Implied, 3),   op(Eor, Immediate, 2), op(LsrA, Implied, 2),  op(Nop, Implied, 2),
    /* 4C */ op(Jmp, Absolute, 3),  op(Eor, Absolute, 4),  op(Lsr, Absolute, 6),  op(Nop, Implied, 2),
    /* 50 */ op(Bvc, Relative, 2),  op(Eor, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 54 */ op(Nop, Implied, 2),   op(Eor, ZeroPageX, 4), op(Lsr, ZeroPageX, 6), op(Nop, Implied, 2),
    /* 58 */ op(Cli, Implied, 2),   op(Eor, AbsoluteY, 4), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 5C */ op(Nop, Implied, 2),   op(Eor, AbsoluteX, 4), op(Lsr, AbsoluteX, 7), op(Nop, Implied, 2),
    /* 60 */ op(Rts, Implied, 6),   op(Adc, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 64 */ op(Nop, Implied, 2),   op(Adc, ZeroPage, 3),  op(Ror, ZeroPage, 5),  op(Nop, Implied, 2),
    /* 68 */ op(Pla, Implied, 4),   op(Adc, Immediate, 2), op(RorA, Implied, 2),  op(Nop, Implied, 2),
    /* 6C */ op(Jmp, Indirect, 5),  op(Adc, Absolute, 4),  op(Ror, Absolute, 6),  op(Nop, Implied, 2),
    /* 70 */ op(Bvs, Relative, 2),  op(Adc, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 74 */ op(Nop, Implied, 2),   op(Adc, ZeroPageX, 4), op(Ror, ZeroPageX, 6), op(Nop, Implied, 2),
    /* 78 */ op(Sei, Implied, 2),   op(Adc, AbsoluteY, 4), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 7C */ op(Nop, Implied, 2),   op(Adc, AbsoluteX, 4), op(Ror, AbsoluteX, 7), op(Nop, Implied, 2),
    /* 80 */ op(Nop, Implied, 2),   op(Sta, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 84 */ op(Sty, ZeroPage, 3),  op(Sta, ZeroPage, 3),  op(Stx, ZeroPage, 3),  op(Nop, Implied, 2),
    /* 88 */ op(Dey, Implied, 2),   op(Nop, Implied, 2),   op(Txa, Implied, 2),   op(Nop, Implied, 2),
    /* 8C */ op(Sty, Absolute, 4),  op(Sta, Absolute, 4),  op(Stx, Absolute, 4),  op(Nop, Implied, 2),
    /* 90 */ op(Bcc, Relative, 2),  op(Sta, IndirectY, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* 94 */ op(Sty, ZeroPageX, 4), op(Sta, ZeroPageX, 4), op(Stx, ZeroPageY, 4), op(Nop, Implied, 2),
    /* 98 */ op(Tya, Implied, 2),   op(Sta, AbsoluteY, 5), op(Txs, Implied, 2),   op(Nop, Implied, 2),
    /* 9C */ op(Nop, Implied, 2),   op(Sta, AbsoluteX, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* A0 */ op(Ldy, Immediate, 2), op(Lda, IndirectX, 6), op(Ldx, Immediate, 2), op(Nop, Implied, 2),
    /* A4 */ op(Ldy, ZeroPage, 3),  op(Lda, ZeroPage, 3),  op(Ldx, ZeroPage, 3),  op(Nop, Implied, 2),
    /* A8 */ op(Tay, Implied, 2),   op(Lda, Immediate, 2), op(Tax, Implied, 2),   op(Nop, Implied, 2),
    /* AC */ op(Ldy, Absolute, 4),  op(Lda, Absolute, 4),  op(Ldx, Absolute, 4),  op(Nop, Implied, 2),
    /* B0 */ op(Bcs, Relative, 2),  op(Lda, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* B4 */ op(Ldy, ZeroPageX, 4), op(Lda, ZeroPageX, 4), op(Ldx, ZeroPageY, 4), op(Nop, Implied, 2),
    /* B8 */ op(Clv, Implied, 2),   op(Lda, AbsoluteY, 4), op(Tsx, Implied, 2),   op(Nop, Implied, 2),
    /* BC */ op(Ldy, AbsoluteX, 4), op(Lda, AbsoluteX, 4), op(Ldx, AbsoluteY, 4), op(Nop, Implied, 2),
    /* C0 */ op(Cpy, Immediate, 2), op(Cmp, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* C4 */ op(Cpy, ZeroPage, 3),  op(Cmp, ZeroPage, 3),  op(Dec, ZeroPage, 5),  op(Nop, Implied, 2),
    /* C8 */ op(Iny, Implied, 2),   op(Cmp, Immediate, 2), op(Dex, Implied, 2),   op(Nop, Implied, 2),
    /* CC */ op(Cpy, Absolute, 4),  op(Cmp, Absolute, 4),  op(Dec, Absolute, 6),  op(Nop, Implied, 2),
    /* D0 */ op(Bne, Relative, 2),  op(Cmp, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* D4 */ op(Nop, Implied, 2),   op(Cmp, ZeroPageX, 4), op(Dec, ZeroPageX, 6), op(Nop, Implied, 2),
    /* D8 */ op(Cld, Implied, 2),   op(Cmp, AbsoluteY, 4), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* DC */ op(Nop, Implied, 2),   op(Cmp, AbsoluteX, 4), op(Dec, AbsoluteX, 7), op(Nop, Implied, 2),
    /* E0 */ op(Cpx, Immediate, 2), op(Sbc, IndirectX, 6), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* E4 */ op(Cpx, ZeroPage, 3),  op(Sbc, ZeroPage, 3),  op(Inc, ZeroPage, 5),  op(Nop, Implied, 2),
    /* E8 */ op(Inx, Implied, 2),   op(Sbc, Immediate, 2), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* EC */ op(Cpx, Absolute, 4),  op(Sbc, Absolute, 4),  op(Inc, Absolute, 6),  op(Nop, Implied, 2),
    /* F0 */ op(Beq, Relative, 2),  op(Sbc, IndirectY, 5), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* F4 */ op(Nop, Implied, 2),   op(Sbc, ZeroPageX, 4), op(Inc, ZeroPageX, 6), op(Nop, Implied, 2),
    /* F8 */ op(Sed, Implied, 2),   op(Sbc, AbsoluteY, 4), op(Nop, Implied, 2),   op(Nop, Implied, 2),
    /* FC */ op(Nop, Implied, 2),   op(Sbc, AbsoluteX, 4), op(Inc, AbsoluteX, 7), op(Nop, Implied, 2),
];

/// Reference entry: `(instruction, opcode, mode, size, cycles)`. Written
/// independently of `BASE` so disagreement between the two is detectable.
type RefOp = (Instruction, u8, AddrMode, u8, u8);

#[rustfmt::skip]
const REFERENCE: &[RefOp] = &[
    // ADC
    (Adc, 0x69, Immediate, 2, 2), (Adc, 0x65, ZeroPage, 2, 3), (Adc, 0x75, ZeroPageX, 2, 4),
    (Adc, 0x6D, Absolute, 3, 4), (Adc, 0x7D, AbsoluteX, 3, 4), (Adc, 0x79, AbsoluteY, 3, 4),
    (Adc, 0x61, IndirectX, 2, 6), (Adc, 0x71, IndirectY, 2, 5),
    // AND
    (And, 0x29, Immediate, 2, 2), (And, 0x25, ZeroPage, 2, 3), (And, 0x35, ZeroPageX, 2, 4),
    (And, 0x2D, Absolute, 3, 4), (And, 0x3D, AbsoluteX, 3, 4), (And, 0x39, AbsoluteY, 3, 4),
    (And, 0x21, IndirectX, 2, 6), (And, 0x31, IndirectY, 2, 5),
    // ASL
    (AslA, 0x0A, Implied, 1, 2), (Asl, 0x06, ZeroPage, 2, 5), (Asl, 0x16, ZeroPageX, 2, 6),
    (Asl, 0x0E, Absolute, 3, 6), (Asl, 0x1E, AbsoluteX, 3, 7),
    // branches
    (Bcc, 0x90, Relative, 2, 2), (Bcs, 0xB0, Relative, 2, 2), (Beq, 0xF0, Relative, 2, 2),
    (Bmi, 0x30, Relative, 2, 2), (Bne, 0xD0, Relative, 2, 2), (Bpl, 0x10, Relative, 2, 2),
    (Bvc, 0x50, Relative, 2, 2), (Bvs, 0x70, Relative, 2, 2),
    // BIT
    (Bit, 0x24, ZeroPage, 2, 3), (Bit, 0x2C, Absolute, 3, 4),
    // BRK
    (Brk, 0x00, Implied, 1, 7),
    // flag ops
    (Clc, 0x18, Implied, 1, 2), (Cld, 0xD8, Implied, 1, 2), (Cli, 0x58, Implied, 1, 2),
    (Clv, 0xB8, Implied, 1, 2), (Sec, 0x38, Implied, 1, 2), (Sed, 0xF8, Implied, 1, 2),
    (Sei, 0x78, Implied, 1, 2),
    // CMP
    (Cmp, 0xC9, Immediate, 2, 2), (Cmp, 0xC5, ZeroPage, 2, 3), (Cmp, 0xD5, ZeroPageX, 2, 4),
    (Cmp, 0xCD, Absolute, 3, 4), (Cmp, 0xDD, AbsoluteX, 3, 4), (Cmp, 0xD9, AbsoluteY, 3, 4),
    (Cmp, 0xC1, IndirectX, 2, 6), (Cmp, 0xD1, IndirectY, 2, 5),
    // CPX / CPY
    (Cpx, 0xE0, Immediate, 2, 2), (Cpx, 0xE4, ZeroPage, 2, 3), (Cpx, 0xEC, Absolute, 3, 4),
    (Cpy, 0xC0, Immediate, 2, 2), (Cpy, 0xC4, ZeroPage, 2, 3), (Cpy, 0xCC, Absolute, 3, 4),
    // DEC / DEX / DEY
    (Dec, 0xC6, ZeroPage, 2, 5), (Dec, 0xD6, ZeroPageX, 2, 6), (Dec, 0xCE, Absolute, 3, 6),
    (Dec, 0xDE, AbsoluteX, 3, 7), (Dex, 0xCA, Implied, 1, 2), (Dey, 0x88, Implied, 1, 2),
    // EOR
    (Eor, 0x49, Immediate, 2, 2), (Eor, 0x45, ZeroPage, 2, 3), (Eor, 0x55, ZeroPageX, 2, 4),
    (Eor, 0x4D, Absolute, 3, 4), (Eor, 0x5D, AbsoluteX, 3, 4), (Eor, 0x59, AbsoluteY, 3, 4),
    (Eor, 0x41, IndirectX, 2, 6), (Eor, 0x51, IndirectY, 2, 5),
    // INC / INX / INY
    (Inc, 0xE6, ZeroPage, 2, 5), (Inc, 0xF6, ZeroPageX, 2, 6), (Inc, 0xEE, Absolute, 3, 6),
    (Inc, 0xFE, AbsoluteX, 3, 7), (Inx, 0xE8, Implied, 1, 2), (Iny, 0xC8, Implied, 1, 2),
    // JMP / JSR
    (Jmp, 0x4C, Absolute, 3, 3), (Jmp, 0x6C, Indirect, 3, 5), (Jsr, 0x20, Absolute, 3, 6),
    // LDA
    (Lda, 0xA9, Immediate, 2, 2), (Lda, 0xA5, ZeroPage, 2, 3), (Lda, 0xB5, ZeroPageX, 2, 4),
    (Lda, 0xAD, Absolute, 3, 4), (Lda, 0xBD, AbsoluteX, 3, 4), (Lda, 0xB9, AbsoluteY, 3, 4),
    (Lda, 0xA1, IndirectX, 2, 6), (Lda, 0xB1, IndirectY, 2, 5),
    // LDX
    (Ldx, 0xA2, Immediate, 2, 2), (Ldx, 0xA6, ZeroPage, 2, 3), (Ldx, 0xB6, ZeroPageY, 2, 4),
    (Ldx, 0xAE, Absolute, 3, 4), (Ldx, 0xBE, AbsoluteY, 3, 4),
    // LDY
    (Ldy, 0xA0, Immediate, 2, 2), (Ldy, 0xA4, ZeroPage, 2, 3), (Ldy, 0xB4, ZeroPageX, 2, 4),
    (Ldy, 0xAC, Absolute, 3, 4), (Ldy, 0xBC, AbsoluteX, 3, 4),
    // LSR
    (LsrA, 0x4A, Implied, 1, 2), (Lsr, 0x46, ZeroPage, 2, 5), (Lsr, 0x56, ZeroPageX, 2, 6),
    (Lsr, 0x4E, Absolute, 3, 6), (Lsr, 0x5E, AbsoluteX, 3, 7),
    // NOP
    (Nop, 0xEA, Implied, 1, 2),
    // ORA
    (Ora, 0x09, Immediate, 2, 2), (Ora, 0x05, ZeroPage, 2, 3), (Ora, 0x15, ZeroPageX, 2, 4),
    (Ora, 0x0D, Absolute, 3, 4), (Ora, 0x1D, AbsoluteX, 3, 4), (Ora, 0x19, AbsoluteY, 3, 4),
    (Ora, 0x01, IndirectX, 2, 6), (Ora, 0x11, IndirectY, 2, 5),
    // stack
    (Pha, 0x48, Implied, 1, 3), (Php, 0x08, Implied, 1, 3),
    (Pla, 0x68, Implied, 1, 4), (Plp, 0x28, Implied, 1, 4),
    // ROL
    (RolA, 0x2A, Implied, 1, 2), (Rol, 0x26, ZeroPage, 2, 5), (Rol, 0x36, ZeroPageX, 2, 6),
    (Rol, 0x2E, Absolute, 3, 6), (Rol, 0x3E, AbsoluteX, 3, 7),
    // ROR
    (RorA, 0x6A, Implied, 1, 2), (Ror, 0x66, ZeroPage, 2, 5), (Ror, 0x76, ZeroPageX, 2, 6),
    (Ror, 0x6E, Absolute, 3, 6), (Ror, 0x7E, AbsoluteX, 3, 7),
    // RTI / RTS
    (Rti, 0x40, Implied, 1, 6), (Rts, 0x60, Implied, 1, 6),
    // SBC
    (Sbc, 0xE9, Immediate, 2, 2), (Sbc, 0xE5, ZeroPage, 2, 3), (Sbc, 0xF5, ZeroPageX, 2, 4),
    (Sbc, 0xED, Absolute, 3, 4), (Sbc, 0xFD, AbsoluteX, 3, 4), (Sbc, 0xF9, AbsoluteY, 3, 4),
    (Sbc, 0xE1, IndirectX, 2, 6), (Sbc, 0xF1, IndirectY, 2, 5),
    // STA
    (Sta, 0x85, ZeroPage, 2, 3), (Sta, 0x95, ZeroPageX, 2, 4), (Sta, 0x8D, Absolute, 3, 4),
    (Sta, 0x9D, AbsoluteX, 3, 5), (Sta, 0x99, AbsoluteY, 3, 5),
    (Sta, 0x81, IndirectX, 2, 6), (Sta, 0x91, IndirectY, 2, 6),
    // STX / STY
    (Stx, 0x86, ZeroPage, 2, 3), (Stx, 0x96, ZeroPageY, 2, 4), (Stx, 0x8E, Absolute, 3, 4),
    (Sty, 0x84, ZeroPage, 2, 3), (Sty, 0x94, ZeroPageX, 2, 4), (Sty, 0x8C, Absolute, 3, 4),
    // transfers
    (Tax, 0xAA, Implied, 1, 2), (Tay, 0xA8, Implied, 1, 2), (Tsx, 0xBA, Implied, 1, 2),
    (Txa, 0x8A, Implied, 1, 2), (Txs, 0x9A, Implied, 1, 2), (Tya, 0x98, Implied, 1, 2),
];

/// The validated opcode table. Built once at CPU construction.
pub struct OpTable {
    entries: [Opcode; 256],
    defined: [bool; 256],
    mismatches: usize,
}

impl OpTable {
    /// Build the table and run the reference cross-check. Mismatching
    /// entries are reported and left undefined.
    pub fn new() -> Self {
        let mut table = Self { entries: BASE, defined: [false; 256], mismatches: 0 };
        for &(inst, opcode, mode, size, cycles) in REFERENCE {
            table.confirm(inst, opcode, mode, size, cycles);
        }
        table
    }

    fn confirm(&mut self, inst: Instruction, opcode: u8, mode: AddrMode, size: u8, cycles: u8) {
        let entry = &mut self.entries[opcode as usize];
        if entry.inst != inst || entry.mode != mode || entry.cycles != cycles {
            diag::error(&format!(
                "optable mismatch at ${opcode:02X}: table {:?}/{:?}/{} vs reference {:?}/{:?}/{}",
                entry.inst, entry.mode, entry.cycles, inst, mode, cycles
            ));
            self.mismatches += 1;
            return;
        }
        entry.size = size;
        self.defined[opcode as usize] = true;
    }

    pub fn decode(&self, opcode: u8) -> Opcode {
        self.entries[opcode as usize]
    }

    /// True when the opcode passed reference validation.
    pub fn is_defined(&self, opcode: u8) -> bool {
        self.defined[opcode as usize]
    }

    /// Number of base/reference disagreements found at build time.
    pub fn mismatches(&self) -> usize {
        self.mismatches
    }
}

impl Default for OpTable {
    fn default() -> Self {
        Self::new()
    }
}
