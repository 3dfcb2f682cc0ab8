//! 6502 processor status register (P) flag bits.

pub const FLAG_CARRY: u32 = 1 << 0;
pub const FLAG_ZERO: u32 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u32 = 1 << 2;
pub const FLAG_DECIMAL: u32 = 1 << 3; // BCD mode for ADC/SBC
pub const FLAG_BREAK: u32 = 1 << 4;   // Set in the stack frame of BRK/IRQ
pub const FLAG_RESERVED: u32 = 1 << 5; // Unimplemented bit; always reads 1
pub const FLAG_OVERFLOW: u32 = 1 << 6;
pub const FLAG_NEGATIVE: u32 = 1 << 7;
