//! 6502 CPU core: register file, interrupts, fetch-decode-execute.
//!
//! One [`Cpu::step`] runs a single instruction (or services one pending
//! interrupt) and returns the cycles it consumed, including page-cross and
//! branch penalties. The engine never touches the PPU directly; everything
//! goes through the [`Bus`] trait so tests can run against flat RAM.

use std::fmt;

use crate::bits::field::{BitField, Wide};
use crate::bits::flags::FlagReg;
use crate::bus::Bus;
use crate::cpu::flags::{
    FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE, FLAG_OVERFLOW,
    FLAG_RESERVED, FLAG_ZERO,
};
use crate::cpu::optable::{AddrMode, Instruction, OpTable, Opcode};
use crate::diag;

pub const VECTOR_NMI: u16 = 0xFFFA;
pub const VECTOR_RESET: u16 = 0xFFFC;
pub const VECTOR_IRQ: u16 = 0xFFFE; // shared by IRQ and BRK

const STACK_PAGE: u16 = 0x0100;

/// Interrupt kinds, in ascending service priority.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Irq {
    /// Software interrupt (BRK semantics through the IRQ vector).
    Brk,
    /// Maskable hardware interrupt.
    Irq,
    /// Non-maskable interrupt (PPU vblank).
    Nmi,
    /// Power-on / reset line.
    Reset,
}

/// Execution stopped: the ROM ran into an opcode the table does not define.
/// A content error, not a core bug; the frame driver stops this CPU.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExecError {
    IllegalOpcode { pc: u16, opcode: u8 },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::IllegalOpcode { pc, opcode } => {
                write!(f, "illegal opcode ${opcode:02X} at ${pc:04X}")
            }
        }
    }
}

impl std::error::Error for ExecError {}

/// 6502 register file plus the decoded-opcode table and pending-interrupt
/// state. Owns its bus.
pub struct Cpu<B: Bus> {
    pub a: BitField<8>,
    pub x: BitField<8>,
    pub y: BitField<8>,
    pub sp: BitField<8>,
    pub pc: BitField<16>,
    pub p: FlagReg<8>,
    pub bus: B,
    pub halted: bool,
    /// nestest-style per-instruction trace lines when enabled.
    pub trace: bool,
    table: OpTable,
    pending_irq: Option<Irq>,
    inst_count: u64,
}

impl<B: Bus> Cpu<B> {
    pub fn new(bus: B) -> Self {
        Self {
            a: BitField::default(),
            x: BitField::default(),
            y: BitField::default(),
            sp: BitField::default(),
            pc: BitField::default(),
            p: FlagReg::default(),
            bus,
            halted: false,
            trace: false,
            table: OpTable::new(),
            pending_irq: None,
            inst_count: 0,
        }
    }

    /// Power-on state: A=X=Y=0, SP=$FF, P holds only the reserved bit,
    /// PC from the reset vector.
    pub fn reset(&mut self) {
        self.a.set_zero();
        self.x.set_zero();
        self.y.set_zero();
        self.sp.set_max();
        self.p.clear_all();
        self.p.set(FLAG_RESERVED);

        self.halted = false;
        self.pending_irq = None;
        self.inst_count = 0;

        let pc = self.read_word(VECTOR_RESET);
        self.pc = BitField::new(pc as u32);
    }

    /// Latch an interrupt request. A higher-priority kind replaces a
    /// lower-priority pending one; the reverse is dropped.
    pub fn request_irq(&mut self, irq: Irq) {
        if self.pending_irq.is_none_or(|cur| irq > cur) {
            self.pending_irq = Some(irq);
        }
    }

    /// Run one step: service at most one pending interrupt, or fetch,
    /// decode and execute one instruction. Returns cycles consumed.
    pub fn step(&mut self) -> Result<u32, ExecError> {
        if let Some(irq) = self.pending_irq {
            let masked =
                matches!(irq, Irq::Irq | Irq::Brk) && self.p.test(FLAG_INTERRUPT_DISABLE);
            if !masked {
                self.pending_irq = None;
                return Ok(self.service_irq(irq));
            }
        }

        let opaddr = self.pc;
        let opcode = self.fetch_byte();

        if !self.table.is_defined(opcode) {
            self.halted = true;
            self.dump_halt(opaddr, opcode);
            return Err(ExecError::IllegalOpcode { pc: opaddr.value() as u16, opcode });
        }

        let opinf = self.table.decode(opcode);
        self.inst_count += 1;
        if self.trace {
            self.trace_line(opaddr, opcode, opinf);
        }

        let (addr, mut cycles_extra) = self.effective_address(opinf);

        debug_assert_eq!(
            self.pc.minus(opaddr.value()).value(),
            opinf.size as u32,
            "PC advance does not match size of {}",
            opinf.inst.mnemonic()
        );

        cycles_extra += self.execute(opinf, opaddr, addr);
        Ok(opinf.cycles as u32 + cycles_extra)
    }

    // ---- interrupt handling ----

    fn service_irq(&mut self, irq: Irq) -> u32 {
        match irq {
            Irq::Reset => self.reset(),
            Irq::Nmi | Irq::Irq | Irq::Brk => {
                self.push_word(self.pc.value() as u16);
                let mut frame = self.p;
                frame.set(FLAG_RESERVED);
                // the break bit goes into the frame only for software kinds
                frame.put(FLAG_BREAK, matches!(irq, Irq::Irq | Irq::Brk));
                self.push(frame.value() as u8);
                self.p.set(FLAG_INTERRUPT_DISABLE);
                let vector = if irq == Irq::Nmi { VECTOR_NMI } else { VECTOR_IRQ };
                self.pc = BitField::new(self.read_word(vector) as u32);
            }
        }
        7
    }

    // ---- bus access helpers ----

    fn read(&mut self, addr: BitField<16>) -> u8 {
        self.bus.read(addr.value() as u16)
    }

    fn write(&mut self, addr: BitField<16>, value: u8) {
        self.bus.write(addr.value() as u16, value);
    }

    /// Little-endian word read (no page wrap; used for vectors/operands).
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.bus.read(addr) as u16;
        let hi = self.bus.read(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Fetch the byte at PC and advance PC.
    fn fetch_byte(&mut self) -> u8 {
        let byte = self.bus.read(self.pc.value() as u16);
        self.pc.inc();
        byte
    }

    /// Fetch a little-endian word at PC and advance PC by 2.
    fn fetch_word(&mut self) -> u16 {
        let lo = self.fetch_byte() as u16;
        let hi = self.fetch_byte() as u16;
        (hi << 8) | lo
    }

    /// Zero-page word read. The high byte wraps to $00 when the pointer
    /// sits at $FF, as on real hardware.
    fn load_zp_word(&mut self, zp: u8) -> u16 {
        let lo = self.bus.read(zp as u16) as u16;
        let hi = self.bus.read(zp.wrapping_add(1) as u16) as u16;
        (hi << 8) | lo
    }

    // ---- stack ----

    fn push(&mut self, value: u8) {
        self.bus.write(STACK_PAGE | self.sp.value() as u16, value);
        self.sp.dec();
        debug_assert!(!self.sp.is_max(), "stack overflow");
    }

    fn push_word(&mut self, value: u16) {
        self.push((value >> 8) as u8);
        self.push(value as u8);
    }

    fn pop(&mut self) -> u8 {
        debug_assert!(!self.sp.is_max(), "stack underflow");
        self.sp.inc();
        self.bus.read(STACK_PAGE | self.sp.value() as u16)
    }

    fn pop_word(&mut self) -> u16 {
        let lo = self.pop() as u16;
        let hi = self.pop() as u16;
        (hi << 8) | lo
    }

    // ---- addressing ----

    /// Resolve the instruction's effective address. Returns the address
    /// (unused for implied/accumulator forms) and the page-cross penalty.
    fn effective_address(&mut self, opinf: Opcode) -> (BitField<16>, u32) {
        let mut cycle_add = 0;
        let addr = match opinf.mode {
            AddrMode::Implied => BitField::default(),

            // operand value lives at PC itself
            AddrMode::Immediate => {
                let addr = self.pc;
                self.pc.inc();
                addr
            }

            AddrMode::ZeroPage => BitField::new(self.fetch_byte() as u32),

            AddrMode::ZeroPageX => {
                let base = self.fetch_byte();
                BitField::new(base.wrapping_add(self.x.value() as u8) as u32)
            }

            AddrMode::ZeroPageY => {
                let base = self.fetch_byte();
                BitField::new(base.wrapping_add(self.y.value() as u8) as u32)
            }

            AddrMode::Absolute => BitField::new(self.fetch_word() as u32),

            AddrMode::AbsoluteX => {
                let base = self.fetch_word() as u32;
                let addr = BitField::<16>::wrap(base + self.x.value());
                // only the 4-cycle read forms pay for crossing a page
                if (base ^ addr.value()) & 0xFF00 != 0 && opinf.cycles == 4 {
                    cycle_add = 1;
                }
                addr
            }

            AddrMode::AbsoluteY => {
                let base = self.fetch_word() as u32;
                let addr = BitField::<16>::wrap(base + self.y.value());
                if (base ^ addr.value()) & 0xFF00 != 0 && opinf.cycles == 4 {
                    cycle_add = 1;
                }
                addr
            }

            AddrMode::IndirectX => {
                let ptr = self.fetch_byte().wrapping_add(self.x.value() as u8);
                BitField::new(self.load_zp_word(ptr) as u32)
            }

            AddrMode::IndirectY => {
                let zp = self.fetch_byte();
                let base = self.load_zp_word(zp) as u32;
                let addr = BitField::<16>::wrap(base + self.y.value());
                if (base ^ addr.value()) & 0xFF00 != 0 && opinf.cycles == 5 {
                    cycle_add = 1;
                }
                addr
            }

            // JMP ($xxxx): the high byte of the target is fetched from the
            // same page as the low byte even when the pointer ends in $FF
            AddrMode::Indirect => {
                let ptr = self.fetch_word();
                let lo = self.bus.read(ptr) as u16;
                let hi_ptr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let hi = self.bus.read(hi_ptr) as u16;
                BitField::new(((hi << 8) | lo) as u32)
            }

            // displacement applies to the already-advanced PC
            AddrMode::Relative => {
                let disp = self.fetch_byte() as u32;
                let target = if disp & 0x80 != 0 {
                    self.pc.value().wrapping_add(disp).wrapping_sub(256)
                } else {
                    self.pc.value().wrapping_add(disp)
                };
                BitField::wrap(target)
            }
        };
        (addr, cycle_add)
    }

    // ---- flag helpers ----

    fn set_nz(&mut self, value: BitField<8>) {
        self.p.put(FLAG_ZERO, value.is_zero());
        self.p.put(FLAG_NEGATIVE, value.is_negative());
    }

    fn carry_in(&self) -> u32 {
        self.p.test(FLAG_CARRY) as u32
    }

    // ---- shared ALU pieces ----

    fn adc(&mut self, value: u8) {
        if !self.p.test(FLAG_DECIMAL) {
            let mut sum = Wide::<8>::from_field(self.a);
            sum.add(value as u32);
            sum.add(self.carry_in());
            let result = sum.trim();
            let a = self.a.value();
            let overflow = !(a ^ value as u32) & (a ^ result.value()) & 0x80 != 0;
            self.p.put(FLAG_OVERFLOW, overflow);
            self.p.put(FLAG_CARRY, sum.is_overflow());
            self.a = result;
        } else {
            // nibble-wise decimal add: per-digit carry, overflow on a bad
            // high-digit carry
            let value = value as u32;
            let mut temp = self.a.value() + self.carry_in();
            if (temp & 0xF) + (value & 0xF) > 9 {
                temp += (value & 0xF) + 6;
                self.p.set(FLAG_CARRY);
            } else {
                temp += value & 0xF;
                self.p.clear(FLAG_CARRY);
            }
            if (temp >> 4) + (value >> 4) > 9 {
                temp += (value & 0xF0) + 0x60;
                self.p.set(FLAG_OVERFLOW);
                self.p.set(FLAG_CARRY);
            } else {
                temp += value & 0xF0;
                self.p.clear(FLAG_OVERFLOW);
            }
            self.a = BitField::wrap(temp);
        }
        self.set_nz(self.a);
    }

    fn sbc(&mut self, value: u8) {
        let a = self.a.value();
        let m = value as u32;
        let borrow = 1 - self.carry_in();

        let mut diff = Wide::<8>::from_field(self.a);
        diff.sub(m);
        diff.sub(borrow);
        let result = diff.trim();

        let overflow = (a ^ m) & (a ^ result.value()) & 0x80 != 0;
        self.p.put(FLAG_OVERFLOW, overflow);
        // carry set means no borrow occurred
        self.p.put(FLAG_CARRY, !diff.is_overflow());

        if !self.p.test(FLAG_DECIMAL) {
            self.a = result;
        } else {
            // decimal fix-up on the binary result; flags stay binary
            let mut adjusted = result.value();
            if (a & 0xF) < (m & 0xF) + borrow {
                adjusted = adjusted.wrapping_sub(0x06);
            }
            if diff.is_overflow() {
                adjusted = adjusted.wrapping_sub(0x60);
            }
            self.a = BitField::wrap(adjusted);
        }
        self.set_nz(BitField::wrap(result.value()));
    }

    fn compare(&mut self, reg: BitField<8>, value: u8) {
        // reg + 0x100 - value: bit 8 surviving means reg >= value
        let mut diff = Wide::<8>::new(reg.value() + 0x100);
        diff.sub(value as u32);
        self.p.put(FLAG_CARRY, diff.is_overflow());
        self.set_nz(diff.trim());
    }

    fn asl(&mut self, operand: &mut BitField<8>) {
        self.p.put(FLAG_CARRY, operand.msb());
        operand.shl(1);
        self.set_nz(*operand);
    }

    fn lsr(&mut self, operand: &mut BitField<8>) {
        self.p.put(FLAG_CARRY, operand.lsb());
        operand.shr(1);
        self.p.put(FLAG_ZERO, operand.is_zero());
        // the result's top bit is always 0
        self.p.clear(FLAG_NEGATIVE);
    }

    fn rol(&mut self, operand: &mut BitField<8>) {
        let carry = operand.rcl(self.p.test(FLAG_CARRY));
        self.p.put(FLAG_CARRY, carry);
        self.set_nz(*operand);
    }

    fn ror(&mut self, operand: &mut BitField<8>) {
        let carry = operand.rcr(self.p.test(FLAG_CARRY));
        self.p.put(FLAG_CARRY, carry);
        self.set_nz(*operand);
    }

    /// Read-modify-write pattern for the memory forms of shifts/INC/DEC.
    fn modify<F: FnOnce(&mut Self, &mut BitField<8>)>(&mut self, addr: BitField<16>, f: F) {
        let mut value = BitField::new(self.read(addr) as u32);
        f(self, &mut value);
        self.write(addr, value.value() as u8);
    }

    /// Shared branch tail: +1 cycle when taken, +2 when the instruction
    /// address and the target sit on different pages.
    fn take_branch(&mut self, opaddr: BitField<16>, target: BitField<16>) -> u32 {
        let cycles = if (opaddr.value() ^ target.value()) & 0xFF00 != 0 { 2 } else { 1 };
        self.pc = target;
        cycles
    }

    /// Pop the status register: the reserved bit is forced on and the break
    /// bit off, as neither exists as real storage on the 6502.
    fn pop_status(&mut self) {
        let raw = self.pop() as u32;
        self.p.load(raw);
        self.p.set(FLAG_RESERVED);
        self.p.clear(FLAG_BREAK);
    }

    // ---- execution ----

    fn execute(&mut self, opinf: Opcode, opaddr: BitField<16>, addr: BitField<16>) -> u32 {
        let mut cycle_add = 0;
        match opinf.inst {
            Instruction::Adc => {
                let value = self.read(addr);
                self.adc(value);
            }
            Instruction::Sbc => {
                let value = self.read(addr);
                self.sbc(value);
            }

            Instruction::And => {
                let value = self.read(addr);
                self.a.and(value as u32);
                self.set_nz(self.a);
            }
            Instruction::Ora => {
                let value = self.read(addr);
                self.a.or(value as u32);
                self.set_nz(self.a);
            }
            Instruction::Eor => {
                let value = self.read(addr);
                self.a.xor(value as u32);
                self.set_nz(self.a);
            }

            Instruction::AslA => {
                let mut a = self.a;
                self.asl(&mut a);
                self.a = a;
            }
            Instruction::Asl => self.modify(addr, Self::asl),
            Instruction::LsrA => {
                let mut a = self.a;
                self.lsr(&mut a);
                self.a = a;
            }
            Instruction::Lsr => self.modify(addr, Self::lsr),
            Instruction::RolA => {
                let mut a = self.a;
                self.rol(&mut a);
                self.a = a;
            }
            Instruction::Rol => self.modify(addr, Self::rol),
            Instruction::RorA => {
                let mut a = self.a;
                self.ror(&mut a);
                self.a = a;
            }
            Instruction::Ror => self.modify(addr, Self::ror),

            Instruction::Bcc => {
                if !self.p.test(FLAG_CARRY) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Bcs => {
                if self.p.test(FLAG_CARRY) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Beq => {
                if self.p.test(FLAG_ZERO) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Bne => {
                if !self.p.test(FLAG_ZERO) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Bmi => {
                if self.p.test(FLAG_NEGATIVE) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Bpl => {
                if !self.p.test(FLAG_NEGATIVE) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Bvc => {
                if !self.p.test(FLAG_OVERFLOW) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }
            Instruction::Bvs => {
                if self.p.test(FLAG_OVERFLOW) {
                    cycle_add = self.take_branch(opaddr, addr);
                }
            }

            Instruction::Brk => {
                // software interrupt: skip the padding byte, stack the
                // return state with the break bit forced, take the IRQ vector
                self.pc.inc();
                self.push_word(self.pc.value() as u16);
                self.p.set(FLAG_BREAK);
                let mut frame = self.p;
                frame.set(FLAG_RESERVED);
                self.push(frame.value() as u8);
                self.p.set(FLAG_INTERRUPT_DISABLE);
                self.pc = BitField::new(self.read_word(VECTOR_IRQ) as u32);
            }

            Instruction::Bit => {
                let value = BitField::<8>::new(self.read(addr) as u32);
                // bits 7 and 6 copy straight into N and V
                self.p.put(FLAG_NEGATIVE, value.bit(7));
                self.p.put(FLAG_OVERFLOW, value.bit(6));
                let masked = BitField::<8>::wrap(value.value() & self.a.value());
                self.p.put(FLAG_ZERO, masked.is_zero());
            }

            Instruction::Clc => self.p.clear(FLAG_CARRY),
            Instruction::Cld => self.p.clear(FLAG_DECIMAL),
            Instruction::Cli => self.p.clear(FLAG_INTERRUPT_DISABLE),
            Instruction::Clv => self.p.clear(FLAG_OVERFLOW),
            Instruction::Sec => self.p.set(FLAG_CARRY),
            Instruction::Sed => self.p.set(FLAG_DECIMAL),
            Instruction::Sei => self.p.set(FLAG_INTERRUPT_DISABLE),

            Instruction::Cmp => {
                let value = self.read(addr);
                self.compare(self.a, value);
            }
            Instruction::Cpx => {
                let value = self.read(addr);
                self.compare(self.x, value);
            }
            Instruction::Cpy => {
                let value = self.read(addr);
                self.compare(self.y, value);
            }

            Instruction::Dec => self.modify(addr, |cpu, value| {
                value.dec();
                cpu.set_nz(*value);
            }),
            Instruction::Inc => self.modify(addr, |cpu, value| {
                value.inc();
                cpu.set_nz(*value);
            }),
            Instruction::Dex => {
                self.x.dec();
                self.set_nz(self.x);
            }
            Instruction::Dey => {
                self.y.dec();
                self.set_nz(self.y);
            }
            Instruction::Inx => {
                self.x.inc();
                self.set_nz(self.x);
            }
            Instruction::Iny => {
                self.y.inc();
                self.set_nz(self.y);
            }

            Instruction::Jmp => self.pc = addr,
            Instruction::Jsr => {
                // return address is the last byte of this instruction;
                // RTS adds one to land on the next
                let ret = self.pc.minus(1);
                self.push_word(ret.value() as u16);
                self.pc = addr;
            }
            Instruction::Rts => {
                let ret = self.pop_word();
                self.pc = BitField::wrap(ret as u32 + 1);
            }
            Instruction::Rti => {
                self.pop_status();
                self.pc = BitField::new(self.pop_word() as u32);
            }

            Instruction::Lda => {
                let value = BitField::new(self.read(addr) as u32);
                self.set_nz(value);
                self.a = value;
            }
            Instruction::Ldx => {
                let value = BitField::new(self.read(addr) as u32);
                self.set_nz(value);
                self.x = value;
            }
            Instruction::Ldy => {
                let value = BitField::new(self.read(addr) as u32);
                self.set_nz(value);
                self.y = value;
            }
            Instruction::Sta => {
                let a = self.a.value() as u8;
                self.write(addr, a);
            }
            Instruction::Stx => {
                let x = self.x.value() as u8;
                self.write(addr, x);
            }
            Instruction::Sty => {
                let y = self.y.value() as u8;
                self.write(addr, y);
            }

            Instruction::Nop => {}

            Instruction::Pha => {
                let a = self.a.value() as u8;
                self.push(a);
            }
            Instruction::Php => {
                // pushed copy carries break and reserved set
                let mut frame = self.p;
                frame.set(FLAG_BREAK | FLAG_RESERVED);
                self.push(frame.value() as u8);
            }
            Instruction::Pla => {
                self.a = BitField::new(self.pop() as u32);
                self.set_nz(self.a);
            }
            Instruction::Plp => self.pop_status(),

            Instruction::Tax => {
                self.x = self.a;
                self.set_nz(self.x);
            }
            Instruction::Tay => {
                self.y = self.a;
                self.set_nz(self.y);
            }
            Instruction::Tsx => {
                self.x = self.sp;
                self.set_nz(self.x);
            }
            Instruction::Txa => {
                self.a = self.x;
                self.set_nz(self.a);
            }
            Instruction::Txs => self.sp = self.x,
            Instruction::Tya => {
                self.a = self.y;
                self.set_nz(self.a);
            }
        }
        cycle_add
    }

    // ---- diagnostics ----

    fn trace_line(&self, opaddr: BitField<16>, opcode: u8, opinf: Opcode) {
        println!(
            "{:04X}  {:02X} {}    A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            opaddr.value(),
            opcode,
            opinf.inst.mnemonic(),
            self.a.value(),
            self.x.value(),
            self.y.value(),
            self.p.value(),
            self.sp.value(),
        );
    }

    fn dump_halt(&self, opaddr: BitField<16>, opcode: u8) {
        diag::error(&format!(
            "undefined opcode ${:02X} at ${:04X} after {} instructions \
             (A={:02X} X={:02X} Y={:02X} P={:02X} SP={:02X})",
            opcode,
            opaddr.value(),
            self.inst_count,
            self.a.value(),
            self.x.value(),
            self.y.value(),
            self.p.value(),
            self.sp.value(),
        ));
    }
}
