//! Ferricom: an NES (Nintendo Entertainment System) emulator written in Rust.
//!
//! Emulates the Ricoh 2A03 CPU (6502 core), the 2C02 PPU at scanline
//! granularity, and the cartridge memory mapping documented on the
//! [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide).
//!
//! ## Modules
//!
//! - **bits** – fixed-width bit-field values and bitmask flag registers;
//!   the wraparound/rotate/field primitives everything else builds on
//! - **bus** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map):
//!   RAM mirrors, PPU ports, SRAM, PRG windows, OAM DMA
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) loading and
//!   [mapper](https://www.nesdev.org/wiki/Mapper) bank windows
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU): validated opcode
//!   table, addressing modes, interrupts, decimal mode
//! - **ppu** – [PPU](https://www.nesdev.org/wiki/PPU): registers, scroll
//!   reconstruction, VRAM mirroring, background/sprite compositing
//! - **nes** – frame driver interleaving CPU instructions with PPU
//!   scanlines on the NTSC cycle budget

pub mod bits;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod diag;
pub mod nes;
pub mod ppu;
