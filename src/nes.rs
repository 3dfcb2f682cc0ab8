//! Frame driver: interleaves CPU execution with PPU scanline advance.
//!
//! The CPU runs whole instructions; once the per-scanline cycle budget is
//! spent the PPU advances one scanline. The PPU never observes a partially
//! executed instruction, and NMI requests are forwarded at instruction
//! boundaries only.

use crate::bus::NesBus;
use crate::cartridge::cartridge::Cartridge;
use crate::cartridge::mmc::{Mmc, SetupError};
use crate::cpu::cpu::{Cpu, ExecError, Irq};
use crate::ppu::Screen;

/// NTSC: 113.67 CPU cycles per scanline, rounded to the usual integer.
pub const CYCLES_PER_SCANLINE: u32 = 114;

/// A complete machine: CPU with its bus (MMC + PPU), driven frame by frame.
pub struct Nes {
    pub cpu: Cpu<NesBus>,
    cycles: u32,
}

impl Nes {
    /// Build the machine around a parsed cartridge and reset it. Fails on
    /// cartridges whose mapper hardware is not modelled.
    pub fn new(cart: Cartridge) -> Result<Self, SetupError> {
        let mmc = Mmc::new(cart);
        let mut bus = NesBus::new(mmc);
        bus.mmc.setup(&mut bus.ppu)?;

        let mut cpu = Cpu::new(bus);
        cpu.reset();
        Ok(Self { cpu, cycles: 0 })
    }

    /// Run until the PPU completes one frame. Returns the error that
    /// halted the CPU, if any; the caller should stop driving this machine.
    pub fn run_frame(&mut self, screen: &mut dyn Screen) -> Result<(), ExecError> {
        loop {
            while self.cycles > CYCLES_PER_SCANLINE {
                self.cycles -= CYCLES_PER_SCANLINE;
                if self.cpu.bus.ppu.end_scanline(screen) {
                    return Ok(()); // frame complete
                }
                if self.cpu.bus.ppu.take_nmi() {
                    self.cpu.request_irq(Irq::Nmi);
                }
            }
            self.cycles += self.cpu.step()?;
        }
    }
}
