//! Core of a Playstation 1 emulator: the R3000A CPU interpreter and the
//! memory bus it drives. The host owns a ['System'] and calls
//! ['System::tick'] in a loop; everything else happens behind that.

#[macro_use]
extern crate log;

#[cfg(test)]
mod test;

mod error;

pub mod bus;
pub mod cpu;

pub use bus::bios::{Bios, BiosError};
pub use bus::{Bus, StubLog, StubWrite, WriteLog};
pub use cpu::Cpu;
pub use error::Fault;

/// The whole machine. The system owns the CPU, the CPU owns the bus, the
/// bus owns the memories; no component holds a back pointer.
pub struct System {
    pub cpu: Cpu,
}

impl System {
    pub fn new(bios: Bios) -> Self {
        Self {
            cpu: Cpu::new(Bus::new(bios)),
        }
    }

    /// Retire one instruction. The only externally observable point of
    /// ordering: each call performs one fetch, one execute and zero or
    /// more bus transactions, then commits pending register writes.
    ///
    /// An `Err` is fatal. The machine must not be ticked again and only
    /// the state documented with the individual ['Fault'] (the HI/LO
    /// latches for divide by zero) is meaningful afterwards.
    pub fn tick(&mut self, log: &mut impl StubLog) -> Result<(), Fault> {
        self.cpu.step(log)
    }

    pub fn bus(&self) -> &Bus {
        &self.cpu.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.cpu.bus
    }
}
