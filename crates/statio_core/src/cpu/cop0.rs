//! The system control coprocessor.
//!
//! Only the status register does real work in this core: bit 16 isolates
//! the cache, which the BIOS flips while it scrubs the cache lines early in
//! boot. The breakpoint registers exist so the BIOS can clear them; any
//! attempt to actually arm one is unimplemented and fatal.

use statio_util::Bits;

use crate::error::Fault;

pub struct Cop0 {
    /// Processor status. Bit 16 is the isolate cache flag.
    status: u32,
    /// Exception cause. Read-only here; real hardware lets software force
    /// the two software-interrupt bits, which nothing in the boot path
    /// does.
    cause: u32,
    /// Breakpoint on execute.
    bpc: u32,
    /// Breakpoint on data access.
    bda: u32,
    /// Breakpoint control.
    dcic: u32,
    /// Data access breakpoint mask.
    bdam: u32,
    /// Execute breakpoint mask.
    bpcm: u32,
}

/// Register numbers as they appear in the rd field of MTC0/MFC0.
const BPC: u32 = 3;
const BDA: u32 = 5;
const DCIC: u32 = 7;
const BDAM: u32 = 9;
const BPCM: u32 = 11;
const STATUS: u32 = 12;
const CAUSE: u32 = 13;

impl Cop0 {
    pub fn new() -> Self {
        Self {
            status: 0,
            cause: 0,
            bpc: 0,
            bda: 0,
            dcic: 0,
            bdam: 0,
            bpcm: 0,
        }
    }

    /// While the cache is isolated every store the CPU issues is swallowed
    /// before it reaches the bus.
    pub fn cache_isolated(&self) -> bool {
        self.status.bit(16)
    }

    /// MTC0. The breakpoint registers and cause only accept zero; anything
    /// else would need behaviour this core doesn't have.
    pub fn set_reg(&mut self, reg: u32, val: u32) -> Result<(), Fault> {
        let slot = match reg {
            STATUS => &mut self.status,
            CAUSE => &mut self.cause,
            BPC => &mut self.bpc,
            BDA => &mut self.bda,
            DCIC => &mut self.dcic,
            BDAM => &mut self.bdam,
            BPCM => &mut self.bpcm,
            _ => return Err(Fault::UnhandledCop0Reg(reg)),
        };

        if reg != STATUS && val != 0 {
            return Err(Fault::UnhandledCop0Reg(reg));
        }

        *slot = val;
        Ok(())
    }

    /// MFC0. Only status and cause are readable.
    pub fn read_reg(&self, reg: u32) -> Result<u32, Fault> {
        match reg {
            STATUS => Ok(self.status),
            CAUSE => Ok(self.cause),
            _ => Err(Fault::UnhandledCop0Reg(reg)),
        }
    }

    /// Raw view of a register, unrestricted by the MFC0 rules. For
    /// inspection only; the guest never comes through here.
    pub fn peek(&self, reg: u32) -> Option<u32> {
        match reg {
            STATUS => Some(self.status),
            CAUSE => Some(self.cause),
            BPC => Some(self.bpc),
            BDA => Some(self.bda),
            DCIC => Some(self.dcic),
            BDAM => Some(self.bdam),
            BPCM => Some(self.bpcm),
            _ => None,
        }
    }
}
