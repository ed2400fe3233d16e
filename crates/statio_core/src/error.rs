//! The fatal error taxonomy of the core.
//!
//! Real hardware turns most of these into CPU exceptions and keeps going.
//! This core instead stops the machine and reports what the guest did, which
//! surfaces emulation gaps the moment the BIOS hits them. Every variant
//! renders as a single `<kind>: 0x<hex>` line.

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    #[error("Unaligned read{bits}: 0x{addr:08x}")]
    UnalignedLoad { bits: u32, addr: u32 },

    #[error("Unaligned write{bits}: 0x{addr:08x}")]
    UnalignedStore { bits: u32, addr: u32 },

    #[error("Unmapped address for read{bits}: 0x{addr:08x}")]
    UnmappedLoad { bits: u32, addr: u32 },

    #[error("Unmapped address for write{bits}: 0x{addr:08x}")]
    UnmappedStore { bits: u32, addr: u32 },

    /// Unknown primary opcode, or an instruction for a coprocessor this
    /// core doesn't implement.
    #[error("Unhandled instruction: 0x{0:08x}")]
    UnhandledIns(u32),

    #[error("Unhandled instruction (SPECIAL): 0x{0:08x}")]
    UnhandledSpecial(u32),

    #[error("Unhandled instruction (COP0): 0x{0:08x}")]
    UnhandledCop0(u32),

    /// A COP0 register index this core can't service, or a non-zero write
    /// to one of the breakpoint registers or `cause`.
    #[error("Unhandled COP0 register (MTC0/MFC0): 0x{0:x}")]
    UnhandledCop0Reg(u32),

    #[error("Signed overflow in ADD/ADDI: 0x{0:08x}")]
    Overflow(u32),

    /// The HI/LO latches hold the architectural divide-by-zero values by
    /// the time this is raised.
    #[error("Division by zero in DIV/DIVU: 0x{0:08x}")]
    DivideByZero(u32),

    #[error("Bad Expansion {exp} Base Address write: 0x{val:08x}")]
    BadExpansionBase { exp: u32, val: u32 },
}
