//! The memory bus of the Playstation 1.
//!
//! Every memory transaction of the CPU goes through here. The bus masks the
//! virtual address down to the physical view, checks alignment for the
//! access width and dispatches to whatever device owns the range. Most
//! peripherals are write-sink stubs for now, but each swallowed write is
//! reported through ['StubLog'] so the behaviour stays observable.

pub mod bios;
pub mod ram;

use crate::error::Fault;
use bios::Bios;
use ram::Ram;

/// Reduce a virtual address to its physical view. KUSEG, KSEG0 and KSEG1
/// all mirror the low 512 MiB; KSEG2 is left untouched since it holds the
/// cache control register.
#[inline]
pub fn regioned_addr(addr: u32) -> u32 {
    const REGION_MAP: [u32; 8] = [
        0x1fff_ffff,
        0x1fff_ffff,
        0x1fff_ffff,
        0x1fff_ffff,
        0x1fff_ffff,
        0x1fff_ffff,
        0xffff_ffff,
        0xffff_ffff,
    ];
    addr & REGION_MAP[(addr >> 29) as usize]
}

/// An addressable unit: the three access widths the CPU can issue.
pub trait AddrUnit: Copy {
    /// Width in bytes.
    const WIDTH: usize;

    /// Width in bits, as it appears in diagnostics.
    const BITS: u32;

    fn is_aligned(addr: u32) -> bool;

    fn from_u32(val: u32) -> Self;

    fn as_u32(self) -> u32;
}

impl AddrUnit for u8 {
    const WIDTH: usize = 1;
    const BITS: u32 = 8;

    fn is_aligned(_: u32) -> bool {
        true
    }

    fn from_u32(val: u32) -> Self {
        val as u8
    }

    fn as_u32(self) -> u32 {
        self.into()
    }
}

impl AddrUnit for u16 {
    const WIDTH: usize = 2;
    const BITS: u32 = 16;

    fn is_aligned(addr: u32) -> bool {
        addr & 0x1 == 0
    }

    fn from_u32(val: u32) -> Self {
        val as u16
    }

    fn as_u32(self) -> u32 {
        self.into()
    }
}

impl AddrUnit for u32 {
    const WIDTH: usize = 4;
    const BITS: u32 = 32;

    fn is_aligned(addr: u32) -> bool {
        addr & 0x3 == 0
    }

    fn from_u32(val: u32) -> Self {
        val
    }

    fn as_u32(self) -> u32 {
        self
    }
}

/// A device's slice of the physical address space.
pub trait BusMap {
    /// The first address in the range.
    const BUS_BEGIN: u32;

    /// The last address included in the range.
    const BUS_END: u32;

    /// Offset into the range from a physical address, or `None` if the
    /// address falls outside it.
    fn offset(addr: u32) -> Option<u32> {
        (Self::BUS_BEGIN..=Self::BUS_END)
            .contains(&addr)
            .then(|| addr - Self::BUS_BEGIN)
    }
}

/// Observer for writes swallowed by peripheral stubs.
///
/// The bus has no global state; whoever drives the machine passes an
/// implementation down through ['crate::System::tick']. The unit type is
/// the no-op observer.
pub trait StubLog {
    fn stub_store(&mut self, width: u32, addr: u32, val: u32);
}

impl StubLog for () {
    fn stub_store(&mut self, _: u32, _: u32, _: u32) {}
}

/// One write swallowed by a peripheral stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StubWrite {
    /// Access width in bits.
    pub width: u32,
    /// Physical address.
    pub addr: u32,
    pub val: u32,
}

/// ['StubLog'] implementation that records every swallowed write in order.
#[derive(Default)]
pub struct WriteLog {
    pub writes: Vec<StubWrite>,
}

impl StubLog for WriteLog {
    fn stub_store(&mut self, width: u32, addr: u32, val: u32) {
        self.writes.push(StubWrite { width, addr, val });
    }
}

pub struct Bus {
    pub bios: Bios,
    ram: Ram,
    mem_ctrl: MemCtrl,
    ram_size: RamSize,
    cache_ctrl: CacheCtrl,
}

impl Bus {
    pub fn new(bios: Bios) -> Self {
        Self {
            bios,
            ram: Ram::new(),
            mem_ctrl: MemCtrl::new(),
            ram_size: RamSize(0),
            cache_ctrl: CacheCtrl(0),
        }
    }

    /// Load a value of width `T`. `addr` is the untranslated CPU address;
    /// alignment is checked before region masking so faults report what the
    /// guest actually issued.
    pub fn load<T: AddrUnit>(&self, addr: u32) -> Result<T, Fault> {
        if !T::is_aligned(addr) {
            return Err(Fault::UnalignedLoad { bits: T::BITS, addr });
        }

        let phys = regioned_addr(addr);

        let val = match phys {
            Ram::BUS_BEGIN..=Ram::BUS_END => {
                return Ok(self.ram.load(phys - Ram::BUS_BEGIN));
            }
            Bios::BUS_BEGIN..=Bios::BUS_END => {
                return Ok(self.bios.load(phys - Bios::BUS_BEGIN));
            }
            MemCtrl::BUS_BEGIN..=MemCtrl::BUS_END => {
                self.mem_ctrl.load(phys - MemCtrl::BUS_BEGIN)
            }
            RamSize::BUS_BEGIN..=RamSize::BUS_END => self.ram_size.0,
            CacheCtrl::BUS_BEGIN..=CacheCtrl::BUS_END => self.cache_ctrl.0,
            IRQ_CTRL_BEGIN..=IRQ_CTRL_END => {
                debug!("interrupt control read at {phys:08x}");
                0
            }
            TIMER_BEGIN..=TIMER_END => {
                debug!("timer read at {phys:08x}");
                0
            }
            SPU_BEGIN..=SPU_END => 0,
            // Nothing is plugged into the expansion slots, so reads see the
            // bus pulled high.
            EXP1_BEGIN..=EXP1_END | EXP2_BEGIN..=EXP2_END => 0xff,
            _ => {
                return Err(Fault::UnmappedLoad { bits: T::BITS, addr });
            }
        };

        Ok(T::from_u32(val))
    }

    /// Store a value of width `T`. Writes into stub ranges succeed without
    /// a CPU-visible effect but are handed to `log`.
    pub fn store<T: AddrUnit>(
        &mut self,
        log: &mut impl StubLog,
        addr: u32,
        val: T,
    ) -> Result<(), Fault> {
        if !T::is_aligned(addr) {
            return Err(Fault::UnalignedStore { bits: T::BITS, addr });
        }

        let phys = regioned_addr(addr);
        let val = val.as_u32();

        match phys {
            Ram::BUS_BEGIN..=Ram::BUS_END => {
                self.ram.store::<T>(phys - Ram::BUS_BEGIN, val);
            }
            MemCtrl::BUS_BEGIN..=MemCtrl::BUS_END => {
                self.mem_ctrl.store::<T>(log, phys - MemCtrl::BUS_BEGIN, val)?;
            }
            RamSize::BUS_BEGIN..=RamSize::BUS_END => {
                self.ram_size.0 = val;
                stub::<T>(log, "ram size", phys, val);
            }
            CacheCtrl::BUS_BEGIN..=CacheCtrl::BUS_END => {
                self.cache_ctrl.0 = val;
                stub::<T>(log, "cache control", phys, val);
            }
            IRQ_CTRL_BEGIN..=IRQ_CTRL_END => {
                stub::<T>(log, "interrupt control", phys, val);
            }
            TIMER_BEGIN..=TIMER_END => {
                stub::<T>(log, "timer", phys, val);
            }
            SPU_BEGIN..=SPU_END => {
                stub::<T>(log, "SPU", phys, val);
            }
            EXP1_BEGIN..=EXP1_END => {
                stub::<T>(log, "expansion 1", phys, val);
            }
            EXP2_BEGIN..=EXP2_END => {
                stub::<T>(log, "expansion 2", phys, val);
            }
            _ => {
                return Err(Fault::UnmappedStore { bits: T::BITS, addr });
            }
        }

        Ok(())
    }

    /// Read without faulting or touching any device state. Only RAM and the
    /// BIOS can be peeked; everything else yields `None`.
    pub fn peek<T: AddrUnit>(&self, addr: u32) -> Option<T> {
        let phys = regioned_addr(addr);
        if let Some(offset) = Ram::offset(phys) {
            Some(self.ram.load(offset))
        } else if let Some(offset) = Bios::offset(phys) {
            Some(self.bios.load(offset))
        } else {
            None
        }
    }
}

/// Record a write swallowed by a peripheral stub.
fn stub<T: AddrUnit>(log: &mut impl StubLog, what: &str, phys: u32, val: u32) {
    debug!("{what} write{} of {val:08x} at {phys:08x} ignored", T::BITS);
    log.stub_store(T::BITS, phys, val);
}

/// The memory control register block. The BIOS reprograms bus timings here
/// during boot; the only values it may give the two expansion base address
/// registers are the ones the rest of the map assumes.
struct MemCtrl {
    regs: [u32; 9],
}

impl MemCtrl {
    fn new() -> Self {
        Self { regs: [0x0; 9] }
    }

    fn store<T: AddrUnit>(
        &mut self,
        log: &mut impl StubLog,
        offset: u32,
        val: u32,
    ) -> Result<(), Fault> {
        match offset {
            0 if val != 0x1f00_0000 => {
                return Err(Fault::BadExpansionBase { exp: 1, val });
            }
            4 if val != 0x1f80_2000 => {
                return Err(Fault::BadExpansionBase { exp: 2, val });
            }
            0 | 4 => {}
            _ => stub::<T>(log, "memory control", Self::BUS_BEGIN + offset, val),
        }
        self.regs[(offset >> 2) as usize] = val;
        Ok(())
    }

    fn load(&self, offset: u32) -> u32 {
        self.regs[(offset >> 2) as usize]
    }
}

impl BusMap for MemCtrl {
    const BUS_BEGIN: u32 = 0x1f80_1000;
    const BUS_END: u32 = Self::BUS_BEGIN + 36 - 1;
}

struct RamSize(u32);

impl BusMap for RamSize {
    const BUS_BEGIN: u32 = 0x1f80_1060;
    const BUS_END: u32 = Self::BUS_BEGIN + 4 - 1;
}

#[derive(Clone, Copy)]
struct CacheCtrl(u32);

impl BusMap for CacheCtrl {
    const BUS_BEGIN: u32 = 0xfffe_0130;
    const BUS_END: u32 = Self::BUS_BEGIN + 4 - 1;
}

const IRQ_CTRL_BEGIN: u32 = 0x1f80_1070;
const IRQ_CTRL_END: u32 = IRQ_CTRL_BEGIN + 8 - 1;

const TIMER_BEGIN: u32 = 0x1f80_1100;
const TIMER_END: u32 = TIMER_BEGIN + 48 - 1;

const SPU_BEGIN: u32 = 0x1f80_1c00;
const SPU_END: u32 = 0x1f80_1ffc;

const EXP1_BEGIN: u32 = 0x1f00_0000;
const EXP1_END: u32 = EXP1_BEGIN + 8 * 1024 * 1024 - 1;

const EXP2_BEGIN: u32 = 0x1f80_2000;
const EXP2_END: u32 = EXP2_BEGIN + 0x1000 - 1;
