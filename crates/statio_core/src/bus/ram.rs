use super::{AddrUnit, BusMap};

/// The 2 MiB of main memory.
///
/// Values are assembled byte by byte rather than reinterpreting the array,
/// which keeps the little-endian layout independent of the host.
pub struct Ram {
    data: Box<[u8; Self::SIZE]>,
}

impl Ram {
    const SIZE: usize = 2 * 1024 * 1024;

    pub fn new() -> Self {
        // Fresh RAM reads as garbage on the real machine. A constant fill
        // keeps tests deterministic while still catching reads of memory
        // nothing wrote.
        Self {
            data: Box::new([0xff; Self::SIZE]),
        }
    }

    #[inline]
    pub fn load<T: AddrUnit>(&self, offset: u32) -> T {
        let offset = offset as usize;
        let val = (0..T::WIDTH).fold(0, |val, byte| {
            val | u32::from(self.data[offset + byte]) << (8 * byte)
        });
        T::from_u32(val)
    }

    #[inline]
    pub fn store<T: AddrUnit>(&mut self, offset: u32, val: u32) {
        let offset = offset as usize;
        for byte in 0..T::WIDTH {
            self.data[offset + byte] = (val >> (8 * byte)) as u8;
        }
    }
}

impl BusMap for Ram {
    const BUS_BEGIN: u32 = 0x0;
    const BUS_END: u32 = Self::SIZE as u32 - 1;
}
