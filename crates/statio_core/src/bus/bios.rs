use super::{AddrUnit, BusMap};
use thiserror::Error;

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

#[derive(Error, Debug)]
pub enum BiosError {
    #[error("Failed to load BIOS: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid BIOS size: 0x{0:x}")]
    InvalidSize(usize),
}

/// The 512 KiB BIOS ROM.
#[derive(Debug)]
pub struct Bios {
    data: Box<[u8]>,
}

impl Bios {
    pub const SIZE: usize = 512 * 1024;

    /// Take ownership of a ROM image. Anything but exactly 512 KiB is
    /// rejected; the bytes are used as is, no checksum is verified.
    pub fn new(data: Box<[u8]>) -> Result<Self, BiosError> {
        if data.len() != Self::SIZE {
            return Err(BiosError::InvalidSize(data.len()));
        }
        Ok(Self { data })
    }

    pub fn from_file(path: &Path) -> Result<Self, BiosError> {
        let mut data = Vec::with_capacity(Self::SIZE);
        File::open(path)?.read_to_end(&mut data)?;
        Self::new(data.into_boxed_slice())
    }

    /// Build a ROM holding `code` at the reset vector, for tests.
    #[cfg(test)]
    pub fn from_words(code: &[u32]) -> Self {
        let mut data = vec![0x0; Self::SIZE];
        for (i, word) in code.iter().enumerate() {
            data[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
        Self { data: data.into_boxed_slice() }
    }

    #[inline]
    pub fn load<T: AddrUnit>(&self, offset: u32) -> T {
        let offset = offset as usize;
        let val = (0..T::WIDTH).fold(0, |val, byte| {
            val | u32::from(self.data[offset + byte]) << (8 * byte)
        });
        T::from_u32(val)
    }
}

impl BusMap for Bios {
    const BUS_BEGIN: u32 = 0x1fc0_0000;
    const BUS_END: u32 = Self::BUS_BEGIN + Self::SIZE as u32 - 1;
}
