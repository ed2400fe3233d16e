pub mod bit;

pub use bit::Bits;
