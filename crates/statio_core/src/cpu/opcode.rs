//! Decoding of MIPS R3000 instruction words.
//!
//! Every instruction is 32 bits, in one of three layouts:
//! - Immediate: 6-bit op, 5-bit rs, 5-bit rt, 16-bit immediate.
//! - Jump: 6-bit op, 26-bit target.
//! - Register: 6-bit op, 5-bit rs, 5-bit rt, 5-bit rd, 5-bit shift
//!   amount, 6-bit function field.
//!
//! The accessors are pure views; sign extension of the immediate happens
//! where it is used, not here.

use statio_util::Bits;

use std::fmt;

/// Index into the general purpose register file.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct RegIdx(pub u8);

impl RegIdx {
    pub const ZERO: Self = Self(0);
    pub const RA: Self = Self(31);

    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for RegIdx {
    fn from(val: u32) -> Self {
        Self(val as u8)
    }
}

impl fmt::Display for RegIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", REGISTER_NAMES[self.idx()])
    }
}

impl fmt::Debug for RegIdx {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${}", REGISTER_NAMES[self.idx()])
    }
}

#[derive(Clone, Copy)]
pub struct Instruction(pub u32);

impl Instruction {
    pub fn new(word: u32) -> Self {
        Self(word)
    }

    pub fn word(self) -> u32 {
        self.0
    }

    /// Primary operation.
    pub fn op(self) -> u32 {
        self.0.bits(26, 31)
    }

    /// Function field, selecting within the SPECIAL group.
    pub fn special(self) -> u32 {
        self.0.bits(0, 5)
    }

    /// Coprocessor sub-operation, encoded in the rs field.
    pub fn cop_op(self) -> u32 {
        self.0.bits(21, 25)
    }

    /// Immediate value, zero extended.
    pub fn imm(self) -> u32 {
        self.0.bits(0, 15)
    }

    /// Immediate value, sign extended.
    pub fn signed_imm(self) -> u32 {
        self.0.bits(0, 15) as i16 as u32
    }

    /// Jump target, the low 26 bits.
    pub fn target(self) -> u32 {
        self.0.bits(0, 25)
    }

    /// Shift amount.
    pub fn shift(self) -> u32 {
        self.0.bits(6, 10)
    }

    pub fn rd(self) -> RegIdx {
        RegIdx::from(self.0.bits(11, 15))
    }

    pub fn rt(self) -> RegIdx {
        RegIdx::from(self.0.bits(16, 20))
    }

    pub fn rs(self) -> RegIdx {
        RegIdx::from(self.0.bits(21, 25))
    }

    /// REGIMM condition select: branch on greater than or equal to zero
    /// when set, on less than zero when clear.
    pub fn regimm_bgez(self) -> bool {
        self.0.bit(16)
    }

    /// REGIMM and-link flag.
    pub fn regimm_link(self) -> bool {
        self.0.bit(20)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.op() {
            0x0 => match self.special() {
                0x00 => write!(f, "sll {} {} {}", self.rd(), self.rt(), self.shift()),
                0x02 => write!(f, "srl {} {} {}", self.rd(), self.rt(), self.shift()),
                0x03 => write!(f, "sra {} {} {}", self.rd(), self.rt(), self.shift()),
                0x04 => write!(f, "sllv {} {} {}", self.rd(), self.rt(), self.rs()),
                0x06 => write!(f, "srlv {} {} {}", self.rd(), self.rt(), self.rs()),
                0x07 => write!(f, "srav {} {} {}", self.rd(), self.rt(), self.rs()),
                0x08 => write!(f, "jr {}", self.rs()),
                0x09 => write!(f, "jalr {} {}", self.rd(), self.rs()),
                0x10 => write!(f, "mfhi {}", self.rd()),
                0x11 => write!(f, "mthi {}", self.rs()),
                0x12 => write!(f, "mflo {}", self.rd()),
                0x13 => write!(f, "mtlo {}", self.rs()),
                0x18 => write!(f, "mult {} {}", self.rs(), self.rt()),
                0x19 => write!(f, "multu {} {}", self.rs(), self.rt()),
                0x1a => write!(f, "div {} {}", self.rs(), self.rt()),
                0x1b => write!(f, "divu {} {}", self.rs(), self.rt()),
                0x20 => write!(f, "add {} {} {}", self.rd(), self.rs(), self.rt()),
                0x21 => write!(f, "addu {} {} {}", self.rd(), self.rs(), self.rt()),
                0x23 => write!(f, "subu {} {} {}", self.rd(), self.rs(), self.rt()),
                0x24 => write!(f, "and {} {} {}", self.rd(), self.rs(), self.rt()),
                0x25 => write!(f, "or {} {} {}", self.rd(), self.rs(), self.rt()),
                0x26 => write!(f, "xor {} {} {}", self.rd(), self.rs(), self.rt()),
                0x27 => write!(f, "nor {} {} {}", self.rd(), self.rs(), self.rt()),
                0x2a => write!(f, "slt {} {} {}", self.rd(), self.rs(), self.rt()),
                0x2b => write!(f, "sltu {} {} {}", self.rd(), self.rs(), self.rt()),
                _ => write!(f, "illegal"),
            },
            0x1 => {
                let op = match (self.regimm_link(), self.regimm_bgez()) {
                    (true, true) => "bgezal",
                    (true, false) => "bltzal",
                    (false, true) => "bgez",
                    (false, false) => "bltz",
                };
                write!(f, "{} {} {}", op, self.rs(), self.signed_imm() as i32)
            }
            0x2 => write!(f, "j {:08x}", self.target() << 2),
            0x3 => write!(f, "jal {:08x}", self.target() << 2),
            0x4 => write!(f, "beq {} {} {}", self.rs(), self.rt(), self.signed_imm() as i32),
            0x5 => write!(f, "bne {} {} {}", self.rs(), self.rt(), self.signed_imm() as i32),
            0x6 => write!(f, "blez {} {}", self.rs(), self.signed_imm() as i32),
            0x7 => write!(f, "bgtz {} {}", self.rs(), self.signed_imm() as i32),
            0x8 => write!(f, "addi {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0x9 => write!(f, "addiu {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0xa => write!(f, "slti {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0xb => write!(f, "sltiu {} {} {}", self.rt(), self.rs(), self.signed_imm() as i32),
            0xc => write!(f, "andi {} {} {:#x}", self.rt(), self.rs(), self.imm()),
            0xd => write!(f, "ori {} {} {:#x}", self.rt(), self.rs(), self.imm()),
            0xe => write!(f, "xori {} {} {:#x}", self.rt(), self.rs(), self.imm()),
            0xf => write!(f, "lui {} {:#x}", self.rt(), self.imm()),
            0x10 => match self.cop_op() {
                0x0 => write!(f, "mfc0 {} {}", self.rt(), self.rd().0),
                0x4 => write!(f, "mtc0 {} {}", self.rt(), self.rd().0),
                _ => write!(f, "cop0"),
            },
            0x11 => write!(f, "cop1"),
            0x12 => write!(f, "cop2"),
            0x13 => write!(f, "cop3"),
            0x20 => write!(f, "lb {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x21 => write!(f, "lh {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x23 => write!(f, "lw {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x24 => write!(f, "lbu {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x25 => write!(f, "lhu {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x28 => write!(f, "sb {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x29 => write!(f, "sh {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            0x2b => write!(f, "sw {} {}({})", self.rt(), self.signed_imm() as i32, self.rs()),
            _ => write!(f, "illegal"),
        }
    }
}

pub const REGISTER_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3", "t0", "t1", "t2", "t3", "t4", "t5", "t6",
    "t7", "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "t8", "t9", "k0", "k1", "gp", "sp", "fp",
    "ra",
];
