//! Interpretation of the MIPS R3000A used by the Playstation 1.
//!
//! The interpreter retires exactly one instruction per step and leans on
//! two pieces of machinery to stay faithful to the pipeline the guest can
//! observe:
//!
//! - A prefetch pair. The word at PC is fetched one step before it runs, so
//!   when a branch rewrites PC the already fetched word (the branch delay
//!   slot) still executes first. No special casing, it falls out of the
//!   fetch running ahead of the execute.
//!
//! - A queue of pending register writes (['queue::LoadQueue']). Loads
//!   commit one step late, which is the load delay slot.
//!
//! Anything the guest does that this core can't honour surfaces as a
//! ['Fault'] from ['Cpu::step']; there is no exception delivery.

mod cop0;
mod queue;

pub mod opcode;

use crate::bus::{Bus, StubLog};
use crate::error::Fault;

use cop0::Cop0;
use queue::LoadQueue;

pub use opcode::{Instruction, RegIdx};

/// Address of the first instruction run after reset: the BIOS entry point
/// seen through KSEG1.
const PC_RESET: u32 = 0xbfc0_0000;

pub struct Cpu {
    /// Points at the next word to prefetch. During execution of an
    /// instruction at address A this has already advanced to A + 8, the
    /// address following the branch delay slot.
    pub pc: u32,
    /// The word being executed.
    ir: u32,
    /// The word already fetched, one step ahead of `ir`. Starts out as a
    /// NOP, so the first step retires a pipeline fill.
    ir_next: u32,
    /// The general purpose registers. Slot 0 is hardwired to zero.
    pub registers: [u32; 32],
    /// Remainder / high word of the multiplier unit.
    pub hi: u32,
    /// Quotient / low word of the multiplier unit.
    pub lo: u32,
    queue: LoadQueue,
    pub(crate) cop0: Cop0,
    pub bus: Bus,
}

impl Cpu {
    pub fn new(bus: Bus) -> Self {
        Self {
            pc: PC_RESET,
            ir: 0x0,
            ir_next: 0x0,
            registers: [0x0; 32],
            // A recognisable pattern, so a read before the first multiply
            // or divide stands out.
            hi: 0xdead_deed,
            lo: 0xdead_deed,
            queue: LoadQueue::new(),
            cop0: Cop0::new(),
            bus,
        }
    }

    /// The committed register file. Pending loads are never visible here.
    pub fn read_reg(&self, idx: RegIdx) -> u32 {
        self.registers[idx.idx()]
    }

    /// Queue a register write committing at the end of the current step.
    fn set_reg(&mut self, idx: RegIdx, val: u32) {
        self.queue.push(idx, val);
    }

    /// Queue a load committing one step late.
    fn set_reg_delayed(&mut self, idx: RegIdx, val: u32) {
        self.queue.push_delayed(idx, val);
    }

    /// The instruction that will execute on the next step.
    pub fn next_ins(&self) -> Instruction {
        Instruction::new(self.ir_next)
    }

    /// Fetch, execute and retire one instruction, then commit pending
    /// register writes. After an `Err` the machine must not be stepped
    /// again.
    pub fn step(&mut self, log: &mut impl StubLog) -> Result<(), Fault> {
        self.ir = self.ir_next;
        self.ir_next = self.bus.load::<u32>(self.pc)?;
        self.pc = self.pc.wrapping_add(4);

        let ins = Instruction::new(self.ir);
        trace!("{:08x}: {}", self.pc.wrapping_sub(8), ins);

        self.exec(log, ins)?;
        self.queue.commit(&mut self.registers);

        Ok(())
    }

    /// Branch relative to the delay slot. `offset` is the sign extended
    /// immediate; the shift preserves the sign by wrapping.
    fn branch(&mut self, offset: u32) {
        self.pc = self.pc.wrapping_sub(4).wrapping_add(offset << 2);
    }

    /// Jump to an absolute address.
    fn jump(&mut self, addr: u32) {
        self.pc = addr;
    }

    fn exec(&mut self, log: &mut impl StubLog, ins: Instruction) -> Result<(), Fault> {
        match ins.op() {
            0x00 => match ins.special() {
                0x00 => self.op_sll(ins),
                0x02 => self.op_srl(ins),
                0x03 => self.op_sra(ins),
                0x04 => self.op_sllv(ins),
                0x06 => self.op_srlv(ins),
                0x07 => self.op_srav(ins),
                0x08 => self.op_jr(ins),
                0x09 => self.op_jalr(ins),
                0x10 => self.op_mfhi(ins),
                0x11 => self.op_mthi(ins),
                0x12 => self.op_mflo(ins),
                0x13 => self.op_mtlo(ins),
                0x18 => self.op_mult(ins),
                0x19 => self.op_multu(ins),
                0x1a => self.op_div(ins)?,
                0x1b => self.op_divu(ins)?,
                0x20 => self.op_add(ins)?,
                0x21 => self.op_addu(ins),
                0x23 => self.op_subu(ins),
                0x24 => self.op_and(ins),
                0x25 => self.op_or(ins),
                0x26 => self.op_xor(ins),
                0x27 => self.op_nor(ins),
                0x2a => self.op_slt(ins),
                0x2b => self.op_sltu(ins),
                _ => return Err(Fault::UnhandledSpecial(ins.word())),
            },
            0x01 => self.op_bcond(ins),
            0x02 => self.op_j(ins),
            0x03 => self.op_jal(ins),
            0x04 => self.op_beq(ins),
            0x05 => self.op_bne(ins),
            0x06 => self.op_blez(ins),
            0x07 => self.op_bgtz(ins),
            0x08 => self.op_addi(ins)?,
            0x09 => self.op_addiu(ins),
            0x0a => self.op_slti(ins),
            0x0b => self.op_sltiu(ins),
            0x0c => self.op_andi(ins),
            0x0d => self.op_ori(ins),
            0x0e => self.op_xori(ins),
            0x0f => self.op_lui(ins),
            0x10 => self.op_cop0(ins)?,
            0x20 => self.op_lb(ins)?,
            0x21 => self.op_lh(ins)?,
            0x23 => self.op_lw(ins)?,
            0x24 => self.op_lbu(ins)?,
            0x25 => self.op_lhu(ins)?,
            0x28 => self.op_sb(log, ins)?,
            0x29 => self.op_sh(log, ins)?,
            0x2b => self.op_sw(log, ins)?,
            _ => return Err(Fault::UnhandledIns(ins.word())),
        }
        Ok(())
    }

    /// Effective address of a load or store.
    fn effective_addr(&self, ins: Instruction) -> u32 {
        self.read_reg(ins.rs()).wrapping_add(ins.signed_imm())
    }
}

/// Opcode implementations.
impl Cpu {
    /// SLL - Shift left logical.
    fn op_sll(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rt()) << ins.shift();
        self.set_reg(ins.rd(), val);
    }

    /// SRL - Shift right logical.
    fn op_srl(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rt()) >> ins.shift();
        self.set_reg(ins.rd(), val);
    }

    /// SRA - Shift right arithmetic. Bit 31 is replicated into the shifted
    /// in positions.
    fn op_sra(&mut self, ins: Instruction) {
        let val = (self.read_reg(ins.rt()) as i32) >> ins.shift();
        self.set_reg(ins.rd(), val as u32);
    }

    /// SLLV - Shift left logical variable. Only the low 5 bits of the
    /// shift register are used.
    fn op_sllv(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rt()) << (self.read_reg(ins.rs()) & 0x1f);
        self.set_reg(ins.rd(), val);
    }

    /// SRLV - Shift right logical variable.
    fn op_srlv(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rt()) >> (self.read_reg(ins.rs()) & 0x1f);
        self.set_reg(ins.rd(), val);
    }

    /// SRAV - Shift right arithmetic variable.
    fn op_srav(&mut self, ins: Instruction) {
        let val = (self.read_reg(ins.rt()) as i32) >> (self.read_reg(ins.rs()) & 0x1f);
        self.set_reg(ins.rd(), val as u32);
    }

    /// JR - Jump register.
    fn op_jr(&mut self, ins: Instruction) {
        self.jump(self.read_reg(ins.rs()));
    }

    /// JALR - Jump and link register. The return address is the
    /// instruction after the delay slot, which is where PC already points.
    fn op_jalr(&mut self, ins: Instruction) {
        let ra = self.pc;
        self.jump(self.read_reg(ins.rs()));
        self.set_reg(ins.rd(), ra);
    }

    /// MFHI - Move from HI.
    fn op_mfhi(&mut self, ins: Instruction) {
        self.set_reg(ins.rd(), self.hi);
    }

    /// MTHI - Move to HI.
    fn op_mthi(&mut self, ins: Instruction) {
        self.hi = self.read_reg(ins.rs());
    }

    /// MFLO - Move from LO.
    fn op_mflo(&mut self, ins: Instruction) {
        self.set_reg(ins.rd(), self.lo);
    }

    /// MTLO - Move to LO.
    fn op_mtlo(&mut self, ins: Instruction) {
        self.lo = self.read_reg(ins.rs());
    }

    /// MULT - Signed multiplication into HI:LO.
    fn op_mult(&mut self, ins: Instruction) {
        let lhs = self.read_reg(ins.rs()) as i32;
        let rhs = self.read_reg(ins.rt()) as i32;

        let val = i64::from(lhs).wrapping_mul(i64::from(rhs)) as u64;

        self.hi = (val >> 32) as u32;
        self.lo = val as u32;
    }

    /// MULTU - Unsigned multiplication into HI:LO.
    fn op_multu(&mut self, ins: Instruction) {
        let lhs = self.read_reg(ins.rs());
        let rhs = self.read_reg(ins.rt());

        let val = u64::from(lhs) * u64::from(rhs);

        self.hi = (val >> 32) as u32;
        self.lo = val as u32;
    }

    /// DIV - Signed division.
    ///
    /// Hardware never traps on division; a zero divisor yields documented
    /// garbage and `i32::MIN / -1` wraps. This core stores those latch
    /// values first and then raises the zero divisor as a fault, so the
    /// host can still see what the guest would have read.
    fn op_div(&mut self, ins: Instruction) -> Result<(), Fault> {
        let lhs = self.read_reg(ins.rs()) as i32;
        let rhs = self.read_reg(ins.rt()) as i32;

        if rhs == 0 {
            self.hi = lhs as u32;
            self.lo = if lhs < 0 { 1 } else { 0xffff_ffff };
            return Err(Fault::DivideByZero(ins.word()));
        }

        if lhs as u32 == 0x8000_0000 && rhs == -1 {
            self.hi = 0;
            self.lo = 0x8000_0000;
        } else {
            self.hi = (lhs % rhs) as u32;
            self.lo = (lhs / rhs) as u32;
        }

        Ok(())
    }

    /// DIVU - Unsigned division.
    fn op_divu(&mut self, ins: Instruction) -> Result<(), Fault> {
        let lhs = self.read_reg(ins.rs());
        let rhs = self.read_reg(ins.rt());

        if rhs == 0 {
            self.hi = lhs;
            self.lo = 0xffff_ffff;
            return Err(Fault::DivideByZero(ins.word()));
        }

        self.hi = lhs % rhs;
        self.lo = lhs / rhs;

        Ok(())
    }

    /// ADD - Add signed, overflow is fatal.
    fn op_add(&mut self, ins: Instruction) -> Result<(), Fault> {
        let lhs = self.read_reg(ins.rs()) as i32;
        let rhs = self.read_reg(ins.rt()) as i32;

        match lhs.checked_add(rhs) {
            Some(val) => {
                self.set_reg(ins.rd(), val as u32);
                Ok(())
            }
            None => Err(Fault::Overflow(ins.word())),
        }
    }

    /// ADDU - Add unsigned, wrapping.
    fn op_addu(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()).wrapping_add(self.read_reg(ins.rt()));
        self.set_reg(ins.rd(), val);
    }

    /// SUBU - Subtract unsigned, wrapping.
    fn op_subu(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()).wrapping_sub(self.read_reg(ins.rt()));
        self.set_reg(ins.rd(), val);
    }

    /// AND - Bitwise and.
    fn op_and(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) & self.read_reg(ins.rt());
        self.set_reg(ins.rd(), val);
    }

    /// OR - Bitwise or.
    fn op_or(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) | self.read_reg(ins.rt());
        self.set_reg(ins.rd(), val);
    }

    /// XOR - Bitwise exclusive or.
    fn op_xor(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) ^ self.read_reg(ins.rt());
        self.set_reg(ins.rd(), val);
    }

    /// NOR - Bitwise not or.
    fn op_nor(&mut self, ins: Instruction) {
        let val = !(self.read_reg(ins.rs()) | self.read_reg(ins.rt()));
        self.set_reg(ins.rd(), val);
    }

    /// SLT - Set if less than, signed.
    fn op_slt(&mut self, ins: Instruction) {
        let val = (self.read_reg(ins.rs()) as i32) < (self.read_reg(ins.rt()) as i32);
        self.set_reg(ins.rd(), val as u32);
    }

    /// SLTU - Set if less than, unsigned.
    fn op_sltu(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) < self.read_reg(ins.rt());
        self.set_reg(ins.rd(), val as u32);
    }

    /// The REGIMM group: BLTZ, BGEZ, BLTZAL and BGEZAL. Bit 16 of the word
    /// selects the condition, bit 20 the linking forms. The linking forms
    /// write the return address whether or not the branch is taken.
    fn op_bcond(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) as i32;
        let cond = (val < 0) ^ ins.regimm_bgez();

        if ins.regimm_link() {
            self.set_reg(RegIdx::RA, self.pc);
        }

        if cond {
            self.branch(ins.signed_imm());
        }
    }

    /// J - Jump within the current 256 MiB segment.
    fn op_j(&mut self, ins: Instruction) {
        let base = self.pc.wrapping_sub(4) & 0xf000_0000;
        self.jump(base | ins.target() << 2);
    }

    /// JAL - Jump and link.
    fn op_jal(&mut self, ins: Instruction) {
        let ra = self.pc;
        self.op_j(ins);
        self.set_reg(RegIdx::RA, ra);
    }

    /// BEQ - Branch if equal.
    fn op_beq(&mut self, ins: Instruction) {
        if self.read_reg(ins.rs()) == self.read_reg(ins.rt()) {
            self.branch(ins.signed_imm());
        }
    }

    /// BNE - Branch if not equal.
    fn op_bne(&mut self, ins: Instruction) {
        if self.read_reg(ins.rs()) != self.read_reg(ins.rt()) {
            self.branch(ins.signed_imm());
        }
    }

    /// BLEZ - Branch if less than or equal to zero.
    fn op_blez(&mut self, ins: Instruction) {
        if self.read_reg(ins.rs()) as i32 <= 0 {
            self.branch(ins.signed_imm());
        }
    }

    /// BGTZ - Branch if greater than zero.
    fn op_bgtz(&mut self, ins: Instruction) {
        if self.read_reg(ins.rs()) as i32 > 0 {
            self.branch(ins.signed_imm());
        }
    }

    /// ADDI - Add immediate signed, overflow is fatal.
    fn op_addi(&mut self, ins: Instruction) -> Result<(), Fault> {
        let lhs = self.read_reg(ins.rs()) as i32;

        match lhs.checked_add(ins.signed_imm() as i32) {
            Some(val) => {
                self.set_reg(ins.rt(), val as u32);
                Ok(())
            }
            None => Err(Fault::Overflow(ins.word())),
        }
    }

    /// ADDIU - Add immediate unsigned. The name lies twice over: the
    /// immediate is sign extended and "unsigned" only means wrapping.
    fn op_addiu(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()).wrapping_add(ins.signed_imm());
        self.set_reg(ins.rt(), val);
    }

    /// SLTI - Set if less than immediate, signed.
    fn op_slti(&mut self, ins: Instruction) {
        let val = (self.read_reg(ins.rs()) as i32) < (ins.signed_imm() as i32);
        self.set_reg(ins.rt(), val as u32);
    }

    /// SLTIU - Set if less than immediate, unsigned compare against the
    /// sign extended immediate.
    fn op_sltiu(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) < ins.signed_imm();
        self.set_reg(ins.rt(), val as u32);
    }

    /// ANDI - Bitwise and with zero extended immediate.
    fn op_andi(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) & ins.imm();
        self.set_reg(ins.rt(), val);
    }

    /// ORI - Bitwise or with zero extended immediate.
    fn op_ori(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) | ins.imm();
        self.set_reg(ins.rt(), val);
    }

    /// XORI - Bitwise exclusive or with zero extended immediate.
    fn op_xori(&mut self, ins: Instruction) {
        let val = self.read_reg(ins.rs()) ^ ins.imm();
        self.set_reg(ins.rt(), val);
    }

    /// LUI - Load upper immediate.
    fn op_lui(&mut self, ins: Instruction) {
        self.set_reg(ins.rt(), ins.imm() << 16);
    }

    /// The COP0 group, dispatched on the rs field: MFC0 and MTC0. MFC0
    /// goes through the load delay like a memory load.
    fn op_cop0(&mut self, ins: Instruction) -> Result<(), Fault> {
        match ins.cop_op() {
            0x00 => {
                let val = self.cop0.read_reg(ins.rd().0.into())?;
                self.set_reg_delayed(ins.rt(), val);
                Ok(())
            }
            0x04 => {
                let val = self.read_reg(ins.rt());
                self.cop0.set_reg(ins.rd().0.into(), val)
            }
            _ => Err(Fault::UnhandledCop0(ins.word())),
        }
    }

    /// LB - Load byte, sign extended.
    fn op_lb(&mut self, ins: Instruction) -> Result<(), Fault> {
        let val = self.bus.load::<u8>(self.effective_addr(ins))?;
        self.set_reg_delayed(ins.rt(), val as i8 as u32);
        Ok(())
    }

    /// LH - Load half word, sign extended.
    fn op_lh(&mut self, ins: Instruction) -> Result<(), Fault> {
        let val = self.bus.load::<u16>(self.effective_addr(ins))?;
        self.set_reg_delayed(ins.rt(), val as i16 as u32);
        Ok(())
    }

    /// LW - Load word.
    fn op_lw(&mut self, ins: Instruction) -> Result<(), Fault> {
        let val = self.bus.load::<u32>(self.effective_addr(ins))?;
        self.set_reg_delayed(ins.rt(), val);
        Ok(())
    }

    /// LBU - Load byte, zero extended.
    fn op_lbu(&mut self, ins: Instruction) -> Result<(), Fault> {
        let val = self.bus.load::<u8>(self.effective_addr(ins))?;
        self.set_reg_delayed(ins.rt(), val.into());
        Ok(())
    }

    /// LHU - Load half word, zero extended.
    fn op_lhu(&mut self, ins: Instruction) -> Result<(), Fault> {
        let val = self.bus.load::<u16>(self.effective_addr(ins))?;
        self.set_reg_delayed(ins.rt(), val.into());
        Ok(())
    }

    /// SB - Store byte.
    fn op_sb(&mut self, log: &mut impl StubLog, ins: Instruction) -> Result<(), Fault> {
        let addr = self.effective_addr(ins);
        let val = self.read_reg(ins.rt());

        if self.cop0.cache_isolated() {
            trace!("sb to {addr:08x} swallowed, cache is isolated");
            return Ok(());
        }
        self.bus.store::<u8>(log, addr, val as u8)
    }

    /// SH - Store half word.
    fn op_sh(&mut self, log: &mut impl StubLog, ins: Instruction) -> Result<(), Fault> {
        let addr = self.effective_addr(ins);
        let val = self.read_reg(ins.rt());

        if self.cop0.cache_isolated() {
            trace!("sh to {addr:08x} swallowed, cache is isolated");
            return Ok(());
        }
        self.bus.store::<u16>(log, addr, val as u16)
    }

    /// SW - Store word.
    fn op_sw(&mut self, log: &mut impl StubLog, ins: Instruction) -> Result<(), Fault> {
        let addr = self.effective_addr(ins);
        let val = self.read_reg(ins.rt());

        if self.cop0.cache_isolated() {
            trace!("sw to {addr:08x} swallowed, cache is isolated");
            return Ok(());
        }
        self.bus.store::<u32>(log, addr, val)
    }
}
