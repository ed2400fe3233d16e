use super::asm::*;
use super::{run_code, run_code_fault, BIOS_BASE};
use crate::cpu::RegIdx;
use crate::error::Fault;
use crate::System;

fn reg(sys: &System, idx: u8) -> u32 {
    sys.cpu.read_reg(RegIdx(idx))
}

#[test]
fn reset_state() {
    let sys = System::new(crate::Bios::from_words(&[]));

    assert_eq!(sys.cpu.pc, 0xbfc0_0000);
    assert_eq!(sys.cpu.hi, 0xdead_deed);
    assert_eq!(sys.cpu.lo, 0xdead_deed);

    for i in 0..32 {
        assert_eq!(reg(&sys, i), 0);
    }
    for cop_reg in [3, 5, 7, 9, 11, 12, 13] {
        assert_eq!(sys.cpu.cop0.peek(cop_reg), Some(0));
    }
}

#[test]
fn zero_reg() {
    let sys = run_code(&[
        addiu(0, 0, 1),
        NOP,
        BREAK,
    ]);
    assert_eq!(reg(&sys, 0), 0);
}

#[test]
fn zero_reg_load() {
    // A load targeting $zero commits like any other and must still read 0.
    let mut code = li(1, 0x1234_5678).to_vec();
    code.extend([
        sw(1, 0, 0),
        lw(0, 0, 0),
        NOP,
        NOP,
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 0), 0);
}

#[test]
fn lui_ori_builds_constant() {
    let sys = run_code(&[
        lui(1, 0x1f80),
        ori(1, 1, 0x1000),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 0x1f80_1000);
}

#[test]
fn branch_delay_slot() {
    // The instruction after a taken branch still executes; the one at the
    // fall-through target does not.
    let sys = run_code(&[
        beq(0, 0, 2),
        addiu(1, 0, 1),
        addiu(2, 0, 1),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 0);
    assert_eq!(sys.cpu.pc, BIOS_BASE + 0x10);
}

#[test]
fn branch_not_taken_runs_slot() {
    let sys = run_code(&[
        bne(0, 0, 2),
        addiu(1, 0, 1),
        addiu(2, 0, 1),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 1);
}

#[test]
fn backwards_branch() {
    let sys = run_code(&[
        addiu(1, 0, 0),     // counter
        addiu(1, 1, 1),     // loop body
        slti(2, 1, 3),
        bne(2, 0, -3),      // back to the body
        NOP,
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 3);
}

#[test]
fn load_delay_slot() {
    // The delay slot sees the value from before the load, the instruction
    // after it sees the loaded one.
    let mut code = li(1, 0xdead_beef).to_vec();
    code.extend(li(8, 0x1234_5678));
    code.extend([
        sw(8, 0, 0),
        lw(1, 0, 0),
        ori(2, 1, 0),
        ori(3, 1, 0),
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 2), 0xdead_beef);
    assert_eq!(reg(&sys, 3), 0x1234_5678);
}

#[test]
fn load_loses_to_overwrite() {
    // An instruction in the load delay slot that writes the same register
    // wins over the load.
    let mut code = li(8, 0x1234_5678).to_vec();
    code.extend([
        sw(8, 0, 0),
        lw(1, 0, 0),
        addiu(1, 0, 7),
        NOP,
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 1), 7);
}

#[test]
fn sign_extension_on_loads() {
    let sys = run_code(&[
        ori(8, 0, 0x8080),
        sw(8, 0, 0),
        lh(1, 0, 0),
        lhu(2, 0, 0),
        lb(3, 0, 0),
        lbu(4, 0, 0),
        NOP,
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 0xffff_8080);
    assert_eq!(reg(&sys, 2), 0x0000_8080);
    assert_eq!(reg(&sys, 3), 0xffff_ff80);
    assert_eq!(reg(&sys, 4), 0x0000_0080);
}

#[test]
fn byte_and_halfword_stores() {
    let mut code = li(8, 0xaabb_ccdd).to_vec();
    code.extend([
        sw(8, 0, 0),
        sb(0, 1, 0),        // clear byte 1
        sh(0, 2, 0),        // clear the upper half
        lw(1, 0, 0),
        NOP,
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 1), 0x0000_00dd);
}

#[test]
fn addiu_sign_extends_and_wraps() {
    let sys = run_code(&[
        addiu(1, 0, -1),
        addiu(2, 1, 1),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 0xffff_ffff);
    assert_eq!(reg(&sys, 2), 0);
}

#[test]
fn slti_sltiu() {
    let sys = run_code(&[
        slti(1, 0, -1),     // 0 < -1 signed: no
        slti(2, 0, 1),      // 0 < 1 signed: yes
        sltiu(3, 0, -1),    // 0 < 0xffff_ffff unsigned: yes
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 0);
    assert_eq!(reg(&sys, 2), 1);
    assert_eq!(reg(&sys, 3), 1);
}

#[test]
fn slt_sltu() {
    let sys = run_code(&[
        addiu(8, 0, -1),
        addiu(9, 0, 1),
        slt(1, 8, 9),       // -1 < 1 signed
        sltu(2, 8, 9),      // 0xffff_ffff < 1 unsigned: no
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 0);
}

#[test]
fn shifts() {
    let sys = run_code(&[
        addiu(8, 0, -8),
        sll(1, 8, 2),
        srl(2, 8, 2),
        sra(3, 8, 2),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), (-8_i32 << 2) as u32);
    assert_eq!(reg(&sys, 2), 0xffff_fff8 >> 2);
    assert_eq!(reg(&sys, 3), (-8_i32 >> 2) as u32);
}

#[test]
fn variable_shifts_mask_to_five_bits() {
    let sys = run_code(&[
        addiu(8, 0, 8),
        addiu(9, 0, 34),    // shifts by 34 & 0x1f = 2
        sllv(1, 8, 9),
        srlv(2, 8, 9),
        srav(3, 8, 9),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 8 << 2);
    assert_eq!(reg(&sys, 2), 8 >> 2);
    assert_eq!(reg(&sys, 3), 8 >> 2);
}

#[test]
fn bitwise_ops() {
    let sys = run_code(&[
        ori(8, 0, 0xff00),
        ori(9, 0, 0x0ff0),
        and(1, 8, 9),
        or(2, 8, 9),
        xor(3, 8, 9),
        nor(4, 8, 9),
        xori(5, 8, 0xffff),
        andi(6, 8, 0xf0f0),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 0x0f00);
    assert_eq!(reg(&sys, 2), 0xfff0);
    assert_eq!(reg(&sys, 3), 0xf0f0);
    assert_eq!(reg(&sys, 4), 0xffff_000f);
    assert_eq!(reg(&sys, 5), 0x00ff);
    assert_eq!(reg(&sys, 6), 0xf000);
}

#[test]
fn mult_multu() {
    let mut code = li(8, 0x8000_0000).to_vec();
    code.extend([
        addiu(9, 0, 2),
        mult(8, 9),         // -2^31 * 2 = -2^32
        mfhi(1),
        mflo(2),
        multu(8, 9),        // 2^31 * 2 = 2^32
        mfhi(3),
        mflo(4),
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 1), 0xffff_ffff);
    assert_eq!(reg(&sys, 2), 0);
    assert_eq!(reg(&sys, 3), 1);
    assert_eq!(reg(&sys, 4), 0);
}

#[test]
fn mthi_mtlo() {
    let sys = run_code(&[
        addiu(8, 0, 11),
        addiu(9, 0, 22),
        mthi(8),
        mtlo(9),
        mfhi(1),
        mflo(2),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 11);
    assert_eq!(reg(&sys, 2), 22);
}

#[test]
fn div_signed() {
    let sys = run_code(&[
        addiu(8, 0, 7),
        addiu(9, 0, 2),
        div(8, 9),
        mflo(1),
        mfhi(2),
        addiu(8, 0, -7),
        div(8, 9),
        mflo(3),
        mfhi(4),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 3);
    assert_eq!(reg(&sys, 2), 1);
    assert_eq!(reg(&sys, 3), (-3_i32) as u32);
    assert_eq!(reg(&sys, 4), (-1_i32) as u32);
}

#[test]
fn divu_basic() {
    let sys = run_code(&[
        addiu(8, 0, -1),    // 0xffff_ffff
        addiu(9, 0, 16),
        divu(8, 9),
        mflo(1),
        mfhi(2),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 0x0fff_ffff);
    assert_eq!(reg(&sys, 2), 15);
}

#[test]
fn div_overflow_corner() {
    // i32::MIN / -1 wraps back to i32::MIN without faulting.
    let mut code = li(8, 0x8000_0000).to_vec();
    code.extend([
        addiu(9, 0, -1),
        div(8, 9),
        mflo(1),
        mfhi(2),
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 1), 0x8000_0000);
    assert_eq!(reg(&sys, 2), 0);
}

#[test]
fn div_by_zero() {
    let (sys, fault) = run_code_fault(&[
        addiu(8, 0, 5),
        NOP,
        div(8, 0),
    ]);
    assert_eq!(fault, Fault::DivideByZero(div(8, 0)));
    assert_eq!(sys.cpu.lo, 0xffff_ffff);
    assert_eq!(sys.cpu.hi, 5);
    assert_eq!(
        fault.to_string(),
        format!("Division by zero in DIV/DIVU: 0x{:08x}", div(8, 0)),
    );
}

#[test]
fn div_by_zero_negative() {
    let (sys, _) = run_code_fault(&[
        addiu(8, 0, -5),
        NOP,
        div(8, 0),
    ]);
    assert_eq!(sys.cpu.lo, 1);
    assert_eq!(sys.cpu.hi, 0xffff_fffb);
}

#[test]
fn divu_by_zero() {
    let (sys, fault) = run_code_fault(&[
        addiu(8, 0, 5),
        NOP,
        divu(8, 0),
    ]);
    assert_eq!(fault, Fault::DivideByZero(divu(8, 0)));
    assert_eq!(sys.cpu.lo, 0xffff_ffff);
    assert_eq!(sys.cpu.hi, 5);
}

#[test]
fn add_overflow_is_fatal() {
    let mut code = li(8, 0x7fff_ffff).to_vec();
    code.extend([
        addiu(9, 0, 1),
        add(1, 8, 9),
    ]);
    let (_, fault) = run_code_fault(&code);
    assert_eq!(fault, Fault::Overflow(add(1, 8, 9)));
    assert_eq!(
        fault.to_string(),
        format!("Signed overflow in ADD/ADDI: 0x{:08x}", add(1, 8, 9)),
    );
}

#[test]
fn addi_overflow_is_fatal() {
    let mut code = li(8, 0x7fff_ffff).to_vec();
    code.push(addi(1, 8, 1));
    let (_, fault) = run_code_fault(&code);
    assert_eq!(fault, Fault::Overflow(addi(1, 8, 1)));
}

#[test]
fn addi_below_boundary() {
    let sys = run_code(&[
        addi(1, 0, 0x7fff),
        addi(2, 1, 0x7fff),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 2), 0xfffe);
}

#[test]
fn addu_wraps() {
    let mut code = li(8, 0xffff_ffff).to_vec();
    code.extend([
        addiu(9, 0, 2),
        addu(1, 8, 9),
        subu(2, 0, 9),
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 0xffff_fffe);
}

#[test]
fn jal_jr_round_trip() {
    let sys = run_code(&[
        jal(BIOS_BASE + 0x10),
        NOP,
        addiu(2, 0, 1),     // the return lands here
        BREAK,
        jr(31),
        NOP,
    ]);
    assert_eq!(reg(&sys, 2), 1);
    assert_eq!(reg(&sys, 31), BIOS_BASE + 0x8);
    assert_eq!(sys.cpu.pc, BIOS_BASE + 0x10);
}

#[test]
fn j_jumps_within_segment() {
    let sys = run_code(&[
        j(BIOS_BASE + 0x10),
        addiu(1, 0, 1),     // delay slot
        addiu(2, 0, 1),     // skipped
        addiu(3, 0, 1),     // skipped
        addiu(4, 0, 1),     // target
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 0);
    assert_eq!(reg(&sys, 3), 0);
    assert_eq!(reg(&sys, 4), 1);
}

#[test]
fn jalr_links_to_rd() {
    let mut code = li(8, BIOS_BASE + 0x18).to_vec();
    code.extend([
        jalr(9, 8),
        NOP,
        addiu(2, 0, 1),
        BREAK,
        jr(9),
        NOP,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 2), 1);
    assert_eq!(reg(&sys, 9), BIOS_BASE + 0x10);
}

#[test]
fn link_written_when_not_taken() {
    // The linking REGIMM branches write $ra regardless of the outcome.
    let sys = run_code(&[
        addiu(1, 0, 1),
        NOP,
        bltzal(1, 1),
        NOP,
        BREAK,
    ]);
    assert_eq!(reg(&sys, 31), BIOS_BASE + 0x10);
}

#[test]
fn bgezal_taken() {
    let sys = run_code(&[
        bgezal(0, 2),
        NOP,
        addiu(2, 0, 1),     // skipped
        BREAK,
    ]);
    assert_eq!(reg(&sys, 2), 0);
    assert_eq!(reg(&sys, 31), BIOS_BASE + 0x8);
    assert_eq!(sys.cpu.pc, BIOS_BASE + 0x10);
}

#[test]
fn bltz_bgez() {
    let sys = run_code(&[
        addiu(8, 0, -1),
        bltz(8, 2),
        addiu(1, 0, 1),     // delay slot
        addiu(2, 0, 1),     // skipped
        bgez(8, 2),         // not taken, -1 < 0
        NOP,
        addiu(3, 0, 1),     // falls through to here
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 0);
    assert_eq!(reg(&sys, 3), 1);
}

#[test]
fn blez_bgtz() {
    let sys = run_code(&[
        blez(0, 2),
        addiu(1, 0, 1),
        addiu(2, 0, 1),     // skipped
        bgtz(0, 2),         // not taken, 0 is not > 0
        NOP,
        addiu(3, 0, 1),
        BREAK,
    ]);
    assert_eq!(reg(&sys, 1), 1);
    assert_eq!(reg(&sys, 2), 0);
    assert_eq!(reg(&sys, 3), 1);
}

#[test]
fn mfc0_has_load_delay() {
    let sys = run_code(&[
        addiu(1, 0, 1),
        mtc0(1, 12),
        addiu(2, 0, 9),
        mfc0(2, 12),
        ori(3, 2, 0),       // delay slot: old value
        ori(4, 2, 0),       // new value
        BREAK,
    ]);
    assert_eq!(reg(&sys, 3), 9);
    assert_eq!(reg(&sys, 4), 1);
}

#[test]
fn isolated_cache_swallows_stores() {
    let mut code = li(1, 0xdead_beef).to_vec();
    code.extend(li(8, 0x0001_0000));
    code.extend([
        mtc0(8, 12),
        sw(1, 0, 0),
        lw(2, 0, 0),
        NOP,
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_ne!(reg(&sys, 2), 0xdead_beef);
    assert_eq!(reg(&sys, 2), 0xffff_ffff);
}

#[test]
fn store_works_again_after_unisolating() {
    let mut code = li(1, 0xdead_beef).to_vec();
    code.extend(li(8, 0x0001_0000));
    code.extend([
        mtc0(8, 12),
        sw(1, 0, 0),        // swallowed
        mtc0(0, 12),
        sw(1, 0, 0),        // lands
        lw(2, 0, 0),
        NOP,
        BREAK,
    ]);
    let sys = run_code(&code);
    assert_eq!(reg(&sys, 2), 0xdead_beef);
}

#[test]
fn mtc0_zero_to_breakpoint_regs() {
    let sys = run_code(&[
        mtc0(0, 3),
        mtc0(0, 5),
        mtc0(0, 7),
        mtc0(0, 9),
        mtc0(0, 11),
        mtc0(0, 13),
        BREAK,
    ]);
    assert_eq!(sys.cpu.cop0.peek(7), Some(0));
}

#[test]
fn mtc0_nonzero_to_breakpoint_reg_is_fatal() {
    let (_, fault) = run_code_fault(&[
        addiu(1, 0, 1),
        NOP,
        mtc0(1, 7),
    ]);
    assert_eq!(fault, Fault::UnhandledCop0Reg(7));
}

#[test]
fn mtc0_nonzero_to_cause_is_fatal() {
    let (_, fault) = run_code_fault(&[
        addiu(1, 0, 1),
        NOP,
        mtc0(1, 13),
    ]);
    assert_eq!(fault, Fault::UnhandledCop0Reg(13));
    assert_eq!(
        fault.to_string(),
        "Unhandled COP0 register (MTC0/MFC0): 0xd",
    );
}

#[test]
fn mfc0_of_breakpoint_reg_is_fatal() {
    let (_, fault) = run_code_fault(&[mfc0(1, 3), NOP, NOP]);
    assert_eq!(fault, Fault::UnhandledCop0Reg(3));
}

#[test]
fn unknown_primary_opcode_is_fatal() {
    let word = 0x3f << 26;
    let (_, fault) = run_code_fault(&[word, NOP, NOP]);
    assert_eq!(fault, Fault::UnhandledIns(word));
    assert_eq!(
        fault.to_string(),
        format!("Unhandled instruction: 0x{word:08x}"),
    );
}

#[test]
fn unknown_special_is_fatal() {
    // SYSCALL, which would need the exception machinery this core lacks.
    let (_, fault) = run_code_fault(&[0x0000_000c, NOP, NOP]);
    assert_eq!(fault, Fault::UnhandledSpecial(0x0000_000c));
    assert_eq!(
        fault.to_string(),
        "Unhandled instruction (SPECIAL): 0x0000000c",
    );
}

#[test]
fn unknown_cop0_op_is_fatal() {
    // RFE, which this core has no exception machinery for.
    let word = 0x10 << 26 | 0x10 << 21 | 0x10;
    let (_, fault) = run_code_fault(&[word, NOP, NOP]);
    assert_eq!(fault, Fault::UnhandledCop0(word));
}

#[test]
fn cop2_is_fatal() {
    let word = 0x12 << 26;
    let (_, fault) = run_code_fault(&[word, NOP, NOP]);
    assert_eq!(fault, Fault::UnhandledIns(word));
}

#[test]
fn unaligned_load_through_cpu() {
    let (_, fault) = run_code_fault(&[
        addiu(1, 0, 2),
        NOP,
        lw(2, 0, 1),
    ]);
    assert_eq!(fault, Fault::UnalignedLoad { bits: 32, addr: 2 });
    assert_eq!(fault.to_string(), "Unaligned read32: 0x00000002");
}

#[test]
fn unaligned_jump_faults_at_fetch() {
    // PC must be word aligned when the fetch happens; the fetch stage runs
    // first within a step, so the fault pre-empts the delay slot.
    let (_, fault) = run_code_fault(&[
        addiu(1, 0, 2),
        NOP,
        jr(1),
        NOP,
        NOP,
    ]);
    assert_eq!(fault, Fault::UnalignedLoad { bits: 32, addr: 2 });
}

#[test]
fn unaligned_store_through_cpu() {
    let (_, fault) = run_code_fault(&[
        addiu(1, 0, 2),
        NOP,
        sw(2, 1, 1),        // address 3
    ]);
    assert_eq!(fault, Fault::UnalignedStore { bits: 32, addr: 3 });
    assert_eq!(fault.to_string(), "Unaligned write32: 0x00000003");
}
