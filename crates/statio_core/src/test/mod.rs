//! Behavioural tests for the CPU and the bus.
//!
//! Programs are assembled by hand as word arrays (see ['asm']) and planted
//! at the reset vector of a synthetic BIOS. The harness runs the machine
//! until the word about to execute is the BREAK sentinel, or until it
//! faults, and hands back the final state for inspection.

mod asm;
mod cpu;

use crate::bus::bios::Bios;
use crate::bus::WriteLog;
use crate::error::Fault;
use crate::System;

pub const BIOS_BASE: u32 = 0xbfc0_0000;

/// Run until `asm::BREAK` is about to execute. Panics on a fault.
fn run_code(code: &[u32]) -> System {
    run_code_logged(code).0
}

/// Same as ['run_code'], returning the stub write log as well.
fn run_code_logged(code: &[u32]) -> (System, WriteLog) {
    let mut sys = System::new(Bios::from_words(code));
    let mut log = WriteLog::default();

    while sys.cpu.next_ins().word() != asm::BREAK {
        if let Err(fault) = sys.tick(&mut log) {
            panic!("unexpected fault: {fault}");
        }
    }

    (sys, log)
}

/// Run until the machine faults. Panics if the sentinel is reached first.
fn run_code_fault(code: &[u32]) -> (System, Fault) {
    let mut sys = System::new(Bios::from_words(code));
    let mut log = WriteLog::default();

    loop {
        if sys.cpu.next_ins().word() == asm::BREAK {
            panic!("reached sentinel without faulting");
        }
        if let Err(fault) = sys.tick(&mut log) {
            return (sys, fault);
        }
    }
}
