// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Environment calls: the user-side stubs that issue them, and the
//! machine-side dispatcher that services them.
//!
//! There are only four services. Two read the hart identifier, which user
//! mode is not allowed to do, and two rewrite `mstatus` so that the `mret`
//! at the end of the trap lands in the requested mode. Anything else that
//! arrives here is a fault.

use gap_abi::{
    CoreId, EcallCause, Mstatus, DEFAULT_ISR_EXIT, ILLEGAL_INSN_EXIT,
};
use ringbuf::{ringbuf, ringbuf_entry};

use crate::arch;
use crate::fail;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    Dispatch(EcallCause),
    Unknown(u32),
}

ringbuf!(Trace, 16, Trace::None);

/// Services an `ecall` taken with `cause` in `a7`. The return value goes
/// back to the caller in `a0`.
///
/// The argument registers are passed along for completeness; none of the
/// current services read them.
pub fn dispatch(cause: u32, _args: [u32; 4]) -> u32 {
    let cause = match EcallCause::try_from(cause) {
        Ok(c) => c,
        Err(raw) => {
            ringbuf_entry!(Trace::Unknown(raw));
            default_isr()
        }
    };
    ringbuf_entry!(Trace::Dispatch(cause));
    service(cause)
}

/// Machine-side body of one service. Runs inside the trap, so it reads and
/// writes machine registers directly.
pub fn service(cause: EcallCause) -> u32 {
    match cause {
        EcallCause::Default => default_isr(),
        EcallCause::ProcId => CoreId(arch::read_mhartid()).procid(),
        EcallCause::ClusterId => CoreId(arch::read_mhartid()).cluster(),
        EcallCause::RaisePriv => {
            arch::write_mstatus(Mstatus::RAISED);
            Mstatus::RAISED.bits()
        }
        EcallCause::ResetPriv => {
            arch::write_mstatus(Mstatus::USER);
            Mstatus::USER.bits()
        }
    }
}

/// Index of the calling core within its cluster.
pub fn procid() -> u32 {
    arch::ecall(EcallCause::ProcId, [0; 4])
}

/// Index of the calling core's cluster.
pub fn clusterid() -> u32 {
    arch::ecall(EcallCause::ClusterId, [0; 4])
}

/// Asks the machine-mode handler to return to us in machine mode.
///
/// Callers should normally go through [`crate::privilege`], which checks the
/// current level first.
pub fn raise_priv() -> u32 {
    arch::ecall(EcallCause::RaisePriv, [0; 4])
}

/// Asks the machine-mode handler to return to us in user mode.
///
/// Calling this without a preceding [`raise_priv`] from user code leaves the
/// caller wherever the trap handler happens to put it.
pub fn reset_priv() -> u32 {
    arch::ecall(EcallCause::ResetPriv, [0; 4])
}

/// Handler for traps nobody claimed, and for `ecall` position 0.
pub fn default_isr() -> ! {
    let mepc = arch::read_mepc();
    fail::die(
        DEFAULT_ISR_EXIT,
        format_args!("default_isr: Error : default ISR called at {mepc:#x}"),
    )
}

/// Handler for illegal instruction traps. `mepc` is the address of the
/// offending instruction.
pub fn illegal_instruction(mepc: u32) -> ! {
    fail::die(
        ILLEGAL_INSN_EXIT,
        format_args!("illegal_instruction: Error : illegal instruction at {mepc:#x}"),
    )
}
