// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Simulated hart for host builds.
//!
//! Each thread gets its own hart, so tests can run in parallel without
//! seeing one another's privilege level. `ecall` is simulated the way the
//! hardware does it: trap into machine mode with `MPP` recording the
//! caller's mode, run the dispatcher, then `mret` to whatever `MPP` says.

use core::cell::Cell;

use gap_abi::{EcallCause, Mstatus};

macro_rules! klog {
    ($($tt:tt)*) => {
        println!($($tt)*)
    };
}

struct Hart {
    privileged: Cell<bool>,
    mstatus: Cell<u32>,
    mhartid: Cell<u32>,
    mepc: Cell<u32>,
    ecalls: Cell<u32>,
}

thread_local! {
    static HART: Hart = const {
        Hart {
            privileged: Cell::new(false),
            mstatus: Cell::new(0),
            // Fabric controller: cluster 31, core 0.
            mhartid: Cell::new(31 << 5),
            mepc: Cell::new(0),
            ecalls: Cell::new(0),
        }
    };
}

pub fn is_privileged() -> bool {
    HART.with(|h| h.privileged.get())
}

pub fn read_mhartid() -> u32 {
    HART.with(|h| h.mhartid.get())
}

pub fn read_mepc() -> u32 {
    HART.with(|h| h.mepc.get())
}

pub fn write_mstatus(value: Mstatus) {
    HART.with(|h| h.mstatus.set(value.bits()));
}

pub fn ecall(cause: EcallCause, args: [u32; 4]) -> u32 {
    HART.with(|h| {
        h.ecalls.set(h.ecalls.get() + 1);
        let caller = if h.privileged.get() {
            Mstatus::MPP_M
        } else {
            Mstatus::empty()
        };
        h.mstatus.set(caller.bits());
        h.privileged.set(true);
    });

    let ret = crate::ecall::dispatch(cause as u32, args);

    HART.with(|h| {
        let mpp = Mstatus::from_bits_truncate(h.mstatus.get()) & Mstatus::MPP_M;
        h.privileged.set(mpp == Mstatus::MPP_M);
    });
    ret
}

pub fn exit(code: i32) -> ! {
    panic!("exit({code})");
}

pub fn halt() -> ! {
    panic!("halted");
}

/// Puts this thread's hart in the given mode, as if a task had just been
/// scheduled at that level.
pub fn set_privileged(privileged: bool) {
    HART.with(|h| h.privileged.set(privileged));
}

pub fn set_mhartid(value: u32) {
    HART.with(|h| h.mhartid.set(value));
}

pub fn set_mepc(value: u32) {
    HART.with(|h| h.mepc.set(value));
}

pub fn mstatus() -> Mstatus {
    HART.with(|h| Mstatus::from_bits_retain(h.mstatus.get()))
}

/// Number of `ecall`s this thread has taken.
pub fn ecall_count() -> u32 {
    HART.with(|h| h.ecalls.get())
}
