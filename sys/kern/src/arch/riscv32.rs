// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support for the GAP fabric controller, an RI5CY-derived RV32IMC core.
//!
//! Machine mode is the privileged level and user mode the unprivileged one;
//! there is no supervisor mode. The trap vector itself lives in the PMSIS
//! startup code, which forwards `ecall` to [`crate::ffi::ecall_entry`] and
//! faults to the handlers exported from `ffi`.

use core::arch::asm;

use gap_abi::{EcallCause, Mstatus};
use riscv::register;

/// Log things from kernel context. This macro is made visible to the rest of
/// the kernel by a chain of `#[macro_use]` attributes.
///
/// On GAP this goes to the PMSIS console through `putchar`, which is routed
/// to UART or to the debug bridge depending on how the image was built.
macro_rules! klog {
    ($($tt:tt)*) => {{
        use core::fmt::Write as _;
        let _ = writeln!($crate::arch::Console, $($tt)*);
    }};
}

extern "C" {
    fn putchar(c: i32) -> i32;
    fn pmsis_exit(code: i32);
}

/// Byte sink for `klog!`.
pub struct Console;

impl core::fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            // Safety: putchar has no preconditions.
            unsafe {
                putchar(i32::from(b));
            }
        }
        Ok(())
    }
}

/// RI5CY user-readable CSR holding the current privilege level.
const CSR_PRIVLV: u32 = 0xC10;
const PRIV_MACHINE: u32 = 0b11;

/// Whether the hart is currently in machine mode.
///
/// `mstatus` cannot be read from user mode, so this goes through the
/// core-specific `PRIVLV` register instead.
pub fn is_privileged() -> bool {
    let lvl: u32;
    // Safety: reading PRIVLV has no side effects and is legal in any mode.
    unsafe {
        asm!("csrr {0}, {csr}", out(reg) lvl, csr = const CSR_PRIVLV);
    }
    lvl & PRIV_MACHINE == PRIV_MACHINE
}

pub fn read_mhartid() -> u32 {
    register::mhartid::read() as u32
}

pub fn read_mepc() -> u32 {
    register::mepc::read() as u32
}

/// Overwrites `mstatus` with `value`. Only meaningful from machine mode,
/// where it decides the mode `mret` returns to.
pub fn write_mstatus(value: Mstatus) {
    // Safety: only called from trap context, where the whole register is
    // ours to set.
    unsafe {
        asm!("csrw mstatus, {0}", in(reg) value.bits());
    }
}

/// Issues `ecall` with `cause` in `a7` and `args` in `a0..a3`, returning
/// whatever the handler left in `a0`.
pub fn ecall(cause: EcallCause, args: [u32; 4]) -> u32 {
    let ret: u32;
    // Safety: the trap handler preserves every register except a0.
    unsafe {
        asm!(
            "ecall",
            in("a7") cause as u32,
            inlateout("a0") args[0] => ret,
            in("a1") args[1],
            in("a2") args[2],
            in("a3") args[3],
        );
    }
    ret
}

/// Ends the image with `code`. PMSIS reports the code to the debug bridge
/// and stops the chip; if it ever returns, we park.
pub fn exit(code: i32) -> ! {
    // Safety: pmsis_exit accepts any code.
    unsafe {
        pmsis_exit(code);
    }
    halt()
}

pub fn halt() -> ! {
    loop {
        // Safety: wfi only waits.
        unsafe {
            asm!("wfi");
        }
    }
}
