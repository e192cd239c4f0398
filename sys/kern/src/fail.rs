// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Support for recording fatal kernel failures such that they can be found by
//! tooling.
//!
//! This module defines the following binary interface to debuggers:
//!
//! - `gap_kern::fail::KERNEL_EPITAPH` is a `StaticCell<Epitaph>`. Its
//!   `has_failed` field is set by [`die`]; `text` holds as much of the
//!   failure reason (as UTF-8) as fits, padded with NULs. For printing, trim
//!   off any trailing NUL bytes.
//!
//! There is no recovery from any of this. After recording, the reason is
//! printed with `klog!` and the image exits with a diagnostic code.

use core::fmt::{Display, Write};

use static_cell::StaticCell;

use crate::arch;

const EPITAPH_LEN: usize = 128;

/// Exit code for a kernel panic.
#[cfg(target_os = "none")]
const PANIC_EXIT: i32 = -1;

pub struct Epitaph {
    pub has_failed: bool,
    pub text: [u8; EPITAPH_LEN],
}

#[used]
static KERNEL_EPITAPH: StaticCell<Epitaph> = StaticCell::new(Epitaph {
    has_failed: false,
    text: [0; EPITAPH_LEN],
});

/// Whether the kernel has started failing.
pub fn has_failed() -> bool {
    match KERNEL_EPITAPH.try_borrow_mut() {
        Some(e) => e.has_failed,
        // Somebody is in the middle of writing it.
        None => true,
    }
}

/// Records `msg`, prints it, and exits with `code`.
#[inline(always)]
pub fn die(code: i32, msg: impl Display) -> ! {
    die_impl(code, &msg)
}

#[inline(never)]
fn die_impl(code: i32, msg: &dyn Display) -> ! {
    let Some(mut epitaph) = KERNEL_EPITAPH.try_borrow_mut() else {
        // A failure while recording a failure. Trying again would only
        // recurse.
        arch::halt()
    };

    epitaph.has_failed = true;
    epitaph.text = [0; EPITAPH_LEN];
    let mut writer = Eulogist {
        dest: &mut epitaph.text[..],
    };
    write!(writer, "{msg}").ok();

    klog!("{msg}");

    // The epitaph stays claimed through exit, so a fault from in here lands
    // in the halt above.
    arch::exit(code)
}

struct Eulogist<'a> {
    dest: &'a mut [u8],
}

impl Write for Eulogist<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let s = s.as_bytes();
        let n = s.len().min(self.dest.len());
        let (dest, leftovers) = {
            let taken = core::mem::take(&mut self.dest);
            taken.split_at_mut(n)
        };
        dest.copy_from_slice(&s[..n]);
        self.dest = leftovers;
        Ok(())
    }
}

#[cfg(target_os = "none")]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo<'_>) -> ! {
    die(PANIC_EXIT, info)
}
