// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Architecture-specific support.
//!
//! In practice, this works by
//!
//! - Conditionally defining a nested module (below).
//! - `pub use`-ing its contents
//!
//! Thus, all architecture-specific types and functions show up right here in
//! the `arch` module, tailored for the current target.
//!
//! Each backend must define the same set of names:
//!
//! - `klog!`, a `println!`-alike for kernel diagnostics,
//! - `is_privileged`, `read_mhartid`, `read_mepc`, `write_mstatus`,
//! - `ecall`, which traps into machine mode with a cause and four arguments,
//! - `exit`, which ends the image with a diagnostic code, and `halt`.

cfg_if::cfg_if! {
    // Note: cfg_if! is slightly touchy about ordering and expression
    // complexity; this chain seems to be the best compromise.

    if #[cfg(target_arch = "riscv32")] {
        #[macro_use]
        pub mod riscv32;
        pub use riscv32::*;
    } else if #[cfg(not(target_os = "none"))] {
        #[macro_use]
        pub mod fake;
        pub use fake::*;
    } else {
        compile_error!("support for this architecture not implemented");
    }
}
