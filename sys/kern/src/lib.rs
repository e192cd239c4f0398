// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Privileged half of the FreeRTOS port for the GAP fabric controller.
//!
//! Application tasks run in user mode, confined by the MPU. To reach the
//! kernel they go through the wrappers in [`syscalls`], which raise privilege
//! with an `ecall`, call the real kernel primitive, and drop back to whatever
//! level the caller started at.
//!
//! Code outside of the `arch` module is portable. On the host it builds
//! against a simulated hart so the privilege logic can be tested without
//! hardware.
//!
//! # Design principles
//!
//! 1. The kernel itself is a collaborator. Nothing here schedules, queues or
//!    times anything; it only moves callers across the privilege boundary.
//! 2. Static configuration. Which wrappers exist, and the platform constants
//!    they rely on, are fixed at build time by Cargo features and the
//!    application config.
//! 3. A wrapper never changes what the primitive it wraps returns.

#![cfg_attr(target_os = "none", no_std)]

#[macro_use]
pub mod arch;

pub mod ecall;
pub mod fail;
pub mod privilege;
pub mod quantum;
pub mod restricted;
pub mod syscalls;

#[cfg(target_arch = "riscv32")]
pub mod ffi;

/// Constants generated from the application config by `build.rs`.
pub mod kconfig {
    include!(concat!(env!("OUT_DIR"), "/kconfig.rs"));
}
