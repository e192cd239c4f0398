// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The syscall trampoline.
//!
//! Each kernel service family is a trait. The real kernel implements them in
//! `ffi` by calling the C primitives directly, which only works from machine
//! mode. [`Gated`] implements the same traits for any inner implementation by
//! raising privilege, forwarding the call unchanged, and restoring the
//! caller's level. That is the whole of its job: arguments go through
//! untouched, results come back untouched, and every call costs exactly one
//! raise/reset cycle (or none, if the caller was already privileged).
//!
//! A blocking primitive blocks inside the raised region. A task waiting on a
//! queue through a gated call is therefore suspended in machine mode; it is
//! put back to user mode when the primitive returns.
//!
//! Which methods exist depends on the kernel features this crate was built
//! with. A method whose feature is off is absent from the trait, from
//! [`Gated`], and from the exported C symbols.

use crate::privilege::{with_privilege, PrivilegeContext};

mod event_group;
mod heap;
mod queue;
mod stream_buffer;
#[cfg(feature = "timers")]
mod timer;
mod task;

#[cfg(test)]
pub(crate) mod fake_kernel;

pub use event_group::EventGroupApi;
pub use heap::HeapApi;
pub use queue::QueueApi;
pub use stream_buffer::StreamBufferApi;
pub use task::TaskApi;
#[cfg(feature = "task-notifications")]
pub use task::DEFAULT_NOTIFY_INDEX;
#[cfg(feature = "timers")]
pub use timer::TimerApi;

/// Kernel services reachable from user mode.
///
/// `P` is the thing whose privilege gets raised (normally
/// [`Hart`](crate::privilege::Hart)); `K` is the implementation that does
/// the work once raised.
#[derive(Debug, Default)]
pub struct Gated<P, K> {
    ctx: P,
    kernel: K,
}

impl<P: PrivilegeContext, K> Gated<P, K> {
    pub const fn new(ctx: P, kernel: K) -> Self {
        Self { ctx, kernel }
    }

    /// The ungated implementation underneath.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn context(&self) -> &P {
        &self.ctx
    }

    #[inline(always)]
    fn gate<R>(&self, call: impl FnOnce(&K) -> R) -> R {
        with_privilege(&self.ctx, || call(&self.kernel))
    }
}
