// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The privilege gate.
//!
//! A gated call looks like this:
//!
//! ```ignore
//! let was = raise_privilege(&Hart);
//! let r = kernel_primitive(args);
//! reset_privilege(&Hart, was);
//! r
//! ```
//!
//! The level is never assumed: `raise_privilege` reports what it found, and
//! `reset_privilege` only drops to user mode if that is where the caller
//! started. Raised regions must nest strictly on a hart; [`with_privilege`]
//! and [`Raised`] make that structural.

use ringbuf::{ringbuf, ringbuf_entry};

use crate::arch;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    Raise,
    AlreadyPrivileged,
    Reset,
}

ringbuf!(Trace, 16, Trace::None);

/// Something that has a privilege level we can inspect and change.
///
/// The gate is written against this rather than against the hart directly
/// so that it can be exercised on the host.
pub trait PrivilegeContext {
    /// Whether the context is currently running privileged.
    fn is_privileged(&self) -> bool;

    /// Moves the context to the given level.
    fn set_privileged(&self, privileged: bool);
}

impl<P: PrivilegeContext + ?Sized> PrivilegeContext for &P {
    fn is_privileged(&self) -> bool {
        (**self).is_privileged()
    }

    fn set_privileged(&self, privileged: bool) {
        (**self).set_privileged(privileged)
    }
}

/// The hart we are running on. Level changes go through `ecall`, since user
/// mode cannot write `mstatus` itself.
#[derive(Copy, Clone, Debug, Default)]
pub struct Hart;

impl PrivilegeContext for Hart {
    fn is_privileged(&self) -> bool {
        arch::is_privileged()
    }

    fn set_privileged(&self, privileged: bool) {
        if privileged {
            crate::ecall::raise_priv();
        } else {
            crate::ecall::reset_priv();
        }
    }
}

/// Raises `ctx` to privileged if it is not already there. Returns the level
/// it was at, which must be handed to the matching [`reset_privilege`].
pub fn raise_privilege<P: PrivilegeContext + ?Sized>(ctx: &P) -> bool {
    let was_privileged = ctx.is_privileged();
    if was_privileged {
        ringbuf_entry!(Trace::AlreadyPrivileged);
    } else {
        ringbuf_entry!(Trace::Raise);
        ctx.set_privileged(true);
    }
    was_privileged
}

/// Undoes a [`raise_privilege`]: drops back to user mode unless
/// `was_privileged` says the caller started out privileged.
pub fn reset_privilege<P: PrivilegeContext + ?Sized>(
    ctx: &P,
    was_privileged: bool,
) {
    if !was_privileged {
        ringbuf_entry!(Trace::Reset);
        ctx.set_privileged(false);
    }
}

/// A raised region. Privilege is reset when this is dropped, including on
/// unwind.
#[must_use]
pub struct Raised<'a, P: PrivilegeContext + ?Sized> {
    ctx: &'a P,
    was_privileged: bool,
}

impl<'a, P: PrivilegeContext + ?Sized> Raised<'a, P> {
    pub fn new(ctx: &'a P) -> Self {
        let was_privileged = raise_privilege(ctx);
        Self {
            ctx,
            was_privileged,
        }
    }

    /// The level the context was at before this region.
    pub fn was_privileged(&self) -> bool {
        self.was_privileged
    }
}

impl<P: PrivilegeContext + ?Sized> Drop for Raised<'_, P> {
    fn drop(&mut self) {
        reset_privilege(self.ctx, self.was_privileged);
    }
}

/// Runs `body` privileged, then restores the caller's level. Returns
/// whatever `body` returns.
#[inline(always)]
pub fn with_privilege<P, R>(ctx: &P, body: impl FnOnce() -> R) -> R
where
    P: PrivilegeContext + ?Sized,
{
    let _raised = Raised::new(ctx);
    body()
}
