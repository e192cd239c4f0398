// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Single-owner containers for process-wide state.
//!
//! The GAP fabric controller is an RV32IMC core without the `A` extension, so
//! `AtomicBool::swap` does not exist there. On such targets the claim flag is
//! updated with a plain load followed by a store. That is only sound because
//! everything stored in these cells is touched from one hart, and never from
//! an interrupt handler that could preempt a claim in progress.

#![cfg_attr(not(test), no_std)]

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_has_atomic = "8")]
#[inline(always)]
fn claim_flag(flag: &AtomicBool) -> bool {
    flag.swap(true, Ordering::Acquire)
}

#[cfg(not(target_has_atomic = "8"))]
#[inline(always)]
fn claim_flag(flag: &AtomicBool) -> bool {
    let orig = flag.load(Ordering::Acquire);
    flag.store(true, Ordering::Relaxed);
    orig
}

/// A RefCell-style container that can be used in a static for cases where only
/// a single borrow needs to happen at any given time.
///
/// This only provides `mut` access. It does _not_ provide the many-reader
/// one-writer behavior of `RefCell`, only the one-writer part.
#[derive(Default)]
pub struct StaticCell<T> {
    borrowed: AtomicBool,
    cell: UnsafeCell<T>,
}

impl<T> StaticCell<T> {
    /// Creates a `StaticCell` containing `contents`.
    pub const fn new(contents: T) -> Self {
        Self {
            borrowed: AtomicBool::new(false),
            cell: UnsafeCell::new(contents),
        }
    }

    /// Gets mutable access to the contents of `self`.
    ///
    /// If a `StaticRef` for `self` still exists anywhere in the program, this
    /// will panic.
    #[track_caller]
    pub fn borrow_mut(&self) -> StaticRef<'_, T> {
        match self.try_borrow_mut() {
            Some(r) => r,
            None => panic!("StaticCell already borrowed"),
        }
    }

    /// Gets mutable access to the contents of `self`, or `None` if a
    /// `StaticRef` for `self` is still alive.
    ///
    /// Recording paths that must never fault (trace buffers, mostly) use this
    /// and drop their update on contention.
    pub fn try_borrow_mut(&self) -> Option<StaticRef<'_, T>> {
        if claim_flag(&self.borrowed) {
            return None;
        }
        // Safety: the flag check above ensures that we are not producing an
        // aliasing &mut to our contents.
        Some(StaticRef {
            contents: unsafe { &mut *self.cell.get() },
            borrow: &self.borrowed,
        })
    }
}

unsafe impl<T> Sync for StaticCell<T> where for<'a> &'a mut T: Send {}

pub struct StaticRef<'a, T> {
    contents: &'a mut T,
    borrow: &'a AtomicBool,
}

impl<T> Drop for StaticRef<'_, T> {
    fn drop(&mut self) {
        self.borrow.store(false, Ordering::Release);
    }
}

impl<T> core::ops::Deref for StaticRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &*self.contents
    }
}

impl<T> core::ops::DerefMut for StaticRef<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrow_is_released_on_drop() {
        let cell = StaticCell::new(7u32);
        {
            let mut r = cell.borrow_mut();
            *r += 1;
        }
        assert_eq!(*cell.borrow_mut(), 8);
    }

    #[test]
    fn second_borrow_is_refused() {
        let cell = StaticCell::new(0u8);
        let _first = cell.borrow_mut();
        assert!(cell.try_borrow_mut().is_none());
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn second_borrow_mut_panics() {
        let cell = StaticCell::new(0u8);
        let _first = cell.borrow_mut();
        let _second = cell.borrow_mut();
    }
}
