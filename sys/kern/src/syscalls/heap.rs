// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The kernel heap. Only present with dynamic allocation.

use core::ffi::c_void;

use super::Gated;
use crate::privilege::PrivilegeContext;

pub trait HeapApi {
    #[cfg(feature = "dynamic-alloc")]
    fn port_malloc(&self, size: usize) -> *mut c_void;

    /// # Safety
    ///
    /// `block` must have come from [`HeapApi::port_malloc`] and not been
    /// freed since.
    #[cfg(feature = "dynamic-alloc")]
    unsafe fn port_free(&self, block: *mut c_void);

    #[cfg(feature = "dynamic-alloc")]
    fn port_initialise_blocks(&self);

    #[cfg(feature = "dynamic-alloc")]
    fn port_get_free_heap_size(&self) -> usize;
}

impl<P: PrivilegeContext, K: HeapApi> HeapApi for Gated<P, K> {
    #[cfg(feature = "dynamic-alloc")]
    fn port_malloc(&self, size: usize) -> *mut c_void {
        self.gate(|k| k.port_malloc(size))
    }

    #[cfg(feature = "dynamic-alloc")]
    unsafe fn port_free(&self, block: *mut c_void) {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.port_free(block) })
    }

    #[cfg(feature = "dynamic-alloc")]
    fn port_initialise_blocks(&self) {
        self.gate(|k| k.port_initialise_blocks())
    }

    #[cfg(feature = "dynamic-alloc")]
    fn port_get_free_heap_size(&self) -> usize {
        self.gate(|k| k.port_get_free_heap_size())
    }
}

#[cfg(all(test, feature = "dynamic-alloc"))]
mod tests {
    use super::*;
    use crate::arch;
    use crate::privilege::Hart;
    use crate::syscalls::fake_kernel::{both_levels, transparent, FakeKernel};

    #[test]
    fn malloc_and_free_are_gated() {
        arch::set_privileged(false);
        let g = Gated::new(Hart, FakeKernel::default());
        let before = g.port_get_free_heap_size();
        let p = g.port_malloc(64);
        assert!(!p.is_null());
        assert_eq!(g.port_get_free_heap_size(), before - 64);
        // Safety: p came from port_malloc above.
        unsafe { g.port_free(p) };
        assert_eq!(g.port_get_free_heap_size(), before);
        assert!(!arch::is_privileged());
        assert!(g.kernel().all_privileged());
    }

    #[test]
    fn exhausted_heap_null_is_passed_through() {
        both_levels(
            |g| g.port_malloc(usize::MAX).is_null(),
            |k| k.port_malloc(usize::MAX).is_null(),
        );
    }

    #[test]
    fn heap_accounting_is_transparent() {
        transparent!(|k| {
            k.port_initialise_blocks();
            let total = k.port_get_free_heap_size();
            let p = k.port_malloc(100);
            let used = k.port_get_free_heap_size();
            // Safety: p came from port_malloc above.
            unsafe { k.port_free(p) };
            (total, p.is_null(), used, k.port_get_free_heap_size())
        });
    }
}
