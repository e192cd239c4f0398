// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Launching restricted tasks.
//!
//! A restricted task runs its entry point in user mode. Apart from its own
//! stack, it can only touch the memory described by up to
//! [`NUM_CONFIGURABLE_REGIONS`] MPU regions, which are normally computed
//! from linker symbols bracketing the task's code and data.
//!
//! Region rules are encoded as given. Nothing here checks that a region is
//! granule aligned or that it does not overlap another task's; a bad region
//! is a bad rule.
//!
//! Two restricted tasks are free to suspend and resume one another (and
//! their parent) through the gated task calls. The launcher does not order
//! those hand-offs; a task that is resumed before its data is ready will
//! simply run early.

use core::ffi::{c_void, CStr};

use gap_abi::{
    BaseType, MemoryRegion, MpuArea, MpuRule, StackType, TaskFunction,
    TaskHandle, TaskParameters, UBaseType, MPU_GRANULE_SHIFT,
    NUM_CONFIGURABLE_REGIONS, PD_PASS,
};
#[cfg(feature = "static-alloc")]
use gap_abi::StaticTask;
use ringbuf::{ringbuf, ringbuf_entry};

use crate::kconfig;
use crate::syscalls::TaskApi;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    Created(usize),
    Refused(BaseType),
    NoHandle,
}

ringbuf!(Trace, 8, Trace::None);

/// Computes the MPU rule covering `start..end` in `area`, where addresses in
/// `area` are measured from `base_offset`.
pub fn region_rule(
    area: MpuArea,
    start: u32,
    end: u32,
    base_offset: u32,
) -> MpuRule {
    let base = start.wrapping_sub(base_offset);
    let size_code = end.wrapping_sub(start) >> MPU_GRANULE_SHIFT;
    MpuRule::encode(area, base, size_code)
}

/// Rule for the L2 range between two linker symbols, typically the start of
/// a task's code and the end of its data.
pub fn region_rule_for_symbols(start: *const u8, end: *const u8) -> MpuRule {
    region_rule(
        MpuArea::L2,
        start as usize as u32,
        end as usize as u32,
        kconfig::L2_BASE,
    )
}

/// A full region descriptor for the L2 range `start..end`.
pub fn l2_region(start: *mut u8, end: *const u8) -> MemoryRegion {
    MemoryRegion {
        base_address: start.cast::<c_void>(),
        length_in_bytes: (end as usize).wrapping_sub(start as usize) as u32,
        parameters: region_rule_for_symbols(start, end),
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LaunchError {
    /// The kernel refused; this is its own return code.
    Kernel(BaseType),
    /// The kernel reported success but wrote back no handle.
    NoHandle,
    /// Static creation was asked for without a task buffer.
    NoTaskBuffer,
    /// The stack is longer than the kernel's 16-bit depth field can say.
    StackTooLarge,
}

/// Everything needed to launch one restricted task.
///
/// The stack and task buffer are borrowed for `'static` because the kernel
/// keeps pointers into them for the life of the task.
pub struct RestrictedTask {
    code: TaskFunction,
    name: &'static CStr,
    stack: &'static mut [StackType],
    parameters: *mut c_void,
    priority: UBaseType,
    regions: [MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    #[cfg(feature = "static-alloc")]
    task_buffer: Option<&'static mut StaticTask>,
}

impl RestrictedTask {
    pub fn new(
        code: TaskFunction,
        name: &'static CStr,
        stack: &'static mut [StackType],
        priority: UBaseType,
    ) -> Self {
        Self {
            code,
            name,
            stack,
            parameters: core::ptr::null_mut(),
            priority,
            regions: [MemoryRegion::UNUSED; NUM_CONFIGURABLE_REGIONS],
            #[cfg(feature = "static-alloc")]
            task_buffer: None,
        }
    }

    /// Argument passed to the entry point.
    pub fn with_parameters(mut self, parameters: *mut c_void) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_regions(
        mut self,
        regions: [MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    ) -> Self {
        self.regions = regions;
        self
    }

    #[cfg(feature = "static-alloc")]
    pub fn with_task_buffer(mut self, tcb: &'static mut StaticTask) -> Self {
        self.task_buffer = Some(tcb);
        self
    }

    /// The C descriptor for this task.
    pub fn parameters(&mut self) -> Result<TaskParameters, LaunchError> {
        let stack_depth = u16::try_from(self.stack.len())
            .map_err(|_| LaunchError::StackTooLarge)?;

        #[cfg(feature = "static-alloc")]
        let task_buffer = self
            .task_buffer
            .as_deref_mut()
            .map_or(core::ptr::null_mut(), |t| t as *mut StaticTask);
        #[cfg(not(feature = "static-alloc"))]
        let task_buffer = core::ptr::null_mut();

        Ok(TaskParameters {
            code: self.code,
            name: self.name.as_ptr(),
            stack_depth,
            parameters: self.parameters,
            priority: self.priority,
            stack_buffer: self.stack.as_mut_ptr(),
            regions: self.regions,
            task_buffer,
        })
    }
}

#[cfg(any(feature = "dynamic-alloc", feature = "static-alloc"))]
fn finish(
    code: BaseType,
    created: Option<TaskHandle>,
) -> Result<TaskHandle, LaunchError> {
    if code != PD_PASS {
        ringbuf_entry!(Trace::Refused(code));
        return Err(LaunchError::Kernel(code));
    }
    match created {
        Some(handle) => {
            ringbuf_entry!(Trace::Created(handle.as_ptr() as usize));
            Ok(handle)
        }
        None => {
            ringbuf_entry!(Trace::NoHandle);
            Err(LaunchError::NoHandle)
        }
    }
}

/// Creates `task` with a kernel-allocated TCB. `kernel` must either be
/// privileged already or be a [`Gated`](crate::syscalls::Gated) kernel.
#[cfg(feature = "dynamic-alloc")]
pub fn create_restricted<K: TaskApi>(
    kernel: &K,
    mut task: RestrictedTask,
) -> Result<TaskHandle, LaunchError> {
    let definition = task.parameters()?;
    let mut created = None;
    // Safety: the stack is borrowed for 'static and the name is 'static, so
    // everything the descriptor points at outlives the task.
    let code =
        unsafe { kernel.task_create_restricted(&definition, Some(&mut created)) };
    finish(code, created)
}

/// Creates `task` in its caller-supplied task buffer.
#[cfg(feature = "static-alloc")]
pub fn create_restricted_static<K: TaskApi>(
    kernel: &K,
    mut task: RestrictedTask,
) -> Result<TaskHandle, LaunchError> {
    if task.task_buffer.is_none() {
        return Err(LaunchError::NoTaskBuffer);
    }
    let definition = task.parameters()?;
    let mut created = None;
    // Safety: as above, and the task buffer is also borrowed for 'static.
    let code = unsafe {
        kernel.task_create_restricted_static(&definition, Some(&mut created))
    };
    finish(code, created)
}
