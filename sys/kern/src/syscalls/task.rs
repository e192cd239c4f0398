// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Task control.

use core::ffi::{c_char, c_void, CStr};

use gap_abi::{
    BaseType, MemoryRegion, TaskHandle, TaskState, TickType, TimeOut,
    UBaseType, NUM_CONFIGURABLE_REGIONS,
};
#[cfg(feature = "task-notifications")]
use gap_abi::NotifyAction;
#[cfg(feature = "application-task-tag")]
use gap_abi::TaskHookFunction;
#[cfg(feature = "trace-facility")]
use gap_abi::TaskStatus;
#[cfg(any(feature = "dynamic-alloc", feature = "static-alloc"))]
use gap_abi::{TaskFunction, TaskParameters};
#[cfg(feature = "static-alloc")]
use gap_abi::{StackType, StaticTask};

use super::Gated;
use crate::privilege::PrivilegeContext;

/// Notification index the non-indexed calls act on.
#[cfg(feature = "task-notifications")]
pub const DEFAULT_NOTIFY_INDEX: UBaseType = 0;

/// Task services. `None` in a task argument means the calling task, as in
/// the C API.
pub trait TaskApi {
    #[cfg(feature = "dynamic-alloc")]
    fn task_create(
        &self,
        code: TaskFunction,
        name: &CStr,
        stack_depth: u16,
        parameters: *mut c_void,
        priority: UBaseType,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType;

    #[cfg(feature = "static-alloc")]
    fn task_create_static(
        &self,
        code: TaskFunction,
        name: &CStr,
        parameters: *mut c_void,
        priority: UBaseType,
        stack: &'static mut [StackType],
        tcb: &'static mut StaticTask,
    ) -> Option<TaskHandle>;

    /// # Safety
    ///
    /// Every buffer `definition` points at must outlive the task.
    #[cfg(feature = "dynamic-alloc")]
    unsafe fn task_create_restricted(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType;

    /// # Safety
    ///
    /// Every buffer `definition` points at, including its task buffer, must
    /// outlive the task.
    #[cfg(feature = "static-alloc")]
    unsafe fn task_create_restricted_static(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType;

    fn task_allocate_mpu_regions(
        &self,
        task: Option<TaskHandle>,
        regions: &[MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    );

    fn task_delete(&self, task: Option<TaskHandle>);
    fn task_delay_until(&self, previous_wake: &mut TickType, increment: TickType);
    fn task_abort_delay(&self, task: TaskHandle) -> BaseType;
    fn task_delay(&self, ticks: TickType);
    fn task_priority_get(&self, task: Option<TaskHandle>) -> UBaseType;
    fn task_priority_set(&self, task: Option<TaskHandle>, priority: UBaseType);
    fn task_get_state(&self, task: TaskHandle) -> TaskState;

    #[cfg(feature = "trace-facility")]
    fn task_get_info(
        &self,
        task: Option<TaskHandle>,
        status: &mut TaskStatus,
        get_free_stack_space: BaseType,
        state: TaskState,
    );

    fn task_get_idle_task_handle(&self) -> Option<TaskHandle>;
    fn task_suspend(&self, task: Option<TaskHandle>);
    fn task_resume(&self, task: TaskHandle);
    fn task_suspend_all(&self);
    fn task_resume_all(&self) -> BaseType;
    fn task_get_tick_count(&self) -> TickType;
    fn task_get_number_of_tasks(&self) -> UBaseType;
    fn task_get_name(&self, task: Option<TaskHandle>) -> *const c_char;
    fn task_get_handle(&self, name: &CStr) -> Option<TaskHandle>;

    #[cfg(feature = "application-task-tag")]
    fn task_set_application_task_tag(
        &self,
        task: Option<TaskHandle>,
        tag: Option<TaskHookFunction>,
    );
    #[cfg(feature = "application-task-tag")]
    fn task_get_application_task_tag(
        &self,
        task: Option<TaskHandle>,
    ) -> Option<TaskHookFunction>;
    #[cfg(feature = "application-task-tag")]
    fn task_call_application_task_hook(
        &self,
        task: Option<TaskHandle>,
        parameter: *mut c_void,
    ) -> BaseType;

    #[cfg(feature = "thread-local-storage")]
    fn task_set_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
        value: *mut c_void,
    );
    #[cfg(feature = "thread-local-storage")]
    fn task_get_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
    ) -> *mut c_void;

    #[cfg(feature = "trace-facility")]
    fn task_get_system_state(
        &self,
        statuses: &mut [TaskStatus],
        total_run_time: Option<&mut u32>,
    ) -> UBaseType;

    fn task_catch_up_ticks(&self, ticks: TickType) -> BaseType;
    fn task_get_stack_high_water_mark(&self, task: Option<TaskHandle>)
        -> UBaseType;
    fn task_get_current_task_handle(&self) -> Option<TaskHandle>;
    fn task_get_scheduler_state(&self) -> BaseType;
    fn task_set_time_out_state(&self, timeout: &mut TimeOut);
    fn task_check_for_time_out(
        &self,
        timeout: &mut TimeOut,
        ticks_to_wait: &mut TickType,
    ) -> BaseType;

    #[cfg(feature = "task-notifications")]
    fn task_generic_notify(
        &self,
        task: TaskHandle,
        index: UBaseType,
        value: u32,
        action: NotifyAction,
        previous_value: Option<&mut u32>,
    ) -> BaseType;
    /// Waits on the notification at [`DEFAULT_NOTIFY_INDEX`].
    #[cfg(feature = "task-notifications")]
    fn task_notify_wait(
        &self,
        clear_on_entry: u32,
        clear_on_exit: u32,
        value: Option<&mut u32>,
        ticks: TickType,
    ) -> BaseType;
    #[cfg(feature = "task-notifications")]
    fn task_notify_take(
        &self,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32;
    #[cfg(feature = "task-notifications")]
    fn task_notify_state_clear(&self, task: Option<TaskHandle>) -> BaseType;
    #[cfg(feature = "task-notifications")]
    fn task_generic_notify_take(
        &self,
        index: UBaseType,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32;

    /// Writes a table of all tasks into `buffer` as text.
    ///
    /// # Safety
    ///
    /// The kernel does not bound the write. `buffer` must hold the whole
    /// table, about 40 bytes per task.
    #[cfg(all(feature = "trace-facility", feature = "dynamic-alloc"))]
    unsafe fn task_list(&self, buffer: &mut [u8]);

    /// Writes per-task run time as text into `buffer`.
    ///
    /// # Safety
    ///
    /// As for [`TaskApi::task_list`].
    #[cfg(all(feature = "run-time-stats", feature = "dynamic-alloc"))]
    unsafe fn task_get_run_time_stats(&self, buffer: &mut [u8]);

    #[cfg(feature = "run-time-stats")]
    fn task_get_idle_run_time_counter(&self) -> u32;
}

impl<P: PrivilegeContext, K: TaskApi> TaskApi for Gated<P, K> {
    #[cfg(feature = "dynamic-alloc")]
    fn task_create(
        &self,
        code: TaskFunction,
        name: &CStr,
        stack_depth: u16,
        parameters: *mut c_void,
        priority: UBaseType,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        self.gate(|k| {
            k.task_create(code, name, stack_depth, parameters, priority, created)
        })
    }

    #[cfg(feature = "static-alloc")]
    fn task_create_static(
        &self,
        code: TaskFunction,
        name: &CStr,
        parameters: *mut c_void,
        priority: UBaseType,
        stack: &'static mut [StackType],
        tcb: &'static mut StaticTask,
    ) -> Option<TaskHandle> {
        self.gate(|k| {
            k.task_create_static(code, name, parameters, priority, stack, tcb)
        })
    }

    #[cfg(feature = "dynamic-alloc")]
    unsafe fn task_create_restricted(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.task_create_restricted(definition, created) })
    }

    #[cfg(feature = "static-alloc")]
    unsafe fn task_create_restricted_static(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe {
            k.task_create_restricted_static(definition, created)
        })
    }

    fn task_allocate_mpu_regions(
        &self,
        task: Option<TaskHandle>,
        regions: &[MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    ) {
        self.gate(|k| k.task_allocate_mpu_regions(task, regions))
    }

    fn task_delete(&self, task: Option<TaskHandle>) {
        self.gate(|k| k.task_delete(task))
    }

    fn task_delay_until(&self, previous_wake: &mut TickType, increment: TickType) {
        self.gate(|k| k.task_delay_until(previous_wake, increment))
    }

    fn task_abort_delay(&self, task: TaskHandle) -> BaseType {
        self.gate(|k| k.task_abort_delay(task))
    }

    fn task_delay(&self, ticks: TickType) {
        self.gate(|k| k.task_delay(ticks))
    }

    fn task_priority_get(&self, task: Option<TaskHandle>) -> UBaseType {
        self.gate(|k| k.task_priority_get(task))
    }

    fn task_priority_set(&self, task: Option<TaskHandle>, priority: UBaseType) {
        self.gate(|k| k.task_priority_set(task, priority))
    }

    fn task_get_state(&self, task: TaskHandle) -> TaskState {
        self.gate(|k| k.task_get_state(task))
    }

    #[cfg(feature = "trace-facility")]
    fn task_get_info(
        &self,
        task: Option<TaskHandle>,
        status: &mut TaskStatus,
        get_free_stack_space: BaseType,
        state: TaskState,
    ) {
        self.gate(|k| k.task_get_info(task, status, get_free_stack_space, state))
    }

    fn task_get_idle_task_handle(&self) -> Option<TaskHandle> {
        self.gate(|k| k.task_get_idle_task_handle())
    }

    fn task_suspend(&self, task: Option<TaskHandle>) {
        self.gate(|k| k.task_suspend(task))
    }

    fn task_resume(&self, task: TaskHandle) {
        self.gate(|k| k.task_resume(task))
    }

    fn task_suspend_all(&self) {
        self.gate(|k| k.task_suspend_all())
    }

    fn task_resume_all(&self) -> BaseType {
        self.gate(|k| k.task_resume_all())
    }

    fn task_get_tick_count(&self) -> TickType {
        self.gate(|k| k.task_get_tick_count())
    }

    fn task_get_number_of_tasks(&self) -> UBaseType {
        self.gate(|k| k.task_get_number_of_tasks())
    }

    fn task_get_name(&self, task: Option<TaskHandle>) -> *const c_char {
        self.gate(|k| k.task_get_name(task))
    }

    fn task_get_handle(&self, name: &CStr) -> Option<TaskHandle> {
        self.gate(|k| k.task_get_handle(name))
    }

    #[cfg(feature = "application-task-tag")]
    fn task_set_application_task_tag(
        &self,
        task: Option<TaskHandle>,
        tag: Option<TaskHookFunction>,
    ) {
        self.gate(|k| k.task_set_application_task_tag(task, tag))
    }

    #[cfg(feature = "application-task-tag")]
    fn task_get_application_task_tag(
        &self,
        task: Option<TaskHandle>,
    ) -> Option<TaskHookFunction> {
        self.gate(|k| k.task_get_application_task_tag(task))
    }

    #[cfg(feature = "application-task-tag")]
    fn task_call_application_task_hook(
        &self,
        task: Option<TaskHandle>,
        parameter: *mut c_void,
    ) -> BaseType {
        self.gate(|k| k.task_call_application_task_hook(task, parameter))
    }

    #[cfg(feature = "thread-local-storage")]
    fn task_set_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
        value: *mut c_void,
    ) {
        self.gate(|k| k.task_set_thread_local_storage_pointer(task, index, value))
    }

    #[cfg(feature = "thread-local-storage")]
    fn task_get_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
    ) -> *mut c_void {
        self.gate(|k| k.task_get_thread_local_storage_pointer(task, index))
    }

    #[cfg(feature = "trace-facility")]
    fn task_get_system_state(
        &self,
        statuses: &mut [TaskStatus],
        total_run_time: Option<&mut u32>,
    ) -> UBaseType {
        self.gate(|k| k.task_get_system_state(statuses, total_run_time))
    }

    fn task_catch_up_ticks(&self, ticks: TickType) -> BaseType {
        self.gate(|k| k.task_catch_up_ticks(ticks))
    }

    fn task_get_stack_high_water_mark(
        &self,
        task: Option<TaskHandle>,
    ) -> UBaseType {
        self.gate(|k| k.task_get_stack_high_water_mark(task))
    }

    fn task_get_current_task_handle(&self) -> Option<TaskHandle> {
        self.gate(|k| k.task_get_current_task_handle())
    }

    fn task_get_scheduler_state(&self) -> BaseType {
        self.gate(|k| k.task_get_scheduler_state())
    }

    fn task_set_time_out_state(&self, timeout: &mut TimeOut) {
        self.gate(|k| k.task_set_time_out_state(timeout))
    }

    fn task_check_for_time_out(
        &self,
        timeout: &mut TimeOut,
        ticks_to_wait: &mut TickType,
    ) -> BaseType {
        self.gate(|k| k.task_check_for_time_out(timeout, ticks_to_wait))
    }

    #[cfg(feature = "task-notifications")]
    fn task_generic_notify(
        &self,
        task: TaskHandle,
        index: UBaseType,
        value: u32,
        action: NotifyAction,
        previous_value: Option<&mut u32>,
    ) -> BaseType {
        self.gate(|k| {
            k.task_generic_notify(task, index, value, action, previous_value)
        })
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_wait(
        &self,
        clear_on_entry: u32,
        clear_on_exit: u32,
        value: Option<&mut u32>,
        ticks: TickType,
    ) -> BaseType {
        self.gate(|k| {
            k.task_notify_wait(clear_on_entry, clear_on_exit, value, ticks)
        })
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_take(
        &self,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32 {
        self.gate(|k| k.task_notify_take(clear_count_on_exit, ticks))
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_state_clear(&self, task: Option<TaskHandle>) -> BaseType {
        self.gate(|k| k.task_notify_state_clear(task))
    }

    #[cfg(feature = "task-notifications")]
    fn task_generic_notify_take(
        &self,
        index: UBaseType,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32 {
        self.gate(|k| k.task_generic_notify_take(index, clear_count_on_exit, ticks))
    }

    #[cfg(all(feature = "trace-facility", feature = "dynamic-alloc"))]
    unsafe fn task_list(&self, buffer: &mut [u8]) {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.task_list(buffer) })
    }

    #[cfg(all(feature = "run-time-stats", feature = "dynamic-alloc"))]
    unsafe fn task_get_run_time_stats(&self, buffer: &mut [u8]) {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.task_get_run_time_stats(buffer) })
    }

    #[cfg(feature = "run-time-stats")]
    fn task_get_idle_run_time_counter(&self) -> u32 {
        self.gate(|k| k.task_get_idle_run_time_counter())
    }
}
