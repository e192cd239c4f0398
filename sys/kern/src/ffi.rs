// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The C side of the port.
//!
//! Application code built against the FreeRTOS MPU headers calls
//! `MPU_xQueueSend` and friends instead of the kernel functions themselves.
//! Those symbols are defined here: each one raises privilege, calls the
//! kernel function of the same name without the prefix, and resets. The
//! same kernel functions are also bound to the Rust traits in
//! [`crate::syscalls`] through [`FreeRtos`], so Rust tasks can use
//! [`KERNEL`] and get the same behavior.
//!
//! This module also exports the trap-side entry points the PMSIS startup
//! code expects: the `ecall` dispatcher and the `_ecall_vector` table it
//! can index instead, the two fatal handlers, the user stubs for the
//! `ecall` services, and the preemption quantum check called from the tick
//! handler.

#![allow(non_snake_case)]

use core::ffi::{c_char, c_void, CStr};
use core::num::NonZeroU32;

use gap_abi::*;
use static_cell::StaticCell;

use crate::privilege::{with_privilege, Hart};
use crate::quantum::QuantumGate;
#[cfg(feature = "timers")]
use crate::syscalls::TimerApi;
use crate::syscalls::{
    EventGroupApi, Gated, HeapApi, QueueApi, StreamBufferApi, TaskApi,
};
use crate::{ecall, kconfig};

/// Declares kernel functions and exports a privilege-gated `MPU_` wrapper
/// for each. Attributes (in practice, `cfg`s) apply to both.
macro_rules! mpu_wrappers {
    ($(
        $(#[$attr:meta])*
        fn $export:ident => $real:ident($($arg:ident: $ty:ty),* $(,)?) $(-> $ret:ty)?;
    )*) => {
        extern "C" {
            $(
                $(#[$attr])*
                fn $real($($arg: $ty),*) $(-> $ret)?;
            )*
        }

        $(
            $(#[$attr])*
            #[no_mangle]
            pub unsafe extern "C" fn $export($($arg: $ty),*) $(-> $ret)? {
                // Safety: the caller upholds the kernel function's contract;
                // we only change the level it runs at.
                with_privilege(&Hart, || unsafe { $real($($arg),*) })
            }
        )*
    };
}

mpu_wrappers! {
    // Tasks.
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_xTaskCreate => xTaskCreate(
        code: TaskFunction,
        name: *const c_char,
        stack_depth: u16,
        parameters: *mut c_void,
        priority: UBaseType,
        created: *mut Option<TaskHandle>,
    ) -> BaseType;
    #[cfg(feature = "static-alloc")]
    fn MPU_xTaskCreateStatic => xTaskCreateStatic(
        code: TaskFunction,
        name: *const c_char,
        stack_depth: u32,
        parameters: *mut c_void,
        priority: UBaseType,
        stack: *mut StackType,
        tcb: *mut StaticTask,
    ) -> Option<TaskHandle>;
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_xTaskCreateRestricted => xTaskCreateRestricted(
        definition: *const TaskParameters,
        created: *mut Option<TaskHandle>,
    ) -> BaseType;
    #[cfg(feature = "static-alloc")]
    fn MPU_xTaskCreateRestrictedStatic => xTaskCreateRestrictedStatic(
        definition: *const TaskParameters,
        created: *mut Option<TaskHandle>,
    ) -> BaseType;
    fn MPU_vTaskAllocateMPURegions => vTaskAllocateMPURegions(
        task: Option<TaskHandle>,
        regions: *const MemoryRegion,
    );
    fn MPU_vTaskDelete => vTaskDelete(task: Option<TaskHandle>);
    fn MPU_vTaskDelayUntil => vTaskDelayUntil(
        previous_wake: *mut TickType,
        increment: TickType,
    );
    fn MPU_xTaskAbortDelay => xTaskAbortDelay(task: Option<TaskHandle>) -> BaseType;
    fn MPU_vTaskDelay => vTaskDelay(ticks: TickType);
    fn MPU_uxTaskPriorityGet => uxTaskPriorityGet(task: Option<TaskHandle>) -> UBaseType;
    fn MPU_vTaskPrioritySet => vTaskPrioritySet(
        task: Option<TaskHandle>,
        priority: UBaseType,
    );
    fn MPU_eTaskGetState => eTaskGetState(task: Option<TaskHandle>) -> TaskState;
    #[cfg(feature = "trace-facility")]
    fn MPU_vTaskGetInfo => vTaskGetInfo(
        task: Option<TaskHandle>,
        status: *mut TaskStatus,
        get_free_stack_space: BaseType,
        state: TaskState,
    );
    fn MPU_xTaskGetIdleTaskHandle => xTaskGetIdleTaskHandle() -> Option<TaskHandle>;
    fn MPU_vTaskSuspend => vTaskSuspend(task: Option<TaskHandle>);
    fn MPU_vTaskResume => vTaskResume(task: Option<TaskHandle>);
    fn MPU_vTaskSuspendAll => vTaskSuspendAll();
    fn MPU_xTaskResumeAll => xTaskResumeAll() -> BaseType;
    fn MPU_xTaskGetTickCount => xTaskGetTickCount() -> TickType;
    fn MPU_uxTaskGetNumberOfTasks => uxTaskGetNumberOfTasks() -> UBaseType;
    fn MPU_pcTaskGetName => pcTaskGetName(task: Option<TaskHandle>) -> *const c_char;
    fn MPU_xTaskGetHandle => xTaskGetHandle(name: *const c_char) -> Option<TaskHandle>;
    #[cfg(feature = "application-task-tag")]
    fn MPU_vTaskSetApplicationTaskTag => vTaskSetApplicationTaskTag(
        task: Option<TaskHandle>,
        tag: Option<TaskHookFunction>,
    );
    #[cfg(feature = "application-task-tag")]
    fn MPU_xTaskGetApplicationTaskTag => xTaskGetApplicationTaskTag(
        task: Option<TaskHandle>,
    ) -> Option<TaskHookFunction>;
    #[cfg(feature = "application-task-tag")]
    fn MPU_xTaskCallApplicationTaskHook => xTaskCallApplicationTaskHook(
        task: Option<TaskHandle>,
        parameter: *mut c_void,
    ) -> BaseType;
    #[cfg(feature = "thread-local-storage")]
    fn MPU_vTaskSetThreadLocalStoragePointer => vTaskSetThreadLocalStoragePointer(
        task: Option<TaskHandle>,
        index: BaseType,
        value: *mut c_void,
    );
    #[cfg(feature = "thread-local-storage")]
    fn MPU_pvTaskGetThreadLocalStoragePointer => pvTaskGetThreadLocalStoragePointer(
        task: Option<TaskHandle>,
        index: BaseType,
    ) -> *mut c_void;
    #[cfg(feature = "trace-facility")]
    fn MPU_uxTaskGetSystemState => uxTaskGetSystemState(
        statuses: *mut TaskStatus,
        len: UBaseType,
        total_run_time: *mut u32,
    ) -> UBaseType;
    fn MPU_xTaskCatchUpTicks => xTaskCatchUpTicks(ticks: TickType) -> BaseType;
    fn MPU_uxTaskGetStackHighWaterMark => uxTaskGetStackHighWaterMark(
        task: Option<TaskHandle>,
    ) -> UBaseType;
    fn MPU_xTaskGetCurrentTaskHandle => xTaskGetCurrentTaskHandle() -> Option<TaskHandle>;
    fn MPU_xTaskGetSchedulerState => xTaskGetSchedulerState() -> BaseType;
    fn MPU_vTaskSetTimeOutState => vTaskSetTimeOutState(timeout: *mut TimeOut);
    fn MPU_xTaskCheckForTimeOut => xTaskCheckForTimeOut(
        timeout: *mut TimeOut,
        ticks_to_wait: *mut TickType,
    ) -> BaseType;
    #[cfg(feature = "task-notifications")]
    fn MPU_xTaskGenericNotify => xTaskGenericNotify(
        task: Option<TaskHandle>,
        index: UBaseType,
        value: u32,
        action: u32,
        previous_value: *mut u32,
    ) -> BaseType;
    #[cfg(feature = "task-notifications")]
    fn MPU_xTaskNotifyWait => xTaskNotifyWait(
        clear_on_entry: u32,
        clear_on_exit: u32,
        value: *mut u32,
        ticks: TickType,
    ) -> BaseType;
    #[cfg(feature = "task-notifications")]
    fn MPU_ulTaskNotifyTake => ulTaskNotifyTake(
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32;
    #[cfg(feature = "task-notifications")]
    fn MPU_xTaskNotifyStateClear => xTaskNotifyStateClear(
        task: Option<TaskHandle>,
    ) -> BaseType;
    #[cfg(feature = "task-notifications")]
    fn MPU_ulTaskGenericNotifyTake => ulTaskGenericNotifyTake(
        index: UBaseType,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32;
    #[cfg(all(feature = "trace-facility", feature = "dynamic-alloc"))]
    fn MPU_vTaskList => vTaskList(buffer: *mut c_char);
    #[cfg(all(feature = "run-time-stats", feature = "dynamic-alloc"))]
    fn MPU_vTaskGetRunTimeStats => vTaskGetRunTimeStats(buffer: *mut c_char);
    #[cfg(feature = "run-time-stats")]
    fn MPU_ulTaskGetIdleRunTimeCounter => ulTaskGetIdleRunTimeCounter() -> u32;

    // Queues, semaphores, mutexes.
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_xQueueGenericCreate => xQueueGenericCreate(
        length: UBaseType,
        item_size: UBaseType,
        kind: QueueType,
    ) -> Option<QueueHandle>;
    #[cfg(feature = "static-alloc")]
    fn MPU_xQueueGenericCreateStatic => xQueueGenericCreateStatic(
        length: UBaseType,
        item_size: UBaseType,
        storage: *mut u8,
        buffer: *mut StaticQueue,
        kind: QueueType,
    ) -> Option<QueueHandle>;
    fn MPU_xQueueGenericReset => xQueueGenericReset(
        queue: Option<QueueHandle>,
        new_queue: BaseType,
    ) -> BaseType;
    fn MPU_xQueueGenericSend => xQueueGenericSend(
        queue: Option<QueueHandle>,
        item: *const c_void,
        ticks: TickType,
        position: CopyPosition,
    ) -> BaseType;
    fn MPU_uxQueueMessagesWaiting => uxQueueMessagesWaiting(
        queue: Option<QueueHandle>,
    ) -> UBaseType;
    fn MPU_uxQueueSpacesAvailable => uxQueueSpacesAvailable(
        queue: Option<QueueHandle>,
    ) -> UBaseType;
    fn MPU_xQueueReceive => xQueueReceive(
        queue: Option<QueueHandle>,
        buffer: *mut c_void,
        ticks: TickType,
    ) -> BaseType;
    fn MPU_xQueuePeek => xQueuePeek(
        queue: Option<QueueHandle>,
        buffer: *mut c_void,
        ticks: TickType,
    ) -> BaseType;
    fn MPU_xQueueSemaphoreTake => xQueueSemaphoreTake(
        queue: Option<QueueHandle>,
        ticks: TickType,
    ) -> BaseType;
    #[cfg(feature = "mutexes")]
    fn MPU_xQueueGetMutexHolder => xQueueGetMutexHolder(
        mutex: Option<QueueHandle>,
    ) -> Option<TaskHandle>;
    #[cfg(all(feature = "mutexes", feature = "dynamic-alloc"))]
    fn MPU_xQueueCreateMutex => xQueueCreateMutex(kind: QueueType) -> Option<QueueHandle>;
    #[cfg(all(feature = "mutexes", feature = "static-alloc"))]
    fn MPU_xQueueCreateMutexStatic => xQueueCreateMutexStatic(
        kind: QueueType,
        buffer: *mut StaticQueue,
    ) -> Option<QueueHandle>;
    #[cfg(all(feature = "counting-semaphores", feature = "dynamic-alloc"))]
    fn MPU_xQueueCreateCountingSemaphore => xQueueCreateCountingSemaphore(
        max_count: UBaseType,
        initial_count: UBaseType,
    ) -> Option<QueueHandle>;
    #[cfg(all(feature = "counting-semaphores", feature = "static-alloc"))]
    fn MPU_xQueueCreateCountingSemaphoreStatic => xQueueCreateCountingSemaphoreStatic(
        max_count: UBaseType,
        initial_count: UBaseType,
        buffer: *mut StaticQueue,
    ) -> Option<QueueHandle>;
    #[cfg(feature = "recursive-mutexes")]
    fn MPU_xQueueTakeMutexRecursive => xQueueTakeMutexRecursive(
        mutex: Option<QueueHandle>,
        ticks: TickType,
    ) -> BaseType;
    #[cfg(feature = "recursive-mutexes")]
    fn MPU_xQueueGiveMutexRecursive => xQueueGiveMutexRecursive(
        mutex: Option<QueueHandle>,
    ) -> BaseType;
    #[cfg(all(feature = "queue-sets", feature = "dynamic-alloc"))]
    fn MPU_xQueueCreateSet => xQueueCreateSet(
        event_queue_length: UBaseType,
    ) -> Option<QueueSetHandle>;
    #[cfg(feature = "queue-sets")]
    fn MPU_xQueueSelectFromSet => xQueueSelectFromSet(
        set: Option<QueueSetHandle>,
        ticks: TickType,
    ) -> Option<QueueSetMemberHandle>;
    #[cfg(feature = "queue-sets")]
    fn MPU_xQueueAddToSet => xQueueAddToSet(
        member: Option<QueueSetMemberHandle>,
        set: Option<QueueSetHandle>,
    ) -> BaseType;
    #[cfg(feature = "queue-sets")]
    fn MPU_xQueueRemoveFromSet => xQueueRemoveFromSet(
        member: Option<QueueSetMemberHandle>,
        set: Option<QueueSetHandle>,
    ) -> BaseType;
    #[cfg(feature = "queue-registry")]
    fn MPU_vQueueAddToRegistry => vQueueAddToRegistry(
        queue: Option<QueueHandle>,
        name: *const c_char,
    );
    #[cfg(feature = "queue-registry")]
    fn MPU_vQueueUnregisterQueue => vQueueUnregisterQueue(queue: Option<QueueHandle>);
    #[cfg(feature = "queue-registry")]
    fn MPU_pcQueueGetName => pcQueueGetName(queue: Option<QueueHandle>) -> *const c_char;
    fn MPU_vQueueDelete => vQueueDelete(queue: Option<QueueHandle>);

    // Timers.
    #[cfg(all(feature = "timers", feature = "dynamic-alloc"))]
    fn MPU_xTimerCreate => xTimerCreate(
        name: *const c_char,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
    ) -> Option<TimerHandle>;
    #[cfg(all(feature = "timers", feature = "static-alloc"))]
    fn MPU_xTimerCreateStatic => xTimerCreateStatic(
        name: *const c_char,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
        buffer: *mut StaticTimer,
    ) -> Option<TimerHandle>;
    #[cfg(feature = "timers")]
    fn MPU_pvTimerGetTimerID => pvTimerGetTimerID(timer: Option<TimerHandle>) -> *mut c_void;
    #[cfg(feature = "timers")]
    fn MPU_vTimerSetTimerID => vTimerSetTimerID(timer: Option<TimerHandle>, id: *mut c_void);
    #[cfg(feature = "timers")]
    fn MPU_xTimerIsTimerActive => xTimerIsTimerActive(timer: Option<TimerHandle>) -> BaseType;
    #[cfg(feature = "timers")]
    fn MPU_xTimerGetTimerDaemonTaskHandle => xTimerGetTimerDaemonTaskHandle() -> Option<TaskHandle>;
    #[cfg(feature = "timers")]
    fn MPU_xTimerPendFunctionCall => xTimerPendFunctionCall(
        function: PendedFunction,
        parameter1: *mut c_void,
        parameter2: u32,
        ticks: TickType,
    ) -> BaseType;
    #[cfg(feature = "timers")]
    fn MPU_vTimerSetReloadMode => vTimerSetReloadMode(
        timer: Option<TimerHandle>,
        auto_reload: UBaseType,
    );
    #[cfg(feature = "timers")]
    fn MPU_pcTimerGetName => pcTimerGetName(timer: Option<TimerHandle>) -> *const c_char;
    #[cfg(feature = "timers")]
    fn MPU_xTimerGetPeriod => xTimerGetPeriod(timer: Option<TimerHandle>) -> TickType;
    #[cfg(feature = "timers")]
    fn MPU_xTimerGetExpiryTime => xTimerGetExpiryTime(timer: Option<TimerHandle>) -> TickType;
    #[cfg(feature = "timers")]
    fn MPU_xTimerGenericCommand => xTimerGenericCommand(
        timer: Option<TimerHandle>,
        command: TimerCommand,
        optional_value: TickType,
        higher_priority_task_woken: *mut BaseType,
        ticks: TickType,
    ) -> BaseType;

    // Event groups.
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_xEventGroupCreate => xEventGroupCreate() -> Option<EventGroupHandle>;
    #[cfg(feature = "static-alloc")]
    fn MPU_xEventGroupCreateStatic => xEventGroupCreateStatic(
        buffer: *mut StaticEventGroup,
    ) -> Option<EventGroupHandle>;
    fn MPU_xEventGroupWaitBits => xEventGroupWaitBits(
        group: Option<EventGroupHandle>,
        bits_to_wait_for: EventBits,
        clear_on_exit: BaseType,
        wait_for_all_bits: BaseType,
        ticks: TickType,
    ) -> EventBits;
    fn MPU_xEventGroupClearBits => xEventGroupClearBits(
        group: Option<EventGroupHandle>,
        bits_to_clear: EventBits,
    ) -> EventBits;
    fn MPU_xEventGroupSetBits => xEventGroupSetBits(
        group: Option<EventGroupHandle>,
        bits_to_set: EventBits,
    ) -> EventBits;
    fn MPU_xEventGroupSync => xEventGroupSync(
        group: Option<EventGroupHandle>,
        bits_to_set: EventBits,
        bits_to_wait_for: EventBits,
        ticks: TickType,
    ) -> EventBits;
    fn MPU_vEventGroupDelete => vEventGroupDelete(group: Option<EventGroupHandle>);

    // Stream and message buffers.
    fn MPU_xStreamBufferSend => xStreamBufferSend(
        buffer: Option<StreamBufferHandle>,
        data: *const c_void,
        len: usize,
        ticks: TickType,
    ) -> usize;
    fn MPU_xStreamBufferReceive => xStreamBufferReceive(
        buffer: Option<StreamBufferHandle>,
        data: *mut c_void,
        len: usize,
        ticks: TickType,
    ) -> usize;
    fn MPU_xStreamBufferNextMessageLengthBytes => xStreamBufferNextMessageLengthBytes(
        buffer: Option<StreamBufferHandle>,
    ) -> usize;
    fn MPU_vStreamBufferDelete => vStreamBufferDelete(buffer: Option<StreamBufferHandle>);
    fn MPU_xStreamBufferIsFull => xStreamBufferIsFull(
        buffer: Option<StreamBufferHandle>,
    ) -> BaseType;
    fn MPU_xStreamBufferIsEmpty => xStreamBufferIsEmpty(
        buffer: Option<StreamBufferHandle>,
    ) -> BaseType;
    fn MPU_xStreamBufferReset => xStreamBufferReset(
        buffer: Option<StreamBufferHandle>,
    ) -> BaseType;
    fn MPU_xStreamBufferSpacesAvailable => xStreamBufferSpacesAvailable(
        buffer: Option<StreamBufferHandle>,
    ) -> usize;
    fn MPU_xStreamBufferBytesAvailable => xStreamBufferBytesAvailable(
        buffer: Option<StreamBufferHandle>,
    ) -> usize;
    fn MPU_xStreamBufferSetTriggerLevel => xStreamBufferSetTriggerLevel(
        buffer: Option<StreamBufferHandle>,
        trigger_level: usize,
    ) -> BaseType;
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_xStreamBufferGenericCreate => xStreamBufferGenericCreate(
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
    ) -> Option<StreamBufferHandle>;
    #[cfg(feature = "static-alloc")]
    fn MPU_xStreamBufferGenericCreateStatic => xStreamBufferGenericCreateStatic(
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
        storage: *mut u8,
        buffer: *mut StaticStreamBuffer,
    ) -> Option<StreamBufferHandle>;

    // Heap.
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_pvPortMalloc => pvPortMalloc(size: usize) -> *mut c_void;
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_vPortFree => vPortFree(block: *mut c_void);
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_vPortInitialiseBlocks => vPortInitialiseBlocks();
    #[cfg(feature = "dynamic-alloc")]
    fn MPU_xPortGetFreeHeapSize => xPortGetFreeHeapSize() -> usize;
}

extern "C" {
    fn xTaskGetTickCountFromISR() -> TickType;
}

/// The kernel, called directly. Every method must run in machine mode;
/// wrap it in [`Gated`] (or use [`KERNEL`]) to call it from a task.
#[derive(Copy, Clone, Debug, Default)]
pub struct FreeRtos;

/// The kernel as seen from a task at either privilege level.
pub static KERNEL: Gated<Hart, FreeRtos> = Gated::new(Hart, FreeRtos);

fn out<T>(r: Option<&mut T>) -> *mut T {
    r.map_or(core::ptr::null_mut(), |r| r as *mut T)
}

// Safety, for every block below: arguments are converted from references
// and slices, so pointers are valid for as long as the call needs them,
// and handles came from the kernel.

impl TaskApi for FreeRtos {
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
        unsafe {
            xTaskCreate(
                code,
                name.as_ptr(),
                stack_depth,
                parameters,
                priority,
                out(created),
            )
        }
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
        unsafe {
            xTaskCreateStatic(
                code,
                name.as_ptr(),
                stack.len() as u32,
                parameters,
                priority,
                stack.as_mut_ptr(),
                tcb,
            )
        }
    }

    #[cfg(feature = "dynamic-alloc")]
    unsafe fn task_create_restricted(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        unsafe { xTaskCreateRestricted(definition, out(created)) }
    }

    #[cfg(feature = "static-alloc")]
    unsafe fn task_create_restricted_static(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        unsafe { xTaskCreateRestrictedStatic(definition, out(created)) }
    }

    fn task_allocate_mpu_regions(
        &self,
        task: Option<TaskHandle>,
        regions: &[MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    ) {
        unsafe { vTaskAllocateMPURegions(task, regions.as_ptr()) }
    }

    fn task_delete(&self, task: Option<TaskHandle>) {
        unsafe { vTaskDelete(task) }
    }

    fn task_delay_until(&self, previous_wake: &mut TickType, increment: TickType) {
        unsafe { vTaskDelayUntil(previous_wake, increment) }
    }

    fn task_abort_delay(&self, task: TaskHandle) -> BaseType {
        unsafe { xTaskAbortDelay(Some(task)) }
    }

    fn task_delay(&self, ticks: TickType) {
        unsafe { vTaskDelay(ticks) }
    }

    fn task_priority_get(&self, task: Option<TaskHandle>) -> UBaseType {
        unsafe { uxTaskPriorityGet(task) }
    }

    fn task_priority_set(&self, task: Option<TaskHandle>, priority: UBaseType) {
        unsafe { vTaskPrioritySet(task, priority) }
    }

    fn task_get_state(&self, task: TaskHandle) -> TaskState {
        unsafe { eTaskGetState(Some(task)) }
    }

    #[cfg(feature = "trace-facility")]
    fn task_get_info(
        &self,
        task: Option<TaskHandle>,
        status: &mut TaskStatus,
        get_free_stack_space: BaseType,
        state: TaskState,
    ) {
        unsafe { vTaskGetInfo(task, status, get_free_stack_space, state) }
    }

    fn task_get_idle_task_handle(&self) -> Option<TaskHandle> {
        unsafe { xTaskGetIdleTaskHandle() }
    }

    fn task_suspend(&self, task: Option<TaskHandle>) {
        unsafe { vTaskSuspend(task) }
    }

    fn task_resume(&self, task: TaskHandle) {
        unsafe { vTaskResume(Some(task)) }
    }

    fn task_suspend_all(&self) {
        unsafe { vTaskSuspendAll() }
    }

    fn task_resume_all(&self) -> BaseType {
        unsafe { xTaskResumeAll() }
    }

    fn task_get_tick_count(&self) -> TickType {
        unsafe { xTaskGetTickCount() }
    }

    fn task_get_number_of_tasks(&self) -> UBaseType {
        unsafe { uxTaskGetNumberOfTasks() }
    }

    fn task_get_name(&self, task: Option<TaskHandle>) -> *const c_char {
        unsafe { pcTaskGetName(task) }
    }

    fn task_get_handle(&self, name: &CStr) -> Option<TaskHandle> {
        unsafe { xTaskGetHandle(name.as_ptr()) }
    }

    #[cfg(feature = "application-task-tag")]
    fn task_set_application_task_tag(
        &self,
        task: Option<TaskHandle>,
        tag: Option<TaskHookFunction>,
    ) {
        unsafe { vTaskSetApplicationTaskTag(task, tag) }
    }

    #[cfg(feature = "application-task-tag")]
    fn task_get_application_task_tag(
        &self,
        task: Option<TaskHandle>,
    ) -> Option<TaskHookFunction> {
        unsafe { xTaskGetApplicationTaskTag(task) }
    }

    #[cfg(feature = "application-task-tag")]
    fn task_call_application_task_hook(
        &self,
        task: Option<TaskHandle>,
        parameter: *mut c_void,
    ) -> BaseType {
        unsafe { xTaskCallApplicationTaskHook(task, parameter) }
    }

    #[cfg(feature = "thread-local-storage")]
    fn task_set_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
        value: *mut c_void,
    ) {
        unsafe { vTaskSetThreadLocalStoragePointer(task, index, value) }
    }

    #[cfg(feature = "thread-local-storage")]
    fn task_get_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
    ) -> *mut c_void {
        unsafe { pvTaskGetThreadLocalStoragePointer(task, index) }
    }

    #[cfg(feature = "trace-facility")]
    fn task_get_system_state(
        &self,
        statuses: &mut [TaskStatus],
        total_run_time: Option<&mut u32>,
    ) -> UBaseType {
        unsafe {
            uxTaskGetSystemState(
                statuses.as_mut_ptr(),
                statuses.len() as UBaseType,
                out(total_run_time),
            )
        }
    }

    fn task_catch_up_ticks(&self, ticks: TickType) -> BaseType {
        unsafe { xTaskCatchUpTicks(ticks) }
    }

    fn task_get_stack_high_water_mark(
        &self,
        task: Option<TaskHandle>,
    ) -> UBaseType {
        unsafe { uxTaskGetStackHighWaterMark(task) }
    }

    fn task_get_current_task_handle(&self) -> Option<TaskHandle> {
        unsafe { xTaskGetCurrentTaskHandle() }
    }

    fn task_get_scheduler_state(&self) -> BaseType {
        unsafe { xTaskGetSchedulerState() }
    }

    fn task_set_time_out_state(&self, timeout: &mut TimeOut) {
        unsafe { vTaskSetTimeOutState(timeout) }
    }

    fn task_check_for_time_out(
        &self,
        timeout: &mut TimeOut,
        ticks_to_wait: &mut TickType,
    ) -> BaseType {
        unsafe { xTaskCheckForTimeOut(timeout, ticks_to_wait) }
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
        unsafe {
            xTaskGenericNotify(
                Some(task),
                index,
                value,
                action as u32,
                out(previous_value),
            )
        }
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_wait(
        &self,
        clear_on_entry: u32,
        clear_on_exit: u32,
        value: Option<&mut u32>,
        ticks: TickType,
    ) -> BaseType {
        unsafe {
            xTaskNotifyWait(clear_on_entry, clear_on_exit, out(value), ticks)
        }
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_take(
        &self,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32 {
        unsafe { ulTaskNotifyTake(clear_count_on_exit, ticks) }
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_state_clear(&self, task: Option<TaskHandle>) -> BaseType {
        unsafe { xTaskNotifyStateClear(task) }
    }

    #[cfg(feature = "task-notifications")]
    fn task_generic_notify_take(
        &self,
        index: UBaseType,
        clear_count_on_exit: BaseType,
        ticks: TickType,
    ) -> u32 {
        unsafe { ulTaskGenericNotifyTake(index, clear_count_on_exit, ticks) }
    }

    #[cfg(all(feature = "trace-facility", feature = "dynamic-alloc"))]
    unsafe fn task_list(&self, buffer: &mut [u8]) {
        unsafe { vTaskList(buffer.as_mut_ptr().cast()) }
    }

    #[cfg(all(feature = "run-time-stats", feature = "dynamic-alloc"))]
    unsafe fn task_get_run_time_stats(&self, buffer: &mut [u8]) {
        unsafe { vTaskGetRunTimeStats(buffer.as_mut_ptr().cast()) }
    }

    #[cfg(feature = "run-time-stats")]
    fn task_get_idle_run_time_counter(&self) -> u32 {
        unsafe { ulTaskGetIdleRunTimeCounter() }
    }
}

impl QueueApi for FreeRtos {
    #[cfg(feature = "dynamic-alloc")]
    fn queue_generic_create(
        &self,
        length: UBaseType,
        item_size: UBaseType,
        kind: QueueType,
    ) -> Option<QueueHandle> {
        unsafe { xQueueGenericCreate(length, item_size, kind) }
    }

    #[cfg(feature = "static-alloc")]
    fn queue_generic_create_static(
        &self,
        length: UBaseType,
        item_size: UBaseType,
        storage: Option<&'static mut [u8]>,
        buffer: &'static mut StaticQueue,
        kind: QueueType,
    ) -> Option<QueueHandle> {
        let needed = (length as usize).checked_mul(item_size as usize)?;
        let storage = match storage {
            Some(s) if s.len() >= needed => s.as_mut_ptr(),
            Some(_) => return None,
            None if needed == 0 => core::ptr::null_mut(),
            None => return None,
        };
        unsafe {
            xQueueGenericCreateStatic(length, item_size, storage, buffer, kind)
        }
    }

    fn queue_generic_reset(&self, queue: QueueHandle, new_queue: BaseType)
        -> BaseType {
        unsafe { xQueueGenericReset(Some(queue), new_queue) }
    }

    unsafe fn queue_generic_send(
        &self,
        queue: QueueHandle,
        item: &[u8],
        ticks: TickType,
        position: CopyPosition,
    ) -> BaseType {
        unsafe {
            xQueueGenericSend(Some(queue), item.as_ptr().cast(), ticks, position)
        }
    }

    fn queue_messages_waiting(&self, queue: QueueHandle) -> UBaseType {
        unsafe { uxQueueMessagesWaiting(Some(queue)) }
    }

    fn queue_spaces_available(&self, queue: QueueHandle) -> UBaseType {
        unsafe { uxQueueSpacesAvailable(Some(queue)) }
    }

    unsafe fn queue_receive(
        &self,
        queue: QueueHandle,
        buffer: &mut [u8],
        ticks: TickType,
    ) -> BaseType {
        unsafe { xQueueReceive(Some(queue), buffer.as_mut_ptr().cast(), ticks) }
    }

    unsafe fn queue_peek(
        &self,
        queue: QueueHandle,
        buffer: &mut [u8],
        ticks: TickType,
    ) -> BaseType {
        unsafe { xQueuePeek(Some(queue), buffer.as_mut_ptr().cast(), ticks) }
    }

    fn queue_semaphore_take(&self, queue: QueueHandle, ticks: TickType)
        -> BaseType {
        unsafe { xQueueSemaphoreTake(Some(queue), ticks) }
    }

    #[cfg(feature = "mutexes")]
    fn queue_get_mutex_holder(&self, mutex: QueueHandle) -> Option<TaskHandle> {
        unsafe { xQueueGetMutexHolder(Some(mutex)) }
    }

    #[cfg(all(feature = "mutexes", feature = "dynamic-alloc"))]
    fn queue_create_mutex(&self, kind: QueueType) -> Option<QueueHandle> {
        unsafe { xQueueCreateMutex(kind) }
    }

    #[cfg(all(feature = "mutexes", feature = "static-alloc"))]
    fn queue_create_mutex_static(
        &self,
        kind: QueueType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle> {
        unsafe { xQueueCreateMutexStatic(kind, buffer) }
    }

    #[cfg(all(feature = "counting-semaphores", feature = "dynamic-alloc"))]
    fn queue_create_counting_semaphore(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
    ) -> Option<QueueHandle> {
        unsafe { xQueueCreateCountingSemaphore(max_count, initial_count) }
    }

    #[cfg(all(feature = "counting-semaphores", feature = "static-alloc"))]
    fn queue_create_counting_semaphore_static(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle> {
        unsafe {
            xQueueCreateCountingSemaphoreStatic(max_count, initial_count, buffer)
        }
    }

    #[cfg(feature = "recursive-mutexes")]
    fn queue_take_mutex_recursive(
        &self,
        mutex: QueueHandle,
        ticks: TickType,
    ) -> BaseType {
        unsafe { xQueueTakeMutexRecursive(Some(mutex), ticks) }
    }

    #[cfg(feature = "recursive-mutexes")]
    fn queue_give_mutex_recursive(&self, mutex: QueueHandle) -> BaseType {
        unsafe { xQueueGiveMutexRecursive(Some(mutex)) }
    }

    #[cfg(all(feature = "queue-sets", feature = "dynamic-alloc"))]
    fn queue_create_set(&self, event_queue_length: UBaseType)
        -> Option<QueueSetHandle> {
        unsafe { xQueueCreateSet(event_queue_length) }
    }

    #[cfg(feature = "queue-sets")]
    fn queue_select_from_set(
        &self,
        set: QueueSetHandle,
        ticks: TickType,
    ) -> Option<QueueSetMemberHandle> {
        unsafe { xQueueSelectFromSet(Some(set), ticks) }
    }

    #[cfg(feature = "queue-sets")]
    fn queue_add_to_set(
        &self,
        member: QueueSetMemberHandle,
        set: QueueSetHandle,
    ) -> BaseType {
        unsafe { xQueueAddToSet(Some(member), Some(set)) }
    }

    #[cfg(feature = "queue-sets")]
    fn queue_remove_from_set(
        &self,
        member: QueueSetMemberHandle,
        set: QueueSetHandle,
    ) -> BaseType {
        unsafe { xQueueRemoveFromSet(Some(member), Some(set)) }
    }

    #[cfg(feature = "queue-registry")]
    fn queue_add_to_registry(&self, queue: QueueHandle, name: &'static CStr) {
        unsafe { vQueueAddToRegistry(Some(queue), name.as_ptr()) }
    }

    #[cfg(feature = "queue-registry")]
    fn queue_unregister_queue(&self, queue: QueueHandle) {
        unsafe { vQueueUnregisterQueue(Some(queue)) }
    }

    #[cfg(feature = "queue-registry")]
    fn queue_get_name(&self, queue: QueueHandle) -> *const c_char {
        unsafe { pcQueueGetName(Some(queue)) }
    }

    fn queue_delete(&self, queue: QueueHandle) {
        unsafe { vQueueDelete(Some(queue)) }
    }
}

#[cfg(feature = "timers")]
impl TimerApi for FreeRtos {
    #[cfg(feature = "dynamic-alloc")]
    fn timer_create(
        &self,
        name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
    ) -> Option<TimerHandle> {
        unsafe { xTimerCreate(name.as_ptr(), period, auto_reload, id, callback) }
    }

    #[cfg(feature = "static-alloc")]
    fn timer_create_static(
        &self,
        name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
        buffer: &'static mut StaticTimer,
    ) -> Option<TimerHandle> {
        unsafe {
            xTimerCreateStatic(
                name.as_ptr(),
                period,
                auto_reload,
                id,
                callback,
                buffer,
            )
        }
    }

    fn timer_get_timer_id(&self, timer: TimerHandle) -> *mut c_void {
        unsafe { pvTimerGetTimerID(Some(timer)) }
    }

    fn timer_set_timer_id(&self, timer: TimerHandle, id: *mut c_void) {
        unsafe { vTimerSetTimerID(Some(timer), id) }
    }

    fn timer_is_timer_active(&self, timer: TimerHandle) -> BaseType {
        unsafe { xTimerIsTimerActive(Some(timer)) }
    }

    fn timer_get_timer_daemon_task_handle(&self) -> Option<TaskHandle> {
        unsafe { xTimerGetTimerDaemonTaskHandle() }
    }

    fn timer_pend_function_call(
        &self,
        function: PendedFunction,
        parameter1: *mut c_void,
        parameter2: u32,
        ticks: TickType,
    ) -> BaseType {
        unsafe { xTimerPendFunctionCall(function, parameter1, parameter2, ticks) }
    }

    fn timer_set_reload_mode(&self, timer: TimerHandle, auto_reload: UBaseType) {
        unsafe { vTimerSetReloadMode(Some(timer), auto_reload) }
    }

    fn timer_get_name(&self, timer: TimerHandle) -> *const c_char {
        unsafe { pcTimerGetName(Some(timer)) }
    }

    fn timer_get_period(&self, timer: TimerHandle) -> TickType {
        unsafe { xTimerGetPeriod(Some(timer)) }
    }

    fn timer_get_expiry_time(&self, timer: TimerHandle) -> TickType {
        unsafe { xTimerGetExpiryTime(Some(timer)) }
    }

    fn timer_generic_command(
        &self,
        timer: TimerHandle,
        command: TimerCommand,
        optional_value: TickType,
        higher_priority_task_woken: Option<&mut BaseType>,
        ticks: TickType,
    ) -> BaseType {
        unsafe {
            xTimerGenericCommand(
                Some(timer),
                command,
                optional_value,
                out(higher_priority_task_woken),
                ticks,
            )
        }
    }

    fn timer_command_time(&self) -> TickType {
        unsafe { xTaskGetTickCount() }
    }
}

impl EventGroupApi for FreeRtos {
    #[cfg(feature = "dynamic-alloc")]
    fn event_group_create(&self) -> Option<EventGroupHandle> {
        unsafe { xEventGroupCreate() }
    }

    #[cfg(feature = "static-alloc")]
    fn event_group_create_static(
        &self,
        buffer: &'static mut StaticEventGroup,
    ) -> Option<EventGroupHandle> {
        unsafe { xEventGroupCreateStatic(buffer) }
    }

    fn event_group_wait_bits(
        &self,
        group: EventGroupHandle,
        bits_to_wait_for: EventBits,
        clear_on_exit: BaseType,
        wait_for_all_bits: BaseType,
        ticks: TickType,
    ) -> EventBits {
        unsafe {
            xEventGroupWaitBits(
                Some(group),
                bits_to_wait_for,
                clear_on_exit,
                wait_for_all_bits,
                ticks,
            )
        }
    }

    fn event_group_clear_bits(
        &self,
        group: EventGroupHandle,
        bits_to_clear: EventBits,
    ) -> EventBits {
        unsafe { xEventGroupClearBits(Some(group), bits_to_clear) }
    }

    fn event_group_set_bits(
        &self,
        group: EventGroupHandle,
        bits_to_set: EventBits,
    ) -> EventBits {
        unsafe { xEventGroupSetBits(Some(group), bits_to_set) }
    }

    fn event_group_sync(
        &self,
        group: EventGroupHandle,
        bits_to_set: EventBits,
        bits_to_wait_for: EventBits,
        ticks: TickType,
    ) -> EventBits {
        unsafe {
            xEventGroupSync(Some(group), bits_to_set, bits_to_wait_for, ticks)
        }
    }

    fn event_group_delete(&self, group: EventGroupHandle) {
        unsafe { vEventGroupDelete(Some(group)) }
    }
}

impl StreamBufferApi for FreeRtos {
    fn stream_buffer_send(
        &self,
        buffer: StreamBufferHandle,
        data: &[u8],
        ticks: TickType,
    ) -> usize {
        unsafe {
            xStreamBufferSend(Some(buffer), data.as_ptr().cast(), data.len(), ticks)
        }
    }

    fn stream_buffer_receive(
        &self,
        buffer: StreamBufferHandle,
        data: &mut [u8],
        ticks: TickType,
    ) -> usize {
        unsafe {
            xStreamBufferReceive(
                Some(buffer),
                data.as_mut_ptr().cast(),
                data.len(),
                ticks,
            )
        }
    }

    fn stream_buffer_next_message_length_bytes(
        &self,
        buffer: StreamBufferHandle,
    ) -> usize {
        unsafe { xStreamBufferNextMessageLengthBytes(Some(buffer)) }
    }

    fn stream_buffer_delete(&self, buffer: StreamBufferHandle) {
        unsafe { vStreamBufferDelete(Some(buffer)) }
    }

    fn stream_buffer_is_full(&self, buffer: StreamBufferHandle) -> BaseType {
        unsafe { xStreamBufferIsFull(Some(buffer)) }
    }

    fn stream_buffer_is_empty(&self, buffer: StreamBufferHandle) -> BaseType {
        unsafe { xStreamBufferIsEmpty(Some(buffer)) }
    }

    fn stream_buffer_reset(&self, buffer: StreamBufferHandle) -> BaseType {
        unsafe { xStreamBufferReset(Some(buffer)) }
    }

    fn stream_buffer_spaces_available(&self, buffer: StreamBufferHandle)
        -> usize {
        unsafe { xStreamBufferSpacesAvailable(Some(buffer)) }
    }

    fn stream_buffer_bytes_available(&self, buffer: StreamBufferHandle)
        -> usize {
        unsafe { xStreamBufferBytesAvailable(Some(buffer)) }
    }

    fn stream_buffer_set_trigger_level(
        &self,
        buffer: StreamBufferHandle,
        trigger_level: usize,
    ) -> BaseType {
        unsafe { xStreamBufferSetTriggerLevel(Some(buffer), trigger_level) }
    }

    #[cfg(feature = "dynamic-alloc")]
    fn stream_buffer_generic_create(
        &self,
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
    ) -> Option<StreamBufferHandle> {
        unsafe {
            xStreamBufferGenericCreate(size, trigger_level, is_message_buffer)
        }
    }

    #[cfg(feature = "static-alloc")]
    fn stream_buffer_generic_create_static(
        &self,
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
        storage: &'static mut [u8],
        buffer: &'static mut StaticStreamBuffer,
    ) -> Option<StreamBufferHandle> {
        // The kernel keeps one byte free to tell full from empty.
        if storage.len() < size.checked_add(1)? {
            return None;
        }
        unsafe {
            xStreamBufferGenericCreateStatic(
                size,
                trigger_level,
                is_message_buffer,
                storage.as_mut_ptr(),
                buffer,
            )
        }
    }
}

impl HeapApi for FreeRtos {
    #[cfg(feature = "dynamic-alloc")]
    fn port_malloc(&self, size: usize) -> *mut c_void {
        unsafe { pvPortMalloc(size) }
    }

    #[cfg(feature = "dynamic-alloc")]
    unsafe fn port_free(&self, block: *mut c_void) {
        unsafe { vPortFree(block) }
    }

    #[cfg(feature = "dynamic-alloc")]
    fn port_initialise_blocks(&self) {
        unsafe { vPortInitialiseBlocks() }
    }

    #[cfg(feature = "dynamic-alloc")]
    fn port_get_free_heap_size(&self) -> usize {
        unsafe { xPortGetFreeHeapSize() }
    }
}

//
// Trap side.
//

/// Called by the trap vector for `ecall`, with the cause from `a7` and the
/// arguments from `a0..a3`. The return value goes back in `a0`.
#[no_mangle]
pub extern "C" fn ecall_entry(cause: u32, a0: u32, a1: u32, a2: u32, a3: u32) -> u32 {
    ecall::dispatch(cause, [a0, a1, a2, a3])
}

#[no_mangle]
pub extern "C" fn _isr_default() -> ! {
    ecall::default_isr()
}

/// Entry in [`_ecall_vector`].
pub type EcallHandler = extern "C" fn() -> u32;

/// Exports the machine-side service for each cause, and the table of them
/// that the trap dispatcher indexes with `a7`. Entries must be listed in
/// cause order.
macro_rules! ecall_vector {
    ($($cause:ident => $service:ident),* $(,)?) => {
        $(
            #[no_mangle]
            pub extern "C" fn $service() -> u32 {
                ecall::service(EcallCause::$cause)
            }
        )*

        const VECTOR_CAUSES: &[EcallCause] = &[$(EcallCause::$cause),*];

        #[no_mangle]
        pub static _ecall_vector: [EcallHandler; NB_ECALL] = [$($service),*];
    };
}

ecall_vector! {
    Default => _ecall_default,
    ProcId => _procid,
    ClusterId => _clusterid,
    RaisePriv => _raise_priv,
    ResetPriv => _reset_priv,
}

const fn in_cause_order(causes: &[EcallCause]) -> bool {
    let mut i = 0;
    while i < causes.len() {
        if causes[i] as usize != i {
            return false;
        }
        i += 1;
    }
    true
}

static_assertions::const_assert_eq!(VECTOR_CAUSES.len(), NB_ECALL);
static_assertions::const_assert!(in_cause_order(VECTOR_CAUSES));

#[no_mangle]
pub extern "C" fn _ill_insn_print(mepc: u32) -> ! {
    ecall::illegal_instruction(mepc)
}

#[no_mangle]
pub extern "C" fn procid() -> u32 {
    ecall::procid()
}

#[no_mangle]
pub extern "C" fn clusterid() -> u32 {
    ecall::clusterid()
}

#[no_mangle]
pub extern "C" fn raise_priv() -> u32 {
    ecall::raise_priv()
}

#[no_mangle]
pub extern "C" fn reset_priv() -> u32 {
    ecall::reset_priv()
}

static QUANTUM: StaticCell<QuantumGate> = StaticCell::new(QuantumGate::new(
    match NonZeroU32::new(kconfig::PREEMPTION_QUANTUM) {
        Some(q) => q,
        None => panic!("preemption quantum must be nonzero"),
    },
));

/// Called from the tick handler with the kernel's own verdict on whether to
/// switch context. Returns the verdict to act on.
#[no_mangle]
pub extern "C" fn uTaskCheckQuantum(schedule: u32) -> u32 {
    // Safety: reading the tick count has no preconditions in an ISR.
    let tick = unsafe { xTaskGetTickCountFromISR() };
    QUANTUM.borrow_mut().check(tick, schedule)
}
