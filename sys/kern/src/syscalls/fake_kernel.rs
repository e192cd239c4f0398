// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A kernel that lives in a few `RefCell`s, for host tests.
//!
//! Every call records its name and the hart's privilege level at the time,
//! so tests can check both what was forwarded and that it ran raised. All
//! objects of a kind share one state (one queue, one event group, one
//! stream buffer) regardless of handle; tasks are told apart by address.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ffi::{c_char, c_void, CStr};
use std::fmt::Debug;

use gap_abi::*;

#[cfg(feature = "timers")]
use super::TimerApi;
#[cfg(feature = "task-notifications")]
use super::DEFAULT_NOTIFY_INDEX;
use super::{
    EventGroupApi, Gated, HeapApi, QueueApi, StreamBufferApi, TaskApi,
};
use crate::arch;
use crate::privilege::Hart;

/// Builds a handle of whatever kind the caller needs.
pub trait FakeHandle: Sized {
    fn from_addr(addr: usize) -> Option<Self>;
}

macro_rules! fake_handle {
    ($($t:ty),* $(,)?) => {
        $(impl FakeHandle for $t {
            fn from_addr(addr: usize) -> Option<Self> {
                <$t>::from_addr(addr)
            }
        })*
    };
}

fake_handle!(
    TaskHandle,
    QueueHandle,
    QueueSetHandle,
    QueueSetMemberHandle,
    TimerHandle,
    EventGroupHandle,
    StreamBufferHandle,
);

pub fn handle<H: FakeHandle>(addr: usize) -> H {
    H::from_addr(addr).expect("handle address must be nonzero")
}

/// Runs `gated` against a fresh gated fake at user level and again at
/// machine level, and `direct` against an ungated fake. All three must
/// return the same thing and make the same kernel calls, and the caller's
/// level must come back unchanged. From user level each kernel call costs
/// one raise and one reset; from machine level, none.
pub fn both_levels<R: PartialEq + Debug>(
    gated: impl Fn(&Gated<Hart, FakeKernel>) -> R,
    direct: impl Fn(&FakeKernel) -> R,
) {
    let k = FakeKernel::default();
    let expected = direct(&k);
    let expected_calls = k.calls();
    assert!(!expected_calls.is_empty(), "nothing reached the kernel");

    for privileged in [false, true] {
        arch::set_privileged(privileged);
        let g = Gated::new(Hart, FakeKernel::default());
        let before = arch::ecall_count();
        let got = gated(&g);
        let ecalls = arch::ecall_count() - before;

        assert_eq!(got, expected, "privileged caller: {privileged}");
        assert_eq!(g.kernel().calls(), expected_calls);
        assert_eq!(arch::is_privileged(), privileged);
        assert!(g.kernel().all_privileged(), "{:?}", g.kernel().calls());
        let cycles = if privileged { 0 } else { 2 * expected_calls.len() };
        assert_eq!(ecalls as usize, cycles, "privileged caller: {privileged}");
    }
}

/// [`both_levels`] with one body for both the gated and the direct kernel.
macro_rules! transparent {
    (|$k:ident| $body:expr) => {
        $crate::syscalls::fake_kernel::both_levels(|$k| $body, |$k| $body)
    };
}

pub(crate) use transparent;

const QUEUE_LENGTH: usize = 8;
const STREAM_CAPACITY: usize = 16;
const HEAP_SIZE: usize = 4096;

#[derive(Default)]
#[cfg_attr(not(feature = "timers"), allow(dead_code))]
struct State {
    priorities: BTreeMap<usize, UBaseType>,
    suspended: BTreeSet<usize>,
    regions: Option<[MemoryRegion; NUM_CONFIGURABLE_REGIONS]>,
    restricted: Option<TaskParameters>,
    notify: BTreeMap<UBaseType, u32>,
    tags: BTreeMap<usize, TaskHookFunction>,
    tls: BTreeMap<(usize, BaseType), usize>,

    queue: VecDeque<Vec<u8>>,
    queue_name: Option<&'static CStr>,

    bits: EventBits,
    stream: VecDeque<u8>,
    allocations: Vec<Box<[u8]>>,

    timer_active: bool,
    timer_period: Option<TickType>,
    timer_id: usize,
    timer_auto_reload: UBaseType,
    last_timer_command: Option<(TimerCommand, TickType)>,
}

pub struct FakeKernel {
    log: RefCell<Vec<(&'static str, bool)>>,
    state: RefCell<State>,
    create_result: Cell<BaseType>,
    write_handle: Cell<bool>,
}

impl Default for FakeKernel {
    fn default() -> Self {
        Self {
            log: RefCell::default(),
            state: RefCell::default(),
            create_result: Cell::new(PD_PASS),
            write_handle: Cell::new(true),
        }
    }
}

fn key(task: Option<TaskHandle>) -> usize {
    task.map_or(0, |t| t.as_ptr() as usize)
}

/// Copies `text` into `buffer` and NUL-terminates it, truncating to fit.
#[cfg(all(
    feature = "dynamic-alloc",
    any(feature = "trace-facility", feature = "run-time-stats"),
))]
fn write_text(buffer: &mut [u8], text: &[u8]) {
    let Some(room) = buffer.len().checked_sub(1) else {
        return;
    };
    let n = text.len().min(room);
    buffer[..n].copy_from_slice(&text[..n]);
    buffer[n] = 0;
}

fn flag(b: bool) -> BaseType {
    if b {
        PD_TRUE
    } else {
        PD_FALSE
    }
}

impl FakeKernel {
    pub const TICK_COUNT: TickType = 1234;
    pub const DEFAULT_PERIOD: TickType = 100;

    fn record(&self, name: &'static str) {
        self.log.borrow_mut().push((name, arch::is_privileged()));
    }

    /// Names of the calls made so far, in order.
    pub fn calls(&self) -> Vec<&'static str> {
        self.log.borrow().iter().map(|(n, _)| *n).collect()
    }

    pub fn all_privileged(&self) -> bool {
        self.log.borrow().iter().all(|(_, p)| *p)
    }

    /// Makes restricted task creation return `code`. Anything other than
    /// `PD_PASS` leaves the created handle untouched.
    pub fn with_create_result(self, code: BaseType) -> Self {
        self.create_result.set(code);
        self
    }

    /// Makes restricted task creation report success without writing a
    /// handle back.
    pub fn without_handle(self) -> Self {
        self.write_handle.set(false);
        self
    }

    pub fn last_restricted(&self) -> Option<TaskParameters> {
        self.state.borrow().restricted
    }

    pub fn allocated_regions(
        &self,
    ) -> Option<[MemoryRegion; NUM_CONFIGURABLE_REGIONS]> {
        self.state.borrow().regions
    }

    pub fn last_timer_command(&self) -> Option<(TimerCommand, TickType)> {
        self.state.borrow().last_timer_command
    }

    #[cfg(feature = "task-notifications")]
    fn take(&self, index: UBaseType, clear_count_on_exit: BaseType) -> u32 {
        let mut s = self.state.borrow_mut();
        let slot = s.notify.entry(index).or_default();
        let count = *slot;
        if clear_count_on_exit != PD_FALSE {
            *slot = 0;
        } else {
            *slot = slot.saturating_sub(1);
        }
        count
    }

    fn create_restricted(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        let code = self.create_result.get();
        self.state.borrow_mut().restricted = Some(*definition);
        if code == PD_PASS && self.write_handle.get() {
            if let Some(created) = created {
                *created = TaskHandle::from_ptr(definition.stack_buffer.cast());
            }
        }
        code
    }
}

impl TaskApi for FakeKernel {
    #[cfg(feature = "dynamic-alloc")]
    fn task_create(
        &self,
        _code: TaskFunction,
        _name: &CStr,
        _stack_depth: u16,
        _parameters: *mut c_void,
        _priority: UBaseType,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        self.record("task_create");
        if let Some(created) = created {
            *created = Some(handle(0x1000));
        }
        PD_PASS
    }

    #[cfg(feature = "static-alloc")]
    fn task_create_static(
        &self,
        _code: TaskFunction,
        _name: &CStr,
        _parameters: *mut c_void,
        _priority: UBaseType,
        _stack: &'static mut [StackType],
        tcb: &'static mut StaticTask,
    ) -> Option<TaskHandle> {
        self.record("task_create_static");
        TaskHandle::from_ptr((tcb as *mut StaticTask).cast())
    }

    #[cfg(feature = "dynamic-alloc")]
    unsafe fn task_create_restricted(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        self.record("task_create_restricted");
        self.create_restricted(definition, created)
    }

    #[cfg(feature = "static-alloc")]
    unsafe fn task_create_restricted_static(
        &self,
        definition: &TaskParameters,
        created: Option<&mut Option<TaskHandle>>,
    ) -> BaseType {
        self.record("task_create_restricted_static");
        if definition.task_buffer.is_null() {
            return ERR_COULD_NOT_ALLOCATE_REQUIRED_MEMORY;
        }
        self.create_restricted(definition, created)
    }

    fn task_allocate_mpu_regions(
        &self,
        _task: Option<TaskHandle>,
        regions: &[MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    ) {
        self.record("task_allocate_mpu_regions");
        self.state.borrow_mut().regions = Some(*regions);
    }

    fn task_delete(&self, task: Option<TaskHandle>) {
        self.record("task_delete");
        let mut s = self.state.borrow_mut();
        s.priorities.remove(&key(task));
        s.suspended.remove(&key(task));
    }

    fn task_delay_until(&self, previous_wake: &mut TickType, increment: TickType) {
        self.record("task_delay_until");
        *previous_wake = previous_wake.wrapping_add(increment);
    }

    fn task_abort_delay(&self, _task: TaskHandle) -> BaseType {
        self.record("task_abort_delay");
        PD_FAIL
    }

    fn task_delay(&self, _ticks: TickType) {
        self.record("task_delay");
    }

    fn task_priority_get(&self, task: Option<TaskHandle>) -> UBaseType {
        self.record("task_priority_get");
        self.state
            .borrow()
            .priorities
            .get(&key(task))
            .copied()
            .unwrap_or(1)
    }

    fn task_priority_set(&self, task: Option<TaskHandle>, priority: UBaseType) {
        self.record("task_priority_set");
        self.state.borrow_mut().priorities.insert(key(task), priority);
    }

    fn task_get_state(&self, task: TaskHandle) -> TaskState {
        self.record("task_get_state");
        if self.state.borrow().suspended.contains(&key(Some(task))) {
            TaskState::Suspended
        } else {
            TaskState::Ready
        }
    }

    #[cfg(feature = "trace-facility")]
    fn task_get_info(
        &self,
        task: Option<TaskHandle>,
        status: &mut TaskStatus,
        _get_free_stack_space: BaseType,
        state: TaskState,
    ) {
        self.record("task_get_info");
        status.handle = task;
        status.current_state = state;
    }

    fn task_get_idle_task_handle(&self) -> Option<TaskHandle> {
        self.record("task_get_idle_task_handle");
        Some(handle(0x1))
    }

    fn task_suspend(&self, task: Option<TaskHandle>) {
        self.record("task_suspend");
        self.state.borrow_mut().suspended.insert(key(task));
    }

    fn task_resume(&self, task: TaskHandle) {
        self.record("task_resume");
        self.state.borrow_mut().suspended.remove(&key(Some(task)));
    }

    fn task_suspend_all(&self) {
        self.record("task_suspend_all");
    }

    fn task_resume_all(&self) -> BaseType {
        self.record("task_resume_all");
        PD_FALSE
    }

    fn task_get_tick_count(&self) -> TickType {
        self.record("task_get_tick_count");
        Self::TICK_COUNT
    }

    fn task_get_number_of_tasks(&self) -> UBaseType {
        self.record("task_get_number_of_tasks");
        3
    }

    fn task_get_name(&self, _task: Option<TaskHandle>) -> *const c_char {
        self.record("task_get_name");
        c"fake".as_ptr()
    }

    fn task_get_handle(&self, name: &CStr) -> Option<TaskHandle> {
        self.record("task_get_handle");
        (name == c"IDLE").then(|| handle(0x1))
    }

    #[cfg(feature = "application-task-tag")]
    fn task_set_application_task_tag(
        &self,
        task: Option<TaskHandle>,
        tag: Option<TaskHookFunction>,
    ) {
        self.record("task_set_application_task_tag");
        let mut s = self.state.borrow_mut();
        match tag {
            Some(tag) => s.tags.insert(key(task), tag),
            None => s.tags.remove(&key(task)),
        };
    }

    #[cfg(feature = "application-task-tag")]
    fn task_get_application_task_tag(
        &self,
        task: Option<TaskHandle>,
    ) -> Option<TaskHookFunction> {
        self.record("task_get_application_task_tag");
        self.state.borrow().tags.get(&key(task)).copied()
    }

    #[cfg(feature = "application-task-tag")]
    fn task_call_application_task_hook(
        &self,
        task: Option<TaskHandle>,
        parameter: *mut c_void,
    ) -> BaseType {
        self.record("task_call_application_task_hook");
        let tag = self.state.borrow().tags.get(&key(task)).copied();
        match tag {
            // Safety: tests only register hooks that accept any parameter.
            Some(tag) => unsafe { tag(parameter) },
            None => PD_FAIL,
        }
    }

    #[cfg(feature = "thread-local-storage")]
    fn task_set_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
        value: *mut c_void,
    ) {
        self.record("task_set_thread_local_storage_pointer");
        self.state
            .borrow_mut()
            .tls
            .insert((key(task), index), value as usize);
    }

    #[cfg(feature = "thread-local-storage")]
    fn task_get_thread_local_storage_pointer(
        &self,
        task: Option<TaskHandle>,
        index: BaseType,
    ) -> *mut c_void {
        self.record("task_get_thread_local_storage_pointer");
        self.state
            .borrow()
            .tls
            .get(&(key(task), index))
            .map_or(std::ptr::null_mut(), |&p| p as *mut c_void)
    }

    #[cfg(feature = "trace-facility")]
    fn task_get_system_state(
        &self,
        statuses: &mut [TaskStatus],
        total_run_time: Option<&mut u32>,
    ) -> UBaseType {
        self.record("task_get_system_state");
        let n = statuses.len().min(3);
        for (i, s) in statuses[..n].iter_mut().enumerate() {
            s.handle = Some(handle(0x10 * (i + 1)));
            s.number = i as UBaseType;
            s.current_state = TaskState::Ready;
        }
        if let Some(t) = total_run_time {
            *t = Self::TICK_COUNT;
        }
        n as UBaseType
    }

    fn task_catch_up_ticks(&self, _ticks: TickType) -> BaseType {
        self.record("task_catch_up_ticks");
        PD_FALSE
    }

    fn task_get_stack_high_water_mark(
        &self,
        _task: Option<TaskHandle>,
    ) -> UBaseType {
        self.record("task_get_stack_high_water_mark");
        64
    }

    fn task_get_current_task_handle(&self) -> Option<TaskHandle> {
        self.record("task_get_current_task_handle");
        Some(handle(0x10))
    }

    fn task_get_scheduler_state(&self) -> BaseType {
        self.record("task_get_scheduler_state");
        SCHEDULER_RUNNING
    }

    fn task_set_time_out_state(&self, timeout: &mut TimeOut) {
        self.record("task_set_time_out_state");
        timeout.overflow_count = 0;
        timeout.time_on_entering = Self::TICK_COUNT - 20;
    }

    fn task_check_for_time_out(
        &self,
        timeout: &mut TimeOut,
        ticks_to_wait: &mut TickType,
    ) -> BaseType {
        self.record("task_check_for_time_out");
        if *ticks_to_wait == MAX_DELAY {
            return PD_FALSE;
        }
        let elapsed = Self::TICK_COUNT.wrapping_sub(timeout.time_on_entering);
        if elapsed >= *ticks_to_wait {
            *ticks_to_wait = 0;
            PD_TRUE
        } else {
            *ticks_to_wait -= elapsed;
            timeout.time_on_entering = Self::TICK_COUNT;
            PD_FALSE
        }
    }

    #[cfg(feature = "task-notifications")]
    fn task_generic_notify(
        &self,
        _task: TaskHandle,
        index: UBaseType,
        value: u32,
        action: NotifyAction,
        previous_value: Option<&mut u32>,
    ) -> BaseType {
        self.record("task_generic_notify");
        let mut s = self.state.borrow_mut();
        let slot = s.notify.entry(index).or_default();
        if let Some(p) = previous_value {
            *p = *slot;
        }
        match action {
            NotifyAction::NoAction => {}
            NotifyAction::SetBits => *slot |= value,
            NotifyAction::Increment => *slot = slot.wrapping_add(1),
            NotifyAction::SetValueWithOverwrite => *slot = value,
            NotifyAction::SetValueWithoutOverwrite => {
                if *slot != 0 {
                    return PD_FAIL;
                }
                *slot = value;
            }
        }
        PD_PASS
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_wait(
        &self,
        clear_on_entry: u32,
        clear_on_exit: u32,
        value: Option<&mut u32>,
        _ticks: TickType,
    ) -> BaseType {
        self.record("task_notify_wait");
        let mut s = self.state.borrow_mut();
        let slot = s.notify.entry(DEFAULT_NOTIFY_INDEX).or_default();
        let pending = *slot != 0;
        *slot &= !clear_on_entry;
        if let Some(v) = value {
            *v = *slot;
        }
        if pending {
            *slot &= !clear_on_exit;
        }
        flag(pending)
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_take(
        &self,
        clear_count_on_exit: BaseType,
        _ticks: TickType,
    ) -> u32 {
        self.record("task_notify_take");
        self.take(DEFAULT_NOTIFY_INDEX, clear_count_on_exit)
    }

    #[cfg(feature = "task-notifications")]
    fn task_notify_state_clear(&self, _task: Option<TaskHandle>) -> BaseType {
        self.record("task_notify_state_clear");
        let cleared = self.state.borrow_mut().notify.remove(&DEFAULT_NOTIFY_INDEX);
        flag(cleared.is_some())
    }

    #[cfg(feature = "task-notifications")]
    fn task_generic_notify_take(
        &self,
        index: UBaseType,
        clear_count_on_exit: BaseType,
        _ticks: TickType,
    ) -> u32 {
        self.record("task_generic_notify_take");
        self.take(index, clear_count_on_exit)
    }

    #[cfg(all(feature = "trace-facility", feature = "dynamic-alloc"))]
    unsafe fn task_list(&self, buffer: &mut [u8]) {
        self.record("task_list");
        write_text(buffer, b"IDLE\tR\t0\t64\t1\n");
    }

    #[cfg(all(feature = "run-time-stats", feature = "dynamic-alloc"))]
    unsafe fn task_get_run_time_stats(&self, buffer: &mut [u8]) {
        self.record("task_get_run_time_stats");
        write_text(buffer, b"IDLE\t1234\t100%\n");
    }

    #[cfg(feature = "run-time-stats")]
    fn task_get_idle_run_time_counter(&self) -> u32 {
        self.record("task_get_idle_run_time_counter");
        Self::TICK_COUNT
    }
}

impl QueueApi for FakeKernel {
    #[cfg(feature = "dynamic-alloc")]
    fn queue_generic_create(
        &self,
        length: UBaseType,
        _item_size: UBaseType,
        _kind: QueueType,
    ) -> Option<QueueHandle> {
        self.record("queue_generic_create");
        (length != 0).then(|| handle(0x2000))
    }

    #[cfg(feature = "static-alloc")]
    fn queue_generic_create_static(
        &self,
        length: UBaseType,
        item_size: UBaseType,
        storage: Option<&'static mut [u8]>,
        buffer: &'static mut StaticQueue,
        _kind: QueueType,
    ) -> Option<QueueHandle> {
        self.record("queue_generic_create_static");
        if length == 0 || (item_size != 0 && storage.is_none()) {
            return None;
        }
        QueueHandle::from_ptr((buffer as *mut StaticQueue).cast())
    }

    fn queue_generic_reset(&self, _queue: QueueHandle, _new_queue: BaseType)
        -> BaseType {
        self.record("queue_generic_reset");
        self.state.borrow_mut().queue.clear();
        PD_PASS
    }

    unsafe fn queue_generic_send(
        &self,
        _queue: QueueHandle,
        item: &[u8],
        _ticks: TickType,
        position: CopyPosition,
    ) -> BaseType {
        self.record("queue_generic_send");
        let mut s = self.state.borrow_mut();
        if position == CopyPosition::OVERWRITE {
            s.queue.clear();
        } else if s.queue.len() == QUEUE_LENGTH {
            return ERR_QUEUE_FULL;
        }
        if position == CopyPosition::SEND_TO_FRONT {
            s.queue.push_front(item.to_vec());
        } else {
            s.queue.push_back(item.to_vec());
        }
        PD_PASS
    }

    fn queue_messages_waiting(&self, _queue: QueueHandle) -> UBaseType {
        self.record("queue_messages_waiting");
        self.state.borrow().queue.len() as UBaseType
    }

    fn queue_spaces_available(&self, _queue: QueueHandle) -> UBaseType {
        self.record("queue_spaces_available");
        (QUEUE_LENGTH - self.state.borrow().queue.len()) as UBaseType
    }

    unsafe fn queue_receive(
        &self,
        _queue: QueueHandle,
        buffer: &mut [u8],
        _ticks: TickType,
    ) -> BaseType {
        self.record("queue_receive");
        match self.state.borrow_mut().queue.pop_front() {
            Some(item) => {
                let n = item.len().min(buffer.len());
                buffer[..n].copy_from_slice(&item[..n]);
                PD_PASS
            }
            None => ERR_QUEUE_EMPTY,
        }
    }

    unsafe fn queue_peek(
        &self,
        _queue: QueueHandle,
        buffer: &mut [u8],
        _ticks: TickType,
    ) -> BaseType {
        self.record("queue_peek");
        match self.state.borrow().queue.front() {
            Some(item) => {
                let n = item.len().min(buffer.len());
                buffer[..n].copy_from_slice(&item[..n]);
                PD_PASS
            }
            None => ERR_QUEUE_EMPTY,
        }
    }

    fn queue_semaphore_take(&self, _queue: QueueHandle, _ticks: TickType)
        -> BaseType {
        self.record("queue_semaphore_take");
        flag(self.state.borrow_mut().queue.pop_front().is_some())
    }

    #[cfg(feature = "mutexes")]
    fn queue_get_mutex_holder(&self, _mutex: QueueHandle) -> Option<TaskHandle> {
        self.record("queue_get_mutex_holder");
        None
    }

    #[cfg(all(feature = "mutexes", feature = "dynamic-alloc"))]
    fn queue_create_mutex(&self, _kind: QueueType) -> Option<QueueHandle> {
        self.record("queue_create_mutex");
        Some(handle(0x2100))
    }

    #[cfg(all(feature = "mutexes", feature = "static-alloc"))]
    fn queue_create_mutex_static(
        &self,
        _kind: QueueType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle> {
        self.record("queue_create_mutex_static");
        QueueHandle::from_ptr((buffer as *mut StaticQueue).cast())
    }

    #[cfg(all(feature = "counting-semaphores", feature = "dynamic-alloc"))]
    fn queue_create_counting_semaphore(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
    ) -> Option<QueueHandle> {
        self.record("queue_create_counting_semaphore");
        (max_count != 0 && initial_count <= max_count).then(|| handle(0x2200))
    }

    #[cfg(all(feature = "counting-semaphores", feature = "static-alloc"))]
    fn queue_create_counting_semaphore_static(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle> {
        self.record("queue_create_counting_semaphore_static");
        if max_count == 0 || initial_count > max_count {
            return None;
        }
        QueueHandle::from_ptr((buffer as *mut StaticQueue).cast())
    }

    #[cfg(feature = "recursive-mutexes")]
    fn queue_take_mutex_recursive(
        &self,
        _mutex: QueueHandle,
        _ticks: TickType,
    ) -> BaseType {
        self.record("queue_take_mutex_recursive");
        PD_PASS
    }

    #[cfg(feature = "recursive-mutexes")]
    fn queue_give_mutex_recursive(&self, _mutex: QueueHandle) -> BaseType {
        self.record("queue_give_mutex_recursive");
        PD_PASS
    }

    #[cfg(all(feature = "queue-sets", feature = "dynamic-alloc"))]
    fn queue_create_set(&self, event_queue_length: UBaseType)
        -> Option<QueueSetHandle> {
        self.record("queue_create_set");
        (event_queue_length != 0).then(|| handle(0x2300))
    }

    #[cfg(feature = "queue-sets")]
    fn queue_select_from_set(
        &self,
        _set: QueueSetHandle,
        _ticks: TickType,
    ) -> Option<QueueSetMemberHandle> {
        self.record("queue_select_from_set");
        None
    }

    #[cfg(feature = "queue-sets")]
    fn queue_add_to_set(
        &self,
        _member: QueueSetMemberHandle,
        _set: QueueSetHandle,
    ) -> BaseType {
        self.record("queue_add_to_set");
        PD_PASS
    }

    #[cfg(feature = "queue-sets")]
    fn queue_remove_from_set(
        &self,
        _member: QueueSetMemberHandle,
        _set: QueueSetHandle,
    ) -> BaseType {
        self.record("queue_remove_from_set");
        PD_PASS
    }

    #[cfg(feature = "queue-registry")]
    fn queue_add_to_registry(&self, _queue: QueueHandle, name: &'static CStr) {
        self.record("queue_add_to_registry");
        self.state.borrow_mut().queue_name = Some(name);
    }

    #[cfg(feature = "queue-registry")]
    fn queue_unregister_queue(&self, _queue: QueueHandle) {
        self.record("queue_unregister_queue");
        self.state.borrow_mut().queue_name = None;
    }

    #[cfg(feature = "queue-registry")]
    fn queue_get_name(&self, _queue: QueueHandle) -> *const c_char {
        self.record("queue_get_name");
        self.state
            .borrow()
            .queue_name
            .map_or(std::ptr::null(), CStr::as_ptr)
    }

    fn queue_delete(&self, _queue: QueueHandle) {
        self.record("queue_delete");
        self.state.borrow_mut().queue.clear();
    }
}

impl EventGroupApi for FakeKernel {
    #[cfg(feature = "dynamic-alloc")]
    fn event_group_create(&self) -> Option<EventGroupHandle> {
        self.record("event_group_create");
        Some(handle(0x3000))
    }

    #[cfg(feature = "static-alloc")]
    fn event_group_create_static(
        &self,
        buffer: &'static mut StaticEventGroup,
    ) -> Option<EventGroupHandle> {
        self.record("event_group_create_static");
        EventGroupHandle::from_ptr((buffer as *mut StaticEventGroup).cast())
    }

    fn event_group_wait_bits(
        &self,
        _group: EventGroupHandle,
        bits_to_wait_for: EventBits,
        clear_on_exit: BaseType,
        wait_for_all_bits: BaseType,
        _ticks: TickType,
    ) -> EventBits {
        self.record("event_group_wait_bits");
        let mut s = self.state.borrow_mut();
        let current = s.bits;
        let satisfied = if wait_for_all_bits != PD_FALSE {
            current & bits_to_wait_for == bits_to_wait_for
        } else {
            current & bits_to_wait_for != 0
        };
        if satisfied && clear_on_exit != PD_FALSE {
            s.bits &= !bits_to_wait_for;
        }
        current
    }

    fn event_group_clear_bits(
        &self,
        _group: EventGroupHandle,
        bits_to_clear: EventBits,
    ) -> EventBits {
        self.record("event_group_clear_bits");
        let mut s = self.state.borrow_mut();
        let before = s.bits;
        s.bits &= !bits_to_clear;
        before
    }

    fn event_group_set_bits(
        &self,
        _group: EventGroupHandle,
        bits_to_set: EventBits,
    ) -> EventBits {
        self.record("event_group_set_bits");
        let mut s = self.state.borrow_mut();
        s.bits |= bits_to_set;
        s.bits
    }

    fn event_group_sync(
        &self,
        _group: EventGroupHandle,
        bits_to_set: EventBits,
        bits_to_wait_for: EventBits,
        _ticks: TickType,
    ) -> EventBits {
        self.record("event_group_sync");
        let mut s = self.state.borrow_mut();
        s.bits |= bits_to_set;
        let current = s.bits;
        if current & bits_to_wait_for == bits_to_wait_for {
            s.bits &= !bits_to_wait_for;
        }
        current
    }

    fn event_group_delete(&self, _group: EventGroupHandle) {
        self.record("event_group_delete");
        self.state.borrow_mut().bits = 0;
    }
}

impl StreamBufferApi for FakeKernel {
    fn stream_buffer_send(
        &self,
        _buffer: StreamBufferHandle,
        data: &[u8],
        _ticks: TickType,
    ) -> usize {
        self.record("stream_buffer_send");
        let mut s = self.state.borrow_mut();
        let n = data.len().min(STREAM_CAPACITY - s.stream.len());
        s.stream.extend(&data[..n]);
        n
    }

    fn stream_buffer_receive(
        &self,
        _buffer: StreamBufferHandle,
        data: &mut [u8],
        _ticks: TickType,
    ) -> usize {
        self.record("stream_buffer_receive");
        let mut s = self.state.borrow_mut();
        let n = data.len().min(s.stream.len());
        for (dst, src) in data.iter_mut().zip(s.stream.drain(..n)) {
            *dst = src;
        }
        n
    }

    fn stream_buffer_next_message_length_bytes(
        &self,
        _buffer: StreamBufferHandle,
    ) -> usize {
        self.record("stream_buffer_next_message_length_bytes");
        self.state.borrow().stream.len()
    }

    fn stream_buffer_delete(&self, _buffer: StreamBufferHandle) {
        self.record("stream_buffer_delete");
        self.state.borrow_mut().stream.clear();
    }

    fn stream_buffer_is_full(&self, _buffer: StreamBufferHandle) -> BaseType {
        self.record("stream_buffer_is_full");
        flag(self.state.borrow().stream.len() == STREAM_CAPACITY)
    }

    fn stream_buffer_is_empty(&self, _buffer: StreamBufferHandle) -> BaseType {
        self.record("stream_buffer_is_empty");
        flag(self.state.borrow().stream.is_empty())
    }

    fn stream_buffer_reset(&self, _buffer: StreamBufferHandle) -> BaseType {
        self.record("stream_buffer_reset");
        self.state.borrow_mut().stream.clear();
        PD_PASS
    }

    fn stream_buffer_spaces_available(&self, _buffer: StreamBufferHandle)
        -> usize {
        self.record("stream_buffer_spaces_available");
        STREAM_CAPACITY - self.state.borrow().stream.len()
    }

    fn stream_buffer_bytes_available(&self, _buffer: StreamBufferHandle)
        -> usize {
        self.record("stream_buffer_bytes_available");
        self.state.borrow().stream.len()
    }

    fn stream_buffer_set_trigger_level(
        &self,
        _buffer: StreamBufferHandle,
        trigger_level: usize,
    ) -> BaseType {
        self.record("stream_buffer_set_trigger_level");
        flag(trigger_level <= STREAM_CAPACITY)
    }

    #[cfg(feature = "dynamic-alloc")]
    fn stream_buffer_generic_create(
        &self,
        size: usize,
        trigger_level: usize,
        _is_message_buffer: BaseType,
    ) -> Option<StreamBufferHandle> {
        self.record("stream_buffer_generic_create");
        (size != 0 && trigger_level <= size).then(|| handle(0x4000))
    }

    #[cfg(feature = "static-alloc")]
    fn stream_buffer_generic_create_static(
        &self,
        size: usize,
        _trigger_level: usize,
        _is_message_buffer: BaseType,
        storage: &'static mut [u8],
        buffer: &'static mut StaticStreamBuffer,
    ) -> Option<StreamBufferHandle> {
        self.record("stream_buffer_generic_create_static");
        if storage.len() < size + 1 {
            return None;
        }
        StreamBufferHandle::from_ptr((buffer as *mut StaticStreamBuffer).cast())
    }
}

impl HeapApi for FakeKernel {
    #[cfg(feature = "dynamic-alloc")]
    fn port_malloc(&self, size: usize) -> *mut c_void {
        self.record("port_malloc");
        let mut s = self.state.borrow_mut();
        let used: usize = s.allocations.iter().map(|a| a.len()).sum();
        if size == 0 || size > HEAP_SIZE - used {
            return std::ptr::null_mut();
        }
        let mut block = vec![0u8; size].into_boxed_slice();
        let p = block.as_mut_ptr().cast();
        s.allocations.push(block);
        p
    }

    #[cfg(feature = "dynamic-alloc")]
    unsafe fn port_free(&self, block: *mut c_void) {
        self.record("port_free");
        self.state
            .borrow_mut()
            .allocations
            .retain(|a| a.as_ptr() as *mut c_void != block);
    }

    #[cfg(feature = "dynamic-alloc")]
    fn port_initialise_blocks(&self) {
        self.record("port_initialise_blocks");
    }

    #[cfg(feature = "dynamic-alloc")]
    fn port_get_free_heap_size(&self) -> usize {
        self.record("port_get_free_heap_size");
        let used: usize =
            self.state.borrow().allocations.iter().map(|a| a.len()).sum();
        HEAP_SIZE - used
    }
}

#[cfg(feature = "timers")]
impl TimerApi for FakeKernel {
    #[cfg(feature = "dynamic-alloc")]
    fn timer_create(
        &self,
        _name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        _callback: TimerCallback,
    ) -> Option<TimerHandle> {
        self.record("timer_create");
        if period == 0 {
            return None;
        }
        let mut s = self.state.borrow_mut();
        s.timer_period = Some(period);
        s.timer_auto_reload = auto_reload;
        s.timer_id = id as usize;
        Some(handle(0x5000))
    }

    #[cfg(feature = "static-alloc")]
    fn timer_create_static(
        &self,
        _name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        _callback: TimerCallback,
        buffer: &'static mut StaticTimer,
    ) -> Option<TimerHandle> {
        self.record("timer_create_static");
        if period == 0 {
            return None;
        }
        let mut s = self.state.borrow_mut();
        s.timer_period = Some(period);
        s.timer_auto_reload = auto_reload;
        s.timer_id = id as usize;
        TimerHandle::from_ptr((buffer as *mut StaticTimer).cast())
    }

    fn timer_get_timer_id(&self, _timer: TimerHandle) -> *mut c_void {
        self.record("timer_get_timer_id");
        self.state.borrow().timer_id as *mut c_void
    }

    fn timer_set_timer_id(&self, _timer: TimerHandle, id: *mut c_void) {
        self.record("timer_set_timer_id");
        self.state.borrow_mut().timer_id = id as usize;
    }

    fn timer_is_timer_active(&self, _timer: TimerHandle) -> BaseType {
        self.record("timer_is_timer_active");
        flag(self.state.borrow().timer_active)
    }

    fn timer_get_timer_daemon_task_handle(&self) -> Option<TaskHandle> {
        self.record("timer_get_timer_daemon_task_handle");
        Some(handle(0x2))
    }

    fn timer_pend_function_call(
        &self,
        _function: PendedFunction,
        _parameter1: *mut c_void,
        _parameter2: u32,
        _ticks: TickType,
    ) -> BaseType {
        self.record("timer_pend_function_call");
        PD_PASS
    }

    fn timer_set_reload_mode(&self, _timer: TimerHandle, auto_reload: UBaseType) {
        self.record("timer_set_reload_mode");
        self.state.borrow_mut().timer_auto_reload = auto_reload;
    }

    fn timer_get_name(&self, _timer: TimerHandle) -> *const c_char {
        self.record("timer_get_name");
        c"fake-timer".as_ptr()
    }

    fn timer_get_period(&self, _timer: TimerHandle) -> TickType {
        self.record("timer_get_period");
        self.state.borrow().timer_period.unwrap_or(Self::DEFAULT_PERIOD)
    }

    fn timer_get_expiry_time(&self, _timer: TimerHandle) -> TickType {
        self.record("timer_get_expiry_time");
        let period =
            self.state.borrow().timer_period.unwrap_or(Self::DEFAULT_PERIOD);
        Self::TICK_COUNT.wrapping_add(period)
    }

    fn timer_generic_command(
        &self,
        _timer: TimerHandle,
        command: TimerCommand,
        optional_value: TickType,
        _higher_priority_task_woken: Option<&mut BaseType>,
        _ticks: TickType,
    ) -> BaseType {
        self.record("timer_generic_command");
        let mut s = self.state.borrow_mut();
        s.last_timer_command = Some((command, optional_value));
        match command {
            TimerCommand::START | TimerCommand::RESET => s.timer_active = true,
            TimerCommand::CHANGE_PERIOD => {
                s.timer_period = Some(optional_value);
                s.timer_active = true;
            }
            TimerCommand::STOP | TimerCommand::DELETE => {
                s.timer_active = false
            }
            _ => return PD_FAIL,
        }
        PD_PASS
    }

    fn timer_command_time(&self) -> TickType {
        Self::TICK_COUNT
    }
}
