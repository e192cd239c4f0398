// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! C-layout types of the FreeRTOS kernel API as built for the GAP port.
//!
//! Handles are non-null pointers to kernel-owned objects; anywhere the C API
//! can hand back or accept `NULL`, the Rust side uses `Option<Handle>`, which
//! has the same representation.

use core::ffi::{c_char, c_void};
use core::ptr::NonNull;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::MpuRule;

include!(concat!(env!("OUT_DIR"), "/static_sizes.rs"));

pub type BaseType = i32;
pub type UBaseType = u32;
pub type TickType = u32;
pub type EventBits = u32;
pub type StackType = u32;

pub const PD_TRUE: BaseType = 1;
pub const PD_FALSE: BaseType = 0;
pub const PD_PASS: BaseType = PD_TRUE;
pub const PD_FAIL: BaseType = PD_FALSE;

/// Returned by create calls that could not get memory.
pub const ERR_COULD_NOT_ALLOCATE_REQUIRED_MEMORY: BaseType = -1;
pub const ERR_QUEUE_FULL: BaseType = 0;
pub const ERR_QUEUE_EMPTY: BaseType = 0;

pub const MAX_DELAY: TickType = TickType::MAX;

/// Number of MPU regions a restricted task can describe in its
/// [`TaskParameters`]; the stack region is implicit.
pub const NUM_CONFIGURABLE_REGIONS: usize = 4;

macro_rules! handle {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        #[repr(transparent)]
        pub struct $name(NonNull<c_void>);

        impl $name {
            /// Wraps a kernel pointer. Returns `None` for null.
            pub fn from_ptr(p: *mut c_void) -> Option<Self> {
                NonNull::new(p).map(Self)
            }

            /// Fabricates a handle from an address. Host tests use this to
            /// make distinguishable handles without a kernel behind them.
            pub fn from_addr(addr: usize) -> Option<Self> {
                Self::from_ptr(addr as *mut c_void)
            }

            pub fn as_ptr(self) -> *mut c_void {
                self.0.as_ptr()
            }
        }
    };
}

handle!(TaskHandle);
handle!(QueueHandle);
handle!(
    /// A queue set is a queue under the hood, but the API keeps them apart.
    QueueSetHandle
);
handle!(
    /// Either a queue or a semaphore that belongs to a queue set.
    QueueSetMemberHandle
);
handle!(TimerHandle);
handle!(EventGroupHandle);
handle!(
    /// Also used for message buffers.
    StreamBufferHandle
);

pub type TaskFunction = unsafe extern "C" fn(*mut c_void);
pub type TaskHookFunction = unsafe extern "C" fn(*mut c_void) -> BaseType;
pub type TimerCallback = unsafe extern "C" fn(TimerHandle);
pub type PendedFunction = unsafe extern "C" fn(*mut c_void, u32);

/// `eTaskState`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub enum TaskState {
    Running = 0,
    Ready,
    Blocked,
    Suspended,
    Deleted,
    Invalid,
}

/// `eNotifyAction`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub enum NotifyAction {
    NoAction = 0,
    SetBits,
    Increment,
    SetValueWithOverwrite,
    SetValueWithoutOverwrite,
}

/// `xTaskGetSchedulerState` results.
pub const SCHEDULER_SUSPENDED: BaseType = 0;
pub const SCHEDULER_NOT_STARTED: BaseType = 1;
pub const SCHEDULER_RUNNING: BaseType = 2;

/// Flavor of object passed to the generic queue constructors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct QueueType(pub u8);

impl QueueType {
    pub const BASE: Self = Self(0);
    pub const MUTEX: Self = Self(1);
    pub const COUNTING_SEMAPHORE: Self = Self(2);
    pub const BINARY_SEMAPHORE: Self = Self(3);
    pub const RECURSIVE_MUTEX: Self = Self(4);
}

/// Where `xQueueGenericSend` puts the item.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct CopyPosition(pub BaseType);

impl CopyPosition {
    pub const SEND_TO_BACK: Self = Self(0);
    pub const SEND_TO_FRONT: Self = Self(1);
    pub const OVERWRITE: Self = Self(2);
}

/// Command numbers understood by `xTimerGenericCommand` from task context.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(transparent)]
pub struct TimerCommand(pub BaseType);

impl TimerCommand {
    pub const START: Self = Self(1);
    pub const RESET: Self = Self(2);
    pub const STOP: Self = Self(3);
    pub const CHANGE_PERIOD: Self = Self(4);
    pub const DELETE: Self = Self(5);
}

/// `TimeOut_t`.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Eq,
    PartialEq,
    IntoBytes,
    FromBytes,
    Immutable,
    KnownLayout,
)]
#[repr(C)]
pub struct TimeOut {
    pub overflow_count: BaseType,
    pub time_on_entering: TickType,
}

/// `TaskStatus_t`, as filled in by `vTaskGetInfo` and
/// `uxTaskGetSystemState`.
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct TaskStatus {
    pub handle: Option<TaskHandle>,
    pub name: *const c_char,
    pub number: UBaseType,
    pub current_state: TaskState,
    pub current_priority: UBaseType,
    pub base_priority: UBaseType,
    pub run_time_counter: u32,
    pub stack_base: *mut StackType,
    pub stack_high_water_mark: u16,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self {
            handle: None,
            name: core::ptr::null(),
            number: 0,
            current_state: TaskState::Invalid,
            current_priority: 0,
            base_priority: 0,
            run_time_counter: 0,
            stack_base: core::ptr::null_mut(),
            stack_high_water_mark: 0,
        }
    }
}

/// `MemoryRegion_t`: one caller-described MPU region of a restricted task.
///
/// A zero-length region is an unused slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(C)]
pub struct MemoryRegion {
    pub base_address: *mut c_void,
    pub length_in_bytes: u32,
    pub parameters: MpuRule,
}

impl MemoryRegion {
    pub const UNUSED: Self = Self {
        base_address: core::ptr::null_mut(),
        length_in_bytes: 0,
        parameters: MpuRule(0),
    };
}

/// `TaskParameters_t`: everything needed to create a restricted task.
///
/// The kernel keeps pointers into the stack buffer, the task buffer and the
/// name; none of them are copied.
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct TaskParameters {
    pub code: TaskFunction,
    pub name: *const c_char,
    pub stack_depth: u16,
    pub parameters: *mut c_void,
    pub priority: UBaseType,
    pub stack_buffer: *mut StackType,
    pub regions: [MemoryRegion; NUM_CONFIGURABLE_REGIONS],
    /// Only read by the static constructor; null otherwise.
    pub task_buffer: *mut StaticTask,
}

macro_rules! static_buffer {
    ($(#[$m:meta])* $name:ident, $words:expr) => {
        $(#[$m])*
        #[derive(Debug)]
        #[repr(C, align(4))]
        pub struct $name([u32; $words]);

        impl $name {
            pub const fn new() -> Self {
                Self([0; $words])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

static_buffer!(
    /// Storage for a statically allocated task control block.
    StaticTask,
    STATIC_TASK_WORDS
);
static_buffer!(StaticQueue, STATIC_QUEUE_WORDS);
static_buffer!(StaticTimer, STATIC_TIMER_WORDS);
static_buffer!(StaticEventGroup, STATIC_EVENT_GROUP_WORDS);
static_buffer!(StaticStreamBuffer, STATIC_STREAM_BUFFER_WORDS);
