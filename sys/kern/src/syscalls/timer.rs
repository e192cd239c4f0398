// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Software timers. Commands are queued to the timer daemon task, so even
//! "start" and "stop" only block for as long as it takes to post them.

use core::ffi::{c_char, c_void, CStr};

use gap_abi::{
    BaseType, PendedFunction, TaskHandle, TickType, TimerCommand,
    TimerHandle, UBaseType,
};
#[cfg(any(feature = "dynamic-alloc", feature = "static-alloc"))]
use gap_abi::TimerCallback;
#[cfg(feature = "static-alloc")]
use gap_abi::StaticTimer;

use super::Gated;
use crate::privilege::PrivilegeContext;

pub trait TimerApi {
    /// The kernel keeps `name`, it does not copy it.
    #[cfg(feature = "dynamic-alloc")]
    fn timer_create(
        &self,
        name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
    ) -> Option<TimerHandle>;

    #[cfg(feature = "static-alloc")]
    fn timer_create_static(
        &self,
        name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
        buffer: &'static mut StaticTimer,
    ) -> Option<TimerHandle>;

    fn timer_get_timer_id(&self, timer: TimerHandle) -> *mut c_void;
    fn timer_set_timer_id(&self, timer: TimerHandle, id: *mut c_void);
    fn timer_is_timer_active(&self, timer: TimerHandle) -> BaseType;
    fn timer_get_timer_daemon_task_handle(&self) -> Option<TaskHandle>;

    fn timer_pend_function_call(
        &self,
        function: PendedFunction,
        parameter1: *mut c_void,
        parameter2: u32,
        ticks: TickType,
    ) -> BaseType;

    fn timer_set_reload_mode(&self, timer: TimerHandle, auto_reload: UBaseType);
    fn timer_get_name(&self, timer: TimerHandle) -> *const c_char;
    fn timer_get_period(&self, timer: TimerHandle) -> TickType;
    fn timer_get_expiry_time(&self, timer: TimerHandle) -> TickType;

    fn timer_generic_command(
        &self,
        timer: TimerHandle,
        command: TimerCommand,
        optional_value: TickType,
        higher_priority_task_woken: Option<&mut BaseType>,
        ticks: TickType,
    ) -> BaseType;

    fn timer_start(&self, timer: TimerHandle, ticks: TickType) -> BaseType {
        let now = self.timer_command_time();
        self.timer_generic_command(timer, TimerCommand::START, now, None, ticks)
    }

    fn timer_reset(&self, timer: TimerHandle, ticks: TickType) -> BaseType {
        let now = self.timer_command_time();
        self.timer_generic_command(timer, TimerCommand::RESET, now, None, ticks)
    }

    fn timer_stop(&self, timer: TimerHandle, ticks: TickType) -> BaseType {
        self.timer_generic_command(timer, TimerCommand::STOP, 0, None, ticks)
    }

    fn timer_change_period(
        &self,
        timer: TimerHandle,
        period: TickType,
        ticks: TickType,
    ) -> BaseType {
        self.timer_generic_command(
            timer,
            TimerCommand::CHANGE_PERIOD,
            period,
            None,
            ticks,
        )
    }

    fn timer_delete(&self, timer: TimerHandle, ticks: TickType) -> BaseType {
        self.timer_generic_command(timer, TimerCommand::DELETE, 0, None, ticks)
    }

    /// Tick count stamped on start and reset commands, as the C macros do
    /// with `xTaskGetTickCount()`.
    fn timer_command_time(&self) -> TickType;
}

impl<P: PrivilegeContext, K: TimerApi> TimerApi for Gated<P, K> {
    #[cfg(feature = "dynamic-alloc")]
    fn timer_create(
        &self,
        name: &'static CStr,
        period: TickType,
        auto_reload: UBaseType,
        id: *mut c_void,
        callback: TimerCallback,
    ) -> Option<TimerHandle> {
        self.gate(|k| k.timer_create(name, period, auto_reload, id, callback))
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
        self.gate(|k| {
            k.timer_create_static(name, period, auto_reload, id, callback, buffer)
        })
    }

    fn timer_get_timer_id(&self, timer: TimerHandle) -> *mut c_void {
        self.gate(|k| k.timer_get_timer_id(timer))
    }

    fn timer_set_timer_id(&self, timer: TimerHandle, id: *mut c_void) {
        self.gate(|k| k.timer_set_timer_id(timer, id))
    }

    fn timer_is_timer_active(&self, timer: TimerHandle) -> BaseType {
        self.gate(|k| k.timer_is_timer_active(timer))
    }

    fn timer_get_timer_daemon_task_handle(&self) -> Option<TaskHandle> {
        self.gate(|k| k.timer_get_timer_daemon_task_handle())
    }

    fn timer_pend_function_call(
        &self,
        function: PendedFunction,
        parameter1: *mut c_void,
        parameter2: u32,
        ticks: TickType,
    ) -> BaseType {
        self.gate(|k| {
            k.timer_pend_function_call(function, parameter1, parameter2, ticks)
        })
    }

    fn timer_set_reload_mode(&self, timer: TimerHandle, auto_reload: UBaseType) {
        self.gate(|k| k.timer_set_reload_mode(timer, auto_reload))
    }

    fn timer_get_name(&self, timer: TimerHandle) -> *const c_char {
        self.gate(|k| k.timer_get_name(timer))
    }

    fn timer_get_period(&self, timer: TimerHandle) -> TickType {
        self.gate(|k| k.timer_get_period(timer))
    }

    fn timer_get_expiry_time(&self, timer: TimerHandle) -> TickType {
        self.gate(|k| k.timer_get_expiry_time(timer))
    }

    fn timer_generic_command(
        &self,
        timer: TimerHandle,
        command: TimerCommand,
        optional_value: TickType,
        higher_priority_task_woken: Option<&mut BaseType>,
        ticks: TickType,
    ) -> BaseType {
        self.gate(|k| {
            k.timer_generic_command(
                timer,
                command,
                optional_value,
                higher_priority_task_woken,
                ticks,
            )
        })
    }

    // Start and reset read the tick count and post the command inside a
    // single raised region.
    fn timer_start(&self, timer: TimerHandle, ticks: TickType) -> BaseType {
        self.gate(|k| k.timer_start(timer, ticks))
    }

    fn timer_reset(&self, timer: TimerHandle, ticks: TickType) -> BaseType {
        self.gate(|k| k.timer_reset(timer, ticks))
    }

    fn timer_command_time(&self) -> TickType {
        self.gate(|k| k.timer_command_time())
    }
}
