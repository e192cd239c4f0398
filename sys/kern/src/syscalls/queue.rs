// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Queues, and the semaphores and mutexes built on them.

#[cfg(feature = "queue-registry")]
use core::ffi::{c_char, CStr};

use gap_abi::{BaseType, CopyPosition, QueueHandle, TickType, UBaseType};
#[cfg(feature = "mutexes")]
use gap_abi::TaskHandle;
#[cfg(any(feature = "dynamic-alloc", feature = "static-alloc"))]
use gap_abi::QueueType;
#[cfg(feature = "static-alloc")]
use gap_abi::StaticQueue;
#[cfg(feature = "queue-sets")]
use gap_abi::{QueueSetHandle, QueueSetMemberHandle};

use super::Gated;
use crate::privilege::PrivilegeContext;

pub trait QueueApi {
    #[cfg(feature = "dynamic-alloc")]
    fn queue_generic_create(
        &self,
        length: UBaseType,
        item_size: UBaseType,
        kind: QueueType,
    ) -> Option<QueueHandle>;

    /// `storage` may be `None` only when `item_size` is zero.
    #[cfg(feature = "static-alloc")]
    fn queue_generic_create_static(
        &self,
        length: UBaseType,
        item_size: UBaseType,
        storage: Option<&'static mut [u8]>,
        buffer: &'static mut StaticQueue,
        kind: QueueType,
    ) -> Option<QueueHandle>;

    fn queue_generic_reset(&self, queue: QueueHandle, new_queue: BaseType)
        -> BaseType;

    /// # Safety
    ///
    /// `item` must be at least as long as the queue's item size; the kernel
    /// copies that many bytes out of it. It may be empty for semaphores.
    unsafe fn queue_generic_send(
        &self,
        queue: QueueHandle,
        item: &[u8],
        ticks: TickType,
        position: CopyPosition,
    ) -> BaseType;

    fn queue_messages_waiting(&self, queue: QueueHandle) -> UBaseType;
    fn queue_spaces_available(&self, queue: QueueHandle) -> UBaseType;

    /// # Safety
    ///
    /// `buffer` must be at least as long as the queue's item size.
    unsafe fn queue_receive(
        &self,
        queue: QueueHandle,
        buffer: &mut [u8],
        ticks: TickType,
    ) -> BaseType;

    /// # Safety
    ///
    /// `buffer` must be at least as long as the queue's item size.
    unsafe fn queue_peek(
        &self,
        queue: QueueHandle,
        buffer: &mut [u8],
        ticks: TickType,
    ) -> BaseType;

    fn queue_semaphore_take(&self, queue: QueueHandle, ticks: TickType)
        -> BaseType;

    #[cfg(feature = "mutexes")]
    fn queue_get_mutex_holder(&self, mutex: QueueHandle) -> Option<TaskHandle>;

    #[cfg(all(feature = "mutexes", feature = "dynamic-alloc"))]
    fn queue_create_mutex(&self, kind: QueueType) -> Option<QueueHandle>;

    #[cfg(all(feature = "mutexes", feature = "static-alloc"))]
    fn queue_create_mutex_static(
        &self,
        kind: QueueType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle>;

    #[cfg(all(feature = "counting-semaphores", feature = "dynamic-alloc"))]
    fn queue_create_counting_semaphore(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
    ) -> Option<QueueHandle>;

    #[cfg(all(feature = "counting-semaphores", feature = "static-alloc"))]
    fn queue_create_counting_semaphore_static(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle>;

    #[cfg(feature = "recursive-mutexes")]
    fn queue_take_mutex_recursive(
        &self,
        mutex: QueueHandle,
        ticks: TickType,
    ) -> BaseType;

    #[cfg(feature = "recursive-mutexes")]
    fn queue_give_mutex_recursive(&self, mutex: QueueHandle) -> BaseType;

    #[cfg(all(feature = "queue-sets", feature = "dynamic-alloc"))]
    fn queue_create_set(&self, event_queue_length: UBaseType)
        -> Option<QueueSetHandle>;

    #[cfg(feature = "queue-sets")]
    fn queue_select_from_set(
        &self,
        set: QueueSetHandle,
        ticks: TickType,
    ) -> Option<QueueSetMemberHandle>;

    #[cfg(feature = "queue-sets")]
    fn queue_add_to_set(
        &self,
        member: QueueSetMemberHandle,
        set: QueueSetHandle,
    ) -> BaseType;

    #[cfg(feature = "queue-sets")]
    fn queue_remove_from_set(
        &self,
        member: QueueSetMemberHandle,
        set: QueueSetHandle,
    ) -> BaseType;

    /// The registry keeps `name`, it does not copy it.
    #[cfg(feature = "queue-registry")]
    fn queue_add_to_registry(&self, queue: QueueHandle, name: &'static CStr);

    #[cfg(feature = "queue-registry")]
    fn queue_unregister_queue(&self, queue: QueueHandle);

    #[cfg(feature = "queue-registry")]
    fn queue_get_name(&self, queue: QueueHandle) -> *const c_char;

    fn queue_delete(&self, queue: QueueHandle);

    /// `xQueueSend`: append to the back.
    ///
    /// # Safety
    ///
    /// As for [`QueueApi::queue_generic_send`].
    unsafe fn queue_send(
        &self,
        queue: QueueHandle,
        item: &[u8],
        ticks: TickType,
    ) -> BaseType {
        // Safety: forwarded from our caller.
        unsafe {
            self.queue_generic_send(queue, item, ticks, CopyPosition::SEND_TO_BACK)
        }
    }

    /// `xSemaphoreGive`.
    fn semaphore_give(&self, semaphore: QueueHandle) -> BaseType {
        // Safety: semaphores have a zero item size, so nothing is read from
        // the empty item.
        unsafe {
            self.queue_generic_send(semaphore, &[], 0, CopyPosition::SEND_TO_BACK)
        }
    }
}

impl<P: PrivilegeContext, K: QueueApi> QueueApi for Gated<P, K> {
    #[cfg(feature = "dynamic-alloc")]
    fn queue_generic_create(
        &self,
        length: UBaseType,
        item_size: UBaseType,
        kind: QueueType,
    ) -> Option<QueueHandle> {
        self.gate(|k| k.queue_generic_create(length, item_size, kind))
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
        self.gate(|k| {
            k.queue_generic_create_static(length, item_size, storage, buffer, kind)
        })
    }

    fn queue_generic_reset(
        &self,
        queue: QueueHandle,
        new_queue: BaseType,
    ) -> BaseType {
        self.gate(|k| k.queue_generic_reset(queue, new_queue))
    }

    unsafe fn queue_generic_send(
        &self,
        queue: QueueHandle,
        item: &[u8],
        ticks: TickType,
        position: CopyPosition,
    ) -> BaseType {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.queue_generic_send(queue, item, ticks, position) })
    }

    fn queue_messages_waiting(&self, queue: QueueHandle) -> UBaseType {
        self.gate(|k| k.queue_messages_waiting(queue))
    }

    fn queue_spaces_available(&self, queue: QueueHandle) -> UBaseType {
        self.gate(|k| k.queue_spaces_available(queue))
    }

    unsafe fn queue_receive(
        &self,
        queue: QueueHandle,
        buffer: &mut [u8],
        ticks: TickType,
    ) -> BaseType {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.queue_receive(queue, buffer, ticks) })
    }

    unsafe fn queue_peek(
        &self,
        queue: QueueHandle,
        buffer: &mut [u8],
        ticks: TickType,
    ) -> BaseType {
        // Safety: forwarded from our caller.
        self.gate(|k| unsafe { k.queue_peek(queue, buffer, ticks) })
    }

    fn queue_semaphore_take(
        &self,
        queue: QueueHandle,
        ticks: TickType,
    ) -> BaseType {
        self.gate(|k| k.queue_semaphore_take(queue, ticks))
    }

    #[cfg(feature = "mutexes")]
    fn queue_get_mutex_holder(&self, mutex: QueueHandle) -> Option<TaskHandle> {
        self.gate(|k| k.queue_get_mutex_holder(mutex))
    }

    #[cfg(all(feature = "mutexes", feature = "dynamic-alloc"))]
    fn queue_create_mutex(&self, kind: QueueType) -> Option<QueueHandle> {
        self.gate(|k| k.queue_create_mutex(kind))
    }

    #[cfg(all(feature = "mutexes", feature = "static-alloc"))]
    fn queue_create_mutex_static(
        &self,
        kind: QueueType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle> {
        self.gate(|k| k.queue_create_mutex_static(kind, buffer))
    }

    #[cfg(all(feature = "counting-semaphores", feature = "dynamic-alloc"))]
    fn queue_create_counting_semaphore(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
    ) -> Option<QueueHandle> {
        self.gate(|k| k.queue_create_counting_semaphore(max_count, initial_count))
    }

    #[cfg(all(feature = "counting-semaphores", feature = "static-alloc"))]
    fn queue_create_counting_semaphore_static(
        &self,
        max_count: UBaseType,
        initial_count: UBaseType,
        buffer: &'static mut StaticQueue,
    ) -> Option<QueueHandle> {
        self.gate(|k| {
            k.queue_create_counting_semaphore_static(
                max_count,
                initial_count,
                buffer,
            )
        })
    }

    #[cfg(feature = "recursive-mutexes")]
    fn queue_take_mutex_recursive(
        &self,
        mutex: QueueHandle,
        ticks: TickType,
    ) -> BaseType {
        self.gate(|k| k.queue_take_mutex_recursive(mutex, ticks))
    }

    #[cfg(feature = "recursive-mutexes")]
    fn queue_give_mutex_recursive(&self, mutex: QueueHandle) -> BaseType {
        self.gate(|k| k.queue_give_mutex_recursive(mutex))
    }

    #[cfg(all(feature = "queue-sets", feature = "dynamic-alloc"))]
    fn queue_create_set(
        &self,
        event_queue_length: UBaseType,
    ) -> Option<QueueSetHandle> {
        self.gate(|k| k.queue_create_set(event_queue_length))
    }

    #[cfg(feature = "queue-sets")]
    fn queue_select_from_set(
        &self,
        set: QueueSetHandle,
        ticks: TickType,
    ) -> Option<QueueSetMemberHandle> {
        self.gate(|k| k.queue_select_from_set(set, ticks))
    }

    #[cfg(feature = "queue-sets")]
    fn queue_add_to_set(
        &self,
        member: QueueSetMemberHandle,
        set: QueueSetHandle,
    ) -> BaseType {
        self.gate(|k| k.queue_add_to_set(member, set))
    }

    #[cfg(feature = "queue-sets")]
    fn queue_remove_from_set(
        &self,
        member: QueueSetMemberHandle,
        set: QueueSetHandle,
    ) -> BaseType {
        self.gate(|k| k.queue_remove_from_set(member, set))
    }

    #[cfg(feature = "queue-registry")]
    fn queue_add_to_registry(&self, queue: QueueHandle, name: &'static CStr) {
        self.gate(|k| k.queue_add_to_registry(queue, name))
    }

    #[cfg(feature = "queue-registry")]
    fn queue_unregister_queue(&self, queue: QueueHandle) {
        self.gate(|k| k.queue_unregister_queue(queue))
    }

    #[cfg(feature = "queue-registry")]
    fn queue_get_name(&self, queue: QueueHandle) -> *const c_char {
        self.gate(|k| k.queue_get_name(queue))
    }

    fn queue_delete(&self, queue: QueueHandle) {
        self.gate(|k| k.queue_delete(queue))
    }
}
