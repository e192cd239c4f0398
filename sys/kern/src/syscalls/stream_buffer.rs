// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stream and message buffers.

use gap_abi::{BaseType, StreamBufferHandle, TickType};
#[cfg(feature = "static-alloc")]
use gap_abi::StaticStreamBuffer;

use super::Gated;
use crate::privilege::PrivilegeContext;

/// Unlike queues, stream buffers are told how long the caller's buffer is,
/// so these are all safe to call.
pub trait StreamBufferApi {
    fn stream_buffer_send(
        &self,
        buffer: StreamBufferHandle,
        data: &[u8],
        ticks: TickType,
    ) -> usize;

    fn stream_buffer_receive(
        &self,
        buffer: StreamBufferHandle,
        data: &mut [u8],
        ticks: TickType,
    ) -> usize;

    fn stream_buffer_next_message_length_bytes(
        &self,
        buffer: StreamBufferHandle,
    ) -> usize;
    fn stream_buffer_delete(&self, buffer: StreamBufferHandle);
    fn stream_buffer_is_full(&self, buffer: StreamBufferHandle) -> BaseType;
    fn stream_buffer_is_empty(&self, buffer: StreamBufferHandle) -> BaseType;
    fn stream_buffer_reset(&self, buffer: StreamBufferHandle) -> BaseType;
    fn stream_buffer_spaces_available(&self, buffer: StreamBufferHandle)
        -> usize;
    fn stream_buffer_bytes_available(&self, buffer: StreamBufferHandle)
        -> usize;
    fn stream_buffer_set_trigger_level(
        &self,
        buffer: StreamBufferHandle,
        trigger_level: usize,
    ) -> BaseType;

    #[cfg(feature = "dynamic-alloc")]
    fn stream_buffer_generic_create(
        &self,
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
    ) -> Option<StreamBufferHandle>;

    /// `storage` must hold at least `size + 1` bytes; a kernel binding
    /// refuses shorter storage rather than letting the kernel overrun it.
    #[cfg(feature = "static-alloc")]
    fn stream_buffer_generic_create_static(
        &self,
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
        storage: &'static mut [u8],
        buffer: &'static mut StaticStreamBuffer,
    ) -> Option<StreamBufferHandle>;
}

impl<P: PrivilegeContext, K: StreamBufferApi> StreamBufferApi for Gated<P, K> {
    fn stream_buffer_send(
        &self,
        buffer: StreamBufferHandle,
        data: &[u8],
        ticks: TickType,
    ) -> usize {
        self.gate(|k| k.stream_buffer_send(buffer, data, ticks))
    }

    fn stream_buffer_receive(
        &self,
        buffer: StreamBufferHandle,
        data: &mut [u8],
        ticks: TickType,
    ) -> usize {
        self.gate(|k| k.stream_buffer_receive(buffer, data, ticks))
    }

    fn stream_buffer_next_message_length_bytes(
        &self,
        buffer: StreamBufferHandle,
    ) -> usize {
        self.gate(|k| k.stream_buffer_next_message_length_bytes(buffer))
    }

    fn stream_buffer_delete(&self, buffer: StreamBufferHandle) {
        self.gate(|k| k.stream_buffer_delete(buffer))
    }

    fn stream_buffer_is_full(&self, buffer: StreamBufferHandle) -> BaseType {
        self.gate(|k| k.stream_buffer_is_full(buffer))
    }

    fn stream_buffer_is_empty(&self, buffer: StreamBufferHandle) -> BaseType {
        self.gate(|k| k.stream_buffer_is_empty(buffer))
    }

    fn stream_buffer_reset(&self, buffer: StreamBufferHandle) -> BaseType {
        self.gate(|k| k.stream_buffer_reset(buffer))
    }

    fn stream_buffer_spaces_available(
        &self,
        buffer: StreamBufferHandle,
    ) -> usize {
        self.gate(|k| k.stream_buffer_spaces_available(buffer))
    }

    fn stream_buffer_bytes_available(
        &self,
        buffer: StreamBufferHandle,
    ) -> usize {
        self.gate(|k| k.stream_buffer_bytes_available(buffer))
    }

    fn stream_buffer_set_trigger_level(
        &self,
        buffer: StreamBufferHandle,
        trigger_level: usize,
    ) -> BaseType {
        self.gate(|k| k.stream_buffer_set_trigger_level(buffer, trigger_level))
    }

    #[cfg(feature = "dynamic-alloc")]
    fn stream_buffer_generic_create(
        &self,
        size: usize,
        trigger_level: usize,
        is_message_buffer: BaseType,
    ) -> Option<StreamBufferHandle> {
        self.gate(|k| {
            k.stream_buffer_generic_create(size, trigger_level, is_message_buffer)
        })
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
        self.gate(|k| {
            k.stream_buffer_generic_create_static(
                size,
                trigger_level,
                is_message_buffer,
                storage,
                buffer,
            )
        })
    }
}
