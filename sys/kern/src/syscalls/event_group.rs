// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use gap_abi::{BaseType, EventBits, EventGroupHandle, TickType};
#[cfg(feature = "static-alloc")]
use gap_abi::StaticEventGroup;

use super::Gated;
use crate::privilege::PrivilegeContext;

pub trait EventGroupApi {
    #[cfg(feature = "dynamic-alloc")]
    fn event_group_create(&self) -> Option<EventGroupHandle>;

    #[cfg(feature = "static-alloc")]
    fn event_group_create_static(
        &self,
        buffer: &'static mut StaticEventGroup,
    ) -> Option<EventGroupHandle>;

    fn event_group_wait_bits(
        &self,
        group: EventGroupHandle,
        bits_to_wait_for: EventBits,
        clear_on_exit: BaseType,
        wait_for_all_bits: BaseType,
        ticks: TickType,
    ) -> EventBits;

    fn event_group_clear_bits(
        &self,
        group: EventGroupHandle,
        bits_to_clear: EventBits,
    ) -> EventBits;

    fn event_group_set_bits(
        &self,
        group: EventGroupHandle,
        bits_to_set: EventBits,
    ) -> EventBits;

    fn event_group_sync(
        &self,
        group: EventGroupHandle,
        bits_to_set: EventBits,
        bits_to_wait_for: EventBits,
        ticks: TickType,
    ) -> EventBits;

    fn event_group_delete(&self, group: EventGroupHandle);
}

impl<P: PrivilegeContext, K: EventGroupApi> EventGroupApi for Gated<P, K> {
    #[cfg(feature = "dynamic-alloc")]
    fn event_group_create(&self) -> Option<EventGroupHandle> {
        self.gate(|k| k.event_group_create())
    }

    #[cfg(feature = "static-alloc")]
    fn event_group_create_static(
        &self,
        buffer: &'static mut StaticEventGroup,
    ) -> Option<EventGroupHandle> {
        self.gate(|k| k.event_group_create_static(buffer))
    }

    fn event_group_wait_bits(
        &self,
        group: EventGroupHandle,
        bits_to_wait_for: EventBits,
        clear_on_exit: BaseType,
        wait_for_all_bits: BaseType,
        ticks: TickType,
    ) -> EventBits {
        self.gate(|k| {
            k.event_group_wait_bits(
                group,
                bits_to_wait_for,
                clear_on_exit,
                wait_for_all_bits,
                ticks,
            )
        })
    }

    fn event_group_clear_bits(
        &self,
        group: EventGroupHandle,
        bits_to_clear: EventBits,
    ) -> EventBits {
        self.gate(|k| k.event_group_clear_bits(group, bits_to_clear))
    }

    fn event_group_set_bits(
        &self,
        group: EventGroupHandle,
        bits_to_set: EventBits,
    ) -> EventBits {
        self.gate(|k| k.event_group_set_bits(group, bits_to_set))
    }

    fn event_group_sync(
        &self,
        group: EventGroupHandle,
        bits_to_set: EventBits,
        bits_to_wait_for: EventBits,
        ticks: TickType,
    ) -> EventBits {
        self.gate(|k| {
            k.event_group_sync(group, bits_to_set, bits_to_wait_for, ticks)
        })
    }

    fn event_group_delete(&self, group: EventGroupHandle) {
        self.gate(|k| k.event_group_delete(group))
    }
}
