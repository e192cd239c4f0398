// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Preemption quantum.
//!
//! The tick handler asks the kernel whether a context switch is wanted on
//! every tick, but the port only lets one happen on ticks that are a multiple
//! of the configured quantum. Requests made in between are remembered, not
//! lost: a task that comes back from a delay on an off-quantum tick would
//! otherwise be descheduled and never looked at again until some unrelated
//! event.

use core::num::NonZeroU32;

/// Accumulates context-switch requests and releases them on quantum
/// boundaries.
#[derive(Debug)]
pub struct QuantumGate {
    quantum: NonZeroU32,
    pending: u32,
}

impl QuantumGate {
    pub const fn new(quantum: NonZeroU32) -> Self {
        Self {
            quantum,
            pending: 0,
        }
    }

    /// Folds `schedule` into the pending request and, if `tick` falls on a
    /// quantum boundary, returns and clears it. Otherwise returns zero.
    pub fn check(&mut self, tick: u32, schedule: u32) -> u32 {
        self.pending |= schedule;
        if tick % self.quantum == 0 {
            core::mem::take(&mut self.pending)
        } else {
            0
        }
    }
}
