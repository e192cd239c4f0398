// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UDMA channel allocation.
//!
//! The UDMA has three kinds of transfer channel: linear, 2D and FIFO. Each
//! kind is a fixed set of hardware channels, and a peripheral driver has to
//! own one before it can start a transfer. This crate keeps one pool per
//! kind and hands channels out first-fit: the lowest free id always wins.
//!
//! Linear channel 0 and 2D channel 0 are reserved by the hardware and are
//! never handed out.
//!
//! There are two layers. [`ChannelPool`] and [`Channels`] are plain owned
//! values with no global state. The free functions ([`lin_alloc`] and
//! friends) operate on one process-wide [`Channels`] and speak the driver
//! convention: ids are `i32`, and [`NO_CHANNEL`] means there wasn't one.
//!
//! The process-wide instance is in a `StaticCell`, so overlapping access
//! panics rather than racing. Drivers are expected to open and close from
//! one hart, outside interrupt context.

#![cfg_attr(not(test), no_std)]

use ringbuf::{ringbuf, ringbuf_entry};
use static_cell::StaticCell;

/// Platform constants generated from the application config by `build.rs`.
pub mod config {
    include!(concat!(env!("OUT_DIR"), "/udma_config.rs"));
}

use config::*;

/// Returned by the allocation functions when a pool is exhausted. Passing it
/// to a free function does nothing.
pub const NO_CHANNEL: i32 = -1;

const WORD_BITS: u32 = u32::BITS;

const fn split(id: u32) -> (usize, u32) {
    ((id / WORD_BITS) as usize, 1 << (id % WORD_BITS))
}

/// A set of channels numbered from zero, `32 * WORDS` at most.
///
/// A set bit in `free` is a channel that can be handed out. `present` marks
/// which channels exist at all, so that freeing an id the pool never owned
/// (out of range, or reserved) cannot make it allocatable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelPool<const WORDS: usize> {
    free: [u32; WORDS],
    present: [u32; WORDS],
}

impl<const WORDS: usize> ChannelPool<WORDS> {
    pub const CAPACITY: u32 = WORDS as u32 * WORD_BITS;

    /// A pool of `count` channels, all free. Channels beyond
    /// [`Self::CAPACITY`] are dropped.
    pub const fn new(count: u32) -> Self {
        let mut present = [0; WORDS];
        let mut w = 0;
        while w < WORDS {
            let start = w as u32 * WORD_BITS;
            present[w] = if count >= start + WORD_BITS {
                u32::MAX
            } else if count > start {
                (1 << (count - start)) - 1
            } else {
                0
            };
            w += 1;
        }
        Self {
            free: present,
            present,
        }
    }

    /// Removes `id` from the pool for good.
    pub const fn reserved(mut self, id: u32) -> Self {
        let (w, bit) = split(id);
        if w < WORDS {
            self.present[w] &= !bit;
            self.free[w] &= !bit;
        }
        self
    }

    /// Takes the lowest-numbered free channel.
    pub fn alloc(&mut self) -> Option<u32> {
        for (w, word) in self.free.iter_mut().enumerate() {
            if *word != 0 {
                let bit = word.trailing_zeros();
                *word &= !(1 << bit);
                return Some(w as u32 * WORD_BITS + bit);
            }
        }
        None
    }

    /// Returns `id` to the pool. Freeing a channel that is already free, or
    /// that the pool does not own, changes nothing.
    pub fn free(&mut self, id: u32) {
        let (w, bit) = split(id);
        if w < WORDS {
            self.free[w] |= bit & self.present[w];
        }
    }

    pub fn is_free(&self, id: u32) -> bool {
        let (w, bit) = split(id);
        w < WORDS && self.free[w] & bit != 0
    }

    /// Number of channels that can still be allocated.
    pub fn available(&self) -> u32 {
        self.free.iter().map(|w| w.count_ones()).sum()
    }

    /// The raw free mask, one bit per channel.
    pub fn words(&self) -> &[u32; WORDS] {
        &self.free
    }
}

/// The three UDMA pools, sized from the platform config.
///
/// 2D and FIFO ids are global: the first 2D channel is
/// [`CHAN_2D_BASE`](config::CHAN_2D_BASE), the first FIFO channel is
/// [`FIFO_BASE`](config::FIFO_BASE). Linear ids start at zero.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Channels {
    lin: ChannelPool<LIN_WORDS>,
    chan_2d: ChannelPool<1>,
    fifo: ChannelPool<1>,
}

impl Channels {
    pub const fn new() -> Self {
        Self {
            lin: ChannelPool::new(LIN_CHANNELS).reserved(0),
            chan_2d: ChannelPool::new(CHAN_2D).reserved(0),
            fifo: ChannelPool::new(FIFO_CHANNELS),
        }
    }

    pub fn lin_alloc(&mut self) -> Option<u32> {
        self.lin.alloc()
    }

    pub fn lin_free(&mut self, id: u32) {
        self.lin.free(id)
    }

    pub fn chan_2d_alloc(&mut self) -> Option<u32> {
        self.chan_2d.alloc().map(|i| i + CHAN_2D_BASE)
    }

    pub fn chan_2d_free(&mut self, id: u32) {
        if let Some(i) = id.checked_sub(CHAN_2D_BASE) {
            self.chan_2d.free(i);
        }
    }

    pub fn fifo_alloc(&mut self) -> Option<u32> {
        self.fifo.alloc().map(|i| i + FIFO_BASE)
    }

    pub fn fifo_free(&mut self, id: u32) {
        if let Some(i) = id.checked_sub(FIFO_BASE) {
            self.fifo.free(i);
        }
    }

    pub fn lin(&self) -> &ChannelPool<LIN_WORDS> {
        &self.lin
    }

    pub fn chan_2d(&self) -> &ChannelPool<1> {
        &self.chan_2d
    }

    pub fn fifo(&self) -> &ChannelPool<1> {
        &self.fifo
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Pool {
    Linear,
    TwoD,
    Fifo,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Trace {
    None,
    Init,
    Alloc(Pool, u32),
    Free(Pool, u32),
    Exhausted(Pool),
}

ringbuf!(Trace, 16, Trace::None);

static CHANNELS: StaticCell<Channels> = StaticCell::new(Channels::new());

/// Puts every pool back in its boot state. Call once, before any driver
/// opens.
pub fn channels_init() {
    *CHANNELS.borrow_mut() = Channels::new();
    ringbuf_entry!(Trace::Init);
}

fn granted(pool: Pool, id: Option<u32>) -> i32 {
    match id {
        Some(id) => {
            ringbuf_entry!(Trace::Alloc(pool, id));
            // build.rs keeps every id below i32::MAX.
            id as i32
        }
        None => {
            ringbuf_entry!(Trace::Exhausted(pool));
            NO_CHANNEL
        }
    }
}

fn released(pool: Pool, id: i32, free: impl FnOnce(&mut Channels, u32)) {
    // NO_CHANNEL, or any other negative id, names no channel.
    let Ok(id) = u32::try_from(id) else {
        return;
    };
    ringbuf_entry!(Trace::Free(pool, id));
    free(&mut *CHANNELS.borrow_mut(), id);
}

pub fn lin_alloc() -> i32 {
    granted(Pool::Linear, CHANNELS.borrow_mut().lin_alloc())
}

pub fn lin_free(id: i32) {
    released(Pool::Linear, id, Channels::lin_free)
}

pub fn chan_2d_alloc() -> i32 {
    granted(Pool::TwoD, CHANNELS.borrow_mut().chan_2d_alloc())
}

pub fn chan_2d_free(id: i32) {
    released(Pool::TwoD, id, Channels::chan_2d_free)
}

pub fn fifo_alloc() -> i32 {
    granted(Pool::Fifo, CHANNELS.borrow_mut().fifo_alloc())
}

pub fn fifo_free(id: i32) {
    released(Pool::Fifo, id, Channels::fifo_free)
}

const fn addrgen(base: u32, stride: u32, index: u32) -> u32 {
    base.wrapping_add(index.wrapping_mul(stride))
}

/// Address of the register block of linear channel `id`.
pub const fn lin_addr(id: u32) -> u32 {
    addrgen(LIN_ADDRGEN_BASE, LIN_ADDRGEN_STRIDE, id)
}

/// Address of the register block of 2D channel `id`, where `id` is the
/// global id [`chan_2d_alloc`] hands out.
pub const fn chan_2d_addr(id: u32) -> u32 {
    addrgen(
        CHAN_2D_ADDRGEN_BASE,
        CHAN_2D_ADDRGEN_STRIDE,
        id.wrapping_sub(CHAN_2D_BASE),
    )
}

/// Address of the register block of FIFO channel `id`, a global id as
/// [`fifo_alloc`] hands out.
pub const fn fifo_addr(id: u32) -> u32 {
    addrgen(FIFO_ADDRGEN_BASE, FIFO_ADDRGEN_STRIDE, id.wrapping_sub(FIFO_BASE))
}
