// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary contract shared by the GAP kernel port, its drivers and the
//! application tasks running on top of it.
//!
//! Nothing in here does anything. It names the numbers that cross a privilege
//! boundary: the ecall cause codes, the two `mstatus` patterns used to move
//! between user and machine mode, the layout of the hart identifier, and the
//! word the MPU consumes for each region.

#![cfg_attr(not(test), no_std)]

use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub mod rtos;

pub use rtos::*;

/// Number of entries in the ecall vector. Positions past this are treated as
/// the default (fatal) handler.
pub const NB_ECALL: usize = 5;

/// Exit code reported when the default trap handler fires.
pub const DEFAULT_ISR_EXIT: i32 = -197;

/// Exit code reported on an illegal instruction.
pub const ILLEGAL_INSN_EXIT: i32 = -199;

/// Cause code passed in `a7` when a task issues `ecall`.
///
/// The numeric values are the positions in the trap dispatcher's vector and
/// therefore part of the binary contract with the low-level trap entry code.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum EcallCause {
    /// Position 0: not a service. Reaching it is fatal.
    Default = 0,
    ProcId = 1,
    ClusterId = 2,
    RaisePriv = 3,
    ResetPriv = 4,
}

impl TryFrom<u32> for EcallCause {
    type Error = u32;

    fn try_from(x: u32) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Self::Default),
            1 => Ok(Self::ProcId),
            2 => Ok(Self::ClusterId),
            3 => Ok(Self::RaisePriv),
            4 => Ok(Self::ResetPriv),
            _ => Err(x),
        }
    }
}

static_assertions::const_assert_eq!(
    EcallCause::ResetPriv as usize + 1,
    NB_ECALL
);

bitflags! {
    /// The bits of `mstatus` the privilege transitions care about.
    ///
    /// The transitions write whole patterns rather than setting or clearing
    /// individual bits, so only the two associated constants below are ever
    /// written to the register.
    #[derive(Copy, Clone, Debug, Eq, PartialEq)]
    #[repr(transparent)]
    pub struct Mstatus: u32 {
        const UIE = 1 << 0;
        const MIE = 1 << 3;
        const UPIE = 1 << 4;
        const MPIE = 1 << 7;
        const MPP_M = 0b11 << 11;

        /// Machine mode on `mret`, interrupts masked until then.
        const RAISED = Self::MPP_M.bits() | Self::MPIE.bits();
        /// User mode on `mret`, interrupts re-enabled.
        const USER = Self::MPIE.bits() | Self::UPIE.bits();
    }
}

static_assertions::const_assert_eq!(Mstatus::RAISED.bits(), 0x1880);
static_assertions::const_assert_eq!(Mstatus::USER.bits(), 0x90);

/// Raw contents of the hart identifier register.
///
/// On the GAP parts the low nibble is the core within its cluster and the
/// cluster number starts at bit 5. Bit 4 is not part of either field.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    IntoBytes,
    FromBytes,
    Immutable,
    KnownLayout,
)]
#[repr(transparent)]
pub struct CoreId(pub u32);

impl CoreId {
    const PROC_MASK: u32 = 0xf;
    const CLUSTER_SHIFT: u32 = 5;

    /// Processor index within the cluster.
    pub const fn procid(self) -> u32 {
        self.0 & Self::PROC_MASK
    }

    /// Cluster index. The fabric controller reports cluster 31 on GAP8.
    pub const fn cluster(self) -> u32 {
        self.0 >> Self::CLUSTER_SHIFT
    }
}

/// The MPU works in 64-byte granules; region bases and sizes are expressed
/// in these.
pub const MPU_GRANULE_SHIFT: u32 = 6;

/// Memory areas an MPU rule can target.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum MpuArea {
    /// Fabric controller tightly-coupled data memory.
    FcTcdm = 0,
    /// Shared L2.
    L2 = 1,
    /// Peripheral (APB) space.
    Apb = 2,
}

impl TryFrom<u32> for MpuArea {
    type Error = u32;

    fn try_from(x: u32) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Self::FcTcdm),
            1 => Ok(Self::L2),
            2 => Ok(Self::Apb),
            _ => Err(x),
        }
    }
}

/// A single MPU rule word, as written to the MPU rule registers.
///
/// Layout:
///
/// | bits    | field                                  |
/// |---------|----------------------------------------|
/// | 1:0     | area tag ([`MpuArea`])                 |
/// | 15:2    | base offset within the area, granules  |
/// | 31:16   | size in granules                       |
///
/// Encoding performs no checks beyond masking each field to its width. An
/// unaligned base or a size too large for the field produces a rule that
/// protects something other than what was asked for. The base field holds
/// 14 granule bits, so it reaches 1 MiB into an area; an L2 offset at or
/// past that wraps around to the start of L2.
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
#[repr(transparent)]
pub struct MpuRule(pub u32);

impl MpuRule {
    const AREA_MASK: u32 = 0b11;
    const BASE_SHIFT: u32 = 2;
    const BASE_MASK: u32 = (1 << 14) - 1;
    const SIZE_SHIFT: u32 = 16;
    const SIZE_MASK: u32 = 0xffff;

    /// Packs a rule. `base` is a byte offset from the start of `area`;
    /// `size_code` is the region size in granules, i.e. `(end - start) >> 6`.
    pub const fn encode(area: MpuArea, base: u32, size_code: u32) -> Self {
        Self(
            (area as u32 & Self::AREA_MASK)
                | ((base >> MPU_GRANULE_SHIFT) & Self::BASE_MASK)
                    << Self::BASE_SHIFT
                | (size_code & Self::SIZE_MASK) << Self::SIZE_SHIFT,
        )
    }

    /// Area tag, or the raw tag if it names no known area.
    pub fn area(self) -> Result<MpuArea, u32> {
        MpuArea::try_from(self.0 & Self::AREA_MASK)
    }

    /// Base offset in bytes from the start of the area.
    pub const fn base(self) -> u32 {
        ((self.0 >> Self::BASE_SHIFT) & Self::BASE_MASK) << MPU_GRANULE_SHIFT
    }

    pub const fn size_code(self) -> u32 {
        (self.0 >> Self::SIZE_SHIFT) & Self::SIZE_MASK
    }

    pub const fn size_in_bytes(self) -> u32 {
        self.size_code() << MPU_GRANULE_SHIFT
    }
}
