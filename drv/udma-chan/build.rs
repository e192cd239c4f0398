// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::Write;

use anyhow::{bail, Result};
use serde::Deserialize;

const WORD_BITS: u32 = 32;

#[derive(Deserialize, Default)]
struct AppConfig {
    #[serde(default)]
    udma: UdmaConfig,
}

#[derive(Deserialize)]
#[serde(default)]
struct UdmaConfig {
    lin_channels: u32,
    chan_2d: u32,
    fifo_channels: u32,
    /// Global id of the first 2D channel. Defaults to just after the linear
    /// channels.
    chan_2d_base: Option<u32>,
    /// Global id of the first FIFO channel. Defaults to just after the 2D
    /// channels.
    fifo_base: Option<u32>,
    lin_addrgen_base: u32,
    lin_addrgen_stride: u32,
    chan_2d_addrgen_base: u32,
    chan_2d_addrgen_stride: u32,
    fifo_addrgen_base: u32,
    fifo_addrgen_stride: u32,
}

impl Default for UdmaConfig {
    fn default() -> Self {
        Self {
            lin_channels: 32,
            chan_2d: 8,
            fifo_channels: 8,
            chan_2d_base: None,
            fifo_base: None,
            lin_addrgen_base: 0x1a10_2000,
            lin_addrgen_stride: 0x10,
            chan_2d_addrgen_base: 0x1a10_2200,
            chan_2d_addrgen_stride: 0x20,
            fifo_addrgen_base: 0x1a10_2300,
            fifo_addrgen_stride: 0x10,
        }
    }
}

fn main() -> Result<()> {
    let config: AppConfig = build_util::config_or_default()?;
    let u = config.udma;

    if u.lin_channels == 0 {
        bail!("udma.lin_channels must be at least 1");
    }
    // The 2D and FIFO pools are a single word each.
    if u.chan_2d > WORD_BITS {
        bail!("udma.chan_2d is {}, at most {WORD_BITS} supported", u.chan_2d);
    }
    if u.fifo_channels > WORD_BITS {
        bail!(
            "udma.fifo_channels is {}, at most {WORD_BITS} supported",
            u.fifo_channels
        );
    }

    let chan_2d_base = u.chan_2d_base.unwrap_or(u.lin_channels);
    let fifo_base = u
        .fifo_base
        .unwrap_or_else(|| chan_2d_base.saturating_add(u.chan_2d));
    let lin_words = u.lin_channels.div_ceil(WORD_BITS);

    // Drivers see ids as i32, with -1 meaning "none".
    let last = [
        u.lin_channels,
        chan_2d_base.saturating_add(u.chan_2d),
        fifo_base.saturating_add(u.fifo_channels),
    ];
    if last.iter().any(|&end| i32::try_from(end).is_err()) {
        bail!("udma channel ids must fit in an i32");
    }

    let out = build_util::out_dir()?;
    let mut file = File::create(out.join("udma_config.rs"))?;

    writeln!(file, "// See build.rs for details")?;
    writeln!(file, "pub const LIN_CHANNELS: u32 = {};", u.lin_channels)?;
    writeln!(file, "pub const LIN_WORDS: usize = {lin_words};")?;
    writeln!(file, "pub const CHAN_2D: u32 = {};", u.chan_2d)?;
    writeln!(file, "pub const CHAN_2D_BASE: u32 = {chan_2d_base};")?;
    writeln!(file, "pub const FIFO_CHANNELS: u32 = {};", u.fifo_channels)?;
    writeln!(file, "pub const FIFO_BASE: u32 = {fifo_base};")?;
    for (kind, base, stride) in [
        ("LIN", u.lin_addrgen_base, u.lin_addrgen_stride),
        ("CHAN_2D", u.chan_2d_addrgen_base, u.chan_2d_addrgen_stride),
        ("FIFO", u.fifo_addrgen_base, u.fifo_addrgen_stride),
    ] {
        writeln!(file, "pub const {kind}_ADDRGEN_BASE: u32 = {base:#010x};")?;
        writeln!(file, "pub const {kind}_ADDRGEN_STRIDE: u32 = {stride:#x};")?;
    }

    Ok(())
}
