// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::Write;

use anyhow::{bail, Result};
use serde::Deserialize;

#[derive(Deserialize, Default)]
struct AppConfig {
    #[serde(default)]
    kernel: KernelConfig,
}

#[derive(Deserialize)]
#[serde(default)]
struct KernelConfig {
    /// Subtracted from region start addresses when building MPU rules.
    l2_base: u32,
    /// Context switches are only granted on ticks that are a multiple of
    /// this.
    preemption_quantum: u32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            l2_base: 0x1c00_0000,
            preemption_quantum: 1,
        }
    }
}

fn main() -> Result<()> {
    let config: AppConfig = build_util::config_or_default()?;
    let k = config.kernel;

    if k.preemption_quantum == 0 {
        bail!("kernel.preemption_quantum must be at least 1");
    }

    let out = build_util::out_dir()?;
    let mut file = File::create(out.join("kconfig.rs"))?;

    writeln!(file, "// See build.rs for details")?;
    writeln!(file, "pub const L2_BASE: u32 = {:#010x};", k.l2_base)?;
    writeln!(
        file,
        "pub const PREEMPTION_QUANTUM: u32 = {};",
        k.preemption_quantum
    )?;

    Ok(())
}
