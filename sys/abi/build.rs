// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::Write;

use anyhow::Result;
use serde::Deserialize;

/// Only the `[kernel]` table matters here; anything else in the application
/// config belongs to other crates and is ignored.
#[derive(Deserialize, Default)]
struct AppConfig {
    #[serde(default)]
    kernel: KernelConfig,
}

/// Sizes, in 32-bit words, of the opaque control blocks the kernel fills in
/// for statically allocated objects. These have to agree with the kernel's
/// own `StaticTask_t` and friends for the configuration it was built with.
#[derive(Deserialize)]
#[serde(default)]
struct KernelConfig {
    static_task_words: usize,
    static_queue_words: usize,
    static_timer_words: usize,
    static_event_group_words: usize,
    static_stream_buffer_words: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            static_task_words: 44,
            static_queue_words: 20,
            static_timer_words: 11,
            static_event_group_words: 8,
            static_stream_buffer_words: 9,
        }
    }
}

fn main() -> Result<()> {
    let config: AppConfig = build_util::config_or_default()?;
    let k = config.kernel;

    let out = build_util::out_dir()?;
    let mut file = File::create(out.join("static_sizes.rs"))?;

    writeln!(file, "// See build.rs for details")?;
    for (name, words) in [
        ("STATIC_TASK_WORDS", k.static_task_words),
        ("STATIC_QUEUE_WORDS", k.static_queue_words),
        ("STATIC_TIMER_WORDS", k.static_timer_words),
        ("STATIC_EVENT_GROUP_WORDS", k.static_event_group_words),
        ("STATIC_STREAM_BUFFER_WORDS", k.static_stream_buffer_words),
    ] {
        if words == 0 {
            anyhow::bail!("kernel.{} must be nonzero", name.to_lowercase());
        }
        writeln!(file, "pub const {name}: usize = {words};")?;
    }

    Ok(())
}
