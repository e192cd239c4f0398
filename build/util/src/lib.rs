// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helpers for build scripts.
//!
//! The platform configuration is one TOML document, passed to every build
//! script in `GAP_APP_CONFIG`. Each crate deserializes only the tables it
//! cares about; unknown tables and keys are ignored, so no crate's config
//! type should set `deny_unknown_fields` at the top level.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::env;
use std::path::PathBuf;

const APP_CONFIG_VAR: &str = "GAP_APP_CONFIG";

/// Returns the `OUT_DIR` cargo hands to build scripts.
pub fn out_dir() -> Result<PathBuf> {
    env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .context("OUT_DIR not set; is this running from a build script?")
}

/// Reads the platform configuration as `T`. A missing configuration yields
/// `T::default()`; one that is present and malformed is an error.
pub fn config_or_default<T: DeserializeOwned + Default>() -> Result<T> {
    Ok(read_config()?.unwrap_or_default())
}

fn read_config<T: DeserializeOwned>() -> Result<Option<T>> {
    // Emitted whether or not the variable is set, so that setting it later
    // triggers a rebuild.
    println!("cargo:rerun-if-env-changed={APP_CONFIG_VAR}");

    let Ok(text) = env::var(APP_CONFIG_VAR) else {
        println!("--- ${APP_CONFIG_VAR} not present, using defaults ---");
        return Ok(None);
    };
    println!("--- toml for ${APP_CONFIG_VAR} ---");
    println!("{text}");

    let config = toml::from_str(&text)
        .with_context(|| format!("parsing ${APP_CONFIG_VAR}"))?;
    Ok(Some(config))
}
