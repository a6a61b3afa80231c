// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Lookup order: `./modelplug.toml` > `~/.config/modelplug/modelplug.toml` >
//! `/etc/modelplug/modelplug.toml`, with `MODELPLUG_` environment overrides.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ModelplugConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/modelplug/modelplug.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "modelplug.toml";

/// Path of the per-user config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("modelplug").join(LOCAL_CONFIG_FILE))
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/modelplug/modelplug.toml`
/// 3. `~/.config/modelplug/modelplug.toml`
/// 4. `./modelplug.toml`
/// 5. `MODELPLUG_*` environment variables
pub fn load_config() -> Result<ModelplugConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ModelplugConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelplugConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from one explicit file plus env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ModelplugConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ModelplugConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ModelplugConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Environment provider mapping `MODELPLUG_<SECTION>_<KEY>` to `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` because keys such as
/// `database_path` contain underscores themselves.
fn env_provider() -> Env {
    Env::prefixed("MODELPLUG_").map(|key| {
        let mapped = key
            .as_str()
            .replacen("runtime_", "runtime.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("install_", "install.", 1)
            .replacen("loader_", "loader.", 1);
        mapped.into()
    })
}
