// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the plugin runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so that typos in config
//! files are reported at startup instead of being ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level modelplug configuration.
///
/// Every section is optional and defaults to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelplugConfig {
    /// Process-wide settings (logging).
    #[serde(default)]
    pub runtime: RuntimeConfig,

    /// Registry persistence settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Bundle installation settings.
    #[serde(default)]
    pub install: InstallConfig,

    /// Load context settings.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// Process-wide runtime settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which registry implementation backs the runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// SQLite record store, survives restarts.
    #[default]
    Sqlite,
    /// Process-local map, lost on exit.
    Memory,
}

/// Registry persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: RegistryBackend,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::default(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("modelplug"))
        .unwrap_or_else(|| PathBuf::from(".modelplug"))
}

fn default_database_path() -> String {
    data_dir().join("registry.db").to_string_lossy().into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Bundle installation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    /// Directory that managed bundles are staged and stored under.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: String,

    /// Directory extracted icons are persisted under.
    #[serde(default = "default_icons_dir")]
    pub icons_dir: String,

    /// Overall bound on a URL download, in seconds.
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Bound on establishing the download connection, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Bound on reading and parsing a bundle, in seconds.
    #[serde(default = "default_extract_timeout_secs")]
    pub extract_timeout_secs: u64,

    /// Largest bundle accepted from a stream or URL, in bytes.
    #[serde(default = "default_max_bundle_bytes")]
    pub max_bundle_bytes: u64,

    /// Permit URL installs from loopback and private network addresses.
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            plugins_dir: default_plugins_dir(),
            icons_dir: default_icons_dir(),
            download_timeout_secs: default_download_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            extract_timeout_secs: default_extract_timeout_secs(),
            max_bundle_bytes: default_max_bundle_bytes(),
            allow_private_hosts: false,
        }
    }
}

fn default_plugins_dir() -> String {
    data_dir().join("plugins").to_string_lossy().into_owned()
}

fn default_icons_dir() -> String {
    data_dir().join("icons").to_string_lossy().into_owned()
}

fn default_download_timeout_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_extract_timeout_secs() -> u64 {
    60
}

fn default_max_bundle_bytes() -> u64 {
    256 * 1024 * 1024
}

/// Load context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Linear memory ceiling for one implementation unit, in bytes.
    /// A manifest's own `resource.memory` takes precedence when lower.
    #[serde(default = "default_max_unit_memory_bytes")]
    pub max_unit_memory_bytes: u64,

    /// Fuel granted to a unit's `_initialize` and to each exported call.
    /// A unit that exhausts it traps.
    #[serde(default = "default_unit_fuel")]
    pub unit_fuel: u64,

    /// Locale used when a localized field lacks the requested one.
    #[serde(default = "default_locale")]
    pub default_locale: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_unit_memory_bytes: default_max_unit_memory_bytes(),
            unit_fuel: default_unit_fuel(),
            default_locale: default_locale(),
        }
    }
}

fn default_max_unit_memory_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_unit_fuel() -> u64 {
    1_000_000_000
}

fn default_locale() -> String {
    "en_US".to_string()
}
