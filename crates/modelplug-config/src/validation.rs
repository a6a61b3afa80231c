// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::{ModelplugConfig, RegistryBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of stopping at the first one.
pub fn validate_config(config: &ModelplugConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.runtime.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "runtime.log_level `{}` is not one of {}",
                config.runtime.log_level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.storage.backend == RegistryBackend::Sqlite
        && config.storage.database_path.trim().is_empty()
    {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.install.plugins_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "install.plugins_dir must not be empty".to_string(),
        });
    }

    if config.install.icons_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "install.icons_dir must not be empty".to_string(),
        });
    }

    for (key, value) in [
        ("install.download_timeout_secs", config.install.download_timeout_secs),
        ("install.connect_timeout_secs", config.install.connect_timeout_secs),
        ("install.extract_timeout_secs", config.install.extract_timeout_secs),
        ("install.max_bundle_bytes", config.install.max_bundle_bytes),
        ("loader.max_unit_memory_bytes", config.loader.max_unit_memory_bytes),
        ("loader.unit_fuel", config.loader.unit_fuel),
    ] {
        if value == 0 {
            errors.push(ConfigError::Validation {
                message: format!("{key} must be greater than zero"),
            });
        }
    }

    if config.install.connect_timeout_secs > config.install.download_timeout_secs {
        errors.push(ConfigError::Validation {
            message: format!(
                "install.connect_timeout_secs ({}) must not exceed install.download_timeout_secs ({})",
                config.install.connect_timeout_secs, config.install.download_timeout_secs
            ),
        });
    }

    if config.loader.default_locale.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "loader.default_locale must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = ModelplugConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_only_for_sqlite() {
        let mut config = ModelplugConfig::default();
        config.storage.database_path = " ".to_string();
        assert!(validate_config(&config).is_err());

        config.storage.backend = RegistryBackend::Memory;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ModelplugConfig::default();
        config.runtime.log_level = "loud".to_string();
        config.install.extract_timeout_secs = 0;
        config.install.plugins_dir = String::new();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn connect_timeout_cannot_exceed_download_timeout() {
        let mut config = ModelplugConfig::default();
        config.install.connect_timeout_secs = 300;
        config.install.download_timeout_secs = 30;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("connect_timeout_secs"));
    }

    #[test]
    fn zero_unit_fuel_is_rejected() {
        let mut config = ModelplugConfig::default();
        config.loader.unit_fuel = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("loader.unit_fuel"));
    }
}
