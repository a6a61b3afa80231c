// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Semantic checks on parsed descriptors.
//!
//! Validation never stops at the first problem; every issue is reported so
//! an author can fix a descriptor in one pass.

use modelplug_core::{PluginType, ValidationError};

use crate::model::{PluginManifest, ProviderDescriptor};

/// Outcome of validating a provider descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderValidation {
    pub provider: String,
    pub issues: Vec<String>,
}

impl ProviderValidation {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(
                format!("provider `{}`", self.provider),
                self.issues,
            ))
        }
    }
}

/// Check a provider descriptor for completeness.
///
/// A provider is valid when it has a name, an implementation, at least one
/// supported model type, and a configuration block with a handler for each
/// supported type.
pub fn validate_provider(provider: &ProviderDescriptor) -> ProviderValidation {
    let mut issues = Vec::new();

    if provider.provider_name.is_empty() {
        issues.push("provider name is required".to_string());
    }
    if provider.provider_implementation.is_empty() {
        issues.push("provider implementation is required".to_string());
    }
    if provider.supported_model_types.is_empty() {
        issues.push("at least one supported model type is required".to_string());
    }

    for model_type in &provider.supported_model_types {
        match provider.model_configs.get(model_type) {
            None => issues.push(format!("model type `{model_type}` has no configuration block")),
            Some(config) if config.handler_implementation.is_empty() => {
                issues.push(format!("model type `{model_type}` has no handler implementation"));
            }
            Some(_) => {}
        }
    }

    for model_type in provider.model_configs.keys() {
        if !provider.supports(*model_type) {
            issues.push(format!(
                "configuration block for `{model_type}` is not a supported model type"
            ));
        }
    }

    let mut variables = std::collections::HashSet::new();
    for field in &provider.credential_schema {
        if field.variable.trim().is_empty() {
            issues.push("credential field with empty variable".to_string());
        } else if !variables.insert(field.variable.as_str()) {
            issues.push(format!("duplicate credential field `{}`", field.variable));
        }
    }

    ProviderValidation {
        provider: provider.provider_name.clone(),
        issues,
    }
}

/// Check a manifest for the information installation relies on.
pub fn validate_manifest(manifest: &PluginManifest) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    if manifest.id.is_empty() {
        issues.push("id is required".to_string());
    } else if !is_valid_id(&manifest.id) {
        issues.push(format!(
            "id `{}` may only contain letters, digits, `.`, `_`, `-`, `/` and `@`",
            manifest.id
        ));
    }
    if manifest.name.is_empty() {
        issues.push("name is required".to_string());
    }
    if manifest.version.is_empty() {
        issues.push("version is required".to_string());
    } else if let Err(e) = semver::Version::parse(&manifest.version) {
        issues.push(format!("version `{}` is not valid semver: {e}", manifest.version));
    }
    if manifest.plugin_type == PluginType::Model && manifest.provider_refs.is_empty() {
        issues.push("a MODEL plugin must reference at least one provider descriptor".to_string());
    }
    if manifest.resources.memory == Some(0) {
        issues.push("resource.memory must be greater than zero".to_string());
    }

    for dep in &manifest.dependencies {
        if dep.plugin_id.trim().is_empty() {
            issues.push("dependency with empty plugin_id".to_string());
            continue;
        }
        if dep.plugin_id == manifest.id {
            issues.push("a plugin cannot depend on itself".to_string());
        }
        if let Some(req) = &dep.version
            && semver::VersionReq::parse(req).is_err()
        {
            issues.push(format!(
                "dependency `{}` has invalid version requirement `{req}`",
                dep.plugin_id
            ));
        }
        for bound in [&dep.min_version, &dep.max_version].into_iter().flatten() {
            if semver::Version::parse(bound).is_err() {
                issues.push(format!(
                    "dependency `{}` has invalid version bound `{bound}`",
                    dep.plugin_id
                ));
            }
        }
    }

    for ext in &manifest.extensions {
        if ext.extension_point.trim().is_empty() || ext.implementation.trim().is_empty() {
            issues.push("extensions need both extension_point and implementation".to_string());
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        let subject = if manifest.id.is_empty() {
            format!("manifest in {}", manifest.bundle_path.display())
        } else {
            format!("plugin `{}`", manifest.id)
        };
        Err(ValidationError::new(subject, issues))
    }
}

fn is_valid_id(id: &str) -> bool {
    !id.contains("..")
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '@'))
}
