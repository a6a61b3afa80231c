// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plugin bundle access and descriptor parsing.
//!
//! A bundle is a ZIP archive or a directory with a `manifest.yaml` at its
//! root. The manifest references provider descriptors, and each provider
//! selects model definition files with glob patterns. Everything here is
//! synchronous and side-effect free apart from reading the bundle.

pub mod bundle;
pub mod dependency;
pub mod icon;
pub mod localized;
pub mod model;
pub mod parser;
pub mod validate;

pub use bundle::{Bundle, BundleKind, DEFAULT_MAX_ENTRY_BYTES, MANIFEST_FILES};
pub use dependency::{DependencyGraph, DependencyReport};
pub use icon::{ASSETS_DIR, extract_icon};
pub use localized::{DEFAULT_LOCALE, LocalizedText};
pub use model::{
    CredentialField, CredentialOption, HelpLink, ItemFailure, ModelDefinition,
    ModelDefinitionBatch, ModelPermission, ModelTypeConfig, ParameterRule, Permissions,
    PluginManifest, ProviderDescriptor, ResourceLimits, ToolPermission,
};
pub use parser::{
    parse_manifest, parse_manifest_str, parse_model_definition_str, parse_model_definitions,
    parse_provider, parse_provider_str,
};
pub use validate::{ProviderValidation, validate_manifest, validate_provider};

use modelplug_core::RuntimeError;

/// A bundle's manifest with its providers, each validated, and every model
/// definition they select.
#[derive(Debug)]
pub struct ParsedBundle {
    pub manifest: PluginManifest,
    pub providers: Vec<ProviderDescriptor>,
    pub models: ModelDefinitionBatch,
}

/// Open, parse, and validate a bundle in one pass.
///
/// Manifest and provider problems fail the whole call. Individual model
/// definitions that fail to parse are kept in `models.failures`.
pub fn load_bundle(path: impl AsRef<std::path::Path>) -> Result<ParsedBundle, RuntimeError> {
    let bundle = Bundle::open(path)?;
    let manifest = parse_manifest(&bundle)?;
    validate_manifest(&manifest)?;

    let mut providers = Vec::with_capacity(manifest.provider_refs.len());
    let mut models = ModelDefinitionBatch::default();
    for reference in &manifest.provider_refs {
        let provider = parse_provider(&bundle, reference)?;
        validate_provider(&provider).into_result()?;

        let batch = parse_model_definitions(&provider, &bundle);
        models.definitions.extend(batch.definitions);
        models.failures.extend(batch.failures);
        providers.push(provider);
    }

    Ok(ParsedBundle {
        manifest,
        providers,
        models,
    })
}
