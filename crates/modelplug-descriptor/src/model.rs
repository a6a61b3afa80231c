// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory descriptor model: the manifest, provider descriptors, and the
//! model definitions a provider exposes.
//!
//! These are immutable values produced by one parse call.

use std::collections::BTreeMap;
use std::path::PathBuf;

use modelplug_core::{ConfigurationMethod, Dependency, Extension, ModelType, PluginType, ParseError};
use serde::{Deserialize, Serialize};

use crate::localized::LocalizedText;

/// A plugin bundle's top-level descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub author: Option<String>,
    pub plugin_type: PluginType,
    /// Unit instantiated directly when the plugin is enabled.
    pub main_implementation: Option<String>,
    /// Icon asset filename.
    pub icon: Option<String>,
    pub description: LocalizedText,
    pub label: LocalizedText,
    /// Provider descriptor paths, relative to the bundle root.
    pub provider_refs: Vec<String>,
    pub resources: ResourceLimits,
    pub dependencies: Vec<Dependency>,
    pub extensions: Vec<Extension>,
    /// Where the manifest was read from.
    pub bundle_path: PathBuf,
}

impl PluginManifest {
    /// Display label for `locale`, falling back to the plain name.
    pub fn display_label(&self, locale: &str) -> String {
        self.label.resolve_or(locale, &self.name)
    }

    pub fn display_description(&self, locale: &str) -> String {
        self.description.resolve_or(locale, &self.name)
    }
}

/// Resource ceiling and capability flags requested by a plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Memory ceiling in bytes.
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub permission: Permissions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub model: ModelPermission,
    #[serde(default)]
    pub tool: ToolPermission,
}

/// Model-serving permission with per-kind flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelPermission {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub llm: bool,
    #[serde(default)]
    pub text_embedding: bool,
    #[serde(default)]
    pub rerank: bool,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub speech2text: bool,
    #[serde(default)]
    pub moderation: bool,
}

impl ModelPermission {
    /// Whether serving `model_type` is permitted.
    pub fn allows(&self, model_type: ModelType) -> bool {
        self.enabled
            && match model_type {
                ModelType::Chat => self.llm,
                ModelType::Embedding => self.text_embedding,
                ModelType::Rerank => self.rerank,
                ModelType::Tts => self.tts,
                ModelType::Speech2text => self.speech2text,
                ModelType::Moderation => self.moderation,
                ModelType::Image | ModelType::Audio => true,
            }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPermission {
    #[serde(default)]
    pub enabled: bool,
}

/// A named backend integration contributed by a plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDescriptor {
    pub provider_name: String,
    /// Unit realizing the provider contract.
    pub provider_implementation: String,
    pub supported_model_types: Vec<ModelType>,
    pub configuration_methods: Vec<ConfigurationMethod>,
    /// Ordered credential form.
    pub credential_schema: Vec<CredentialField>,
    pub model_configs: BTreeMap<ModelType, ModelTypeConfig>,
    pub description: LocalizedText,
    pub label: LocalizedText,
    pub icon_small: LocalizedText,
    pub icon_large: LocalizedText,
    pub background: Option<String>,
    pub help: Option<HelpLink>,
    /// Descriptor path inside the bundle.
    pub source_path: String,
}

impl ProviderDescriptor {
    pub fn display_label(&self, locale: &str) -> String {
        self.label.resolve_or(locale, &self.provider_name)
    }

    pub fn supports(&self, model_type: ModelType) -> bool {
        self.supported_model_types.contains(&model_type)
    }

    /// Credential fields a caller must fill in.
    pub fn required_credentials(&self) -> impl Iterator<Item = &CredentialField> {
        self.credential_schema.iter().filter(|f| f.required)
    }
}

/// One field of a provider's credential form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialField {
    pub variable: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: LocalizedText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<CredentialOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOption {
    pub value: String,
    #[serde(default)]
    pub label: LocalizedText,
}

/// Per-model-type configuration block of a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelTypeConfig {
    /// Unit handling this model type.
    pub handler_implementation: String,
    /// Optional ordering file listing model ids.
    pub position: Option<String>,
    /// Glob patterns selecting model definition files.
    pub predefined: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelpLink {
    #[serde(default)]
    pub title: LocalizedText,
    #[serde(default)]
    pub url: LocalizedText,
}

/// A declared, invocable model belonging to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub model_id: String,
    pub model_type: ModelType,
    /// Provider namespace this definition was parsed for.
    pub provider: String,
    pub label: LocalizedText,
    pub features: Vec<String>,
    pub model_properties: BTreeMap<String, serde_json::Value>,
    pub parameter_rules: Vec<ParameterRule>,
    pub pricing: Option<serde_json::Value>,
    /// File the definition was read from.
    pub source_path: String,
}

impl ModelDefinition {
    pub fn display_label(&self, locale: &str) -> String {
        self.label.resolve_or(locale, &self.model_id)
    }

    pub fn parameter(&self, key: &str) -> Option<&ParameterRule> {
        self.parameter_rules.iter().find(|r| r.key == key)
    }
}

/// Constraint on one invocation parameter of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRule {
    #[serde(alias = "name")]
    pub key: String,
    #[serde(rename = "type", default)]
    pub value_type: Option<String>,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub required: bool,
    /// Shared template the rule inherits defaults from (e.g. `temperature`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<LocalizedText>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Result of parsing every definition a provider references.
///
/// Malformed files are recorded in `failures` instead of aborting the batch.
#[derive(Debug, Default)]
pub struct ModelDefinitionBatch {
    pub definitions: Vec<ModelDefinition>,
    pub failures: Vec<ItemFailure>,
}

impl ModelDefinitionBatch {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn of_type(&self, model_type: ModelType) -> impl Iterator<Item = &ModelDefinition> {
        self.definitions
            .iter()
            .filter(move |d| d.model_type == model_type)
    }

    pub fn find(&self, model_id: &str) -> Option<&ModelDefinition> {
        self.definitions.iter().find(|d| d.model_id == model_id)
    }
}

/// A file that could not be parsed as part of a batch.
#[derive(Debug)]
pub struct ItemFailure {
    pub path: String,
    pub error: ParseError,
}
