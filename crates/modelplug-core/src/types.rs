// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the registry, lifecycle service, and dispatch layer.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Kind of plugin declared by a manifest.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginType {
    Model,
    Tool,
    Ui,
    Other,
}

/// Lifecycle state of a plugin.
///
/// `Discovered`, `Parsed` and `Validated` are transient install states and are
/// never persisted. Records only exist in the installed states or `Failed`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginStatus {
    Discovered,
    Parsed,
    Validated,
    InstalledDisabled,
    InstalledEnabled,
    Failed,
    Uninstalled,
}

impl PluginStatus {
    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: PluginStatus) -> bool {
        use PluginStatus::*;
        match (self, next) {
            (Discovered, Parsed) | (Parsed, Validated) | (Validated, InstalledDisabled) => true,
            (InstalledDisabled, InstalledEnabled) | (InstalledEnabled, InstalledDisabled) => true,
            (InstalledDisabled | InstalledEnabled | Failed, Uninstalled) => true,
            (Discovered | Parsed | Validated | InstalledDisabled | InstalledEnabled, Failed) => {
                true
            }
            _ => false,
        }
    }

    /// True for the two states a persisted, usable record can be in.
    pub fn is_installed(self) -> bool {
        matches!(
            self,
            PluginStatus::InstalledDisabled | PluginStatus::InstalledEnabled
        )
    }
}

/// Model kinds a provider can serve.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    #[strum(to_string = "chat", serialize = "llm")]
    #[serde(alias = "llm")]
    Chat,
    #[strum(
        to_string = "embedding",
        serialize = "text-embedding",
        serialize = "text_embedding"
    )]
    #[serde(alias = "text-embedding", alias = "text_embedding")]
    Embedding,
    #[strum(to_string = "image", serialize = "text2img")]
    #[serde(alias = "text2img")]
    Image,
    #[strum(to_string = "audio")]
    Audio,
    #[strum(to_string = "rerank")]
    Rerank,
    #[strum(to_string = "speech2text")]
    Speech2text,
    #[strum(to_string = "tts")]
    Tts,
    #[strum(to_string = "moderation")]
    Moderation,
}

/// How a provider's models are configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationMethod {
    /// Models are declared by the bundle's predefined definition files.
    #[strum(to_string = "predefined", serialize = "predefined-model")]
    #[serde(alias = "predefined-model")]
    Predefined,
    /// Users may declare additional models at runtime.
    #[strum(to_string = "customizable", serialize = "customizable-model")]
    #[serde(alias = "customizable-model")]
    Customizable,
}

/// How strongly one plugin depends on another.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    #[default]
    Runtime,
    Compile,
    Optional,
}

/// A declared dependency of one plugin on another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub plugin_id: String,
    /// Version requirement (e.g. `^1.2`), evaluated with semver rules.
    #[serde(default)]
    pub version: Option<String>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min_version: Option<String>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max_version: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, rename = "type")]
    pub kind: DependencyKind,
}

impl Dependency {
    /// Optional either through the flag or through the dependency kind.
    pub fn is_optional(&self) -> bool {
        self.optional || self.kind == DependencyKind::Optional
    }
}

/// A plugin's contribution to a named extension point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    pub extension_point: String,
    pub implementation: String,
    #[serde(default)]
    pub ordering: i32,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub config: serde_json::Value,
}

fn default_active() -> bool {
    true
}

/// A provider service contributed by an installed plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub plugin_id: String,
    pub provider_name: String,
    pub provider_implementation: String,
    pub model_types: Vec<ModelType>,
}

/// Records persisted alongside a plugin and deleted with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginAssociations {
    pub dependencies: Vec<Dependency>,
    pub extensions: Vec<Extension>,
    pub services: Vec<ServiceRecord>,
}

impl PluginAssociations {
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty() && self.extensions.is_empty() && self.services.is_empty()
    }
}

/// The registry record for an installed plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Row id assigned by the registry on first save.
    pub id: Option<i64>,
    pub plugin_id: String,
    pub name: String,
    pub version: String,
    pub plugin_type: PluginType,
    pub status: PluginStatus,
    pub enabled: bool,
    pub bundle_path: PathBuf,
    pub main_implementation: Option<String>,
    pub icon_path: Option<String>,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub enabled_at: Option<DateTime<Utc>>,
    pub disabled_at: Option<DateTime<Utc>>,
    /// Reason recorded with a `Failed` status.
    pub last_error: Option<String>,
}

impl PluginInfo {
    /// A freshly installed, disabled record.
    pub fn new(
        plugin_id: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        plugin_type: PluginType,
        bundle_path: impl Into<PathBuf>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            plugin_id: plugin_id.into(),
            name: name.into(),
            version: version.into(),
            plugin_type,
            status: PluginStatus::InstalledDisabled,
            enabled: false,
            bundle_path: bundle_path.into(),
            main_implementation: None,
            icon_path: None,
            installed_at: now,
            updated_at: now,
            enabled_at: None,
            disabled_at: None,
            last_error: None,
        }
    }
}

/// Timestamp that is strictly later than `previous`, even when the clock has
/// not advanced since it was taken.
pub fn next_timestamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

/// Query filter shared by registry implementations and record stores.
///
/// `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginFilter {
    pub name: Option<String>,
    pub plugin_type: Option<PluginType>,
    pub status: Option<PluginStatus>,
    pub enabled: Option<bool>,
}

impl PluginFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn plugin_type(mut self, plugin_type: PluginType) -> Self {
        self.plugin_type = Some(plugin_type);
        self
    }

    pub fn status(mut self, status: PluginStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn matches(&self, info: &PluginInfo) -> bool {
        self.name.as_ref().is_none_or(|n| *n == info.name)
            && self.plugin_type.is_none_or(|t| t == info.plugin_type)
            && self.status.is_none_or(|s| s == info.status)
            && self.enabled.is_none_or(|e| e == info.enabled)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

/// Credentials handed to a provider factory. Values are redacted in `Debug`.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials(BTreeMap<String, String>);

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.0.keys().map(|k| (k, "***")))
            .finish()
    }
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// A chat completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    /// Model parameters keyed by parameter-rule key.
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

/// A full chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: String,
    pub content: String,
}

/// One increment of a streamed chat completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    pub delta: String,
    pub finished: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_image_count")]
    pub count: u32,
}

fn default_image_count() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResponse {
    /// Encoded image payloads.
    pub images: Vec<Vec<u8>>,
}
