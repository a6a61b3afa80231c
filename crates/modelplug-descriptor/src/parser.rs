// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! YAML descriptor parsing.
//!
//! Each descriptor file is first deserialized into a private `*File` struct
//! mirroring the on-disk layout and then converted into the public model,
//! so that layout quirks (grouped provider lists, string-typed enums) stay
//! out of the model types.

use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;

use glob::{MatchOptions, Pattern};
use modelplug_core::{ConfigurationMethod, Dependency, Extension, ModelType, ParseError, PluginType};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::bundle::Bundle;
use crate::localized::LocalizedText;
use crate::model::{
    CredentialField, HelpLink, ItemFailure, ModelDefinition, ModelDefinitionBatch, ModelTypeConfig,
    ParameterRule, PluginManifest, ProviderDescriptor, ResourceLimits,
};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

// --- manifest ---

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default, rename = "type")]
    plugin_type: Option<String>,
    #[serde(default, alias = "main_implementation")]
    plugin_class: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    description: LocalizedText,
    #[serde(default)]
    label: LocalizedText,
    #[serde(default)]
    plugins: ProviderRefs,
    #[serde(default)]
    resource: ResourceLimits,
    #[serde(default)]
    dependencies: Vec<Dependency>,
    #[serde(default)]
    extensions: Vec<Extension>,
}

/// `plugins` is either a flat list of descriptor paths or a map grouping
/// lists by category (`{models: [...], tools: [...]}`).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProviderRefs {
    List(Vec<String>),
    Grouped(BTreeMap<String, Vec<String>>),
}

impl Default for ProviderRefs {
    fn default() -> Self {
        ProviderRefs::List(Vec::new())
    }
}

impl ProviderRefs {
    fn into_paths(self) -> Vec<String> {
        match self {
            ProviderRefs::List(paths) => paths,
            ProviderRefs::Grouped(groups) => groups.into_values().flatten().collect(),
        }
    }
}

/// Parse the manifest at the root of `bundle`.
pub fn parse_manifest(bundle: &Bundle) -> Result<PluginManifest, ParseError> {
    let file = bundle
        .manifest_file()
        .ok_or_else(|| ParseError::MissingManifest {
            bundle: bundle.path().to_path_buf(),
        })?;
    let content = bundle.read_to_string(file)?;
    let mut manifest = parse_manifest_str(&content, file)?;
    manifest.bundle_path = bundle.path().to_path_buf();
    Ok(manifest)
}

/// Parse manifest YAML. `source` names the file in error messages.
pub fn parse_manifest_str(content: &str, source: &str) -> Result<PluginManifest, ParseError> {
    let file: ManifestFile =
        serde_yaml::from_str(content).map_err(|e| ParseError::malformed(source, e))?;

    let plugin_type = match file.plugin_type.as_deref().map(str::trim) {
        None | Some("") => PluginType::Other,
        Some(raw) => PluginType::from_str(raw).map_err(|_| {
            ParseError::malformed(
                source,
                format!("invalid type `{raw}`, expected one of MODEL, TOOL, UI, OTHER"),
            )
        })?,
    };

    Ok(PluginManifest {
        id: file.id.trim().to_string(),
        name: file.name.trim().to_string(),
        version: file.version.trim().to_string(),
        author: file.author,
        plugin_type,
        main_implementation: file.plugin_class.filter(|c| !c.trim().is_empty()),
        icon: file.icon.filter(|i| !i.trim().is_empty()),
        description: file.description,
        label: file.label,
        provider_refs: file.plugins.into_paths(),
        resources: file.resource,
        dependencies: file.dependencies,
        extensions: file.extensions,
        bundle_path: Default::default(),
    })
}

// --- provider ---

#[derive(Debug, Deserialize)]
struct ProviderFile {
    #[serde(default)]
    provider: String,
    #[serde(default)]
    provider_source: String,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    configurate_methods: Vec<String>,
    #[serde(default)]
    description: LocalizedText,
    #[serde(default)]
    label: LocalizedText,
    #[serde(default)]
    icon_small: LocalizedText,
    #[serde(default)]
    icon_large: LocalizedText,
    #[serde(default)]
    supported_model_types: Vec<String>,
    #[serde(default)]
    models: BTreeMap<String, ModelTypeConfigFile>,
    #[serde(default)]
    provider_credential_schema: Option<CredentialSchemaFile>,
    #[serde(default)]
    help: Option<HelpLink>,
}

#[derive(Debug, Deserialize)]
struct ModelTypeConfigFile {
    #[serde(default)]
    source: String,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    predefined: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CredentialSchemaFile {
    #[serde(default)]
    credential_form_schemas: Vec<CredentialField>,
}

/// Parse the provider descriptor at `path` inside `bundle`.
pub fn parse_provider(bundle: &Bundle, path: &str) -> Result<ProviderDescriptor, ParseError> {
    let content = bundle.read_to_string(path)?;
    parse_provider_str(&content, path)
}

/// Parse provider descriptor YAML. `source` names the file in errors.
pub fn parse_provider_str(content: &str, source: &str) -> Result<ProviderDescriptor, ParseError> {
    let file: ProviderFile =
        serde_yaml::from_str(content).map_err(|e| ParseError::malformed(source, e))?;

    let supported_model_types = file
        .supported_model_types
        .iter()
        .map(|raw| parse_model_type(raw, source))
        .collect::<Result<Vec<_>, _>>()?;

    let configuration_methods = file
        .configurate_methods
        .iter()
        .map(|raw| {
            ConfigurationMethod::from_str(raw.trim()).map_err(|_| {
                ParseError::malformed(source, format!("unknown configuration method `{raw}`"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut model_configs = BTreeMap::new();
    for (raw_type, config) in file.models {
        let model_type = parse_model_type(&raw_type, source)?;
        model_configs.insert(
            model_type,
            ModelTypeConfig {
                handler_implementation: config.source.trim().to_string(),
                position: config.position.filter(|p| !p.trim().is_empty()),
                predefined: config.predefined,
            },
        );
    }

    Ok(ProviderDescriptor {
        provider_name: file.provider.trim().to_string(),
        provider_implementation: file.provider_source.trim().to_string(),
        supported_model_types,
        configuration_methods,
        credential_schema: file
            .provider_credential_schema
            .map(|s| s.credential_form_schemas)
            .unwrap_or_default(),
        model_configs,
        description: file.description,
        label: file.label,
        icon_small: file.icon_small,
        icon_large: file.icon_large,
        background: file.background,
        help: file.help,
        source_path: source.to_string(),
    })
}

fn parse_model_type(raw: &str, source: &str) -> Result<ModelType, ParseError> {
    ModelType::from_str(raw.trim())
        .map_err(|_| ParseError::malformed(source, format!("unknown model type `{raw}`")))
}

// --- model definitions ---

#[derive(Debug, Deserialize)]
struct ModelDefinitionFile {
    model: String,
    model_type: String,
    #[serde(default)]
    label: LocalizedText,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    model_properties: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    parameter_rules: Vec<ParameterRule>,
    #[serde(default)]
    pricing: Option<serde_json::Value>,
}

/// Parse one model definition file.
pub fn parse_model_definition_str(
    content: &str,
    source: &str,
    provider: &str,
) -> Result<ModelDefinition, ParseError> {
    let file: ModelDefinitionFile =
        serde_yaml::from_str(content).map_err(|e| ParseError::malformed(source, e))?;

    if file.model.trim().is_empty() {
        return Err(ParseError::malformed(source, "model must not be empty"));
    }

    let mut seen = HashSet::new();
    if let Some(dup) = file
        .parameter_rules
        .iter()
        .find(|r| !seen.insert(r.key.as_str()))
    {
        return Err(ParseError::malformed(
            source,
            format!("duplicate parameter rule `{}`", dup.key),
        ));
    }

    Ok(ModelDefinition {
        model_id: file.model.trim().to_string(),
        model_type: parse_model_type(&file.model_type, source)?,
        provider: provider.to_string(),
        label: file.label,
        features: file.features,
        model_properties: file.model_properties,
        parameter_rules: file.parameter_rules,
        pricing: file.pricing,
        source_path: source.to_string(),
    })
}

/// Parse every model definition a provider's `predefined` patterns select.
///
/// Each matched file is parsed independently. Failures are logged and
/// collected in the batch; they never abort it. Files whose name starts
/// with `_` (such as `_position.yaml`) are not definitions and are skipped.
pub fn parse_model_definitions(
    provider: &ProviderDescriptor,
    bundle: &Bundle,
) -> ModelDefinitionBatch {
    let mut batch = ModelDefinitionBatch::default();
    let mut seen = HashSet::new();

    for (model_type, config) in &provider.model_configs {
        let first_of_type = batch.definitions.len();

        for raw in &config.predefined {
            let pattern_text = crate::bundle::normalize(raw);
            let pattern = match Pattern::new(&pattern_text) {
                Ok(p) => p,
                Err(e) => {
                    warn!(provider = %provider.provider_name, pattern = %raw, error = %e, "skipping invalid model pattern");
                    batch.failures.push(ItemFailure {
                        path: raw.clone(),
                        error: ParseError::Pattern {
                            pattern: raw.clone(),
                            message: e.to_string(),
                        },
                    });
                    continue;
                }
            };

            let matches: Vec<&String> = bundle
                .files()
                .iter()
                .filter(|f| pattern.matches_with(f, GLOB_OPTIONS))
                .filter(|f| !file_name(f).starts_with('_'))
                .collect();

            if matches.is_empty() && !has_wildcard(&pattern_text) {
                warn!(provider = %provider.provider_name, path = %pattern_text, "declared model definition is missing");
                batch.failures.push(ItemFailure {
                    path: pattern_text.clone(),
                    error: ParseError::Read {
                        path: pattern_text.clone(),
                        message: "no such file in bundle".to_string(),
                    },
                });
            }

            for path in matches {
                if !seen.insert(path.clone()) {
                    continue;
                }
                match parse_one(bundle, path, provider, *model_type) {
                    Ok(definition) => {
                        debug!(provider = %provider.provider_name, model = %definition.model_id, "parsed model definition");
                        batch.definitions.push(definition);
                    }
                    Err(error) => {
                        warn!(provider = %provider.provider_name, path = %path, error = %error, "skipping malformed model definition");
                        batch.failures.push(ItemFailure {
                            path: path.clone(),
                            error,
                        });
                    }
                }
            }
        }

        if let Some(position) = &config.position {
            match read_position(bundle, position) {
                Ok(order) => sort_by_position(&mut batch.definitions[first_of_type..], &order),
                Err(error) => {
                    warn!(provider = %provider.provider_name, path = %position, error = %error, "ignoring unreadable position file");
                    batch.failures.push(ItemFailure {
                        path: position.clone(),
                        error,
                    });
                }
            }
        }
    }

    batch
}

fn parse_one(
    bundle: &Bundle,
    path: &str,
    provider: &ProviderDescriptor,
    expected: ModelType,
) -> Result<ModelDefinition, ParseError> {
    let content = bundle.read_to_string(path)?;
    let definition = parse_model_definition_str(&content, path, &provider.provider_name)?;
    if definition.model_type != expected {
        return Err(ParseError::malformed(
            path,
            format!(
                "declares model_type `{}` but is listed under `{expected}`",
                definition.model_type
            ),
        ));
    }
    Ok(definition)
}

fn read_position(bundle: &Bundle, path: &str) -> Result<Vec<String>, ParseError> {
    let content = bundle.read_to_string(path)?;
    serde_yaml::from_str(&content).map_err(|e| ParseError::malformed(path, e))
}

fn sort_by_position(definitions: &mut [ModelDefinition], order: &[String]) {
    definitions.sort_by_key(|d| {
        order
            .iter()
            .position(|id| *id == d.model_id)
            .unwrap_or(usize::MAX)
    });
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROVIDER: &str = r#"
provider: acme
provider_source: com.acme.AcmeProvider
label:
  en_US: Acme
configurate_methods:
  - predefined-model
supported_model_types:
  - llm
  - text-embedding
models:
  llm:
    source: com.acme.AcmeChat
    position: models/llm/_position.yaml
    predefined:
      - "models/llm/*.yaml"
  text-embedding:
    source: com.acme.AcmeEmbedding
    predefined:
      - "models/embedding/*.yaml"
provider_credential_schema:
  credential_form_schemas:
    - variable: api_key
      type: secret-input
      required: true
      label:
        en_US: API Key
      placeholder:
        en_US: Enter your key
    - variable: endpoint
      type: text-input
      required: false
      label:
        en_US: Endpoint
help:
  title:
    en_US: Get a key
  url:
    en_US: https://acme.example/keys
"#;

    #[test]
    fn manifest_accepts_grouped_plugin_lists() {
        let yaml = r#"
id: acme
name: acme
version: 1.2.0
type: model
plugins:
  models:
    - provider/acme.yaml
resource:
  memory: 1048576
  permission:
    model:
      enabled: true
      llm: true
"#;
        let manifest = parse_manifest_str(yaml, "manifest.yaml").unwrap();
        assert_eq!(manifest.plugin_type, PluginType::Model);
        assert_eq!(manifest.provider_refs, vec!["provider/acme.yaml"]);
        assert_eq!(manifest.resources.memory, Some(1_048_576));
        assert!(manifest.resources.permission.model.allows(ModelType::Chat));
        assert!(!manifest.resources.permission.model.allows(ModelType::Embedding));
    }

    #[test]
    fn manifest_rejects_unknown_type() {
        let err = parse_manifest_str("id: x\ntype: widget\n", "manifest.yaml").unwrap_err();
        assert!(err.to_string().contains("widget"));
    }

    #[test]
    fn manifest_label_falls_back_to_name() {
        let manifest = parse_manifest_str("id: x\nname: Plain Name\n", "manifest.yaml").unwrap();
        assert_eq!(manifest.display_label("fr_FR"), "Plain Name");
    }

    #[test]
    fn provider_maps_model_blocks_and_schema() {
        let provider = parse_provider_str(PROVIDER, "provider/acme.yaml").unwrap();
        assert_eq!(provider.provider_name, "acme");
        assert_eq!(
            provider.supported_model_types,
            vec![ModelType::Chat, ModelType::Embedding]
        );
        assert_eq!(
            provider.configuration_methods,
            vec![ConfigurationMethod::Predefined]
        );
        let chat = &provider.model_configs[&ModelType::Chat];
        assert_eq!(chat.handler_implementation, "com.acme.AcmeChat");
        assert_eq!(provider.required_credentials().count(), 1);
        assert_eq!(
            provider.help.as_ref().and_then(|h| h.url.resolve("en_US")),
            Some("https://acme.example/keys")
        );
    }

    #[test]
    fn credential_schema_keeps_order_and_required_flags() {
        let provider = parse_provider_str(PROVIDER, "provider/acme.yaml").unwrap();
        let yaml = serde_yaml::to_string(&provider.credential_schema).unwrap();
        let reparsed: Vec<CredentialField> = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(reparsed, provider.credential_schema);
        let order: Vec<_> = reparsed.iter().map(|f| (f.variable.as_str(), f.required)).collect();
        assert_eq!(order, vec![("api_key", true), ("endpoint", false)]);
    }

    #[test]
    fn provider_rejects_unknown_model_type() {
        let yaml = "provider: x\nsupported_model_types: [hologram]\n";
        assert!(parse_provider_str(yaml, "p.yaml").is_err());
    }

    #[test]
    fn model_definition_rejects_duplicate_rules() {
        let yaml = r#"
model: acme-1
model_type: llm
parameter_rules:
  - key: temperature
  - key: temperature
"#;
        let err = parse_model_definition_str(yaml, "m.yaml", "acme").unwrap_err();
        assert!(err.to_string().contains("duplicate parameter rule"));
    }

    #[test]
    fn wildcard_detection() {
        assert!(has_wildcard("models/*.yaml"));
        assert!(!has_wildcard("models/a.yaml"));
    }
}
