// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end parsing of bundles laid out on disk.

use std::io::Write;
use std::path::Path;

use modelplug_core::{ModelType, ParseError, PluginType, RuntimeError};
use modelplug_descriptor::{
    Bundle, extract_icon, load_bundle, parse_manifest, parse_model_definitions, parse_provider,
};

const MANIFEST: &str = r#"
id: acme-models
name: acme
version: 0.3.1
author: acme
type: MODEL
icon: icon.svg
label:
  en_US: Acme Models
plugins:
  - provider/acme.yaml
"#;

const PROVIDER: &str = r#"
provider: acme
provider_source: acme.provider
supported_model_types: [llm, text-embedding]
configurate_methods: [predefined-model]
models:
  llm:
    source: acme.chat
    position: models/llm/_position.yaml
    predefined: ["models/llm/*.yaml"]
  text-embedding:
    source: acme.embedding
    predefined: ["models/embedding/*.yaml", "models/embedding/missing.yaml"]
"#;

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (name, content) in files {
        let path = root.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

fn acme_files() -> Vec<(&'static str, &'static str)> {
    vec![
        ("manifest.yaml", MANIFEST),
        ("provider/acme.yaml", PROVIDER),
        ("_assets/icon.svg", "<svg/>"),
        ("models/llm/_position.yaml", "- acme-large\n- acme-small\n"),
        ("models/llm/small.yaml", "model: acme-small\nmodel_type: llm\nfeatures: [tool-call]\n"),
        (
            "models/llm/large.yaml",
            "model: acme-large\nmodel_type: llm\nmodel_properties:\n  context_size: 128000\nparameter_rules:\n  - name: temperature\n    use_template: temperature\n",
        ),
        ("models/llm/broken.yaml", "model: [unterminated\n"),
        ("models/embedding/embed.yaml", "model: acme-embed\nmodel_type: text-embedding\n"),
    ]
}

#[test]
fn directory_bundle_parses_with_partial_model_failures() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &acme_files());

    let bundle = Bundle::open(dir.path()).unwrap();
    let manifest = parse_manifest(&bundle).unwrap();
    assert_eq!(manifest.id, "acme-models");
    assert_eq!(manifest.plugin_type, PluginType::Model);
    assert_eq!(manifest.bundle_path, dir.path());

    let provider = parse_provider(&bundle, &manifest.provider_refs[0]).unwrap();
    let batch = parse_model_definitions(&provider, &bundle);

    let chat: Vec<_> = batch.of_type(ModelType::Chat).map(|d| d.model_id.as_str()).collect();
    assert_eq!(chat, vec!["acme-large", "acme-small"]);
    assert!(batch.find("acme-embed").is_some());

    let mut failed: Vec<_> = batch.failures.iter().map(|f| f.path.as_str()).collect();
    failed.sort();
    assert_eq!(failed, vec!["models/embedding/missing.yaml", "models/llm/broken.yaml"]);
}

#[test]
fn parameter_rules_accept_name_alias_for_key() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &acme_files());

    let parsed = load_bundle(dir.path()).unwrap();
    let large = parsed.models.find("acme-large").unwrap();
    let rule = large.parameter("temperature").unwrap();
    assert_eq!(rule.use_template.as_deref(), Some("temperature"));
    assert_eq!(large.model_properties["context_size"], 128000);
}

#[test]
fn archive_bundle_parses_like_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acme.zip");
    let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    for (name, content) in acme_files() {
        writer
            .start_file(name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();

    let parsed = load_bundle(&path).unwrap();
    assert_eq!(parsed.providers.len(), 1);
    assert_eq!(parsed.models.definitions.len(), 3);

    let bundle = Bundle::open(&path).unwrap();
    assert_eq!(extract_icon(&bundle, "icon.svg").unwrap().unwrap(), b"<svg/>");
}

#[test]
fn provider_without_block_for_supported_type_fails_validation() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("manifest.yaml", MANIFEST),
            (
                "provider/acme.yaml",
                "provider: acme\nprovider_source: acme.provider\nsupported_model_types: [llm, text-embedding]\nmodels:\n  llm:\n    source: acme.chat\n",
            ),
        ],
    );

    let err = load_bundle(dir.path()).unwrap_err();
    let RuntimeError::Validation(validation) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(validation.issues[0].contains("embedding"));
    assert_eq!(err.kind(), "validation_error");
}

#[test]
fn missing_manifest_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(dir.path(), &[("README.md", "hi")]);

    let bundle = Bundle::open(dir.path()).unwrap();
    assert!(matches!(
        parse_manifest(&bundle),
        Err(ParseError::MissingManifest { .. })
    ));
}
