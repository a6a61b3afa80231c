// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for plugin bundles written to disk as directories or ZIP files.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::FileOptions;

/// A tiny unit exporting `health() -> i32` returning 1.
pub const HEALTHY_UNIT_WAT: &str = r#"(module
    (func (export "health") (result i32) (i32.const 1)))"#;

/// A unit whose `_initialize` sets a global read back by `ready()`.
pub const INITIALIZED_UNIT_WAT: &str = r#"(module
    (global $ready (mut i32) (i32.const 0))
    (func (export "_initialize") (global.set $ready (i32.const 1)))
    (func (export "ready") (result i32) (global.get $ready)))"#;

/// In-memory file tree that can be written out as a bundle.
#[derive(Debug, Clone, Default)]
pub struct BundleBuilder {
    files: BTreeMap<String, Vec<u8>>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(name.to_string(), content.into());
        self
    }

    /// Add a WebAssembly unit compiled from WAT text.
    pub fn wasm(self, name: &str, wat_source: &str) -> Self {
        let bytes = wat::parse_str(wat_source).expect("fixture WAT must be valid");
        self.file(name, bytes)
    }

    pub fn without(mut self, name: &str) -> Self {
        self.files.remove(name);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Write the tree under `root` and return `root`.
    pub fn write_dir(&self, root: &Path) -> PathBuf {
        for (name, content) in &self.files {
            let path = root.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("create fixture directory");
            }
            std::fs::write(&path, content).expect("write fixture file");
        }
        root.to_path_buf()
    }

    /// Write the tree as a ZIP archive at `path` and return `path`.
    pub fn write_zip(&self, path: &Path) -> PathBuf {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture directory");
        }
        std::fs::write(path, self.zip_bytes()).expect("write fixture archive");
        path.to_path_buf()
    }

    /// The tree encoded as a ZIP archive.
    pub fn zip_bytes(&self) -> Vec<u8> {
        let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, content) in &self.files {
            writer
                .start_file(name.as_str(), FileOptions::default())
                .expect("start zip entry");
            writer.write_all(content).expect("write zip entry");
        }
        writer.finish().expect("finish zip").into_inner()
    }
}

/// Manifest YAML for a MODEL plugin referencing `provider/acme.yaml`.
pub fn model_manifest(id: &str, version: &str) -> String {
    format!(
        r#"id: {id}
name: {id}
version: {version}
author: acme
type: MODEL
plugin_class: acme.AcmePlugin
icon: icon.svg
label:
  en_US: Acme Models
description:
  en_US: Chat models from Acme
plugins:
  - provider/acme.yaml
resource:
  memory: 16777216
  permission:
    model:
      enabled: true
      llm: true
"#
    )
}

/// Provider descriptor for namespace `acme` supporting chat only.
pub const ACME_PROVIDER: &str = r#"provider: acme
provider_source: acme.AcmeProvider
label:
  en_US: Acme
icon_small:
  en_US: icon.svg
configurate_methods:
  - predefined-model
supported_model_types:
  - llm
models:
  llm:
    source: acme.AcmeChat
    predefined:
      - "models/llm/*.yaml"
provider_credential_schema:
  credential_form_schemas:
    - variable: api_key
      type: secret-input
      required: true
      label:
        en_US: API Key
"#;

pub const ACME_CHAT_MODEL: &str = r#"model: acme-chat
model_type: llm
label:
  en_US: Acme Chat
features:
  - stream
model_properties:
  context_size: 8192
parameter_rules:
  - name: temperature
    type: float
    default: 0.7
    min: 0.0
    max: 2.0
"#;

/// A complete, installable MODEL bundle with plugin, provider and chat units.
pub fn acme_bundle(id: &str, version: &str) -> BundleBuilder {
    BundleBuilder::new()
        .file("manifest.yaml", model_manifest(id, version))
        .file("provider/acme.yaml", ACME_PROVIDER)
        .file("models/llm/acme-chat.yaml", ACME_CHAT_MODEL)
        .file("_assets/icon.svg", "<svg xmlns=\"http://www.w3.org/2000/svg\"/>")
        .wasm("units/acme/AcmePlugin.wasm", INITIALIZED_UNIT_WAT)
        .wasm("units/acme/AcmeProvider.wasm", HEALTHY_UNIT_WAT)
        .wasm("units/acme/AcmeChat.wasm", HEALTHY_UNIT_WAT)
}
