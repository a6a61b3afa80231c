// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Install sources and the on-disk layout of managed bundles.
//!
//! Uploaded and downloaded bundles are written to
//! `<plugins_dir>/.staging/<uuid>/<file>` first. Once the install commits
//! they move to `<plugins_dir>/<plugin_id>/<uuid>/<file>`. Bundles installed
//! from a local path are used in place and never deleted by the runtime.

use std::path::{Path, PathBuf};

use modelplug_core::{InstallError, RuntimeError};
use tracing::{debug, warn};
use uuid::Uuid;

const STAGING_DIR: &str = ".staging";

/// Where a bundle to install comes from.
#[derive(Debug, Clone)]
pub enum InstallSource {
    /// Raw bundle bytes, e.g. an upload.
    Stream { bytes: Vec<u8>, filename: String },
    /// A bundle directory or archive already on disk.
    Path(PathBuf),
    /// A bundle fetched over HTTP(S), optionally pinned to a SHA-256 digest.
    Url { url: String, sha256: Option<String> },
    /// A marketplace reference.
    Marketplace(String),
}

impl InstallSource {
    /// Short description used in logs and errors.
    pub fn describe(&self) -> String {
        match self {
            InstallSource::Stream { filename, .. } => format!("upload {filename}"),
            InstallSource::Path(path) => format!("path {}", path.display()),
            InstallSource::Url { url, .. } => format!("url {url}"),
            InstallSource::Marketplace(reference) => format!("marketplace {reference}"),
        }
    }
}

/// Knobs for a single install.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InstallOptions {
    /// Replace an installed plugin with the same id instead of failing.
    pub replace: bool,
}

impl InstallOptions {
    pub fn replace() -> Self {
        Self { replace: true }
    }
}

/// A bundle ready to be parsed.
#[derive(Debug, Clone)]
pub struct StagedBundle {
    /// The bundle file or directory.
    pub path: PathBuf,
    /// Directory owned by the runtime, removed if the install fails.
    pub owned_dir: Option<PathBuf>,
}

impl StagedBundle {
    pub fn is_managed(&self) -> bool {
        self.owned_dir.is_some()
    }
}

/// Manages bundle files under the plugins directory.
#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` to a fresh staging directory.
    pub async fn stage_bytes(&self, bytes: &[u8], filename: &str) -> Result<StagedBundle, RuntimeError> {
        let name = file_name_of(filename)?;
        let dir = self.root.join(STAGING_DIR).join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| extraction(format!("cannot create {}: {e}", dir.display())))?;
        let path = dir.join(&name);
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(extraction(format!("cannot write {}: {e}", path.display())));
        }
        debug!(path = %path.display(), bytes = bytes.len(), "staged bundle");
        Ok(StagedBundle {
            path,
            owned_dir: Some(dir),
        })
    }

    /// Use a local bundle where it is.
    pub async fn use_in_place(&self, path: &Path) -> Result<StagedBundle, RuntimeError> {
        let exists = tokio::fs::try_exists(path).await.unwrap_or(false);
        if !exists {
            return Err(InstallError::UnsupportedSource {
                reference: format!("{} does not exist", path.display()),
            }
            .into());
        }
        let path = tokio::fs::canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        Ok(StagedBundle {
            path,
            owned_dir: None,
        })
    }

    /// Move a staged bundle to its permanent location for `plugin_id`.
    ///
    /// In-place bundles are returned unchanged.
    pub async fn promote(&self, staged: &StagedBundle, plugin_id: &str) -> Result<PathBuf, RuntimeError> {
        let Some(owned) = &staged.owned_dir else {
            return Ok(staged.path.clone());
        };
        let generation = owned
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let target_dir = self.root.join(encode_segment(plugin_id)).join(generation);
        if let Some(parent) = target_dir.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| extraction(format!("cannot create {}: {e}", parent.display())))?;
        }
        tokio::fs::rename(owned, &target_dir)
            .await
            .map_err(|e| extraction(format!("cannot move bundle into {}: {e}", target_dir.display())))?;

        let relative = staged.path.strip_prefix(owned).unwrap_or(&staged.path);
        Ok(target_dir.join(relative))
    }

    /// Remove a staging directory left by a failed install.
    pub async fn discard(&self, staged: &StagedBundle) {
        if let Some(dir) = &staged.owned_dir
            && let Err(e) = tokio::fs::remove_dir_all(dir).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(dir = %dir.display(), error = %e, "failed to discard staged bundle");
        }
    }

    /// Whether `bundle_path` lives in a runtime-managed directory.
    pub fn is_managed(&self, bundle_path: &Path) -> bool {
        self.generation_dir(bundle_path).is_some()
    }

    /// Delete a managed bundle and its plugin directory when empty.
    ///
    /// Returns false for bundles the runtime does not own.
    pub async fn remove_managed(&self, bundle_path: &Path) -> Result<bool, RuntimeError> {
        let Some(generation) = self.generation_dir(bundle_path) else {
            return Ok(false);
        };
        tokio::fs::remove_dir_all(&generation)
            .await
            .map_err(|e| extraction(format!("cannot remove {}: {e}", generation.display())))?;
        if let Some(plugin_dir) = generation.parent() {
            // Fails harmlessly while other generations remain.
            let _ = tokio::fs::remove_dir(plugin_dir).await;
        }
        Ok(true)
    }

    /// `<root>/<plugin>/<generation>` containing `bundle_path`, if any.
    fn generation_dir(&self, bundle_path: &Path) -> Option<PathBuf> {
        let relative = bundle_path.strip_prefix(&self.root).ok()?;
        let mut parts = relative.components();
        let plugin = parts.next()?.as_os_str().to_str()?;
        let generation = parts.next()?.as_os_str();
        if plugin == STAGING_DIR || plugin.starts_with('.') || parts.next().is_none() {
            return None;
        }
        Some(self.root.join(plugin).join(generation))
    }
}

/// Percent-encode a plugin id into one path segment.
///
/// Distinct ids always produce distinct segments. Only ASCII alphanumerics,
/// `-`, `_` and non-leading `.` pass through unchanged.
pub fn encode_segment(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let mut out = String::with_capacity(raw.len());
    for (i, byte) in raw.bytes().enumerate() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') || (byte == b'.' && i > 0) {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// Replace characters that are unsafe in a single path segment.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

fn file_name_of(filename: &str) -> Result<String, RuntimeError> {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or("");
    if base.is_empty() || base == "." || base == ".." {
        return Err(InstallError::UnsupportedSource {
            reference: format!("invalid bundle filename `{filename}`"),
        }
        .into());
    }
    Ok(sanitize_segment(base))
}

fn extraction(message: String) -> RuntimeError {
    InstallError::Extraction { message }.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_ids_into_single_segments() {
        assert_eq!(sanitize_segment("acme/openai@1"), "acme_openai_1");
        assert_eq!(sanitize_segment(".."), "_");
        assert_eq!(sanitize_segment("com.acme.chat"), "com.acme.chat");
    }

    #[test]
    fn encoded_ids_never_collide() {
        assert_eq!(encode_segment("acme/x"), "acme%2Fx");
        assert_eq!(encode_segment("acme_x"), "acme_x");
        assert_eq!(encode_segment("acme%2Fx"), "acme%252Fx");
        assert_eq!(encode_segment("acme@1.0"), "acme%401.0");
        assert_eq!(encode_segment(".staging"), "%2Estaging");
        assert_eq!(encode_segment(".."), "%2E.");
    }

    #[test]
    fn filename_keeps_only_the_last_segment() {
        assert_eq!(file_name_of("../../etc/acme.zip").unwrap(), "acme.zip");
        assert!(file_name_of("dir/").is_err());
    }

    #[tokio::test]
    async fn staged_bundle_moves_under_plugin_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let staged = store.stage_bytes(b"PK\x05\x06", "acme.zip").await.unwrap();
        assert!(!store.is_managed(&staged.path));

        let final_path = store.promote(&staged, "acme").await.unwrap();
        assert!(final_path.starts_with(dir.path().join("acme")));
        assert!(final_path.ends_with("acme.zip"));
        assert!(store.is_managed(&final_path));
        assert!(!staged.path.exists());

        assert!(store.remove_managed(&final_path).await.unwrap());
        assert!(!dir.path().join("acme").exists());
    }

    #[tokio::test]
    async fn ids_that_sanitize_alike_get_separate_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path());
        let first = store.stage_bytes(b"PK\x05\x06", "a.zip").await.unwrap();
        let second = store.stage_bytes(b"PK\x05\x06", "a.zip").await.unwrap();

        let slashed = store.promote(&first, "acme/x").await.unwrap();
        let underscored = store.promote(&second, "acme_x").await.unwrap();
        assert!(slashed.starts_with(dir.path().join("acme%2Fx")));
        assert!(underscored.starts_with(dir.path().join("acme_x")));
        assert!(store.is_managed(&slashed));

        store.remove_managed(&slashed).await.unwrap();
        assert!(underscored.exists());
    }

    #[tokio::test]
    async fn in_place_bundles_are_not_managed() {
        let dir = tempfile::tempdir().unwrap();
        let store = BundleStore::new(dir.path().join("plugins"));
        let staged = store.use_in_place(dir.path()).await.unwrap();
        assert!(!staged.is_managed());
        assert!(!store.is_managed(&staged.path));
        assert_eq!(store.promote(&staged, "acme").await.unwrap(), staged.path);

        let missing = store.use_in_place(&dir.path().join("nope")).await;
        assert_eq!(missing.unwrap_err().kind(), "install_error");
    }
}
