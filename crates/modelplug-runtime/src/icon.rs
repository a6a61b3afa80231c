// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted plugin icons.

use std::path::{Path, PathBuf};

use modelplug_core::{InstallError, RuntimeError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::source::{encode_segment, sanitize_segment};

/// Icon bytes with the content type to serve them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconAsset {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Stores icons under `<icons_dir>/<encoded plugin_id>/<unique>-<filename>`.
#[derive(Debug, Clone)]
pub struct IconService {
    root: PathBuf,
}

impl IconService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable access path for a plugin's icon, with the id percent-encoded.
    pub fn access_path(plugin_id: &str) -> String {
        format!("/plugins/{}/icon", encode_segment(plugin_id))
    }

    /// Content type for an icon file name.
    pub fn content_type(filename: &str) -> &'static str {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("svg") => "image/svg+xml",
            Some("png") => "image/png",
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            Some("ico") => "image/x-icon",
            _ => "application/octet-stream",
        }
    }

    /// Write icon bytes and return the stored path.
    ///
    /// Every call gets its own file, so a replacing install never touches
    /// the icon of the generation it replaces.
    pub async fn store(&self, plugin_id: &str, filename: &str, bytes: &[u8]) -> Result<PathBuf, RuntimeError> {
        let name = Path::new(filename)
            .file_name()
            .map(|n| sanitize_segment(&n.to_string_lossy()))
            .unwrap_or_else(|| "icon".to_string());
        let dir = self.plugin_dir(plugin_id);
        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
        let path = dir.join(format!("{}-{name}", Uuid::new_v4().simple()));
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;
        debug!(plugin_id, path = %path.display(), "stored plugin icon");
        Ok(path)
    }

    /// Read a stored icon. A missing file is `NotFound` for `plugin_id`.
    pub async fn load(&self, plugin_id: &str, stored: &Path) -> Result<IconAsset, RuntimeError> {
        let bytes = match tokio::fs::read(stored).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RuntimeError::NotFound {
                    plugin_id: format!("{plugin_id} (icon)"),
                });
            }
            Err(e) => return Err(io_err(e)),
        };
        let name = stored
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(IconAsset {
            bytes,
            content_type: Self::content_type(&name),
        })
    }

    /// Delete one stored icon, and its plugin directory once empty.
    ///
    /// Paths outside the icons directory are left alone. Failures are logged.
    pub async fn discard(&self, stored: &Path) {
        if !stored.starts_with(&self.root) {
            warn!(path = %stored.display(), "not discarding icon outside the icons directory");
            return;
        }
        match tokio::fs::remove_file(stored).await {
            Ok(()) => debug!(path = %stored.display(), "removed plugin icon"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %stored.display(), error = %e, "failed to remove plugin icon"),
        }
        if let Some(dir) = stored.parent()
            && dir != self.root
        {
            // Fails while other generations' icons remain.
            let _ = tokio::fs::remove_dir(dir).await;
        }
    }

    fn plugin_dir(&self, plugin_id: &str) -> PathBuf {
        self.root.join(encode_segment(plugin_id))
    }
}

fn io_err(e: std::io::Error) -> RuntimeError {
    InstallError::Extraction {
        message: format!("icon storage: {e}"),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(IconService::content_type("icon.SVG"), "image/svg+xml");
        assert_eq!(IconService::content_type("a.jpeg"), "image/jpeg");
        assert_eq!(IconService::content_type("favicon.ico"), "image/x-icon");
        assert_eq!(IconService::content_type("blob"), "application/octet-stream");
    }

    #[tokio::test]
    async fn store_load_discard() {
        let dir = tempfile::tempdir().unwrap();
        let icons = IconService::new(dir.path());
        let path = icons.store("acme", "_assets/icon.png", b"\x89PNG").await.unwrap();
        assert_eq!(path.parent().unwrap(), dir.path().join("acme"));
        assert!(path.file_name().unwrap().to_string_lossy().ends_with("-icon.png"));

        let asset = icons.load("acme", &path).await.unwrap();
        assert_eq!(asset.content_type, "image/png");
        assert_eq!(asset.bytes, b"\x89PNG");

        icons.discard(&path).await;
        assert!(!path.exists());
        assert!(!dir.path().join("acme").exists());
        icons.discard(&path).await;
        assert_eq!(IconService::access_path("acme"), "/plugins/acme/icon");

        let err = icons.load("acme", &path).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn similar_ids_keep_their_own_icons() {
        let dir = tempfile::tempdir().unwrap();
        let icons = IconService::new(dir.path());
        let slashed = icons.store("acme/x", "icon.svg", b"<svg/>").await.unwrap();
        let underscored = icons.store("acme_x", "icon.svg", b"<svg></svg>").await.unwrap();
        assert_ne!(slashed.parent(), underscored.parent());

        icons.discard(&underscored).await;
        assert_eq!(icons.load("acme/x", &slashed).await.unwrap().bytes, b"<svg/>");

        let err = icons.load("acme_x", &underscored).await.unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn replacing_generation_keeps_older_icon_until_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let icons = IconService::new(dir.path());
        let old = icons.store("acme", "icon.svg", b"old").await.unwrap();
        let new = icons.store("acme", "icon.svg", b"new").await.unwrap();
        assert_ne!(old, new);
        assert_eq!(icons.load("acme", &old).await.unwrap().bytes, b"old");

        icons.discard(&old).await;
        assert_eq!(icons.load("acme", &new).await.unwrap().bytes, b"new");
    }

    #[tokio::test]
    async fn discard_ignores_paths_outside_root() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let file = outside.path().join("keep.svg");
        std::fs::write(&file, b"x").unwrap();

        IconService::new(root.path()).discard(&file).await;
        assert!(file.exists());
    }

    #[test]
    fn access_path_is_one_segment_per_id() {
        assert_eq!(IconService::access_path("acme/x"), "/plugins/acme%2Fx/icon");
        assert_eq!(IconService::access_path("acme@1"), "/plugins/acme%401/icon");
    }
}
