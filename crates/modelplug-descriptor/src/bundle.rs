// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read access to a plugin bundle, whether it is a ZIP archive or a
//! directory exposing the same layout.
//!
//! Paths inside a bundle are always relative and `/`-separated. The file
//! listing is sorted and excludes directory entries.

use std::fs::File;
use std::io::Read;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;

use modelplug_core::ParseError;
use zip::ZipArchive;

/// Well-known manifest file names, checked in order at the bundle root.
pub const MANIFEST_FILES: &[&str] = &["manifest.yaml", "manifest.yml"];

/// Largest file a bundle will hand out, after decompression.
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Upper bound on what a declared entry size may pre-allocate.
const PREALLOC_LIMIT: u64 = 1024 * 1024;

const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";
const ZIP_EMPTY_MAGIC: &[u8; 4] = b"PK\x05\x06";

/// How a bundle is stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    Directory,
    Archive,
}

enum Source {
    Directory(PathBuf),
    Archive(Mutex<ZipArchive<File>>),
}

/// An opened plugin bundle. Archive bundles keep their file handle open
/// until the bundle is dropped.
pub struct Bundle {
    path: PathBuf,
    files: Vec<String>,
    source: Source,
    max_entry_bytes: u64,
}

impl std::fmt::Debug for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundle")
            .field("path", &self.path)
            .field("kind", &self.kind())
            .field("files", &self.files.len())
            .finish()
    }
}

impl Bundle {
    /// Open a directory or ZIP archive as a bundle.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let path = path.as_ref().to_path_buf();
        let bundle_err = |message: String| ParseError::Bundle {
            bundle: path.clone(),
            message,
        };

        let meta = std::fs::metadata(&path).map_err(|e| bundle_err(e.to_string()))?;
        if meta.is_dir() {
            let mut files = list_directory(&path).map_err(|e| bundle_err(e.to_string()))?;
            files.sort();
            return Ok(Self {
                source: Source::Directory(path.clone()),
                path,
                files,
                max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
            });
        }

        if !is_archive(&path) {
            return Err(bundle_err("not a directory or ZIP archive".to_string()));
        }

        let file = File::open(&path).map_err(|e| bundle_err(e.to_string()))?;
        let mut archive = ZipArchive::new(file).map_err(|e| bundle_err(e.to_string()))?;
        let mut files = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index(index)
                .map_err(|e| bundle_err(e.to_string()))?;
            if entry.is_dir() || entry.enclosed_name().is_none() {
                continue;
            }
            files.push(normalize(entry.name()));
        }
        files.sort();
        files.dedup();

        Ok(Self {
            source: Source::Archive(Mutex::new(archive)),
            path,
            files,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        })
    }

    /// Refuse to read files larger than `limit` bytes.
    pub fn with_max_entry_bytes(mut self, limit: u64) -> Self {
        self.max_entry_bytes = limit;
        self
    }

    /// Location of the bundle on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> BundleKind {
        match self.source {
            Source::Directory(_) => BundleKind::Directory,
            Source::Archive(_) => BundleKind::Archive,
        }
    }

    /// Sorted listing of every file in the bundle.
    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.binary_search_by(|f| f.as_str().cmp(name)).is_ok()
    }

    /// The manifest file name present at the root, if any.
    pub fn manifest_file(&self) -> Option<&'static str> {
        MANIFEST_FILES.iter().copied().find(|m| self.contains(m))
    }

    /// Read one file's bytes.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, ParseError> {
        let name = normalize(name);
        let read_err = |message: String| ParseError::Read {
            path: name.clone(),
            message,
        };

        if !self.contains(&name) {
            return Err(read_err("no such file in bundle".to_string()));
        }

        let limit = self.max_entry_bytes;
        let too_large = || read_err(format!("file exceeds the {limit} byte limit"));
        let mut buf = Vec::new();
        match &self.source {
            Source::Directory(root) => {
                let file = File::open(root.join(&name)).map_err(|e| read_err(e.to_string()))?;
                file.take(limit.saturating_add(1))
                    .read_to_end(&mut buf)
                    .map_err(|e| read_err(e.to_string()))?;
            }
            Source::Archive(archive) => {
                let mut archive = archive
                    .lock()
                    .map_err(|_| read_err("archive handle poisoned".to_string()))?;
                let entry = archive
                    .by_name(&name)
                    .map_err(|e| read_err(e.to_string()))?;
                // The declared size comes from the archive and is not trusted.
                if entry.size() > limit {
                    return Err(too_large());
                }
                buf.reserve(entry.size().min(PREALLOC_LIMIT) as usize);
                entry
                    .take(limit.saturating_add(1))
                    .read_to_end(&mut buf)
                    .map_err(|e| read_err(e.to_string()))?;
            }
        }
        if buf.len() as u64 > limit {
            return Err(too_large());
        }
        Ok(buf)
    }

    /// Read one file as UTF-8 text.
    pub fn read_to_string(&self, name: &str) -> Result<String, ParseError> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes).map_err(|e| ParseError::Read {
            path: normalize(name),
            message: e.to_string(),
        })
    }
}

/// True when the file starts with a ZIP local-file or empty-archive header.
pub fn is_archive(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| &magic == ZIP_MAGIC || &magic == ZIP_EMPTY_MAGIC)
        .unwrap_or(false)
}

/// Strip a leading `./` or `/` and convert `\` separators.
pub fn normalize(name: &str) -> String {
    let name = name.replace('\\', "/");
    name.trim_start_matches("./").trim_start_matches('/').to_string()
}

fn list_directory(root: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                let parts: Vec<_> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
    }

    Ok(files)
}
