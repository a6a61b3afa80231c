// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A load context: the isolated unit table for one bundle.
//!
//! Creating a context opens the bundle, compiles every `*.wasm` module it
//! contains with a context-private [`Engine`], and registers one named
//! constructor per module. An archive context sees only its own modules.
//! A directory context (development mode) also opens every archive found
//! under the directory and merges their modules into one table.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use modelplug_core::{ImplementationUnit, LoadError};
use modelplug_descriptor::bundle::is_archive;
use modelplug_descriptor::{Bundle, BundleKind};
use tracing::{debug, warn};
use wasmtime::{Engine, Module};

use crate::host::{HostSurface, UnitConstructor};
use crate::wasm::{WasmUnit, unit_engine};

/// Extension of compiled implementation units.
pub const UNIT_EXTENSION: &str = ".wasm";

/// Path prefixes treated as code roots and dropped from unit names.
pub const CODE_ROOTS: &[&str] = &["units/", "lib/"];

pub const DEFAULT_UNIT_FUEL: u64 = 1_000_000_000;

/// Settings applied when a context instantiates units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Linear memory ceiling per unit instance, in bytes.
    pub max_unit_memory_bytes: usize,
    /// Fuel granted to `_initialize` and to each exported call.
    pub unit_fuel: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            max_unit_memory_bytes: 64 * 1024 * 1024,
            unit_fuel: DEFAULT_UNIT_FUEL,
        }
    }
}

/// Unit table and open bundle handles for one bundle path.
pub struct LoadContext {
    bundle_path: PathBuf,
    kind: BundleKind,
    host: HostSurface,
    constructors: HashMap<String, UnitConstructor>,
    bundles: Mutex<Vec<Bundle>>,
    released: AtomicBool,
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("bundle_path", &self.bundle_path)
            .field("kind", &self.kind)
            .field("units", &self.unit_names())
            .field("released", &self.is_released())
            .finish()
    }
}

impl LoadContext {
    /// Open `bundle_path` and build its unit table. Blocking.
    pub fn create(
        bundle_path: &Path,
        host: HostSurface,
        options: LoadOptions,
    ) -> Result<Self, LoadError> {
        let unreadable = |message: String| LoadError::BundleUnreadable {
            plugin_id: None,
            bundle: bundle_path.to_path_buf(),
            message,
        };

        let root = Bundle::open(bundle_path).map_err(|e| unreadable(e.to_string()))?;
        let kind = root.kind();

        let mut bundles = Vec::new();
        if kind == BundleKind::Directory {
            for nested in root.files().iter().filter(|f| !f.ends_with(UNIT_EXTENSION)) {
                let path = bundle_path.join(nested);
                if !is_archive(&path) {
                    continue;
                }
                match Bundle::open(&path) {
                    Ok(bundle) => bundles.push(bundle),
                    Err(e) => warn!(bundle = %path.display(), error = %e, "skipping unreadable nested archive"),
                }
            }
        }
        bundles.insert(0, root);

        let engine = unit_engine().map_err(|e| unreadable(format!("{e:#}")))?;
        let mut constructors = HashMap::new();
        for bundle in &bundles {
            for file in bundle.files().iter().filter(|f| f.ends_with(UNIT_EXTENSION)) {
                let Some(name) = unit_name(file) else {
                    continue;
                };
                if constructors.contains_key(&name) {
                    warn!(unit = %name, bundle = %bundle.path().display(), "duplicate unit name, keeping the first");
                    continue;
                }
                let constructor = compile_unit(&engine, bundle, file, &name, bundle_path, options);
                constructors.insert(name, constructor);
            }
        }

        debug!(
            bundle = %bundle_path.display(),
            units = constructors.len(),
            archives = bundles.len(),
            "created load context"
        );

        Ok(Self {
            bundle_path: bundle_path.to_path_buf(),
            kind,
            host,
            constructors,
            bundles: Mutex::new(bundles),
            released: AtomicBool::new(false),
        })
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    pub fn kind(&self) -> BundleKind {
        self.kind
    }

    /// Names of the units packaged in this context, sorted. Host units are
    /// not included.
    pub fn unit_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether `name` resolves here, from the host or the bundle.
    pub fn contains_unit(&self, name: &str) -> bool {
        self.host.contains(name) || self.constructors.contains_key(name)
    }

    /// Build a fresh instance of `name`. Host units are looked up first.
    pub fn construct(&self, name: &str) -> Result<Arc<dyn ImplementationUnit>, LoadError> {
        if self.is_released() {
            return Err(LoadError::Released {
                plugin_id: None,
                bundle: self.bundle_path.clone(),
            });
        }

        let result = match self.host.construct(name) {
            Some(result) => result,
            None => match self.constructors.get(name) {
                Some(constructor) => constructor(),
                None => {
                    return Err(LoadError::UnitNotFound {
                        plugin_id: None,
                        bundle: self.bundle_path.clone(),
                        unit: name.to_string(),
                    });
                }
            },
        };

        result.map_err(|message| LoadError::Instantiation {
            plugin_id: None,
            bundle: self.bundle_path.clone(),
            unit: name.to_string(),
            message,
        })
    }

    /// Read a non-code resource from the bundle (or, in directory mode, the
    /// first nested archive that has it).
    pub fn read_resource(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let bundles = self.bundles.lock().map_err(|_| LoadError::BundleUnreadable {
            plugin_id: None,
            bundle: self.bundle_path.clone(),
            message: "bundle handles poisoned".to_string(),
        })?;
        if bundles.is_empty() {
            return Err(LoadError::Released {
                plugin_id: None,
                bundle: self.bundle_path.clone(),
            });
        }
        let bundle = bundles
            .iter()
            .find(|b| b.contains(path))
            .unwrap_or(&bundles[0]);
        bundle.read(path).map_err(|e| LoadError::BundleUnreadable {
            plugin_id: None,
            bundle: self.bundle_path.clone(),
            message: e.to_string(),
        })
    }

    /// Close every bundle handle. Further construction fails with
    /// [`LoadError::Released`]. Idempotent.
    pub fn close(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut bundles) = self.bundles.lock() {
            bundles.clear();
        }
        debug!(bundle = %self.bundle_path.display(), "closed load context");
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Derive a unit name from its path inside a bundle:
/// `units/com/acme/Chat.wasm` becomes `com.acme.Chat`.
pub fn unit_name(path: &str) -> Option<String> {
    let stem = path.strip_suffix(UNIT_EXTENSION)?;
    let stem = CODE_ROOTS
        .iter()
        .find_map(|root| stem.strip_prefix(root))
        .unwrap_or(stem);
    if stem.is_empty() || stem.split('/').any(str::is_empty) {
        return None;
    }
    Some(stem.replace('/', "."))
}

fn compile_unit(
    engine: &Engine,
    bundle: &Bundle,
    file: &str,
    name: &str,
    context_path: &Path,
    options: LoadOptions,
) -> UnitConstructor {
    let compiled = bundle
        .read(file)
        .map_err(|e| e.to_string())
        .and_then(|bytes| Module::new(engine, bytes).map_err(|e| format!("{e:#}")));

    match compiled {
        Ok(module) => {
            let engine = engine.clone();
            let name = name.to_string();
            let bundle_path = context_path.to_path_buf();
            let constructor: UnitConstructor = Arc::new(move || {
                WasmUnit::instantiate(
                    &engine,
                    &module,
                    &name,
                    bundle_path.clone(),
                    options.max_unit_memory_bytes,
                    options.unit_fuel,
                )
                .map(|unit| Arc::new(unit) as Arc<dyn ImplementationUnit>)
                .map_err(|e| format!("{e:#}"))
            });
            constructor
        }
        Err(message) => {
            warn!(unit = %name, file = %file, error = %message, "unit failed to compile");
            let constructor: UnitConstructor = Arc::new(move || Err(message.clone()));
            constructor
        }
    }
}
