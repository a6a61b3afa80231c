// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error taxonomy for the plugin runtime.
//!
//! Each layer reports its own error type (parse, validation, load, install,
//! dispatch). [`RuntimeError`] is the umbrella returned by lifecycle and
//! registry operations and can be tagged with the plugin id and the
//! [`LifecyclePhase`] in which the failure happened.

use std::path::PathBuf;
use std::time::Duration;

use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::{ModelType, PluginStatus};

/// A bundle or descriptor file could not be read or understood.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The bundle has no manifest at its root.
    #[error("bundle {bundle} has no manifest.yaml at its root")]
    MissingManifest { bundle: PathBuf },

    /// The bundle itself (directory or archive) could not be opened.
    #[error("cannot open bundle {bundle}: {message}")]
    Bundle { bundle: PathBuf, message: String },

    /// A file inside the bundle could not be read.
    #[error("cannot read `{path}` from bundle: {message}")]
    Read { path: String, message: String },

    /// A descriptor file was read but its content is malformed.
    #[error("malformed `{path}`: {message}")]
    Malformed { path: String, message: String },

    /// A predefined-definition pattern is not a valid glob.
    #[error("invalid path pattern `{pattern}`: {message}")]
    Pattern { pattern: String, message: String },
}

impl ParseError {
    /// Convenience constructor for malformed-content errors.
    pub fn malformed(path: impl Into<String>, message: impl ToString) -> Self {
        ParseError::Malformed {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// A descriptor parsed correctly but is missing mandatory information.
///
/// Carries every issue found, not just the first one.
#[derive(Debug, Error)]
#[error("{subject} failed validation: {}", issues.join("; "))]
pub struct ValidationError {
    /// What was validated (manifest id, provider name, dependency graph).
    pub subject: String,
    /// Human-readable descriptions of each problem.
    pub issues: Vec<String>,
}

impl ValidationError {
    pub fn new(subject: impl Into<String>, issues: Vec<String>) -> Self {
        Self {
            subject: subject.into(),
            issues,
        }
    }

    pub fn single(subject: impl Into<String>, issue: impl Into<String>) -> Self {
        Self::new(subject, vec![issue.into()])
    }
}

/// An implementation unit could not be resolved from a load context.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bundle behind a load context cannot be opened.
    #[error("bundle {bundle} is unreadable: {message}")]
    BundleUnreadable {
        plugin_id: Option<String>,
        bundle: PathBuf,
        message: String,
    },

    /// No unit with the requested name exists in the context.
    #[error("implementation unit `{unit}` not found in bundle {bundle}")]
    UnitNotFound {
        plugin_id: Option<String>,
        bundle: PathBuf,
        unit: String,
    },

    /// The unit exists but constructing it failed.
    #[error("implementation unit `{unit}` in bundle {bundle} could not be instantiated: {message}")]
    Instantiation {
        plugin_id: Option<String>,
        bundle: PathBuf,
        unit: String,
        message: String,
    },

    /// The context was released while a resolution was in flight.
    #[error("load context for {bundle} has been released")]
    Released {
        plugin_id: Option<String>,
        bundle: PathBuf,
    },
}

impl LoadError {
    /// Attach the owning plugin id, keeping every other field.
    pub fn with_plugin_id(mut self, id: &str) -> Self {
        let slot = match &mut self {
            LoadError::BundleUnreadable { plugin_id, .. }
            | LoadError::UnitNotFound { plugin_id, .. }
            | LoadError::Instantiation { plugin_id, .. }
            | LoadError::Released { plugin_id, .. } => plugin_id,
        };
        *slot = Some(id.to_string());
        self
    }

    pub fn plugin_id(&self) -> Option<&str> {
        match self {
            LoadError::BundleUnreadable { plugin_id, .. }
            | LoadError::UnitNotFound { plugin_id, .. }
            | LoadError::Instantiation { plugin_id, .. }
            | LoadError::Released { plugin_id, .. } => plugin_id.as_deref(),
        }
    }

    /// The unit name involved, when the failure concerns a specific unit.
    pub fn unit(&self) -> Option<&str> {
        match self {
            LoadError::UnitNotFound { unit, .. } | LoadError::Instantiation { unit, .. } => {
                Some(unit)
            }
            _ => None,
        }
    }
}

/// An install could not complete. No registry record is left behind.
#[derive(Debug, Error)]
pub enum InstallError {
    /// A plugin with the same id is already installed.
    #[error("plugin `{plugin_id}` is already installed")]
    DuplicateId { plugin_id: String },

    /// The supplied source is not something the runtime can install from.
    #[error("unsupported install source: {reference}")]
    UnsupportedSource { reference: String },

    /// The bundle was fetched but is not a recognized plugin format.
    #[error("{path} is not a recognized plugin bundle: {message}")]
    UnrecognizedFormat { path: PathBuf, message: String },

    /// Downloading a remote bundle failed.
    #[error("download of {url} failed: {message}")]
    Download { url: String, message: String },

    /// Reading or staging the bundle contents failed.
    #[error("bundle extraction failed: {message}")]
    Extraction { message: String },

    /// A bounded install step did not finish in time.
    #[error("{step} timed out after {duration:?}")]
    Timeout { step: String, duration: Duration },

    /// The bundle exceeds the configured size limit.
    #[error("bundle exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    /// The downloaded bundle does not match the pinned digest.
    #[error("sha256 mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

/// Factory dispatch failures.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No registered factory serves this namespace and model type.
    #[error("provider `{namespace}` does not support model type `{model_type}`")]
    UnsupportedCombination {
        namespace: String,
        model_type: ModelType,
    },

    /// The definition's own model type does not match the adapter kind requested.
    #[error("model `{model_id}` is a {actual} model, not {requested}")]
    ModelTypeMismatch {
        model_id: String,
        requested: ModelType,
        actual: ModelType,
    },

    /// The factory accepted the request but failed to build the adapter.
    #[error("failed to construct adapter {key}: {message}")]
    Construction { key: String, message: String },

    /// No enabled plugin currently provides this namespace.
    #[error("provider `{provider}` is not enabled")]
    ProviderDisabled { provider: String },
}

/// The lifecycle step during which an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LifecyclePhase {
    Discover,
    Parse,
    Validate,
    Load,
    Install,
    Enable,
    Disable,
    Uninstall,
    Query,
    Dispatch,
}

/// The primary error type returned by runtime operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// The operation exists in the contract but has no implementation.
    #[error("{operation} is not supported")]
    NotSupported { operation: String },

    /// A metadata query referenced an unknown plugin id.
    #[error("plugin not found: {plugin_id}")]
    NotFound { plugin_id: String },

    /// A lifecycle transition is not allowed from the current state.
    #[error("plugin `{plugin_id}` cannot move from {from} to {to}")]
    InvalidTransition {
        plugin_id: String,
        from: PluginStatus,
        to: PluginStatus,
    },

    /// Record store failure.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An error annotated with the plugin and phase it happened in.
    #[error("{phase} failed for plugin `{plugin_id}`: {source}")]
    Plugin {
        plugin_id: String,
        phase: LifecyclePhase,
        source: Box<RuntimeError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Wrap any displayable storage failure.
    pub fn storage(message: impl Into<String>) -> Self {
        RuntimeError::Storage {
            source: message.into().into(),
        }
    }

    /// Tag this error with a plugin id and phase. Already-tagged errors are
    /// returned unchanged so the innermost context wins.
    pub fn in_phase(self, plugin_id: &str, phase: LifecyclePhase) -> Self {
        match self {
            tagged @ RuntimeError::Plugin { .. } => tagged,
            other => RuntimeError::Plugin {
                plugin_id: plugin_id.to_string(),
                phase,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any plugin/phase tag removed.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::Plugin { source, .. } => source.root(),
            other => other,
        }
    }

    /// The phase recorded on this error, if any.
    pub fn phase(&self) -> Option<LifecyclePhase> {
        match self {
            RuntimeError::Plugin { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Stable machine-readable code for this error's category.
    pub fn kind(&self) -> &'static str {
        match self.root() {
            RuntimeError::Parse(_) => "parse_error",
            RuntimeError::Validation(_) => "validation_error",
            RuntimeError::Load(_) => "load_error",
            RuntimeError::Install(InstallError::DuplicateId { .. }) => "duplicate_plugin",
            RuntimeError::Install(_) => "install_error",
            RuntimeError::Dispatch(DispatchError::UnsupportedCombination { .. }) => {
                "unsupported_combination"
            }
            RuntimeError::Dispatch(_) => "dispatch_error",
            RuntimeError::NotSupported { .. } => "not_supported",
            RuntimeError::NotFound { .. } => "not_found",
            RuntimeError::InvalidTransition { .. } => "invalid_transition",
            RuntimeError::Storage { .. } => "storage_error",
            RuntimeError::Internal(_) | RuntimeError::Plugin { .. } => "internal_error",
        }
    }
}
