// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Implementation units resolved from load contexts.

use std::any::Any;
use std::path::PathBuf;

/// Where a resolved unit came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOrigin {
    /// Registered by the host and shared with every context.
    Host,
    /// Packaged inside the bundle at this path.
    Bundle(PathBuf),
}

/// A live instance produced by a named constructor inside a load context.
pub trait ImplementationUnit: Send + Sync + 'static {
    /// Declared name the unit was resolved by (e.g. `com.acme.AcmeProvider`).
    fn name(&self) -> &str;

    fn origin(&self) -> UnitOrigin;

    /// Names of the entry points the unit exposes.
    fn exports(&self) -> Vec<String> {
        Vec::new()
    }

    /// Downcast hook for callers that know the concrete unit type.
    fn as_any(&self) -> &dyn Any;
}
