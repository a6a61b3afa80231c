// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Units the host shares with every load context.
//!
//! Host units are looked up before bundle units, so a bundle can never
//! shadow a name the host has registered.

use std::any::Any;
use std::sync::Arc;

use dashmap::DashMap;
use modelplug_core::{ImplementationUnit, UnitOrigin};

/// Named zero-argument constructor producing a unit instance.
pub type UnitConstructor =
    Arc<dyn Fn() -> Result<Arc<dyn ImplementationUnit>, String> + Send + Sync>;

/// Shared table of host-provided constructors. Cloning shares the table.
#[derive(Clone, Default)]
pub struct HostSurface {
    constructors: Arc<DashMap<String, UnitConstructor>>,
}

impl std::fmt::Debug for HostSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSurface")
            .field("units", &self.names())
            .finish()
    }
}

impl HostSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the constructor for `name`.
    pub fn register(&self, name: impl Into<String>, constructor: UnitConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    /// Register a value that is handed out as a [`HostUnit`] on every resolve.
    pub fn register_value<T>(&self, name: impl Into<String>, value: T)
    where
        T: Any + Send + Sync + Clone,
    {
        let name = name.into();
        let unit_name = name.clone();
        self.register(
            name,
            Arc::new(move || {
                Ok(Arc::new(HostUnit::new(unit_name.clone(), value.clone()))
                    as Arc<dyn ImplementationUnit>)
            }),
        );
    }

    pub fn unregister(&self, name: &str) -> bool {
        self.constructors.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.constructors.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Run the constructor for `name`, if registered.
    pub(crate) fn construct(&self, name: &str) -> Option<Result<Arc<dyn ImplementationUnit>, String>> {
        // Clone out of the shard before calling user code.
        let constructor = self.constructors.get(name).map(|c| Arc::clone(c.value()))?;
        Some(constructor())
    }
}

/// A host-side unit wrapping an arbitrary shared value.
pub struct HostUnit {
    name: String,
    value: Box<dyn Any + Send + Sync>,
}

impl HostUnit {
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            value: Box::new(value),
        }
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl ImplementationUnit for HostUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> UnitOrigin {
        UnitOrigin::Host
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_value_is_recoverable() {
        let host = HostSurface::new();
        host.register_value("com.acme.Greeting", String::from("hello"));

        let unit = host.construct("com.acme.Greeting").unwrap().unwrap();
        assert_eq!(unit.origin(), UnitOrigin::Host);
        let host_unit = unit.as_any().downcast_ref::<HostUnit>().unwrap();
        assert_eq!(host_unit.value::<String>().map(String::as_str), Some("hello"));
        assert!(host.construct("com.acme.Other").is_none());
    }

    #[test]
    fn clones_share_the_table() {
        let host = HostSurface::new();
        let other = host.clone();
        other.register_value("x", 1u32);
        assert_eq!(host.names(), vec!["x"]);
        assert!(host.unregister("x"));
        assert!(!other.contains("x"));
    }
}
