// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inter-plugin dependency resolution.
//!
//! The graph holds every installed plugin plus candidates being installed.
//! Cycles are rejected. Unmet required dependencies (missing plugin or
//! version outside the declared range) are errors; unmet optional ones are
//! reported as warnings.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use modelplug_core::{Dependency, ValidationError};
use semver::{Version, VersionReq};

#[derive(Debug, Clone)]
struct Node {
    version: Option<Version>,
    dependencies: Vec<Dependency>,
}

/// Result of a successful dependency check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    /// Plugin ids ordered so that dependencies come before dependents.
    pub install_order: Vec<String>,
    /// Unmet optional dependencies.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, Node>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a plugin. Unparseable versions disable range checks
    /// against that plugin.
    pub fn add(&mut self, plugin_id: impl Into<String>, version: &str, dependencies: Vec<Dependency>) {
        self.nodes.insert(
            plugin_id.into(),
            Node {
                version: Version::parse(version).ok(),
                dependencies,
            },
        );
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.nodes.contains_key(plugin_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Check every plugin's dependencies and compute an install order.
    pub fn check(&self) -> Result<DependencyReport, ValidationError> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (plugin_id, node) in &self.nodes {
            for dep in &node.dependencies {
                if let Some(problem) = self.unmet(dep) {
                    let message = format!("`{plugin_id}` depends on `{}`: {problem}", dep.plugin_id);
                    if dep.is_optional() {
                        warnings.push(message);
                    } else {
                        errors.push(message);
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(ValidationError::new("dependency graph", errors));
        }

        Ok(DependencyReport {
            install_order: self.install_order()?,
            warnings,
        })
    }

    /// Topological order over dependencies present in the graph.
    ///
    /// Fails naming the plugins that take part in (or sit behind) a cycle.
    pub fn install_order(&self) -> Result<Vec<String>, ValidationError> {
        let mut in_degree: BTreeMap<&str, usize> =
            self.nodes.keys().map(|id| (id.as_str(), 0)).collect();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for (plugin_id, node) in &self.nodes {
            let targets: BTreeSet<&str> = node
                .dependencies
                .iter()
                .map(|d| d.plugin_id.as_str())
                .filter(|d| self.nodes.contains_key(*d))
                .collect();
            for target in targets {
                dependents.entry(target).or_default().push(plugin_id.as_str());
                *in_degree.entry(plugin_id.as_str()).or_default() += 1;
            }
        }

        let mut ready: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = ready.pop_front() {
            order.push(id.to_string());
            for &dependent in dependents.get(id).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(dependent);
                    }
                }
            }
        }

        if order.len() < self.nodes.len() {
            let stuck: Vec<&str> = in_degree
                .iter()
                .filter(|(_, d)| **d > 0)
                .map(|(id, _)| *id)
                .collect();
            return Err(ValidationError::single(
                "dependency graph",
                format!("dependency cycle among: {}", stuck.join(", ")),
            ));
        }

        Ok(order)
    }

    fn unmet(&self, dep: &Dependency) -> Option<String> {
        let Some(target) = self.nodes.get(&dep.plugin_id) else {
            return Some("not installed".to_string());
        };
        let Some(version) = &target.version else {
            return None;
        };

        if let Some(req) = dep.version.as_deref().and_then(|r| VersionReq::parse(r).ok())
            && !req.matches(version)
        {
            return Some(format!("version {version} does not satisfy `{req}`"));
        }
        if let Some(min) = dep.min_version.as_deref().and_then(|v| Version::parse(v).ok())
            && *version < min
        {
            return Some(format!("version {version} is below minimum {min}"));
        }
        if let Some(max) = dep.max_version.as_deref().and_then(|v| Version::parse(v).ok())
            && *version > max
        {
            return Some(format!("version {version} is above maximum {max}"));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelplug_core::DependencyKind;

    fn dep(id: &str) -> Dependency {
        Dependency {
            plugin_id: id.to_string(),
            version: None,
            min_version: None,
            max_version: None,
            optional: false,
            kind: DependencyKind::Runtime,
        }
    }

    #[test]
    fn orders_dependencies_first() {
        let mut graph = DependencyGraph::new();
        graph.add("app", "1.0.0", vec![dep("mid")]);
        graph.add("mid", "1.0.0", vec![dep("base")]);
        graph.add("base", "1.0.0", vec![]);

        let report = graph.check().unwrap();
        assert_eq!(report.install_order, vec!["base", "mid", "app"]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn cycle_is_rejected_with_members() {
        let mut graph = DependencyGraph::new();
        graph.add("a", "1.0.0", vec![dep("b")]);
        graph.add("b", "1.0.0", vec![dep("a")]);
        graph.add("c", "1.0.0", vec![]);

        let err = graph.install_order().unwrap_err();
        assert_eq!(err.issues, vec!["dependency cycle among: a, b"]);
    }

    #[test]
    fn missing_required_fails_missing_optional_warns() {
        let mut graph = DependencyGraph::new();
        let mut optional = dep("extras");
        optional.optional = true;
        graph.add("app", "1.0.0", vec![optional]);
        let report = graph.check().unwrap();
        assert_eq!(report.warnings.len(), 1);

        graph.add("app", "1.0.0", vec![dep("base")]);
        let err = graph.check().unwrap_err();
        assert!(err.issues[0].contains("not installed"));
    }

    #[test]
    fn version_bounds_are_enforced() {
        let mut graph = DependencyGraph::new();
        graph.add("base", "2.1.0", vec![]);

        let mut ranged = dep("base");
        ranged.version = Some("^1.4".to_string());
        graph.add("app", "1.0.0", vec![ranged]);
        assert!(graph.check().is_err());

        let mut bounded = dep("base");
        bounded.min_version = Some("2.0.0".to_string());
        bounded.max_version = Some("2.1.0".to_string());
        graph.add("app", "1.0.0", vec![bounded]);
        assert!(graph.check().is_ok());
    }
}
