//! Path-keyed index of units and dependency resolution
//!
//! Discovery leaves every unit with a list of dependency paths as written in
//! its configuration. [`UnitsMap::cross_link_dependencies`] resolves those
//! strings against the known units and records real edges.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::component::Component;
use super::components::Components;
use super::graph::GraphError;
use super::paths::{canonicalize_or_clean, clean};
use super::unit::Unit;
use crate::config::UNIT_FILE;

#[derive(Debug, Clone, Default)]
pub struct UnitsMap(BTreeMap<PathBuf, Arc<Unit>>);

impl UnitsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every unit of the collection by path
    pub fn from_components(components: &Components) -> Self {
        let mut map = Self::new();
        for unit in components.units() {
            map.insert(unit);
        }
        map
    }

    /// Adds a unit, returning the one previously stored at its path
    pub fn insert(&mut self, unit: Arc<Unit>) -> Option<Arc<Unit>> {
        self.0.insert(unit.path().to_path_buf(), unit)
    }

    /// Adds every unit of `other` not already present
    pub fn merge(&mut self, other: UnitsMap) {
        for (path, unit) in other.0 {
            self.0.entry(path).or_insert(unit);
        }
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Arc<Unit>> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains_key(path)
    }

    pub fn sorted_keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<PathBuf> = self.0.keys().cloned().collect();
        keys.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        keys
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &Arc<Unit>)> {
        self.0.iter()
    }

    /// Resolves a declared dependency of the unit at `unit_dir` to a unit directory.
    ///
    /// Relative paths are taken from the unit directory; a path to a file
    /// stands for the directory containing it.
    pub fn resolve_dependency_path(unit_dir: &Path, declared: &str) -> PathBuf {
        let joined = unit_dir.join(declared);
        let resolved = canonicalize_or_clean(&joined);

        let names_unit_file = resolved.file_name().is_some_and(|name| name == UNIT_FILE);
        if resolved.is_file() || names_unit_file {
            if let Some(parent) = resolved.parent() {
                return parent.to_path_buf();
            }
        }

        resolved
    }

    fn lookup(&self, unit_dir: &Path, declared: &str) -> (PathBuf, Option<&Arc<Unit>>) {
        let resolved = Self::resolve_dependency_path(unit_dir, declared);
        if let Some(unit) = self.find_by_path(&resolved) {
            return (resolved, Some(unit));
        }

        // Keys may be unresolved spellings when the map was built from raw paths.
        let lexical = clean(&unit_dir.join(declared));
        let lexical = match lexical.file_name() {
            Some(name) if name == UNIT_FILE => lexical.parent().map(Path::to_path_buf).unwrap_or(lexical),
            _ => lexical,
        };
        let found = self.find_by_path(&lexical);
        (resolved, found)
    }

    /// Declared dependency paths of `unit` that match no known unit
    pub fn unresolved_dependencies(&self, unit: &Unit) -> Vec<PathBuf> {
        let Some(config) = unit.config() else {
            return vec![];
        };

        config
            .dependency_paths()
            .iter()
            .filter_map(|declared| match self.lookup(unit.path(), declared) {
                (_, Some(_)) => None,
                (resolved, None) => Some(resolved),
            })
            .collect()
    }

    /// Turns every unit's declared dependency paths into graph edges.
    ///
    /// An unknown dependency fails with [`GraphError::UnrecognizedDependency`],
    /// unless `ignore_errors` is set, in which case it is logged and the
    /// edge is left out.
    pub fn cross_link_dependencies(&self, ignore_errors: bool) -> Result<(), GraphError> {
        for (path, unit) in &self.0 {
            let Some(config) = unit.config() else {
                continue;
            };

            let dependent = Component::from(Arc::clone(unit));

            for declared in config.dependency_paths() {
                match self.lookup(path, declared) {
                    (_, Some(dependency)) => {
                        tracing::debug!(
                            unit = %path.display(),
                            dependency = %dependency.path().display(),
                            "linking dependency"
                        );
                        dependent.add_dependency(&Component::from(Arc::clone(dependency)));
                    }
                    (resolved, None) => {
                        let err = GraphError::UnrecognizedDependency {
                            unit: path.clone(),
                            dependency: resolved,
                            known: self.sorted_keys(),
                        };

                        if !ignore_errors {
                            return Err(err);
                        }

                        tracing::warn!(
                            unit = %path.display(),
                            dependency = %declared,
                            "ignoring unrecognized dependency"
                        );
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitConfig;
    use std::fs;
    use tempfile::TempDir;

    fn unit_with_deps(path: impl Into<PathBuf>, deps: &[&str]) -> Arc<Unit> {
        let config = UnitConfig {
            dependencies: Some(crate::config::DependenciesBlock {
                paths: deps.iter().map(|d| d.to_string()).collect(),
            }),
            ..UnitConfig::default()
        };
        Arc::new(Unit::new(path).with_config(config))
    }

    fn dep_paths(unit: &Unit) -> Vec<PathBuf> {
        unit.dependencies().iter().map(|d| d.path().to_path_buf()).collect()
    }

    #[test]
    fn links_relative_dependencies() {
        let mut map = UnitsMap::new();
        let app = unit_with_deps("/nowhere/live/app", &["../vpc"]);
        let vpc = unit_with_deps("/nowhere/live/vpc", &[]);
        map.insert(app.clone());
        map.insert(vpc.clone());

        map.cross_link_dependencies(false).unwrap();

        assert_eq!(dep_paths(&app), vec![PathBuf::from("/nowhere/live/vpc")]);
        assert_eq!(vpc.dependents().len(), 1);
    }

    #[test]
    fn file_reference_maps_to_directory() {
        let mut map = UnitsMap::new();
        let app = unit_with_deps("/nowhere/live/app", &["../db/unit.toml"]);
        let db = unit_with_deps("/nowhere/live/db", &[]);
        map.insert(app.clone());
        map.insert(db);

        map.cross_link_dependencies(false).unwrap();
        assert_eq!(dep_paths(&app), vec![PathBuf::from("/nowhere/live/db")]);
    }

    #[test]
    fn existing_file_on_disk_maps_to_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        fs::create_dir_all(root.join("db")).unwrap();
        fs::write(root.join("db").join("main.tf"), "").unwrap();
        fs::create_dir_all(root.join("app")).unwrap();

        let resolved = UnitsMap::resolve_dependency_path(&root.join("app"), "../db/main.tf");
        assert_eq!(resolved, root.join("db"));
    }

    #[test]
    fn unknown_dependency_is_an_error() {
        let mut map = UnitsMap::new();
        map.insert(unit_with_deps("/nowhere/live/app", &["../dbb"]));
        map.insert(unit_with_deps("/nowhere/live/db", &[]));

        let err = map.cross_link_dependencies(false).unwrap_err();
        match err {
            GraphError::UnrecognizedDependency { unit, dependency, known } => {
                assert_eq!(unit, PathBuf::from("/nowhere/live/app"));
                assert_eq!(dependency, PathBuf::from("/nowhere/live/dbb"));
                assert_eq!(known.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_dependency_can_be_ignored() {
        let mut map = UnitsMap::new();
        let app = unit_with_deps("/nowhere/live/app", &["../dbb", "../db"]);
        map.insert(app.clone());
        map.insert(unit_with_deps("/nowhere/live/db", &[]));

        map.cross_link_dependencies(true).unwrap();
        assert_eq!(dep_paths(&app), vec![PathBuf::from("/nowhere/live/db")]);
        assert_eq!(map.unresolved_dependencies(&app), vec![PathBuf::from("/nowhere/live/dbb")]);
    }

    #[test]
    fn linking_twice_adds_no_duplicates() {
        let mut map = UnitsMap::new();
        let app = unit_with_deps("/nowhere/live/app", &["../db"]);
        let db = unit_with_deps("/nowhere/live/db", &[]);
        map.insert(app.clone());
        map.insert(db.clone());

        map.cross_link_dependencies(false).unwrap();
        map.cross_link_dependencies(false).unwrap();

        assert_eq!(app.dependencies().len(), 1);
        assert_eq!(db.dependents().len(), 1);
    }

    #[test]
    fn merge_keeps_existing_entries() {
        let first = unit_with_deps("/nowhere/a", &[]);
        let mut map = UnitsMap::new();
        map.insert(first.clone());

        let mut other = UnitsMap::new();
        other.insert(unit_with_deps("/nowhere/a", &[]));
        other.insert(unit_with_deps("/nowhere/b", &[]));

        map.merge(other);
        assert_eq!(map.len(), 2);
        assert!(Arc::ptr_eq(map.find_by_path(Path::new("/nowhere/a")).unwrap(), &first));
        assert_eq!(map.sorted_keys(), vec![PathBuf::from("/nowhere/a"), PathBuf::from("/nowhere/b")]);
    }
}
