//! Thread-safe component registry
//!
//! Discovery workers register components concurrently. The registry keeps
//! exactly one component per canonical (symlink-resolved) path: the first
//! registration wins and later ones get the survivor back.
//!
//! Registration resolves the path before taking any lock, then looks for an
//! existing entry under the read lock. Only on a miss does it take the write
//! lock, where it scans again before inserting, so two workers racing on the
//! same path still produce a single entry.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use super::component::Component;
use super::components::Components;

#[derive(Debug)]
struct Entry {
    canonical: PathBuf,
    component: Component,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: Vec<Entry>,

    /// Raw path -> canonical path. Append-only for the registry's lifetime.
    canonical: HashMap<PathBuf, PathBuf>,
}

impl RegistryState {
    fn find(&self, canonical: &Path) -> Option<&Component> {
        self.entries
            .iter()
            .find(|entry| entry.canonical == canonical)
            .map(|entry| &entry.component)
    }
}

#[derive(Debug, Default)]
pub struct ThreadSafeComponents {
    state: RwLock<RegistryState>,
}

impl ThreadSafeComponents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from an existing collection, dropping duplicates
    pub fn from_components(components: Components) -> Self {
        let registry = Self::new();
        for component in components {
            registry.ensure_component(component);
        }
        registry
    }

    /// Registers `component` unless one with the same canonical path exists.
    ///
    /// Returns the registered component and whether `component` itself was
    /// inserted. When the flag is false the returned handle is the earlier
    /// survivor and `component` should be discarded.
    pub fn ensure_component(&self, component: Component) -> (Component, bool) {
        let canonical = self.canonical_path(component.path());

        if let Some(existing) = self.state.read().find(&canonical) {
            return (existing.clone(), false);
        }

        let mut state = self.state.write();
        if let Some(existing) = state.find(&canonical) {
            return (existing.clone(), false);
        }

        tracing::trace!(path = %component.path().display(), "registered component");
        state.entries.push(Entry {
            canonical,
            component: component.clone(),
        });

        (component, true)
    }

    /// Looks up a component by any path resolving to the same location
    pub fn find_by_path(&self, path: &Path) -> Option<Component> {
        let canonical = self.canonical_path(path);
        self.state.read().find(&canonical).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// Snapshot of the registered components in registration order
    pub fn to_components(&self) -> Components {
        self.state
            .read()
            .entries
            .iter()
            .map(|entry| entry.component.clone())
            .collect()
    }

    /// Resolves symlinks in `raw`, caching the answer.
    ///
    /// The filesystem call happens with no lock held. When resolution fails
    /// the raw path stands in for the canonical one.
    fn canonical_path(&self, raw: &Path) -> PathBuf {
        {
            let state = self.state.read();
            if let Some(cached) = state.canonical.get(raw) {
                return cached.clone();
            }
        }

        let resolved = match fs::canonicalize(raw) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(
                    path = %raw.display(),
                    error = %err,
                    "could not resolve symlinks, deduplicating on the raw path"
                );
                raw.to_path_buf()
            }
        };

        self.state
            .write()
            .canonical
            .entry(raw.to_path_buf())
            .or_insert(resolved)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Stack, Unit};
    use tempfile::TempDir;

    #[test]
    fn second_registration_returns_survivor() {
        let registry = ThreadSafeComponents::new();
        let first = Component::from(Unit::new("/nowhere/app"));
        let second = Component::from(Unit::new("/nowhere/app"));

        let (kept, added) = registry.ensure_component(first.clone());
        assert!(added);
        assert!(kept.ptr_eq(&first));

        let (kept, added) = registry.ensure_component(second);
        assert!(!added);
        assert!(kept.ptr_eq(&first));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_paths_are_both_kept() {
        let registry = ThreadSafeComponents::new();
        registry.ensure_component(Component::from(Unit::new("/nowhere/app")));
        registry.ensure_component(Component::from(Stack::new("/nowhere/stack")));

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.to_components().paths(),
            vec![PathBuf::from("/nowhere/app"), PathBuf::from("/nowhere/stack")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_path_is_the_same_component() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let registry = ThreadSafeComponents::new();
        let (_, added) = registry.ensure_component(Component::from(Unit::new(&real)));
        assert!(added);

        let (kept, added) = registry.ensure_component(Component::from(Unit::new(&link)));
        assert!(!added);
        assert_eq!(kept.path(), real.as_path());

        assert!(registry.find_by_path(&link).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn from_components_deduplicates() {
        let components: Components = vec![
            Component::from(Unit::new("/nowhere/a")),
            Component::from(Unit::new("/nowhere/a")),
            Component::from(Unit::new("/nowhere/b")),
        ]
        .into();

        let registry = ThreadSafeComponents::from_components(components);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_registrations_keep_one_entry() {
        let registry = ThreadSafeComponents::new();
        let workers = 32;

        let added: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let registry = &registry;
                    scope.spawn(move || {
                        let (_, added) =
                            registry.ensure_component(Component::from(Unit::new("/nowhere/shared")));
                        added as usize
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(added, 1);
        assert_eq!(registry.len(), 1);
    }
}
