//! # Discovery
//!
//! Finds the units and stacks below a working directory and turns them into
//! a linked, validated [`Components`] collection:
//!
//! 1. Parallel walk for `unit.toml` / `stack.toml`, registering each
//!    component through [`ThreadSafeComponents`]
//! 2. External dependencies outside the walked tree, repeated to a fixpoint
//! 3. Dependency linking through [`UnitsMap`]
//! 4. Stack membership
//! 5. Dependency exclusion for units whose rule drops their dependencies
//! 6. Cycle check

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use ignore::{DirEntry, Error as IgnoreError, WalkBuilder, WalkState};
use parking_lot::Mutex;
use thiserror::Error;

use crate::config::{ConfigError, ProjectSettings, StackConfig, UnitConfig, STACK_FILE, UNIT_FILE};
use crate::domain::paths::{canonicalize_or_clean, clean};
use crate::domain::{Component, Components, DiscoveryContext, Origin, Stack, ThreadSafeComponents, Unit, UnitsMap};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to walk {path}: {message}")]
    Walk { path: String, message: String },

    #[error("{} path(s) could not be read during discovery:\n{}", .0.len(), format_errors(.0))]
    Unreadable(Vec<IgnoreError>),

    #[error("{} configuration file(s) could not be loaded:\n{}", .0.len(), format_errors(.0))]
    Config(Vec<ConfigError>),
}

fn format_errors<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct Discovery {
    working_dir: PathBuf,
    context: DiscoveryContext,
    settings: ProjectSettings,
}

impl Discovery {
    pub fn new(working_dir: impl Into<PathBuf>, context: DiscoveryContext, settings: ProjectSettings) -> Self {
        Self {
            working_dir: working_dir.into(),
            context,
            settings,
        }
    }

    /// Discovers, links and validates every component below the working directory
    pub fn run(&self) -> Result<Components> {
        let root = canonicalize_or_clean(&self.working_dir);
        if !root.is_dir() {
            return Err(DiscoveryError::Walk {
                path: root.display().to_string(),
                message: "not a directory".to_string(),
            }
            .into());
        }

        let registry = ThreadSafeComponents::new();
        self.walk(&root, &registry)?;
        tracing::debug!(root = %root.display(), components = registry.len(), "walk complete");

        let mut units = UnitsMap::from_components(&registry.to_components());
        if self.settings.discover_external {
            self.discover_external(&registry, &mut units)?;
        }

        units.cross_link_dependencies(self.settings.ignore_dependency_errors)?;
        attach_stack_members(&registry);

        let components = registry.to_components().sort();
        exclude_dependencies_of_excluded(&components);
        components.cycle_check()?;

        tracing::info!(
            units = components.units().len(),
            stacks = components.stacks().len(),
            "discovered components"
        );

        Ok(components)
    }

    /// Marks every unit inside one of `dirs` as excluded by filter, returning
    /// how many were marked
    pub fn apply_exclude_dirs(components: &Components, dirs: &[PathBuf]) -> usize {
        let dirs: Vec<PathBuf> = dirs.iter().map(|dir| canonicalize_or_clean(dir)).collect();
        let mut marked = 0;

        for unit in components.units() {
            if dirs.iter().any(|dir| unit.path().starts_with(dir)) {
                tracing::debug!(unit = %unit.path().display(), "excluded by directory filter");
                unit.set_excluded(true);
                marked += 1;
            }
        }

        marked
    }

    fn walk(&self, root: &Path, registry: &ThreadSafeComponents) -> Result<(), DiscoveryError> {
        let errors = Mutex::new(Vec::new());
        let unreadable = Mutex::new(Vec::new());

        self.build_walk(root).build_parallel().run(|| {
            let errors = &errors;
            let unreadable = &unreadable;
            Box::new(move |entry: Result<DirEntry, IgnoreError>| {
                let entry = match entry {
                    Ok(entry) => entry,
                    // Malformed ignore files only affect filtering; I/O failures hide units.
                    Err(err) if err.io_error().is_none() => {
                        tracing::warn!(error = %err, "ignoring invalid ignore rule");
                        return WalkState::Continue;
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "path could not be read");
                        unreadable.lock().push(err);
                        return WalkState::Continue;
                    }
                };

                if !entry.file_type().is_some_and(|file_type| file_type.is_file()) {
                    return WalkState::Continue;
                }

                let loaded = match entry.file_name().to_str() {
                    Some(UNIT_FILE) => self.load_unit(entry.path(), Some(Origin::PathDiscovery)),
                    Some(STACK_FILE) => self.load_stack(entry.path()),
                    _ => return WalkState::Continue,
                };

                match loaded {
                    Ok(component) => {
                        let path = component.path().to_path_buf();
                        let (_, added) = registry.ensure_component(component);
                        if added {
                            tracing::debug!(path = %path.display(), "registered component");
                        } else {
                            tracing::debug!(path = %path.display(), "dropping duplicate component");
                        }
                    }
                    Err(err) => errors.lock().push(err),
                }

                WalkState::Continue
            })
        });

        let unreadable = unreadable.into_inner();
        if !unreadable.is_empty() {
            return Err(DiscoveryError::Unreadable(unreadable));
        }

        let errors = errors.into_inner();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiscoveryError::Config(errors))
        }
    }

    fn build_walk(&self, root: &Path) -> WalkBuilder {
        let options = &self.settings.discovery;
        let skipped: HashSet<String> = options.exclude_dirs.iter().cloned().collect();

        let mut walker = WalkBuilder::new(root);

        walker
            .hidden(!options.include_hidden)
            .follow_links(false)
            .git_ignore(options.respect_gitignore)
            .git_global(options.respect_gitignore)
            .git_exclude(options.respect_gitignore)
            .ignore(options.respect_gitignore)
            .parents(options.respect_gitignore)
            .max_depth(options.max_depth)
            .threads(options.threads)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|file_type| file_type.is_dir());
                !(is_dir && entry.file_name().to_str().is_some_and(|name| skipped.contains(name)))
            });

        walker
    }

    fn unit_context(&self, origin: Option<Origin>) -> DiscoveryContext {
        let mut context = self.context.clone();
        context.origin = origin;
        context
    }

    fn load_unit(&self, config_path: &Path, origin: Option<Origin>) -> Result<Component, ConfigError> {
        let dir = component_dir(config_path)?;
        let config = UnitConfig::load(config_path)?;
        let reading = config.reads(&dir);

        let unit = Unit::new(dir)
            .with_config(config)
            .with_discovery_context(self.unit_context(origin));
        unit.set_reading(reading);

        Ok(Component::from(unit))
    }

    fn load_stack(&self, config_path: &Path) -> Result<Component, ConfigError> {
        let dir = component_dir(config_path)?;
        let config = StackConfig::load(config_path)?;

        let stack = Stack::new(dir)
            .with_config(config)
            .with_discovery_context(self.unit_context(Some(Origin::PathDiscovery)));

        Ok(Component::from(stack))
    }

    /// Pulls in units that are depended on but were not found by the walk
    fn discover_external(&self, registry: &ThreadSafeComponents, units: &mut UnitsMap) -> Result<(), DiscoveryError> {
        let mut pending: Vec<Arc<Unit>> = units.iter().map(|(_, unit)| Arc::clone(unit)).collect();
        let mut errors = Vec::new();

        while let Some(unit) = pending.pop() {
            for dir in units.unresolved_dependencies(&unit) {
                let config_path = dir.join(UNIT_FILE);
                if !config_path.is_file() {
                    // Reported by linking unless dependency errors are ignored
                    continue;
                }

                let component = match self.load_unit(&config_path, None) {
                    Ok(component) => component,
                    Err(err) => {
                        errors.push(err);
                        continue;
                    }
                };

                let (kept, added) = registry.ensure_component(component);
                kept.suggest_origin(Origin::ExternalDependency);

                let Some(external) = kept.as_unit() else {
                    continue;
                };

                if added {
                    external.set_external(true);
                    tracing::debug!(
                        unit = %unit.path().display(),
                        dependency = %external.path().display(),
                        "discovered external dependency"
                    );
                    pending.push(Arc::clone(external));
                }

                units.insert(Arc::clone(external));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DiscoveryError::Config(errors))
        }
    }
}

fn component_dir(config_path: &Path) -> Result<PathBuf, ConfigError> {
    config_path
        .parent()
        .map(clean)
        .ok_or_else(|| ConfigError::Invalid(format!("{} has no parent directory", config_path.display())))
}

fn attach_stack_members(registry: &ThreadSafeComponents) {
    for stack in registry.to_components().stacks() {
        let Some(config) = stack.config() else {
            continue;
        };

        for member in config.unit_paths(stack.path()) {
            let member = canonicalize_or_clean(&member);
            match registry.find_by_path(&member).as_ref().and_then(Component::as_unit) {
                Some(unit) => {
                    stack.add_unit(Arc::clone(unit));
                }
                None => tracing::warn!(
                    stack = %stack.path().display(),
                    member = %member.display(),
                    "stack member is not a discovered unit"
                ),
            }
        }
    }
}

fn exclude_dependencies_of_excluded(components: &Components) {
    let mut visited = HashSet::new();

    for unit in components.units() {
        if unit.excludes_dependencies() {
            exclude_transitively(unit.dependencies(), &mut visited);
        }
    }
}

fn exclude_transitively(dependencies: Vec<Component>, visited: &mut HashSet<PathBuf>) {
    let mut pending = dependencies;

    while let Some(dependency) = pending.pop() {
        if !visited.insert(dependency.path().to_path_buf()) {
            continue;
        }

        if let Some(unit) = dependency.as_unit() {
            tracing::debug!(unit = %unit.path().display(), "excluded as dependency of excluded unit");
            unit.set_excluded(true);
        }

        pending.extend(dependency.dependencies());
    }
}
