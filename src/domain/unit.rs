//! Unit: a single deployable configuration
//!
//! Besides the shared component state, a unit carries its parsed
//! configuration and an execution payload filled in later by whoever runs
//! it. Whether a unit is skipped is derived on demand by [`Unit::excluded`].

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::component::{Component, Node};
use super::context::{DiscoveryContext, Origin};
use crate::config::UnitConfig;

/// Options resolved for running a component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub working_dir: PathBuf,
    pub command: String,
    pub args: Vec<String>,
    pub ignore_dependency_errors: bool,
}

/// Execution-time state of a unit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitExecution {
    pub options: Option<RunOptions>,

    /// The unit is known to be applied already and may be skipped
    pub assume_already_applied: bool,

    /// Set by an external filter (e.g. `--exclude-dir`)
    pub flag_excluded: bool,
}

/// Why a unit is skipped for the current command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    /// Marked by an external filter
    Filter,
    /// Destroy-like command and the unit or a dependency sets `prevent_destroy`
    DestroyProtected,
    /// The unit's exclude rule lists the command
    ExcludeRule,
}

impl ExclusionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusionReason::Filter => "filter",
            ExclusionReason::DestroyProtected => "prevent_destroy",
            ExclusionReason::ExcludeRule => "exclude_rule",
        }
    }
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Unit {
    node: Node,
    config: RwLock<Option<Arc<UnitConfig>>>,
    execution: RwLock<Option<UnitExecution>>,
}

impl Unit {
    /// Creates a unit with no configuration and no edges
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            node: Node::new(path.into()),
            config: RwLock::new(None),
            execution: RwLock::new(None),
        }
    }

    pub fn with_config(self, config: UnitConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn with_discovery_context(self, context: DiscoveryContext) -> Self {
        self.node.set_discovery_context(context);
        self
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    pub fn path(&self) -> &Path {
        self.node.path()
    }

    pub fn is_external(&self) -> bool {
        self.node.is_external()
    }

    pub fn set_external(&self, external: bool) {
        self.node.set_external(external)
    }

    pub fn reading(&self) -> Vec<PathBuf> {
        self.node.reading()
    }

    pub fn set_reading(&self, files: Vec<PathBuf>) {
        self.node.set_reading(files)
    }

    pub fn discovery_context(&self) -> Option<DiscoveryContext> {
        self.node.discovery_context()
    }

    pub fn set_discovery_context(&self, context: DiscoveryContext) {
        self.node.set_discovery_context(context)
    }

    pub fn suggest_origin(&self, origin: Origin) -> bool {
        self.node.suggest_origin(origin)
    }

    pub fn dependencies(&self) -> Vec<Component> {
        self.node.dependencies()
    }

    pub fn dependents(&self) -> Vec<Component> {
        self.node.dependents()
    }

    pub fn config(&self) -> Option<Arc<UnitConfig>> {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: UnitConfig) {
        *self.config.write() = Some(Arc::new(config));
    }

    pub fn execution(&self) -> Option<UnitExecution> {
        self.execution.read().clone()
    }

    pub fn set_execution(&self, execution: UnitExecution) {
        *self.execution.write() = Some(execution);
    }

    /// Marks the unit as excluded by an external filter
    pub fn set_excluded(&self, excluded: bool) {
        self.execution
            .write()
            .get_or_insert_with(UnitExecution::default)
            .flag_excluded = excluded;
    }

    pub fn is_flag_excluded(&self) -> bool {
        self.execution
            .read()
            .as_ref()
            .map(|exec| exec.flag_excluded)
            .unwrap_or(false)
    }

    pub fn assume_already_applied(&self) -> bool {
        self.execution
            .read()
            .as_ref()
            .map(|exec| exec.assume_already_applied)
            .unwrap_or(false)
    }

    /// True if this unit's own configuration sets `prevent_destroy`
    pub fn prevents_destroy(&self) -> bool {
        self.config
            .read()
            .as_ref()
            .and_then(|config| config.prevent_destroy())
            .unwrap_or(false)
    }

    /// True if this unit or anything it transitively depends on prevents destroy
    pub fn is_destroy_protected(&self) -> bool {
        if self.prevents_destroy() {
            return true;
        }

        let mut visited = HashSet::new();
        protected_dependency(self.dependencies(), &mut visited)
    }

    /// Whether the command in the discovery context should skip this unit.
    ///
    /// Checked in order: external filter flag, destroy protection for
    /// destroy-like commands, then the unit's own exclude rule.
    pub fn excluded(&self) -> bool {
        self.exclusion_reason().is_some()
    }

    /// Why the unit is skipped, or `None` if it runs
    pub fn exclusion_reason(&self) -> Option<ExclusionReason> {
        if self.is_flag_excluded() {
            return Some(ExclusionReason::Filter);
        }

        let context = self.discovery_context()?;

        if context.is_destroy() && self.is_destroy_protected() {
            return Some(ExclusionReason::DestroyProtected);
        }

        let excluded_by_rule = self
            .config
            .read()
            .as_ref()
            .is_some_and(|config| config.excluded_for_command(&context.command));

        excluded_by_rule.then_some(ExclusionReason::ExcludeRule)
    }

    /// True if the exclude rule also drops this unit's dependencies for the
    /// command in the discovery context
    pub fn excludes_dependencies(&self) -> bool {
        let Some(context) = self.discovery_context() else {
            return false;
        };

        self.config
            .read()
            .as_ref()
            .map(|config| config.excludes_dependencies_for(&context.command))
            .unwrap_or(false)
    }
}

fn protected_dependency(dependencies: Vec<Component>, visited: &mut HashSet<PathBuf>) -> bool {
    let mut pending = dependencies;

    while let Some(dependency) = pending.pop() {
        if !visited.insert(dependency.path().to_path_buf()) {
            continue;
        }

        if dependency.as_unit().is_some_and(|unit| unit.prevents_destroy()) {
            return true;
        }

        pending.extend(dependency.dependencies());
    }

    false
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dependencies = self
            .node
            .dependency_paths()
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        write!(
            f,
            "Unit {} (excluded: {}, assume applied: {}, dependencies: [{}])",
            self.path().display(),
            self.is_flag_excluded(),
            self.assume_already_applied(),
            dependencies
        )
    }
}
