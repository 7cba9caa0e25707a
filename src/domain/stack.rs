//! Stack: a named group of units discovered together

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::component::{Component, Node};
use super::context::{DiscoveryContext, Origin};
use super::unit::{RunOptions, Unit};
use crate::config::StackConfig;

/// A run report a stack can carry for the reporting layer.
///
/// The graph only holds the handle; it never records into it.
pub trait Report: Send + Sync + fmt::Debug {
    fn record(&self, unit: &Path, outcome: &str);
}

/// Execution-time state of a stack
#[derive(Debug, Clone, Default)]
pub struct StackExecution {
    pub report: Option<Arc<dyn Report>>,
    pub options: Option<RunOptions>,
}

#[derive(Debug)]
pub struct Stack {
    node: Node,
    config: RwLock<Option<Arc<StackConfig>>>,
    units: RwLock<Vec<Arc<Unit>>>,
    execution: RwLock<Option<StackExecution>>,
}

impl Stack {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            node: Node::new(path.into()),
            config: RwLock::new(None),
            units: RwLock::new(Vec::new()),
            execution: RwLock::new(None),
        }
    }

    pub fn with_config(self, config: StackConfig) -> Self {
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

    pub fn config(&self) -> Option<Arc<StackConfig>> {
        self.config.read().clone()
    }

    pub fn set_config(&self, config: StackConfig) {
        *self.config.write() = Some(Arc::new(config));
    }

    pub fn execution(&self) -> Option<StackExecution> {
        self.execution.read().clone()
    }

    pub fn set_execution(&self, execution: StackExecution) {
        *self.execution.write() = Some(execution);
    }

    pub fn report(&self) -> Option<Arc<dyn Report>> {
        self.execution.read().as_ref().and_then(|exec| exec.report.clone())
    }

    /// Member units, in the order they were added
    pub fn units(&self) -> Vec<Arc<Unit>> {
        self.units.read().clone()
    }

    /// Adds a member unit. Returns false if the same instance is already a member.
    pub fn add_unit(&self, unit: Arc<Unit>) -> bool {
        let mut units = self.units.write();
        if units.iter().any(|existing| Arc::ptr_eq(existing, &unit)) {
            return false;
        }
        units.push(unit);
        true
    }

    pub fn find_unit_by_path(&self, path: &Path) -> Option<Arc<Unit>> {
        self.units
            .read()
            .iter()
            .find(|unit| unit.path() == path)
            .cloned()
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let units = self
            .units
            .read()
            .iter()
            .map(|unit| unit.path().display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "Stack {} (units: [{}])", self.path().display(), units)
    }
}
