//! Components: the shared handle over units and stacks
//!
//! A [`Component`] is a cheap, clonable handle to either a [`Unit`] or a
//! [`Stack`]. Both variants embed a [`Node`] holding the state every
//! component has: its path, provenance, and the dependency/dependent edges.
//!
//! Edges are stored as [`WeakComponent`] handles. The strong owners are the
//! collections (registry, [`Components`](super::Components), units map), so
//! a dependency cycle in the graph never becomes an ownership cycle.
//!
//! Each node guards its edges with its own reader/writer lock. Adding an edge
//! takes one node's write lock, records the edge, releases it, and only then
//! asks the other node to record the mirror edge. No code path holds two
//! node locks at once.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::context::{DiscoveryContext, Origin};
use super::stack::Stack;
use super::unit::Unit;

/// The kind of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    Unit,
    Stack,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Unit => "unit",
            Kind::Stack => "stack",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct Edges {
    dependencies: Vec<WeakComponent>,
    dependents: Vec<WeakComponent>,
}

/// State common to units and stacks
#[derive(Debug)]
pub struct Node {
    path: PathBuf,
    external: AtomicBool,
    reading: RwLock<Vec<PathBuf>>,
    discovery_context: RwLock<Option<DiscoveryContext>>,
    edges: RwLock<Edges>,
}

impl Node {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            external: AtomicBool::new(false),
            reading: RwLock::new(Vec::new()),
            discovery_context: RwLock::new(None),
            edges: RwLock::new(Edges::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_external(&self) -> bool {
        self.external.load(Ordering::Acquire)
    }

    pub fn set_external(&self, external: bool) {
        self.external.store(external, Ordering::Release);
    }

    pub fn reading(&self) -> Vec<PathBuf> {
        self.reading.read().clone()
    }

    pub fn set_reading(&self, files: Vec<PathBuf>) {
        *self.reading.write() = files;
    }

    pub fn discovery_context(&self) -> Option<DiscoveryContext> {
        self.discovery_context.read().clone()
    }

    pub fn set_discovery_context(&self, context: DiscoveryContext) {
        *self.discovery_context.write() = Some(context);
    }

    /// Records `origin` unless the context already names one.
    ///
    /// Returns false when there is no context or it already had an origin.
    pub fn suggest_origin(&self, origin: Origin) -> bool {
        match self.discovery_context.write().as_mut() {
            Some(context) => context.suggest_origin(origin),
            None => false,
        }
    }

    pub fn dependencies(&self) -> Vec<Component> {
        upgrade_all(&self.edges.read().dependencies)
    }

    pub fn dependents(&self) -> Vec<Component> {
        upgrade_all(&self.edges.read().dependents)
    }

    /// Paths of the current dependencies, read under a single lock acquisition
    pub fn dependency_paths(&self) -> Vec<PathBuf> {
        self.edges
            .read()
            .dependencies
            .iter()
            .filter_map(WeakComponent::upgrade)
            .map(|dep| dep.path().to_path_buf())
            .collect()
    }

    /// Records a dependency edge on this node only. Returns true if it was new.
    pub(crate) fn ensure_dependency(&self, dependency: WeakComponent) -> bool {
        let mut edges = self.edges.write();
        if edges.dependencies.iter().any(|d| d.ptr_eq(&dependency)) {
            return false;
        }
        edges.dependencies.push(dependency);
        true
    }

    /// Records a dependent edge on this node only. Returns true if it was new.
    pub(crate) fn ensure_dependent(&self, dependent: WeakComponent) -> bool {
        let mut edges = self.edges.write();
        if edges.dependents.iter().any(|d| d.ptr_eq(&dependent)) {
            return false;
        }
        edges.dependents.push(dependent);
        true
    }
}

fn upgrade_all(edges: &[WeakComponent]) -> Vec<Component> {
    edges.iter().filter_map(WeakComponent::upgrade).collect()
}

/// A handle to a unit or a stack
#[derive(Debug, Clone)]
pub enum Component {
    Unit(Arc<Unit>),
    Stack(Arc<Stack>),
}

impl Component {
    pub fn kind(&self) -> Kind {
        match self {
            Component::Unit(_) => Kind::Unit,
            Component::Stack(_) => Kind::Stack,
        }
    }

    fn node(&self) -> &Node {
        match self {
            Component::Unit(unit) => unit.node(),
            Component::Stack(stack) => stack.node(),
        }
    }

    pub fn path(&self) -> &Path {
        self.node().path()
    }

    pub fn is_external(&self) -> bool {
        self.node().is_external()
    }

    pub fn set_external(&self, external: bool) {
        self.node().set_external(external)
    }

    pub fn reading(&self) -> Vec<PathBuf> {
        self.node().reading()
    }

    pub fn set_reading(&self, files: Vec<PathBuf>) {
        self.node().set_reading(files)
    }

    pub fn discovery_context(&self) -> Option<DiscoveryContext> {
        self.node().discovery_context()
    }

    pub fn set_discovery_context(&self, context: DiscoveryContext) {
        self.node().set_discovery_context(context)
    }

    pub fn suggest_origin(&self, origin: Origin) -> bool {
        self.node().suggest_origin(origin)
    }

    pub fn dependencies(&self) -> Vec<Component> {
        self.node().dependencies()
    }

    pub fn dependents(&self) -> Vec<Component> {
        self.node().dependents()
    }

    /// Makes `self` depend on `dependency`, recording both sides of the edge.
    ///
    /// Idempotent: repeating the call leaves both edge lists unchanged.
    pub fn add_dependency(&self, dependency: &Component) {
        self.ensure_dependency(dependency);
        dependency.ensure_dependent(self);
    }

    /// Makes `dependent` depend on `self`, recording both sides of the edge.
    pub fn add_dependent(&self, dependent: &Component) {
        self.ensure_dependent(dependent);
        dependent.ensure_dependency(self);
    }

    /// Records `dependency` on this component's side only
    pub fn ensure_dependency(&self, dependency: &Component) -> bool {
        self.node().ensure_dependency(dependency.downgrade())
    }

    /// Records `dependent` on this component's side only
    pub fn ensure_dependent(&self, dependent: &Component) -> bool {
        self.node().ensure_dependent(dependent.downgrade())
    }

    pub fn downgrade(&self) -> WeakComponent {
        match self {
            Component::Unit(unit) => WeakComponent::Unit(Arc::downgrade(unit)),
            Component::Stack(stack) => WeakComponent::Stack(Arc::downgrade(stack)),
        }
    }

    /// True when both handles point at the same component instance
    pub fn ptr_eq(&self, other: &Component) -> bool {
        match (self, other) {
            (Component::Unit(a), Component::Unit(b)) => Arc::ptr_eq(a, b),
            (Component::Stack(a), Component::Stack(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_unit(&self) -> Option<&Arc<Unit>> {
        match self {
            Component::Unit(unit) => Some(unit),
            Component::Stack(_) => None,
        }
    }

    pub fn as_stack(&self) -> Option<&Arc<Stack>> {
        match self {
            Component::Stack(stack) => Some(stack),
            Component::Unit(_) => None,
        }
    }
}

impl From<Unit> for Component {
    fn from(unit: Unit) -> Self {
        Component::Unit(Arc::new(unit))
    }
}

impl From<Arc<Unit>> for Component {
    fn from(unit: Arc<Unit>) -> Self {
        Component::Unit(unit)
    }
}

impl From<Stack> for Component {
    fn from(stack: Stack) -> Self {
        Component::Stack(Arc::new(stack))
    }
}

impl From<Arc<Stack>> for Component {
    fn from(stack: Arc<Stack>) -> Self {
        Component::Stack(stack)
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Unit(unit) => fmt::Display::fmt(unit.as_ref(), f),
            Component::Stack(stack) => fmt::Display::fmt(stack.as_ref(), f),
        }
    }
}

/// A non-owning edge handle
#[derive(Debug, Clone)]
pub enum WeakComponent {
    Unit(Weak<Unit>),
    Stack(Weak<Stack>),
}

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        match self {
            WeakComponent::Unit(unit) => unit.upgrade().map(Component::Unit),
            WeakComponent::Stack(stack) => stack.upgrade().map(Component::Stack),
        }
    }

    pub fn ptr_eq(&self, other: &WeakComponent) -> bool {
        match (self, other) {
            (WeakComponent::Unit(a), WeakComponent::Unit(b)) => a.ptr_eq(b),
            (WeakComponent::Stack(a), WeakComponent::Stack(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}
