//! Ordered collections of components
//!
//! [`Components`] owns strong handles to its members. Filtering and sorting
//! return new collections sharing the same component instances, so edges
//! recorded on a component stay visible through every collection holding it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::component::{Component, Kind};
use super::graph::GraphError;
use super::stack::Stack;
use super::unit::Unit;

#[derive(Debug, Clone, Default)]
pub struct Components(Vec<Component>);

impl Components {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, component: Component) {
        self.0.push(component);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.0.iter()
    }

    /// Returns a copy sorted lexicographically by path string
    /// (`/live/app-db` before `/live/app/db`)
    pub fn sort(&self) -> Components {
        let mut sorted = self.0.clone();
        sorted.sort_by(|a, b| a.path().as_os_str().cmp(b.path().as_os_str()));
        Components(sorted)
    }

    /// Returns the components of the given kind, preserving order
    pub fn filter(&self, kind: Kind) -> Components {
        self.iter().filter(|c| c.kind() == kind).cloned().collect()
    }

    /// Returns the components located at `path`
    pub fn filter_by_path(&self, path: &Path) -> Components {
        self.iter().filter(|c| c.path() == path).cloned().collect()
    }

    /// Returns every component not located at `path`
    pub fn remove_by_path(&self, path: &Path) -> Components {
        self.iter().filter(|c| c.path() != path).cloned().collect()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Component> {
        self.iter().find(|c| c.path() == path)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.iter().map(|c| c.path().to_path_buf()).collect()
    }

    pub fn units(&self) -> Vec<Arc<Unit>> {
        self.iter().filter_map(|c| c.as_unit().cloned()).collect()
    }

    pub fn stacks(&self) -> Vec<Arc<Stack>> {
        self.iter().filter_map(|c| c.as_stack().cloned()).collect()
    }

    /// Returns a component taking part in a dependency cycle, if any
    pub fn find_cycle(&self) -> Option<Component> {
        self.detect_cycle().map(|(component, _)| component)
    }

    /// Fails with [`GraphError::CycleDetected`] if the graph has a cycle
    pub fn cycle_check(&self) -> Result<(), GraphError> {
        match self.detect_cycle() {
            None => Ok(()),
            Some((component, chain)) => {
                let description = chain
                    .iter()
                    .map(|path| path.display().to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");

                Err(GraphError::CycleDetected {
                    path: component.path().to_path_buf(),
                    description,
                })
            }
        }
    }

    fn detect_cycle(&self) -> Option<(Component, Vec<PathBuf>)> {
        let mut search = CycleSearch::default();

        for component in self.iter() {
            if let Some(found) = search.visit(component) {
                return Some(found);
            }
        }

        None
    }
}

/// Depth-first search state: finished nodes and the current path.
///
/// The walk keeps its own frame stack so long dependency chains do not
/// grow the thread's call stack.
#[derive(Default)]
struct CycleSearch {
    visited: HashSet<PathBuf>,
    on_stack: HashSet<PathBuf>,
    stack: Vec<PathBuf>,
}

/// Dependencies of one node still to be explored, in reverse order
struct Frame {
    pending: Vec<Component>,
}

impl Frame {
    fn enter(component: &Component) -> Self {
        let mut pending = component.dependencies();
        pending.reverse();
        Self { pending }
    }
}

impl CycleSearch {
    fn visit(&mut self, root: &Component) -> Option<(Component, Vec<PathBuf>)> {
        if self.visited.contains(root.path()) {
            return None;
        }

        self.push(root.path().to_path_buf());
        let mut frames = vec![Frame::enter(root)];

        while let Some(frame) = frames.last_mut() {
            let Some(dependency) = frame.pending.pop() else {
                frames.pop();
                if let Some(path) = self.stack.pop() {
                    self.on_stack.remove(&path);
                    self.visited.insert(path);
                }
                continue;
            };

            let path = dependency.path().to_path_buf();

            if self.on_stack.contains(&path) {
                let start = self.stack.iter().position(|p| p == &path).unwrap_or(0);
                let mut chain = self.stack[start..].to_vec();
                chain.push(path);
                return Some((dependency, chain));
            }

            if self.visited.contains(&path) {
                continue;
            }

            self.push(path);
            frames.push(Frame::enter(&dependency));
        }

        None
    }

    fn push(&mut self, path: PathBuf) {
        self.on_stack.insert(path.clone());
        self.stack.push(path);
    }
}

impl FromIterator<Component> for Components {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Components(iter.into_iter().collect())
    }
}

impl From<Vec<Component>> for Components {
    fn from(components: Vec<Component>) -> Self {
        Components(components)
    }
}

impl IntoIterator for Components {
    type Item = Component;
    type IntoIter = std::vec::IntoIter<Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Components {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
