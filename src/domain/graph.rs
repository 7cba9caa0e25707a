//! Graph errors and the petgraph snapshot of a linked graph
//!
//! [`DependencyGraph`] copies the edges of a linked [`Components`]
//! collection into a petgraph `DiGraph` for ordering and export. The
//! snapshot is read-only; edges are only ever added on the components.

use petgraph::algo::toposort;
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::components::Components;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error(
        "Unit {} depends on {}, which is not a known unit. Known units:\n{}",
        .unit.display(),
        .dependency.display(),
        format_known(.known)
    )]
    UnrecognizedDependency {
        unit: PathBuf,
        dependency: PathBuf,
        known: Vec<PathBuf>,
    },

    #[error("Dependency cycle detected at {}: {description}", .path.display())]
    CycleDetected { path: PathBuf, description: String },
}

fn format_known(known: &[PathBuf]) -> String {
    known
        .iter()
        .map(|path| format!("  - {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Read-only projection of a linked component graph
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Edge direction: dependency -> dependent
    graph: DiGraph<PathBuf, ()>,

    node_map: HashMap<PathBuf, NodeIndex>,
}

impl DependencyGraph {
    /// Snapshots the components and every component reachable through their edges
    pub fn from_components(components: &Components) -> Self {
        let mut graph = Self::default();

        let sorted = components.sort();
        for component in &sorted {
            graph.add_node(component.path());
        }

        for component in &sorted {
            let mut dependencies = component.dependencies();
            dependencies.sort_by(|a, b| a.path().as_os_str().cmp(b.path().as_os_str()));

            for dependency in dependencies {
                let from = graph.add_node(dependency.path());
                let to = graph.add_node(component.path());
                graph.graph.update_edge(from, to, ());
            }
        }

        graph
    }

    fn add_node(&mut self, path: &Path) -> NodeIndex {
        if let Some(idx) = self.node_map.get(path) {
            return *idx;
        }
        let idx = self.graph.add_node(path.to_path_buf());
        self.node_map.insert(path.to_path_buf(), idx);
        idx
    }

    /// Paths ordered so every dependency comes before its dependents
    pub fn run_order(&self) -> Result<Vec<PathBuf>, GraphError> {
        match toposort(&self.graph, None) {
            Ok(order) => Ok(order
                .into_iter()
                .map(|idx| self.graph[idx].clone())
                .collect()),
            Err(cycle) => {
                let path = self.graph[cycle.node_id()].clone();
                Err(GraphError::CycleDetected {
                    description: format!("{} is part of a cycle", path.display()),
                    path,
                })
            }
        }
    }

    /// Paths ordered so every dependent comes before its dependencies
    pub fn destroy_order(&self) -> Result<Vec<PathBuf>, GraphError> {
        let mut order = self.run_order()?;
        order.reverse();
        Ok(order)
    }

    pub fn dependencies(&self, path: &Path) -> Vec<PathBuf> {
        self.neighbors(path, Direction::Incoming)
    }

    pub fn dependents(&self, path: &Path) -> Vec<PathBuf> {
        self.neighbors(path, Direction::Outgoing)
    }

    fn neighbors(&self, path: &Path, direction: Direction) -> Vec<PathBuf> {
        let Some(idx) = self.node_map.get(path) else {
            return vec![];
        };

        let mut paths: Vec<PathBuf> = self
            .graph
            .neighbors_directed(*idx, direction)
            .map(|n| self.graph[n].clone())
            .collect();
        paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        paths
    }

    /// Graphviz rendering; edges point from a dependent to its dependency
    pub fn to_dot(&self) -> String {
        let mut labelled = self.graph.map(|_, path| path.display().to_string(), |_, _| "");
        labelled.reverse();
        format!("{}", Dot::with_config(&labelled, &[Config::EdgeNoLabel]))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.node_map.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}
