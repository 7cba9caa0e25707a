//! Component graph for stackrun
//!
//! Units and stacks, the edges between them, and the machinery that builds
//! and validates the graph. Nothing in here walks the filesystem; the only
//! I/O is symlink resolution when canonicalizing paths.

mod component;
mod components;
mod context;
mod graph;
pub mod paths;
mod registry;
mod stack;
mod unit;
mod units_map;

pub use component::{Component, Kind, WeakComponent};
pub use components::Components;
pub use context::{DiscoveryContext, Origin};
pub use graph::{DependencyGraph, GraphError};
pub use registry::ThreadSafeComponents;
pub use stack::{Report, Stack, StackExecution};
pub use unit::{ExclusionReason, RunOptions, Unit, UnitExecution};
pub use units_map::UnitsMap;
