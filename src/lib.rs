//! stackrun - dependency-aware discovery for infrastructure units and stacks
//!
//! A unit is a directory holding a `unit.toml`; a stack is a directory
//! holding a `stack.toml` that groups units. stackrun finds them, links the
//! dependencies they declare into a graph, rejects cycles, and decides
//! which units a given command should skip. Output of concurrently running
//! units is serialized per destination through [`sink::UnitWriter`].

pub mod cli;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod sink;

pub use discovery::{Discovery, DiscoveryError};
pub use domain::{Component, Components, DiscoveryContext, GraphError, Kind, Stack, ThreadSafeComponents, Unit, UnitsMap};
