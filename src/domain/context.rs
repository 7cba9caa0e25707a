//! Discovery provenance
//!
//! Every component remembers how it was found: the working directory the
//! scan started from, the command being run, and which discovery phase
//! produced it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// The discovery phase that first produced a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Found by walking the working directory
    PathDiscovery,
    /// Found while walking the dependency graph
    GraphDiscovery,
    /// Found through a dependent/dependency relationship query
    RelationshipDiscovery,
    /// Lives outside the working directory, found because something depends on it
    ExternalDependency,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::PathDiscovery => "path_discovery",
            Origin::GraphDiscovery => "graph_discovery",
            Origin::RelationshipDiscovery => "relationship_discovery",
            Origin::ExternalDependency => "external_dependency",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance attached to a component when it is discovered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryContext {
    /// Directory discovery was started from
    pub working_dir: PathBuf,

    /// Command being run (e.g. `plan`, `apply`, `destroy`)
    pub command: String,

    /// Arguments passed along with the command
    #[serde(default)]
    pub args: Vec<String>,

    /// Discovery phase that produced the component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
}

impl DiscoveryContext {
    pub fn new(
        command: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            working_dir: working_dir.into(),
            command: command.into(),
            args: args.into_iter().map(Into::into).collect(),
            origin: None,
        }
    }

    /// Returns a copy carrying the given origin
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Sets the origin only if none was recorded yet.
    ///
    /// Returns true when the suggestion was taken.
    pub fn suggest_origin(&mut self, origin: Origin) -> bool {
        if self.origin.is_some() {
            return false;
        }
        self.origin = Some(origin);
        true
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// True for `destroy`, and for `apply` run with `-destroy`
    pub fn is_destroy(&self) -> bool {
        match self.command.as_str() {
            "destroy" => true,
            "apply" => self
                .args
                .iter()
                .any(|arg| arg == "-destroy" || arg == "--destroy"),
            _ => false,
        }
    }
}
