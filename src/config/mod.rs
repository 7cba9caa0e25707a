//! # Configuration
//!
//! Configuration inputs consumed by discovery and the CLI.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Unit | TOML | `<unit dir>/unit.toml` |
//! | Stack | TOML | `<stack dir>/stack.toml` |
//! | Project settings | TOML | `.stackrun.toml` (nearest ancestor) |
//! | Global settings | TOML | `~/.config/stackrun/config.toml` |
//!
//! Unit and stack files are treated as already validated once parsed: the
//! graph core only asks them for dependency paths, destroy protection and
//! exclusion rules.

mod settings;
mod stack;
mod unit;

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use settings::{DiscoverySettings, GlobalSettings, OutputFormat, ProjectSettings, Settings};
pub use stack::{StackConfig, StackUnitEntry};
pub use unit::{DependenciesBlock, ExcludeBlock, UnitConfig, ALL_ACTIONS, ALL_EXCEPT_OUTPUT};

/// File name marking a unit directory
pub const UNIT_FILE: &str = "unit.toml";

/// File name marking a stack directory
pub const STACK_FILE: &str = "stack.toml";

/// File name of the project settings
pub const PROJECT_FILE: &str = ".stackrun.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Reads and deserializes a TOML file, naming the file in errors
pub(crate) fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&content)
        .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
}
