//! Stack configuration (`stack.toml`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{read_config, ConfigError};

/// A unit declared as a member of a stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackUnitEntry {
    pub name: String,

    /// Member directory relative to the stack directory
    pub path: String,
}

/// Parsed configuration of a stack
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    #[serde(rename = "unit")]
    pub units: Vec<StackUnitEntry>,
}

impl StackConfig {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_config(path)
    }

    /// Member unit directories resolved against the stack directory
    pub fn unit_paths(&self, stack_dir: &Path) -> Vec<PathBuf> {
        self.units
            .iter()
            .map(|unit| crate::domain::paths::clean(&stack_dir.join(&unit.path)))
            .collect()
    }
}
