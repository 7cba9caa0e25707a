//! Unit configuration (`unit.toml`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{read_config, ConfigError};

/// Actions value excluding every command
pub const ALL_ACTIONS: &str = "all";

/// Actions value excluding every command except `output`
pub const ALL_EXCEPT_OUTPUT: &str = "all_except_output";

/// Declared dependencies of a unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependenciesBlock {
    /// Paths to the units this unit depends on, relative to the unit
    pub paths: Vec<String>,
}

/// Rules for skipping a unit for some commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludeBlock {
    /// Exclusion only applies when this is true
    #[serde(rename = "if")]
    pub condition: bool,

    /// Commands the unit is excluded from
    #[serde(default)]
    pub actions: Vec<String>,

    /// Also exclude everything this unit depends on
    #[serde(default)]
    pub exclude_dependencies: bool,
}

impl ExcludeBlock {
    /// Returns true if the rule matches the given command
    pub fn matches(&self, command: &str) -> bool {
        if !self.condition {
            return false;
        }

        self.actions.iter().any(|action| match action.as_str() {
            ALL_ACTIONS => true,
            ALL_EXCEPT_OUTPUT => command != "output",
            other => other == command,
        })
    }
}

/// Parsed configuration of a single unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitConfig {
    /// Blocks destroy for this unit and everything depending on it
    pub prevent_destroy: Option<bool>,

    /// Auxiliary files read by this unit, relative to the unit
    pub reads: Vec<String>,

    pub dependencies: Option<DependenciesBlock>,

    pub exclude: Option<ExcludeBlock>,
}

impl UnitConfig {
    /// Parses a unit configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Loads a unit configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        read_config(path)
    }

    /// Declared dependency paths, as written
    pub fn dependency_paths(&self) -> &[String] {
        self.dependencies
            .as_ref()
            .map(|deps| deps.paths.as_slice())
            .unwrap_or_default()
    }

    pub fn prevent_destroy(&self) -> Option<bool> {
        self.prevent_destroy
    }

    /// True when the exclude block skips this unit for `command`
    pub fn excluded_for_command(&self, command: &str) -> bool {
        self.exclude
            .as_ref()
            .map(|rule| rule.matches(command))
            .unwrap_or(false)
    }

    /// True when the exclude block also skips this unit's dependencies for `command`
    pub fn excludes_dependencies_for(&self, command: &str) -> bool {
        self.exclude
            .as_ref()
            .map(|rule| rule.exclude_dependencies && rule.matches(command))
            .unwrap_or(false)
    }

    /// Declared auxiliary files resolved against the unit directory
    pub fn reads(&self, unit_dir: &Path) -> Vec<PathBuf> {
        self.reads
            .iter()
            .map(|read| crate::domain::paths::clean(&unit_dir.join(read)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_unit() {
        let config = UnitConfig::parse(
            r#"
prevent_destroy = true
reads = ["../common/env.tfvars"]

[dependencies]
paths = ["../vpc", "../db/unit.toml"]

[exclude]
if = true
actions = ["plan"]
exclude_dependencies = true
"#,
        )
        .unwrap();

        assert_eq!(config.prevent_destroy(), Some(true));
        assert_eq!(config.dependency_paths(), ["../vpc", "../db/unit.toml"]);
        assert!(config.excluded_for_command("plan"));
        assert!(!config.excluded_for_command("apply"));
        assert!(config.excludes_dependencies_for("plan"));
        assert_eq!(
            config.reads(Path::new("/live/app")),
            vec![PathBuf::from("/live/common/env.tfvars")]
        );
    }

    #[test]
    fn empty_unit_is_valid() {
        let config = UnitConfig::parse("").unwrap();
        assert!(config.dependency_paths().is_empty());
        assert_eq!(config.prevent_destroy(), None);
        assert!(!config.excluded_for_command("apply"));
    }

    #[test]
    fn exclude_all_variants() {
        let mut rule = ExcludeBlock {
            condition: true,
            actions: vec![ALL_ACTIONS.to_string()],
            exclude_dependencies: false,
        };
        assert!(rule.matches("output"));
        assert!(rule.matches("destroy"));

        rule.actions = vec![ALL_EXCEPT_OUTPUT.to_string()];
        assert!(!rule.matches("output"));
        assert!(rule.matches("apply"));

        rule.condition = false;
        assert!(!rule.matches("apply"));
    }

    #[test]
    fn unknown_field_type_is_parse_error() {
        let result = UnitConfig::parse("prevent_destroy = \"yes\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
