//! Orchestrator settings
//!
//! Settings are stored in `.stackrun.toml` (project, nearest ancestor of the
//! working directory) and `~/.config/stackrun/config.toml` (global).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use super::{read_config, PROJECT_FILE};

/// Output format for commands
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How the working directory is walked
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DiscoverySettings {
    /// Walker threads (0 picks automatically)
    pub threads: usize,

    /// Descend into hidden directories
    pub include_hidden: bool,

    /// Skip paths listed in .gitignore files
    pub respect_gitignore: bool,

    /// Maximum directory depth below the working directory
    pub max_depth: Option<usize>,

    /// Directory names never descended into
    pub exclude_dirs: Vec<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            threads: 0,
            include_hidden: false,
            respect_gitignore: true,
            max_depth: None,
            exclude_dirs: vec![".terraform".to_string(), ".git".to_string()],
        }
    }
}

/// Project-level settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProjectSettings {
    /// Treat unresolved dependency paths as absent edges instead of failing
    pub ignore_dependency_errors: bool,

    /// Discover units outside the working directory that something depends on
    pub discover_external: bool,

    pub discovery: DiscoverySettings,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            ignore_dependency_errors: false,
            discover_external: true,
            discovery: DiscoverySettings::default(),
        }
    }
}

/// Global user settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalSettings {
    /// Default output format
    pub default_format: OutputFormat,

    /// Log filter used when RUST_LOG is unset (e.g. `stackrun=debug`)
    pub log_filter: Option<String>,
}

/// Combined settings (global + project)
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub project: ProjectSettings,
    pub global: GlobalSettings,
    pub project_root: Option<PathBuf>,
}

impl Settings {
    /// Loads settings for a working directory
    pub fn load(working_dir: &Path) -> Result<Self> {
        let global = Self::load_global()?;

        let (project, project_root) = match Self::find_project_root(working_dir) {
            Some(root) => (Self::load_project(&root)?, Some(root)),
            None => (ProjectSettings::default(), None),
        };

        Ok(Self {
            project,
            global,
            project_root,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "stackrun", "stackrun").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn load_global() -> Result<GlobalSettings> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalSettings::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalSettings::default());
        }

        read_config(&config_path).context("Failed to load global settings")
    }

    /// Loads project settings from a specific root
    pub fn load_project(project_root: &Path) -> Result<ProjectSettings> {
        let config_path = project_root.join(PROJECT_FILE);

        if !config_path.exists() {
            return Ok(ProjectSettings::default());
        }

        read_config(&config_path).context("Failed to load project settings")
    }

    /// Finds the nearest ancestor of `start` holding `.stackrun.toml`
    pub fn find_project_root(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(PROJECT_FILE).is_file() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings() {
        let settings = Settings::default();

        assert!(!settings.project.ignore_dependency_errors);
        assert!(settings.project.discover_external);
        assert_eq!(settings.project.discovery.exclude_dirs, vec![".terraform", ".git"]);
        assert_eq!(settings.global.default_format, OutputFormat::Text);
    }

    #[test]
    fn parse_project_settings() {
        let toml = r#"
ignore_dependency_errors = true

[discovery]
threads = 4
max_depth = 6
"#;

        let settings: ProjectSettings = toml::from_str(toml).unwrap();
        assert!(settings.ignore_dependency_errors);
        assert!(settings.discover_external);
        assert_eq!(settings.discovery.threads, 4);
        assert_eq!(settings.discovery.max_depth, Some(6));
        assert!(settings.discovery.respect_gitignore);
    }

    #[test]
    fn parse_global_settings() {
        let toml = r#"
default_format = "json"
log_filter = "stackrun=debug"
"#;

        let settings: GlobalSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.default_format, OutputFormat::Json);
        assert_eq!(settings.log_filter.as_deref(), Some("stackrun=debug"));
    }

    #[test]
    fn find_project_root_walks_up() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(PROJECT_FILE), "discover_external = false\n").unwrap();

        let sub_dir = dir.path().join("live").join("prod");
        fs::create_dir_all(&sub_dir).unwrap();

        assert_eq!(Settings::find_project_root(&sub_dir), Some(dir.path().to_path_buf()));

        let project = Settings::load_project(dir.path()).unwrap();
        assert!(!project.discover_external);
    }

    #[test]
    fn missing_project_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let project = Settings::load_project(dir.path()).unwrap();
        assert_eq!(project, ProjectSettings::default());
    }
}
