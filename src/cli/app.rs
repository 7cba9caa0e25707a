//! Main CLI application structure

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use super::output::{Output, OutputFormat};
use super::{dag, excluded, find, validate};
use crate::config::{ProjectSettings, Settings};
use crate::discovery::Discovery;
use crate::domain::paths::canonicalize_or_clean;
use crate::domain::{Components, DiscoveryContext};

#[derive(Parser)]
#[command(name = "stackrun")]
#[command(author, version, about = "Dependency-aware discovery for infrastructure units and stacks")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory to discover units in
    #[arg(long, short = 'C', global = true, default_value = ".", env = "STACKRUN_WORKING_DIR")]
    pub working_dir: PathBuf,

    /// Output format (defaults to the global setting)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Skip dependencies that match no discovered unit instead of failing
    #[arg(long, global = true)]
    pub ignore_dependency_errors: bool,

    /// Do not discover dependencies outside the working directory
    #[arg(long, global = true)]
    pub no_external: bool,

    /// Walker threads (0 picks automatically)
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List discovered units and stacks
    Find {
        /// Show each component's dependencies
        #[arg(long)]
        dependencies: bool,

        /// Include units discovered outside the working directory
        #[arg(long)]
        external: bool,
    },

    /// Inspect the dependency graph
    #[command(subcommand)]
    Dag(dag::DagCommands),

    /// Check that every dependency resolves and the graph has no cycles
    Validate,

    /// Show which units a command would skip, and why
    Excluded {
        /// Skip every unit below this directory (repeatable)
        #[arg(long = "exclude-dir")]
        exclude_dirs: Vec<PathBuf>,

        /// Command to evaluate (e.g. plan, apply, destroy)
        command: String,

        /// Arguments passed along with the command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

impl Cli {
    fn project_settings(&self, mut settings: ProjectSettings) -> ProjectSettings {
        if self.ignore_dependency_errors {
            settings.ignore_dependency_errors = true;
        }
        if self.no_external {
            settings.discover_external = false;
        }
        if let Some(threads) = self.threads {
            settings.discovery.threads = threads;
        }
        settings
    }
}

/// Resolved working directory and effective settings for one invocation
pub(crate) struct Session {
    root: PathBuf,
    settings: ProjectSettings,
}

impl Session {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discovers components as seen by `command`
    pub fn discover(&self, command: &str, args: &[String]) -> Result<Components> {
        let context = DiscoveryContext::new(command, args.iter().cloned(), &self.root);
        Discovery::new(&self.root, context, self.settings.clone())
            .run()
            .with_context(|| format!("Discovery failed in {}", self.root.display()))
    }

    /// Path relative to the working directory when inside it
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(relative) if relative.as_os_str().is_empty() => ".".to_string(),
            Ok(relative) => relative.display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }
}

fn init_logging(verbose: bool, configured: Option<&str>) {
    let fallback = match (verbose, configured) {
        (true, _) => "stackrun=debug",
        (false, Some(filter)) => filter,
        (false, None) => "stackrun=info",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    // A subscriber may already be installed when running inside tests
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = if cli.working_dir.is_absolute() {
        cli.working_dir.clone()
    } else {
        std::env::current_dir()
            .context("Failed to read current directory")?
            .join(&cli.working_dir)
    };
    let root = canonicalize_or_clean(&working_dir);

    let settings = Settings::load(&root)?;
    init_logging(cli.verbose, settings.global.log_filter.as_deref());

    if let Some(project_root) = &settings.project_root {
        tracing::debug!(project_root = %project_root.display(), "loaded project settings");
    }

    let format = cli.format.unwrap_or_else(|| settings.global.default_format.into());
    let output = Output::new(format);
    let session = Session {
        root,
        settings: cli.project_settings(settings.project.clone()),
    };

    match cli.command {
        Commands::Find { dependencies, external } => find::run(&output, &session, dependencies, external)?,
        Commands::Dag(cmd) => dag::run(cmd, &output, &session)?,
        Commands::Validate => validate::run(&output, &session)?,
        Commands::Excluded { exclude_dirs, command, args } => {
            let exclude_dirs: Vec<PathBuf> = exclude_dirs
                .into_iter()
                .map(|dir| if dir.is_absolute() { dir } else { session.root().join(dir) })
                .collect();
            excluded::run(&output, &session, &command, &args, &exclude_dirs)?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_project_settings() {
        let cli = Cli::parse_from(["stackrun", "--no-external", "--threads", "3", "--ignore-dependency-errors", "validate"]);
        let settings = cli.project_settings(ProjectSettings::default());

        assert!(!settings.discover_external);
        assert!(settings.ignore_dependency_errors);
        assert_eq!(settings.discovery.threads, 3);
    }

    #[test]
    fn excluded_keeps_hyphenated_args() {
        let cli = Cli::parse_from(["stackrun", "excluded", "--exclude-dir", "prod", "apply", "-destroy"]);
        match cli.command {
            Commands::Excluded { exclude_dirs, command, args } => {
                assert_eq!(exclude_dirs, vec![PathBuf::from("prod")]);
                assert_eq!(command, "apply");
                assert_eq!(args, vec!["-destroy".to_string()]);
            }
            _ => panic!("expected excluded command"),
        }
    }

    #[test]
    fn display_path_is_relative_inside_root() {
        let session = Session {
            root: PathBuf::from("/live"),
            settings: ProjectSettings::default(),
        };

        assert_eq!(session.display_path(Path::new("/live/app/db")), "app/db");
        assert_eq!(session.display_path(Path::new("/live")), ".");
        assert_eq!(session.display_path(Path::new("/shared/net")), "/shared/net");
    }
}
