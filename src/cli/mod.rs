//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `find` | List discovered units and stacks |
//! | `dag graph` | DOT rendering of the dependency graph |
//! | `dag order` | Run (or `--destroy`) order |
//! | `validate` | Resolve dependencies and check for cycles |
//! | `excluded` | Which units a command would skip, and why |
//!
//! ## Output Formats
//!
//! All commands support `--format`:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Logging
//!
//! Logs go to stderr. `RUST_LOG` takes precedence, then `--verbose`
//! (`stackrun=debug`), then the `log_filter` global setting:
//! ```bash
//! RUST_LOG=stackrun=trace stackrun find
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod dag;
mod excluded;
mod find;
mod output;
mod validate;

pub use app::{run, Cli, Commands};
pub use dag::DagCommands;
pub use output::{Output, OutputFormat};
