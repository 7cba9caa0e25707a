//! Excluded command

use std::path::PathBuf;

use anyhow::Result;
use serde::Serialize;

use super::app::Session;
use super::output::Output;
use crate::discovery::Discovery;
use crate::domain::ExclusionReason;

#[derive(Debug, Serialize)]
struct UnitStatus {
    path: String,
    excluded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

/// Reports which units `command` would skip
pub(crate) fn run(
    output: &Output,
    session: &Session,
    command: &str,
    args: &[String],
    exclude_dirs: &[PathBuf],
) -> Result<()> {
    let components = session.discover(command, args)?;

    if !exclude_dirs.is_empty() {
        let marked = Discovery::apply_exclude_dirs(&components, exclude_dirs);
        tracing::debug!(marked, "applied directory filters");
    }

    let statuses: Vec<UnitStatus> = components
        .units()
        .iter()
        .map(|unit| {
            let reason = unit.exclusion_reason();
            UnitStatus {
                path: session.display_path(unit.path()),
                excluded: reason.is_some(),
                reason: reason.as_ref().map(ExclusionReason::as_str),
            }
        })
        .collect();

    if output.is_json() {
        output.data(&statuses);
        return Ok(());
    }

    for status in &statuses {
        let state = match status.reason {
            Some(reason) => format!("skip ({})", reason),
            None => "run".to_string(),
        };
        output.row(&[&status.path, &state]);
    }

    Ok(())
}
