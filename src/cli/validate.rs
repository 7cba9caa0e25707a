//! Validate command

use anyhow::Result;

use super::app::Session;
use super::output::Output;

/// Discovers, links and cycle-checks the working directory
pub(crate) fn run(output: &Output, session: &Session) -> Result<()> {
    let components = session.discover("validate", &[])?;

    let units = components.units();
    let stacks = components.stacks();
    let external = units.iter().filter(|unit| unit.is_external()).count();

    if output.is_json() {
        output.data(&serde_json::json!({
            "valid": true,
            "units": units.len(),
            "stacks": stacks.len(),
            "external": external,
        }));
    } else {
        output.success(&format!(
            "Valid: {} unit(s), {} stack(s), {} external",
            units.len(),
            stacks.len(),
            external
        ));
    }

    Ok(())
}
