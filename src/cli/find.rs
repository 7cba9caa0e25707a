//! Find command

use anyhow::Result;
use serde::Serialize;

use super::app::Session;
use super::output::Output;
use crate::domain::{Component, Kind, Origin};

#[derive(Debug, Serialize)]
struct FoundComponent {
    path: String,
    kind: Kind,
    external: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<Origin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<Vec<String>>,
}

impl FoundComponent {
    fn new(session: &Session, component: &Component, with_dependencies: bool) -> Self {
        let dependencies = with_dependencies.then(|| {
            let mut paths: Vec<String> = component
                .dependencies()
                .iter()
                .map(|dependency| session.display_path(dependency.path()))
                .collect();
            paths.sort();
            paths
        });

        Self {
            path: session.display_path(component.path()),
            kind: component.kind(),
            external: component.is_external(),
            origin: component.discovery_context().and_then(|context| context.origin),
            dependencies,
        }
    }
}

/// Lists discovered units and stacks
pub(crate) fn run(output: &Output, session: &Session, dependencies: bool, external: bool) -> Result<()> {
    let components = session.discover("find", &[])?;

    let found: Vec<FoundComponent> = components
        .iter()
        .filter(|component| external || !component.is_external())
        .map(|component| FoundComponent::new(session, component, dependencies))
        .collect();

    if output.is_json() {
        output.data(&found);
    } else if found.is_empty() {
        println!("No units or stacks found in {}", session.root().display());
    } else {
        for component in &found {
            let path = if component.external {
                format!("{} (external)", component.path)
            } else {
                component.path.clone()
            };
            output.row(&[component.kind.as_str(), &path]);

            for dependency in component.dependencies.iter().flatten() {
                println!("  -> {}", dependency);
            }
        }
    }

    Ok(())
}
