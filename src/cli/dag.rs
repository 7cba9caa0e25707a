//! Dependency graph commands

use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

use super::app::Session;
use super::output::Output;
use crate::domain::DependencyGraph;

#[derive(Subcommand)]
pub enum DagCommands {
    /// Print the dependency graph in DOT format
    Graph,

    /// Print components in the order they can run
    Order {
        /// Dependents first, as a destroy would run
        #[arg(long)]
        destroy: bool,
    },
}

pub(crate) fn run(cmd: DagCommands, output: &Output, session: &Session) -> Result<()> {
    match cmd {
        DagCommands::Graph => graph(output, session),
        DagCommands::Order { destroy } => order(output, session, destroy),
    }
}

fn graph(output: &Output, session: &Session) -> Result<()> {
    let components = session.discover("dag", &[])?;
    let graph = DependencyGraph::from_components(&components);

    if output.is_json() {
        let nodes: Vec<_> = components
            .paths()
            .iter()
            .map(|path| {
                let dependencies: Vec<String> = graph
                    .dependencies(path)
                    .iter()
                    .map(|dependency| session.display_path(dependency))
                    .collect();
                json!({
                    "path": session.display_path(path),
                    "dependencies": dependencies,
                })
            })
            .collect();
        output.data(&nodes);
    } else {
        print!("{}", graph.to_dot());
    }

    Ok(())
}

fn order(output: &Output, session: &Session, destroy: bool) -> Result<()> {
    let command = if destroy { "destroy" } else { "apply" };
    let components = session.discover(command, &[])?;
    let graph = DependencyGraph::from_components(&components);

    let order = if destroy {
        graph.destroy_order()?
    } else {
        graph.run_order()?
    };

    let order: Vec<String> = order.iter().map(|path| session.display_path(path)).collect();

    if output.is_json() {
        output.data(&order);
    } else {
        for (position, path) in order.iter().enumerate() {
            output.row(&[&(position + 1).to_string(), path]);
        }
    }

    Ok(())
}
