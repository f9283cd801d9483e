use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use super::graph::TaskGraph;
use crate::core::config::MissingDependency;
use crate::core::errors::FlowError;

/// Validates the dependencies of the tasks.
///
/// Under `Ignore`, undeclared names are logged and left for the executor to
/// treat as satisfied.
pub(crate) fn validate_task_dependencies<T, E>(
    graph: &TaskGraph<T, E>,
    policy: MissingDependency,
) -> Result<(), FlowError<E>> {
    for (name, descriptor) in graph.iter() {
        for dependency in descriptor.dependencies() {
            if graph.contains(dependency) {
                continue;
            }
            match policy {
                MissingDependency::Reject => {
                    return Err(FlowError::UnknownDependency {
                        task: name.to_string(),
                        dependency: dependency.clone(),
                    });
                }
                MissingDependency::Ignore => {
                    warn!(
                        "Dependency '{}' for task '{}' not found; treating it as satisfied",
                        dependency, name
                    );
                }
            }
        }
    }
    Ok(())
}

/// Validates that no tasks wait on each other.
pub(crate) fn validate_graph_structure<T, E>(graph: &TaskGraph<T, E>) -> Result<(), FlowError<E>> {
    let mut dag = DiGraph::<&str, ()>::new();
    let mut node_indices: HashMap<&str, NodeIndex> = HashMap::new();

    for name in graph.names() {
        node_indices.insert(name, dag.add_node(name));
    }

    for (name, descriptor) in graph.iter() {
        let dependent_index = node_indices[name];
        let unique: HashSet<&str> = descriptor.dependencies().iter().map(String::as_str).collect();
        for dependency in unique {
            if let Some(&dependency_index) = node_indices.get(dependency) {
                dag.add_edge(dependency_index, dependent_index, ());
            }
        }
    }

    if !is_cyclic_directed(&dag) {
        return Ok(());
    }

    let mut cyclic: HashSet<&str> = HashSet::new();
    for component in tarjan_scc(&dag) {
        let self_loop = component.len() == 1 && dag.contains_edge(component[0], component[0]);
        if component.len() > 1 || self_loop {
            cyclic.extend(component.into_iter().map(|index| dag[index]));
        }
    }

    Err(FlowError::DependencyCycle {
        tasks: graph
            .names()
            .filter(|name| cyclic.contains(name))
            .map(str::to_string)
            .collect(),
    })
}
