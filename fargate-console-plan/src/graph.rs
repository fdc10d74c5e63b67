//! Dependency ordering of planned resources

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::PlanError;
use crate::plan::PlannedResource;

/// Order resources so every resource follows everything it depends on
///
/// Resources with no ordering constraint between them keep their declaration
/// order, so the same input always yields the same sequence.
pub fn order_resources(resources: Vec<PlannedResource>) -> Result<Vec<PlannedResource>, PlanError> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut index: HashMap<&str, NodeIndex> = HashMap::new();

    for (position, resource) in resources.iter().enumerate() {
        let node = graph.add_node(position);
        if index.insert(resource.id.as_str(), node).is_some() {
            return Err(PlanError::DuplicateResource(resource.id.clone()));
        }
    }

    for resource in &resources {
        let to = index[resource.id.as_str()];
        for dependency in &resource.depends_on {
            let from = index
                .get(dependency.as_str())
                .ok_or_else(|| PlanError::DanglingDependency {
                    resource: resource.id.clone(),
                    missing: dependency.clone(),
                })?;
            graph.add_edge(*from, to, ());
        }
    }

    // Kahn's algorithm over the declaration order; toposort only detects cycles.
    toposort(&graph, None).map_err(|cycle| {
        PlanError::DependencyCycle(resources[graph[cycle.node_id()]].id.clone())
    })?;

    let mut remaining: Vec<usize> = graph
        .node_indices()
        .map(|node| {
            graph
                .neighbors_directed(node, petgraph::Direction::Incoming)
                .count()
        })
        .collect();
    let mut placed = vec![false; resources.len()];
    let mut order = Vec::with_capacity(resources.len());

    while order.len() < resources.len() {
        let next = (0..resources.len())
            .find(|&i| !placed[i] && remaining[i] == 0)
            .ok_or_else(|| PlanError::DependencyCycle(resources[order.len()].id.clone()))?;

        placed[next] = true;
        order.push(next);
        let successors =
            graph.neighbors_directed(NodeIndex::new(next), petgraph::Direction::Outgoing);
        for successor in successors {
            remaining[graph[successor]] -= 1;
        }
    }

    let mut slots: Vec<Option<PlannedResource>> = resources.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .filter_map(|position| slots[position].take())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ResourceProperties;
    use fargate_console_models::{RemovalPolicy, SecretBundle};

    fn resource(id: &str, depends_on: &[&str]) -> PlannedResource {
        PlannedResource {
            id: id.to_string(),
            depends_on: depends_on.iter().map(|d| d.to_string()).collect(),
            properties: ResourceProperties::SecretBundle(SecretBundle {
                name: id.to_string(),
                fields: Default::default(),
                removal_policy: RemovalPolicy::Destroy,
            }),
        }
    }

    fn ids(resources: &[PlannedResource]) -> Vec<&str> {
        resources.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let ordered = order_resources(vec![
            resource("service", &["task", "efs"]),
            resource("task", &["secrets"]),
            resource("efs", &[]),
            resource("secrets", &[]),
        ])
        .unwrap();

        assert_eq!(ids(&ordered), vec!["efs", "secrets", "task", "service"]);
    }

    #[test]
    fn test_independent_resources_keep_declaration_order() {
        let ordered = order_resources(vec![
            resource("c", &[]),
            resource("a", &[]),
            resource("b", &[]),
        ])
        .unwrap();
        assert_eq!(ids(&ordered), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let result = order_resources(vec![resource("a", &["b"]), resource("b", &["a"])]);
        assert!(matches!(result, Err(PlanError::DependencyCycle(_))));
    }

    #[test]
    fn test_dangling_dependency_is_rejected() {
        let result = order_resources(vec![resource("a", &["missing"])]);
        assert!(matches!(
            result,
            Err(PlanError::DanglingDependency { ref missing, .. }) if missing == "missing"
        ));
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let result = order_resources(vec![resource("a", &[]), resource("a", &[])]);
        assert!(matches!(result, Err(PlanError::DuplicateResource(_))));
    }
}
