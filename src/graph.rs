//! Resource-relationship graph
//!
//! Builds a directed graph over resources from externally supplied
//! foreign-key metadata. Purely derived and idempotent: the same metadata
//! always produces the same graph regardless of the input map's iteration
//! order, because resources are aggregated over a sorted view while
//! adjacency keeps first-discovery insertion order for reproducible
//! downstream partitioning.

use crate::types::{FieldMeta, ResourceName};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Directed relationship: source resource holds a foreign key into target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub source: ResourceName,
    pub target: ResourceName,
    /// Foreign-key field on the source resource
    pub field: String,
}

impl RelationshipEdge {
    /// Join condition in `source.field = target.id` form
    pub fn join_condition(&self) -> String {
        format!("{}.{} = {}.id", self.source, self.field, self.target)
    }
}

/// Directed adjacency over resources, insertion-ordered by first discovery
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipGraph {
    nodes: Vec<ResourceName>,
    outgoing: HashMap<ResourceName, Vec<RelationshipEdge>>,
    incoming: HashMap<ResourceName, Vec<RelationshipEdge>>,
}

impl RelationshipGraph {
    /// Nodes in first-discovery order
    pub fn nodes(&self) -> &[ResourceName] {
        &self.nodes
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.outgoing.contains_key(resource)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(|edges| edges.len()).sum()
    }

    /// Edges whose foreign key lives on `resource`
    pub fn outgoing(&self, resource: &str) -> &[RelationshipEdge] {
        self.outgoing.get(resource).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Edges whose foreign key points at `resource`
    pub fn incoming(&self, resource: &str) -> &[RelationshipEdge] {
        self.incoming.get(resource).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All edges, grouped by source in node order
    pub fn edges(&self) -> impl Iterator<Item = &RelationshipEdge> + '_ {
        self.nodes
            .iter()
            .flat_map(move |node| self.outgoing(node).iter())
    }

    /// Distinct outgoing targets; multiple foreign-key fields to the same
    /// target collapse to one entry (partitioning cares about adjacency,
    /// not join conditions)
    pub fn targets(&self, resource: &str) -> Vec<ResourceName> {
        let mut seen = Vec::new();
        for edge in self.outgoing(resource) {
            if !seen.contains(&edge.target) {
                seen.push(edge.target.clone());
            }
        }
        seen
    }

    /// Undirected neighborhood of a resource, in first-discovery order
    pub fn undirected_neighbors(&self, resource: &str) -> Vec<ResourceName> {
        let mut seen = Vec::new();
        for edge in self.outgoing(resource) {
            if !seen.contains(&edge.target) {
                seen.push(edge.target.clone());
            }
        }
        for edge in self.incoming(resource) {
            if !seen.contains(&edge.source) {
                seen.push(edge.source.clone());
            }
        }
        seen
    }

    fn register_node(&mut self, resource: &str) {
        if !self.outgoing.contains_key(resource) {
            self.nodes.push(resource.to_string());
            self.outgoing.insert(resource.to_string(), Vec::new());
            self.incoming.insert(resource.to_string(), Vec::new());
        }
    }

    fn register_edge(&mut self, edge: RelationshipEdge) {
        self.register_node(&edge.source);
        self.register_node(&edge.target);

        let outgoing = self.outgoing.get_mut(&edge.source).unwrap();
        if !outgoing.contains(&edge) {
            outgoing.push(edge.clone());
            self.incoming.get_mut(&edge.target).unwrap().push(edge);
        }
    }
}

/// Builds a [`RelationshipGraph`] from resource field metadata
pub struct RelationshipGraphBuilder;

impl RelationshipGraphBuilder {
    /// Build the directed graph; malformed foreign-key entries are skipped,
    /// partial coverage is preferable to total failure
    pub fn build(resources: &HashMap<ResourceName, Vec<FieldMeta>>) -> RelationshipGraph {
        let mut graph = RelationshipGraph::default();

        // Sorted view makes the build independent of HashMap iteration order
        let mut names: Vec<&ResourceName> = resources.keys().collect();
        names.sort();

        for name in names {
            graph.register_node(name);
            for field in &resources[name] {
                let Some(target) = &field.foreign_key else {
                    continue;
                };
                if target.trim().is_empty() {
                    warn!(
                        resource = %name,
                        field = %field.name,
                        "skipping foreign key with empty target"
                    );
                    continue;
                }
                graph.register_edge(RelationshipEdge {
                    source: name.clone(),
                    target: target.clone(),
                    field: field.name.clone(),
                });
            }
        }

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "relationship graph built"
        );
        graph
    }
}
