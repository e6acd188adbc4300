//! Village partitioning
//!
//! Bounds the search space for path exploration and pheromone bookkeeping on
//! large schemas by grouping related resources into bounded-size "villages".
//!
//! The partition is deterministic: traversal and merging follow
//! first-discovery order, so the same graph always yields the same villages.

use crate::graph::RelationshipGraph;
use crate::types::ResourceName;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::info;

/// Bounded-size cluster of resources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Village {
    pub members: Vec<ResourceName>,
}

impl Village {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.members.iter().any(|m| m == resource)
    }
}

/// Partitions the symmetrized relationship graph into villages
pub struct VillagePartitioner {
    max_group_size: usize,
}

impl VillagePartitioner {
    /// `max_group_size` must already be validated (> 0) by the engine config
    pub fn new(max_group_size: usize) -> Self {
        VillagePartitioner { max_group_size }
    }

    /// Partition all graph nodes into villages
    ///
    /// Invariants: villages are disjoint, their union is the node set, and
    /// every village has at most `max_group_size` members.
    pub fn partition(&self, graph: &RelationshipGraph) -> Vec<Village> {
        let components = self.connected_components(graph);

        // Oversized components are split into consecutive chunks; everything
        // becomes a merge candidate in encounter order.
        let mut candidates: Vec<Vec<ResourceName>> = Vec::new();
        for component in components {
            if component.len() <= self.max_group_size {
                candidates.push(component);
            } else {
                for chunk in component.chunks(self.max_group_size) {
                    candidates.push(chunk.to_vec());
                }
            }
        }

        // Greedy first-fit merge: fill the current bucket while the next
        // candidate still fits, otherwise close it as a finished village.
        let mut villages = Vec::new();
        let mut bucket: Vec<ResourceName> = Vec::new();
        for candidate in candidates {
            if bucket.len() + candidate.len() <= self.max_group_size {
                bucket.extend(candidate);
            } else {
                villages.push(Village { members: bucket });
                bucket = candidate;
            }
        }
        if !bucket.is_empty() {
            villages.push(Village { members: bucket });
        }

        info!(
            nodes = graph.node_count(),
            villages = villages.len(),
            max_group_size = self.max_group_size,
            "graph partitioned into villages"
        );
        villages
    }

    /// Connected components of the symmetrized graph via BFS; every node is
    /// visited exactly once, components and members in first-discovery order
    fn connected_components(&self, graph: &RelationshipGraph) -> Vec<Vec<ResourceName>> {
        let mut visited: HashSet<ResourceName> = HashSet::new();
        let mut components = Vec::new();

        for start in graph.nodes() {
            if visited.contains(start) {
                continue;
            }

            let mut component = Vec::new();
            let mut queue = VecDeque::new();
            visited.insert(start.clone());
            queue.push_back(start.clone());

            while let Some(node) = queue.pop_front() {
                for neighbor in graph.undirected_neighbors(&node) {
                    if visited.insert(neighbor.clone()) {
                        queue.push_back(neighbor);
                    }
                }
                component.push(node);
            }

            components.push(component);
        }

        components
    }
}
