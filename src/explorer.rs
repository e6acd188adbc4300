//! Ant path exploration
//!
//! Stochastic search for a low-cost join path connecting a start resource to
//! a set of target resources. Each step applies the standard ACO transition
//! rule: an adjacent edge is chosen with probability proportional to
//! `pheromone^alpha / latency^beta`. Candidates stay inside the current
//! village while every remaining target lives there; otherwise the walk
//! falls back to the full graph, because villages bound typical search cost,
//! not correctness. The walk is acyclic and hop-bounded, so it fails fast
//! instead of blocking.

use crate::config::AcoConfig;
use crate::graph::{RelationshipEdge, RelationshipGraph};
use crate::store::PheromoneGraphStore;
use crate::types::{EdgeKey, Pheromone, ResourceName};
use crate::village::Village;
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Record of one successful traversal (append-only telemetry)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathRequest {
    pub request_time: DateTime<Utc>,
    /// Ordered edge sequence, `from->to` per hop
    pub path: Vec<String>,
    /// Sum of traversed edges' latency
    pub cost: f64,
    /// Reinforcement applied to each edge on the path
    pub pheromone_contribution: f64,
    pub materialized_view_created: bool,
}

/// A successful exploration result
#[derive(Debug, Clone)]
pub struct ExploredPath {
    /// Resources in visit order, starting with the start resource
    pub nodes: Vec<ResourceName>,
    /// Directed foreign-key edges in traversal order (an edge may have been
    /// walked against its direction; the key still identifies the FK edge)
    pub edges: Vec<RelationshipEdge>,
    pub cost: f64,
    pub pheromone_contribution: f64,
}

impl ExploredPath {
    /// Stable identity of the ordered edge sequence
    pub fn signature(&self) -> String {
        self.edges
            .iter()
            .map(|e| format!("{}->{}", e.source, e.target))
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn edge_keys(&self) -> Vec<EdgeKey> {
        self.edges
            .iter()
            .map(|e| EdgeKey::new(e.source.clone(), e.target.clone()))
            .collect()
    }

    pub fn to_request(&self, request_time: DateTime<Utc>) -> PathRequest {
        PathRequest {
            request_time,
            path: self
                .edges
                .iter()
                .map(|e| format!("{}->{}", e.source, e.target))
                .collect(),
            cost: self.cost,
            pheromone_contribution: self.pheromone_contribution,
            materialized_view_created: false,
        }
    }
}

/// One candidate move out of the current node
struct Candidate<'g> {
    edge: &'g RelationshipEdge,
    next: ResourceName,
    latency: f64,
    weight: f64,
}

/// Stochastic path explorer over the relationship graph
pub struct AntPathExplorer<'a> {
    graph: &'a RelationshipGraph,
    store: &'a PheromoneGraphStore,
    config: &'a AcoConfig,
}

impl<'a> AntPathExplorer<'a> {
    pub fn new(
        graph: &'a RelationshipGraph,
        store: &'a PheromoneGraphStore,
        config: &'a AcoConfig,
    ) -> Self {
        AntPathExplorer {
            graph,
            store,
            config,
        }
    }

    /// Walk from `start` until every target is reached
    ///
    /// Returns `None` when no candidates remain or the hop bound is hit;
    /// callers fall back to a naive join planner. On success every edge on
    /// the path is reinforced with `q / cost` immediately.
    pub fn explore(
        &self,
        start: &str,
        targets: &[ResourceName],
        village: Option<&Village>,
    ) -> Option<ExploredPath> {
        if !self.graph.contains(start) {
            return None;
        }

        let mut remaining: Vec<ResourceName> = Vec::new();
        for target in targets {
            if target.as_str() != start && !remaining.contains(target) {
                remaining.push(target.clone());
            }
        }

        let mut visited: HashSet<ResourceName> = HashSet::new();
        visited.insert(start.to_string());

        let mut nodes = vec![start.to_string()];
        let mut edges: Vec<RelationshipEdge> = Vec::new();
        let mut cost = 0.0;
        let mut current = start.to_string();
        let mut rng = rand::thread_rng();

        while !remaining.is_empty() {
            if edges.len() >= self.config.max_hops {
                debug!(start, hops = edges.len(), "hop bound exceeded, no path");
                return None;
            }

            let candidates = self.candidates(&current, &visited, &remaining, village);
            if candidates.is_empty() {
                debug!(start, node = %current, "no candidates remain, no path");
                return None;
            }

            let chosen = Self::select(&candidates, &mut rng);
            cost += chosen.latency;
            visited.insert(chosen.next.clone());
            nodes.push(chosen.next.clone());
            edges.push(chosen.edge.clone());
            remaining.retain(|t| *t != chosen.next);
            current = chosen.next.clone();
        }

        let pheromone_contribution = if cost > 0.0 {
            self.config.q / cost
        } else {
            self.config.q
        };

        let path = ExploredPath {
            nodes,
            edges,
            cost,
            pheromone_contribution,
        };

        // Online feedback: cheap, frequently-useful paths accumulate
        // pheromone faster than they decay
        for key in path.edge_keys() {
            self.store.reinforce(&key, pheromone_contribution);
        }

        debug!(
            start,
            cost = path.cost,
            hops = path.edges.len(),
            "path found"
        );
        Some(path)
    }

    /// Adjacent unvisited moves out of `current`, weighted by the
    /// transition rule
    fn candidates<'s>(
        &'s self,
        current: &str,
        visited: &HashSet<ResourceName>,
        remaining: &[ResourceName],
        village: Option<&Village>,
    ) -> Vec<Candidate<'s>> {
        // Village restriction applies only while every remaining target is
        // local; a target outside the village reopens the full graph
        let local = village.filter(|v| remaining.iter().all(|t| v.contains(t)));

        let mut candidates = Vec::new();
        let moves = self
            .graph
            .outgoing(current)
            .iter()
            .map(|e| (e, e.target.clone()))
            .chain(
                self.graph
                    .incoming(current)
                    .iter()
                    .map(|e| (e, e.source.clone())),
            );

        for (edge, next) in moves {
            if visited.contains(&next) {
                continue;
            }
            if local.map(|v| !v.contains(&next)).unwrap_or(false) {
                continue;
            }

            let key = EdgeKey::new(edge.source.clone(), edge.target.clone());
            let (pheromone, latency) = self.store.trail(&key);
            // Cap the trail here, not in the store: one runaway trail must
            // not drown the weighting, but stored levels keep increasing
            let weight = pheromone.min(Pheromone::MAX).powf(self.config.alpha)
                / latency.max(f64::EPSILON).powf(self.config.beta);

            candidates.push(Candidate {
                edge,
                next,
                latency,
                weight,
            });
        }

        candidates
    }

    /// Roulette-wheel selection proportional to candidate weight
    fn select<'s, 'g>(candidates: &'s [Candidate<'g>], rng: &mut impl Rng) -> &'s Candidate<'g> {
        let total: f64 = candidates.iter().map(|c| c.weight).sum();
        if total <= 0.0 {
            return &candidates[0];
        }

        let mut roll = rng.gen::<f64>() * total;
        for candidate in candidates {
            roll -= candidate.weight;
            if roll <= 0.0 {
                return candidate;
            }
        }
        candidates.last().unwrap()
    }
}
