//! Pheromone graph store
//!
//! Persisted edge records for the schema graph: latency, pheromone level,
//! decay timestamp and a join-condition fingerprint. The store is the
//! principal concurrently-mutated resource: many explorations read and
//! reinforce edges at once, so all mutations are per-edge atomic (DashMap
//! entry locking). Lost updates between racing reinforcements are tolerable;
//! partial writes and negative pheromone are not.

use crate::types::{join_hash, EdgeKey, Pheromone};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Pluggable edge-cost estimator
///
/// The real estimator lives outside this crate (statistics, explain plans);
/// the default assigns unit cost to every join.
pub trait CostEstimator: Send + Sync {
    fn estimate(&self, from: &str, to: &str, join_condition: &str) -> f64;
}

/// Default estimator: every join costs 1.0
pub struct UnitCostEstimator;

impl CostEstimator for UnitCostEstimator {
    fn estimate(&self, _from: &str, _to: &str, _join_condition: &str) -> f64 {
        1.0
    }
}

/// Persisted schema-graph edge record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaGraphEdge {
    pub from_table: String,
    pub to_table: String,
    pub join_condition: String,
    /// Estimated traversal cost, never negative
    pub latency: f64,
    pub pheromone: Pheromone,
    pub last_decay: DateTime<Utc>,
    /// Fingerprint of `join_condition`
    pub join_hash: String,
    /// Set when a recomputed hash diverged from the stored one
    pub hash_updated: bool,
}

/// Concurrent store of schema-graph edges
pub struct PheromoneGraphStore {
    edges: DashMap<EdgeKey, SchemaGraphEdge>,
    estimator: Arc<dyn CostEstimator>,
}

impl PheromoneGraphStore {
    pub fn new(estimator: Arc<dyn CostEstimator>) -> Self {
        PheromoneGraphStore {
            edges: DashMap::new(),
            estimator,
        }
    }

    pub fn with_unit_costs() -> Self {
        Self::new(Arc::new(UnitCostEstimator))
    }

    /// Register or refresh an edge
    ///
    /// On first discovery the edge starts at the pheromone floor with the
    /// estimator's latency. When the join condition drifted, the record is
    /// flagged `hash_updated` and its pheromone resets to the floor: a stale
    /// trail must not keep biasing path choice.
    pub fn upsert_edge(&self, from: &str, to: &str, join_condition: &str) {
        let key = EdgeKey::new(from, to);
        let hash = join_hash(join_condition);

        match self.edges.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                let edge = occupied.get_mut();
                if edge.join_hash != hash {
                    debug!(edge = %EdgeKey::new(from, to), "join condition drifted, resetting trail");
                    edge.join_condition = join_condition.to_string();
                    edge.join_hash = hash;
                    edge.hash_updated = true;
                    edge.pheromone = Pheromone::default();
                    edge.latency = self.estimate_latency(from, to, join_condition);
                } else if edge.hash_updated {
                    // Condition confirmed unchanged since the drift: the
                    // record is current again
                    edge.hash_updated = false;
                }
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(SchemaGraphEdge {
                    from_table: from.to_string(),
                    to_table: to.to_string(),
                    join_condition: join_condition.to_string(),
                    latency: self.estimate_latency(from, to, join_condition),
                    pheromone: Pheromone::default(),
                    last_decay: Utc::now(),
                    join_hash: hash,
                    hash_updated: false,
                });
            }
        }
    }

    /// Decay a single edge: `max(floor, level * (1 - decay_factor))`
    pub fn decay(&self, key: &EdgeKey, decay_factor: f64, now: DateTime<Utc>) {
        if let Some(mut edge) = self.edges.get_mut(key) {
            edge.pheromone.decay(decay_factor);
            edge.last_decay = now;
        }
    }

    /// Decay every edge in the store
    pub fn decay_all(&self, decay_factor: f64, now: DateTime<Utc>) {
        for mut edge in self.edges.iter_mut() {
            edge.pheromone.decay(decay_factor);
            edge.last_decay = now;
        }
    }

    /// Additive reinforcement, clamped non-negative
    pub fn reinforce(&self, key: &EdgeKey, contribution: f64) {
        if let Some(mut edge) = self.edges.get_mut(key) {
            edge.pheromone.reinforce(contribution);
        }
    }

    pub fn get(&self, key: &EdgeKey) -> Option<SchemaGraphEdge> {
        self.edges.get(key).map(|e| e.clone())
    }

    /// Pheromone level and latency for the transition rule; unknown edges
    /// read as floor pheromone at unit latency
    pub fn trail(&self, key: &EdgeKey) -> (f64, f64) {
        match self.edges.get(key) {
            Some(edge) => (edge.pheromone.level(), edge.latency),
            None => (Pheromone::FLOOR, 1.0),
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Snapshot of all edge records
    pub fn scan(&self) -> Vec<SchemaGraphEdge> {
        self.edges.iter().map(|e| e.value().clone()).collect()
    }

    /// Drop every edge `keep` rejects; used when a metadata refresh removes
    /// relationships from the schema
    pub fn retain(&self, mut keep: impl FnMut(&EdgeKey) -> bool) {
        self.edges.retain(|key, _| keep(key));
    }

    pub fn stats(&self) -> StoreStats {
        let edge_count = self.edges.len();
        let avg_pheromone = if edge_count == 0 {
            0.0
        } else {
            let sum: f64 = self.edges.iter().map(|e| e.pheromone.level()).sum();
            sum / edge_count as f64
        };
        let stale_edges = self.edges.iter().filter(|e| e.hash_updated).count();

        StoreStats {
            edge_count,
            avg_pheromone,
            stale_edges,
        }
    }

    fn estimate_latency(&self, from: &str, to: &str, join_condition: &str) -> f64 {
        let estimate = self.estimator.estimate(from, to, join_condition);
        if estimate.is_finite() && estimate >= 0.0 {
            estimate
        } else {
            1.0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub edge_count: usize,
    pub avg_pheromone: f64,
    pub stale_edges: usize,
}
