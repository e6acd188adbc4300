//! Core type definitions for the ACO schema optimizer

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Resource (table) name; identity is the name string
pub type ResourceName = String;

/// Field metadata supplied by an external schema-description step
///
/// Replaces reflection-based foreign-key discovery: the loading step hands
/// the engine plain data and the graph algorithm never touches an ORM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMeta {
    pub name: String,
    /// Target resource when this field is a foreign key
    pub foreign_key: Option<String>,
}

impl FieldMeta {
    pub fn plain(name: impl Into<String>) -> Self {
        FieldMeta {
            name: name.into(),
            foreign_key: None,
        }
    }

    pub fn foreign_key(name: impl Into<String>, target: impl Into<String>) -> Self {
        FieldMeta {
            name: name.into(),
            foreign_key: Some(target.into()),
        }
    }
}

/// Pheromone level on a schema-graph edge (biological optimization)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pheromone(pub f64);

impl Pheromone {
    /// Floor: a trail never fades to zero, so cold edges stay reachable
    pub const FLOOR: f64 = 0.1;
    /// Cap honored by the transition-rule weighting only; stored levels are
    /// unbounded above the floor so reinforcement always registers
    pub const MAX: f64 = 10.0;

    pub fn new(value: f64) -> Self {
        Pheromone(value.max(Self::FLOOR))
    }

    pub fn reinforce(&mut self, contribution: f64) {
        let contribution = contribution.max(0.0);
        self.0 = (self.0 + contribution).max(Self::FLOOR);
    }

    pub fn decay(&mut self, decay_factor: f64) {
        self.0 = (self.0 * (1.0 - decay_factor)).max(Self::FLOOR);
    }

    pub fn level(&self) -> f64 {
        self.0
    }
}

impl Default for Pheromone {
    fn default() -> Self {
        Pheromone(Self::FLOOR)
    }
}

/// Content fingerprint of a join condition
///
/// Detects definition drift: when a recomputed hash diverges from the stored
/// one the edge's trail is stale and must stop biasing path choice.
pub fn join_hash(join_condition: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(join_condition.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Directed edge key in the schema graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: ResourceName,
    pub to: ResourceName,
}

impl EdgeKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        EdgeKey {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl std::fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}
