//! ACO Engine - Adaptive Schema-Relationship Graph Optimizer
//!
//! Turns entity foreign-key relationships into a directed graph, partitions
//! that graph into bounded-size localities ("villages") and runs an
//! ant-colony-style reinforcement process over join paths to decide which
//! multi-resource query paths deserve precomputation or indexing.
//!
//! # Architecture
//!
//! - Graph Layer: directed relationship graph from externally supplied
//!   foreign-key metadata
//! - Village Layer: bounded-size partitioning localizing path search
//! - Store Layer: persisted edge records with pheromone, latency and
//!   join-condition fingerprints
//! - Exploration Layer: stochastic path search with online reinforcement
//! - Maintenance Layer: scheduled pheromone decay with Tokio
//! - Promotion Layer: materialized-view and index recommendation tracking,
//!   consumed by an external housekeeping job

pub mod config;
pub mod engine;
pub mod error;
pub mod explorer;
pub mod graph;
pub mod promoter;
pub mod reinforcement;
pub mod repository;
pub mod store;
pub mod types;
pub mod village;

pub use config::AcoConfig;
pub use engine::{AcoEngine, EngineStats};
pub use error::AcoError;
pub use explorer::{AntPathExplorer, ExploredPath, PathRequest};
pub use graph::{RelationshipEdge, RelationshipGraph, RelationshipGraphBuilder};
pub use promoter::{IndexTracking, MaterializationPromoter, MaterializedView, PromoterStats};
pub use reinforcement::PheromoneReinforcementLoop;
pub use repository::{MemoryRepository, Repository};
pub use store::{CostEstimator, PheromoneGraphStore, SchemaGraphEdge, StoreStats, UnitCostEstimator};
pub use types::{EdgeKey, FieldMeta, Pheromone, ResourceName};
pub use village::{Village, VillagePartitioner};
