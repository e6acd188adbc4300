//! ACO engine composition root
//!
//! An explicitly constructed, dependency-injected service: the caller owns
//! the instance and supplies the cost estimator and repositories, there is
//! no process-wide singleton and no hidden global state. Graph build and
//! village partitioning run single-threaded at construction (or on a rare
//! metadata refresh); the results are read-mostly shared state, while the
//! pheromone store absorbs all concurrent mutation.

use crate::config::AcoConfig;
use crate::error::{AcoError, Result};
use crate::explorer::{AntPathExplorer, ExploredPath, PathRequest};
use crate::graph::{RelationshipGraph, RelationshipGraphBuilder};
use crate::promoter::{IndexTracking, MaterializationPromoter, MaterializedView, PromoterStats};
use crate::reinforcement::PheromoneReinforcementLoop;
use crate::repository::{MemoryRepository, Repository};
use crate::store::{CostEstimator, PheromoneGraphStore, StoreStats, UnitCostEstimator};
use crate::types::{EdgeKey, FieldMeta, ResourceName};
use crate::village::{Village, VillagePartitioner};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Adaptive schema-relationship graph optimizer
pub struct AcoEngine {
    config: AcoConfig,
    graph: RwLock<Arc<RelationshipGraph>>,
    villages: RwLock<Arc<Vec<Village>>>,
    store: Arc<PheromoneGraphStore>,
    path_requests: Arc<dyn Repository<PathRequest>>,
    promoter: MaterializationPromoter,
    request_seq: AtomicU64,
}

impl AcoEngine {
    /// Construct the engine from externally supplied schema metadata
    ///
    /// Fails fast on invalid configuration; the optimizer must not start
    /// serving with one.
    pub fn new(
        config: AcoConfig,
        resources: &HashMap<ResourceName, Vec<FieldMeta>>,
        estimator: Arc<dyn CostEstimator>,
        path_requests: Arc<dyn Repository<PathRequest>>,
        views: Arc<dyn Repository<MaterializedView>>,
        indexes: Arc<dyn Repository<IndexTracking>>,
    ) -> Result<Self> {
        config.validate()?;

        let graph = Arc::new(RelationshipGraphBuilder::build(resources));
        let villages = Arc::new(VillagePartitioner::new(config.max_group_size).partition(&graph));

        let store = Arc::new(PheromoneGraphStore::new(estimator));
        Self::register_edges(&graph, &store);

        let promoter =
            MaterializationPromoter::new(&config, views, indexes, Arc::clone(&path_requests));

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            villages = villages.len(),
            "ACO engine initialized"
        );

        Ok(AcoEngine {
            config,
            graph: RwLock::new(graph),
            villages: RwLock::new(villages),
            store,
            path_requests,
            promoter,
            request_seq: AtomicU64::new(1),
        })
    }

    /// Engine with in-memory repositories and unit edge costs
    pub fn in_memory(
        config: AcoConfig,
        resources: &HashMap<ResourceName, Vec<FieldMeta>>,
    ) -> Result<Self> {
        Self::new(
            config,
            resources,
            Arc::new(UnitCostEstimator),
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryRepository::new()),
        )
    }

    /// Find a low-cost join path from `start` touching every resource in
    /// `targets`
    ///
    /// `Ok(None)` means no path was found within the hop bound; the caller
    /// falls back to its naive join planner. On success the path's edges are
    /// already reinforced and a `PathRequest` row has been recorded
    /// best-effort: a telemetry failure never fails the query.
    pub fn find_path(
        &self,
        start: &str,
        targets: &[ResourceName],
    ) -> Result<Option<ExploredPath>> {
        let graph = Arc::clone(&self.graph.read());
        if !graph.contains(start) {
            return Err(AcoError::UnknownResource(start.to_string()));
        }

        let villages = Arc::clone(&self.villages.read());
        let village = villages.iter().find(|v| v.contains(start));

        let explorer = AntPathExplorer::new(&graph, &self.store, &self.config);
        let Some(path) = explorer.explore(start, targets, village) else {
            return Ok(None);
        };

        self.record_request(&path);
        self.promoter.observe_path(&path);

        Ok(Some(path))
    }

    /// Account a filter hit on `table.column`, feeding the index
    /// recommendation counter
    pub fn record_filter(&self, table: &str, column: &str) -> Option<String> {
        self.promoter.observe_filter_column(table, column)
    }

    /// Rebuild graph and villages from fresh metadata
    ///
    /// Effectively stop-the-world relative to exploration, but in-flight
    /// explorations may finish on the stale assignment: villages are a
    /// search-space heuristic, not a correctness boundary.
    pub fn refresh_metadata(&self, resources: &HashMap<ResourceName, Vec<FieldMeta>>) {
        let graph = Arc::new(RelationshipGraphBuilder::build(resources));
        let villages =
            Arc::new(VillagePartitioner::new(self.config.max_group_size).partition(&graph));
        Self::register_edges(&graph, &self.store);

        // Relationships removed from the schema take their trails with them
        let live: HashSet<EdgeKey> = graph
            .edges()
            .map(|e| EdgeKey::new(e.source.clone(), e.target.clone()))
            .collect();
        self.store.retain(|key| live.contains(key));

        info!(
            nodes = graph.node_count(),
            villages = villages.len(),
            "metadata refreshed, graph and villages rebuilt"
        );

        *self.graph.write() = graph;
        *self.villages.write() = villages;
    }

    /// Periodic decay driver over this engine's store
    pub fn reinforcement_loop(&self) -> PheromoneReinforcementLoop {
        PheromoneReinforcementLoop::new(
            Arc::clone(&self.store),
            self.config.decay_factor,
            Duration::from_secs(self.config.decay_interval_secs),
        )
    }

    pub fn store(&self) -> &Arc<PheromoneGraphStore> {
        &self.store
    }

    /// Current village assignment snapshot
    pub fn villages(&self) -> Arc<Vec<Village>> {
        Arc::clone(&self.villages.read())
    }

    pub fn stats(&self) -> EngineStats {
        let graph = self.graph.read();
        EngineStats {
            node_count: graph.node_count(),
            graph_edge_count: graph.edge_count(),
            village_count: self.villages.read().len(),
            store: self.store.stats(),
            promoter: self.promoter.stats(),
        }
    }

    /// Seed one store row per distinct resource pair; the fingerprint covers
    /// every foreign-key condition between the pair, so a change to any of
    /// them reads as drift
    fn register_edges(graph: &RelationshipGraph, store: &PheromoneGraphStore) {
        let mut conditions: HashMap<(ResourceName, ResourceName), Vec<String>> = HashMap::new();
        for edge in graph.edges() {
            conditions
                .entry((edge.source.clone(), edge.target.clone()))
                .or_default()
                .push(edge.join_condition());
        }

        for ((from, to), mut pair_conditions) in conditions {
            pair_conditions.sort();
            store.upsert_edge(&from, &to, &pair_conditions.join(" AND "));
        }
    }

    /// The result already exists by the time this runs; a slow repository
    /// must not stall the caller, so the write goes to the blocking pool
    /// when a runtime is available
    fn record_request(&self, path: &ExploredPath) {
        let id = self.request_seq.fetch_add(1, Ordering::SeqCst);
        let request = path.to_request(Utc::now());
        let repo = Arc::clone(&self.path_requests);

        let write = move || {
            if let Err(e) = repo.put(&id.to_string(), request) {
                warn!(request = id, error = %e, "failed to persist path request");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(write);
            }
            Err(_) => write(),
        }
    }
}

/// Snapshot of engine-wide counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStats {
    pub node_count: usize,
    pub graph_edge_count: usize,
    pub village_count: usize,
    pub store: StoreStats,
    pub promoter: PromoterStats,
}
