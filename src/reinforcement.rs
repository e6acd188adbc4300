//! Periodic pheromone decay
//!
//! A scheduled maintenance pass that decays every edge at a fixed interval,
//! independent of traversal activity, so unused trails fade even without new
//! requests and the system stays responsive to changing query patterns.

use crate::store::PheromoneGraphStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Drives decay passes over the pheromone store
pub struct PheromoneReinforcementLoop {
    store: Arc<PheromoneGraphStore>,
    decay_factor: f64,
    interval: Duration,
}

impl PheromoneReinforcementLoop {
    pub fn new(store: Arc<PheromoneGraphStore>, decay_factor: f64, interval: Duration) -> Self {
        PheromoneReinforcementLoop {
            store,
            decay_factor,
            interval,
        }
    }

    /// One decay pass over every edge
    pub fn run_once(&self) {
        let now = Utc::now();
        self.store.decay_all(self.decay_factor, now);
        debug!(
            edges = self.store.edge_count(),
            decay_factor = self.decay_factor,
            "decay pass complete"
        );
    }

    /// Spawn the periodic decay task on the current tokio runtime
    pub fn start(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let decay_factor = self.decay_factor;
        let period = self.interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // First tick fires immediately; skip it so edges freshly seeded
            // at startup keep their initial level for one full period
            interval.tick().await;

            loop {
                interval.tick().await;
                store.decay_all(decay_factor, Utc::now());
            }
        })
    }
}
