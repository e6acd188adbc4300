//! Materialization promotion
//!
//! Tracks per-path usage and cumulative pheromone contribution, converting
//! repeatedly reinforced join paths into materialized-view recommendations
//! and hot filter columns into index recommendations. Actual DDL and
//! demotion of stale views belong to an external housekeeping job; this
//! module's only responsibility is accurate counter maintenance.

use crate::config::AcoConfig;
use crate::explorer::{ExploredPath, PathRequest};
use crate::repository::Repository;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Persisted materialized-view record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterializedView {
    pub view_name: String,
    pub definition: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub usage_count: u64,
}

/// Persisted index recommendation record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexTracking {
    pub index_name: String,
    pub table_name: String,
    pub columns: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub usage_count: u64,
}

#[derive(Debug, Default)]
struct PathStats {
    usage_count: u64,
    cumulative_contribution: f64,
    promoted_as: Option<String>,
}

#[derive(Debug, Default)]
struct ColumnStats {
    hits: u64,
    promoted_as: Option<String>,
}

/// Promotes hot paths to materialized views and hot columns to indexes
pub struct MaterializationPromoter {
    paths: DashMap<String, PathStats>,
    columns: DashMap<String, ColumnStats>,
    views: Arc<dyn Repository<MaterializedView>>,
    indexes: Arc<dyn Repository<IndexTracking>>,
    path_requests: Arc<dyn Repository<PathRequest>>,
    pheromone_threshold: f64,
    min_samples: u64,
    column_threshold: u64,
}

impl MaterializationPromoter {
    pub fn new(
        config: &AcoConfig,
        views: Arc<dyn Repository<MaterializedView>>,
        indexes: Arc<dyn Repository<IndexTracking>>,
        path_requests: Arc<dyn Repository<PathRequest>>,
    ) -> Self {
        MaterializationPromoter {
            paths: DashMap::new(),
            columns: DashMap::new(),
            views,
            indexes,
            path_requests,
            pheromone_threshold: config.promotion_pheromone_threshold,
            min_samples: config.promotion_min_samples,
            column_threshold: config.index_column_threshold,
        }
    }

    /// Account one successful traversal of `path`
    ///
    /// Returns the view name when this call promoted the path. Promotion
    /// happens exactly once per signature; later identical requests bump the
    /// view's usage counter instead of duplicating the record.
    pub fn observe_path(&self, path: &ExploredPath) -> Option<String> {
        let signature = path.signature();
        if signature.is_empty() {
            return None;
        }

        let mut stats = self.paths.entry(signature.clone()).or_default();
        stats.usage_count += 1;
        stats.cumulative_contribution += path.pheromone_contribution;

        if let Some(view_name) = &stats.promoted_as {
            self.touch_view(view_name);
            return None;
        }

        if stats.cumulative_contribution > self.pheromone_threshold
            && stats.usage_count >= self.min_samples
        {
            let view_name = Self::view_name(path);
            let now = Utc::now();
            let view = MaterializedView {
                view_name: view_name.clone(),
                definition: Self::view_definition(path),
                created_at: now,
                last_used_at: now,
                // Seed with historical hits so the housekeeping job sees the
                // demand that earned the promotion
                usage_count: stats.usage_count,
            };

            if let Err(e) = self.views.put(&view_name, view) {
                warn!(view = %view_name, error = %e, "failed to register materialized view");
                return None;
            }

            stats.promoted_as = Some(view_name.clone());
            drop(stats);

            self.mark_requests_materialized(&signature);
            info!(view = %view_name, "path promoted to materialized view");
            return Some(view_name);
        }

        None
    }

    /// Account one filter hit on `table.column`
    ///
    /// Returns the index name when this call crossed the recommendation
    /// threshold.
    pub fn observe_filter_column(&self, table: &str, column: &str) -> Option<String> {
        let key = format!("{}.{}", table, column);
        let mut stats = self.columns.entry(key).or_default();
        stats.hits += 1;

        if let Some(index_name) = &stats.promoted_as {
            self.touch_index(index_name);
            return None;
        }

        if stats.hits >= self.column_threshold {
            let index_name = format!("idx_{}_{}", table, column);
            let now = Utc::now();
            let index = IndexTracking {
                index_name: index_name.clone(),
                table_name: table.to_string(),
                columns: vec![column.to_string()],
                created_at: now,
                last_used_at: now,
                usage_count: stats.hits,
            };

            if let Err(e) = self.indexes.put(&index_name, index) {
                warn!(index = %index_name, error = %e, "failed to register index recommendation");
                return None;
            }

            stats.promoted_as = Some(index_name.clone());
            info!(index = %index_name, "column promoted to index recommendation");
            return Some(index_name);
        }

        None
    }

    pub fn stats(&self) -> PromoterStats {
        PromoterStats {
            tracked_paths: self.paths.len(),
            promoted_paths: self
                .paths
                .iter()
                .filter(|p| p.promoted_as.is_some())
                .count(),
            tracked_columns: self.columns.len(),
            recommended_indexes: self
                .columns
                .iter()
                .filter(|c| c.promoted_as.is_some())
                .count(),
        }
    }

    /// Bump usage on an existing view row (best effort)
    fn touch_view(&self, view_name: &str) {
        match self.views.get(view_name) {
            Ok(Some(mut view)) => {
                view.usage_count += 1;
                view.last_used_at = Utc::now();
                if let Err(e) = self.views.put(view_name, view) {
                    warn!(view = %view_name, error = %e, "failed to update view usage");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(view = %view_name, error = %e, "failed to read view record"),
        }
    }

    fn touch_index(&self, index_name: &str) {
        match self.indexes.get(index_name) {
            Ok(Some(mut index)) => {
                index.usage_count += 1;
                index.last_used_at = Utc::now();
                if let Err(e) = self.indexes.put(index_name, index) {
                    warn!(index = %index_name, error = %e, "failed to update index usage");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(index = %index_name, error = %e, "failed to read index record"),
        }
    }

    /// Flag every stored request matching the promoted signature
    fn mark_requests_materialized(&self, signature: &str) {
        let entries = match self.path_requests.scan() {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "failed to scan path requests");
                return;
            }
        };

        for (key, mut request) in entries {
            if request.path.join("|") == signature && !request.materialized_view_created {
                request.materialized_view_created = true;
                if let Err(e) = self.path_requests.put(&key, request) {
                    warn!(request = %key, error = %e, "failed to flag path request");
                }
            }
        }
    }

    fn view_name(path: &ExploredPath) -> String {
        format!("mv_{}", path.nodes.join("_"))
    }

    /// Projected join across the path, in traversal order
    fn view_definition(path: &ExploredPath) -> String {
        let mut sql = format!("SELECT * FROM {}", path.nodes[0]);
        for (edge, node) in path.edges.iter().zip(path.nodes.iter().skip(1)) {
            sql.push_str(&format!(" JOIN {} ON {}", node, edge.join_condition()));
        }
        sql
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoterStats {
    pub tracked_paths: usize,
    pub promoted_paths: usize,
    pub tracked_columns: usize,
    pub recommended_indexes: usize,
}
