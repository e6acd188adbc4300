//! Engine configuration
//!
//! All tunables for village partitioning, the ACO transition rule, decay
//! scheduling and materialization promotion live here. Validation is
//! fail-fast: a bad configuration is rejected at construction and the
//! optimizer never starts serving.

use crate::error::AcoError;
use serde::{Deserialize, Serialize};

/// Configuration for the ACO engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcoConfig {
    /// Maximum number of resources per village
    pub max_group_size: usize,
    /// Exploitation exponent: weight of pheromone in the transition rule
    pub alpha: f64,
    /// Cost-avoidance exponent: weight of (inverse) latency
    pub beta: f64,
    /// Reinforcement constant; a path contributes q / cost
    pub q: f64,
    /// Fraction of pheromone removed per decay pass
    pub decay_factor: f64,
    /// Seconds between scheduled decay passes
    pub decay_interval_secs: u64,
    /// Hop bound for a single exploration; exceeded means "no path"
    pub max_hops: usize,
    /// Cumulative pheromone contribution required to promote a path
    pub promotion_pheromone_threshold: f64,
    /// Minimum number of requests before a path may be promoted
    pub promotion_min_samples: u64,
    /// Filter hits on a column before an index is recommended
    pub index_column_threshold: u64,
}

impl Default for AcoConfig {
    fn default() -> Self {
        AcoConfig {
            max_group_size: 16,
            alpha: 1.0,
            beta: 2.0,
            q: 1.0,
            decay_factor: 0.05,
            decay_interval_secs: 60,
            max_hops: 32,
            promotion_pheromone_threshold: 10.0,
            promotion_min_samples: 5,
            index_column_threshold: 25,
        }
    }
}

impl AcoConfig {
    /// Validate the configuration, rejecting values the engine cannot
    /// safely run with
    pub fn validate(&self) -> Result<(), AcoError> {
        if self.max_group_size == 0 {
            return Err(AcoError::InvalidConfig(
                "max_group_size must be greater than zero".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.decay_factor) {
            return Err(AcoError::InvalidConfig(format!(
                "decay_factor must be in [0, 1), got {}",
                self.decay_factor
            )));
        }
        if self.alpha < 0.0 || self.beta < 0.0 {
            return Err(AcoError::InvalidConfig(
                "alpha and beta must be non-negative".to_string(),
            ));
        }
        if self.q <= 0.0 {
            return Err(AcoError::InvalidConfig(
                "reinforcement constant q must be positive".to_string(),
            ));
        }
        if self.max_hops == 0 {
            return Err(AcoError::InvalidConfig(
                "max_hops must be greater than zero".to_string(),
            ));
        }
        if self.promotion_pheromone_threshold <= 0.0 {
            return Err(AcoError::InvalidConfig(
                "promotion_pheromone_threshold must be positive".to_string(),
            ));
        }
        if self.promotion_min_samples == 0 {
            return Err(AcoError::InvalidConfig(
                "promotion_min_samples must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
