//! Plain repository interface for persisted optimizer records
//!
//! Decouples telemetry (path requests, materialized views, index tracking)
//! from any persistence technology: the engine only needs get/put/scan. The
//! bundled implementation keeps records in memory; production deployments
//! plug in whatever store the housekeeping job reads from.

use crate::error::{AcoError, Result};
use dashmap::DashMap;

/// Minimal keyed record store
pub trait Repository<T: Clone>: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<T>>;
    fn put(&self, key: &str, value: T) -> Result<()>;
    fn scan(&self) -> Result<Vec<(String, T)>>;
}

/// In-memory repository backed by a concurrent map
pub struct MemoryRepository<T: Clone> {
    records: DashMap<String, T>,
}

impl<T: Clone> MemoryRepository<T> {
    pub fn new() -> Self {
        MemoryRepository {
            records: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T: Clone> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync> Repository<T> for MemoryRepository<T> {
    fn get(&self, key: &str) -> Result<Option<T>> {
        Ok(self.records.get(key).map(|r| r.clone()))
    }

    fn put(&self, key: &str, value: T) -> Result<()> {
        self.records.insert(key.to_string(), value);
        Ok(())
    }

    fn scan(&self) -> Result<Vec<(String, T)>> {
        Ok(self
            .records
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect())
    }
}

/// A repository that rejects every operation; used in tests to prove
/// telemetry failures never fail the query path
pub struct FailingRepository;

impl<T: Clone + Send + Sync> Repository<T> for FailingRepository {
    fn get(&self, _key: &str) -> Result<Option<T>> {
        Err(AcoError::Telemetry("repository unavailable".to_string()))
    }

    fn put(&self, _key: &str, _value: T) -> Result<()> {
        Err(AcoError::Telemetry("repository unavailable".to_string()))
    }

    fn scan(&self) -> Result<Vec<(String, T)>> {
        Err(AcoError::Telemetry("repository unavailable".to_string()))
    }
}
