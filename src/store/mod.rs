//! Storage collaborator contracts.
//!
//! The real backends (document store for category records, object store for
//! published documents) are provided by the hosting platform; this crate only
//! defines the boundary it consumes, plus in-memory implementations for tests
//! and local tooling.

use async_trait::async_trait;
use serde_json::Value;

use crate::models::CategoryRecord;

pub mod memory;

pub use memory::{MemoryCategoryStore, MemoryObjectStore};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Document-store boundary for per-category sensor records.
///
/// Implementations return records in a stable order; the merge processes them
/// as given, which fixes the ordering of the view's reference lists.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Category records of a submission awaiting moderation.
    async fn pending_records(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<Vec<CategoryRecord>, StoreError>;

    /// Category records of a published sensor.
    async fn production_records(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<Vec<CategoryRecord>, StoreError>;

    /// Move a sensor's pending category records into production (approval).
    async fn promote(&self, family: &str, sensor_id: &str) -> Result<(), StoreError>;

    /// Drop a sensor's pending category records (rejection).
    async fn discard_pending(&self, family: &str, sensor_id: &str) -> Result<(), StoreError>;
}

/// Object-store boundary for published documents and search artifacts.
/// Keys are opaque strings (`sensors/<family>/<id>.json`, `all-sensors.json`,
/// `fingerprints.json.gz`).
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    async fn get_json(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match self.get_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_json(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        self.put_bytes(key, serde_json::to_vec(value)?).await
    }
}
