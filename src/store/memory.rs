//! In-process store implementations backing tests and the CLI.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{CategoryStore, ObjectStore, StoreError};
use crate::models::CategoryRecord;

type RecordTable = HashMap<(String, String), Vec<CategoryRecord>>;

#[derive(Default)]
pub struct MemoryCategoryStore {
    pending: RwLock<RecordTable>,
    production: RwLock<RecordTable>,
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a record as a pending submission, preserving insertion order.
    pub fn submit(&self, record: CategoryRecord) {
        let key = (record.family.clone(), record.sensor_id.clone());
        write(&self.pending).entry(key).or_default().push(record);
    }

    /// Place a record directly into production (test seeding).
    pub fn seed_production(&self, record: CategoryRecord) {
        let key = (record.family.clone(), record.sensor_id.clone());
        write(&self.production).entry(key).or_default().push(record);
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn pending_records(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<Vec<CategoryRecord>, StoreError> {
        Ok(read(&self.pending)
            .get(&key(family, sensor_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn production_records(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<Vec<CategoryRecord>, StoreError> {
        Ok(read(&self.production)
            .get(&key(family, sensor_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn promote(&self, family: &str, sensor_id: &str) -> Result<(), StoreError> {
        let records = write(&self.pending)
            .remove(&key(family, sensor_id))
            .ok_or_else(|| {
                StoreError::NotFound(format!("no pending records for {}/{}", family, sensor_id))
            })?;
        write(&self.production).insert(key(family, sensor_id), records);
        Ok(())
    }

    async fn discard_pending(&self, family: &str, sensor_id: &str) -> Result<(), StoreError> {
        write(&self.pending)
            .remove(&key(family, sensor_id))
            .map(|_| ())
            .ok_or_else(|| {
                StoreError::NotFound(format!("no pending records for {}/{}", family, sensor_id))
            })
    }
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = read(&self.objects).keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(read(&self.objects).get(key).cloned())
    }

    async fn put_bytes(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        write(&self.objects).insert(key.to_owned(), bytes);
        Ok(())
    }
}

fn key(family: &str, sensor_id: &str) -> (String, String) {
    (family.to_owned(), sensor_id.to_owned())
}

// Lock poisoning only happens if another test thread panicked; the data is
// still usable, so recover instead of propagating the panic.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
