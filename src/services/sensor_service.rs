//! Moderation and read orchestration around the record merger.
//!
//! These are the handler cores of the catalog's submission workflow: a
//! curator approves or rejects a pending submission, and the read paths merge
//! category records on demand.

use serde_json::Value;

use crate::index;
use crate::merge::merge_sensor_records;
use crate::models::SensorView;
use crate::store::{CategoryStore, ObjectStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum SensorServiceError {
    #[error("sensor not found: {family}/{sensor_id}")]
    NotFound { family: String, sensor_id: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct SensorService<C, O> {
    categories: C,
    objects: O,
}

impl<C: CategoryStore, O: ObjectStore> SensorService<C, O> {
    pub fn new(categories: C, objects: O) -> Self {
        Self { categories, objects }
    }

    pub fn categories(&self) -> &C {
        &self.categories
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    /// Read path: merge the production category records on demand.
    pub async fn get_sensor(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<Option<SensorView>, SensorServiceError> {
        let records = self.categories.production_records(family, sensor_id).await?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(merge_sensor_records(&records)))
    }

    /// Moderation read path: merge a submission that has not been approved yet.
    pub async fn get_pending(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<Option<SensorView>, SensorServiceError> {
        let records = self.categories.pending_records(family, sensor_id).await?;
        if records.is_empty() {
            return Ok(None);
        }
        Ok(Some(merge_sensor_records(&records)))
    }

    /// Approve a pending submission: publish the merged view as the
    /// per-sensor document, fold it into both catalog indexes, and promote
    /// the category records to production.
    ///
    /// The merge is deterministic and the index writes are upserts, so
    /// re-running after a partial failure converges on the same state.
    pub async fn approve(
        &self,
        family: &str,
        sensor_id: &str,
    ) -> Result<SensorView, SensorServiceError> {
        let records = self.categories.pending_records(family, sensor_id).await?;
        if records.is_empty() {
            return Err(SensorServiceError::NotFound {
                family: family.to_owned(),
                sensor_id: sensor_id.to_owned(),
            });
        }

        let view = merge_sensor_records(&records);
        tracing::info!(family, sensor_id, "publishing merged sensor view");

        self.objects
            .put_json(&index::sensor_document_key(family, sensor_id), &view.to_value())
            .await?;

        self.upsert_index(
            index::GLOBAL_INDEX_KEY,
            index::empty_global_index(),
            index::global_index_entry(family, sensor_id, &view),
        )
        .await?;
        self.upsert_index(
            &index::family_index_key(family),
            index::empty_family_index(family),
            index::family_index_entry(sensor_id, &view),
        )
        .await?;

        self.categories.promote(family, sensor_id).await?;
        Ok(view)
    }

    /// Reject a pending submission, discarding its category records.
    pub async fn reject(&self, family: &str, sensor_id: &str) -> Result<(), SensorServiceError> {
        tracing::info!(family, sensor_id, "rejecting pending submission");
        self.categories
            .discard_pending(family, sensor_id)
            .await
            .map_err(|err| match err {
                StoreError::NotFound(_) => SensorServiceError::NotFound {
                    family: family.to_owned(),
                    sensor_id: sensor_id.to_owned(),
                },
                other => other.into(),
            })
    }

    async fn upsert_index(&self, key: &str, empty: Value, entry: Value) -> Result<(), StoreError> {
        let mut doc = self.objects.get_json(key).await?.unwrap_or(empty);
        index::upsert_sensor_entry(&mut doc, entry);
        self.objects.put_json(key, &doc).await
    }
}
