//! Store-backed ligand similarity search.
//!
//! The handler core behind the two search endpoints: loads the artifact
//! named by config from the object store and runs the Tanimoto search with
//! config-default parameters. A missing artifact yields an empty result
//! list rather than an error, matching how the search degrades when the
//! artifact has not been built yet.

use crate::config::config;
use crate::fingerprint::{
    Fingerprint, FingerprintError, FingerprintIndex, LigandMatch, LigifyIndex, LigifyMatch,
};
use crate::store::ObjectStore;

pub struct LigandSearchService<O> {
    objects: O,
}

impl<O: ObjectStore> LigandSearchService<O> {
    pub fn new(objects: O) -> Self {
        Self { objects }
    }

    /// Search the curated catalog artifact (`fingerprints.json[.gz]`).
    pub async fn search_catalog(
        &self,
        query: &Fingerprint,
        threshold: Option<f64>,
        max_results: Option<usize>,
    ) -> Result<Vec<LigandMatch>, FingerprintError> {
        let settings = &config().fingerprint;
        let Some(index) = FingerprintIndex::load(&self.objects, &settings.artifact_key).await?
        else {
            tracing::warn!(key = %settings.artifact_key, "fingerprint artifact not available");
            return Ok(Vec::new());
        };
        Ok(index.search(
            query,
            threshold.unwrap_or(settings.similarity_threshold),
            max_results.unwrap_or(settings.max_results),
        ))
    }

    /// Search the ligify artifact (`ligify-fingerprints.json.gz`), whose
    /// hits carry the predicted regulator and the ligand SMILES.
    pub async fn search_ligify(
        &self,
        query: &Fingerprint,
        threshold: Option<f64>,
        max_results: Option<usize>,
    ) -> Result<Vec<LigifyMatch>, FingerprintError> {
        let settings = &config().fingerprint;
        let Some(index) = LigifyIndex::load(&self.objects, &settings.ligify_artifact_key).await?
        else {
            tracing::warn!(key = %settings.ligify_artifact_key, "ligify artifact not available");
            return Ok(Vec::new());
        };
        Ok(index.search(
            query,
            threshold.unwrap_or(settings.similarity_threshold),
            max_results.unwrap_or(settings.max_results),
        ))
    }
}
