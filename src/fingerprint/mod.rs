//! Ligand similarity search over Morgan fingerprint bit strings.
//!
//! Fingerprints are generated upstream (RDKit Morgan generator, radius 2,
//! 2048 bits) and stored as `[bit_string, ligand_id, sensor_id, ligand_name]`
//! rows in `fingerprints.json(.gz)`. This module owns the artifact format,
//! Tanimoto scoring, and rebuilds of the artifact from the global sensor
//! index.

use std::collections::HashSet;
use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use serde_json::{json, Value};

use crate::store::{ObjectStore, StoreError};

/// Fingerprint width used across the catalog (Morgan radius 2).
pub const FINGERPRINT_NBITS: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    #[error("invalid fingerprint bit '{0}'")]
    InvalidBit(char),
    #[error("fingerprint artifact is not a JSON array")]
    MalformedArtifact,
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fixed-width fingerprint bit vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    words: Vec<u64>,
    len: usize,
}

impl Fingerprint {
    /// Parse the stored `'0'/'1'` encoding.
    pub fn from_bit_string(bits: &str) -> Result<Self, FingerprintError> {
        let mut words = vec![0u64; (bits.len() + 63) / 64];
        for (i, ch) in bits.chars().enumerate() {
            match ch {
                '1' => words[i / 64] |= 1 << (i % 64),
                '0' => {}
                other => return Err(FingerprintError::InvalidBit(other)),
            }
        }
        Ok(Self {
            words,
            len: bits.len(),
        })
    }

    pub fn to_bit_string(&self) -> String {
        (0..self.len)
            .map(|i| {
                if (self.words[i / 64] >> (i % 64)) & 1 == 1 {
                    '1'
                } else {
                    '0'
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Tanimoto similarity: |a AND b| / |a OR b|. 0.0 when both sets are
    /// empty.
    pub fn tanimoto(&self, other: &Fingerprint) -> f64 {
        let words = self.words.len().max(other.words.len());
        let mut intersection = 0u32;
        let mut union = 0u32;
        for i in 0..words {
            let a = self.words.get(i).copied().unwrap_or(0);
            let b = other.words.get(i).copied().unwrap_or(0);
            intersection += (a & b).count_ones();
            union += (a | b).count_ones();
        }
        if union == 0 {
            0.0
        } else {
            f64::from(intersection) / f64::from(union)
        }
    }
}

/// One row of the fingerprint artifact. Ligand ids are opaque strings
/// (`LIG00042` style); they are never interpreted numerically.
#[derive(Debug, Clone)]
pub struct FingerprintEntry {
    pub fingerprint: Fingerprint,
    pub ligand_id: String,
    pub sensor_id: String,
    pub name: String,
}

/// A similarity hit, shaped for the search response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LigandMatch {
    #[serde(rename = "ligandId")]
    pub ligand_id: String,
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    pub similarity: f64,
    pub name: String,
}

/// Turns a SMILES string into a fingerprint. Morgan generation needs a
/// chemistry toolkit and runs out of process; implementations adapt whatever
/// generator is deployed alongside the catalog.
pub trait LigandFingerprinter {
    fn fingerprint(&self, smiles: &str) -> Option<Fingerprint>;
}

/// The searchable fingerprint artifact.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    entries: Vec<FingerprintEntry>,
}

impl FingerprintIndex {
    pub fn new(entries: Vec<FingerprintEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[FingerprintEntry] {
        &self.entries
    }

    /// Parse the stored artifact. Rows that do not parse are skipped with a
    /// warning so one bad row cannot take the whole search offline. Legacy
    /// 3-element rows (no ligand name) get the name `"Unknown"`.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        let rows: Value = serde_json::from_slice(bytes)?;
        let Value::Array(rows) = rows else {
            return Err(FingerprintError::MalformedArtifact);
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match parse_row(row) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(row = i, "skipping malformed fingerprint row"),
            }
        }
        Ok(Self { entries })
    }

    pub fn from_gzip_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Self::from_json_slice(&decompressed)
    }

    /// Load the artifact from the object store: gzip variant first, plain
    /// JSON fallback.
    pub async fn load<O: ObjectStore + ?Sized>(
        store: &O,
        key: &str,
    ) -> Result<Option<Self>, FingerprintError> {
        if let Some(bytes) = store.get_bytes(&format!("{}.gz", key)).await? {
            match Self::from_gzip_slice(&bytes) {
                Ok(index) => return Ok(Some(index)),
                Err(err) => tracing::warn!(
                    error = %err,
                    "compressed fingerprint artifact unreadable, trying plain JSON"
                ),
            }
        }
        match store.get_bytes(key).await? {
            Some(bytes) => Ok(Some(Self::from_json_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Score every entry against the query, keep hits at or above the
    /// threshold, best first.
    pub fn search(&self, query: &Fingerprint, threshold: f64, max_results: usize) -> Vec<LigandMatch> {
        let matches = self
            .entries
            .iter()
            .filter_map(|entry| {
                let similarity = query.tanimoto(&entry.fingerprint);
                (similarity >= threshold).then(|| LigandMatch {
                    ligand_id: entry.ligand_id.clone(),
                    sensor_id: entry.sensor_id.clone(),
                    similarity,
                    name: entry.name.clone(),
                })
            })
            .collect();
        rank(matches, |hit| hit.similarity, max_results)
    }

    /// Rebuild the artifact from the global sensor index. Ligands are
    /// deduplicated by SMILES string and assigned sequential `LIG{n:05}`
    /// ids; missing SMILES and generator failures are skipped, not fatal.
    pub fn build_from_global_index(index: &Value, fingerprinter: &dyn LigandFingerprinter) -> Self {
        let mut entries = Vec::new();
        let mut seen_smiles: HashSet<String> = HashSet::new();
        let mut next_ligand_id: u64 = 1;
        let mut failures = 0usize;

        let sensors = index
            .get("sensors")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for sensor in sensors {
            let Some(sensor_id) = sensor.get("sensorId").and_then(Value::as_str) else {
                continue;
            };
            let Some(ligands) = sensor.get("ligands").and_then(Value::as_array) else {
                continue;
            };
            for ligand in ligands {
                let Some(smiles) = ligand.get("SMILES").and_then(Value::as_str) else {
                    continue;
                };
                if seen_smiles.contains(smiles) {
                    continue;
                }
                let name = ligand
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_owned();
                match fingerprinter.fingerprint(smiles) {
                    Some(fingerprint) => {
                        seen_smiles.insert(smiles.to_owned());
                        entries.push(FingerprintEntry {
                            fingerprint,
                            ligand_id: format!("LIG{:05}", next_ligand_id),
                            sensor_id: sensor_id.to_owned(),
                            name,
                        });
                        next_ligand_id += 1;
                    }
                    None => {
                        failures += 1;
                        tracing::warn!(smiles, "fingerprint generation failed");
                    }
                }
            }
        }

        if failures > 0 {
            tracing::warn!(failures, "fingerprint rebuild skipped ligands");
        }
        tracing::info!(ligands = entries.len(), "fingerprint index rebuilt");
        Self { entries }
    }

    /// Serialize back to the stored row format.
    pub fn to_json_value(&self) -> Value {
        Value::Array(
            self.entries
                .iter()
                .map(|entry| {
                    json!([
                        entry.fingerprint.to_bit_string(),
                        entry.ligand_id,
                        entry.sensor_id,
                        entry.name,
                    ])
                })
                .collect(),
        )
    }

    pub fn to_gzip_bytes(&self) -> Result<Vec<u8>, FingerprintError> {
        let raw = serde_json::to_vec(&self.to_json_value())?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }
}

/// One row of the ligify artifact, which associates ligands with predicted
/// regulators instead of curated sensors.
#[derive(Debug, Clone)]
pub struct LigifyEntry {
    pub fingerprint: Fingerprint,
    pub ligand_id: String,
    pub regulator_id: String,
    pub name: String,
    pub smiles: Option<String>,
}

/// A ligify similarity hit. `smiles` is `null` for legacy rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LigifyMatch {
    #[serde(rename = "ligandId")]
    pub ligand_id: String,
    #[serde(rename = "regulatorId")]
    pub regulator_id: String,
    pub similarity: f64,
    pub name: String,
    pub smiles: Option<String>,
}

/// The ligify search artifact: `[bit_string, ligand_id, regulator_id,
/// ligand_name, smiles]` rows, with 4-element legacy rows carrying no SMILES.
/// Stored gzip-only as `ligify-fingerprints.json.gz`.
#[derive(Debug, Default)]
pub struct LigifyIndex {
    entries: Vec<LigifyEntry>,
}

impl LigifyIndex {
    pub fn new(entries: Vec<LigifyEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LigifyEntry] {
        &self.entries
    }

    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        let rows: Value = serde_json::from_slice(bytes)?;
        let Value::Array(rows) = rows else {
            return Err(FingerprintError::MalformedArtifact);
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            match parse_ligify_row(row) {
                Some(entry) => entries.push(entry),
                None => tracing::warn!(row = i, "skipping malformed ligify row"),
            }
        }
        Ok(Self { entries })
    }

    pub fn from_gzip_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        let mut decoder = GzDecoder::new(bytes);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;
        Self::from_json_slice(&decompressed)
    }

    /// Load the artifact from the object store. The ligify artifact only
    /// exists in its compressed form, so there is no plain-JSON fallback.
    pub async fn load<O: ObjectStore + ?Sized>(
        store: &O,
        key: &str,
    ) -> Result<Option<Self>, FingerprintError> {
        match store.get_bytes(key).await? {
            Some(bytes) => Ok(Some(Self::from_gzip_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn search(&self, query: &Fingerprint, threshold: f64, max_results: usize) -> Vec<LigifyMatch> {
        let matches = self
            .entries
            .iter()
            .filter_map(|entry| {
                let similarity = query.tanimoto(&entry.fingerprint);
                (similarity >= threshold).then(|| LigifyMatch {
                    ligand_id: entry.ligand_id.clone(),
                    regulator_id: entry.regulator_id.clone(),
                    similarity,
                    name: entry.name.clone(),
                    smiles: entry.smiles.clone(),
                })
            })
            .collect();
        rank(matches, |hit| hit.similarity, max_results)
    }

    pub fn to_gzip_bytes(&self) -> Result<Vec<u8>, FingerprintError> {
        let rows: Vec<Value> = self
            .entries
            .iter()
            .map(|entry| {
                json!([
                    entry.fingerprint.to_bit_string(),
                    entry.ligand_id,
                    entry.regulator_id,
                    entry.name,
                    entry.smiles,
                ])
            })
            .collect();
        let raw = serde_json::to_vec(&Value::Array(rows))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }
}

// Exactly 5 or 4 elements; anything else is a malformed row.
fn parse_ligify_row(row: &Value) -> Option<LigifyEntry> {
    let row = row.as_array()?;
    if row.len() != 5 && row.len() != 4 {
        return None;
    }
    let fingerprint = Fingerprint::from_bit_string(row[0].as_str()?).ok()?;
    let ligand_id = parse_ligand_id(&row[1])?;
    let regulator_id = row[2].as_str()?.to_owned();
    let name = row[3].as_str()?.to_owned();
    let smiles = row
        .get(4)
        .and_then(Value::as_str)
        .map(str::to_owned);
    Some(LigifyEntry {
        fingerprint,
        ligand_id,
        regulator_id,
        name,
        smiles,
    })
}

fn parse_row(row: &Value) -> Option<FingerprintEntry> {
    let row = row.as_array()?;
    if row.len() < 3 {
        return None;
    }
    let fingerprint = Fingerprint::from_bit_string(row[0].as_str()?).ok()?;
    let ligand_id = parse_ligand_id(&row[1])?;
    let sensor_id = row[2].as_str()?.to_owned();
    let name = row
        .get(3)
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_owned();
    Some(FingerprintEntry {
        fingerprint,
        ligand_id,
        sensor_id,
        name,
    })
}

// Ligand ids are written as `LIG{n:05}` strings; artifacts predating that
// scheme carry bare numbers, kept as their string form.
fn parse_ligand_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn rank<M>(mut matches: Vec<M>, similarity: impl Fn(&M) -> f64, max_results: usize) -> Vec<M> {
    matches.sort_by(|a, b| {
        similarity(b)
            .partial_cmp(&similarity(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    matches.truncate(max_results);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(bits: &str) -> Fingerprint {
        Fingerprint::from_bit_string(bits).unwrap()
    }

    #[test]
    fn bit_string_round_trips() {
        let bits = "10110001";
        assert_eq!(fp(bits).to_bit_string(), bits);
    }

    #[test]
    fn rejects_non_binary_characters() {
        assert!(matches!(
            Fingerprint::from_bit_string("10x1"),
            Err(FingerprintError::InvalidBit('x'))
        ));
    }

    #[test]
    fn tanimoto_matches_hand_computation() {
        // intersection 1 bit, union 3 bits
        assert_eq!(fp("1100").tanimoto(&fp("1010")), 1.0 / 3.0);
        assert_eq!(fp("1111").tanimoto(&fp("1111")), 1.0);
        assert_eq!(fp("0000").tanimoto(&fp("0000")), 0.0);
    }

    #[test]
    fn search_filters_sorts_and_truncates() {
        let index = FingerprintIndex::new(vec![
            FingerprintEntry {
                fingerprint: fp("1000"),
                ligand_id: "LIG00001".into(),
                sensor_id: "S1".into(),
                name: "weak".into(),
            },
            FingerprintEntry {
                fingerprint: fp("1111"),
                ligand_id: "LIG00002".into(),
                sensor_id: "S2".into(),
                name: "exact".into(),
            },
            FingerprintEntry {
                fingerprint: fp("1110"),
                ligand_id: "LIG00003".into(),
                sensor_id: "S3".into(),
                name: "close".into(),
            },
        ]);

        let hits = index.search(&fp("1111"), 0.5, 10);
        let names: Vec<&str> = hits.iter().map(|hit| hit.name.as_str()).collect();
        assert_eq!(names, vec!["exact", "close"]);

        let capped = index.search(&fp("1111"), 0.0, 1);
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].ligand_id, "LIG00002");
    }

    #[test]
    fn artifact_accepts_string_ligand_ids() {
        let raw = serde_json::to_vec(&json!([
            ["1010", "LIG00001", "S1", "spermidine"],
            ["0110", "LIG00002", "S2", "putrescine"],
        ]))
        .unwrap();

        let index = FingerprintIndex::from_json_slice(&raw).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.entries()[0].ligand_id, "LIG00001");
        assert_eq!(index.entries()[1].ligand_id, "LIG00002");
    }

    #[test]
    fn artifact_parses_legacy_rows_and_skips_bad_ones() {
        let raw = serde_json::to_vec(&json!([
            ["1010", 1, "S1", "named"],
            ["0110", "LIG00002", "S2"],
            ["not bits", "LIG00003", "S3"],
            "not a row",
        ]))
        .unwrap();

        let index = FingerprintIndex::from_json_slice(&raw).unwrap();
        assert_eq!(index.len(), 2);
        // Numeric ids from older artifacts come through as strings.
        assert_eq!(index.entries()[0].ligand_id, "1");
        assert_eq!(index.entries()[1].name, "Unknown");
    }

    #[test]
    fn gzip_round_trips() {
        let index = FingerprintIndex::new(vec![FingerprintEntry {
            fingerprint: fp("1010"),
            ligand_id: "LIG00007".into(),
            sensor_id: "S1".into(),
            name: "lig".into(),
        }]);

        let bytes = index.to_gzip_bytes().unwrap();
        let restored = FingerprintIndex::from_gzip_slice(&bytes).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.entries()[0].ligand_id, "LIG00007");
        assert_eq!(restored.entries()[0].fingerprint, fp("1010"));
    }

    #[test]
    fn ligify_rows_accept_both_generations_and_skip_other_shapes() {
        let raw = serde_json::to_vec(&json!([
            ["1010", "LIG00001", "RegA", "spermidine", "NCCCCNCCCN"],
            ["0110", "LIG00002", "RegB", "putrescine"],
            ["0011", "LIG00003", "RegC"],
            ["0011", "LIG00004", "RegD", "x", "C", "extra"],
        ]))
        .unwrap();

        let index = LigifyIndex::from_json_slice(&raw).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.entries()[0].smiles.as_deref(), Some("NCCCCNCCCN"));
        assert_eq!(index.entries()[1].smiles, None);
        assert_eq!(index.entries()[1].regulator_id, "RegB");
    }

    #[test]
    fn ligify_search_carries_regulator_and_smiles() {
        let index = LigifyIndex::new(vec![
            LigifyEntry {
                fingerprint: fp("1111"),
                ligand_id: "LIG00001".into(),
                regulator_id: "RegA".into(),
                name: "exact".into(),
                smiles: Some("CCO".into()),
            },
            LigifyEntry {
                fingerprint: fp("0001"),
                ligand_id: "LIG00002".into(),
                regulator_id: "RegB".into(),
                name: "weak".into(),
                smiles: None,
            },
        ]);

        let hits = index.search(&fp("1111"), 0.5, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].regulator_id, "RegA");
        assert_eq!(hits[0].smiles.as_deref(), Some("CCO"));

        // Legacy entries serialize their missing SMILES as null.
        let all = index.search(&fp("1111"), 0.0, 10);
        let serialized = serde_json::to_value(&all[1]).unwrap();
        assert_eq!(serialized["smiles"], Value::Null);
        assert_eq!(serialized["regulatorId"], json!("RegB"));
    }

    #[test]
    fn ligify_gzip_round_trips() {
        let index = LigifyIndex::new(vec![LigifyEntry {
            fingerprint: fp("1010"),
            ligand_id: "LIG00009".into(),
            regulator_id: "RegZ".into(),
            name: "lig".into(),
            smiles: Some("CCO".into()),
        }]);

        let bytes = index.to_gzip_bytes().unwrap();
        let restored = LigifyIndex::from_gzip_slice(&bytes).unwrap();
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.entries()[0].ligand_id, "LIG00009");
        assert_eq!(restored.entries()[0].smiles.as_deref(), Some("CCO"));
    }

    struct StubFingerprinter;

    impl LigandFingerprinter for StubFingerprinter {
        fn fingerprint(&self, smiles: &str) -> Option<Fingerprint> {
            if smiles == "bad" {
                return None;
            }
            // Deterministic toy encoding: one bit per byte value, mod 16.
            let mut bits = vec!['0'; 16];
            for byte in smiles.bytes() {
                bits[usize::from(byte) % 16] = '1';
            }
            Fingerprint::from_bit_string(&bits.iter().collect::<String>()).ok()
        }
    }

    #[test]
    fn rebuild_dedupes_by_smiles_and_skips_failures() {
        let global_index = json!({
            "sensors": [
                {
                    "sensorId": "S1",
                    "ligands": [
                        {"name": "alpha", "SMILES": "CCO"},
                        {"name": "broken", "SMILES": "bad"},
                        {"name": "no smiles"},
                    ],
                },
                {
                    "sensorId": "S2",
                    "ligands": [{"name": "alpha again", "SMILES": "CCO"}],
                },
                {"sensorId": "S3", "ligands": null},
            ],
        });

        let index =
            FingerprintIndex::build_from_global_index(&global_index, &StubFingerprinter);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].ligand_id, "LIG00001");
        assert_eq!(index.entries()[0].sensor_id, "S1");
        assert_eq!(index.entries()[0].name, "alpha");
    }
}
