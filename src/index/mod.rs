//! Catalog index projections.
//!
//! The publish path folds a reduced projection of every approved sensor view
//! into two index documents: the global `all-sensors.json` and one per-family
//! document. These are the documents the frontend browses and the
//! fingerprint rebuild reads, so their field names are part of the contract.

use serde_json::{json, Map, Value};

use crate::models::SensorView;

/// Key of the global catalog index in the object store.
pub const GLOBAL_INDEX_KEY: &str = "all-sensors.json";

pub fn family_index_key(family: &str) -> String {
    format!("index/{}.json", family.to_lowercase())
}

/// Key of a published per-sensor document.
pub fn sensor_document_key(family: &str, sensor_id: &str) -> String {
    format!("sensors/{}/{}.json", family.to_lowercase(), sensor_id)
}

pub fn empty_global_index() -> Value {
    json!({ "sensors": [] })
}

pub fn empty_family_index(family: &str) -> Value {
    json!({ "family": family, "sensors": [] })
}

/// Reduced projection for the global index. Keeps the full ligand list
/// because the fingerprint rebuild reads SMILES strings from here.
pub fn global_index_entry(family: &str, sensor_id: &str, view: &SensorView) -> Value {
    json!({
        "sensorId": sensor_id,
        "family": family,
        "alias": view_field(view, "alias"),
        "regulationType": view_field(view, "regulationType"),
        "ligands": view_field(view, "ligands"),
    })
}

/// Lighter projection for the per-family browse page.
pub fn family_index_entry(sensor_id: &str, view: &SensorView) -> Value {
    json!({
        "sensorId": sensor_id,
        "alias": view_field(view, "alias"),
        "description": view_field(view, "description"),
        "regulationType": view_field(view, "regulationType"),
    })
}

fn view_field(view: &SensorView, key: &str) -> Value {
    view.get(key).cloned().unwrap_or(Value::Null)
}

/// Insert or replace an entry in an index document, keyed on `sensorId`.
/// Replacement happens in place so index order is stable across republishes.
/// A document of an unexpected shape is reset rather than rejected.
pub fn upsert_sensor_entry(index: &mut Value, entry: Value) {
    if !index.is_object() {
        *index = Value::Object(Map::new());
    }
    let Value::Object(doc) = index else {
        return;
    };

    let sensors = doc
        .entry("sensors")
        .or_insert_with(|| Value::Array(Vec::new()));
    if !sensors.is_array() {
        *sensors = Value::Array(Vec::new());
    }
    let Value::Array(list) = sensors else {
        return;
    };

    let id = entry.get("sensorId").cloned().unwrap_or(Value::Null);
    match list
        .iter_mut()
        .find(|existing| existing.get("sensorId") == Some(&id))
    {
        Some(existing) => *existing = entry,
        None => list.push(entry),
    }
}
