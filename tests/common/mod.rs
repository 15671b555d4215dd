use groovdb_api::models::CategoryRecord;
use serde_json::{json, Value};

/// Build a category record from its JSON document form.
pub fn record(value: Value) -> CategoryRecord {
    serde_json::from_value(value).expect("valid category record")
}

/// Build a record for (family, sensor) with the given category and payload.
pub fn category_record(family: &str, sensor_id: &str, category: &str, payload: Value) -> CategoryRecord {
    let mut doc = json!({
        "family": family,
        "sensorId": sensor_id,
        "category": category,
    });
    if let (Some(doc_map), Value::Object(payload)) = (doc.as_object_mut(), payload) {
        for (key, value) in payload {
            doc_map.insert(key, value);
        }
    }
    record(doc)
}

/// A full, realistic submission: one record per category.
pub fn full_submission(family: &str, sensor_id: &str) -> Vec<CategoryRecord> {
    vec![
        category_record(
            family,
            sensor_id,
            "about",
            json!({
                "alias": "PauR",
                "organism": "Pseudomonas aeruginosa",
                "accession": "WP_003093456.1",
                "mechanism": "Apo-repressor",
                "description": "Polyamine-responsive regulator",
            }),
        ),
        category_record(
            family,
            sensor_id,
            "ligands",
            json!({
                "data": [{
                    "name": "spermidine",
                    "SMILES": "NCCCCNCCCN",
                    "doi": "10.1/x",
                    "ref_figure": "Fig1",
                    "method": "Growth assay",
                    "fullDOI": {
                        "title": "Polyamine sensing in P. aeruginosa",
                        "authors": "Doe et al.",
                        "year": 2020,
                        "journal": "J Bact",
                        "doi": "10.1/x",
                        "url": "https://doi.org/10.1/x",
                    },
                }],
            }),
        ),
        category_record(family, sensor_id, "operators", json!({ "data": null })),
        category_record(family, sensor_id, "structure", json!({})),
        category_record(
            family,
            sensor_id,
            "operon",
            json!({ "newOperon": { "data": "[\"gene1\",\"gene2\"]" } }),
        ),
    ]
}
