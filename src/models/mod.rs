use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod view;

pub use view::{FullReference, InteractionKind, InteractionRef, Reference, SensorView};

/// One slice of a sensor's data as stored in the category table.
///
/// Every record carries the grouping key (`family` + `sensorId`); the rest of
/// the document is dispatched on the closed `category` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub family: String,
    #[serde(rename = "sensorId")]
    pub sensor_id: String,
    #[serde(flatten)]
    pub payload: CategoryPayload,
}

impl CategoryRecord {
    /// Parse a raw store document into a category record.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn category(&self) -> &'static str {
        match self.payload {
            CategoryPayload::About { .. } => "about",
            CategoryPayload::Ligands { .. } => "ligands",
            CategoryPayload::Operators { .. } => "operators",
            CategoryPayload::Structure { .. } => "structure",
            CategoryPayload::Operon { .. } => "operon",
        }
    }
}

/// Per-category payload shapes.
///
/// The interaction lists stay loose JSON (`Option<Value>`) on purpose: the
/// upstream store does not guarantee shape, and "absent / null / not an
/// array" must stay distinguishable from "empty array" all the way into the
/// merged view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum CategoryPayload {
    About {
        /// Scalar sensor fields (alias, organism, accession, sequence,
        /// mechanism, description, ...). All optional; copied through to the
        /// view except for the `mechanism` rename.
        #[serde(flatten)]
        fields: Map<String, Value>,
    },
    Ligands {
        #[serde(default)]
        data: Option<Value>,
    },
    Operators {
        #[serde(default)]
        data: Option<Value>,
    },
    Structure {
        #[serde(default)]
        data: Option<Value>,
    },
    Operon {
        /// Current single-object form; its `data` sub-field may be a
        /// JSON-encoded string.
        #[serde(rename = "newOperon", default, skip_serializing_if = "Option::is_none")]
        new_operon: Option<Value>,
        /// Legacy list form, copied through unchanged.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operon: Option<Value>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dispatches_on_category_tag() {
        let record = CategoryRecord::from_value(json!({
            "family": "TetR",
            "sensorId": "P0ACT4",
            "category": "ligands",
            "data": [{"name": "tetracycline"}],
        }))
        .unwrap();

        assert_eq!(record.category(), "ligands");
        match record.payload {
            CategoryPayload::Ligands { data } => {
                assert_eq!(data, Some(json!([{"name": "tetracycline"}])));
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }

    #[test]
    fn about_keeps_scalars_but_not_keys() {
        let record = CategoryRecord::from_value(json!({
            "family": "TetR",
            "sensorId": "P0ACT4",
            "category": "about",
            "alias": "AcrR",
            "mechanism": "Apo-repressor",
        }))
        .unwrap();

        match record.payload {
            CategoryPayload::About { fields } => {
                assert_eq!(fields.get("alias"), Some(&json!("AcrR")));
                assert!(fields.get("family").is_none());
                assert!(fields.get("sensorId").is_none());
                assert!(fields.get("category").is_none());
            }
            other => panic!("wrong payload: {:?}", other),
        }
    }

    #[test]
    fn missing_and_null_data_both_deserialize_to_none() {
        let missing = CategoryRecord::from_value(json!({
            "family": "F", "sensorId": "S", "category": "operators",
        }))
        .unwrap();
        let null = CategoryRecord::from_value(json!({
            "family": "F", "sensorId": "S", "category": "operators", "data": null,
        }))
        .unwrap();

        for record in [missing, null] {
            match record.payload {
                CategoryPayload::Operators { data } => assert!(data.is_none()),
                other => panic!("wrong payload: {:?}", other),
            }
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        let result = CategoryRecord::from_value(json!({
            "family": "F", "sensorId": "S", "category": "misc",
        }));
        assert!(result.is_err());
    }
}
