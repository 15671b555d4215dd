use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Which interaction category a reference was encountered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InteractionKind {
    Ligand,
    Operator,
    Structure,
}

/// Lightweight citation pointer, one per interaction with a non-empty doi.
///
/// `figure` and `method` are carried verbatim (string or null) from the
/// interaction entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub doi: String,
    pub figure: Value,
    pub interaction: InteractionKind,
    pub method: Value,
}

/// One `{figure, type, method}` entry inside a [`FullReference`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionRef {
    pub figure: Value,
    #[serde(rename = "type")]
    pub kind: InteractionKind,
    pub method: Value,
}

/// Resolved citation metadata grouped by the citation's own doi, with one
/// interaction entry per interaction that referenced it, across categories.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FullReference {
    pub title: Value,
    pub authors: Value,
    pub year: Value,
    pub journal: Value,
    pub doi: Value,
    pub url: Value,
    pub interaction: Vec<InteractionRef>,
}

/// The denormalized sensor document produced by the merge.
///
/// Field names are a de facto public contract: the read path serializes this
/// directly as the response body and the index builders read it back. Fields
/// are only present for categories that actually contributed a record, which
/// is why this is an insertion-built JSON object rather than a fixed struct.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorView {
    fields: Map<String, Value>,
}

impl SensorView {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

impl Serialize for SensorView {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl From<SensorView> for Value {
    fn from(view: SensorView) -> Self {
        view.into_value()
    }
}
