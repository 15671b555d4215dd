//! Sensor record merger.
//!
//! Collapses the per-category records of one sensor (about / ligands /
//! operators / structure / operon) into a single denormalized [`SensorView`],
//! deduplicating resolved citations across categories. This is the one
//! transform shared by the moderation publish path and both read paths, so
//! every consumer agrees on the output shape.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::models::{
    CategoryPayload, CategoryRecord, FullReference, InteractionKind, InteractionRef, Reference,
    SensorView,
};

/// Merge every category record for one sensor into a denormalized view.
///
/// Records are processed in the order given; callers supply them in the
/// store's stable order, which fixes the ordering of the reference lists.
/// The transform never fails: a malformed category degrades to `null` for
/// its field so one corrupt slice cannot make the whole sensor unviewable.
pub fn merge_sensor_records(records: &[CategoryRecord]) -> SensorView {
    let mut view = SensorView::new();
    let mut references: Vec<Reference> = Vec::new();
    // Insertion-ordered on purpose: fullReferences keeps first-encounter order.
    let mut full_references: IndexMap<String, FullReference> = IndexMap::new();

    for record in records {
        match &record.payload {
            CategoryPayload::About { fields } => merge_about(fields, &mut view),
            CategoryPayload::Ligands { data } => merge_interaction_list(
                data,
                "ligands",
                InteractionKind::Ligand,
                clone_entry,
                &mut view,
                &mut references,
                &mut full_references,
            ),
            CategoryPayload::Operators { data } => merge_interaction_list(
                data,
                "operators",
                InteractionKind::Operator,
                clone_entry,
                &mut view,
                &mut references,
                &mut full_references,
            ),
            CategoryPayload::Structure { data } => merge_interaction_list(
                data,
                "structures",
                InteractionKind::Structure,
                structure_id,
                &mut view,
                &mut references,
                &mut full_references,
            ),
            CategoryPayload::Operon { new_operon, operon } => {
                merge_operon(new_operon, operon, &mut view)
            }
        }
    }

    view.insert("references", json!(references));
    let grouped: Vec<FullReference> = full_references.into_values().collect();
    view.insert("fullReferences", json!(grouped));
    view
}

/// Copy the about scalars into the view, renaming `mechanism` to
/// `regulationType` (empty string when absent). The grouping keys and the
/// category tag were already stripped during deserialization.
fn merge_about(fields: &Map<String, Value>, view: &mut SensorView) {
    for (key, value) in fields {
        if key == "mechanism" {
            continue;
        }
        view.insert(key.clone(), value.clone());
    }
    let regulation = fields
        .get("mechanism")
        .filter(|value| !value.is_null())
        .cloned()
        .unwrap_or_else(|| Value::String(String::new()));
    view.insert("regulationType", regulation);
}

fn clone_entry(entry: &Value) -> Value {
    entry.clone()
}

/// Structure interactions contribute only their deposited-structure code to
/// the output list; the rest of the entry matters only for the references.
fn structure_id(entry: &Value) -> Value {
    entry.get("PDB_code").cloned().unwrap_or(Value::Null)
}

fn merge_interaction_list(
    data: &Option<Value>,
    field: &'static str,
    kind: InteractionKind,
    project: fn(&Value) -> Value,
    view: &mut SensorView,
    references: &mut Vec<Reference>,
    full_references: &mut IndexMap<String, FullReference>,
) {
    // Absent, null, or non-array input means "no data for this category",
    // which consumers distinguish from an empty list.
    let Some(Value::Array(entries)) = data else {
        view.insert(field, Value::Null);
        return;
    };

    let mut merged = Vec::with_capacity(entries.len());
    for entry in entries {
        collect_references(entry, kind, references, full_references);
        merged.push(project(entry));
    }
    view.insert(field, Value::Array(merged));
}

fn collect_references(
    entry: &Value,
    kind: InteractionKind,
    references: &mut Vec<Reference>,
    full_references: &mut IndexMap<String, FullReference>,
) {
    if let Some(doi) = entry
        .get("doi")
        .and_then(Value::as_str)
        .filter(|doi| !doi.is_empty())
    {
        references.push(Reference {
            doi: doi.to_owned(),
            figure: field_or_null(entry, "ref_figure"),
            interaction: kind,
            method: field_or_null(entry, "method"),
        });
    }

    let Some(Value::Object(citation)) = entry.get("fullDOI") else {
        return;
    };
    // Grouping key is the citation's own doi field, taken verbatim: no case
    // or whitespace normalization.
    let Some(citation_doi) = citation.get("doi").and_then(Value::as_str) else {
        tracing::warn!("fullDOI payload without a doi field, skipping");
        return;
    };

    let group = full_references
        .entry(citation_doi.to_owned())
        .or_insert_with(|| FullReference {
            title: citation_field(citation, "title"),
            authors: citation_field(citation, "authors"),
            year: citation_field(citation, "year"),
            journal: citation_field(citation, "journal"),
            doi: citation_field(citation, "doi"),
            url: citation_field(citation, "url"),
            interaction: Vec::new(),
        });
    group.interaction.push(InteractionRef {
        figure: field_or_null(entry, "ref_figure"),
        kind,
        method: field_or_null(entry, "method"),
    });
}

fn field_or_null(entry: &Value, key: &str) -> Value {
    entry.get(key).cloned().unwrap_or(Value::Null)
}

fn citation_field(citation: &Map<String, Value>, key: &str) -> Value {
    citation.get(key).cloned().unwrap_or(Value::Null)
}

/// Both operon storage generations are accepted. The object form wins when
/// present and keeps its `newOperon` output name; the legacy list form keeps
/// `operon` and accumulates across records instead of overwriting.
fn merge_operon(new_operon: &Option<Value>, operon: &Option<Value>, view: &mut SensorView) {
    if let Some(wrapper) = new_operon {
        view.insert("newOperon", resolve_new_operon(wrapper));
        return;
    }

    match operon {
        Some(Value::Array(items)) => {
            let slot = view
                .fields_mut()
                .entry("operon")
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(list) => list.extend(items.iter().cloned()),
                other => *other = Value::Array(items.clone()),
            }
        }
        Some(_) => view.insert("operon", Value::Null),
        None => {}
    }
}

fn resolve_new_operon(wrapper: &Value) -> Value {
    let Some(data) = wrapper.get("data") else {
        return Value::Null;
    };
    match data {
        Value::String(raw) => parse_operon_payload(raw).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "discarding unparseable operon payload");
            Value::Null
        }),
        already_parsed => already_parsed.clone(),
    }
}

/// JSON-decode a string-encoded operon payload. Kept as an explicit Result so
/// the fail-soft conversion to `null` happens visibly at the call site.
fn parse_operon_payload(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}
