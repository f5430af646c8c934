use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

/// Field holding the record list in report-style payloads.
pub const REPORT_RECORDS_FIELD: &str = "Rows";
/// Wrapper object holding keyed record lists in entity-style payloads.
pub const ENTITY_RECORDS_FIELD: &str = "QueryResponse";

/// Where a response document keeps its records.
///
/// The API returns two structurally different shapes: reports carry a
/// top-level `Rows` list, while entity queries nest their list under
/// `QueryResponse.<key>`. Callers pick the variant per endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// Report payload with records under the top-level `Rows` field.
    Report,
    /// Entity payload with records under `QueryResponse.<key>`.
    Entity { key: String },
}

impl ResponseShape {
    /// Shorthand for the entity variant.
    pub fn entity(key: impl Into<String>) -> Self {
        Self::Entity { key: key.into() }
    }

    /// Extracts the record list from a response document.
    ///
    /// A single object where a list was expected counts as one record; a
    /// missing or differently-typed field yields no records.
    pub fn extract_records(&self, document: &Value) -> Vec<Value> {
        let field = match self {
            Self::Report => document.get(REPORT_RECORDS_FIELD),
            Self::Entity { key } => document
                .get(ENTITY_RECORDS_FIELD)
                .and_then(|wrapper| wrapper.get(key)),
        };
        match field {
            Some(Value::Array(items)) => items.clone(),
            Some(object @ Value::Object(_)) => vec![object.clone()],
            _ => Vec::new(),
        }
    }
}

/// A flat projection of a record list, ready for tabular output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTable {
    /// Sorted union of flattened field names across all records.
    pub columns: Vec<String>,
    /// One row of cells per record, aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

/// Flattens a list of JSON records into a single table.
///
/// Nested objects contribute dotted column names (`Parent.Child`), arrays
/// are kept as JSON text in a single cell, and fields absent from a record
/// render as empty cells.
pub fn flatten_records(records: &[Value]) -> RecordTable {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    let mut flat_records: Vec<BTreeMap<String, String>> = Vec::with_capacity(records.len());

    for record in records {
        let mut cells = BTreeMap::new();
        flatten_value(record, None, &mut cells);
        columns.extend(cells.keys().cloned());
        flat_records.push(cells);
    }

    let columns: Vec<String> = columns.into_iter().collect();
    let rows = flat_records
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .map(|column| cells.get(column).cloned().unwrap_or_default())
                .collect()
        })
        .collect();

    RecordTable { columns, rows }
}

fn flatten_value(value: &Value, prefix: Option<&str>, cells: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let column = match prefix {
                    Some(prefix) => format!("{prefix}.{key}"),
                    None => key.clone(),
                };
                flatten_value(nested, Some(&column), cells);
            }
        }
        other => {
            let column = prefix.unwrap_or_default().to_string();
            cells.insert(column, render_cell(other));
        }
    }
}

/// Renders a leaf value as CSV cell text.
///
/// Strings stay bare, numbers and booleans use their display form, null
/// becomes an empty cell, and arrays are serialised as JSON text.
fn render_cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
