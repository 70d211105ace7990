//! Row-level patching of data table documents.
//!
//! Data tables are JSON documents of the form
//! `{ "RowStruct": ..., "Defaults": { ... }, "Rows": [ { "Name": "...", ... } ] }`.
//! Rows are addressed by their `Name`.

use super::json::{apply_operation_lists, parse_text, ApplyStats};
use crate::error::Result;
use crate::model::{DataTableOpKind, DataTableOperation};
use serde_json::{Map, Value};
use std::collections::HashMap;

const ROWS: &str = "Rows";
const DEFAULTS: &str = "Defaults";
const NAME: &str = "Name";

/// Apply row operations, in order, to a data table document.
///
/// The whole document is re-serialized, not just its rows.
pub fn integrate(baseline: &str, operations: &[&DataTableOperation]) -> Result<String> {
    let root = parse_text(baseline)?;
    let mut table = DataTable::new(root);

    let mut stats = ApplyStats::default();
    for operation in operations {
        stats.merge(table.apply(operation));
    }
    tracing::debug!(
        operations = operations.len(),
        applied = stats.applied,
        abandoned = stats.abandoned,
        "Applied data table operations"
    );

    Ok(serde_json::to_string_pretty(&table.into_value())?)
}

/// A data table document with a name -> position index over its rows.
struct DataTable {
    root: Value,
    index: HashMap<String, usize>,
}

impl DataTable {
    fn new(root: Value) -> Self {
        let index = build_index(&root).unwrap_or_else(|| {
            tracing::warn!("Data table rows are malformed, treating the table as empty");
            HashMap::new()
        });
        Self { root, index }
    }

    fn into_value(self) -> Value {
        self.root
    }

    fn apply(&mut self, operation: &DataTableOperation) -> ApplyStats {
        match operation.op {
            DataTableOpKind::Add => {
                self.add(operation);
                ApplyStats::default()
            }
            DataTableOpKind::Remove => {
                self.remove(operation);
                ApplyStats::default()
            }
            DataTableOpKind::Alter => self.alter(operation),
        }
    }

    fn add(&mut self, operation: &DataTableOperation) {
        let (Some(row), Some(value)) = (&operation.row, &operation.value) else {
            tracing::debug!("Skipping data table operation ({}): missing row or value", operation);
            return;
        };
        if self.index.contains_key(row) {
            tracing::debug!("Skipping data table operation ({}): row already exists", operation);
            return;
        }

        let mut new_row = Map::with_capacity(value.len() + 1);
        new_row.insert(NAME.to_string(), Value::String(row.clone()));
        for (key, field) in value {
            if key != NAME {
                new_row.insert(key.clone(), field.clone());
            }
        }

        let Some(rows) = self.rows_for_insert() else {
            tracing::warn!("Skipping data table operation ({}): document is not an object", operation);
            return;
        };
        rows.push(Value::Object(new_row));
        let position = rows.len() - 1;
        self.index.insert(row.clone(), position);
    }

    fn remove(&mut self, operation: &DataTableOperation) {
        let Some(row) = &operation.row else {
            return;
        };
        let Some(rows) = self.root.get_mut(ROWS).and_then(Value::as_array_mut) else {
            return;
        };
        let Some(position) = self.index.remove(row) else {
            tracing::debug!("Skipping data table operation ({}): row not found", operation);
            return;
        };

        rows.remove(position);
        for index in self.index.values_mut() {
            if *index > position {
                *index -= 1;
            }
        }
    }

    fn alter(&mut self, operation: &DataTableOperation) -> ApplyStats {
        let target = match &operation.row {
            None => self.root.get_mut(DEFAULTS),
            Some(row) => match self.index.get(row) {
                Some(&position) => self
                    .root
                    .get_mut(ROWS)
                    .and_then(|rows| rows.get_mut(position)),
                None => None,
            },
        };

        match target {
            Some(target) => apply_operation_lists(target, &operation.patches),
            None => {
                tracing::debug!("Skipping data table operation ({}): target not found", operation);
                ApplyStats::default()
            }
        }
    }

    /// The `Rows` array, replacing a missing or non-array value with a fresh one.
    fn rows_for_insert(&mut self) -> Option<&mut Vec<Value>> {
        let root = self.root.as_object_mut()?;
        let rows = root
            .entry(ROWS)
            .or_insert_with(|| Value::Array(Vec::new()));
        if !rows.is_array() {
            *rows = Value::Array(Vec::new());
        }
        rows.as_array_mut()
    }
}

/// Index rows by name. Rows without a string `Name` are left out of the index.
/// `None` when `Rows` is malformed: not an array, a row that is not an object, or
/// a repeated name.
fn build_index(root: &Value) -> Option<HashMap<String, usize>> {
    let Some(rows) = root.get(ROWS) else {
        return Some(HashMap::new());
    };
    let rows = rows.as_array()?;

    let mut index = HashMap::with_capacity(rows.len());
    for (position, row) in rows.iter().enumerate() {
        let Some(name) = row.as_object()?.get(NAME).and_then(Value::as_str) else {
            continue;
        };
        if index.insert(name.to_string(), position).is_some() {
            return None;
        }
    }
    Some(index)
}
