//! JSON-Patch integration.

use crate::error::{Error, Result};
use crate::model::JsonOperationList;
use json_patch::PatchOperation;
use serde_json::Value;

/// Outcome counters of applying operation lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    /// Lists whose operations all succeeded.
    pub applied: usize,
    /// Lists abandoned at a failing operation.
    pub abandoned: usize,
}

impl ApplyStats {
    pub fn merge(&mut self, other: ApplyStats) {
        self.applied += other.applied;
        self.abandoned += other.abandoned;
    }
}

/// Apply JSON-Patch operation lists, in order, to a text baseline.
///
/// Returns the baseline untouched when `lists` is empty. Otherwise the document is
/// parsed once, every list is applied to the same tree and the result is
/// pretty-printed.
pub fn integrate(baseline: &str, lists: &[&JsonOperationList]) -> Result<String> {
    if lists.is_empty() {
        return Ok(baseline.to_string());
    }

    let mut document = parse_text(baseline)?;
    let stats = apply_operation_lists(&mut document, lists.iter().copied());
    tracing::debug!(
        applied = stats.applied,
        abandoned = stats.abandoned,
        "Applied json patch lists"
    );

    Ok(serde_json::to_string_pretty(&document)?)
}

/// Apply each list to `target`.
///
/// Operations run one at a time. When one fails, the rest of its list is skipped
/// and the next list starts from the tree as it stands: earlier operations of the
/// failed list stay applied. An operation that does not decode as RFC 6902 fails
/// like any other.
pub fn apply_operation_lists<'a>(
    target: &mut Value,
    lists: impl IntoIterator<Item = &'a JsonOperationList>,
) -> ApplyStats {
    let mut stats = ApplyStats::default();

    for (list_index, list) in lists.into_iter().enumerate() {
        let failure = list
            .operations()
            .enumerate()
            .find_map(|(op_index, op)| apply_operation(target, op).err().map(|e| (op_index, e)));

        match failure {
            None => stats.applied += 1,
            Some((op_index, e)) => {
                tracing::debug!(
                    list = list_index,
                    operation = op_index,
                    skipped = list.len() - op_index - 1,
                    "Abandoning json patch list: {}",
                    e
                );
                stats.abandoned += 1;
            }
        }
    }

    stats
}

fn apply_operation(target: &mut Value, operation: &Value) -> std::result::Result<(), String> {
    let operation: PatchOperation = serde_json::from_value(operation.clone())
        .map_err(|e| format!("invalid operation {}: {}", operation, e))?;
    json_patch::patch(target, std::slice::from_ref(&operation)).map_err(|e| e.to_string())
}

/// Parse baseline text, ignoring a leading byte order mark.
pub(crate) fn parse_text(text: &str) -> Result<Value> {
    serde_json::from_str(text.trim_start_matches('\u{feff}'))
        .map_err(|e| Error::Parse(format!("baseline is not valid JSON: {}", e)))
}
