//! Mods and the patch files they declare.
//!
//! A [`ModDescriptor`] is what the overlay builder consumes: an enabled flag, a
//! priority, the whole-file overrides the mod bundles, the archives to pass through,
//! and an ordered list of [`PatchFile`]s. Patch files are parsed from the JSON patch
//! documents shipped inside mod packages:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "target": "Icarus/Content/Data/Items/D_ItemsStatic.json",
//!   "type": "DataTable",
//!   "data": { "patches": [ { "op": "Remove", "row": "Item_Stick" } ] }
//! }
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The only patch document / metadata schema version understood by this crate.
pub const SCHEMA_VERSION: u64 = 1;

/// One JSON-Patch operation list (RFC 6902).
///
/// Operations stay raw JSON until they are applied. A malformed operation fails
/// its own list, not the patch document holding it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonOperationList(pub Vec<Value>);

impl JsonOperationList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

/// A mod to be included in an install.
#[derive(Debug, Clone, Default)]
pub struct ModDescriptor {
    /// Unique identifier for the mod (used for same-mod checks and logging).
    pub id: String,
    /// Whether the mod takes part in the install.
    pub enabled: bool,
    /// Position in the managed mod list. Higher wins override conflicts.
    pub priority: usize,
    /// Whole-file overrides keyed by virtual path.
    pub overrides: BTreeMap<String, Vec<u8>>,
    /// Archives bundled with the mod, copied to the output unmodified.
    pub archives: Vec<BundledArchive>,
    /// Patch files in declaration order.
    pub patch_files: Vec<PatchFile>,
}

impl ModDescriptor {
    /// Create an enabled mod with no content.
    pub fn new(id: impl Into<String>, priority: usize) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            priority,
            ..Default::default()
        }
    }

    /// Whether the mod wholly overrides the given virtual path.
    pub fn overrides_path(&self, path: &str) -> bool {
        self.overrides.contains_key(path)
    }

    /// Bytes of the mod's override for a path, if it has one.
    pub fn override_data(&self, path: &str) -> Option<&[u8]> {
        self.overrides.get(path).map(Vec::as_slice)
    }
}

/// An archive file shipped inside a mod package.
#[derive(Clone)]
pub struct BundledArchive {
    /// File name inside the package (e.g. `MyMod_P.pak`).
    pub name: String,
    /// Raw archive bytes.
    pub data: Vec<u8>,
}

impl fmt::Debug for BundledArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundledArchive")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// The four kinds of patch a mod can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatchKind {
    Json,
    DataTable,
    Actor,
    AssetCopy,
}

impl PatchKind {
    /// Json and DataTable patches operate on text; Actor and AssetCopy on structural assets.
    pub fn is_textual(self) -> bool {
        matches!(self, PatchKind::Json | PatchKind::DataTable)
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatchKind::Json => "Json",
            PatchKind::DataTable => "DataTable",
            PatchKind::Actor => "Actor",
            PatchKind::AssetCopy => "AssetCopy",
        };
        f.write_str(s)
    }
}

/// A single patch document targeting one virtual path.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchFile {
    pub target_path: String,
    pub payload: PatchPayload,
}

/// Kind-specific patch data.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchPayload {
    Json(JsonPatch),
    DataTable(DataTablePatch),
    Actor(ActorPatch),
    AssetCopy(AssetCopyPatch),
}

impl PatchPayload {
    pub fn kind(&self) -> PatchKind {
        match self {
            PatchPayload::Json(_) => PatchKind::Json,
            PatchPayload::DataTable(_) => PatchKind::DataTable,
            PatchPayload::Actor(_) => PatchKind::Actor,
            PatchPayload::AssetCopy(_) => PatchKind::AssetCopy,
        }
    }
}

/// Ordered JSON-Patch operation lists.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonPatch {
    pub patches: Vec<JsonOperationList>,
}

/// Ordered row operations against a data table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataTablePatch {
    pub patches: Vec<DataTableOperation>,
}

/// Components to add to a cooked actor, as `<assetPath>.<ClassName>` references.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActorPatch {
    pub components: Vec<String>,
}

/// Duplicate the target asset under a new virtual path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetCopyPatch {
    #[serde(rename = "path")]
    pub new_path: String,
}

/// The kind of a data table row operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTableOpKind {
    #[serde(alias = "add")]
    Add,
    #[serde(alias = "remove")]
    Remove,
    #[serde(alias = "alter")]
    Alter,
}

/// One row operation. `row: null` addresses the table's `Defaults` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTableOperation {
    pub op: DataTableOpKind,
    #[serde(default)]
    pub row: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<JsonOperationList>,
}

impl fmt::Display for DataTableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "op: {:?}, row: {}",
            self.op,
            self.row.as_deref().unwrap_or("null")
        )
    }
}

impl PatchFile {
    pub fn new(target_path: impl Into<String>, payload: PatchPayload) -> Self {
        Self {
            target_path: target_path.into(),
            payload,
        }
    }

    pub fn kind(&self) -> PatchKind {
        self.payload.kind()
    }

    /// Parse a patch document from its JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| Error::Parse(format!("patch document is not valid JSON: {}", e)))?;
        let Value::Object(mut root) = root else {
            return Err(Error::Parse(
                "Expected root of file to be a json object".to_string(),
            ));
        };

        check_schema_version(&root)?;

        let target = match root.remove("target") {
            Some(Value::String(target)) => target,
            _ => return Err(Error::Parse("Missing required property 'target'".to_string())),
        };
        let type_name = match root.remove("type") {
            Some(Value::String(type_name)) => type_name,
            _ => return Err(Error::Parse("Missing required property 'type'".to_string())),
        };
        let kind: PatchKind = serde_json::from_value(Value::String(type_name.clone()))
            .map_err(|_| {
                Error::Parse(format!(
                    "'{}' is not a valid value for property 'type'",
                    type_name
                ))
            })?;

        let data = match root.remove("data") {
            Some(data @ Value::Object(_)) => data,
            _ => {
                return Err(Error::Parse(format!(
                    "'data' property either missing or not valid for patch type '{}'",
                    kind
                )))
            }
        };
        let invalid_data =
            |_| Error::Parse(format!("'data' property not valid for patch type '{}'", kind));

        let payload = match kind {
            PatchKind::Json => PatchPayload::Json(serde_json::from_value(data).map_err(invalid_data)?),
            PatchKind::DataTable => {
                PatchPayload::DataTable(serde_json::from_value(data).map_err(invalid_data)?)
            }
            PatchKind::Actor => PatchPayload::Actor(serde_json::from_value(data).map_err(invalid_data)?),
            PatchKind::AssetCopy => {
                PatchPayload::AssetCopy(serde_json::from_value(data).map_err(invalid_data)?)
            }
        };

        Ok(Self::new(target, payload))
    }
}

/// Verify the `schema_version` property of a patch document or mod metadata object.
pub fn check_schema_version(root: &Map<String, Value>) -> Result<()> {
    let version = root
        .get("schema_version")
        .ok_or_else(|| Error::Parse("Missing required property 'schema_version'".to_string()))?;
    match version.as_u64() {
        Some(SCHEMA_VERSION) => Ok(()),
        _ => Err(Error::Parse(format!(
            "Unknown schema version: {}. Supported schema version: {}",
            version, SCHEMA_VERSION
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_patch() {
        let text = r#"{
            "schema_version": 1,
            "target": "Icarus/Content/Data/Config.json",
            "type": "Json",
            "data": { "patches": [[ { "op": "add", "path": "/b", "value": 2 } ], []] }
        }"#;
        let patch = PatchFile::parse(text).unwrap();
        assert_eq!(patch.target_path, "Icarus/Content/Data/Config.json");
        assert_eq!(patch.kind(), PatchKind::Json);
        let PatchPayload::Json(json) = patch.payload else {
            panic!("expected json payload");
        };
        assert_eq!(json.patches.len(), 2);
        assert_eq!(json.patches[0].len(), 1);
        assert!(json.patches[1].is_empty());
    }

    #[test]
    fn test_parse_keeps_malformed_operations_for_later() {
        let text = r#"{
            "schema_version": 1,
            "target": "Icarus/Content/Data/Config.json",
            "type": "Json",
            "data": { "patches": [
                [ { "op": "add", "path": "/a", "value": 1 } ],
                [ { "op": "move", "path": "/b" }, { "op": "frobnicate", "path": "c" } ]
            ] }
        }"#;
        let patch = PatchFile::parse(text).unwrap();
        let PatchPayload::Json(json) = patch.payload else {
            panic!("expected json payload");
        };
        assert_eq!(json.patches.len(), 2);
        assert_eq!(json.patches[1].len(), 2);
    }

    #[test]
    fn test_parse_rejects_non_array_operation_list() {
        let err = PatchFile::parse(
            r#"{"schema_version":1,"target":"a","type":"Json","data":{"patches":[{"op":"add"}]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("Json")));
    }

    #[test]
    fn test_parse_data_table_patch() {
        let text = r#"{
            "schema_version": 1,
            "target": "Items.json",
            "type": "DataTable",
            "data": { "patches": [
                { "op": "Add", "row": "New", "value": { "Weight": 3 } },
                { "op": "Alter", "row": null, "patches": [[ { "op": "replace", "path": "/Weight", "value": 1 } ]] },
                { "op": "Remove", "row": "Old" }
            ] }
        }"#;
        let patch = PatchFile::parse(text).unwrap();
        let PatchPayload::DataTable(table) = patch.payload else {
            panic!("expected data table payload");
        };
        assert_eq!(table.patches.len(), 3);
        assert_eq!(table.patches[0].op, DataTableOpKind::Add);
        assert_eq!(table.patches[1].row, None);
        assert_eq!(table.patches[1].patches.len(), 1);
        assert_eq!(table.patches[2].to_string(), "op: Remove, row: Old");
    }

    #[test]
    fn test_parse_actor_and_asset_copy() {
        let actor = PatchFile::parse(
            r#"{"schema_version":1,"target":"A.uasset","type":"Actor","data":{"components":["/Game/Mods/C.C_C"]}}"#,
        )
        .unwrap();
        assert_eq!(
            actor.payload,
            PatchPayload::Actor(ActorPatch {
                components: vec!["/Game/Mods/C.C_C".to_string()]
            })
        );

        let copy = PatchFile::parse(
            r#"{"schema_version":1,"target":"A.uasset","type":"AssetCopy","data":{"path":"B.uasset"}}"#,
        )
        .unwrap();
        assert_eq!(
            copy.payload,
            PatchPayload::AssetCopy(AssetCopyPatch {
                new_path: "B.uasset".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_bad_schema_version() {
        let err = PatchFile::parse(r#"{"schema_version":2,"target":"a","type":"Json","data":{"patches":[]}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("Unknown schema version")));

        let err = PatchFile::parse(r#"{"target":"a","type":"Json","data":{"patches":[]}}"#).unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("schema_version")));
    }

    #[test]
    fn test_parse_rejects_unknown_type_and_bad_data() {
        let err = PatchFile::parse(r#"{"schema_version":1,"target":"a","type":"Texture","data":{}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("'Texture'")));

        let err = PatchFile::parse(r#"{"schema_version":1,"target":"a","type":"Actor","data":{"components":"x"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Parse(msg) if msg.contains("Actor")));

        let err = PatchFile::parse(r#"[1, 2]"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_mod_descriptor_overrides() {
        let mut m = ModDescriptor::new("m1", 0);
        m.overrides.insert("a.json".to_string(), b"{}".to_vec());
        assert!(m.enabled);
        assert!(m.overrides_path("a.json"));
        assert_eq!(m.override_data("a.json"), Some(&b"{}"[..]));
        assert_eq!(m.override_data("b.json"), None);
    }
}
