use icarus_overlay::model::check_schema_version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The name of the metadata entry at the root of a zip package.
pub const MOD_INFO_PATH: &str = "mod.info";

pub const RAW_PAK_AUTHOR: &str = "Unknown";
pub const RAW_PAK_DESCRIPTION: &str = "This is a raw pak file mod. No metadata is available.";

/// Descriptive metadata of a mod, read from `mod.info`.
///
/// Only `schema_version` is required in the file. Every other field falls back to
/// a default when it is missing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModInfo {
    pub id: String,
    pub name: String,
    pub author: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub web: Option<String>,
}

impl ModInfo {
    /// Metadata for a package without a usable `mod.info`.
    pub fn fallback(fallback_id: &str) -> Self {
        Self {
            id: fallback_id.to_string(),
            name: fallback_id.to_string(),
            ..Default::default()
        }
    }

    /// Metadata for a bare `.pak` file.
    pub fn raw_pak(file_name: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: file_name.to_string(),
            author: Some(RAW_PAK_AUTHOR.to_string()),
            description: Some(RAW_PAK_DESCRIPTION.to_string()),
            ..Default::default()
        }
    }

    /// Parse the contents of a `mod.info` file.
    ///
    /// `id` and `name` default to `fallback_id`.
    pub fn parse(text: &str, fallback_id: &str) -> icarus_overlay::Result<Self> {
        let root: Value = serde_json::from_str(text.trim_start_matches('\u{feff}'))
            .map_err(|e| icarus_overlay::Error::Parse(format!("mod.info is not valid JSON: {}", e)))?;
        let Value::Object(root) = root else {
            return Err(icarus_overlay::Error::Parse(
                "Expected root of file to be a json object".to_string(),
            ));
        };
        check_schema_version(&root)?;

        let text_field = |key: &str| root.get(key).and_then(Value::as_str).map(str::to_string);

        Ok(Self {
            id: text_field("id").unwrap_or_else(|| fallback_id.to_string()),
            name: text_field("name").unwrap_or_else(|| fallback_id.to_string()),
            author: text_field("author"),
            version: text_field("version"),
            description: text_field("description"),
            web: text_field("web"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_metadata() {
        let info = ModInfo::parse(
            r#"{
                "schema_version": 1,
                "id": "better-crates",
                "name": "Better Crates",
                "author": "someone",
                "version": "1.2.0",
                "description": "Bigger crates",
                "web": "https://example.com"
            }"#,
            "fallback",
        )
        .unwrap();

        assert_eq!(info.id, "better-crates");
        assert_eq!(info.name, "Better Crates");
        assert_eq!(info.version.as_deref(), Some("1.2.0"));
        assert_eq!(info.web.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn test_missing_fields_use_fallback() {
        let info = ModInfo::parse("\u{feff}{\"schema_version\": 1}", "MyMod").unwrap();
        assert_eq!(info, ModInfo::fallback("MyMod"));
    }

    #[test]
    fn test_schema_version_is_checked() {
        assert!(ModInfo::parse(r#"{"id": "a"}"#, "a").is_err());
        assert!(ModInfo::parse(r#"{"schema_version": 2}"#, "a").is_err());
        assert!(ModInfo::parse("[1]", "a").is_err());
        assert!(ModInfo::parse("not json", "a").is_err());
    }

    #[test]
    fn test_raw_pak_metadata() {
        let info = ModInfo::raw_pak("Weapons_P.pak", "Weapons_P");
        assert_eq!(info.id, "Weapons_P");
        assert_eq!(info.name, "Weapons_P.pak");
        assert_eq!(info.author.as_deref(), Some(RAW_PAK_AUTHOR));
        assert_eq!(info.description.as_deref(), Some(RAW_PAK_DESCRIPTION));
    }
}
