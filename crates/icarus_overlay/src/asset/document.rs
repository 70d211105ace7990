//! In-memory structural asset document.
//!
//! A cooked asset is three append-only tables: names, imports and exports. Records
//! refer to each other by position only ([`FName`] into the name map, [`PackageIndex`]
//! into the import/export tables), so the document only exposes append and lookup
//! operations. Nothing is ever removed or reordered, which keeps every outstanding
//! reference valid while integrators grow the tables.

use super::property::{FieldProperty, Property};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Object flags (`EObjectFlags`) used by the integrators.
pub mod object_flags {
    pub const PUBLIC: u32 = 0x0000_0001;
    pub const TRANSACTIONAL: u32 = 0x0000_0008;
    pub const CLASS_DEFAULT_OBJECT: u32 = 0x0000_0010;
    pub const ARCHETYPE_OBJECT: u32 = 0x0000_0020;
    pub const LOAD_COMPLETED: u32 = 0x0020_0000;
}

/// Reference into the import or export table.
///
/// `0` is null, positive values are `export index + 1`, negative values are
/// `-(import index + 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageIndex(pub i32);

impl PackageIndex {
    pub const NULL: PackageIndex = PackageIndex(0);

    pub fn from_import(index: usize) -> Self {
        PackageIndex(-(index as i32) - 1)
    }

    pub fn from_export(index: usize) -> Self {
        PackageIndex(index as i32 + 1)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn import_index(self) -> Option<usize> {
        (self.0 < 0).then(|| (-self.0 - 1) as usize)
    }

    pub fn export_index(self) -> Option<usize> {
        (self.0 > 0).then(|| (self.0 - 1) as usize)
    }
}

/// Name reference: position in the name map plus an instance number.
///
/// A non-zero `number` is displayed as `Name_{number - 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FName {
    pub index: usize,
    pub number: u32,
}

impl FName {
    pub fn new(index: usize) -> Self {
        Self { index, number: 0 }
    }

    pub fn with_number(index: usize, number: u32) -> Self {
        Self { index, number }
    }
}

/// The name map of a document. Entries are unique; adding an existing string
/// returns its current position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct NameMap {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
}

impl From<Vec<String>> for NameMap {
    fn from(names: Vec<String>) -> Self {
        let mut lookup = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            lookup.entry(name.clone()).or_insert(i);
        }
        Self { names, lookup }
    }
}

impl From<NameMap> for Vec<String> {
    fn from(map: NameMap) -> Self {
        map.names
    }
}

impl NameMap {
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Append `name` unless it is already present.
    pub fn add(&mut self, name: &str) -> usize {
        if let Some(index) = self.find(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), index);
        index
    }

    /// Rewrite the entry at `index` in place. Positions never change.
    ///
    /// Lookups keep resolving to the first slot holding a string, also when the
    /// map carries duplicates.
    pub fn set(&mut self, index: usize, name: String) {
        let Some(slot) = self.names.get_mut(index) else {
            return;
        };
        let old = std::mem::replace(slot, name.clone());

        if self.lookup.get(&old) == Some(&index) {
            self.lookup.remove(&old);
            if let Some(other) = self.names.iter().position(|n| *n == old) {
                self.lookup.insert(old, other);
            }
        }
        let entry = self.lookup.entry(name).or_insert(index);
        *entry = (*entry).min(index);
    }
}

/// A reference to an object that lives in another package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub class_package: FName,
    pub class_name: FName,
    pub outer_index: PackageIndex,
    pub object_name: FName,
    #[serde(default)]
    pub optional: bool,
}

/// An object defined by this package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub class_index: PackageIndex,
    pub super_index: PackageIndex,
    pub template_index: PackageIndex,
    pub outer_index: PackageIndex,
    pub object_name: FName,
    pub object_flags: u32,
    #[serde(default)]
    pub serialization_before_serialization: Vec<PackageIndex>,
    #[serde(default)]
    pub create_before_serialization: Vec<PackageIndex>,
    #[serde(default)]
    pub serialization_before_create: Vec<PackageIndex>,
    #[serde(default)]
    pub create_before_create: Vec<PackageIndex>,
    /// Trailing bytes after the tagged properties.
    #[serde(default)]
    pub extras: Vec<u8>,
    pub data: ExportData,
}

impl Export {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.object_flags & flag != 0
    }
}

/// Serialized body of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExportData {
    /// Tagged properties only.
    Normal { properties: Vec<Property> },
    /// A class export: tagged properties plus the class's own property descriptors.
    Class {
        properties: Vec<Property>,
        loaded_properties: Vec<FieldProperty>,
    },
    /// A body this crate does not interpret. Kept byte-for-byte.
    Raw(Vec<u8>),
}

impl ExportData {
    pub fn properties(&self) -> Option<&[Property]> {
        match self {
            ExportData::Normal { properties } | ExportData::Class { properties, .. } => {
                Some(properties)
            }
            ExportData::Raw(_) => None,
        }
    }

    pub fn properties_mut(&mut self) -> Option<&mut Vec<Property>> {
        match self {
            ExportData::Normal { properties } | ExportData::Class { properties, .. } => {
                Some(properties)
            }
            ExportData::Raw(_) => None,
        }
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ExportData::Raw(_))
    }
}

/// A parsed asset: name map, import table, export table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetDocument {
    pub names: NameMap,
    pub imports: Vec<Import>,
    pub exports: Vec<Export>,
}

impl AssetDocument {
    /// Intern `name` and return an [`FName`] for it.
    pub fn add_name(&mut self, name: &str) -> FName {
        FName::new(self.names.add(name))
    }

    /// The plain string an [`FName`] points at (without its number).
    pub fn name_str(&self, name: FName) -> Option<&str> {
        self.names.get(name.index)
    }

    /// Display form of an [`FName`], including the `_N` instance suffix.
    pub fn display_name(&self, name: FName) -> String {
        let base = self.name_str(name).unwrap_or("None");
        if name.number > 0 {
            format!("{}_{}", base, name.number - 1)
        } else {
            base.to_string()
        }
    }

    pub fn import(&self, index: PackageIndex) -> Option<&Import> {
        index.import_index().and_then(|i| self.imports.get(i))
    }

    pub fn export(&self, index: PackageIndex) -> Option<&Export> {
        index.export_index().and_then(|i| self.exports.get(i))
    }

    pub fn export_mut(&mut self, index: PackageIndex) -> Option<&mut Export> {
        index.export_index().and_then(|i| self.exports.get_mut(i))
    }

    /// Object name of the import an export's class index points at.
    pub fn export_class_name(&self, export: &Export) -> Option<&str> {
        self.import(export.class_index)
            .and_then(|import| self.name_str(import.object_name))
    }

    pub fn add_import(&mut self, import: Import) -> PackageIndex {
        self.imports.push(import);
        PackageIndex::from_import(self.imports.len() - 1)
    }

    pub fn add_export(&mut self, export: Export) -> PackageIndex {
        self.exports.push(export);
        PackageIndex::from_export(self.exports.len() - 1)
    }

    /// Find an import matching all four identifying fields. Names compare
    /// case-insensitively, the way the engine compares names.
    pub fn find_import(
        &self,
        class_package: &str,
        class_name: &str,
        outer_index: PackageIndex,
        object_name: &str,
    ) -> Option<PackageIndex> {
        let matches = |name: FName, expected: &str| {
            name.number == 0
                && self
                    .name_str(name)
                    .is_some_and(|s| s.eq_ignore_ascii_case(expected))
        };
        self.imports
            .iter()
            .position(|import| {
                import.outer_index == outer_index
                    && matches(import.class_package, class_package)
                    && matches(import.class_name, class_name)
                    && matches(import.object_name, object_name)
            })
            .map(PackageIndex::from_import)
    }

    /// Find an import by class package, class and object name, whatever its outer.
    pub fn search_import(
        &self,
        class_package: &str,
        class_name: &str,
        object_name: &str,
    ) -> Option<PackageIndex> {
        let matches = |name: FName, expected: &str| {
            self.name_str(name)
                .is_some_and(|s| name.number == 0 && s.eq_ignore_ascii_case(expected))
        };
        self.imports
            .iter()
            .position(|import| {
                matches(import.class_package, class_package)
                    && matches(import.class_name, class_name)
                    && matches(import.object_name, object_name)
            })
            .map(PackageIndex::from_import)
    }

    /// Return the matching import, appending a new one when none exists.
    pub fn find_or_add_import(
        &mut self,
        class_package: &str,
        class_name: &str,
        outer_index: PackageIndex,
        object_name: &str,
    ) -> PackageIndex {
        if let Some(existing) = self.find_import(class_package, class_name, outer_index, object_name) {
            return existing;
        }
        let import = Import {
            class_package: self.add_name(class_package),
            class_name: self.add_name(class_name),
            outer_index,
            object_name: self.add_name(object_name),
            optional: false,
        };
        self.add_import(import)
    }

    /// Mutable access to a named tagged property of an export.
    pub fn find_property_mut(&mut self, export: PackageIndex, name: &str) -> Option<&mut Property> {
        let names = &self.names;
        let export = export.export_index().and_then(|i| self.exports.get_mut(i))?;
        export
            .data
            .properties_mut()?
            .iter_mut()
            .find(|p| p.name.number == 0 && names.get(p.name.index) == Some(name))
    }
}

impl fmt::Display for PackageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.import_index(), self.export_index()) {
            (Some(i), _) => write!(f, "import[{}]", i),
            (_, Some(e)) => write!(f, "export[{}]", e),
            _ => f.write_str("null"),
        }
    }
}
