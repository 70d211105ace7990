//! Tagged property values and class property descriptors.

use super::document::{FName, PackageIndex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Property flags (`EPropertyFlags`) used by the integrators.
pub mod property_flags {
    pub const BLUEPRINT_VISIBLE: u64 = 0x0000_0000_0000_0004;
    pub const INSTANCED_REFERENCE: u64 = 0x0000_0000_0008_0000;
    pub const NON_TRANSACTIONAL: u64 = 0x0000_0004_0000_0000;
}

/// A named tagged property of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: FName,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: FName, value: PropertyValue) -> Self {
        Self { name, value }
    }
}

/// Value of a tagged property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Str(String),
    Name(FName),
    Object(PackageIndex),
    Guid(Uuid),
    Struct {
        struct_type: FName,
        fields: Vec<Property>,
    },
    Array {
        element_type: FName,
        elements: Vec<PropertyValue>,
    },
}

/// Descriptor of a property declared by a class export (`FObjectProperty`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProperty {
    pub serialized_type: FName,
    pub name: FName,
    pub flags: u32,
    pub array_dim: i32,
    pub element_size: i32,
    pub property_flags: u64,
    pub rep_index: u16,
    pub rep_notify_func: FName,
    pub replication_condition: u8,
    pub property_class: PackageIndex,
}
