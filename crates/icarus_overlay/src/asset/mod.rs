//! Structural asset documents and the codec seam used to (de)serialize them.

pub mod codec;
pub mod document;
pub mod property;

pub use codec::{AssetCodec, MsgpackAssetCodec, SerializedAsset};
pub use document::{
    object_flags, AssetDocument, Export, ExportData, FName, Import, NameMap, PackageIndex,
};
pub use property::{property_flags, FieldProperty, Property, PropertyValue};
