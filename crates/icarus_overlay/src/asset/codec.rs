//! Conversion between serialized asset blobs and [`AssetDocument`]s.
//!
//! Cooked assets are stored as a pair of files: the main blob (summary, name map,
//! import and export tables) and the exports blob holding the export bodies. The
//! overlay writer splits a serialized asset at [`SerializedAsset::first_export_offset`]
//! to recreate that pair.

use super::document::{AssetDocument, Export, Import, NameMap};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Reads and writes structural documents.
pub trait AssetCodec: Send + Sync {
    /// Parse a document from its main and exports blobs.
    fn read(&self, main: &[u8], exports: &[u8]) -> Result<AssetDocument>;

    /// Serialize a document into one contiguous buffer.
    fn write(&self, document: &AssetDocument) -> Result<SerializedAsset>;
}

/// A serialized document.
#[derive(Debug, Clone)]
pub struct SerializedAsset {
    pub bytes: Vec<u8>,
    /// Offset in `bytes` where the first export body starts.
    pub first_export_offset: usize,
}

impl SerializedAsset {
    /// Split into the main blob and the exports blob.
    pub fn split(&self) -> Result<(&[u8], &[u8])> {
        if self.first_export_offset > self.bytes.len() {
            return Err(Error::Format(format!(
                "first export offset {} is past the end of a {} byte asset",
                self.first_export_offset,
                self.bytes.len()
            )));
        }
        Ok(self.bytes.split_at(self.first_export_offset))
    }
}

/// `PACKAGE_FILE_TAG`, the magic every main blob starts with.
pub const PACKAGE_FILE_TAG: u32 = 0x9E2A_83C1;

#[derive(Serialize, Deserialize)]
struct PackageSummary {
    tag: u32,
    names: NameMap,
    imports: Vec<Import>,
}

/// Codec storing the tables as msgpack.
///
/// The main blob is the summary (tag, name map, imports) and the exports blob is the
/// export table.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgpackAssetCodec;

impl AssetCodec for MsgpackAssetCodec {
    fn read(&self, main: &[u8], exports: &[u8]) -> Result<AssetDocument> {
        let summary: PackageSummary = rmp_serde::from_slice(main)?;
        if summary.tag != PACKAGE_FILE_TAG {
            return Err(Error::Format(format!(
                "bad package file tag {:#010x}",
                summary.tag
            )));
        }
        let exports: Vec<Export> = rmp_serde::from_slice(exports)?;

        Ok(AssetDocument {
            names: summary.names,
            imports: summary.imports,
            exports,
        })
    }

    fn write(&self, document: &AssetDocument) -> Result<SerializedAsset> {
        let summary = PackageSummary {
            tag: PACKAGE_FILE_TAG,
            names: document.names.clone(),
            imports: document.imports.clone(),
        };
        let mut bytes = rmp_serde::to_vec_named(&summary)?;
        let first_export_offset = bytes.len();
        bytes.extend(rmp_serde::to_vec_named(&document.exports)?);

        Ok(SerializedAsset {
            bytes,
            first_export_offset,
        })
    }
}
