//! Mod integration overlay builder for Icarus.
//!
//! This crate merges an ordered list of mods into overlay archives the game loads
//! on top of its own data, without modifying the game files. It supports:
//!
//! - **Whole-file overrides**: the highest-priority mod overriding a path wins
//! - **JSON patches**: RFC 6902 operation lists applied to data files
//! - **Data table patches**: add, remove and alter rows by name
//! - **Actor patches**: append components to cooked blueprint actors
//! - **Asset copies**: duplicate an asset under a new path, rewriting its self references
//!
//! # Example
//!
//! ```no_run
//! use camino::{Utf8Path, Utf8PathBuf};
//! use icarus_overlay::{DirSourceStore, ModDescriptor, OverlayBuilder, PatchFile};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = DirSourceStore::build(Utf8Path::new("C:/Icarus/Extracted"))?;
//! let output_dir = Utf8PathBuf::from("C:/Steam/steamapps/common/Icarus/Icarus/Content/Paks/Mods");
//!
//! let mut mod_a = ModDescriptor::new("my-mod", 0);
//! mod_a.patch_files.push(PatchFile::parse(&std::fs::read_to_string("items.patch")?)?);
//!
//! let mut builder = OverlayBuilder::new(Box::new(source), output_dir).with_progress(|progress| {
//!     println!("Stage: {:?}, Progress: {}/{}",
//!         progress.stage, progress.current, progress.total);
//! });
//! builder.set_mods(vec![mod_a]);
//!
//! let report = builder.build()?;
//! println!("Patched {} data files and {} assets",
//!     report.data_entries.len(), report.asset_entries.len());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod archive;
pub mod asset;
pub mod builder;
pub mod error;
pub mod integrator;
pub mod model;
pub mod source;
pub mod utils;

// Re-export main types
pub use aggregate::{AggregatedFile, Aggregation, Contribution, PatchAggregator};
pub use archive::{ArchiveFormat, OverlayArchive, ZipArchiveFormat};
pub use asset::{AssetCodec, AssetDocument, MsgpackAssetCodec, SerializedAsset};
pub use builder::{
    uninstall, InstallReport, OverlayBuilder, OverlayProgress, OverlayStage, PathFailure,
    ASSET_OVERLAY_MOUNT_POINT, ASSET_OVERLAY_NAME, DATA_OVERLAY_MOUNT_POINT, DATA_OVERLAY_NAME,
};
pub use error::{Error, Result};
pub use model::{
    ActorPatch, AssetCopyPatch, BundledArchive, DataTableOpKind, DataTableOperation,
    DataTablePatch, JsonPatch, ModDescriptor, PatchFile, PatchKind, PatchPayload,
};
pub use source::{DirSourceStore, FullAsset, MemorySourceStore, SourceStore};
