//! Loading of Icarus mod packages.
//!
//! Two package layouts are supported:
//!
//! - **Zip packages** (`.zip`): an optional `mod.info` metadata file at the root,
//!   any number of `*.patch` documents and any number of bundled `*.pak` archives.
//! - **Raw pak mods** (`.pak`): a single archive with no metadata.
//!
//! A loaded [`ModPackage`] converts into the [`icarus_overlay::ModDescriptor`] the
//! overlay builder consumes.
//!
//! ```no_run
//! use camino::Utf8Path;
//! use icarus_modpkg::ModPackage;
//! use icarus_overlay::ZipArchiveFormat;
//!
//! # fn main() -> Result<(), icarus_modpkg::Error> {
//! let package = ModPackage::load(Utf8Path::new("mods/BetterCrates.zip"), &ZipArchiveFormat)?;
//! println!("{} by {}", package.info.name, package.info.author.as_deref().unwrap_or("?"));
//! let descriptor = package.into_descriptor(0, true);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod metadata;
mod package;

pub use error::{Error, Result};
pub use metadata::ModInfo;
pub use package::ModPackage;
