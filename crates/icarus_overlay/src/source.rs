//! Read-only access to stock game files.
//!
//! The builder never touches the game installation directly: everything it reads
//! goes through a [`SourceStore`], addressed by virtual path
//! (`Icarus/Content/Data/...`). The crate ships [`DirSourceStore`] for an extracted
//! game tree on disk and [`MemorySourceStore`] for callers that already hold the
//! files in memory.

use crate::error::Result;
use crate::utils::{change_extension, normalize_virtual_path};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashMap};
use walkdir::WalkDir;

/// A cooked asset and its companion files.
#[derive(Debug, Clone, Default)]
pub struct FullAsset {
    /// Main blob (`.uasset`).
    pub main: Vec<u8>,
    pub exports_path: String,
    /// Export bodies (`.uexp`).
    pub exports: Vec<u8>,
    pub bulk_path: Option<String>,
    /// Bulk data (`.ubulk`), when the asset has any.
    pub bulk: Option<Vec<u8>>,
}

/// Read-only game data, addressed by virtual path.
///
/// Lookups are case-insensitive. A file that does not exist is `Ok(None)`; errors
/// are reserved for storage failures.
pub trait SourceStore: Send {
    fn has_file(&self, path: &str) -> bool;

    fn read_data(&self, path: &str) -> Result<Option<Vec<u8>>>;

    /// Read `path` together with its `.uexp` and, if present, `.ubulk` siblings.
    ///
    /// Returns `None` unless both the main and exports files exist.
    fn read_full_asset(&self, path: &str) -> Result<Option<FullAsset>> {
        let Some(main) = self.read_data(path)? else {
            return Ok(None);
        };
        let exports_path = change_extension(path, "uexp");
        let Some(exports) = self.read_data(&exports_path)? else {
            return Ok(None);
        };
        let bulk_path = change_extension(path, "ubulk");
        let bulk = self.read_data(&bulk_path)?;

        Ok(Some(FullAsset {
            main,
            exports_path,
            exports,
            bulk_path: bulk.as_ref().map(|_| bulk_path),
            bulk,
        }))
    }
}

fn lookup_key(path: &str) -> String {
    normalize_virtual_path(path)
        .trim_start_matches('/')
        .to_ascii_lowercase()
}

/// Source store over an extracted game data tree.
///
/// The tree is scanned once on construction; the virtual path of a file is its
/// path relative to the root.
pub struct DirSourceStore {
    root: Utf8PathBuf,
    /// Lowercased virtual path -> file on disk.
    files: HashMap<String, Utf8PathBuf>,
}

impl DirSourceStore {
    pub fn build(root: &Utf8Path) -> Result<Self> {
        tracing::info!("Indexing game files under {}", root);

        let mut files = HashMap::new();
        for entry in WalkDir::new(root.as_std_path()) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                tracing::warn!("Skipping non UTF-8 path {}", entry.path().display());
                continue;
            };
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            files.insert(lookup_key(relative.as_str()), path.to_path_buf());
        }

        tracing::info!("Indexed {} game files", files.len());
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceStore for DirSourceStore {
    fn has_file(&self, path: &str) -> bool {
        self.files.contains_key(&lookup_key(path))
    }

    fn read_data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        match self.files.get(&lookup_key(path)) {
            Some(file) => Ok(Some(std::fs::read(file.as_std_path())?)),
            None => Ok(None),
        }
    }
}

/// Source store backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, data: impl Into<Vec<u8>>) {
        self.files.insert(lookup_key(path), data.into());
    }

    pub fn with_file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.insert(path, data);
        self
    }
}

impl SourceStore for MemorySourceStore {
    fn has_file(&self, path: &str) -> bool {
        self.files.contains_key(&lookup_key(path))
    }

    fn read_data(&self, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.get(&lookup_key(path)).cloned())
    }
}
