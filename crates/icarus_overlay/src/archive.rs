//! Overlay archives and the format seam used to write them.
//!
//! An [`OverlayArchive`] is a named, ordered list of `(virtual path, bytes)` entries
//! plus the mount point the game resolves entry paths against. The builder fills
//! archives in memory and hands them to an [`ArchiveFormat`] for encoding. The
//! crate ships [`ZipArchiveFormat`]; a pak encoder plugs in through the same trait.

use crate::error::Result;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// An archive assembled in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayArchive {
    pub file_name: String,
    pub mount_point: String,
    /// Entries in insertion order. Duplicates are kept.
    pub entries: Vec<(String, Vec<u8>)>,
}

impl OverlayArchive {
    pub fn new(file_name: impl Into<String>, mount_point: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            mount_point: mount_point.into(),
            entries: Vec::new(),
        }
    }

    pub fn add_entry(&mut self, path: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.push((path.into(), data.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last entry stored under `path`.
    pub fn entry(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .map(|(_, data)| data.as_slice())
    }
}

/// Encodes overlay archives and lists the entries of bundled ones.
pub trait ArchiveFormat: Send + Sync {
    /// Entries of an encoded archive, in stored order. Directories are skipped.
    fn read_entries(&self, bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>>;

    /// Mount point recorded in an encoded archive.
    fn read_mount_point(&self, bytes: &[u8]) -> Result<String>;

    fn write(&self, archive: &OverlayArchive, writer: &mut dyn Write) -> Result<()>;
}

/// Zip-backed archive format. The mount point is stored as the archive comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiveFormat;

impl ArchiveFormat for ZipArchiveFormat {
    fn read_entries(&self, bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().replace('\\', "/");
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push((name, data));
        }

        Ok(entries)
    }

    fn read_mount_point(&self, bytes: &[u8]) -> Result<String> {
        let archive = ZipArchive::new(Cursor::new(bytes))?;
        Ok(String::from_utf8_lossy(archive.comment()).into_owned())
    }

    fn write(&self, archive: &OverlayArchive, writer: &mut dyn Write) -> Result<()> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // Zip cannot hold two entries with one name; the last one is the one the
        // game would have mounted.
        let mut last_index = HashMap::with_capacity(archive.entries.len());
        for (i, (path, _)) in archive.entries.iter().enumerate() {
            last_index.insert(path.as_str(), i);
        }

        zip.set_comment(archive.mount_point.clone());
        for (i, (path, data)) in archive.entries.iter().enumerate() {
            if last_index.get(path.as_str()) != Some(&i) {
                tracing::warn!(
                    archive = %archive.file_name,
                    "Entry {} is written more than once, keeping the last copy",
                    path
                );
                continue;
            }
            zip.start_file(path.as_str(), options)?;
            zip.write_all(data)?;
        }

        let bytes = zip.finish()?.into_inner();
        writer.write_all(&bytes)?;

        tracing::debug!(
            archive = %archive.file_name,
            entries = archive.entries.len(),
            bytes = bytes.len(),
            "Wrote zip archive"
        );
        Ok(())
    }
}
