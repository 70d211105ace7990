use std::collections::BTreeMap;
use std::io::{Cursor, Read};

use camino::Utf8Path;
use icarus_overlay::utils::mounted_path;
use icarus_overlay::{ArchiveFormat, BundledArchive, ModDescriptor, PatchFile};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::metadata::{ModInfo, MOD_INFO_PATH};

/// A mod package loaded into memory.
#[derive(Debug, Clone)]
pub struct ModPackage {
    /// File name of the package on disk.
    pub file_name: String,
    pub info: ModInfo,
    /// Bundled archives in package order.
    pub archives: Vec<BundledArchive>,
    /// Patch files in package order.
    pub patch_files: Vec<PatchFile>,
    /// Whole-file overrides read from the bundled archives, keyed by virtual path.
    pub overrides: BTreeMap<String, Vec<u8>>,
    /// Problems that did not prevent the package from loading.
    pub warnings: Vec<String>,
}

impl ModPackage {
    /// Load a mod package from disk.
    ///
    /// `format` decodes bundled archives to find the files they override.
    pub fn load(path: &Utf8Path, format: &dyn ArchiveFormat) -> Result<Self> {
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::InvalidPath(path.to_string()))?;
        let bytes = std::fs::read(path.as_std_path())?;
        Self::from_bytes(file_name, bytes, format)
    }

    /// Load a mod package from its file name and contents.
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>, format: &dyn ArchiveFormat) -> Result<Self> {
        let name = Utf8Path::new(file_name);
        let stem = name.file_stem().unwrap_or(file_name);

        let mut package = match name.extension().map(str::to_ascii_lowercase).as_deref() {
            Some("pak") => Self {
                file_name: file_name.to_string(),
                info: ModInfo::raw_pak(file_name, stem),
                archives: vec![BundledArchive {
                    name: file_name.to_string(),
                    data: bytes,
                }],
                patch_files: Vec::new(),
                overrides: BTreeMap::new(),
                warnings: Vec::new(),
            },
            Some("zip") => Self::read_zip(file_name, stem, bytes)?,
            _ => {
                return Err(Error::UnsupportedPackage {
                    file_name: file_name.to_string(),
                })
            }
        };

        package.index_overrides(format);

        tracing::info!(
            id = %package.info.id,
            archives = package.archives.len(),
            patches = package.patch_files.len(),
            overrides = package.overrides.len(),
            "Loaded mod {}",
            file_name
        );
        Ok(package)
    }

    fn read_zip(file_name: &str, fallback_id: &str, bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut warnings = Vec::new();

        let info = match archive.by_name(MOD_INFO_PATH) {
            Ok(mut entry) => {
                let mut text = String::new();
                let parsed = entry
                    .read_to_string(&mut text)
                    .map_err(icarus_overlay::Error::from)
                    .and_then(|_| ModInfo::parse(&text, fallback_id));
                match parsed {
                    Ok(info) => info,
                    Err(e) => {
                        warn(
                            &mut warnings,
                            format!(
                                "Could not read {} from {}. This mod will be missing meta information. {}",
                                MOD_INFO_PATH, file_name, e
                            ),
                        );
                        ModInfo::fallback(fallback_id)
                    }
                }
            }
            Err(zip::result::ZipError::FileNotFound) => ModInfo::fallback(fallback_id),
            Err(e) => return Err(e.into()),
        };

        let mut archives = Vec::new();
        let mut patch_files = Vec::new();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let entry_path = entry.name().replace('\\', "/");
            let entry_name = entry_path
                .rsplit('/')
                .next()
                .unwrap_or(&entry_path)
                .to_string();

            match Utf8Path::new(&entry_name).extension() {
                Some("patch") => {
                    let mut text = String::new();
                    let parsed = entry
                        .read_to_string(&mut text)
                        .map_err(icarus_overlay::Error::from)
                        .and_then(|_| PatchFile::parse(&text));
                    match parsed {
                        Ok(patch) => patch_files.push(patch),
                        Err(e) => warn(
                            &mut warnings,
                            format!("Skipping patch file {} in {}: {}", entry_path, file_name, e),
                        ),
                    }
                }
                Some("pak") => {
                    let mut data = Vec::with_capacity(entry.size() as usize);
                    entry.read_to_end(&mut data)?;
                    archives.push(BundledArchive {
                        name: entry_name,
                        data,
                    });
                }
                _ => {}
            }
        }

        Ok(Self {
            file_name: file_name.to_string(),
            info,
            archives,
            patch_files,
            overrides: BTreeMap::new(),
            warnings,
        })
    }

    /// Collect the files the bundled archives provide. When two archives hold the
    /// same path, the first one wins.
    fn index_overrides(&mut self, format: &dyn ArchiveFormat) {
        for archive in &self.archives {
            let read = format.read_entries(&archive.data).and_then(|entries| {
                let mount_point = format.read_mount_point(&archive.data)?;
                Ok((mount_point, entries))
            });
            let (mount_point, entries) = match read {
                Ok(read) => read,
                Err(e) => {
                    let message = format!(
                        "Could not read bundled archive {} in {}. Its files cannot be patched. {}",
                        archive.name, self.file_name, e
                    );
                    warn(&mut self.warnings, message);
                    continue;
                }
            };

            for (entry, data) in entries {
                self.overrides
                    .entry(mounted_path(&mount_point, &entry))
                    .or_insert(data);
            }
        }
    }

    /// Convert into the form the overlay builder consumes.
    pub fn into_descriptor(self, priority: usize, enabled: bool) -> ModDescriptor {
        ModDescriptor {
            id: self.info.id,
            enabled,
            priority,
            overrides: self.overrides,
            archives: self.archives,
            patch_files: self.patch_files,
        }
    }
}

fn warn(warnings: &mut Vec<String>, message: String) {
    tracing::warn!("{}", message);
    warnings.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{RAW_PAK_AUTHOR, RAW_PAK_DESCRIPTION};
    use icarus_overlay::{OverlayArchive, PatchKind, ZipArchiveFormat};
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const PATCH: &str = r#"{
        "schema_version": 1,
        "target": "Icarus/Content/Data/Config.json",
        "type": "Json",
        "data": { "patches": [[ { "op": "add", "path": "/b", "value": 2 } ]] }
    }"#;

    fn bundled_pak(mount_point: &str, entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut archive = OverlayArchive::new("bundled", mount_point);
        for (path, data) in entries {
            archive.add_entry(*path, data.to_vec());
        }
        let mut bytes = Vec::new();
        ZipArchiveFormat.write(&archive, &mut bytes).unwrap();
        bytes
    }

    fn package(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_load_zip_package() {
        let pak = bundled_pak("../../../", &[("Icarus/Content/Data/Config.json", b"{}")]);
        let bytes = package(&[
            ("mod.info", br#"{"schema_version": 1, "id": "cfg", "name": "Config"}"#),
            ("patches/config.patch", PATCH.as_bytes()),
            ("Config_P.pak", &pak),
            ("readme.txt", b"ignored"),
        ]);

        let package = ModPackage::from_bytes("Config.zip", bytes, &ZipArchiveFormat).unwrap();
        assert_eq!(package.info.id, "cfg");
        assert_eq!(package.info.name, "Config");
        assert_eq!(package.patch_files.len(), 1);
        assert_eq!(package.patch_files[0].kind(), PatchKind::Json);
        assert_eq!(package.archives.len(), 1);
        assert_eq!(package.archives[0].name, "Config_P.pak");
        assert_eq!(
            package.overrides.get("Icarus/Content/Data/Config.json"),
            Some(&b"{}".to_vec())
        );
        assert!(package.warnings.is_empty());
    }

    #[test]
    fn test_bad_metadata_and_patch_are_skipped() {
        let bytes = package(&[
            ("mod.info", br#"{"id": "no-version"}"#),
            ("broken.patch", b"{"),
            ("good.patch", PATCH.as_bytes()),
        ]);

        let package = ModPackage::from_bytes("MyMod.zip", bytes, &ZipArchiveFormat).unwrap();
        assert_eq!(package.info, ModInfo::fallback("MyMod"));
        assert_eq!(package.patch_files.len(), 1);
        assert_eq!(package.warnings.len(), 2);
    }

    #[test]
    fn test_missing_metadata_uses_file_stem() {
        let bytes = package(&[("good.patch", PATCH.as_bytes())]);
        let package = ModPackage::from_bytes("MyMod.zip", bytes, &ZipArchiveFormat).unwrap();
        assert_eq!(package.info, ModInfo::fallback("MyMod"));
        assert!(package.warnings.is_empty());
    }

    #[test]
    fn test_first_archive_wins_overrides() {
        let first = bundled_pak("../../../Icarus/Content/", &[("Data/A.json", b"first")]);
        let second = bundled_pak("../../../", &[("Icarus/Content/Data/A.json", b"second")]);
        let bytes = package(&[("A_P.pak", &first), ("B_P.pak", &second)]);

        let package = ModPackage::from_bytes("Two.zip", bytes, &ZipArchiveFormat).unwrap();
        assert_eq!(
            package.overrides.get("Icarus/Content/Data/A.json"),
            Some(&b"first".to_vec())
        );
    }

    #[test]
    fn test_raw_pak_mod() {
        let pak = bundled_pak("../../../", &[("Icarus/Content/Data/A.json", b"{}")]);
        let package = ModPackage::from_bytes("Weapons_P.pak", pak, &ZipArchiveFormat).unwrap();

        assert_eq!(package.info.id, "Weapons_P");
        assert_eq!(package.info.name, "Weapons_P.pak");
        assert_eq!(package.info.author.as_deref(), Some(RAW_PAK_AUTHOR));
        assert_eq!(package.info.description.as_deref(), Some(RAW_PAK_DESCRIPTION));
        assert_eq!(package.archives.len(), 1);
        assert!(package.overrides.contains_key("Icarus/Content/Data/A.json"));
    }

    #[test]
    fn test_unreadable_bundled_archive_still_passes_through() {
        let package = ModPackage::from_bytes("Opaque.pak", b"not zip".to_vec(), &ZipArchiveFormat)
            .unwrap();
        assert_eq!(package.archives.len(), 1);
        assert!(package.overrides.is_empty());
        assert_eq!(package.warnings.len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(matches!(
            ModPackage::from_bytes("mod.rar", vec![], &ZipArchiveFormat),
            Err(Error::UnsupportedPackage { .. })
        ));
    }

    #[test]
    fn test_into_descriptor() {
        let bytes = package(&[("good.patch", PATCH.as_bytes())]);
        let descriptor = ModPackage::from_bytes("MyMod.zip", bytes, &ZipArchiveFormat)
            .unwrap()
            .into_descriptor(3, false);
        assert_eq!(descriptor.id, "MyMod");
        assert_eq!(descriptor.priority, 3);
        assert!(!descriptor.enabled);
        assert_eq!(descriptor.patch_files.len(), 1);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("Disk.zip")).unwrap();
        std::fs::write(&path, package(&[("good.patch", PATCH.as_bytes())])).unwrap();

        let package = ModPackage::load(&path, &ZipArchiveFormat).unwrap();
        assert_eq!(package.file_name, "Disk.zip");
        assert_eq!(package.patch_files.len(), 1);
    }
}
