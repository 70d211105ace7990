//! Main overlay builder implementation.
//!
//! The [`OverlayBuilder`] runs the install pipeline:
//!
//! 1. Wipe and recreate the output directory.
//! 2. Aggregate the enabled mods with a [`PatchAggregator`].
//! 3. For every textual path: read the baseline (override owner's bytes, else the
//!    game's), apply Json patches then DataTable patches, and add the result to the
//!    data overlay.
//! 4. For every structural path: read the baseline document, apply Actor patches in
//!    place and write the document back at its own path, then run each AssetCopy
//!    step and write the copy at its new path. All entries go to the asset overlay.
//! 5. Write both overlays, then copy each enabled mod's bundled archives next to them.
//!
//! A failure while integrating one path is recorded in the [`InstallReport`] and the
//! build moves on to the next path. Storage errors abort the build.

use crate::aggregate::{AggregatedFile, Aggregation, PatchAggregator};
use crate::archive::{ArchiveFormat, OverlayArchive, ZipArchiveFormat};
use crate::asset::{AssetCodec, AssetDocument, MsgpackAssetCodec};
use crate::error::{Error, Result};
use crate::integrator::{actor, asset_copy, data_table, json};
use crate::model::{DataTableOperation, JsonOperationList, ModDescriptor};
use crate::source::SourceStore;
use crate::utils::{change_extension, passthrough_archive_name};
use camino::{Utf8Path, Utf8PathBuf};
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::Duration;

/// File name of the overlay holding patched data files.
pub const DATA_OVERLAY_NAME: &str = "998-ModIntegration_Data_P.pak";
/// Entries carry their full virtual path, so the mount point only has to be
/// something the game accepts.
pub const DATA_OVERLAY_MOUNT_POINT: &str = "../../../Icarus/Content/data/";
/// File name of the overlay holding patched assets.
pub const ASSET_OVERLAY_NAME: &str = "999-ModIntegration_Assets_P.pak";
pub const ASSET_OVERLAY_MOUNT_POINT: &str = "../../../";

/// Progress information emitted during an install.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayProgress {
    pub stage: OverlayStage,
    /// Virtual path or archive currently being processed.
    pub current_file: Option<String>,
    /// 1-based index of the current item within the stage.
    pub current: u32,
    pub total: u32,
}

/// Stages of the install pipeline, emitted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OverlayStage {
    Aggregating,
    PatchingData,
    PatchingAssets,
    CopyingArchives,
    Complete,
}

/// A path whose integration failed. Sibling paths are unaffected.
#[derive(Debug)]
pub struct PathFailure {
    pub path: String,
    pub error: Error,
}

/// Summary returned after an install completes.
#[derive(Debug)]
pub struct InstallReport {
    pub output_dir: Utf8PathBuf,
    /// Entry paths written to the data overlay, in order.
    pub data_entries: Vec<String>,
    /// Entry paths written to the asset overlay, in order.
    pub asset_entries: Vec<String>,
    /// Bundled archives copied into the output directory.
    pub passthrough_archives: Vec<Utf8PathBuf>,
    pub failures: Vec<PathFailure>,
    /// Skipped patch files and other non-fatal notes from aggregation.
    pub warnings: Vec<String>,
    pub build_time: Duration,
}

impl InstallReport {
    /// Whether every patched path was integrated.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

type ProgressCallback = Arc<dyn Fn(OverlayProgress) + Send + Sync>;

/// A structural baseline and the virtual path it currently represents.
struct Baseline {
    document: AssetDocument,
    current_path: String,
    exports_path: String,
}

/// Orchestrates the install pipeline.
///
/// Create a builder with [`new`](Self::new), configure it with
/// [`set_mods`](Self::set_mods) and optionally [`with_progress`](Self::with_progress),
/// [`with_archive_format`](Self::with_archive_format) and
/// [`with_asset_codec`](Self::with_asset_codec), then call [`build`](Self::build).
pub struct OverlayBuilder {
    source: Box<dyn SourceStore>,
    output_dir: Utf8PathBuf,
    mods: Vec<ModDescriptor>,
    archive_format: Box<dyn ArchiveFormat>,
    asset_codec: Box<dyn AssetCodec>,
    progress_callback: Option<ProgressCallback>,
}

impl OverlayBuilder {
    /// Create a new overlay builder.
    ///
    /// # Arguments
    ///
    /// * `source` - Stock game files, used as the baseline for patched paths.
    /// * `output_dir` - Directory the overlays are written to. It is wiped and
    ///   recreated on every build.
    pub fn new(source: Box<dyn SourceStore>, output_dir: Utf8PathBuf) -> Self {
        Self {
            source,
            output_dir,
            mods: Vec::new(),
            archive_format: Box::new(ZipArchiveFormat),
            asset_codec: Box::new(MsgpackAssetCodec),
            progress_callback: None,
        }
    }

    /// Register a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(OverlayProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    /// Encoder used for the two overlay archives.
    pub fn with_archive_format(mut self, format: impl ArchiveFormat + 'static) -> Self {
        self.archive_format = Box::new(format);
        self
    }

    /// Codec used to read and write structural assets.
    pub fn with_asset_codec(mut self, codec: impl AssetCodec + 'static) -> Self {
        self.asset_codec = Box::new(codec);
        self
    }

    /// Set the managed mod list. A mod's priority is its position in this list
    /// unless the caller set it otherwise.
    pub fn set_mods(&mut self, mods: Vec<ModDescriptor>) {
        self.mods = mods;
    }

    pub fn mods(&self) -> &[ModDescriptor] {
        &self.mods
    }

    pub fn output_dir(&self) -> &Utf8Path {
        &self.output_dir
    }

    /// Install the enabled mods into the output directory.
    pub fn build(&self) -> Result<InstallReport> {
        let start_time = std::time::Instant::now();

        tracing::info!("Installing mods...");
        tracing::info!("Output dir: {}", self.output_dir);
        tracing::info!(
            "Enabled mods: {}",
            self.mods.iter().filter(|m| m.enabled).count()
        );

        self.emit_progress(OverlayStage::Aggregating, None, 0, 0);

        uninstall(&self.output_dir)?;
        std::fs::create_dir_all(self.output_dir.as_std_path())?;

        let aggregation = PatchAggregator::new(self.source.as_ref()).aggregate(&self.mods);
        let mut failures = Vec::new();

        let data_overlay = self.build_data_overlay(&aggregation, &mut failures)?;
        let asset_overlay = self.build_asset_overlay(&aggregation, &mut failures)?;

        self.write_archive(&data_overlay)?;
        self.write_archive(&asset_overlay)?;

        let passthrough_archives = self.copy_bundled_archives()?;

        self.emit_progress(OverlayStage::Complete, None, 0, 0);

        let build_time = start_time.elapsed();
        tracing::info!(
            data_entries = data_overlay.len(),
            asset_entries = asset_overlay.len(),
            passthrough = passthrough_archives.len(),
            failures = failures.len(),
            "Install finished in {:?}",
            build_time
        );

        Ok(InstallReport {
            output_dir: self.output_dir.clone(),
            data_entries: entry_paths(&data_overlay),
            asset_entries: entry_paths(&asset_overlay),
            passthrough_archives,
            failures,
            warnings: aggregation.warnings,
            build_time,
        })
    }

    /// Remove everything a previous install wrote.
    pub fn uninstall(&self) -> Result<()> {
        uninstall(&self.output_dir)
    }

    fn build_data_overlay(
        &self,
        aggregation: &Aggregation<'_>,
        failures: &mut Vec<PathFailure>,
    ) -> Result<OverlayArchive> {
        let mut archive = OverlayArchive::new(DATA_OVERLAY_NAME, DATA_OVERLAY_MOUNT_POINT);
        let files: Vec<&AggregatedFile> = aggregation.textual_set().collect();

        for (i, file) in files.iter().enumerate() {
            self.emit_progress(
                OverlayStage::PatchingData,
                Some(file.path.clone()),
                i + 1,
                files.len(),
            );

            match self.integrate_textual(file) {
                Ok(data) => archive.add_entry(file.path.as_str(), data),
                Err(e) => record_failure(failures, &file.path, e)?,
            }
        }

        Ok(archive)
    }

    fn build_asset_overlay(
        &self,
        aggregation: &Aggregation<'_>,
        failures: &mut Vec<PathFailure>,
    ) -> Result<OverlayArchive> {
        let mut archive = OverlayArchive::new(ASSET_OVERLAY_NAME, ASSET_OVERLAY_MOUNT_POINT);
        let files: Vec<&AggregatedFile> = aggregation.structural_set().collect();

        for (i, file) in files.iter().enumerate() {
            self.emit_progress(
                OverlayStage::PatchingAssets,
                Some(file.path.clone()),
                i + 1,
                files.len(),
            );

            match self.integrate_structural(aggregation, file) {
                Ok(entries) => archive.entries.extend(entries),
                Err(e) => record_failure(failures, &file.path, e)?,
            }
        }

        Ok(archive)
    }

    fn integrate_textual(&self, file: &AggregatedFile<'_>) -> Result<Vec<u8>> {
        let baseline = match file.override_data() {
            Some(data) => data.to_vec(),
            None => self
                .source
                .read_data(&file.path)?
                .ok_or_else(|| Error::MissingBaseline(file.path.clone()))?,
        };
        let mut text = String::from_utf8(baseline)
            .map_err(|e| Error::Parse(format!("{} is not valid UTF-8: {}", file.path, e)))?;

        let lists: Vec<&JsonOperationList> = file
            .json
            .iter()
            .flat_map(|c| c.payload.patches.iter())
            .collect();
        if !lists.is_empty() {
            text = json::integrate(&text, &lists)?;
        }

        if !file.data_table.is_empty() {
            let operations: Vec<&DataTableOperation> = file
                .data_table
                .iter()
                .flat_map(|c| c.payload.patches.iter())
                .collect();
            text = data_table::integrate(&text, &operations)?;
        }

        tracing::debug!(
            json = lists.len(),
            data_table = file.data_table.len(),
            "Patched {}",
            file.path
        );
        Ok(text.into_bytes())
    }

    /// Integrate one structural path, returning the archive entries it produces.
    fn integrate_structural(
        &self,
        aggregation: &Aggregation<'_>,
        file: &AggregatedFile<'_>,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let path = file.path.as_str();
        let mut entries = Vec::new();

        let mut overridden = match file.override_data() {
            Some(main) => Some(self.load_override(aggregation, path, main)?),
            None => None,
        };
        let mut original = None;

        if !file.actor.is_empty() {
            let components: Vec<&str> = file
                .actor
                .iter()
                .flat_map(|c| c.payload.components.iter().map(String::as_str))
                .collect();

            let baseline = match overridden.as_mut() {
                Some(baseline) => baseline,
                None => ensure_loaded(&mut original, || self.load_original(path))?,
            };
            actor::integrate(&mut baseline.document, &components)?;
            self.write_asset(&baseline.document, path, &baseline.exports_path, &mut entries)?;
        }

        for contribution in &file.asset_copy {
            // A mod's own override never serves as the source of its copy.
            let same_mod = file
                .override_owner
                .is_some_and(|owner| owner.id == contribution.mod_id);
            let baseline = match overridden.as_mut() {
                Some(baseline) if !same_mod => baseline,
                _ => ensure_loaded(&mut original, || self.load_original(path))?,
            };

            let new_path = contribution.payload.new_path.as_str();
            asset_copy::integrate(&mut baseline.document, &baseline.current_path, new_path);
            self.write_asset(
                &baseline.document,
                new_path,
                &change_extension(new_path, "uexp"),
                &mut entries,
            )?;
            baseline.current_path = new_path.to_string();
        }

        Ok(entries)
    }

    fn load_override(
        &self,
        aggregation: &Aggregation<'_>,
        path: &str,
        main: &[u8],
    ) -> Result<Baseline> {
        let exports_path = change_extension(path, "uexp");
        let exports = match aggregation.override_data(&exports_path) {
            Some(data) => data.to_vec(),
            None => self
                .source
                .read_data(&exports_path)?
                .ok_or_else(|| Error::MissingBaseline(exports_path.clone()))?,
        };

        Ok(Baseline {
            document: self.asset_codec.read(main, &exports)?,
            current_path: path.to_string(),
            exports_path,
        })
    }

    fn load_original(&self, path: &str) -> Result<Baseline> {
        let asset = self
            .source
            .read_full_asset(path)?
            .ok_or_else(|| Error::MissingBaseline(path.to_string()))?;

        Ok(Baseline {
            document: self.asset_codec.read(&asset.main, &asset.exports)?,
            current_path: path.to_string(),
            exports_path: asset.exports_path,
        })
    }

    fn write_asset(
        &self,
        document: &AssetDocument,
        path: &str,
        exports_path: &str,
        entries: &mut Vec<(String, Vec<u8>)>,
    ) -> Result<()> {
        let serialized = self.asset_codec.write(document)?;
        let (main, exports) = serialized.split()?;
        entries.push((path.to_string(), main.to_vec()));
        entries.push((exports_path.to_string(), exports.to_vec()));
        Ok(())
    }

    fn write_archive(&self, archive: &OverlayArchive) -> Result<Utf8PathBuf> {
        let path = self.output_dir.join(&archive.file_name);
        tracing::info!("Writing {} ({} entries)", path, archive.len());

        let mut writer = BufWriter::new(std::fs::File::create(path.as_std_path())?);
        self.archive_format.write(archive, &mut writer)?;
        writer.flush()?;
        Ok(path)
    }

    /// Copy every enabled mod's bundled archives, unmodified, in priority order.
    fn copy_bundled_archives(&self) -> Result<Vec<Utf8PathBuf>> {
        let mut enabled: Vec<&ModDescriptor> = self.mods.iter().filter(|m| m.enabled).collect();
        enabled.sort_by_key(|m| m.priority);

        let total: usize = enabled.iter().map(|m| m.archives.len()).sum();
        let mut written = Vec::with_capacity(total);

        for descriptor in enabled {
            for archive in &descriptor.archives {
                let name = passthrough_archive_name(descriptor.priority, &archive.name);
                self.emit_progress(
                    OverlayStage::CopyingArchives,
                    Some(name.clone()),
                    written.len() + 1,
                    total,
                );

                let path = self.output_dir.join(&name);
                tracing::info!("Copying {} from mod '{}' to {}", archive.name, descriptor.id, path);
                std::fs::write(path.as_std_path(), &archive.data)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    fn emit_progress(
        &self,
        stage: OverlayStage,
        current_file: Option<String>,
        current: usize,
        total: usize,
    ) {
        if let Some(callback) = &self.progress_callback {
            callback(OverlayProgress {
                stage,
                current_file,
                current: progress_count(current),
                total: progress_count(total),
            });
        }
    }
}

/// Progress counters saturate instead of wrapping.
fn progress_count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Delete an install's output directory, if present.
pub fn uninstall(output_dir: &Utf8Path) -> Result<()> {
    if output_dir.as_std_path().exists() {
        tracing::info!("Removing {}", output_dir);
        std::fs::remove_dir_all(output_dir.as_std_path())?;
    }
    Ok(())
}

fn record_failure(failures: &mut Vec<PathFailure>, path: &str, error: Error) -> Result<()> {
    if error.is_fatal() {
        return Err(error);
    }
    tracing::error!("Failed to integrate {}: {}", path, error);
    failures.push(PathFailure {
        path: path.to_string(),
        error,
    });
    Ok(())
}

fn ensure_loaded(
    slot: &mut Option<Baseline>,
    load: impl FnOnce() -> Result<Baseline>,
) -> Result<&mut Baseline> {
    let baseline = match slot.take() {
        Some(baseline) => baseline,
        None => load()?,
    };
    Ok(slot.insert(baseline))
}

fn entry_paths(archive: &OverlayArchive) -> Vec<String> {
    archive.entries.iter().map(|(path, _)| path.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JsonPatch, PatchFile, PatchPayload};
    use crate::source::MemorySourceStore;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn output_dir(temp: &TempDir) -> Utf8PathBuf {
        Utf8Path::from_path(temp.path()).unwrap().join("Mods")
    }

    fn json_mod(id: &str, priority: usize, target: &str, ops: serde_json::Value) -> ModDescriptor {
        let mut descriptor = ModDescriptor::new(id, priority);
        descriptor.patch_files.push(PatchFile::new(
            target,
            PatchPayload::Json(JsonPatch {
                patches: vec![serde_json::from_value(ops).unwrap()],
            }),
        ));
        descriptor
    }

    #[test]
    fn test_unreadable_baseline_fails_only_that_path() {
        let temp = TempDir::new().unwrap();
        // Present in the index but not readable as UTF-8 text.
        let source = MemorySourceStore::new()
            .with_file("Data/Good.json", br#"{"a":1}"#.to_vec())
            .with_file("Data/Bad.json", vec![0xff, 0xfe, 0x00]);

        let mut builder = OverlayBuilder::new(Box::new(source), output_dir(&temp));
        builder.set_mods(vec![
            json_mod("m1", 0, "Data/Bad.json", serde_json::json!([])),
            json_mod("m2", 1, "Data/Good.json", serde_json::json!([{ "op": "add", "path": "/b", "value": 2 }])),
        ]);

        let report = builder.build().unwrap();
        assert_eq!(report.data_entries, vec!["Data/Good.json".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, "Data/Bad.json");
        assert!(matches!(report.failures[0].error, Error::Parse(_)));
        assert!(!report.is_success());
    }

    #[test]
    fn test_progress_stages_in_order() {
        let temp = TempDir::new().unwrap();
        let source = MemorySourceStore::new().with_file("Data/A.json", b"{}".to_vec());
        let stages = Arc::new(Mutex::new(Vec::new()));
        let seen = stages.clone();

        let mut builder = OverlayBuilder::new(Box::new(source), output_dir(&temp))
            .with_progress(move |progress| seen.lock().unwrap().push(progress.stage));
        let mut descriptor = json_mod("m1", 0, "Data/A.json", serde_json::json!([]));
        descriptor.archives.push(crate::model::BundledArchive {
            name: "Extra.pak".to_string(),
            data: b"pak".to_vec(),
        });
        builder.set_mods(vec![descriptor]);
        builder.build().unwrap();

        let stages = stages.lock().unwrap().clone();
        assert_eq!(
            stages,
            vec![
                OverlayStage::Aggregating,
                OverlayStage::PatchingData,
                OverlayStage::CopyingArchives,
                OverlayStage::Complete
            ]
        );
    }

    #[test]
    fn test_uninstall_removes_output() {
        let temp = TempDir::new().unwrap();
        let builder = OverlayBuilder::new(Box::new(MemorySourceStore::new()), output_dir(&temp));
        builder.build().unwrap();
        assert!(builder.output_dir().join(DATA_OVERLAY_NAME).exists());
        assert!(builder.output_dir().join(ASSET_OVERLAY_NAME).exists());

        builder.uninstall().unwrap();
        assert!(!builder.output_dir().exists());
        builder.uninstall().unwrap();
    }

    #[test]
    fn test_progress_count_saturates() {
        assert_eq!(progress_count(7), 7);
        assert_eq!(progress_count(u32::MAX as usize), u32::MAX);
        #[cfg(target_pointer_width = "64")]
        assert_eq!(progress_count(u32::MAX as usize + 1), u32::MAX);
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let progress = OverlayProgress {
            stage: OverlayStage::PatchingAssets,
            current_file: Some("a".to_string()),
            current: 1,
            total: 2,
        };
        let value = serde_json::to_value(progress).unwrap();
        assert_eq!(value["stage"], "patchingAssets");
        assert_eq!(value["currentFile"], "a");
    }
}
