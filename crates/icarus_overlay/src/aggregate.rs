//! Collecting overrides and patches across mods.
//!
//! Mods are walked in ascending priority. For every virtual path touched by a mod
//! the aggregation records:
//!
//! - the **override owner**: the highest-priority mod that wholly replaces the file
//! - four ordered **contribution lists**, one per patch kind
//!
//! When a mod overrides a path, every patch accumulated for that path so far is
//! dropped: those patches were written against bytes that no longer exist. Patches
//! declared by the override owner itself, or by later mods, accumulate on top of
//! the override.

use crate::model::{
    ActorPatch, AssetCopyPatch, DataTablePatch, JsonPatch, ModDescriptor, PatchKind, PatchPayload,
};
use crate::source::SourceStore;
use std::collections::HashMap;

/// One mod's patch payload for a path.
#[derive(Debug)]
pub struct Contribution<'a, T> {
    pub mod_id: &'a str,
    pub mod_priority: usize,
    pub payload: &'a T,
}

impl<T> Clone for Contribution<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Contribution<'_, T> {}

/// Everything the enabled mods contribute to one virtual path.
#[derive(Debug, Clone)]
pub struct AggregatedFile<'a> {
    pub path: String,
    pub override_owner: Option<&'a ModDescriptor>,
    pub json: Vec<Contribution<'a, JsonPatch>>,
    pub data_table: Vec<Contribution<'a, DataTablePatch>>,
    pub actor: Vec<Contribution<'a, ActorPatch>>,
    pub asset_copy: Vec<Contribution<'a, AssetCopyPatch>>,
}

impl<'a> AggregatedFile<'a> {
    fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            override_owner: None,
            json: Vec::new(),
            data_table: Vec::new(),
            actor: Vec::new(),
            asset_copy: Vec::new(),
        }
    }

    /// Whether the path carries Json or DataTable patches.
    pub fn has_textual(&self) -> bool {
        !self.json.is_empty() || !self.data_table.is_empty()
    }

    /// Whether the path carries Actor or AssetCopy patches.
    pub fn has_structural(&self) -> bool {
        !self.actor.is_empty() || !self.asset_copy.is_empty()
    }

    pub fn patch_count(&self) -> usize {
        self.json.len() + self.data_table.len() + self.actor.len() + self.asset_copy.len()
    }

    /// Baseline bytes of the override owner, if the path is overridden.
    pub fn override_data(&self) -> Option<&'a [u8]> {
        self.override_owner
            .and_then(|owner| owner.override_data(&self.path))
    }

    fn clear_patches(&mut self) {
        self.json.clear();
        self.data_table.clear();
        self.actor.clear();
        self.asset_copy.clear();
    }

    fn push(&mut self, owner: &'a ModDescriptor, payload: &'a PatchPayload) {
        let mod_id = owner.id.as_str();
        let mod_priority = owner.priority;
        match payload {
            PatchPayload::Json(payload) => self.json.push(Contribution {
                mod_id,
                mod_priority,
                payload,
            }),
            PatchPayload::DataTable(payload) => self.data_table.push(Contribution {
                mod_id,
                mod_priority,
                payload,
            }),
            PatchPayload::Actor(payload) => self.actor.push(Contribution {
                mod_id,
                mod_priority,
                payload,
            }),
            PatchPayload::AssetCopy(payload) => self.asset_copy.push(Contribution {
                mod_id,
                mod_priority,
                payload,
            }),
        }
    }
}

/// Result of aggregating a mod list.
#[derive(Debug, Default)]
pub struct Aggregation<'a> {
    /// Files in first-encountered order.
    files: Vec<AggregatedFile<'a>>,
    index: HashMap<String, usize>,
    /// Patch files that were skipped, and paths that mix patch families.
    pub warnings: Vec<String>,
}

impl<'a> Aggregation<'a> {
    pub fn files(&self) -> &[AggregatedFile<'a>] {
        &self.files
    }

    pub fn get(&self, path: &str) -> Option<&AggregatedFile<'a>> {
        self.index.get(path).map(|&i| &self.files[i])
    }

    pub fn override_owner(&self, path: &str) -> Option<&'a ModDescriptor> {
        self.get(path).and_then(|file| file.override_owner)
    }

    /// Override bytes for `path` from its owner, if any.
    pub fn override_data(&self, path: &str) -> Option<&'a [u8]> {
        self.get(path).and_then(|file| file.override_data())
    }

    /// Paths to run through the textual pipeline.
    pub fn textual_set(&self) -> impl Iterator<Item = &AggregatedFile<'a>> {
        self.files.iter().filter(|file| file.has_textual())
    }

    /// Paths to run through the structural pipeline.
    pub fn structural_set(&self) -> impl Iterator<Item = &AggregatedFile<'a>> {
        self.files.iter().filter(|file| file.has_structural())
    }

    fn file_mut(&mut self, path: &str) -> &mut AggregatedFile<'a> {
        let next = self.files.len();
        let i = *self.index.entry(path.to_string()).or_insert(next);
        if i == next {
            self.files.push(AggregatedFile::new(path));
        }
        &mut self.files[i]
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Builds an [`Aggregation`] from an ordered mod list.
pub struct PatchAggregator<'s> {
    source: &'s dyn SourceStore,
}

impl<'s> PatchAggregator<'s> {
    pub fn new(source: &'s dyn SourceStore) -> Self {
        Self { source }
    }

    /// Aggregate the enabled mods of `mods`.
    ///
    /// Mods are processed in ascending [`ModDescriptor::priority`]; mods with equal
    /// priority keep their list order.
    pub fn aggregate<'a>(&self, mods: &'a [ModDescriptor]) -> Aggregation<'a> {
        let mut enabled: Vec<&'a ModDescriptor> = mods.iter().filter(|m| m.enabled).collect();
        enabled.sort_by_key(|m| m.priority);

        let mut aggregation = Aggregation::default();
        for descriptor in enabled {
            self.add_mod(&mut aggregation, descriptor);
        }

        let mixed: Vec<String> = aggregation
            .files
            .iter()
            .filter(|file| file.has_textual() && file.has_structural())
            .map(|file| file.path.clone())
            .collect();
        for path in mixed {
            aggregation.warn(format!(
                "{} has both data and asset patches; both will be applied independently",
                path
            ));
        }

        tracing::info!(
            mods = mods.len(),
            paths = aggregation.files.len(),
            textual = aggregation.textual_set().count(),
            structural = aggregation.structural_set().count(),
            "Aggregated mod patches"
        );
        aggregation
    }

    fn add_mod<'a>(&self, aggregation: &mut Aggregation<'a>, descriptor: &'a ModDescriptor) {
        for path in descriptor.overrides.keys() {
            let file = aggregation.file_mut(path);
            if file.patch_count() > 0 {
                tracing::debug!(
                    mod_id = %descriptor.id,
                    dropped = file.patch_count(),
                    "Override of {} discards earlier patches",
                    path
                );
            }
            file.override_owner = Some(descriptor);
            file.clear_patches();
        }

        for patch_file in &descriptor.patch_files {
            let target = patch_file.target_path.as_str();
            let overridden = aggregation.override_owner(target).is_some();
            if !overridden && !self.source.has_file(target) {
                aggregation.warn(format!(
                    "Skipping {} patch from mod '{}': target {} does not exist",
                    patch_file.kind(),
                    descriptor.id,
                    target
                ));
                continue;
            }

            aggregation.file_mut(target).push(descriptor, &patch_file.payload);
        }
    }
}

impl PatchKind {
    /// Number of contributions of this kind on a file.
    pub fn count_in(self, file: &AggregatedFile<'_>) -> usize {
        match self {
            PatchKind::Json => file.json.len(),
            PatchKind::DataTable => file.data_table.len(),
            PatchKind::Actor => file.actor.len(),
            PatchKind::AssetCopy => file.asset_copy.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PatchFile;
    use crate::source::MemorySourceStore;

    fn json_patch(target: &str) -> PatchFile {
        PatchFile::new(target, PatchPayload::Json(JsonPatch::default()))
    }

    fn actor_patch(target: &str, component: &str) -> PatchFile {
        PatchFile::new(
            target,
            PatchPayload::Actor(ActorPatch {
                components: vec![component.to_string()],
            }),
        )
    }

    fn store() -> MemorySourceStore {
        MemorySourceStore::new()
            .with_file("Data/A.json", b"{}".to_vec())
            .with_file("Data/B.json", b"{}".to_vec())
            .with_file("BP/Actor.uasset", b"".to_vec())
    }

    #[test]
    fn test_later_override_drops_earlier_patches() {
        let mut m1 = ModDescriptor::new("m1", 1);
        m1.overrides.insert("Data/A.json".to_string(), b"m1".to_vec());
        m1.patch_files.push(json_patch("Data/A.json"));
        let mut m2 = ModDescriptor::new("m2", 2);
        m2.overrides.insert("Data/A.json".to_string(), b"m2".to_vec());

        let store = store();
        let mods = [m2, m1];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);

        let file = aggregation.get("Data/A.json").unwrap();
        assert_eq!(file.override_owner.map(|m| m.id.as_str()), Some("m2"));
        assert_eq!(file.override_data(), Some(&b"m2"[..]));
        assert!(file.json.is_empty());
        assert_eq!(aggregation.textual_set().count(), 0);
    }

    #[test]
    fn test_patches_after_override_accumulate() {
        let mut m1 = ModDescriptor::new("m1", 1);
        m1.patch_files.push(json_patch("Data/A.json"));
        let mut m2 = ModDescriptor::new("m2", 2);
        m2.overrides.insert("Data/A.json".to_string(), b"m2".to_vec());
        m2.patch_files.push(json_patch("Data/A.json"));
        let mut m3 = ModDescriptor::new("m3", 3);
        m3.patch_files.push(json_patch("Data/A.json"));

        let store = store();
        let mods = [m1, m2, m3];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);

        let file = aggregation.get("Data/A.json").unwrap();
        let ids: Vec<&str> = file.json.iter().map(|c| c.mod_id).collect();
        assert_eq!(ids, vec!["m2", "m3"]);
        assert_eq!(file.json[1].mod_priority, 3);
    }

    #[test]
    fn test_missing_target_skips_only_that_patch() {
        let mut m1 = ModDescriptor::new("m1", 0);
        m1.patch_files.push(json_patch("Data/Missing.json"));
        m1.patch_files.push(json_patch("Data/B.json"));

        let store = store();
        let mods = [m1];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);

        assert!(aggregation.get("Data/Missing.json").is_none());
        assert_eq!(aggregation.get("Data/B.json").unwrap().json.len(), 1);
        assert_eq!(aggregation.warnings.len(), 1);
        assert!(aggregation.warnings[0].contains("Data/Missing.json"));
    }

    #[test]
    fn test_overridden_new_file_can_be_patched() {
        let mut m1 = ModDescriptor::new("m1", 0);
        m1.overrides.insert("Data/New.json".to_string(), b"{}".to_vec());
        let mut m2 = ModDescriptor::new("m2", 1);
        m2.patch_files.push(json_patch("Data/New.json"));

        let store = store();
        let mods = [m1, m2];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);
        assert_eq!(aggregation.get("Data/New.json").unwrap().json.len(), 1);
        assert!(aggregation.warnings.is_empty());
    }

    #[test]
    fn test_disabled_mods_are_ignored() {
        let mut m1 = ModDescriptor::new("m1", 0);
        m1.enabled = false;
        m1.patch_files.push(json_patch("Data/A.json"));

        let store = store();
        let mods = [m1];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);
        assert!(aggregation.files().is_empty());
    }

    #[test]
    fn test_sets_keep_first_encountered_order() {
        let mut m1 = ModDescriptor::new("m1", 0);
        m1.patch_files.push(json_patch("Data/B.json"));
        m1.patch_files.push(actor_patch("BP/Actor.uasset", "/Game/C.C_C"));
        m1.patch_files.push(json_patch("Data/A.json"));
        let mut m2 = ModDescriptor::new("m2", 1);
        m2.patch_files.push(json_patch("Data/A.json"));
        m2.patch_files.push(actor_patch("BP/Actor.uasset", "/Game/D.D_C"));

        let store = store();
        let mods = [m1, m2];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);

        let textual: Vec<&str> = aggregation.textual_set().map(|f| f.path.as_str()).collect();
        assert_eq!(textual, vec!["Data/B.json", "Data/A.json"]);
        let structural: Vec<&AggregatedFile> = aggregation.structural_set().collect();
        assert_eq!(structural.len(), 1);
        let components: Vec<&str> = structural[0]
            .actor
            .iter()
            .flat_map(|c| c.payload.components.iter().map(String::as_str))
            .collect();
        assert_eq!(components, vec!["/Game/C.C_C", "/Game/D.D_C"]);
        assert_eq!(PatchKind::Actor.count_in(structural[0]), 2);
    }

    #[test]
    fn test_mixed_families_warn() {
        let mut m1 = ModDescriptor::new("m1", 0);
        m1.patch_files.push(json_patch("BP/Actor.uasset"));
        m1.patch_files.push(actor_patch("BP/Actor.uasset", "/Game/C.C_C"));

        let store = store();
        let mods = [m1];
        let aggregation = PatchAggregator::new(&store).aggregate(&mods);
        assert_eq!(aggregation.textual_set().count(), 1);
        assert_eq!(aggregation.structural_set().count(), 1);
        assert_eq!(aggregation.warnings.len(), 1);
    }
}
