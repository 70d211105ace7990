#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use icarus_overlay::asset::{
    object_flags, AssetCodec, AssetDocument, Export, ExportData, FName, MsgpackAssetCodec,
    PackageIndex, Property, PropertyValue,
};
use icarus_overlay::{ArchiveFormat, PatchFile, ZipArchiveFormat};
use std::collections::HashMap;
use tempfile::TempDir;

pub const ACTOR_PATH: &str = "Icarus/Content/BP/Objects/BP_Crate.uasset";
pub const ITEMS_PATH: &str = "Icarus/Content/Data/Items/D_Items.json";
pub const CONFIG_PATH: &str = "Icarus/Content/Data/Config.json";

pub const ITEMS_JSON: &str = r#"{
    "RowStruct": "/Script/Icarus.ItemData",
    "Defaults": { "Weight": 1 },
    "Rows": [
        { "Name": "Stick", "Weight": 2 },
        { "Name": "Stone", "Weight": 5 }
    ]
}"#;

pub const CONFIG_JSON: &str = "{ \"a\": 1 }\n";

/// Layout of a test run: an extracted game tree and an output directory.
pub struct TestEnv {
    _tmp: TempDir,
    pub game_root: Utf8PathBuf,
    pub output_dir: Utf8PathBuf,
}

/// Route library logs to the test harness. Set `RUST_LOG` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a game tree holding a data table, a plain json file and a blueprint actor.
pub fn setup_test_env() -> TestEnv {
    init_tracing();
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();

    let game_root = root.join("game");
    let output_dir = root.join("Mods");
    std::fs::create_dir_all(&game_root).unwrap();

    write_file(&game_root, ITEMS_PATH, ITEMS_JSON.as_bytes());
    write_file(&game_root, CONFIG_PATH, CONFIG_JSON.as_bytes());
    write_asset(&game_root, ACTOR_PATH, &actor_document("/Game/BP/Objects/BP_Crate"));

    TestEnv {
        _tmp: tmp,
        game_root,
        output_dir,
    }
}

pub fn write_file(root: &Utf8Path, rel: &str, data: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
}

/// Serialize a document into `<rel>` and its `.uexp` sibling.
pub fn write_asset(root: &Utf8Path, rel: &str, document: &AssetDocument) {
    let (main, exports) = encode_asset(document);
    write_file(root, rel, &main);
    write_file(root, &rel.replace(".uasset", ".uexp"), &exports);
}

pub fn encode_asset(document: &AssetDocument) -> (Vec<u8>, Vec<u8>) {
    let serialized = MsgpackAssetCodec.write(document).unwrap();
    let (main, exports) = serialized.split().unwrap();
    (main.to_vec(), exports.to_vec())
}

fn export(class_index: PackageIndex, name: FName, flags: u32, data: ExportData) -> Export {
    Export {
        class_index,
        super_index: PackageIndex::NULL,
        template_index: PackageIndex::NULL,
        outer_index: PackageIndex::NULL,
        object_name: name,
        object_flags: flags,
        serialization_before_serialization: vec![],
        create_before_serialization: vec![],
        serialization_before_create: vec![],
        create_before_create: vec![],
        extras: vec![],
        data,
    }
}

/// A minimal cooked blueprint actor: generated class, class default object and a
/// construction script without nodes.
pub fn actor_document(package_path: &str) -> AssetDocument {
    let asset_name = package_path.rsplit('/').next().unwrap();
    let mut doc = AssetDocument::default();

    let core = "/Script/CoreUObject";
    let engine = doc.find_or_add_import(core, "Package", PackageIndex::NULL, "/Script/Engine");
    let bp_class = doc.find_or_add_import(core, "Class", engine, "BlueprintGeneratedClass");
    let scs_class = doc.find_or_add_import(core, "Class", engine, "SimpleConstructionScript");
    doc.add_name(package_path);

    let class_name = doc.add_name(&format!("{}_C", asset_name));
    doc.add_export(export(
        bp_class,
        class_name,
        object_flags::PUBLIC,
        ExportData::Class {
            properties: vec![],
            loaded_properties: vec![],
        },
    ));
    let cdo_name = doc.add_name(&format!("Default__{}_C", asset_name));
    doc.add_export(export(
        PackageIndex::from_export(0),
        cdo_name,
        object_flags::PUBLIC | object_flags::CLASS_DEFAULT_OBJECT,
        ExportData::Normal { properties: vec![] },
    ));

    let object = doc.add_name("ObjectProperty");
    let mut arrays = Vec::new();
    for name in ["AllNodes", "RootNodes"] {
        arrays.push(Property::new(
            doc.add_name(name),
            PropertyValue::Array {
                element_type: object,
                elements: vec![],
            },
        ));
    }
    let scs_name = doc.add_name("SimpleConstructionScript");
    doc.add_export(export(
        scs_class,
        scs_name,
        object_flags::PUBLIC,
        ExportData::Normal { properties: arrays },
    ));

    doc
}

/// Entries of an overlay written by the zip archive format.
pub fn read_overlay(path: &Utf8Path) -> Vec<(String, Vec<u8>)> {
    let bytes = std::fs::read(path).unwrap();
    ZipArchiveFormat.read_entries(&bytes).unwrap()
}

pub fn overlay_map(path: &Utf8Path) -> HashMap<String, Vec<u8>> {
    read_overlay(path).into_iter().collect()
}

/// Decode the asset stored under `path` in an overlay's entries.
pub fn decode_asset(entries: &HashMap<String, Vec<u8>>, path: &str) -> AssetDocument {
    let main = &entries[path];
    let exports = &entries[&path.replace(".uasset", ".uexp")];
    MsgpackAssetCodec.read(main, exports).unwrap()
}

pub fn patch(text: &str) -> PatchFile {
    PatchFile::parse(text).unwrap()
}

pub fn node_array(doc: &AssetDocument, name: &str) -> Vec<PropertyValue> {
    let scs = doc
        .exports
        .iter()
        .find(|e| doc.export_class_name(e) == Some("SimpleConstructionScript"))
        .unwrap();
    let property = scs
        .data
        .properties()
        .unwrap()
        .iter()
        .find(|p| doc.name_str(p.name) == Some(name))
        .unwrap();
    match &property.value {
        PropertyValue::Array { elements, .. } => elements.clone(),
        other => panic!("{} is not an array: {:?}", name, other),
    }
}
