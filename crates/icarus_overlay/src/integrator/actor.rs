//! Adding components to cooked actor blueprints.
//!
//! A blueprint actor lists its components as `SCS_Node` exports owned by its
//! `SimpleConstructionScript`. Adding a component means appending, per component:
//!
//! - three imports: the component's package, its generated class and its default object
//! - a `<Name>_GEN_VARIABLE` template export owned by the generated class
//! - an `SCS_Node` export owned by the construction script that points at the template
//!
//! and then wiring the new exports into the class, the construction script and the
//! class default object. Existing records are only ever appended to, never moved.

use crate::asset::{
    object_flags, property_flags, AssetDocument, Export, ExportData, FName, FieldProperty,
    PackageIndex, Property, PropertyValue,
};
use crate::error::{Error, Result};
use uuid::Uuid;

const SCS_CLASS: &str = "SimpleConstructionScript";
const GENERATED_CLASS: &str = "BlueprintGeneratedClass";
const SCS_NODE: &str = "SCS_Node";
const SCS_NODE_ARRAYS: [&str; 2] = ["AllNodes", "RootNodes"];

const CORE_UOBJECT: &str = "/Script/CoreUObject";
const ENGINE: &str = "/Script/Engine";

/// Add every component reference, in order, to an actor document.
///
/// References have the form `<assetPath>.<ClassName>_C` (for example
/// `/Game/Mods/MyComponent.MyComponent_C`). A reference without a `.` uses the
/// last path segment as the class name.
pub fn integrate<S: AsRef<str>>(document: &mut AssetDocument, components: &[S]) -> Result<()> {
    if components.is_empty() {
        return Err(Error::InvalidInput(
            "actor patch must add at least one component".to_string(),
        ));
    }

    // Nothing is appended until the anchors and every reference have been checked.
    let mut anchors = Anchors::scan(document)?;
    let components = components
        .iter()
        .map(|reference| ComponentRef::parse(reference.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let scs_node = ScsNodeImports::resolve(document);

    for component in &components {
        add_component(document, &mut anchors, scs_node, component)?;
        tracing::debug!(
            class = %component.class_name,
            path = %component.package_path,
            "Added actor component"
        );
    }

    Ok(())
}

/// Exports every added component hooks into.
#[derive(Debug, Clone, Copy)]
struct Anchors {
    construction_script: PackageIndex,
    generated_class: PackageIndex,
    default_object: PackageIndex,
    /// `SCS_Node` exports seen so far, including ones added by this call.
    node_count: u32,
}

impl Anchors {
    fn scan(document: &AssetDocument) -> Result<Self> {
        let mut construction_script = None;
        let mut generated_class = None;
        let mut default_object = None;
        let mut node_count = 0;

        for (i, export) in document.exports.iter().enumerate() {
            if export.data.is_raw() {
                continue;
            }
            match document.export_class_name(export) {
                Some(SCS_CLASS) => construction_script = Some(PackageIndex::from_export(i)),
                Some(GENERATED_CLASS) => generated_class = Some(PackageIndex::from_export(i)),
                Some(SCS_NODE) => node_count += 1,
                _ => {}
            }
            if export.has_flag(object_flags::CLASS_DEFAULT_OBJECT) {
                default_object = Some(PackageIndex::from_export(i));
            }
        }

        let generated_class = generated_class
            .ok_or_else(|| Error::Format(format!("Unable to find {}", GENERATED_CLASS)))?;
        let has_property_list = document
            .export(generated_class)
            .is_some_and(|export| matches!(export.data, ExportData::Class { .. }));
        if !has_property_list {
            return Err(Error::Format(format!(
                "{} export has no property list",
                GENERATED_CLASS
            )));
        }

        Ok(Self {
            construction_script: construction_script
                .ok_or_else(|| Error::Format(format!("Unable to find {}", SCS_CLASS)))?,
            generated_class,
            default_object: default_object
                .ok_or_else(|| Error::Format("Unable to find class default object".to_string()))?,
            node_count,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct ScsNodeImports {
    class: PackageIndex,
    default_object: PackageIndex,
}

impl ScsNodeImports {
    fn resolve(document: &mut AssetDocument) -> Self {
        let class = document
            .search_import(CORE_UOBJECT, "Class", SCS_NODE)
            .unwrap_or_else(|| {
                let engine = engine_package(document);
                document.find_or_add_import(CORE_UOBJECT, "Class", engine, SCS_NODE)
            });
        let default_name = format!("Default__{}", SCS_NODE);
        let default_object = document
            .search_import(ENGINE, SCS_NODE, &default_name)
            .unwrap_or_else(|| {
                let engine = engine_package(document);
                document.find_or_add_import(ENGINE, SCS_NODE, engine, &default_name)
            });
        Self {
            class,
            default_object,
        }
    }
}

fn engine_package(document: &mut AssetDocument) -> PackageIndex {
    document.find_or_add_import(CORE_UOBJECT, "Package", PackageIndex::NULL, ENGINE)
}

/// A parsed `<assetPath>.<ClassName>` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComponentRef {
    package_path: String,
    /// Class name without the `_C` suffix.
    class_name: String,
}

impl ComponentRef {
    fn parse(reference: &str) -> Result<Self> {
        let (package_path, class_name) = match reference.split_once('.') {
            Some((path, class)) => {
                let class = class.split('.').next().unwrap_or(class);
                (path, class.strip_suffix("_C").unwrap_or(class))
            }
            None => {
                let file_name = reference.rsplit(['/', '\\']).next().unwrap_or(reference);
                (reference, file_name)
            }
        };

        if package_path.is_empty() || class_name.is_empty() {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a valid component reference",
                reference
            )));
        }

        Ok(Self {
            package_path: package_path.to_string(),
            class_name: class_name.to_string(),
        })
    }
}

fn add_component(
    document: &mut AssetDocument,
    anchors: &mut Anchors,
    scs_node: ScsNodeImports,
    component: &ComponentRef,
) -> Result<()> {
    let generated_class_name = format!("{}_C", component.class_name);

    let package = document.find_or_add_import(
        CORE_UOBJECT,
        "Package",
        PackageIndex::NULL,
        &component.package_path,
    );
    let class = document.find_or_add_import(ENGINE, GENERATED_CLASS, package, &generated_class_name);
    let default_object = document.find_or_add_import(
        &component.package_path,
        &generated_class_name,
        package,
        &format!("Default__{}", generated_class_name),
    );

    // Member template, owned by the generated class.
    let template_name = document.add_name(&format!("{}_GEN_VARIABLE", component.class_name));
    let template = document.add_export(Export {
        class_index: class,
        super_index: PackageIndex::NULL,
        template_index: default_object,
        outer_index: anchors.generated_class,
        object_name: template_name,
        object_flags: object_flags::PUBLIC
            | object_flags::TRANSACTIONAL
            | object_flags::ARCHETYPE_OBJECT,
        serialization_before_serialization: vec![anchors.generated_class],
        create_before_serialization: vec![],
        serialization_before_create: vec![class, default_object],
        create_before_create: vec![anchors.generated_class],
        extras: vec![0; 4],
        data: ExportData::Normal { properties: vec![] },
    });
    anchor_mut(document, anchors.default_object)?
        .serialization_before_serialization
        .push(template);

    // Construction node, owned by the construction script.
    anchors.node_count += 1;
    let node_name = FName::with_number(document.names.add(SCS_NODE), anchors.node_count);
    let properties = vec![
        Property::new(document.add_name("ComponentClass"), PropertyValue::Object(class)),
        Property::new(document.add_name("ComponentTemplate"), PropertyValue::Object(template)),
        Property::new(
            document.add_name("VariableGuid"),
            PropertyValue::Struct {
                struct_type: document.add_name("Guid"),
                fields: vec![Property::new(
                    document.add_name("VariableGuid"),
                    PropertyValue::Guid(Uuid::new_v4()),
                )],
            },
        ),
        Property::new(
            document.add_name("InternalVariableName"),
            PropertyValue::Name(document.add_name(&component.class_name)),
        ),
    ];
    let node = document.add_export(Export {
        class_index: scs_node.class,
        super_index: PackageIndex::NULL,
        template_index: scs_node.default_object,
        outer_index: anchors.construction_script,
        object_name: node_name,
        object_flags: object_flags::PUBLIC | object_flags::TRANSACTIONAL,
        serialization_before_serialization: vec![],
        create_before_serialization: vec![class, template],
        serialization_before_create: vec![scs_node.class, scs_node.default_object],
        create_before_create: vec![anchors.construction_script],
        extras: vec![0; 4],
        data: ExportData::Normal { properties },
    });

    // New member slot on the generated class.
    let field = FieldProperty {
        serialized_type: document.add_name("ObjectProperty"),
        name: document.add_name(&component.class_name),
        flags: object_flags::PUBLIC | object_flags::LOAD_COMPLETED,
        array_dim: 1,
        element_size: 8,
        property_flags: property_flags::BLUEPRINT_VISIBLE
            | property_flags::INSTANCED_REFERENCE
            | property_flags::NON_TRANSACTIONAL,
        rep_index: 0,
        rep_notify_func: document.add_name("None"),
        replication_condition: 0,
        property_class: class,
    };
    match &mut anchor_mut(document, anchors.generated_class)?.data {
        ExportData::Class {
            loaded_properties, ..
        } => loaded_properties.push(field),
        _ => {
            return Err(Error::Format(format!(
                "{} export has no property list",
                GENERATED_CLASS
            )))
        }
    }

    anchor_mut(document, anchors.construction_script)?
        .create_before_serialization
        .push(node);
    anchor_mut(document, anchors.default_object)?
        .serialization_before_serialization
        .push(node);

    for array_name in SCS_NODE_ARRAYS {
        if let Some(Property {
            value: PropertyValue::Array { elements, .. },
            ..
        }) = document.find_property_mut(anchors.construction_script, array_name)
        {
            elements.push(PropertyValue::Object(node));
        }
    }

    Ok(())
}

fn anchor_mut(document: &mut AssetDocument, index: PackageIndex) -> Result<&mut Export> {
    document
        .export_mut(index)
        .ok_or_else(|| Error::Format(format!("{} does not name an export", index)))
}
