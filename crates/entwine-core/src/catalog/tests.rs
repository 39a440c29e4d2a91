use super::*;
use crate::{
    test_fixtures::{Invoice, document_capability, fixture_module},
    traits::EntityKind,
    value::Value,
};
use std::any::Any;
use ulid::Ulid;

fn invoice_catalog() -> EntityCatalog {
    EntityCatalog::build(Invoice::describe()).unwrap()
}

#[test]
fn capability_fields_merge_into_the_catalog() {
    let catalog = invoice_catalog();

    // id + description come from the capability; the rest are own.
    let names: Vec<&str> = catalog
        .fields(FieldProjection::ALL)
        .map(|f| f.field_name.as_str())
        .collect();
    assert_eq!(names, ["id", "description", "counter", "total", "tags"]);

    assert_eq!(catalog.entity_name(), "invoice");
    assert!(!catalog.is_abstract());
    assert!(!catalog.is_versioned());
}

#[test]
fn projection_filters_by_keyness() {
    let catalog = invoice_catalog();

    let keys: Vec<&str> = catalog
        .fields(FieldProjection::KEYS)
        .map(|f| f.field_name.as_str())
        .collect();
    assert_eq!(keys, ["id"]);

    let fields: Vec<&str> = catalog
        .fields(FieldProjection::FIELDS)
        .map(|f| f.field_name.as_str())
        .collect();
    assert_eq!(fields, ["description", "counter", "total", "tags"]);

    assert_eq!(catalog.fields(FieldProjection::ALL).count(), 5);
    assert_eq!(
        FieldProjection::KEYS.union(FieldProjection::FIELDS),
        FieldProjection::ALL
    );
}

#[test]
fn field_read_write_roundtrip() {
    let catalog = invoice_catalog();
    let mut invoice = Invoice::default();

    catalog
        .set_field_value(&mut invoice, "counter", Value::Uint(12))
        .unwrap();
    assert_eq!(
        catalog.field_value(&invoice, "counter").unwrap(),
        Value::Uint(12)
    );
}

#[test]
fn write_rejects_incompatible_kind() {
    let catalog = invoice_catalog();
    let mut invoice = Invoice::default();

    let err = catalog
        .set_field_value(&mut invoice, "counter", Value::Text("12".into()))
        .unwrap_err();
    assert!(matches!(err, CatalogError::TypeMismatch { .. }));
}

#[test]
fn unknown_field_is_an_error() {
    let catalog = invoice_catalog();
    let invoice = Invoice::default();

    let err = catalog.field_value(&invoice, "nope").unwrap_err();
    assert!(matches!(err, CatalogError::UnknownField { .. }));
}

#[test]
fn key_values_read_every_key() {
    let catalog = invoice_catalog();
    let invoice = Invoice {
        id: Ulid::from_parts(1, 2),
        ..Invoice::default()
    };

    let keys = catalog.key_values(&invoice).unwrap();
    assert_eq!(keys.len(), 1);
    assert_eq!(keys["id"], Value::Ulid(Ulid::from_parts(1, 2)));
}

#[test]
fn null_key_is_an_error() {
    let catalog = EntityCatalog::build(Tag::describe()).unwrap();
    let tag = Tag::default();

    let err = catalog.key_values(&tag).unwrap_err();
    assert!(matches!(err, CatalogError::NullKeyValue { .. }));
}

#[test]
fn abstract_interface_catalog() {
    let catalog =
        EntityCatalog::build(crate::test_fixtures::document_interface()).unwrap();

    assert!(catalog.is_abstract());
    assert_eq!(catalog.entity_name(), "document");
    assert_eq!(catalog.key_fields().len(), 1);
}

#[test]
fn subtype_marker_makes_the_type_abstract() {
    let descriptor = EntityDescriptor::new("Snapshot", fixture_module())
        .declares(EntityMarker::Versioned, "snapshot");
    let catalog = EntityCatalog::build(descriptor).unwrap();

    assert!(catalog.is_abstract());
    assert!(catalog.is_versioned());
}

#[test]
fn conflicting_capability_declarations_error() {
    fn left() -> CapabilityDescriptor {
        CapabilityDescriptor::new("Left").declares(EntityMarker::Entity, "left")
    }
    fn right() -> CapabilityDescriptor {
        CapabilityDescriptor::new("Right").declares(EntityMarker::Entity, "right")
    }

    let descriptor = EntityDescriptor::new("Torn", fixture_module())
        .capability(left)
        .capability(right);
    let err = EntityCatalog::build(descriptor).unwrap_err();
    assert!(matches!(err, CatalogError::ConflictingDeclaration { .. }));
}

#[test]
fn identical_duplicate_declarations_collapse() {
    fn base() -> CapabilityDescriptor {
        CapabilityDescriptor::new("Base")
            .declares(EntityMarker::Entity, "thing")
            .field("note", ValueKind::Text)
    }
    fn via_a() -> CapabilityDescriptor {
        CapabilityDescriptor::new("ViaA").extends(base)
    }
    fn via_b() -> CapabilityDescriptor {
        CapabilityDescriptor::new("ViaB").extends(base)
    }

    // The same declaration reached through two capability paths is one
    // catalog entry, not a conflict.
    let descriptor = EntityDescriptor::new("Diamond", fixture_module())
        .abstract_entity()
        .capability(via_a)
        .capability(via_b);
    let catalog = EntityCatalog::build(descriptor).unwrap();

    assert_eq!(catalog.entity_name(), "thing");
    assert_eq!(catalog.fields(FieldProjection::ALL).count(), 1);
}

#[test]
fn same_name_different_kind_is_ambiguous() {
    let descriptor = EntityDescriptor::new("Clash", fixture_module())
        .declares(EntityMarker::Entity, "clash")
        .field("description", ValueKind::Int)
        .capability(document_capability);
    let err = EntityCatalog::build(descriptor).unwrap_err();
    assert!(matches!(err, CatalogError::AmbiguousField { .. }));
}

#[test]
fn reserved_field_name_is_rejected() {
    let descriptor = EntityDescriptor::new("Sneaky", fixture_module())
        .declares(EntityMarker::Entity, "sneaky")
        .field("__type", ValueKind::Text);
    let err = EntityCatalog::build(descriptor).unwrap_err();
    assert!(matches!(err, CatalogError::ReservedFieldName { .. }));
}

#[test]
fn declared_field_without_binding_errors() {
    let descriptor = EntityDescriptor::new("Halfway", fixture_module())
        .declares(EntityMarker::Entity, "halfway")
        .field("loose", ValueKind::Text);
    let err = EntityCatalog::build(descriptor).unwrap_err();
    assert!(matches!(err, CatalogError::UnboundField { .. }));
}

#[test]
fn relation_shape_mismatch_on_write() {
    let catalog = EntityCatalog::build(crate::test_fixtures::Customer::describe()).unwrap();
    let mut customer = crate::test_fixtures::Customer::default();

    let err = catalog
        .set_relation_reference(
            &mut customer,
            "document",
            RelationValue::List(crate::reference::EntityReferenceList::new()),
        )
        .unwrap_err();
    assert!(matches!(err, CatalogError::RelationShapeMismatch { .. }));
}

#[test]
fn descriptor_equality_is_name_and_kind() {
    let a = FieldDescriptor {
        field_name: "x".into(),
        label: "x".into(),
        kind: ValueKind::Int,
        nullable: false,
        is_key: true,
        ordinal: 0,
    };
    let b = FieldDescriptor {
        field_name: "x".into(),
        label: "other label".into(),
        kind: ValueKind::Int,
        nullable: true,
        is_key: false,
        ordinal: 3,
    };

    assert_eq!(a, b);
}

///
/// Tag
/// Local fixture with a nullable-storage key.
///

#[derive(Clone, Debug, Default)]
struct Tag {
    code: Option<String>,
    label: String,
}

impl crate::traits::Entity for Tag {
    fn type_identity(&self) -> TypeIdentity {
        Self::identity()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl EntityKind for Tag {
    const TYPE_NAME: &'static str = "Tag";

    fn module() -> crate::traits::ModuleIdentity {
        fixture_module()
    }

    fn describe() -> EntityDescriptor {
        EntityDescriptor::new(Self::TYPE_NAME, fixture_module())
            .declares(EntityMarker::Entity, "tag")
            .key_field("code", ValueKind::Text, 0)
            .field("label", ValueKind::Text)
            .bind_field(
                "code",
                FieldAccessor::bind(|e: &Self| &e.code, |e: &mut Self, v| e.code = v),
            )
            .bind_field(
                "label",
                FieldAccessor::bind(|e: &Self| &e.label, |e: &mut Self, v| e.label = v),
            )
    }
}
