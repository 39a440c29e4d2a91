use super::*;
use crate::test_fixtures::{
    Customer, Invoice, InvoiceEnvelope, Order, Receipt, boxed_instantiate, document_identity,
    document_interface, fixture_module, fixture_registry,
};
use crate::traits::EntityKind;

#[test]
fn duplicate_registration_is_a_stable_error() {
    let registry = fixture_registry();
    let mut guard = registry.write();

    let err = guard.register_entity::<Invoice>().unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));

    // The original record survives untouched.
    drop(guard);
    assert!(registry.read().contains(&Invoice::identity()));
}

#[test]
fn duplicate_generic_definition_is_an_error() {
    let registry = fixture_registry();
    let mut guard = registry.write();

    let err = guard
        .register_generic(fixture_module(), "Boxed", 1, boxed_instantiate)
        .unwrap_err();
    assert!(matches!(err, RegistryError::DuplicateRegistration { .. }));
}

#[test]
fn direct_resolution_by_identity() {
    let registry = fixture_registry();
    let guard = registry.read();

    let record = guard.resolve(&Invoice::identity()).unwrap();
    assert_eq!(record.identity(), &Invoice::identity());
    assert!(record.is_constructible());
}

#[test]
fn resolution_from_parsed_discriminator() {
    let registry = fixture_registry();
    let guard = registry.read();

    let encoded = Invoice::identity().encode(false);
    let parsed = TypeIdentity::parse(&encoded).unwrap();
    let record = guard.resolve(&parsed).unwrap();
    assert_eq!(record.identity().type_name(), "Invoice");
}

#[test]
fn version_scan_honors_requested_version() {
    let registry = fixture_registry();
    let guard = registry.read();

    let module = fixture_module();
    let exact =
        TypeIdentity::versioned("Receipt", module.name, module.version.unwrap()).unwrap();
    assert!(guard.resolve(&exact).is_ok());

    let wrong = TypeIdentity::versioned("Receipt", module.name, "0.0.0-nope").unwrap();
    let err = guard.resolve(&wrong).unwrap_err();
    assert!(matches!(err, DiscriminatorError::TypeNotFound { .. }));
}

#[test]
fn unknown_type_is_not_found() {
    let registry = fixture_registry();
    let guard = registry.read();

    let identity = TypeIdentity::new("Phantom", "nowhere").unwrap();
    let err = guard.resolve(&identity).unwrap_err();
    assert!(matches!(err, DiscriminatorError::TypeNotFound { .. }));
}

#[test]
fn closed_generic_roundtrips_through_its_discriminator() {
    let registry = fixture_registry();
    let guard = registry.read();

    let identity = InvoiceEnvelope::identity();
    let encoded = identity.encode(false);
    let parsed = TypeIdentity::parse(&encoded).unwrap();
    assert_eq!(parsed.generic_args().len(), 1);

    let record = guard.resolve(&parsed).unwrap();
    assert_eq!(record.identity(), &identity);
}

#[test]
fn generic_definition_closes_over_resolved_arguments() {
    let registry = fixture_registry();
    let guard = registry.read();

    // Boxed<T> is registered as an alias definition resolving to T.
    let module = fixture_module();
    let identity = TypeIdentity::new("Boxed", module.name)
        .unwrap()
        .with_args(vec![Invoice::identity()]);
    let record = guard.resolve(&identity).unwrap();
    assert_eq!(record.identity().type_name(), "Invoice");
}

#[test]
fn generic_with_unresolvable_argument_fails() {
    let registry = fixture_registry();
    let guard = registry.read();

    let module = fixture_module();
    let identity = TypeIdentity::new("Boxed", module.name)
        .unwrap()
        .with_args(vec![TypeIdentity::new("Phantom", "nowhere").unwrap()]);
    let err = guard.resolve(&identity).unwrap_err();
    assert!(matches!(err, DiscriminatorError::TypeNotFound { .. }));
}

#[test]
fn abstract_records_cannot_be_constructed() {
    let registry = SharedRegistry::new();
    registry.write().register_abstract(document_interface).unwrap();

    let record = registry.read().resolve(&document_identity()).unwrap();
    assert!(!record.is_constructible());

    let err = record.construct().unwrap_err();
    assert!(matches!(err, RegistryError::AbstractConstruction { .. }));
}

#[test]
fn catalog_is_memoized_per_record() {
    let registry = fixture_registry();
    let guard = registry.read();

    let record = guard.resolve(&Order::identity()).unwrap();
    let first = record.catalog().unwrap();
    let second = record.catalog().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn constructed_instances_start_from_defaults() {
    let registry = fixture_registry();
    let guard = registry.read();

    let record = guard.resolve(&Customer::identity()).unwrap();
    let entity = record.construct().unwrap();
    let catalog = record.catalog().unwrap();
    assert_eq!(
        catalog.field_value(entity.as_ref(), "name").unwrap(),
        crate::value::Value::Text(String::new())
    );
}

#[test]
fn catalog_for_uses_the_concrete_runtime_type() {
    let registry = fixture_registry();
    let guard = registry.read();

    let receipt = Receipt::default();
    let catalog = guard.catalog_for(&receipt).unwrap();
    assert_eq!(catalog.entity_name(), "receipt");
}
