//! Descriptor-built sample entities shared across the test suite.

use crate::{
    catalog::{
        CapabilityDescriptor, EntityDescriptor, EntityMarker, FieldAccessor, LoadPolicy,
        RelationAccessor, RelationshipKind,
    },
    identity::TypeIdentity,
    module_identity,
    reference::{EntityReference, EntityReferenceList},
    registry::{SharedRegistry, TypeRecord, TypeRegistry},
    traits::{ChangeTracked, Entity, EntityKind, ModuleIdentity},
    value::ValueKind,
};
use std::{any::Any, sync::Arc};
use ulid::Ulid;

pub(crate) fn fixture_module() -> ModuleIdentity {
    module_identity!()
}

///
/// Document capability
///
/// Shared declaration: every document-like entity carries a ulid key
/// and an optional description, declared once here.
///

pub(crate) fn document_capability() -> CapabilityDescriptor {
    CapabilityDescriptor::new("Document")
        .declares(EntityMarker::Entity, "document")
        .key_field("id", ValueKind::Ulid, 0)
        .nullable_field("description", ValueKind::Text)
}

/// Abstract interface record for the document capability.
pub(crate) fn document_interface() -> EntityDescriptor {
    EntityDescriptor::interface("Document", fixture_module(), "document")
        .capability(document_capability)
}

pub(crate) fn document_identity() -> TypeIdentity {
    let module = fixture_module();
    TypeIdentity::versioned("Document", module.name, module.version.unwrap()).unwrap()
}

///
/// Invoice
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Invoice {
    pub id: Ulid,
    pub description: Option<String>,
    pub counter: u64,
    pub total: Option<f64>,
    pub tags: Vec<String>,

    suppressed: bool,
    changed: Vec<String>,
}

impl Invoice {
    fn record_change(&mut self, field: &str) {
        if !self.suppressed {
            self.changed.push(field.to_string());
        }
    }

    pub fn changed(&self) -> &[String] {
        &self.changed
    }
}

impl ChangeTracked for Invoice {
    fn suppress_notifications(&mut self, suppress: bool) {
        self.suppressed = suppress;
    }

    fn notifications_suppressed(&self) -> bool {
        self.suppressed
    }
}

impl Entity for Invoice {
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

    fn as_change_tracked(&mut self) -> Option<&mut dyn ChangeTracked> {
        Some(self)
    }
}

impl EntityKind for Invoice {
    const TYPE_NAME: &'static str = "Invoice";

    fn module() -> ModuleIdentity {
        fixture_module()
    }

    fn describe() -> EntityDescriptor {
        EntityDescriptor::new(Self::TYPE_NAME, fixture_module())
            .declares(EntityMarker::Entity, "invoice")
            .capability(document_capability)
            .field("counter", ValueKind::Uint)
            .nullable_field("total", ValueKind::Float)
            .field("tags", ValueKind::List(Box::new(ValueKind::Text)))
            .bind_field(
                "id",
                FieldAccessor::bind(
                    |e: &Self| &e.id,
                    |e: &mut Self, v| {
                        e.record_change("id");
                        e.id = v;
                    },
                ),
            )
            .bind_field(
                "description",
                FieldAccessor::bind(
                    |e: &Self| &e.description,
                    |e: &mut Self, v| {
                        e.record_change("description");
                        e.description = v;
                    },
                ),
            )
            .bind_field(
                "counter",
                FieldAccessor::bind(
                    |e: &Self| &e.counter,
                    |e: &mut Self, v| {
                        e.record_change("counter");
                        e.counter = v;
                    },
                ),
            )
            .bind_field(
                "total",
                FieldAccessor::bind(
                    |e: &Self| &e.total,
                    |e: &mut Self, v| {
                        e.record_change("total");
                        e.total = v;
                    },
                ),
            )
            .bind_field(
                "tags",
                FieldAccessor::bind(
                    |e: &Self| &e.tags,
                    |e: &mut Self, v| {
                        e.record_change("tags");
                        e.tags = v;
                    },
                ),
            )
    }
}

///
/// Receipt
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Receipt {
    pub id: Ulid,
    pub description: Option<String>,
    pub amount: i64,
}

impl Entity for Receipt {
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

impl EntityKind for Receipt {
    const TYPE_NAME: &'static str = "Receipt";

    fn module() -> ModuleIdentity {
        fixture_module()
    }

    fn describe() -> EntityDescriptor {
        EntityDescriptor::new(Self::TYPE_NAME, fixture_module())
            .declares(EntityMarker::Entity, "receipt")
            .capability(document_capability)
            .field("amount", ValueKind::Int)
            .bind_field(
                "id",
                FieldAccessor::bind(|e: &Self| &e.id, |e: &mut Self, v| e.id = v),
            )
            .bind_field(
                "description",
                FieldAccessor::bind(
                    |e: &Self| &e.description,
                    |e: &mut Self, v| e.description = v,
                ),
            )
            .bind_field(
                "amount",
                FieldAccessor::bind(|e: &Self| &e.amount, |e: &mut Self, v| e.amount = v),
            )
    }
}

///
/// Order
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Order {
    pub id: Ulid,
    pub amount: u64,
}

impl Entity for Order {
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

impl EntityKind for Order {
    const TYPE_NAME: &'static str = "Order";

    fn module() -> ModuleIdentity {
        fixture_module()
    }

    fn describe() -> EntityDescriptor {
        EntityDescriptor::new(Self::TYPE_NAME, fixture_module())
            .declares(EntityMarker::Entity, "order")
            .key_field("id", ValueKind::Ulid, 0)
            .field("amount", ValueKind::Uint)
            .bind_field(
                "id",
                FieldAccessor::bind(|e: &Self| &e.id, |e: &mut Self, v| e.id = v),
            )
            .bind_field(
                "amount",
                FieldAccessor::bind(|e: &Self| &e.amount, |e: &mut Self, v| e.amount = v),
            )
    }
}

///
/// Customer
///

#[derive(Clone, Debug, Default)]
pub(crate) struct Customer {
    pub id: Ulid,
    pub name: String,
    pub document: EntityReference,
    pub orders: EntityReferenceList,
}

impl Entity for Customer {
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

impl EntityKind for Customer {
    const TYPE_NAME: &'static str = "Customer";

    fn module() -> ModuleIdentity {
        fixture_module()
    }

    fn describe() -> EntityDescriptor {
        EntityDescriptor::new(Self::TYPE_NAME, fixture_module())
            .declares(EntityMarker::Entity, "customer")
            .key_field("id", ValueKind::Ulid, 0)
            .field("name", ValueKind::Text)
            .relation(
                "document",
                document_identity(),
                RelationshipKind::Association,
                LoadPolicy::Lazy,
            )
            .list_relation(
                "orders",
                Order::identity(),
                RelationshipKind::Composition,
                LoadPolicy::Lazy,
            )
            .bind_field(
                "id",
                FieldAccessor::bind(|e: &Self| &e.id, |e: &mut Self, v| e.id = v),
            )
            .bind_field(
                "name",
                FieldAccessor::bind(|e: &Self| &e.name, |e: &mut Self, v| e.name = v),
            )
            .bind_relation(
                "document",
                RelationAccessor::single(|e: &Self| &e.document, |e: &mut Self, r| e.document = r),
            )
            .bind_relation(
                "orders",
                RelationAccessor::list(|e: &Self| &e.orders, |e: &mut Self, l| e.orders = l),
            )
    }
}

///
/// InvoiceEnvelope
///
/// Closed generic instance: `Envelope<Invoice>`.
///

#[derive(Clone, Debug, Default)]
pub(crate) struct InvoiceEnvelope {
    pub invoice_id: Ulid,
}

impl Entity for InvoiceEnvelope {
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

impl EntityKind for InvoiceEnvelope {
    const TYPE_NAME: &'static str = "Envelope";

    fn module() -> ModuleIdentity {
        fixture_module()
    }

    fn identity() -> TypeIdentity {
        let module = fixture_module();
        TypeIdentity::versioned(Self::TYPE_NAME, module.name, module.version.unwrap())
            .unwrap()
            .with_args(vec![Invoice::identity()])
    }

    fn describe() -> EntityDescriptor {
        EntityDescriptor::new(Self::TYPE_NAME, fixture_module())
            .declares(EntityMarker::Entity, "envelope")
            .key_field("invoice_id", ValueKind::Ulid, 0)
            .bind_field(
                "invoice_id",
                FieldAccessor::bind(|e: &Self| &e.invoice_id, |e: &mut Self, v| e.invoice_id = v),
            )
    }
}

/// Generic alias definition: `Boxed<T>` resolves to `T`'s record.
pub(crate) fn boxed_instantiate(
    _registry: &TypeRegistry,
    args: &[Arc<TypeRecord>],
) -> Option<Arc<TypeRecord>> {
    args.first().cloned()
}

/// A registry with every fixture type registered.
pub(crate) fn fixture_registry() -> SharedRegistry {
    let registry = SharedRegistry::new();
    {
        let mut guard = registry.write();
        guard.register_abstract(document_interface).unwrap();
        guard.register_entity::<Invoice>().unwrap();
        guard.register_entity::<Receipt>().unwrap();
        guard.register_entity::<Order>().unwrap();
        guard.register_entity::<Customer>().unwrap();
        guard.register_entity::<InvoiceEnvelope>().unwrap();
        guard
            .register_generic(fixture_module(), "Boxed", 1, boxed_instantiate)
            .unwrap();
    }

    registry
}
