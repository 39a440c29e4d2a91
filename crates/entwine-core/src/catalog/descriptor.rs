use crate::{
    catalog::{
        accessor::{FieldAccessor, RelationAccessor},
        relation::{LoadPolicy, RelationshipKind},
    },
    identity::TypeIdentity,
    traits::ModuleIdentity,
    value::ValueKind,
};
use std::fmt::{self, Display};

///
/// EntityMarker
///
/// The entity capability marker a declaration carries. `Versioned` and
/// `ChangeTracked` are subtype markers: they imply the entity capability
/// without being the bare marker itself.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EntityMarker {
    Entity,
    Versioned,
    ChangeTracked,
}

impl Display for EntityMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Entity => "entity",
            Self::Versioned => "versioned",
            Self::ChangeTracked => "change_tracked",
        };
        f.write_str(label)
    }
}

///
/// EntityDeclaration
///
/// One entity declaration: the external entity name plus the marker it
/// was declared with.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityDeclaration {
    pub entity_name: String,
    pub marker: EntityMarker,
}

///
/// FieldDeclaration
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDeclaration {
    pub name: &'static str,
    pub label: Option<&'static str>,
    pub kind: ValueKind,
    pub nullable: bool,
    pub is_key: bool,
    pub ordinal: u16,
}

///
/// RelationDeclaration
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelationDeclaration {
    pub name: &'static str,
    pub related: TypeIdentity,
    pub relationship: RelationshipKind,
    pub is_list: bool,
    pub load: LoadPolicy,
}

/// A capability set is referenced by the function that produces its
/// descriptor, so shared declarations stay in one place.
pub type CapabilityRef = fn() -> CapabilityDescriptor;

///
/// CapabilityDescriptor
///
/// Declarations contributed by one capability set (interface): an
/// optional entity declaration, fields, relations, and the capability
/// sets it extends. Field metadata declared here applies to every
/// entity type that attaches the capability; only accessor bindings
/// remain per concrete type.
///

pub struct CapabilityDescriptor {
    pub(crate) capability_name: &'static str,
    pub(crate) declaration: Option<EntityDeclaration>,
    pub(crate) fields: Vec<FieldDeclaration>,
    pub(crate) relations: Vec<RelationDeclaration>,
    pub(crate) extends: Vec<CapabilityRef>,
}

impl CapabilityDescriptor {
    #[must_use]
    pub fn new(capability_name: &'static str) -> Self {
        Self {
            capability_name,
            declaration: None,
            fields: Vec::new(),
            relations: Vec::new(),
            extends: Vec::new(),
        }
    }

    /// Carry an entity declaration on this capability set.
    #[must_use]
    pub fn declares(mut self, marker: EntityMarker, entity_name: &str) -> Self {
        self.declaration = Some(EntityDeclaration {
            entity_name: entity_name.to_string(),
            marker,
        });
        self
    }

    #[must_use]
    pub fn key_field(mut self, name: &'static str, kind: ValueKind, ordinal: u16) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: None,
            kind,
            nullable: false,
            is_key: true,
            ordinal,
        });
        self
    }

    #[must_use]
    pub fn field(mut self, name: &'static str, kind: ValueKind) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: None,
            kind,
            nullable: false,
            is_key: false,
            ordinal: 0,
        });
        self
    }

    #[must_use]
    pub fn nullable_field(mut self, name: &'static str, kind: ValueKind) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: None,
            kind,
            nullable: true,
            is_key: false,
            ordinal: 0,
        });
        self
    }

    #[must_use]
    pub fn relation(
        mut self,
        name: &'static str,
        related: TypeIdentity,
        relationship: RelationshipKind,
        load: LoadPolicy,
    ) -> Self {
        self.relations.push(RelationDeclaration {
            name,
            related,
            relationship,
            is_list: false,
            load,
        });
        self
    }

    #[must_use]
    pub fn list_relation(
        mut self,
        name: &'static str,
        related: TypeIdentity,
        relationship: RelationshipKind,
        load: LoadPolicy,
    ) -> Self {
        self.relations.push(RelationDeclaration {
            name,
            related,
            relationship,
            is_list: true,
            load,
        });
        self
    }

    /// Extend another capability set; its declarations apply
    /// transitively.
    #[must_use]
    pub fn extends(mut self, capability: CapabilityRef) -> Self {
        self.extends.push(capability);
        self
    }
}

///
/// EntityDescriptor
///
/// The full declaration of one entity type: direct declarations plus
/// attached capability sets, and the accessor bindings that connect
/// declared names to concrete storage.
///

pub struct EntityDescriptor {
    pub(crate) type_name: &'static str,
    pub(crate) module: ModuleIdentity,
    pub(crate) declaration: Option<EntityDeclaration>,
    pub(crate) declared_abstract: bool,
    pub(crate) fields: Vec<FieldDeclaration>,
    pub(crate) relations: Vec<RelationDeclaration>,
    pub(crate) capabilities: Vec<CapabilityRef>,
    pub(crate) field_bindings: Vec<(&'static str, FieldAccessor)>,
    pub(crate) relation_bindings: Vec<(&'static str, RelationAccessor)>,
}

impl EntityDescriptor {
    #[must_use]
    pub fn new(type_name: &'static str, module: ModuleIdentity) -> Self {
        Self {
            type_name,
            module,
            declaration: None,
            declared_abstract: false,
            fields: Vec::new(),
            relations: Vec::new(),
            capabilities: Vec::new(),
            field_bindings: Vec::new(),
            relation_bindings: Vec::new(),
        }
    }

    /// An interface/abstract declaration: carries metadata, never an
    /// instance.
    #[must_use]
    pub fn interface(type_name: &'static str, module: ModuleIdentity, entity_name: &str) -> Self {
        Self::new(type_name, module)
            .declares(EntityMarker::Entity, entity_name)
            .abstract_entity()
    }

    /// Carry an entity declaration directly on the type.
    #[must_use]
    pub fn declares(mut self, marker: EntityMarker, entity_name: &str) -> Self {
        self.declaration = Some(EntityDeclaration {
            entity_name: entity_name.to_string(),
            marker,
        });
        self
    }

    #[must_use]
    pub fn abstract_entity(mut self) -> Self {
        self.declared_abstract = true;
        self
    }

    #[must_use]
    pub fn key_field(mut self, name: &'static str, kind: ValueKind, ordinal: u16) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: None,
            kind,
            nullable: false,
            is_key: true,
            ordinal,
        });
        self
    }

    #[must_use]
    pub fn field(mut self, name: &'static str, kind: ValueKind) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: None,
            kind,
            nullable: false,
            is_key: false,
            ordinal: 0,
        });
        self
    }

    #[must_use]
    pub fn nullable_field(mut self, name: &'static str, kind: ValueKind) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: None,
            kind,
            nullable: true,
            is_key: false,
            ordinal: 0,
        });
        self
    }

    #[must_use]
    pub fn labeled_field(mut self, name: &'static str, label: &'static str, kind: ValueKind) -> Self {
        self.fields.push(FieldDeclaration {
            name,
            label: Some(label),
            kind,
            nullable: false,
            is_key: false,
            ordinal: 0,
        });
        self
    }

    #[must_use]
    pub fn relation(
        mut self,
        name: &'static str,
        related: TypeIdentity,
        relationship: RelationshipKind,
        load: LoadPolicy,
    ) -> Self {
        self.relations.push(RelationDeclaration {
            name,
            related,
            relationship,
            is_list: false,
            load,
        });
        self
    }

    #[must_use]
    pub fn list_relation(
        mut self,
        name: &'static str,
        related: TypeIdentity,
        relationship: RelationshipKind,
        load: LoadPolicy,
    ) -> Self {
        self.relations.push(RelationDeclaration {
            name,
            related,
            relationship,
            is_list: true,
            load,
        });
        self
    }

    /// Attach a capability set.
    #[must_use]
    pub fn capability(mut self, capability: CapabilityRef) -> Self {
        self.capabilities.push(capability);
        self
    }

    /// Bind the accessor for a declared field (own or inherited).
    #[must_use]
    pub fn bind_field(mut self, name: &'static str, accessor: FieldAccessor) -> Self {
        self.field_bindings.push((name, accessor));
        self
    }

    /// Bind the accessor for a declared relation (own or inherited).
    #[must_use]
    pub fn bind_relation(mut self, name: &'static str, accessor: RelationAccessor) -> Self {
        self.relation_bindings.push((name, accessor));
        self
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub const fn module(&self) -> ModuleIdentity {
        self.module
    }
}
