//! Module: catalog
//! Responsibility: per-type field/relation metadata and the typed
//! accessor surface built from entity descriptors.
//! Does not own: type registration, wire encoding, or reference state.
//!
//! Invariants:
//! - A catalog is immutable once built; builds are deterministic, so
//!   racing first-time builds for the same type is harmless.
//! - Field names are unique within one catalog; the reserved
//!   discriminator name is never a field.
//! - Every declared field and relation has exactly one accessor binding.

mod accessor;
mod descriptor;
mod field;
mod relation;

#[cfg(test)]
mod tests;

pub use accessor::{AccessorError, FieldAccessor, RelationAccessor, RelationValue};
pub use descriptor::{
    CapabilityDescriptor, CapabilityRef, EntityDeclaration, EntityDescriptor, EntityMarker,
    FieldDeclaration, RelationDeclaration,
};
pub use field::{FieldDescriptor, FieldProjection};
pub use relation::{LoadPolicy, RelationDescriptor, RelationshipKind};

use crate::{
    TYPE_DISCRIMINATOR_FIELD,
    identity::TypeIdentity,
    traits::Entity,
    value::{Value, ValueKind, ValueMap},
};
use log::debug;
use std::collections::{HashMap, HashSet};
use thiserror::Error as ThisError;

///
/// CatalogError
///

#[derive(Debug, ThisError)]
pub enum CatalogError {
    #[error("ambiguous field '{field}': declared as {first} and as {second}")]
    AmbiguousField {
        field: String,
        first: ValueKind,
        second: ValueKind,
    },

    #[error("ambiguous relation '{relation}': conflicting declarations")]
    AmbiguousRelation { relation: String },

    #[error("conflicting entity declarations: '{first}' and '{second}'")]
    ConflictingDeclaration { first: String, second: String },

    #[error("type '{type_name}' carries no entity declaration")]
    NotAnEntity { type_name: String },

    #[error("field '{field}' is declared but has no accessor binding")]
    UnboundField { field: String },

    #[error("relation '{relation}' is declared but has no accessor binding")]
    UnboundRelation { relation: String },

    #[error("no field named '{field}'")]
    UnknownField { field: String },

    #[error("no relation named '{relation}'")]
    UnknownRelation { relation: String },

    #[error("field '{field}' uses the reserved discriminator name")]
    ReservedFieldName { field: String },

    #[error("key field '{field}' resolved to a null value")]
    NullKeyValue { field: String },

    #[error("field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: ValueKind,
        found: &'static str,
    },

    #[error("relation '{relation}' shape mismatch: declared {expected}, got {found}")]
    RelationShapeMismatch {
        relation: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("accessor applied to a different entity type than '{type_name}'")]
    EntityTypeMismatch { type_name: String },

    #[error("invalid type identity: {0}")]
    InvalidIdentity(String),
}

///
/// EntityCatalog
///
/// The per-type map from declared fields and relations to their runtime
/// accessors, plus the entity facts derived from the declaration walk.
/// Built once per concrete type and shared read-only afterwards.
///

#[derive(Debug)]
pub struct EntityCatalog {
    type_identity: TypeIdentity,
    entity_name: String,
    is_abstract: bool,
    is_versioned: bool,
    fields: Vec<FieldDescriptor>,
    field_accessors: HashMap<String, FieldAccessor>,
    relations: Vec<RelationDescriptor>,
    relation_accessors: HashMap<String, RelationAccessor>,
}

impl EntityCatalog {
    /// Build a catalog from a descriptor: merge own and capability-set
    /// declarations, detect conflicts, and wire accessor bindings.
    pub fn build(descriptor: EntityDescriptor) -> Result<Self, CatalogError> {
        let type_identity = identity_of(&descriptor)?;

        // Phase 1: collect declarations, own members first, then every
        // capability set transitively.
        let mut walk = DeclarationWalk::default();
        walk.own(&descriptor);
        for capability in &descriptor.capabilities {
            walk.capability(capability(), 1);
        }

        let declaration = walk.nearest_declaration(&descriptor)?;
        let is_abstract = descriptor.declared_abstract || declaration.marker != EntityMarker::Entity;
        let is_versioned = declaration.marker == EntityMarker::Versioned;

        // Phase 2: merge field and relation declarations.
        let fields = merge_fields(walk.fields)?;
        let relations = merge_relations(walk.relations)?;

        // Phase 3: bindings must cover declarations exactly. An
        // abstract catalog carries no instance, so bindings are not
        // required there.
        let mut field_accessors = HashMap::new();
        let mut relation_accessors = HashMap::new();
        if !descriptor.declared_abstract {
            for (name, accessor) in descriptor.field_bindings {
                if !fields.iter().any(|f| f.field_name == name) {
                    return Err(CatalogError::UnknownField {
                        field: name.to_string(),
                    });
                }
                field_accessors.insert(name.to_string(), accessor);
            }
            for field in &fields {
                if !field_accessors.contains_key(&field.field_name) {
                    return Err(CatalogError::UnboundField {
                        field: field.field_name.clone(),
                    });
                }
            }

            for (name, accessor) in descriptor.relation_bindings {
                if !relations.iter().any(|r| r.relation_name == name) {
                    return Err(CatalogError::UnknownRelation {
                        relation: name.to_string(),
                    });
                }
                relation_accessors.insert(name.to_string(), accessor);
            }
            for relation in &relations {
                if !relation_accessors.contains_key(&relation.relation_name) {
                    return Err(CatalogError::UnboundRelation {
                        relation: relation.relation_name.clone(),
                    });
                }
            }
        }

        debug!(
            "catalog built for {}: {} field(s), {} relation(s)",
            type_identity.canonical_path(),
            fields.len(),
            relations.len()
        );

        Ok(Self {
            type_identity,
            entity_name: declaration.entity_name,
            is_abstract,
            is_versioned,
            fields,
            field_accessors,
            relations,
            relation_accessors,
        })
    }

    #[must_use]
    pub fn type_identity(&self) -> &TypeIdentity {
        &self.type_identity
    }

    #[must_use]
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    #[must_use]
    pub const fn is_versioned(&self) -> bool {
        self.is_versioned
    }

    /// Field descriptors passing the projection, in declaration order.
    pub fn fields(&self, projection: FieldProjection) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(move |f| projection.admits(f.is_key))
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.field_name == name)
    }

    /// Key fields in composite-key (ordinal) order.
    #[must_use]
    pub fn key_fields(&self) -> Vec<&FieldDescriptor> {
        let mut keys: Vec<&FieldDescriptor> = self.fields.iter().filter(|f| f.is_key).collect();
        keys.sort_by_key(|f| f.ordinal);
        keys
    }

    /// Read every key field off an entity. Keys must always be
    /// populated; a null key is an error.
    pub fn key_values(&self, entity: &dyn Entity) -> Result<ValueMap, CatalogError> {
        let mut out = ValueMap::new();
        for field in self.key_fields() {
            let value = self.field_value(entity, &field.field_name)?;
            if value.is_null() {
                return Err(CatalogError::NullKeyValue {
                    field: field.field_name.clone(),
                });
            }
            out.insert(field.field_name.clone(), value);
        }

        Ok(out)
    }

    /// Type-checked field read.
    pub fn field_value(&self, entity: &dyn Entity, name: &str) -> Result<Value, CatalogError> {
        let accessor = self
            .field_accessors
            .get(name)
            .ok_or_else(|| CatalogError::UnknownField {
                field: name.to_string(),
            })?;

        Ok(accessor.get(entity))
    }

    /// Type-checked field write. The supplied value's runtime kind must
    /// be compatible with the declared field kind.
    pub fn set_field_value(
        &self,
        entity: &mut dyn Entity,
        name: &str,
        value: Value,
    ) -> Result<(), CatalogError> {
        let field = self.field(name).ok_or_else(|| CatalogError::UnknownField {
            field: name.to_string(),
        })?;
        if !field.kind.admits(&value) {
            return Err(CatalogError::TypeMismatch {
                field: name.to_string(),
                expected: field.kind.clone(),
                found: value.tag(),
            });
        }

        let accessor = self
            .field_accessors
            .get(name)
            .ok_or_else(|| CatalogError::UnknownField {
                field: name.to_string(),
            })?;
        accessor
            .set(entity, value)
            .map_err(|err| self.map_field_error(name, field, err))
    }

    #[must_use]
    pub fn relations(&self) -> &[RelationDescriptor] {
        &self.relations
    }

    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.relation_name == name)
    }

    /// Read a relation property.
    pub fn relation_reference(
        &self,
        entity: &dyn Entity,
        name: &str,
    ) -> Result<RelationValue, CatalogError> {
        let accessor =
            self.relation_accessors
                .get(name)
                .ok_or_else(|| CatalogError::UnknownRelation {
                    relation: name.to_string(),
                })?;

        Ok(accessor.get(entity))
    }

    /// Write a relation property. The value's shape must match the
    /// declared shape (single vs. list).
    pub fn set_relation_reference(
        &self,
        entity: &mut dyn Entity,
        name: &str,
        value: RelationValue,
    ) -> Result<(), CatalogError> {
        let relation = self
            .relation(name)
            .ok_or_else(|| CatalogError::UnknownRelation {
                relation: name.to_string(),
            })?;
        if relation.shape() != value.shape() {
            return Err(CatalogError::RelationShapeMismatch {
                relation: name.to_string(),
                expected: relation.shape(),
                found: value.shape(),
            });
        }

        let accessor =
            self.relation_accessors
                .get(name)
                .ok_or_else(|| CatalogError::UnknownRelation {
                    relation: name.to_string(),
                })?;
        accessor.set(entity, value).map_err(|err| match err {
            AccessorError::ValueShape { found } => CatalogError::RelationShapeMismatch {
                relation: name.to_string(),
                expected: relation.shape(),
                found,
            },
            AccessorError::WrongEntity => CatalogError::EntityTypeMismatch {
                type_name: self.type_identity.type_name().to_string(),
            },
        })
    }

    fn map_field_error(
        &self,
        name: &str,
        field: &FieldDescriptor,
        err: AccessorError,
    ) -> CatalogError {
        match err {
            AccessorError::ValueShape { found } => CatalogError::TypeMismatch {
                field: name.to_string(),
                expected: field.kind.clone(),
                found,
            },
            AccessorError::WrongEntity => CatalogError::EntityTypeMismatch {
                type_name: self.type_identity.type_name().to_string(),
            },
        }
    }
}

// ── Build helpers ─────────────────

fn identity_of(descriptor: &EntityDescriptor) -> Result<TypeIdentity, CatalogError> {
    let module = descriptor.module;
    match module.version {
        Some(version) => TypeIdentity::versioned(descriptor.type_name, module.name, version),
        None => TypeIdentity::new(descriptor.type_name, module.name),
    }
    .map_err(|err| CatalogError::InvalidIdentity(err.to_string()))
}

#[derive(Default)]
struct DeclarationWalk {
    fields: Vec<FieldDeclaration>,
    relations: Vec<RelationDeclaration>,
    // (declaration, depth): depth 1 = directly attached capability.
    declarations: Vec<(EntityDeclaration, usize)>,
    visited: HashSet<&'static str>,
}

impl DeclarationWalk {
    fn own(&mut self, descriptor: &EntityDescriptor) {
        self.fields.extend(descriptor.fields.iter().cloned());
        self.relations.extend(descriptor.relations.iter().cloned());
    }

    fn capability(&mut self, capability: CapabilityDescriptor, depth: usize) {
        if !self.visited.insert(capability.capability_name) {
            return;
        }

        if let Some(declaration) = capability.declaration {
            self.declarations.push((declaration, depth));
        }
        self.fields.extend(capability.fields);
        self.relations.extend(capability.relations);

        for extended in capability.extends {
            self.capability(extended(), depth + 1);
        }
    }

    /// The nearest applicable entity declaration: direct on the type,
    /// else the single declaration carried by capability sets.
    fn nearest_declaration(
        &self,
        descriptor: &EntityDescriptor,
    ) -> Result<EntityDeclaration, CatalogError> {
        if let Some(direct) = &descriptor.declaration {
            return Ok(direct.clone());
        }

        let mut distinct: Vec<&EntityDeclaration> = Vec::new();
        for (declaration, _) in &self.declarations {
            if !distinct.iter().any(|d| *d == declaration) {
                distinct.push(declaration);
            }
        }

        match distinct.as_slice() {
            [] => Err(CatalogError::NotAnEntity {
                type_name: descriptor.type_name.to_string(),
            }),
            [single] => {
                // Nearest wins when duplicates agree; prefer the
                // shallowest occurrence for marker semantics.
                let nearest = self
                    .declarations
                    .iter()
                    .filter(|(d, _)| d == *single)
                    .min_by_key(|(_, depth)| *depth)
                    .map(|(d, _)| d.clone())
                    .expect("declaration list is non-empty");
                Ok(nearest)
            }
            [first, second, ..] => Err(CatalogError::ConflictingDeclaration {
                first: format!("{} ({})", first.entity_name, first.marker),
                second: format!("{} ({})", second.entity_name, second.marker),
            }),
        }
    }
}

fn merge_fields(declarations: Vec<FieldDeclaration>) -> Result<Vec<FieldDescriptor>, CatalogError> {
    let mut out: Vec<FieldDescriptor> = Vec::new();
    for declaration in declarations {
        if declaration.name == TYPE_DISCRIMINATOR_FIELD {
            return Err(CatalogError::ReservedFieldName {
                field: declaration.name.to_string(),
            });
        }

        if let Some(existing) = out.iter().find(|f| f.field_name == declaration.name) {
            // Identical (name, kind) pairs reached through different
            // capability paths collapse to one entry.
            if existing.kind == declaration.kind {
                continue;
            }
            return Err(CatalogError::AmbiguousField {
                field: declaration.name.to_string(),
                first: existing.kind.clone(),
                second: declaration.kind,
            });
        }

        out.push(FieldDescriptor {
            field_name: declaration.name.to_string(),
            label: declaration.label.unwrap_or(declaration.name).to_string(),
            kind: declaration.kind,
            nullable: declaration.nullable,
            is_key: declaration.is_key,
            ordinal: declaration.ordinal,
        });
    }

    Ok(out)
}

fn merge_relations(
    declarations: Vec<RelationDeclaration>,
) -> Result<Vec<RelationDescriptor>, CatalogError> {
    let mut out: Vec<RelationDescriptor> = Vec::new();
    for declaration in declarations {
        if let Some(existing) = out.iter().find(|r| r.relation_name == declaration.name) {
            let same = existing.related == declaration.related
                && existing.relationship == declaration.relationship
                && existing.is_list == declaration.is_list
                && existing.load == declaration.load;
            if same {
                continue;
            }
            return Err(CatalogError::AmbiguousRelation {
                relation: declaration.name.to_string(),
            });
        }

        out.push(RelationDescriptor {
            relation_name: declaration.name.to_string(),
            related: declaration.related,
            relationship: declaration.relationship,
            is_list: declaration.is_list,
            load: declaration.load,
        });
    }

    Ok(out)
}
