//! Module: ser
//! Responsibility: the polymorphic serialization engine, one depth-first
//! walk over the catalog parameterized over a thin format codec,
//! honoring projection, discriminators, relationships, and
//! change-notification suppression.
//! Does not own: catalog construction or reference resolution.

mod format;
mod json;
mod markup;
mod node;
mod options;


pub use format::{FormatCodec, WireFormat, register_codec};
pub use node::Node;
pub use options::{SerializerOptions, ValueConverter, default_options, set_default_options};

use crate::{
    TYPE_DISCRIMINATOR_FIELD,
    catalog::{EntityCatalog, RelationDescriptor, RelationValue},
    error::EngineError,
    identity::TypeIdentity,
    reference::{EntityReference, EntityReferenceList},
    registry::{SharedRegistry, TypeRecord, TypeRegistry},
    traits::{Entity, EntityKind},
    value::{Value, ValueKind, ValueMap},
};
use format::codec_for;
use indexmap::IndexMap;
use log::trace;
use std::fmt;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// SerializeError
///

#[derive(Debug, ThisError)]
pub enum SerializeError {
    #[error("non-nullable field '{field}' has a null wire value")]
    NonNullableFieldNull { field: String },

    #[error("no serializer registered for format {format}")]
    NoSerializerForType { format: WireFormat },

    #[error("serializer options rejected by the {format} engine: {reason}")]
    UnhandledOptions { format: WireFormat, reason: String },

    #[error("abstract root carries no type discriminator")]
    MissingDiscriminator,

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

///
/// SerializeErrorKind
///
/// Stable error-kind taxonomy for serializer failures.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SerializeErrorKind {
    NonNullableFieldNull,
    NoSerializerForType,
    UnhandledOptions,
    MissingDiscriminator,
    Malformed,
    Encode,
    Decode,
}

impl SerializeErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NonNullableFieldNull => "non_nullable_field_null",
            Self::NoSerializerForType => "no_serializer_for_type",
            Self::UnhandledOptions => "unhandled_options",
            Self::MissingDiscriminator => "missing_discriminator",
            Self::Malformed => "malformed",
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for SerializeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SerializeError {
    /// Return a stable error kind independent of message text.
    #[must_use]
    pub const fn kind(&self) -> SerializeErrorKind {
        match self {
            Self::NonNullableFieldNull { .. } => SerializeErrorKind::NonNullableFieldNull,
            Self::NoSerializerForType { .. } => SerializeErrorKind::NoSerializerForType,
            Self::UnhandledOptions { .. } => SerializeErrorKind::UnhandledOptions,
            Self::MissingDiscriminator => SerializeErrorKind::MissingDiscriminator,
            Self::Malformed(_) => SerializeErrorKind::Malformed,
            Self::Encode(_) => SerializeErrorKind::Encode,
            Self::Decode(_) => SerializeErrorKind::Decode,
        }
    }
}

///
/// Serializer
///
/// Format-bound serialization engine over one registry. Options are an
/// immutable snapshot taken at construction; one engine instance may be
/// shared across calls and threads.
///

#[derive(Debug)]
pub struct Serializer {
    registry: SharedRegistry,
    format: WireFormat,
    options: SerializerOptions,
}

impl Serializer {
    /// An engine with the format's shared default options.
    pub fn new(registry: SharedRegistry, format: WireFormat) -> Result<Self, EngineError> {
        let options = default_options(format).as_ref().clone();
        Self::with_options(registry, format, options)
    }

    /// An engine with explicit options.
    pub fn with_options(
        registry: SharedRegistry,
        format: WireFormat,
        options: SerializerOptions,
    ) -> Result<Self, EngineError> {
        if options.projection.is_empty() {
            return Err(SerializeError::UnhandledOptions {
                format,
                reason: "field projection selects nothing".to_string(),
            }
            .into());
        }
        codec_for(format)?.validate_options(&options)?;

        Ok(Self {
            registry,
            format,
            options,
        })
    }

    #[must_use]
    pub const fn format(&self) -> WireFormat {
        self.format
    }

    #[must_use]
    pub const fn options(&self) -> &SerializerOptions {
        &self.options
    }

    // ── Serialize ─────────────────

    /// Serialize one entity under its own concrete type.
    pub fn serialize(&self, entity: &dyn Entity) -> Result<Vec<u8>, EngineError> {
        let registry = self.registry.read();
        let node = self.encode_entity(&registry, entity, None)?;
        let codec = codec_for(self.format)?;

        codec.encode(&node).map_err(Into::into)
    }

    /// Serialize one entity under a declared static type; an abstract
    /// declared type makes the concrete identity travel as an embedded
    /// discriminator.
    pub fn serialize_as(
        &self,
        entity: &dyn Entity,
        declared: &TypeIdentity,
    ) -> Result<Vec<u8>, EngineError> {
        let registry = self.registry.read();
        let declared_record = registry.resolve(declared)?;
        let node = self.encode_entity(&registry, entity, Some(&declared_record))?;
        let codec = codec_for(self.format)?;

        codec.encode(&node).map_err(Into::into)
    }

    /// Serialize a list of entities under a declared static type.
    pub fn serialize_slice(
        &self,
        entities: &[&dyn Entity],
        declared: &TypeIdentity,
    ) -> Result<Vec<u8>, EngineError> {
        let registry = self.registry.read();
        let declared_record = registry.resolve(declared)?;
        let items = entities
            .iter()
            .map(|entity| self.encode_entity(&registry, *entity, Some(&declared_record)))
            .collect::<Result<Vec<_>, _>>()?;
        let codec = codec_for(self.format)?;

        codec.encode(&Node::List(items)).map_err(Into::into)
    }

    // ── Deserialize ─────────────────

    /// Deserialize into a known concrete type.
    pub fn deserialize<T: EntityKind>(&self, bytes: &[u8]) -> Result<T, EngineError> {
        let entity = self.deserialize_as(bytes, &T::identity())?;
        entity.into_any().downcast::<T>().map(|boxed| *boxed).map_err(|_| {
            EngineError::serialize_invariant("decoded entity does not match the requested type")
        })
    }

    /// Deserialize under a declared static type. An abstract declared
    /// type requires an embedded discriminator: the reserved member is
    /// located within the root object, resolved, and the same object is
    /// then walked again to populate the concrete instance.
    pub fn deserialize_as(
        &self,
        bytes: &[u8],
        declared: &TypeIdentity,
    ) -> Result<Box<dyn Entity>, EngineError> {
        let registry = self.registry.read();
        let codec = codec_for(self.format)?;
        let node = codec.decode(bytes)?;

        self.decode_entity(&registry, &node, declared)
    }

    /// Deserialize a list payload under a declared static type.
    pub fn deserialize_slice_as(
        &self,
        bytes: &[u8],
        declared: &TypeIdentity,
    ) -> Result<Vec<Box<dyn Entity>>, EngineError> {
        let registry = self.registry.read();
        let codec = codec_for(self.format)?;
        let node = codec.decode(bytes)?;
        let items = node.as_list().ok_or_else(|| {
            SerializeError::Malformed("expected a list payload at the root".to_string())
        })?;

        items
            .iter()
            .map(|item| self.decode_entity(&registry, item, declared))
            .collect()
    }

    // ── Dictionary round-trip mode ─────────────────

    /// Serialize an entity into a field-name → value map by encoding to
    /// bytes and decoding them generically.
    pub fn to_map(&self, entity: &dyn Entity) -> Result<ValueMap, EngineError> {
        let bytes = self.serialize(entity)?;
        let codec = codec_for(self.format)?;
        let node = codec.decode(&bytes)?;
        let object = node.as_object().ok_or_else(|| {
            SerializeError::Malformed("expected an entity object at the root".to_string())
        })?;

        Ok(object
            .iter()
            .map(|(name, child)| (name.clone(), generic_value(child)))
            .collect())
    }

    /// Deserialize from a field-name → value map by re-encoding it to
    /// bytes and decoding typed.
    pub fn from_map(
        &self,
        map: &ValueMap,
        declared: &TypeIdentity,
    ) -> Result<Box<dyn Entity>, EngineError> {
        let node = Node::Object(
            map.iter()
                .map(|(name, value)| (name.clone(), generic_node(value)))
                .collect(),
        );
        let codec = codec_for(self.format)?;
        let bytes = codec.encode(&node)?;

        self.deserialize_as(&bytes, declared)
    }

    // ── Encoding walk ─────────────────

    fn encode_entity(
        &self,
        registry: &TypeRegistry,
        entity: &dyn Entity,
        declared: Option<&Arc<TypeRecord>>,
    ) -> Result<Node, EngineError> {
        let identity = entity.type_identity();
        let record = registry.resolve(&identity)?;
        let catalog = record.catalog()?;
        trace!("encoding {} as {}", identity, self.format);

        let mut object = IndexMap::new();

        let declared_abstract = match declared {
            Some(declared_record) => declared_record.catalog()?.is_abstract(),
            None => false,
        };
        if self.options.include_type_info && declared_abstract {
            object.insert(
                TYPE_DISCRIMINATOR_FIELD.to_string(),
                Node::Text(identity.encode(false)),
            );
        }

        for field in catalog.fields(self.options.projection) {
            if self.options.excluded_fields.contains(&field.field_name) {
                continue;
            }
            let value = catalog.field_value(entity, &field.field_name)?;
            object.insert(field.field_name.clone(), self.value_to_node(value));
        }

        if self.options.serialize_relationships {
            for relation in catalog.relations() {
                let value = catalog.relation_reference(entity, &relation.relation_name)?;
                let node = match value {
                    RelationValue::Single(reference) => {
                        self.encode_reference(registry, &reference, relation)?
                    }
                    RelationValue::List(list) => Node::List(
                        list.iter()
                            .map(|reference| self.encode_reference(registry, reference, relation))
                            .collect::<Result<_, _>>()?,
                    ),
                };
                object.insert(relation.relation_name.clone(), node);
            }
        }

        Ok(Node::Object(object))
    }

    /// A reference is written as its key values (plus a discriminator
    /// when the related type is abstract) — never the resolved entity's
    /// field set, which bounds graph expansion and breaks cycles.
    fn encode_reference(
        &self,
        registry: &TypeRegistry,
        reference: &EntityReference,
        relation: &RelationDescriptor,
    ) -> Result<Node, EngineError> {
        if reference.is_null_reference() {
            return Ok(Node::Scalar(Value::Null));
        }

        let mut object = IndexMap::new();

        let related_abstract = registry.resolve(&relation.related)?.catalog()?.is_abstract();
        if related_abstract {
            if let Some(concrete) = reference.concrete_type() {
                object.insert(
                    TYPE_DISCRIMINATOR_FIELD.to_string(),
                    Node::Text(concrete.encode(false)),
                );
            }
        }

        for (name, value) in reference.keys() {
            object.insert(name.clone(), self.value_to_node(value.clone()));
        }

        Ok(Node::Object(object))
    }

    fn value_to_node(&self, value: Value) -> Node {
        if let Some(node) = self
            .options
            .converters
            .iter()
            .find_map(|converter| converter.encode(&value, self.format))
        {
            return node;
        }

        Node::Scalar(value)
    }

    // ── Decoding walk ─────────────────

    fn decode_entity(
        &self,
        registry: &TypeRegistry,
        node: &Node,
        declared: &TypeIdentity,
    ) -> Result<Box<dyn Entity>, EngineError> {
        let object = node.as_object().ok_or_else(|| {
            SerializeError::Malformed("expected an entity object at the root".to_string())
        })?;
        let declared_record = registry.resolve(declared)?;

        // An abstract static type commits to a concrete type only after
        // the reserved member is found inside the (already bounded)
        // root object.
        let record = if declared_record.catalog()?.is_abstract() {
            match object.get(TYPE_DISCRIMINATOR_FIELD) {
                Some(discriminator) => {
                    let text = discriminator.as_text().ok_or_else(|| {
                        SerializeError::Malformed("type discriminator must be text".to_string())
                    })?;
                    let identity = TypeIdentity::parse(text)?;
                    registry.resolve(&identity)?
                }
                None => return Err(SerializeError::MissingDiscriminator.into()),
            }
        } else {
            declared_record
        };

        let catalog = record.catalog()?;
        let mut entity = record.construct()?;
        trace!("decoding {} from {}", record.identity(), self.format);

        // Field population must not register as user-driven change:
        // suppression is raised before the walk and always cleared,
        // error paths included.
        if let Some(tracked) = entity.as_change_tracked() {
            tracked.suppress_notifications(true);
        }
        let populated = self.populate(registry, &catalog, entity.as_mut(), object);
        if let Some(tracked) = entity.as_change_tracked() {
            tracked.suppress_notifications(false);
        }
        populated?;

        Ok(entity)
    }

    fn populate(
        &self,
        registry: &TypeRegistry,
        catalog: &EntityCatalog,
        entity: &mut dyn Entity,
        object: &IndexMap<String, Node>,
    ) -> Result<(), EngineError> {
        for field in catalog.fields(self.options.projection) {
            if self.options.excluded_fields.contains(&field.field_name) {
                continue;
            }

            let wire = object.get(&field.field_name);
            let value = match wire {
                None => {
                    if !field.nullable {
                        return Err(SerializeError::NonNullableFieldNull {
                            field: field.field_name.clone(),
                        }
                        .into());
                    }
                    Value::Null
                }
                Some(node) if node.is_null() => {
                    if !field.nullable {
                        return Err(SerializeError::NonNullableFieldNull {
                            field: field.field_name.clone(),
                        }
                        .into());
                    }
                    Value::Null
                }
                Some(node) => self.node_to_value(node, &field.kind)?,
            };
            catalog.set_field_value(entity, &field.field_name, value)?;
        }

        if self.options.serialize_relationships {
            for relation in catalog.relations() {
                let Some(wire) = object.get(&relation.relation_name) else {
                    continue;
                };
                let value = self.decode_relation(registry, wire, relation)?;
                catalog.set_relation_reference(entity, &relation.relation_name, value)?;
            }
        }

        Ok(())
    }

    fn node_to_value(&self, node: &Node, kind: &ValueKind) -> Result<Value, EngineError> {
        if let Some(value) = self
            .options
            .converters
            .iter()
            .find_map(|converter| converter.decode(node, kind))
        {
            return Ok(value);
        }

        let value = match node {
            Node::Scalar(value) => value.clone().coerce_numeric(kind),
            Node::Text(text) => match kind {
                ValueKind::Text => Value::Text(text.clone()),
                // A markup list with no items decodes as empty text.
                ValueKind::List(_) if text.is_empty() => Value::List(Vec::new()),
                _ => Value::parse_text(kind, text)
                    .map_err(|err| SerializeError::Decode(err.to_string()))?,
            },
            Node::List(items) => match kind {
                ValueKind::List(element) => Value::List(
                    items
                        .iter()
                        .map(|item| self.node_to_value(item, element))
                        .collect::<Result<_, _>>()?,
                ),
                _ => {
                    return Err(
                        SerializeError::Decode(format!("unexpected list for {kind}")).into(),
                    );
                }
            },
            Node::Object(_) => {
                return Err(
                    SerializeError::Decode("unexpected object in field position".to_string())
                        .into(),
                );
            }
        };

        Ok(value)
    }

    fn decode_relation(
        &self,
        registry: &TypeRegistry,
        node: &Node,
        relation: &RelationDescriptor,
    ) -> Result<RelationValue, EngineError> {
        if relation.is_list {
            let references = match node {
                Node::List(items) => items
                    .iter()
                    .map(|item| self.decode_reference(registry, item, relation))
                    .collect::<Result<Vec<_>, _>>()?,
                node if node.is_null() => Vec::new(),
                // A markup list with no items decodes as empty text.
                Node::Text(text) if text.is_empty() => Vec::new(),
                _ => {
                    return Err(SerializeError::Malformed(format!(
                        "relation '{}' expects a list",
                        relation.relation_name
                    ))
                    .into());
                }
            };

            Ok(RelationValue::List(EntityReferenceList::from_references(
                references,
            )))
        } else if node.is_null() {
            Ok(RelationValue::Single(EntityReference::null()))
        } else {
            Ok(RelationValue::Single(
                self.decode_reference(registry, node, relation)?,
            ))
        }
    }

    /// Rebuild an unresolved reference: key values typed against the
    /// related catalog, plus the concrete identity when it is knowable.
    fn decode_reference(
        &self,
        registry: &TypeRegistry,
        node: &Node,
        relation: &RelationDescriptor,
    ) -> Result<EntityReference, EngineError> {
        let object = node.as_object().ok_or_else(|| {
            SerializeError::Malformed(format!(
                "relation '{}' expects a key object",
                relation.relation_name
            ))
        })?;

        let wire_concrete = match object.get(TYPE_DISCRIMINATOR_FIELD) {
            Some(discriminator) => {
                let text = discriminator.as_text().ok_or_else(|| {
                    SerializeError::Malformed("type discriminator must be text".to_string())
                })?;
                Some(TypeIdentity::parse(text)?)
            }
            None => None,
        };

        let related_record = match &wire_concrete {
            Some(identity) => registry.resolve(identity)?,
            None => registry.resolve(&relation.related)?,
        };
        let related_catalog = related_record.catalog()?;

        let mut keys = ValueMap::new();
        for key_field in related_catalog.key_fields() {
            let wire = object.get(&key_field.field_name).ok_or_else(|| {
                SerializeError::Malformed(format!(
                    "relation '{}' is missing key '{}'",
                    relation.relation_name, key_field.field_name
                ))
            })?;
            keys.insert(
                key_field.field_name.clone(),
                self.node_to_value(wire, &key_field.kind)?,
            );
        }

        let reference = EntityReference::from_keys(keys);
        let concrete = match wire_concrete {
            Some(identity) => Some(identity),
            None if !related_catalog.is_abstract() => Some(related_record.identity().clone()),
            None => None,
        };

        Ok(match concrete {
            Some(identity) => reference.with_concrete(identity),
            None => reference,
        })
    }
}

// ── Generic value/node mapping for dictionary mode ─────────────────

fn generic_value(node: &Node) -> Value {
    match node {
        Node::Object(map) => Value::Map(
            map.iter()
                .map(|(name, child)| (name.clone(), generic_value(child)))
                .collect(),
        ),
        Node::List(items) => Value::List(items.iter().map(generic_value).collect()),
        Node::Scalar(value) => value.clone(),
        Node::Text(text) => Value::Text(text.clone()),
    }
}

fn generic_node(value: &Value) -> Node {
    match value {
        Value::Map(entries) => Node::Object(
            entries
                .iter()
                .map(|(name, child)| (name.clone(), generic_node(child)))
                .collect(),
        ),
        Value::List(items) => Node::List(items.iter().map(generic_node).collect()),
        other => Node::Scalar(other.clone()),
    }
}
