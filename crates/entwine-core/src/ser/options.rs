use crate::{
    catalog::FieldProjection,
    ser::{Node, WireFormat},
    value::{Value, ValueKind},
};
use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Arc, LazyLock, RwLock},
};

///
/// ValueConverter
///
/// Format-specific scalar conversion hook. Converters supplied on the
/// options are consulted before the base conversion, both directions;
/// returning `None` falls through.
///

pub trait ValueConverter: Send + Sync {
    fn encode(&self, value: &Value, format: WireFormat) -> Option<Node>;

    fn decode(&self, node: &Node, kind: &ValueKind) -> Option<Value>;
}

///
/// SerializerOptions
///
/// Per-call serializer configuration. A serializer clones its options
/// into an immutable snapshot at construction; nothing mutates them
/// afterwards.
///

#[derive(Clone)]
pub struct SerializerOptions {
    /// Emit a type discriminator for abstract/polymorphic roots.
    pub include_type_info: bool,
    /// Which catalog fields participate.
    pub projection: FieldProjection,
    /// Walk relation properties as nested key objects.
    pub serialize_relationships: bool,
    /// Field names excluded from this call.
    pub excluded_fields: BTreeSet<String>,
    /// Extra converters, consulted before the base conversion.
    pub converters: Vec<Arc<dyn ValueConverter>>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            include_type_info: true,
            projection: FieldProjection::ALL,
            serialize_relationships: true,
            excluded_fields: BTreeSet::new(),
            converters: Vec::new(),
        }
    }
}

impl SerializerOptions {
    #[must_use]
    pub const fn with_projection(mut self, projection: FieldProjection) -> Self {
        self.projection = projection;
        self
    }

    #[must_use]
    pub const fn with_type_info(mut self, include: bool) -> Self {
        self.include_type_info = include;
        self
    }

    #[must_use]
    pub const fn with_relationships(mut self, serialize: bool) -> Self {
        self.serialize_relationships = serialize;
        self
    }

    #[must_use]
    pub fn exclude(mut self, field: &str) -> Self {
        self.excluded_fields.insert(field.to_string());
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.converters.push(converter);
        self
    }
}

impl fmt::Debug for SerializerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializerOptions")
            .field("include_type_info", &self.include_type_info)
            .field("projection", &self.projection)
            .field("serialize_relationships", &self.serialize_relationships)
            .field("excluded_fields", &self.excluded_fields)
            .field("converters", &self.converters.len())
            .finish()
    }
}

///
/// DEFAULTS
/// one default options instance per format, created lazily
///

static DEFAULTS: LazyLock<RwLock<HashMap<WireFormat, Arc<SerializerOptions>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// The shared default options for a format. Read-only after creation;
/// callers wanting different settings clone and mutate their copy.
#[must_use]
pub fn default_options(format: WireFormat) -> Arc<SerializerOptions> {
    if let Some(options) = DEFAULTS
        .read()
        .expect("serializer defaults lock poisoned")
        .get(&format)
    {
        return options.clone();
    }

    DEFAULTS
        .write()
        .expect("serializer defaults lock poisoned")
        .entry(format)
        .or_insert_with(|| Arc::new(SerializerOptions::default()))
        .clone()
}

/// Replace the shared default options for a format.
pub fn set_default_options(format: WireFormat, options: SerializerOptions) {
    DEFAULTS
        .write()
        .expect("serializer defaults lock poisoned")
        .insert(format, Arc::new(options));
}
