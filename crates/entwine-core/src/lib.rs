//! Core runtime for Entwine: type identities and their discriminator
//! codec, the type registry, per-type metadata catalogs, lazy entity
//! references, and the polymorphic serialization engine.

pub mod catalog;
pub mod error;
pub mod identity;
pub mod reference;
pub mod registry;
pub mod ser;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Reserved member name for embedded type discriminators in serialized
/// entities. Catalog construction rejects user fields with this name,
/// so it can never collide.
pub const TYPE_DISCRIMINATOR_FIELD: &str = "__type";

///
/// Re-exports for macro-generated code
///
/// Startup registration expands to `ctor` attributes; re-exporting the
/// crate here keeps callers from declaring it themselves.
///

pub mod __reexports {
    pub use ctor;
}

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, codecs, or registries are re-exported here.
///

pub mod prelude {
    pub use crate::{
        catalog::{EntityDescriptor, FieldProjection},
        identity::TypeIdentity,
        reference::{EntityReference, EntityReferenceList},
        traits::{Entity, EntityKind, ModuleIdentity},
        value::Value,
    };
}
