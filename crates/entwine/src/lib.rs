//! Entwine: declarative polymorphic entity mapping and serialization.
//!
//! ## Crate layout
//! - `core`: type identities, the registry, metadata catalogs, entity
//!   references, and the serialization engine.
//!
//! The `prelude` module mirrors the vocabulary used by entity
//! declarations and serializer callers.

pub use entwine_core as core;

// export so the registration macros resolve from either crate name
pub use entwine_core::{module_identity, register_entities};

pub use entwine_core::{
    catalog, error, identity, reference, registry, ser, traits, value,
};

pub use entwine_core::TYPE_DISCRIMINATOR_FIELD;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use entwine_core::prelude::*;
}
