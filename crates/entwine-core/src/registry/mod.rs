//! Module: registry
//! Responsibility: the pool of registered types an identity resolves
//! against, with per-record memoized catalogs.
//! Does not own: identity string parsing or catalog construction rules.
//!
//! Invariants:
//! - A canonical path is registered at most once; duplicates are a hard
//!   error, never a silent overwrite.
//! - Records are immutable after registration; catalogs memoize once
//!   per record, and racing first-time builds discard the losers.

#[cfg(test)]
mod tests;

use crate::{
    catalog::{CatalogError, EntityCatalog, EntityDescriptor},
    error::EngineError,
    identity::{DiscriminatorError, TypeIdentity},
    traits::{Entity, EntityKind, ModuleIdentity},
};
use log::debug;
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock, OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use thiserror::Error as ThisError;

///
/// RegistryError
///

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("type '{path}' is already registered")]
    DuplicateRegistration { path: String },

    #[error("type '{path}' is not registered")]
    NotRegistered { path: String },

    #[error("cannot construct abstract type '{path}'")]
    AbstractConstruction { path: String },

    #[error("invalid type identity: {0}")]
    InvalidIdentity(String),
}

/// Produces a fresh, default instance of a registered concrete type.
pub type EntityConstructor = fn() -> Box<dyn Entity>;

/// Produces the declaration a record's catalog is built from.
pub type DescriptorFn = fn() -> EntityDescriptor;

/// Closes an open generic definition over already-resolved argument
/// records, yielding the registered closed record when one applies.
pub type GenericInstantiator = fn(&TypeRegistry, &[Arc<TypeRecord>]) -> Option<Arc<TypeRecord>>;

///
/// TypeRecord
///
/// One registered type: its identity, an optional constructor (absent
/// for interface/abstract records), and the lazily built catalog.
///

#[derive(Debug)]
pub struct TypeRecord {
    identity: TypeIdentity,
    constructor: Option<EntityConstructor>,
    descriptor: DescriptorFn,
    catalog: OnceLock<Arc<EntityCatalog>>,
}

impl TypeRecord {
    #[must_use]
    pub fn identity(&self) -> &TypeIdentity {
        &self.identity
    }

    #[must_use]
    pub const fn is_constructible(&self) -> bool {
        self.constructor.is_some()
    }

    /// Instantiate the type with default field values.
    pub fn construct(&self) -> Result<Box<dyn Entity>, RegistryError> {
        self.constructor
            .map(|constructor| constructor())
            .ok_or_else(|| RegistryError::AbstractConstruction {
                path: self.identity.canonical_path(),
            })
    }

    /// The record's catalog, built on first use. Concurrent first-time
    /// builds may race; the content is deterministic and the losing
    /// build is discarded.
    pub fn catalog(&self) -> Result<Arc<EntityCatalog>, CatalogError> {
        if let Some(catalog) = self.catalog.get() {
            return Ok(catalog.clone());
        }

        let built = Arc::new(EntityCatalog::build((self.descriptor)())?);
        let _ = self.catalog.set(built);

        Ok(self
            .catalog
            .get()
            .expect("registry invariant: catalog was just set")
            .clone())
    }
}

///
/// ModuleEntry
///
/// One registered module: the unit the scan-resolution path searches.
///

#[derive(Debug)]
struct ModuleEntry {
    name: String,
    version: Option<String>,
    types: Vec<String>,
}

///
/// GenericRecord
///

#[derive(Debug)]
struct GenericRecord {
    instantiate: GenericInstantiator,
}

///
/// TypeRegistry
///
/// Registered types keyed by canonical path, the module table backing
/// scan resolution, and open generic definitions.
///

#[derive(Debug, Default)]
pub struct TypeRegistry {
    records: HashMap<String, Arc<TypeRecord>>,
    modules: Vec<ModuleEntry>,
    generics: HashMap<String, GenericRecord>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a concrete entity type.
    pub fn register_entity<T: EntityKind>(&mut self) -> Result<(), RegistryError> {
        self.insert_record(T::identity(), Some(construct_default::<T>), T::describe)
    }

    /// Register a concrete entity type under an explicit identity, for
    /// closed generic instances whose identity carries arguments.
    pub fn register_entity_as<T: EntityKind>(
        &mut self,
        identity: TypeIdentity,
    ) -> Result<(), RegistryError> {
        self.insert_record(identity, Some(construct_default::<T>), T::describe)
    }

    /// Register an interface/abstract declaration. The record carries
    /// metadata and participates in resolution but cannot be
    /// constructed.
    pub fn register_abstract(&mut self, descriptor: DescriptorFn) -> Result<(), RegistryError> {
        let described = descriptor();
        let identity = identity_of(described.type_name(), described.module())?;
        self.insert_record(identity, None, descriptor)
    }

    /// Register an open generic definition.
    pub fn register_generic(
        &mut self,
        module: ModuleIdentity,
        type_name: &'static str,
        arity: usize,
        instantiate: GenericInstantiator,
    ) -> Result<(), RegistryError> {
        let path = format!("{}::{}`{}", module.name, type_name, arity);
        if self.generics.contains_key(&path) {
            return Err(RegistryError::DuplicateRegistration { path });
        }

        debug!("registered generic definition {path}");
        self.generics.insert(path, GenericRecord { instantiate });

        Ok(())
    }

    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<Arc<TypeRecord>> {
        self.records.get(path).cloned()
    }

    #[must_use]
    pub fn get(&self, identity: &TypeIdentity) -> Option<Arc<TypeRecord>> {
        self.get_path(&identity.canonical_path())
    }

    #[must_use]
    pub fn contains(&self, identity: &TypeIdentity) -> bool {
        self.records.contains_key(&identity.canonical_path())
    }

    /// Resolve an identity to a registered record.
    ///
    /// Direct fully-qualified lookup first; on miss, generic identities
    /// resolve their arguments and close the open definition, and
    /// non-generic identities fall back to scanning modules whose name
    /// (and version, when the identity carries one) matches.
    pub fn resolve(&self, identity: &TypeIdentity) -> Result<Arc<TypeRecord>, DiscriminatorError> {
        if let Some(record) = self.get(identity) {
            if version_matches(identity, record.identity()) {
                return Ok(record);
            }
        }

        if identity.is_generic() {
            let args = identity
                .generic_args()
                .iter()
                .map(|arg| self.resolve(arg))
                .collect::<Result<Vec<_>, _>>()?;

            if let Some(generic) = self.generics.get(&identity.definition_path()) {
                if let Some(record) = (generic.instantiate)(self, &args) {
                    return Ok(record);
                }
            }

            return Err(not_found(identity));
        }

        for module in &self.modules {
            if module.name != identity.module_name() {
                continue;
            }
            if let Some(wanted) = identity.module_version() {
                if module.version.as_deref() != Some(wanted) {
                    continue;
                }
            }
            for path in &module.types {
                let record = &self.records[path];
                if record.identity().type_name() == identity.type_name() {
                    return Ok(record.clone());
                }
            }
        }

        Err(not_found(identity))
    }

    /// The catalog of an entity's concrete type.
    pub fn catalog_for(&self, entity: &dyn Entity) -> Result<Arc<EntityCatalog>, EngineError> {
        let record = self.resolve(&entity.type_identity())?;

        Ok(record.catalog()?)
    }

    fn insert_record(
        &mut self,
        identity: TypeIdentity,
        constructor: Option<EntityConstructor>,
        descriptor: DescriptorFn,
    ) -> Result<(), RegistryError> {
        let path = identity.canonical_path();
        if self.records.contains_key(&path) {
            return Err(RegistryError::DuplicateRegistration { path });
        }

        debug!("registered type {path}");

        let module_name = identity.module_name().to_string();
        let module_version = identity.module_version().map(str::to_string);
        let entry = self
            .modules
            .iter_mut()
            .find(|m| m.name == module_name && m.version == module_version);
        match entry {
            Some(module) => module.types.push(path.clone()),
            None => self.modules.push(ModuleEntry {
                name: module_name,
                version: module_version,
                types: vec![path.clone()],
            }),
        }

        self.records.insert(
            path,
            Arc::new(TypeRecord {
                identity,
                constructor,
                descriptor,
                catalog: OnceLock::new(),
            }),
        );

        Ok(())
    }
}

fn construct_default<T: EntityKind>() -> Box<dyn Entity> {
    Box::new(T::default())
}

fn identity_of(type_name: &str, module: ModuleIdentity) -> Result<TypeIdentity, RegistryError> {
    match module.version {
        Some(version) => TypeIdentity::versioned(type_name, module.name, version),
        None => TypeIdentity::new(type_name, module.name),
    }
    .map_err(|err| RegistryError::InvalidIdentity(err.to_string()))
}

fn version_matches(wanted: &TypeIdentity, registered: &TypeIdentity) -> bool {
    match (wanted.module_version(), registered.module_version()) {
        (None, _) => true,
        (Some(w), Some(r)) => w == r,
        (Some(_), None) => false,
    }
}

fn not_found(identity: &TypeIdentity) -> DiscriminatorError {
    DiscriminatorError::TypeNotFound {
        discriminator: identity.encode(true),
    }
}

///
/// SharedRegistry
///
/// Clone-cheap shared handle over one registry.
///

#[derive(Clone, Debug, Default)]
pub struct SharedRegistry {
    inner: Arc<RwLock<TypeRegistry>>,
}

impl SharedRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&self) -> RwLockReadGuard<'_, TypeRegistry> {
        self.inner
            .read()
            .expect("type registry lock poisoned while acquiring read lock")
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, TypeRegistry> {
        self.inner
            .write()
            .expect("type registry lock poisoned while acquiring write lock")
    }
}

///
/// GLOBAL
/// the process-wide registry, populated at startup
///

static GLOBAL: LazyLock<SharedRegistry> = LazyLock::new(SharedRegistry::default);

/// The process-wide registry startup registration writes into.
pub fn global() -> &'static SharedRegistry {
    &GLOBAL
}

/// Register concrete entity types into the global registry at process
/// start.
#[macro_export]
macro_rules! register_entities {
    ($($ty:ty),+ $(,)?) => {
        const _: () = {
            #[$crate::__reexports::ctor::ctor(unsafe, anonymous, crate_path = $crate::__reexports::ctor)]
            fn register() {
                let mut registry = $crate::registry::global().write();
                $(
                    registry
                        .register_entity::<$ty>()
                        .expect("startup entity registration failed");
                )+
            }
        };
    };
}
