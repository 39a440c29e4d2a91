//! Module: reference
//! Responsibility: lazy, keyed handles to related entities and the
//! ordered reference list with its removed-item side channel.
//! Does not own: catalog metadata or wire encoding of references.
//!
//! Invariants:
//! - `is_resolved` implies the cached entity reflects the last set/get.
//! - The canonical null reference has empty keys and resolves to `None`
//!   without invoking the resolver.
//! - At most one resolution is in flight per shared resolution cell;
//!   concurrent callers await the same result.

mod list;
mod resolver;

#[cfg(test)]
mod tests;

pub use list::EntityReferenceList;
pub use resolver::{ReferenceError, ReferenceResolver};

use crate::{
    error::EngineError, identity::TypeIdentity, registry::TypeRegistry, traits::Entity,
    value::ValueMap,
};
use log::trace;
use std::fmt;
use std::sync::{
    Arc, Mutex as StdMutex,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Mutex as AsyncMutex;

///
/// PendingAction
///
/// Local change marker consumed by a downstream persistence layer.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum PendingAction {
    #[default]
    None,
    Create,
    Update,
    Delete,
}

impl fmt::Display for PendingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        f.write_str(label)
    }
}

///
/// ResolutionCell
///
/// Shared resolution state. Clones of a reference share one cell, so a
/// resolution performed through any clone is visible to all of them.
///

struct ResolutionCell {
    resolved: AtomicBool,
    entity: StdMutex<Option<Arc<dyn Entity>>>,
    inflight: AsyncMutex<()>,
}

impl ResolutionCell {
    fn unresolved() -> Arc<Self> {
        Arc::new(Self {
            resolved: AtomicBool::new(false),
            entity: StdMutex::new(None),
            inflight: AsyncMutex::new(()),
        })
    }

    fn resolved_to(entity: Option<Arc<dyn Entity>>) -> Arc<Self> {
        Arc::new(Self {
            resolved: AtomicBool::new(true),
            entity: StdMutex::new(entity),
            inflight: AsyncMutex::new(()),
        })
    }

    fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    fn peek(&self) -> Option<Arc<dyn Entity>> {
        self.entity
            .lock()
            .expect("reference cell lock poisoned")
            .clone()
    }

    fn store(&self, entity: Option<Arc<dyn Entity>>) {
        *self.entity.lock().expect("reference cell lock poisoned") = entity;
        self.resolved.store(true, Ordering::Release);
    }
}

///
/// EntityReference
///
/// A lazy pointer to a related entity: key values, the concrete type
/// identity when known, resolution state, and a pending local action.
///

#[derive(Clone)]
pub struct EntityReference {
    keys: ValueMap,
    concrete: Option<TypeIdentity>,
    pending: PendingAction,
    resolver: Option<Arc<dyn ReferenceResolver>>,
    cell: Arc<ResolutionCell>,
}

impl EntityReference {
    /// The canonical null reference: no keys, no entity.
    #[must_use]
    pub fn null() -> Self {
        Self {
            keys: ValueMap::new(),
            concrete: None,
            pending: PendingAction::None,
            resolver: None,
            cell: ResolutionCell::unresolved(),
        }
    }

    /// An unresolved reference carrying key values.
    #[must_use]
    pub fn from_keys(keys: ValueMap) -> Self {
        Self {
            keys,
            concrete: None,
            pending: PendingAction::None,
            resolver: None,
            cell: ResolutionCell::unresolved(),
        }
    }

    /// A resolved reference constructed from a live entity; key values
    /// and the concrete type are derived through the entity's catalog.
    pub fn from_entity(
        registry: &TypeRegistry,
        entity: Arc<dyn Entity>,
    ) -> Result<Self, EngineError> {
        let mut reference = Self::null();
        reference.set(registry, entity)?;
        reference.pending = PendingAction::None;

        Ok(reference)
    }

    /// Attach the concrete type identity (builder form).
    #[must_use]
    pub fn with_concrete(mut self, concrete: TypeIdentity) -> Self {
        self.concrete = Some(concrete);
        self
    }

    /// Attach a resolver (builder form).
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ReferenceResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn set_resolver(&mut self, resolver: Arc<dyn ReferenceResolver>) {
        self.resolver = Some(resolver);
    }

    #[must_use]
    pub fn keys(&self) -> &ValueMap {
        &self.keys
    }

    #[must_use]
    pub fn concrete_type(&self) -> Option<&TypeIdentity> {
        self.concrete.as_ref()
    }

    #[must_use]
    pub const fn pending_action(&self) -> PendingAction {
        self.pending
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.cell.is_resolved()
    }

    /// The cached entity, without triggering resolution.
    #[must_use]
    pub fn entity(&self) -> Option<Arc<dyn Entity>> {
        self.cell.peek()
    }

    /// Whether this is the canonical null reference.
    #[must_use]
    pub fn is_null_reference(&self) -> bool {
        self.keys.is_empty() && self.entity().is_none()
    }

    /// Whether this reference points at the same target as another,
    /// judged by key values.
    #[must_use]
    pub fn same_target(&self, other: &Self) -> bool {
        self.keys == other.keys
    }

    /// Point this reference at a live entity. Key values and the
    /// concrete type are recomputed from the entity; the pending action
    /// becomes `Create` for a previously-null reference and `Update`
    /// otherwise.
    pub fn set(&mut self, registry: &TypeRegistry, entity: Arc<dyn Entity>) -> Result<(), EngineError> {
        let identity = entity.type_identity();
        let record = registry.resolve(&identity)?;
        let catalog = record.catalog()?;
        let keys = catalog.key_values(entity.as_ref())?;

        self.pending = if self.is_null_reference() {
            PendingAction::Create
        } else {
            PendingAction::Update
        };
        self.keys = keys;
        self.concrete = Some(identity);
        self.cell = ResolutionCell::resolved_to(Some(entity));

        Ok(())
    }

    /// Point this reference at nothing. Previously non-empty keys mark
    /// the reference for deletion.
    pub fn set_null(&mut self) {
        if !self.keys.is_empty() {
            self.pending = PendingAction::Delete;
        }
        self.keys.clear();
        self.concrete = None;
        self.cell = ResolutionCell::resolved_to(None);
    }

    /// Equivalent to `set_null`.
    pub fn clear(&mut self) {
        self.set_null();
    }

    /// Acknowledge that a persistence layer consumed the pending
    /// action. Resolution state is untouched.
    pub fn on_commit(&mut self) {
        self.pending = PendingAction::None;
    }

    pub(crate) fn mark_delete(&mut self) {
        self.pending = PendingAction::Delete;
    }

    /// Resolve the referenced entity, fetching through the resolver on
    /// first use. This is the only suspending operation in the engine:
    /// concurrent callers share a single in-flight resolution.
    pub async fn get(&self) -> Result<Option<Arc<dyn Entity>>, ReferenceError> {
        if self.cell.is_resolved() {
            return Ok(self.cell.peek());
        }

        // A null reference resolves without suspension.
        if self.keys.is_empty() {
            self.cell.store(None);
            return Ok(None);
        }

        let resolver = self.resolver.as_ref().ok_or(ReferenceError::Unresolvable)?;

        let _inflight = self.cell.inflight.lock().await;
        if self.cell.is_resolved() {
            return Ok(self.cell.peek());
        }

        trace!("resolving reference with {} key(s)", self.keys.len());
        let entity = resolver.resolve(&self.keys, self.concrete.as_ref()).await?;
        self.cell.store(entity.clone());

        Ok(entity)
    }
}

impl Default for EntityReference {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for EntityReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityReference")
            .field("keys", &self.keys)
            .field("concrete", &self.concrete)
            .field("pending", &self.pending)
            .field("resolved", &self.is_resolved())
            .finish_non_exhaustive()
    }
}
