use super::*;
use crate::{
    test_fixtures::{Invoice, Order, fixture_registry},
    traits::EntityKind,
    value::Value,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use ulid::Ulid;

///
/// CountingResolver
///

struct CountingResolver {
    calls: AtomicUsize,
    entity: Option<Arc<dyn Entity>>,
}

impl CountingResolver {
    fn returning(entity: Option<Arc<dyn Entity>>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            entity,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl ReferenceResolver for CountingResolver {
    async fn resolve(
        &self,
        _keys: &ValueMap,
        _concrete: Option<&TypeIdentity>,
    ) -> Result<Option<Arc<dyn Entity>>, ReferenceError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        tokio::task::yield_now().await;

        Ok(self.entity.clone())
    }
}

fn keyed(id: Ulid) -> ValueMap {
    let mut keys = ValueMap::new();
    keys.insert("id".to_string(), Value::Ulid(id));
    keys
}

#[tokio::test]
async fn null_reference_resolves_without_a_resolver() {
    let reference = EntityReference::null();
    assert!(reference.is_null_reference());

    let resolved = reference.get().await.unwrap();
    assert!(resolved.is_none());
    assert!(reference.is_resolved());
}

#[tokio::test]
async fn keyed_reference_without_resolver_is_unresolvable() {
    let reference = EntityReference::from_keys(keyed(Ulid::from_parts(1, 1)));

    let err = reference.get().await.unwrap_err();
    assert!(matches!(err, ReferenceError::Unresolvable));
    assert!(!reference.is_resolved());
}

#[tokio::test]
async fn resolution_is_cached() {
    let order: Arc<dyn Entity> = Arc::new(Order {
        id: Ulid::from_parts(1, 1),
        amount: 3,
    });
    let resolver = CountingResolver::returning(Some(order));

    let reference =
        EntityReference::from_keys(keyed(Ulid::from_parts(1, 1))).with_resolver(resolver.clone());

    assert!(reference.get().await.unwrap().is_some());
    assert!(reference.get().await.unwrap().is_some());
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn concurrent_gets_share_one_resolution() {
    let order: Arc<dyn Entity> = Arc::new(Order {
        id: Ulid::from_parts(2, 2),
        amount: 5,
    });
    let resolver = CountingResolver::returning(Some(order));

    let reference =
        EntityReference::from_keys(keyed(Ulid::from_parts(2, 2))).with_resolver(resolver.clone());
    let clone = reference.clone();

    let (first, second) = tokio::join!(reference.get(), clone.get());
    assert!(first.unwrap().is_some());
    assert!(second.unwrap().is_some());
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn resolver_miss_caches_none() {
    let resolver = CountingResolver::returning(None);
    let reference =
        EntityReference::from_keys(keyed(Ulid::from_parts(3, 3))).with_resolver(resolver.clone());

    assert!(reference.get().await.unwrap().is_none());
    assert!(reference.is_resolved());
    assert!(reference.get().await.unwrap().is_none());
    assert_eq!(resolver.calls(), 1);
}

#[test]
fn set_recomputes_keys_and_concrete_type() {
    let registry = fixture_registry();
    let invoice = Invoice {
        id: Ulid::from_parts(7, 7),
        counter: 2,
        ..Invoice::default()
    };

    let mut reference = EntityReference::null();
    reference
        .set(&registry.read(), Arc::new(invoice))
        .unwrap();

    assert_eq!(reference.keys().len(), 1);
    assert_eq!(reference.keys()["id"], Value::Ulid(Ulid::from_parts(7, 7)));
    assert_eq!(reference.concrete_type(), Some(&Invoice::identity()));
    assert!(reference.is_resolved());
}

#[test]
fn pending_action_transitions() {
    let registry = fixture_registry();
    let guard = registry.read();

    let mut reference = EntityReference::null();
    assert_eq!(reference.pending_action(), PendingAction::None);

    // Null → entity: a create.
    reference
        .set(
            &guard,
            Arc::new(Invoice {
                id: Ulid::from_parts(1, 1),
                ..Invoice::default()
            }),
        )
        .unwrap();
    assert_eq!(reference.pending_action(), PendingAction::Create);

    // Entity → entity: an update.
    reference
        .set(
            &guard,
            Arc::new(Invoice {
                id: Ulid::from_parts(2, 2),
                ..Invoice::default()
            }),
        )
        .unwrap();
    assert_eq!(reference.pending_action(), PendingAction::Update);

    // Entity → null with keys present: a delete.
    reference.set_null();
    assert_eq!(reference.pending_action(), PendingAction::Delete);
    assert!(reference.is_null_reference());

    reference.on_commit();
    assert_eq!(reference.pending_action(), PendingAction::None);
}

#[test]
fn clearing_an_already_null_reference_is_not_a_delete() {
    let mut reference = EntityReference::null();
    reference.clear();
    assert_eq!(reference.pending_action(), PendingAction::None);
}

#[test]
fn list_removal_feeds_the_side_channel() {
    let registry = fixture_registry();
    let guard = registry.read();

    let mut list = EntityReferenceList::new();
    for i in 0..4u64 {
        let order = Order {
            id: Ulid::from_parts(9, u128::from(i)),
            amount: i,
        };
        list.add(EntityReference::from_entity(&guard, Arc::new(order)).unwrap());
    }
    assert_eq!(list.len(), 4);

    list.remove_at(0);
    list.remove_at(0);
    assert_eq!(list.len(), 2);
    assert_eq!(list.removed().len(), 2);
    for removed in list.removed() {
        assert_eq!(removed.pending_action(), PendingAction::Delete);
    }

    list.commit();
    assert!(list.removed().is_empty());
    assert_eq!(list.len(), 2);
    for live in &list {
        assert_ne!(live.pending_action(), PendingAction::Delete);
    }
}

#[test]
fn list_remove_matches_by_target() {
    let registry = fixture_registry();
    let guard = registry.read();

    let order = Order {
        id: Ulid::from_parts(4, 4),
        amount: 1,
    };
    let reference = EntityReference::from_entity(&guard, Arc::new(order)).unwrap();

    let mut list = EntityReferenceList::from_references(vec![reference.clone()]);
    assert!(list.remove(&reference));
    assert!(list.is_empty());
    assert_eq!(list.removed().len(), 1);
    assert!(!list.remove(&reference));
}

#[test]
fn list_clear_removes_everything() {
    let mut list = EntityReferenceList::from_references(vec![
        EntityReference::from_keys(keyed(Ulid::from_parts(1, 1))),
        EntityReference::from_keys(keyed(Ulid::from_parts(2, 2))),
    ]);

    list.clear();
    assert!(list.is_empty());
    assert_eq!(list.removed().len(), 2);
}

#[test]
fn insert_preserves_order() {
    let mut list = EntityReferenceList::new();
    list.add(EntityReference::from_keys(keyed(Ulid::from_parts(1, 1))));
    list.insert(0, EntityReference::from_keys(keyed(Ulid::from_parts(2, 2))));

    assert_eq!(
        list[0].keys()["id"],
        Value::Ulid(Ulid::from_parts(2, 2))
    );
}
