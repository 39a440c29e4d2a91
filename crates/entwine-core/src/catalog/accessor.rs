use crate::{
    reference::{EntityReference, EntityReferenceList},
    traits::{Entity, EntityKind, FieldValue},
    value::Value,
};
use thiserror::Error as ThisError;

///
/// AccessorError
///
/// Failures raised inside a bound accessor. The catalog maps these onto
/// its own error surface with the field or relation name attached.
///

#[derive(Debug, ThisError)]
pub enum AccessorError {
    #[error("value of kind '{found}' does not fit the field storage")]
    ValueShape { found: &'static str },

    #[error("accessor applied to a different entity type")]
    WrongEntity,
}

///
/// RelationValue
///
/// The runtime value of a relation: one reference or an ordered list.
///

#[derive(Clone, Debug)]
pub enum RelationValue {
    Single(EntityReference),
    List(EntityReferenceList),
}

impl RelationValue {
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::List(_) => "list",
        }
    }
}

///
/// FieldAccessor
///
/// Typed read/write closures for one field, bound to one concrete
/// entity type at declaration time.
///

pub struct FieldAccessor {
    get: Box<dyn Fn(&dyn Entity) -> Value + Send + Sync>,
    set: Box<dyn Fn(&mut dyn Entity, Value) -> Result<(), AccessorError> + Send + Sync>,
}

impl std::fmt::Debug for FieldAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor").finish_non_exhaustive()
    }
}

impl FieldAccessor {
    /// Bind field storage on a concrete type through its `FieldValue`
    /// conversion.
    pub fn bind<T, V, G, S>(get: G, set: S) -> Self
    where
        T: EntityKind,
        V: FieldValue + 'static,
        G: Fn(&T) -> &V + Send + Sync + 'static,
        S: Fn(&mut T, V) + Send + Sync + 'static,
    {
        Self {
            get: Box::new(move |entity| {
                let concrete = entity
                    .as_any()
                    .downcast_ref::<T>()
                    .expect("catalog invariant: accessor applied to its declaring entity type");
                get(concrete).to_value()
            }),
            set: Box::new(move |entity, value| {
                let concrete = entity
                    .as_any_mut()
                    .downcast_mut::<T>()
                    .ok_or(AccessorError::WrongEntity)?;
                let parsed = V::from_value(&value).ok_or(AccessorError::ValueShape {
                    found: value.tag(),
                })?;
                set(concrete, parsed);

                Ok(())
            }),
        }
    }

    #[must_use]
    pub fn get(&self, entity: &dyn Entity) -> Value {
        (self.get)(entity)
    }

    pub fn set(&self, entity: &mut dyn Entity, value: Value) -> Result<(), AccessorError> {
        (self.set)(entity, value)
    }
}

///
/// RelationAccessor
///
/// Typed read/write closures for one relation property.
///

pub struct RelationAccessor {
    get: Box<dyn Fn(&dyn Entity) -> RelationValue + Send + Sync>,
    set: Box<dyn Fn(&mut dyn Entity, RelationValue) -> Result<(), AccessorError> + Send + Sync>,
}

impl std::fmt::Debug for RelationAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationAccessor").finish_non_exhaustive()
    }
}

impl RelationAccessor {
    /// Bind a single-reference relation property.
    pub fn single<T, G, S>(get: G, set: S) -> Self
    where
        T: EntityKind,
        G: Fn(&T) -> &EntityReference + Send + Sync + 'static,
        S: Fn(&mut T, EntityReference) + Send + Sync + 'static,
    {
        Self {
            get: Box::new(move |entity| {
                let concrete = entity
                    .as_any()
                    .downcast_ref::<T>()
                    .expect("catalog invariant: accessor applied to its declaring entity type");
                RelationValue::Single(get(concrete).clone())
            }),
            set: Box::new(move |entity, value| {
                let concrete = entity
                    .as_any_mut()
                    .downcast_mut::<T>()
                    .ok_or(AccessorError::WrongEntity)?;
                match value {
                    RelationValue::Single(reference) => {
                        set(concrete, reference);
                        Ok(())
                    }
                    RelationValue::List(_) => Err(AccessorError::ValueShape { found: "list" }),
                }
            }),
        }
    }

    /// Bind a reference-list relation property.
    pub fn list<T, G, S>(get: G, set: S) -> Self
    where
        T: EntityKind,
        G: Fn(&T) -> &EntityReferenceList + Send + Sync + 'static,
        S: Fn(&mut T, EntityReferenceList) + Send + Sync + 'static,
    {
        Self {
            get: Box::new(move |entity| {
                let concrete = entity
                    .as_any()
                    .downcast_ref::<T>()
                    .expect("catalog invariant: accessor applied to its declaring entity type");
                RelationValue::List(get(concrete).clone())
            }),
            set: Box::new(move |entity, value| {
                let concrete = entity
                    .as_any_mut()
                    .downcast_mut::<T>()
                    .ok_or(AccessorError::WrongEntity)?;
                match value {
                    RelationValue::List(list) => {
                        set(concrete, list);
                        Ok(())
                    }
                    RelationValue::Single(_) => Err(AccessorError::ValueShape { found: "single" }),
                }
            }),
        }
    }

    #[must_use]
    pub fn get(&self, entity: &dyn Entity) -> RelationValue {
        (self.get)(entity)
    }

    pub fn set(&self, entity: &mut dyn Entity, value: RelationValue) -> Result<(), AccessorError> {
        (self.set)(entity, value)
    }
}
