//! Entity contracts.
//!
//! These traits define *what an entity is* at runtime (`Entity`), what a
//! concrete type declares about itself (`EntityKind`), and the optional
//! change-tracking capability the serializer cooperates with.

use crate::{
    catalog::EntityDescriptor,
    identity::TypeIdentity,
    value::{Value, ValueKind},
};
use derive_more::Display;
use std::any::Any;
use ulid::Ulid;

///
/// ModuleIdentity
///
/// The defining module of an entity type; the unit identities resolve
/// against. For Rust types this is the declaring crate.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[display("{name}")]
pub struct ModuleIdentity {
    pub name: &'static str,
    pub version: Option<&'static str>,
}

/// The declaring crate's module identity, name and version from Cargo.
#[macro_export]
macro_rules! module_identity {
    () => {
        $crate::traits::ModuleIdentity {
            name: env!("CARGO_PKG_NAME"),
            version: Some(env!("CARGO_PKG_VERSION")),
        }
    };
}

///
/// ChangeTracked
///
/// Optional capability: an entity that reports field changes to an
/// external observer and can suspend those notifications. The
/// deserializer toggles suppression around field population so a decode
/// never registers as user-driven change.
///

pub trait ChangeTracked {
    fn suppress_notifications(&mut self, suppress: bool);

    fn notifications_suppressed(&self) -> bool;
}

///
/// Entity
///
/// Object-safe runtime contract every mapped record implements. The
/// catalog reaches concrete storage through `as_any`; the serializer
/// discovers the concrete identity through `type_identity`.
///

pub trait Entity: Any + Send + Sync {
    /// Concrete runtime identity of this instance.
    fn type_identity(&self) -> TypeIdentity;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// The change-tracking capability, when the concrete type opts in.
    fn as_change_tracked(&mut self) -> Option<&mut dyn ChangeTracked> {
        None
    }
}

impl std::fmt::Debug for dyn Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("type_identity", &self.type_identity())
            .finish_non_exhaustive()
    }
}

///
/// EntityKind
///
/// Static declaration contract for a concrete entity type: its name,
/// defining module, and the descriptor the catalog is built from.
///

pub trait EntityKind: Entity + Clone + Default + Sized + 'static {
    const TYPE_NAME: &'static str;

    fn module() -> ModuleIdentity;

    /// Declared fields, keys, relations, and capability sets.
    fn describe() -> EntityDescriptor;

    fn identity() -> TypeIdentity {
        let module = Self::module();
        match module.version {
            Some(version) => TypeIdentity::versioned(Self::TYPE_NAME, module.name, version),
            None => TypeIdentity::new(Self::TYPE_NAME, module.name),
        }
        .expect("EntityKind invariant: type and module names contain no reserved characters")
    }
}

///
/// FieldValue
///
/// Conversion boundary between concrete field storage and the dynamic
/// `Value` vocabulary. Accessor bindings are written in terms of this
/// trait.
///

pub trait FieldValue {
    fn kind() -> ValueKind
    where
        Self: Sized;

    fn to_value(&self) -> Value;

    #[must_use]
    fn from_value(value: &Value) -> Option<Self>
    where
        Self: Sized;
}

impl FieldValue for String {
    fn kind() -> ValueKind {
        ValueKind::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for f64 {
    fn kind() -> ValueKind {
        ValueKind::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for Ulid {
    fn kind() -> ValueKind {
        ValueKind::Ulid
    }

    fn to_value(&self) -> Value {
        Value::Ulid(*self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Ulid(v) => Some(*v),
            _ => None,
        }
    }
}

impl FieldValue for Vec<u8> {
    fn kind() -> ValueKind {
        ValueKind::Blob
    }

    fn to_value(&self) -> Value {
        Value::Blob(self.clone())
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Blob(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FieldValue for Vec<String> {
    fn kind() -> ValueKind {
        ValueKind::List(Box::new(ValueKind::Text))
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(FieldValue::to_value).collect())
    }

    fn from_value(value: &Value) -> Option<Self> {
        let Value::List(items) = value else {
            return None;
        };

        items.iter().map(String::from_value).collect()
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> ValueKind {
        T::kind()
    }

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if matches!(value, Value::Null) {
            return Some(None);
        }

        T::from_value(value).map(Some)
    }
}

// impl_field_value
macro_rules! impl_field_value {
    ( $( $type:ty => $variant:ident ),* $(,)? ) => {
        $(
            impl FieldValue for $type {
                fn kind() -> ValueKind {
                    ValueKind::$variant
                }

                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }

                fn from_value(value: &Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => (*v).try_into().ok(),
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_field_value!(
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    bool => Bool,
);
