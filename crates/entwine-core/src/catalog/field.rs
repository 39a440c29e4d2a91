use crate::value::ValueKind;
use serde::Serialize;
use std::hash::{Hash, Hasher};

///
/// FieldDescriptor
///
/// Catalog entry for one declared field. `ordinal` is meaningful only
/// for key fields, where it fixes composite-key ordering.
///

#[derive(Clone, Debug, Serialize)]
pub struct FieldDescriptor {
    pub field_name: String,
    pub label: String,
    pub kind: ValueKind,
    pub nullable: bool,
    pub is_key: bool,
    pub ordinal: u16,
}

// Descriptor equality is (field_name, kind); label, nullability, and
// key-ness do not participate.
impl PartialEq for FieldDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.field_name == other.field_name && self.kind == other.kind
    }
}

impl Eq for FieldDescriptor {}

impl Hash for FieldDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field_name.hash(state);
        self.kind.hash(state);
    }
}

///
/// FieldProjection
///
/// Bitmask selecting which catalog fields participate in a call:
/// key fields, non-key fields, or both.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct FieldProjection(u8);

impl FieldProjection {
    pub const KEYS: Self = Self(0b01);
    pub const FIELDS: Self = Self(0b10);
    pub const ALL: Self = Self(0b11);

    #[must_use]
    pub const fn contains_keys(self) -> bool {
        self.0 & Self::KEYS.0 != 0
    }

    #[must_use]
    pub const fn contains_fields(self) -> bool {
        self.0 & Self::FIELDS.0 != 0
    }

    /// Whether a field with the given key-ness passes this projection.
    #[must_use]
    pub const fn admits(self, is_key: bool) -> bool {
        if is_key {
            self.contains_keys()
        } else {
            self.contains_fields()
        }
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}
