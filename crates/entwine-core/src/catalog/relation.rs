use crate::identity::TypeIdentity;
use serde::Serialize;
use std::fmt::{self, Display};

///
/// RelationshipKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum RelationshipKind {
    Association,
    Composition,
    Aggregation,
}

impl Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Association => "association",
            Self::Composition => "composition",
            Self::Aggregation => "aggregation",
        };
        f.write_str(label)
    }
}

///
/// LoadPolicy
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum LoadPolicy {
    Eager,
    Lazy,
    Join,
}

impl Display for LoadPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
            Self::Join => "join",
        };
        f.write_str(label)
    }
}

///
/// RelationDescriptor
///
/// Catalog entry for one declared relation. A relation resolves to a
/// single reference or a reference list, never both.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct RelationDescriptor {
    pub relation_name: String,
    pub related: TypeIdentity,
    pub relationship: RelationshipKind,
    pub is_list: bool,
    pub load: LoadPolicy,
}

impl RelationDescriptor {
    /// Declared shape label, for diagnostics.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        if self.is_list { "list" } else { "single" }
    }
}
