use crate::{
    catalog::CatalogError,
    identity::DiscriminatorError,
    reference::ReferenceError,
    registry::RegistryError,
    ser::SerializeError,
};
use std::fmt;
use thiserror::Error as ThisError;

///
/// EngineError
///
/// Structured engine error with a stable internal classification. Every
/// module error converts into this at the engine boundary; the original
/// error travels along as structured detail.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct EngineError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
    pub detail: Option<ErrorDetail>,
}

impl EngineError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Construct a serialize-origin invariant violation.
    pub(crate) fn serialize_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Serialize,
            message.into(),
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class, ErrorClass::NotFound)
    }
}

///
/// ErrorDetail
///
/// Origin-specific error detail carried by [`EngineError`].
///

#[derive(Debug, ThisError)]
pub enum ErrorDetail {
    #[error("{0}")]
    Discriminator(DiscriminatorError),

    #[error("{0}")]
    Registry(RegistryError),

    #[error("{0}")]
    Catalog(CatalogError),

    #[error("{0}")]
    Reference(ReferenceError),

    #[error("{0}")]
    Serialize(SerializeError),
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Malformed,
    NotFound,
    Conflict,
    Mismatch,
    Unsupported,
    InvariantViolation,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Malformed => "malformed",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Mismatch => "mismatch",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
        };
        f.write_str(label)
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Identity,
    Registry,
    Catalog,
    Reference,
    Serialize,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Identity => "identity",
            Self::Registry => "registry",
            Self::Catalog => "catalog",
            Self::Reference => "reference",
            Self::Serialize => "serialize",
        };
        f.write_str(label)
    }
}

// ── Conversions ─────────────────

impl From<DiscriminatorError> for EngineError {
    fn from(err: DiscriminatorError) -> Self {
        let class = match err {
            DiscriminatorError::TypeNotFound { .. } => ErrorClass::NotFound,
            _ => ErrorClass::Malformed,
        };

        Self {
            class,
            origin: ErrorOrigin::Identity,
            message: err.to_string(),
            detail: Some(ErrorDetail::Discriminator(err)),
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        let class = match err {
            RegistryError::DuplicateRegistration { .. } => ErrorClass::Conflict,
            RegistryError::NotRegistered { .. } => ErrorClass::NotFound,
            RegistryError::AbstractConstruction { .. } => ErrorClass::Unsupported,
            RegistryError::InvalidIdentity(_) => ErrorClass::Malformed,
        };

        Self {
            class,
            origin: ErrorOrigin::Registry,
            message: err.to_string(),
            detail: Some(ErrorDetail::Registry(err)),
        }
    }
}

impl From<CatalogError> for EngineError {
    fn from(err: CatalogError) -> Self {
        let class = match err {
            CatalogError::AmbiguousField { .. }
            | CatalogError::AmbiguousRelation { .. }
            | CatalogError::ConflictingDeclaration { .. } => ErrorClass::Conflict,
            CatalogError::UnknownField { .. } | CatalogError::UnknownRelation { .. } => {
                ErrorClass::NotFound
            }
            CatalogError::TypeMismatch { .. }
            | CatalogError::RelationShapeMismatch { .. }
            | CatalogError::EntityTypeMismatch { .. } => ErrorClass::Mismatch,
            CatalogError::NullKeyValue { .. } => ErrorClass::InvariantViolation,
            CatalogError::NotAnEntity { .. } => ErrorClass::Unsupported,
            CatalogError::UnboundField { .. }
            | CatalogError::UnboundRelation { .. }
            | CatalogError::ReservedFieldName { .. }
            | CatalogError::InvalidIdentity(_) => ErrorClass::Malformed,
        };

        Self {
            class,
            origin: ErrorOrigin::Catalog,
            message: err.to_string(),
            detail: Some(ErrorDetail::Catalog(err)),
        }
    }
}

impl From<ReferenceError> for EngineError {
    fn from(err: ReferenceError) -> Self {
        let class = match err {
            ReferenceError::Unresolvable => ErrorClass::Unsupported,
            ReferenceError::Resolver(_) => ErrorClass::Internal,
        };

        Self {
            class,
            origin: ErrorOrigin::Reference,
            message: err.to_string(),
            detail: Some(ErrorDetail::Reference(err)),
        }
    }
}

impl From<SerializeError> for EngineError {
    fn from(err: SerializeError) -> Self {
        let class = match err {
            SerializeError::NonNullableFieldNull { .. } => ErrorClass::Mismatch,
            SerializeError::NoSerializerForType { .. }
            | SerializeError::UnhandledOptions { .. } => ErrorClass::Unsupported,
            SerializeError::MissingDiscriminator
            | SerializeError::Malformed(_)
            | SerializeError::Decode(_) => ErrorClass::Malformed,
            SerializeError::Encode(_) => ErrorClass::Internal,
        };

        Self {
            class,
            origin: ErrorOrigin::Serialize,
            message: err.to_string(),
            detail: Some(ErrorDetail::Serialize(err)),
        }
    }
}
