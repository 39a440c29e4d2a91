use crate::{identity::TypeIdentity, traits::Entity, value::ValueMap};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// ReferenceError
///

#[derive(Debug, ThisError)]
pub enum ReferenceError {
    #[error("reference has key values but no resolver")]
    Unresolvable,

    #[error("resolver failed: {0}")]
    Resolver(String),
}

///
/// ReferenceResolver
///
/// Externally-supplied asynchronous lookup from key values to a related
/// entity. Resolution of a missing row is `Ok(None)`, not an error.
///

#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve(
        &self,
        keys: &ValueMap,
        concrete: Option<&TypeIdentity>,
    ) -> Result<Option<Arc<dyn Entity>>, ReferenceError>;
}
